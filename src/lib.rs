// Infrastructure layer (shared components)
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;

// Domain layer (business logic)
pub mod mailer;
pub mod notification;
pub mod store;
pub mod template;

// Application layer (protocol adapters)
pub mod api;
pub mod grpc;
pub mod server;
