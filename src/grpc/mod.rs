//! gRPC entry point.
//!
//! An adapter layer between the wire protocol and the dispatch orchestrator:
//! requests are translated into a canonical `NotificationIntent`, never
//! handled against the gateways directly.
//!
//! The `proto` module is generated from `proto/notification.proto` and
//! committed; regenerate with `tonic-build` when the proto changes.

mod service;

pub mod proto {
    include!("generated/notification.rs");
}

pub use proto::notification_service_server::NotificationServiceServer;
pub use service::NotificationGrpcService;
