mod handlers;
mod health;
mod metrics;
mod routes;

pub use routes::api_routes;
