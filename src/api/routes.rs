use axum::{
    routing::{get, post, put},
    Router,
};

use crate::server::AppState;

use super::handlers::{
    list_notifications, mark_notification_read, push_notification, send_email_notification,
};
use super::health::{health, stats};
use super::metrics::prometheus_metrics;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & observability
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Notification endpoints
        .nest(
            "/api/v1",
            Router::new()
                .route(
                    "/notifications",
                    get(list_notifications).post(push_notification),
                )
                .route(
                    "/notifications/{notification_id}",
                    put(mark_notification_read),
                )
                .route("/notifications/email", post(send_email_notification)),
        )
}
