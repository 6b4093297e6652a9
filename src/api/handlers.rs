//! HTTP notification handlers.
//!
//! The synchronous-protocol adapter: each handler decodes its request into
//! store operations or a canonical `NotificationIntent` and goes through the
//! orchestrator — never straight to the gateways.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::notification::NotificationIntent;
use crate::server::AppState;
use crate::store::{NewNotification, Notification};

#[derive(Debug, Deserialize)]
pub struct PushNotificationRequest {
    pub title: String,
    pub message: String,
    /// Notification category shown to the client; free-form.
    #[serde(default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub email: String,
    pub subject: String,
    /// One of the closed set of notification type tags.
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Extra template variables; merged under the caller identity fields.
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub message: String,
    pub record_id: Uuid,
}

/// POST /api/v1/notifications - accept a stored, non-email notification
#[tracing::instrument(name = "http.push_notification", skip(state, claims, request))]
pub async fn push_notification(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<PushNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>)> {
    if request.title.is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }

    let notification = state
        .notification_store
        .create(NewNotification {
            user_id: claims.user_id().to_string(),
            title: request.title,
            message: request.message,
            kind: request.kind,
        })
        .await?;

    metrics::NOTIFICATIONS_STORED_TOTAL.inc();

    Ok((StatusCode::CREATED, Json(notification)))
}

/// GET /api/v1/notifications - list the caller's notifications, newest first
#[tracing::instrument(name = "http.list_notifications", skip(state, claims))]
pub async fn list_notifications(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<Notification>>> {
    let notifications = state
        .notification_store
        .list_for_user(claims.user_id())
        .await?;

    Ok(Json(notifications))
}

/// PUT /api/v1/notifications/{id} - mark a notification as read
#[tracing::instrument(name = "http.mark_notification_read", skip(state, _claims))]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    _claims: Claims,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>> {
    let notification = state.notification_store.mark_read(notification_id).await?;

    metrics::NOTIFICATIONS_READ_TOTAL.inc();

    Ok(Json(notification))
}

/// POST /api/v1/notifications/email - run the full dispatch pipeline
#[tracing::instrument(
    name = "http.send_email_notification",
    skip(state, claims, request),
    fields(type_tag = %request.type_tag)
)]
pub async fn send_email_notification(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<SendEmailRequest>,
) -> Result<Json<SendEmailResponse>> {
    if request.email.is_empty() {
        return Err(AppError::Validation(
            "recipient email must not be empty".to_string(),
        ));
    }

    // Identity fields resolved here so the orchestrator stays
    // protocol-agnostic. Caller-supplied variables win on key collision.
    let mut variables = HashMap::new();
    variables.insert("name".to_string(), claims.display_name().to_string());
    variables.insert("email".to_string(), request.email.clone());
    variables.extend(request.variables);

    let intent = NotificationIntent {
        to: request.email,
        subject: request.subject,
        type_tag: request.type_tag,
        variables,
        plain_body: String::new(),
        user_id: Some(claims.user_id().to_string()),
    };

    let receipt = state.dispatcher.dispatch(intent).await?;

    Ok(Json(SendEmailResponse {
        message: format!(
            "Email sent to {} with subject: {}",
            receipt.recipient, receipt.subject
        ),
        record_id: receipt.record_id,
    }))
}
