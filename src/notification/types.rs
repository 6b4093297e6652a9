use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::mailer::MailerError;
use crate::store::StoreError;
use crate::template::TemplateError;

/// Canonical, protocol-agnostic representation of a requested notification.
///
/// Constructed per request by an adapter and owned exclusively by the
/// dispatch call that processes it. `type_tag` carries the wire value; the
/// template resolver parses it against the closed type set, so both entry
/// protocols get the identical terminal error for an unknown tag.
#[derive(Debug, Clone)]
pub struct NotificationIntent {
    /// Recipient address (required, non-empty — validated by adapters).
    pub to: String,
    pub subject: String,
    /// One of the closed set of notification type tags.
    pub type_tag: String,
    /// Variables substituted into the template. Insertion order irrelevant.
    pub variables: HashMap<String, String>,
    /// Plain-text body for the non-HTML part; may be empty.
    pub plain_body: String,
    /// Caller identity already resolved by the adapter, if any.
    pub user_id: Option<String>,
}

/// Why a dispatch failed, by pipeline stage.
///
/// `Rendering` means no side effects were attempted. `Persistence` means no
/// send was attempted. `Delivery` means a record exists with `status =
/// failed` as the durable witness of the partial failure.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("template rendering failed: {0}")]
    Rendering(#[from] TemplateError),

    #[error("failed to record mail attempt: {0}")]
    Persistence(#[from] StoreError),

    #[error("mail delivery failed: {0}")]
    Delivery(#[from] MailerError),
}

impl DispatchError {
    /// The failing pipeline stage, for logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            DispatchError::Rendering(TemplateError::UnknownType(_)) => "unknown_type",
            DispatchError::Rendering(TemplateError::Missing { .. }) => "template_missing",
            DispatchError::Persistence(_) => "persistence",
            DispatchError::Delivery(_) => "delivery",
        }
    }
}

/// Receipt for a delivered notification.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReceipt {
    /// Id of the persisted mail record.
    pub record_id: Uuid,
    pub recipient: String,
    pub subject: String,
}
