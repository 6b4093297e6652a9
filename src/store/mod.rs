//! Persistence gateway for notifications and mail records.
//!
//! This module defines the storage abstraction consumed by the dispatch
//! orchestrator and the HTTP handlers, allowing different backends
//! (PostgreSQL, memory) to be used interchangeably. The orchestrator never
//! talks to a concrete database; it only sees these traits.

mod memory;
mod postgres;

pub use memory::{MemoryMailStore, MemoryNotificationStore};
pub use postgres::{PostgresMailStore, PostgresNotificationStore};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use uuid::Uuid;

use crate::config::DatabaseConfig;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("not found: {0}")]
    NotFound(Uuid),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Delivery status of a persisted mail record.
///
/// `Sending` is written before the transport is attempted; the record is the
/// durable witness of the attempt regardless of the send outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailStatus {
    Sending,
    Sent,
    Failed,
}

impl MailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailStatus::Sending => "sending",
            MailStatus::Sent => "sent",
            MailStatus::Failed => "failed",
        }
    }
}

/// Fields for a new mail record, written before the send attempt.
#[derive(Debug, Clone)]
pub struct NewMailRecord {
    pub recipient: String,
    pub user_id: Option<String>,
    pub subject: String,
    pub rendered_body: String,
}

/// A persisted mail record.
#[derive(Debug, Clone, Serialize)]
pub struct MailRecord {
    pub id: Uuid,
    pub recipient: String,
    pub user_id: Option<String>,
    pub subject: String,
    pub rendered_body: String,
    pub status: MailStatus,
    pub created_at: DateTime<Utc>,
}

/// A stored, non-email notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub read: bool,
    /// Delivery status, `sending` at creation.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new stored notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: String,
}

/// Storage backend for mail records (the dispatch pipeline's gateway).
#[async_trait]
pub trait MailStore: Send + Sync {
    /// Persist a new record with `status = sending`, returning its id.
    async fn create(&self, record: NewMailRecord) -> Result<Uuid, StoreError>;

    /// Update the status of an existing record.
    async fn update_status(&self, id: Uuid, status: MailStatus) -> Result<(), StoreError>;
}

/// Storage backend for stored notifications (the HTTP surface's gateway).
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, notification: NewNotification) -> Result<Notification, StoreError>;

    /// List a user's notifications, newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>, StoreError>;

    async fn mark_read(&self, id: Uuid) -> Result<Notification, StoreError>;
}

/// Create the notification and mail stores from configuration.
///
/// Backend selection:
/// - "postgres": sqlx-backed stores sharing one connection pool
/// - "memory": in-process stores (development and tests)
pub async fn create_stores(
    config: &DatabaseConfig,
) -> Result<(Arc<dyn NotificationStore>, Arc<dyn MailStore>), StoreError> {
    match config.backend.as_str() {
        "postgres" => {
            let pool = PgPoolOptions::new()
                .max_connections(config.pool_size)
                .acquire_timeout(std::time::Duration::from_secs(
                    config.connect_timeout_seconds as u64,
                ))
                .connect(&config.url)
                .await?;

            tracing::info!(pool_size = config.pool_size, "PostgreSQL store initialized");

            Ok((
                Arc::new(PostgresNotificationStore::new(pool.clone())),
                Arc::new(PostgresMailStore::new(pool)),
            ))
        }
        "memory" => {
            tracing::info!("In-memory store initialized");
            Ok((
                Arc::new(MemoryNotificationStore::new()),
                Arc::new(MemoryMailStore::new()),
            ))
        }
        other => Err(StoreError::Unavailable(format!(
            "unknown database backend: {}",
            other
        ))),
    }
}
