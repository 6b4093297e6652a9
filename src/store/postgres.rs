//! PostgreSQL-backed stores.
//!
//! Table definitions live in `migrations/`. Both stores share one `PgPool`;
//! sqlx pools are safe for concurrent use, so no extra synchronization is
//! layered on top.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{
    MailStatus, MailStore, NewMailRecord, NewNotification, Notification, NotificationStore,
    StoreError,
};

pub struct PostgresMailStore {
    pool: PgPool,
}

impl PostgresMailStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MailStore for PostgresMailStore {
    async fn create(&self, record: NewMailRecord) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO mails (id, recipient, user_id, subject, rendered_body, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            "#,
        )
        .bind(id)
        .bind(&record.recipient)
        .bind(&record.user_id)
        .bind(&record.subject)
        .bind(&record.rendered_body)
        .bind(MailStatus::Sending.as_str())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn update_status(&self, id: Uuid, status: MailStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE mails SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }
}

pub struct PostgresNotificationStore {
    pool: PgPool,
}

impl PostgresNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn notification_from_row(row: &PgRow) -> Result<Notification, sqlx::Error> {
    Ok(Notification {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        kind: row.try_get("kind")?,
        read: row.try_get("read")?,
        status: row.try_get("status")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    async fn create(&self, notification: NewNotification) -> Result<Notification, StoreError> {
        let id = Uuid::new_v4();

        let row = sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, message, kind, read, status, created_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, 'sending', NOW())
            RETURNING id, user_id, title, message, kind, read, status, created_at
            "#,
        )
        .bind(id)
        .bind(&notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.kind)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification_from_row(&row)?)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, message, kind, read, status, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut notifications = Vec::with_capacity(rows.len());
        for row in &rows {
            notifications.push(notification_from_row(row)?);
        }

        Ok(notifications)
    }

    async fn mark_read(&self, id: Uuid) -> Result<Notification, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE notifications SET read = TRUE
            WHERE id = $1
            RETURNING id, user_id, title, message, kind, read, status, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(notification_from_row(&row)?),
            None => Err(StoreError::NotFound(id)),
        }
    }
}
