//! In-memory stores for development and tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{
    MailRecord, MailStatus, MailStore, NewMailRecord, NewNotification, Notification,
    NotificationStore, StoreError,
};

#[derive(Default)]
pub struct MemoryMailStore {
    records: DashMap<Uuid, MailRecord>,
}

impl MemoryMailStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a record by id (test inspection).
    pub fn get(&self, id: Uuid) -> Option<MailRecord> {
        self.records.get(&id).map(|r| r.clone())
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl MailStore for MemoryMailStore {
    async fn create(&self, record: NewMailRecord) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        self.records.insert(
            id,
            MailRecord {
                id,
                recipient: record.recipient,
                user_id: record.user_id,
                subject: record.subject,
                rendered_body: record.rendered_body,
                status: MailStatus::Sending,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn update_status(&self, id: Uuid, status: MailStatus) -> Result<(), StoreError> {
        match self.records.get_mut(&id) {
            Some(mut record) => {
                record.status = status;
                Ok(())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }
}

#[derive(Default)]
pub struct MemoryNotificationStore {
    notifications: DashMap<Uuid, Notification>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn create(&self, notification: NewNotification) -> Result<Notification, StoreError> {
        let created = Notification {
            id: Uuid::new_v4(),
            user_id: notification.user_id,
            title: notification.title,
            message: notification.message,
            kind: notification.kind,
            read: false,
            status: "sending".to_string(),
            created_at: Utc::now(),
        };
        self.notifications.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>, StoreError> {
        let mut notifications: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();

        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_read(&self, id: Uuid) -> Result<Notification, StoreError> {
        match self.notifications.get_mut(&id) {
            Some(mut notification) => {
                notification.read = true;
                Ok(notification.clone())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }
}
