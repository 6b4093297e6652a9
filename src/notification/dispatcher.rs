use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::mailer::Mailer;
use crate::metrics;
use crate::store::{MailStatus, MailStore, NewMailRecord};
use crate::template::{render, TemplateStore};

use super::{DispatchError, DispatchReceipt, NotificationIntent};

/// Statistics for the dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Total dispatch calls
    pub total_dispatched: AtomicU64,
    /// Dispatches that reached the transport and succeeded
    pub delivered: AtomicU64,
    /// Failures before any side effect (unknown type, missing template)
    pub rendering_failures: AtomicU64,
    /// Failures writing the mail record
    pub persistence_failures: AtomicU64,
    /// Failures at the transport after the record was written
    pub delivery_failures: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_dispatched: self.total_dispatched.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            rendering_failures: self.rendering_failures.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub total_dispatched: u64,
    pub delivered: u64,
    pub rendering_failures: u64,
    pub persistence_failures: u64,
    pub delivery_failures: u64,
}

/// Turns a `NotificationIntent` into a persisted mail record and an outbound
/// email, uniformly for both entry protocols.
///
/// Holds no mutable shared state beyond atomic counters; concurrent
/// dispatches are fully independent. There is no deduplication: repeated
/// calls with identical intents create distinct records and distinct send
/// attempts (no request-identity key exists in either protocol surface).
pub struct Dispatcher {
    templates: Arc<TemplateStore>,
    mail_store: Arc<dyn MailStore>,
    mailer: Arc<dyn Mailer>,
    stats: DispatcherStats,
}

impl Dispatcher {
    pub fn new(
        templates: Arc<TemplateStore>,
        mail_store: Arc<dyn MailStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            templates,
            mail_store,
            mailer,
            stats: DispatcherStats::default(),
        }
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Run the full resolve → render → persist → send sequence for one
    /// intent.
    ///
    /// Ordering invariant: the transport is never invoked unless the mail
    /// record was durably written first. The record captures the attempt,
    /// not the outcome — it exists even when the subsequent send fails.
    #[tracing::instrument(
        name = "notification.dispatch",
        skip(self, intent),
        fields(to = %intent.to, type_tag = %intent.type_tag)
    )]
    pub async fn dispatch(
        &self,
        intent: NotificationIntent,
    ) -> Result<DispatchReceipt, DispatchError> {
        self.stats.total_dispatched.fetch_add(1, Ordering::Relaxed);

        // Stage 1: resolve. Fails before any side effect.
        let template = match self.templates.resolve(&intent.type_tag) {
            Ok(template) => template,
            Err(e) => {
                self.stats.rendering_failures.fetch_add(1, Ordering::Relaxed);
                let err = DispatchError::Rendering(e);
                metrics::DISPATCH_TOTAL.with_label_values(&[err.stage()]).inc();
                tracing::warn!(error = %err, stage = err.stage(), "Dispatch rejected");
                return Err(err);
            }
        };

        // Stage 2: render. Pure; the template text is shared, never mutated.
        let html_body = render(&template, &intent.variables);

        // Stage 3: persist the attempt. Aborting here avoids sending an
        // email the service could not durably record.
        let record_id = match self
            .mail_store
            .create(NewMailRecord {
                recipient: intent.to.clone(),
                user_id: intent.user_id.clone(),
                subject: intent.subject.clone(),
                rendered_body: html_body.clone(),
            })
            .await
        {
            Ok(id) => id,
            Err(e) => {
                self.stats.persistence_failures.fetch_add(1, Ordering::Relaxed);
                metrics::DISPATCH_TOTAL.with_label_values(&["persistence"]).inc();
                tracing::error!(
                    error = %e,
                    to = %intent.to,
                    type_tag = %intent.type_tag,
                    "Failed to record mail attempt; send aborted"
                );
                return Err(DispatchError::Persistence(e));
            }
        };

        // Stage 4: send.
        match self
            .mailer
            .send(&intent.to, &intent.subject, &intent.plain_body, &html_body)
            .await
        {
            Ok(()) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                metrics::DISPATCH_TOTAL.with_label_values(&["delivered"]).inc();
                self.update_status_best_effort(record_id, MailStatus::Sent).await;
                tracing::info!(
                    record_id = %record_id,
                    to = %intent.to,
                    subject = %intent.subject,
                    "Email sent"
                );
                Ok(DispatchReceipt {
                    record_id,
                    recipient: intent.to,
                    subject: intent.subject,
                })
            }
            Err(e) => {
                self.stats.delivery_failures.fetch_add(1, Ordering::Relaxed);
                metrics::DISPATCH_TOTAL.with_label_values(&["delivery"]).inc();
                tracing::error!(
                    error = %e,
                    record_id = %record_id,
                    to = %intent.to,
                    type_tag = %intent.type_tag,
                    "Email send failed"
                );
                // The record's status is the durable witness of the partial
                // failure. The transport error stays the reported one even
                // if this update also fails.
                self.update_status_best_effort(record_id, MailStatus::Failed).await;
                Err(DispatchError::Delivery(e))
            }
        }
    }

    /// Post-hoc status update. Failures are logged, never escalated.
    async fn update_status_best_effort(&self, record_id: uuid::Uuid, status: MailStatus) {
        if let Err(e) = self.mail_store.update_status(record_id, status).await {
            tracing::warn!(
                error = %e,
                record_id = %record_id,
                status = status.as_str(),
                "Failed to update mail record status"
            );
        }
    }
}
