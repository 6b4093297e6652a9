//! End-to-end tests for the dispatch pipeline against fake gateways.
//!
//! These verify the ordering invariant (persist before send), the outcome
//! taxonomy, and the documented non-idempotence, without a real database or
//! SMTP server.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tonic::Request;
use uuid::Uuid;

use pictoria_notification_service::grpc::proto::notification_service_server::NotificationService;
use pictoria_notification_service::grpc::proto::SendNotificationRequest;
use pictoria_notification_service::grpc::NotificationGrpcService;
use pictoria_notification_service::mailer::{Mailer, MailerError};
use pictoria_notification_service::notification::{DispatchError, Dispatcher, NotificationIntent};
use pictoria_notification_service::store::{
    MailStatus, MailStore, MemoryMailStore, NewMailRecord, StoreError,
};
use pictoria_notification_service::template::{TemplateError, TemplateKind, TemplateStore};

// =============================================================================
// Fakes
// =============================================================================

#[derive(Debug, Clone)]
struct SentMail {
    to: String,
    subject: String,
    text_body: String,
    html_body: String,
}

/// Mailer double that records every send and can be told to fail.
#[derive(Default)]
struct RecordingMailer {
    sends: Mutex<Vec<SentMail>>,
    fail: bool,
}

impl RecordingMailer {
    fn failing() -> Self {
        Self {
            sends: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn sent(&self) -> Vec<SentMail> {
        self.sends.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), MailerError> {
        if self.fail {
            return Err(MailerError::Transport("connection refused".to_string()));
        }
        self.sends.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            text_body: text_body.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}

/// Mail store double wrapping the in-memory store with fault injection.
#[derive(Default)]
struct FlakyMailStore {
    inner: MemoryMailStore,
    create_calls: AtomicUsize,
    last_created: Mutex<Option<Uuid>>,
    fail_create: bool,
    fail_update: bool,
}

impl FlakyMailStore {
    fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Default::default()
        }
    }

    fn failing_update() -> Self {
        Self {
            fail_update: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl MailStore for FlakyMailStore {
    async fn create(&self, record: NewMailRecord) -> Result<Uuid, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(StoreError::Unavailable("database down".to_string()));
        }
        let id = self.inner.create(record).await?;
        *self.last_created.lock().unwrap() = Some(id);
        Ok(id)
    }

    async fn update_status(&self, id: Uuid, status: MailStatus) -> Result<(), StoreError> {
        if self.fail_update {
            return Err(StoreError::Unavailable("database down".to_string()));
        }
        self.inner.update_status(id, status).await
    }
}

// =============================================================================
// Environment
// =============================================================================

/// Write a complete template set and return its directory.
fn template_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pictoria-dispatch-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    for kind in TemplateKind::ALL {
        let body = match kind {
            TemplateKind::AccountSignup => "Hi {{name}}, link: {{link}}".to_string(),
            other => format!("<p>Hi {{{{name}}}}, this is {}</p>", other.as_tag()),
        };
        std::fs::write(dir.join(kind.asset_name()), body).unwrap();
    }
    dir
}

struct TestEnv {
    dispatcher: Arc<Dispatcher>,
    mail_store: Arc<FlakyMailStore>,
    mailer: Arc<RecordingMailer>,
    dir: PathBuf,
}

impl TestEnv {
    fn new(mail_store: FlakyMailStore, mailer: RecordingMailer) -> Self {
        let dir = template_dir();
        let templates = Arc::new(TemplateStore::new(&dir));
        let mail_store = Arc::new(mail_store);
        let mailer = Arc::new(mailer);
        let dispatcher = Arc::new(Dispatcher::new(
            templates,
            mail_store.clone(),
            mailer.clone(),
        ));
        Self {
            dispatcher,
            mail_store,
            mailer,
            dir,
        }
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn signup_intent() -> NotificationIntent {
    NotificationIntent {
        to: "a@x.com".to_string(),
        subject: "Welcome".to_string(),
        type_tag: "account-signup".to_string(),
        variables: HashMap::from([("name".to_string(), "Ada".to_string())]),
        plain_body: String::new(),
        user_id: Some("user-1".to_string()),
    }
}

// =============================================================================
// Dispatch pipeline
// =============================================================================

#[tokio::test]
async fn delivered_intent_is_recorded_then_sent() {
    let env = TestEnv::new(FlakyMailStore::default(), RecordingMailer::default());

    let receipt = env.dispatcher.dispatch(signup_intent()).await.unwrap();

    // Unbound {{link}} stays verbatim; bound {{name}} is substituted.
    let sends = env.mailer.sent();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].to, "a@x.com");
    assert_eq!(sends[0].subject, "Welcome");
    assert_eq!(sends[0].text_body, "");
    assert_eq!(sends[0].html_body, "Hi Ada, link: {{link}}");

    let record = env.mail_store.inner.get(receipt.record_id).unwrap();
    assert_eq!(record.status, MailStatus::Sent);
    assert_eq!(record.rendered_body, "Hi Ada, link: {{link}}");
    assert_eq!(record.user_id.as_deref(), Some("user-1"));
}

#[tokio::test]
async fn unknown_type_fails_with_zero_gateway_calls() {
    let env = TestEnv::new(FlakyMailStore::default(), RecordingMailer::default());

    let mut intent = signup_intent();
    intent.type_tag = "bogus".to_string();

    let err = env.dispatcher.dispatch(intent).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Rendering(TemplateError::UnknownType(_))
    ));
    assert_eq!(env.mail_store.create_calls.load(Ordering::SeqCst), 0);
    assert!(env.mailer.sent().is_empty());
}

#[tokio::test]
async fn missing_template_fails_with_zero_gateway_calls() {
    let env = TestEnv::new(FlakyMailStore::default(), RecordingMailer::default());
    std::fs::remove_file(env.dir.join(TemplateKind::Subscription.asset_name())).unwrap();

    let mut intent = signup_intent();
    intent.type_tag = "subscription".to_string();

    let err = env.dispatcher.dispatch(intent).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Rendering(TemplateError::Missing { .. })
    ));
    assert_eq!(env.mail_store.create_calls.load(Ordering::SeqCst), 0);
    assert!(env.mailer.sent().is_empty());
}

#[tokio::test]
async fn transport_is_never_invoked_when_persistence_fails() {
    let env = TestEnv::new(FlakyMailStore::failing_create(), RecordingMailer::default());

    let err = env.dispatcher.dispatch(signup_intent()).await.unwrap_err();
    assert!(matches!(err, DispatchError::Persistence(_)));

    // The persistence write was attempted, the transport never was.
    assert_eq!(env.mail_store.create_calls.load(Ordering::SeqCst), 1);
    assert!(env.mailer.sent().is_empty());
}

#[tokio::test]
async fn transport_failure_marks_record_failed() {
    let env = TestEnv::new(FlakyMailStore::default(), RecordingMailer::failing());

    let err = env.dispatcher.dispatch(signup_intent()).await.unwrap_err();
    assert!(matches!(err, DispatchError::Delivery(_)));

    // The record still exists and witnesses the failure: it captures the
    // attempt, not the success.
    assert_eq!(env.mail_store.inner.count(), 1);
    let id = env.mail_store.last_created.lock().unwrap().unwrap();
    assert_eq!(env.mail_store.inner.get(id).unwrap().status, MailStatus::Failed);
}

#[tokio::test]
async fn transport_error_is_reported_even_if_status_update_also_fails() {
    let env = TestEnv::new(FlakyMailStore::failing_update(), RecordingMailer::failing());

    let err = env.dispatcher.dispatch(signup_intent()).await.unwrap_err();

    // The caller sees the transport failure, not the best-effort
    // status-update failure.
    match err {
        DispatchError::Delivery(MailerError::Transport(msg)) => {
            assert!(msg.contains("connection refused"));
        }
        other => panic!("expected delivery error, got: {other:?}"),
    }
    assert_eq!(env.mail_store.inner.count(), 1);
}

#[tokio::test]
async fn identical_concurrent_intents_are_not_deduplicated() {
    let env = TestEnv::new(FlakyMailStore::default(), RecordingMailer::default());

    let (a, b) = tokio::join!(
        env.dispatcher.dispatch(signup_intent()),
        env.dispatcher.dispatch(signup_intent())
    );

    let a = a.unwrap();
    let b = b.unwrap();
    assert_ne!(a.record_id, b.record_id);
    assert_eq!(env.mail_store.inner.count(), 2);
    assert_eq!(env.mailer.sent().len(), 2);
}

#[tokio::test]
async fn dispatcher_stats_track_outcomes() {
    let env = TestEnv::new(FlakyMailStore::default(), RecordingMailer::default());

    env.dispatcher.dispatch(signup_intent()).await.unwrap();

    let mut bogus = signup_intent();
    bogus.type_tag = "bogus".to_string();
    let _ = env.dispatcher.dispatch(bogus).await;

    let stats = env.dispatcher.stats();
    assert_eq!(stats.total_dispatched, 2);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.rendering_failures, 1);
    assert_eq!(stats.persistence_failures, 0);
    assert_eq!(stats.delivery_failures, 0);
}

// =============================================================================
// gRPC adapter
// =============================================================================

fn grpc_request(type_tag: &str) -> Request<SendNotificationRequest> {
    Request::new(SendNotificationRequest {
        to: "a@x.com".to_string(),
        subject: "Welcome".to_string(),
        r#type: type_tag.to_string(),
        body: "plain text".to_string(),
        name: "Ada".to_string(),
        metadata: HashMap::from([("link".to_string(), "https://x".to_string())]),
    })
}

#[tokio::test]
async fn grpc_send_notification_delivers() {
    let env = TestEnv::new(FlakyMailStore::default(), RecordingMailer::default());
    let service = NotificationGrpcService::new(env.dispatcher.clone());

    let response = service
        .send_notification(grpc_request("account-signup"))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.status_code, 200);

    let sends = env.mailer.sent();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].text_body, "plain text");
    // Both the name field and the metadata map feed the template.
    assert_eq!(sends[0].html_body, "Hi Ada, link: https://x");
}

#[tokio::test]
async fn grpc_name_field_wins_over_metadata_name() {
    let env = TestEnv::new(FlakyMailStore::default(), RecordingMailer::default());
    let service = NotificationGrpcService::new(env.dispatcher.clone());

    let mut request = grpc_request("account-signup");
    request
        .get_mut()
        .metadata
        .insert("name".to_string(), "Impostor".to_string());

    service.send_notification(request).await.unwrap();

    let sends = env.mailer.sent();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].html_body, "Hi Ada, link: https://x");
}

#[tokio::test]
async fn grpc_failure_maps_to_internal_status() {
    let env = TestEnv::new(FlakyMailStore::default(), RecordingMailer::default());
    let service = NotificationGrpcService::new(env.dispatcher.clone());

    let status = service
        .send_notification(grpc_request("bogus"))
        .await
        .unwrap_err();

    // The two-valued status surface: detail lives in the message only.
    assert_eq!(status.code(), tonic::Code::Internal);
    assert!(status.message().contains("unknown notification type"));
    assert!(env.mailer.sent().is_empty());
}

#[tokio::test]
async fn grpc_rejects_empty_recipient() {
    let env = TestEnv::new(FlakyMailStore::default(), RecordingMailer::default());
    let service = NotificationGrpcService::new(env.dispatcher.clone());

    let mut request = grpc_request("account-signup");
    request.get_mut().to = String::new();

    let status = service.send_notification(request).await.unwrap_err();
    assert_eq!(status.code(), tonic::Code::InvalidArgument);
    assert_eq!(env.mail_store.create_calls.load(Ordering::SeqCst), 0);
}
