use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::metrics;
use crate::notification::{Dispatcher, NotificationIntent};

use super::proto::notification_service_server::NotificationService;
use super::proto::{SendNotificationRequest, SendNotificationResponse};

/// gRPC adapter for the dispatch pipeline.
///
/// Stateless; safe to invoke concurrently.
pub struct NotificationGrpcService {
    dispatcher: Arc<Dispatcher>,
}

impl NotificationGrpcService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[tonic::async_trait]
impl NotificationService for NotificationGrpcService {
    #[tracing::instrument(
        name = "grpc.send_notification",
        skip(self, request),
        fields(type_tag = %request.get_ref().r#type)
    )]
    async fn send_notification(
        &self,
        request: Request<SendNotificationRequest>,
    ) -> Result<Response<SendNotificationResponse>, Status> {
        let req = request.into_inner();

        if req.to.is_empty() {
            return Err(Status::invalid_argument("to is required"));
        }

        // Caller identity travels in the message itself on this surface;
        // the name field wins over a metadata entry on key collision.
        let mut variables = req.metadata;
        variables.insert("name".to_string(), req.name);

        let intent = NotificationIntent {
            to: req.to,
            subject: req.subject,
            type_tag: req.r#type,
            variables,
            plain_body: req.body,
            // User lookup belongs to the identity layer, which this entry
            // point does not pass through.
            user_id: None,
        };

        match self.dispatcher.dispatch(intent).await {
            Ok(receipt) => {
                metrics::GRPC_SEND_TOTAL.with_label_values(&["ok"]).inc();
                Ok(Response::new(SendNotificationResponse {
                    status_code: 200,
                    message: format!(
                        "Notification sent to {} with subject: {}",
                        receipt.recipient, receipt.subject
                    ),
                }))
            }
            Err(e) => {
                // The status surface is two-valued; the failure kind is
                // preserved in the message and the dispatch logs.
                metrics::GRPC_SEND_TOTAL.with_label_values(&["error"]).inc();
                Err(Status::internal(format!(
                    "failed to send notification: {}",
                    e
                )))
            }
        }
    }
}
