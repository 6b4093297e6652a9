use std::sync::Arc;

use crate::auth::JwtValidator;
use crate::config::Settings;
use crate::mailer::create_mailer;
use crate::notification::Dispatcher;
use crate::store::{create_stores, NotificationStore};
use crate::template::TemplateStore;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub jwt_validator: Arc<JwtValidator>,
    pub notification_store: Arc<dyn NotificationStore>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Build the application state: collaborators are constructed once here
    /// and injected, never reached through globals.
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let jwt_validator = Arc::new(JwtValidator::new(&settings.jwt));

        let templates = Arc::new(TemplateStore::new(&settings.template.dir));
        // Fail closed on an incomplete template set instead of failing on
        // the first affected request.
        templates.verify_all()?;

        let (notification_store, mail_store) = create_stores(&settings.database).await?;
        let mailer = create_mailer(&settings.smtp)?;

        let dispatcher = Arc::new(Dispatcher::new(templates, mail_store, mailer));

        Ok(Self {
            settings: Arc::new(settings),
            jwt_validator,
            notification_store,
            dispatcher,
        })
    }
}
