use std::collections::HashMap;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::server::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Display name, used for template personalization
    #[serde(default)]
    pub name: Option<String>,
    /// Account email
    #[serde(default)]
    pub email: Option<String>,
    /// Additional custom claims
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }

    /// Display name for templates; the original service used this default
    /// for tokens without a name claim.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Beloved User")
    }

    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}

/// Bearer-token extractor for HTTP handlers.
///
/// Token verification itself belongs to the identity layer; this only
/// validates the signature and lifts the claims into the request.
impl FromRequestParts<AppState> for Claims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Auth("Missing bearer token".to_string()))?;

        state.jwt_validator.validate(token)
    }
}
