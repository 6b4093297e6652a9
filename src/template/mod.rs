//! Email template resolution and rendering.
//!
//! This module provides:
//! - The closed set of notification types (`TemplateKind`) with an exhaustive
//!   mapping from each type to its backing template asset
//! - A file-backed template store with read-through memoization
//! - The variable substitution engine for `{{variable}}` placeholders
//!
//! An unknown type tag and a missing template asset are distinct failures:
//! the first is caller input that must be rejected, the second is a
//! deployment-consistency fault. `TemplateStore::verify_all` checks the full
//! mapping at startup so the second kind cannot surface at request time.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Template-specific error type
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The type tag is outside the closed set of notification types.
    #[error("unknown notification type: {0}")]
    UnknownType(String),

    /// The type is known but its backing asset could not be read.
    /// This is a deployment fault, not caller input.
    #[error("template asset missing for {kind}: {reason}")]
    Missing { kind: TemplateKind, reason: String },
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// The closed set of notification types this service can render.
///
/// Every variant maps to exactly one template asset; the mapping is
/// exhaustive by construction, so adding a variant without an asset name
/// fails to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateKind {
    PasswordReset,
    DeactivateAccount,
    DeleteAccount,
    AccountSignup,
    TwoFactorAuth,
    TwoFactorLogin,
    Subscription,
    SubscriptionDue,
    AlbumInvitation,
}

impl TemplateKind {
    /// All variants, in declaration order. Used for startup verification.
    pub const ALL: [TemplateKind; 9] = [
        TemplateKind::PasswordReset,
        TemplateKind::DeactivateAccount,
        TemplateKind::DeleteAccount,
        TemplateKind::AccountSignup,
        TemplateKind::TwoFactorAuth,
        TemplateKind::TwoFactorLogin,
        TemplateKind::Subscription,
        TemplateKind::SubscriptionDue,
        TemplateKind::AlbumInvitation,
    ];

    /// The wire tag for this type.
    pub fn as_tag(&self) -> &'static str {
        match self {
            TemplateKind::PasswordReset => "password-reset",
            TemplateKind::DeactivateAccount => "deactivate-account",
            TemplateKind::DeleteAccount => "delete-account",
            TemplateKind::AccountSignup => "account-signup",
            TemplateKind::TwoFactorAuth => "two-factor-auth",
            TemplateKind::TwoFactorLogin => "two-factor-login",
            TemplateKind::Subscription => "subscription",
            TemplateKind::SubscriptionDue => "subscription-due",
            TemplateKind::AlbumInvitation => "album-invitation",
        }
    }

    /// Logical name of the backing template asset.
    pub fn asset_name(&self) -> &'static str {
        match self {
            TemplateKind::PasswordReset => "reset.password.html",
            TemplateKind::DeactivateAccount => "deactivate.account.html",
            TemplateKind::DeleteAccount => "delete.account.html",
            TemplateKind::AccountSignup => "account.signup.html",
            TemplateKind::TwoFactorAuth => "twofactor.auth.html",
            TemplateKind::TwoFactorLogin => "twofactor.login.html",
            TemplateKind::Subscription => "subscription.html",
            TemplateKind::SubscriptionDue => "subscription.due.html",
            TemplateKind::AlbumInvitation => "album.invitation.html",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for TemplateKind {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateKind::ALL
            .iter()
            .find(|kind| kind.as_tag() == s)
            .copied()
            .ok_or_else(|| TemplateError::UnknownType(s.to_string()))
    }
}

/// File-backed template store.
///
/// Loads template text by the logical asset name of a `TemplateKind` and
/// memoizes the loaded text. The cache is a performance optimization only;
/// correctness never depends on it.
pub struct TemplateStore {
    dir: PathBuf,
    cache: DashMap<TemplateKind, Arc<str>>,
}

impl TemplateStore {
    /// Create a store reading assets from `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            cache: DashMap::new(),
        }
    }

    /// Resolve a wire type tag to template text.
    ///
    /// Fails with `UnknownType` for tags outside the closed set and with
    /// `Missing` when the mapped asset has no backing content.
    pub fn resolve(&self, type_tag: &str) -> TemplateResult<Arc<str>> {
        let kind = type_tag.parse::<TemplateKind>()?;
        self.load(kind)
    }

    /// Load the template text for a known type.
    pub fn load(&self, kind: TemplateKind) -> TemplateResult<Arc<str>> {
        if let Some(text) = self.cache.get(&kind) {
            return Ok(text.clone());
        }

        let path = self.dir.join(kind.asset_name());
        let text = std::fs::read_to_string(&path).map_err(|e| TemplateError::Missing {
            kind,
            reason: format!("{}: {}", path.display(), e),
        })?;

        let text: Arc<str> = Arc::from(text.as_str());
        self.cache.insert(kind, text.clone());
        Ok(text)
    }

    /// Verify that every notification type has a backing asset.
    ///
    /// Called at startup so a deployment with an incomplete template set
    /// fails closed instead of failing on the first affected request.
    pub fn verify_all(&self) -> TemplateResult<()> {
        for kind in TemplateKind::ALL {
            self.load(kind)?;
        }
        Ok(())
    }
}

/// Substitute `{{key}}` placeholders in a template.
///
/// Every occurrence of a bound placeholder is replaced; placeholders with no
/// corresponding key are left verbatim. Values are inserted literally —
/// callers are responsible for pre-sanitizing variable values for the output
/// markup.
pub fn render(template: &str, variables: &HashMap<String, String>) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let pattern = format!("{{{{{}}}}}", key);
        result = result.replace(&pattern, value);
    }

    result
}
