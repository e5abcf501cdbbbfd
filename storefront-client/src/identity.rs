//! Location identity resolution
//!
//! The configured organization reference may be a location id or a merchant
//! slug. `IdentityResolver` tries it as a location first and falls back to
//! the merchant's main location.

use std::sync::Arc;

use crate::api::OrderingApi;
use crate::error::{ClientError, ClientResult};

/// Resolution progress of a `LocationContext`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionState {
    Resolving,
    Resolved,
    Failed(String),
}

/// Organization → location binding for one storefront session
///
/// The location id is immutable once resolved (first writer wins).
#[derive(Debug, Clone)]
pub struct LocationContext {
    organization_slug: String,
    location_id: Option<String>,
    state: ResolutionState,
}

impl LocationContext {
    pub fn new(organization_slug: impl Into<String>) -> Self {
        Self {
            organization_slug: organization_slug.into(),
            location_id: None,
            state: ResolutionState::Resolving,
        }
    }

    pub fn organization_slug(&self) -> &str {
        &self.organization_slug
    }

    pub fn location_id(&self) -> Option<&str> {
        self.location_id.as_deref()
    }

    pub fn state(&self) -> &ResolutionState {
        &self.state
    }

    pub fn is_resolved(&self) -> bool {
        self.state == ResolutionState::Resolved && self.location_id.is_some()
    }

    /// Record a resolved location id. Returns the id in effect, which is the
    /// first one ever recorded.
    pub fn mark_resolved(&mut self, location_id: impl Into<String>) -> &str {
        if self.location_id.is_none() {
            self.location_id = Some(location_id.into());
        }
        self.state = ResolutionState::Resolved;
        self.location_id.as_deref().unwrap_or_default()
    }

    /// Record a failure; ignored once resolved
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        if !self.is_resolved() {
            self.state = ResolutionState::Failed(reason.into());
        }
    }
}

/// Turns an organization reference into a concrete location id
#[derive(Clone)]
pub struct IdentityResolver {
    api: Arc<dyn OrderingApi>,
}

impl IdentityResolver {
    pub fn new(api: Arc<dyn OrderingApi>) -> Self {
        Self { api }
    }

    /// Resolve `org_slug` to a location id
    ///
    /// 1. direct location lookup with the slug as id
    /// 2. merchant lookup; its main location, else its first location
    ///
    /// A blank slug fails without any network call.
    pub async fn resolve(&self, org_slug: &str) -> ClientResult<String> {
        let slug = org_slug.trim();
        if slug.is_empty() {
            return Err(ClientError::Resolution(
                "no organization configured".to_string(),
            ));
        }

        let direct_err = match self.api.get_location(slug).await {
            Ok(location) if !location.id.is_empty() => {
                tracing::debug!(slug = %slug, location_id = %location.id, "Resolved location directly");
                return Ok(location.id);
            }
            Ok(_) => "location record has no id".to_string(),
            Err(e) => e.user_message(),
        };

        let merchant_err = match self.api.get_merchant(slug).await {
            Ok(merchant) => match merchant.primary_location() {
                Some(location) => {
                    tracing::debug!(slug = %slug, location_id = %location.id, "Resolved location via merchant");
                    return Ok(location.id.clone());
                }
                None => format!("merchant {} has no locations", slug),
            },
            Err(e) => e.user_message(),
        };

        let reason = if direct_err.trim().is_empty() {
            merchant_err
        } else {
            direct_err
        };
        tracing::warn!(slug = %slug, reason = %reason, "Location resolution failed");
        Err(ClientError::Resolution(reason))
    }

    /// Resolve into `context`, reusing an already-resolved id
    pub async fn resolve_into(&self, context: &mut LocationContext) -> ClientResult<String> {
        if let Some(id) = context.location_id().filter(|_| context.is_resolved()) {
            return Ok(id.to_string());
        }
        let slug = context.organization_slug().to_string();
        match self.resolve(&slug).await {
            Ok(id) => Ok(context.mark_resolved(id).to_string()),
            Err(e) => {
                context.mark_failed(e.user_message());
                Err(e)
            }
        }
    }
}
