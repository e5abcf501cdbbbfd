//! Ordering session bootstrap
//!
//! Starts (or resumes) the server-side ordering session for a location. A
//! persisted cart id is offered as a hint so a returning visitor gets their
//! cart back.

use std::sync::Arc;

use shared::util::non_blank;
use shared::{FulfillmentMethod, StartSessionRequest};

use crate::api::OrderingApi;
use crate::error::{ClientError, ClientResult};

/// Options of `SessionBootstrapper::start`
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub existing_cart_id: Option<String>,
    pub fulfillment_method: FulfillmentMethod,
}

/// Outcome of a session start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStart {
    pub cart_id: Option<String>,
    /// Soft failure: ordering unavailable, menu still browsable
    pub session_error: Option<String>,
}

/// Server-side ordering session for one location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingSession {
    location_id: String,
    cart_id: Option<String>,
    session_error: Option<String>,
    fulfillment_method: FulfillmentMethod,
}

impl OrderingSession {
    pub fn new(location_id: impl Into<String>, fulfillment_method: FulfillmentMethod) -> Self {
        Self {
            location_id: location_id.into(),
            cart_id: None,
            session_error: None,
            fulfillment_method,
        }
    }

    /// Session built from a bootstrap outcome
    pub fn from_start(
        location_id: impl Into<String>,
        fulfillment_method: FulfillmentMethod,
        start: SessionStart,
    ) -> Self {
        let mut session = Self::new(location_id, fulfillment_method);
        if let Some(id) = start.cart_id {
            session.adopt_cart_id(id);
        }
        session.session_error = start.session_error;
        session
    }

    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    pub fn cart_id(&self) -> Option<&str> {
        self.cart_id.as_deref()
    }

    pub fn session_error(&self) -> Option<&str> {
        self.session_error.as_deref()
    }

    pub fn fulfillment_method(&self) -> FulfillmentMethod {
        self.fulfillment_method
    }

    /// Menu-only: the server declined to provide a cart
    pub fn is_menu_only(&self) -> bool {
        self.cart_id.is_none() && self.session_error.is_some()
    }

    /// Adopt a cart id. The first id wins; returns the id in effect.
    pub fn adopt_cart_id(&mut self, cart_id: impl Into<String>) -> &str {
        if self.cart_id.is_none() {
            self.cart_id = Some(cart_id.into());
        }
        self.cart_id.as_deref().unwrap_or_default()
    }

    /// Drop the cart id (cart cleared, deleted or checked out)
    pub fn forget_cart(&mut self) {
        self.cart_id = None;
    }
}

/// Starts ordering sessions against the remote API
#[derive(Clone)]
pub struct SessionBootstrapper {
    api: Arc<dyn OrderingApi>,
}

impl SessionBootstrapper {
    pub fn new(api: Arc<dyn OrderingApi>) -> Self {
        Self { api }
    }

    /// Start or resume the session for `location_id`
    ///
    /// A response with neither cart id nor error is reported as
    /// `InvalidResponse`. No retries happen here.
    pub async fn start(&self, location_id: &str, options: StartOptions) -> ClientResult<SessionStart> {
        let request = StartSessionRequest {
            existing_cart_id: options.existing_cart_id.clone(),
            fulfillment_method: options.fulfillment_method,
        };

        let response = self.api.start_session(location_id, &request).await?;

        let cart_id = non_blank(response.cart_id);
        let session_error = non_blank(response.error_message);

        if cart_id.is_none() && session_error.is_none() {
            return Err(ClientError::InvalidResponse(
                "ordering session returned neither cart id nor error".into(),
            ));
        }

        match (&cart_id, &options.existing_cart_id) {
            (Some(new_id), Some(old_id)) if new_id == old_id => {
                tracing::info!(location_id = %location_id, cart_id = %new_id, "Resumed existing cart");
            }
            (Some(new_id), _) => {
                tracing::info!(location_id = %location_id, cart_id = %new_id, "Ordering session started");
            }
            (None, _) => {
                tracing::warn!(
                    location_id = %location_id,
                    error = ?session_error,
                    "Ordering unavailable, menu-only mode"
                );
            }
        }

        Ok(SessionStart {
            cart_id,
            session_error,
        })
    }
}
