//! Cart synchronizer
//!
//! Owns the cart view exposed to the UI and decides, for every read and
//! mutation, whether the remote cart or the local fallback cart is the source
//! of truth.
//!
//! # Phases
//!
//! ```text
//! Uninitialized -> ResolvingLocation -> AwaitingSession -> Ready -> Degraded
//!                         |                                  ^          |
//!                         v                                  +-clear----+
//!                       Failed
//! ```
//!
//! - Any remote failure while `Ready` moves to `Degraded`. The move is
//!   one-way; only `clear_cart()` re-arms remote mode.
//! - Mutations never return errors. Failures become state (`error` plus the
//!   `Degraded` phase) and the user's intent is replayed on the fallback cart.
//! - At most one line is busy at a time. A second quantity change for the
//!   busy line is dropped.
//! - Remote cart responses carry the sequence number taken when the request
//!   was issued. The newest response replaces the cached cart. An older
//!   response still lands its own line unless a newer response for that same
//!   line was already applied.

mod state;

pub use state::{CartItemView, CartSnapshot, CartView, SyncPhase};

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use shared::money::{MAX_QUANTITY, validate_quantity};
use shared::{AddLineRequest, Cart, FulfillmentMethod};
use tokio_util::sync::CancellationToken;

use crate::api::OrderingApi;
use crate::cart_store::CartIdStore;
use crate::error::{ClientError, ClientResult};
use crate::fallback::{FallbackCart, same_selections};
use crate::identity::{IdentityResolver, LocationContext};
use crate::session::{OrderingSession, SessionBootstrapper, SessionStart, StartOptions};
use crate::totals::CartTotals;
use crate::types::{AddToCart, MutationOutcome};
use crate::StorefrontConfig;
use state::{Applied, SyncState};

/// Settings the synchronizer reads from configuration
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub organization: String,
    pub api_enabled: bool,
    pub tax_rate: Decimal,
    pub fulfillment_method: FulfillmentMethod,
}

impl From<&StorefrontConfig> for SyncSettings {
    fn from(config: &StorefrontConfig) -> Self {
        Self {
            organization: config.organization.clone(),
            api_enabled: config.api_enabled,
            tax_rate: config.tax_rate,
            fulfillment_method: config.fulfillment_method,
        }
    }
}

/// The cart reconciliation engine for one location context
pub struct CartSynchronizer {
    api: Arc<dyn OrderingApi>,
    resolver: IdentityResolver,
    bootstrapper: SessionBootstrapper,
    store: CartIdStore,
    settings: SyncSettings,
    state: Mutex<SyncState>,
    /// Serializes lazy cart provisioning so concurrent adds share one cart
    provision: tokio::sync::Mutex<()>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for CartSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSynchronizer")
            .field("settings", &self.settings)
            .field("store", &self.store)
            .field("state", &*self.state.lock())
            .finish()
    }
}

/// Keeps `is_loading` true while a remote call is in flight
struct LoadingGuard<'a> {
    state: &'a Mutex<SyncState>,
}

impl<'a> LoadingGuard<'a> {
    fn new(state: &'a Mutex<SyncState>) -> Self {
        state.lock().pending += 1;
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut st = self.state.lock();
        st.pending = st.pending.saturating_sub(1);
    }
}

/// Holds the busy slot for one line; releases it only if still ours
struct BusyGuard<'a> {
    state: &'a Mutex<SyncState>,
    line_id: String,
}

impl<'a> BusyGuard<'a> {
    fn acquire(state: &'a Mutex<SyncState>, line_id: &str) -> Option<Self> {
        let mut st = state.lock();
        if st.busy_item_id.as_deref() == Some(line_id) {
            tracing::debug!(line_id = %line_id, "Line busy, ignoring mutation");
            return None;
        }
        st.busy_item_id = Some(line_id.to_string());
        Some(Self {
            state,
            line_id: line_id.to_string(),
        })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut st = self.state.lock();
        if st.busy_item_id.as_deref() == Some(self.line_id.as_str()) {
            st.busy_item_id = None;
        }
    }
}

impl CartSynchronizer {
    pub fn new(api: Arc<dyn OrderingApi>, store: CartIdStore, settings: SyncSettings) -> Self {
        let location = LocationContext::new(settings.organization.clone());
        Self {
            resolver: IdentityResolver::new(api.clone()),
            bootstrapper: SessionBootstrapper::new(api.clone()),
            api,
            store,
            state: Mutex::new(SyncState::new(location, settings.api_enabled)),
            settings,
            provision: tokio::sync::Mutex::new(()),
            cancel: CancellationToken::new(),
        }
    }

    // ========== Lifecycle ==========

    /// Resolve the location and bootstrap the ordering session
    ///
    /// Only a resolution failure is returned as an error. A failed or
    /// menu-only bootstrap is recorded in state. Calling this again after the
    /// first run is a no-op.
    pub async fn initialize(&self) -> ClientResult<()> {
        let mut location = {
            let mut st = self.state.lock();
            if st.phase != SyncPhase::Uninitialized {
                return Ok(());
            }
            st.phase = SyncPhase::ResolvingLocation;
            st.location.clone()
        };

        let resolved = self.guarded(self.resolver.resolve_into(&mut location)).await;
        let location_id = {
            let mut st = self.state.lock();
            st.location = location;
            match resolved {
                Ok(id) => {
                    st.phase = SyncPhase::AwaitingSession;
                    id
                }
                Err(e) => {
                    let message = e.user_message();
                    tracing::error!(organization = %self.settings.organization, error = %message, "Cannot resolve location");
                    st.phase = SyncPhase::Failed(message.clone());
                    st.error = Some(message);
                    return Err(e);
                }
            }
        };
        tracing::info!(location_id = %location_id, "Location resolved");

        if !self.settings.api_enabled {
            let mut st = self.state.lock();
            st.remote_enabled = false;
            st.phase = SyncPhase::Degraded;
            st.session = Some(OrderingSession::new(
                location_id.clone(),
                self.settings.fulfillment_method,
            ));
            tracing::info!(location_id = %location_id, "Remote cart disabled by configuration");
            return Ok(());
        }

        let existing_cart_id = self.store.get(&location_id);
        let options = StartOptions {
            existing_cart_id: existing_cart_id.clone(),
            fulfillment_method: self.settings.fulfillment_method,
        };

        match self.guarded(self.bootstrapper.start(&location_id, options)).await {
            Ok(start) => {
                if let Some(cart_id) = start.cart_id.as_deref() {
                    if existing_cart_id.as_deref() != Some(cart_id) {
                        self.persist_cart_id(&location_id, Some(cart_id));
                    }
                }
                let has_cart = start.cart_id.is_some();
                {
                    let mut st = self.state.lock();
                    st.session = Some(OrderingSession::from_start(
                        location_id.clone(),
                        self.settings.fulfillment_method,
                        start,
                    ));
                    st.remote_enabled = true;
                    st.phase = SyncPhase::Ready;
                    st.fallback.clear();
                }
                if has_cart {
                    self.refresh_cart().await;
                }
            }
            Err(ClientError::Cancelled) => return Err(ClientError::Cancelled),
            Err(e) => {
                tracing::warn!(location_id = %location_id, error = %e, "Ordering session bootstrap failed");
                {
                    let mut st = self.state.lock();
                    st.session = Some(OrderingSession::new(
                        location_id.clone(),
                        self.settings.fulfillment_method,
                    ));
                }
                self.degrade(&e, |_| {});
            }
        }

        Ok(())
    }

    /// Cancel in-flight remote calls; their results are discarded
    pub fn teardown(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!("Cart synchronizer torn down");
            self.cancel.cancel();
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // ========== Mutations ==========

    /// Add an item. Never drops the item: if the remote path fails at any
    /// step, the add lands in the fallback cart.
    pub async fn add_to_cart(&self, request: AddToCart) -> MutationOutcome {
        if request.quantity == 0 || self.is_torn_down() {
            return MutationOutcome::Ignored;
        }
        if let Err(message) = validate_quantity(request.quantity) {
            self.state.lock().error = Some(message);
            return MutationOutcome::Ignored;
        }

        {
            let mut st = self.state.lock();
            if !st.using_api() {
                return match st.fallback.add(&request) {
                    Ok(_) => {
                        tracing::debug!(product_id = %request.item.product_id, quantity = request.quantity, "Added to local cart");
                        MutationOutcome::Local
                    }
                    Err(message) => {
                        st.error = Some(message);
                        MutationOutcome::Ignored
                    }
                };
            }
        }

        let _loading = LoadingGuard::new(&self.state);
        let result = self.add_remote(&request).await;

        match result {
            Ok((location_id, seq, cart)) => {
                let cart_id = cart.id.clone();
                let line_id = cart
                    .lines
                    .iter()
                    .find(|l| {
                        l.product_id == request.item.product_id
                            && same_selections(&l.selections, &request.selections)
                    })
                    .map(|l| l.line_id.clone());
                if self.apply_remote_cart(seq, line_id.as_deref(), cart) {
                    self.persist_cart_id(&location_id, Some(&cart_id));
                }
                self.state.lock().is_cart_open = true;
                MutationOutcome::Remote
            }
            Err(ClientError::Cancelled) => MutationOutcome::Ignored,
            Err(e) => {
                let mut rejected = None;
                self.degrade(&e, |fallback| {
                    if let Err(message) = fallback.add(&request) {
                        rejected = Some(message);
                    }
                });
                match rejected {
                    Some(message) => {
                        self.state.lock().error = Some(message);
                        MutationOutcome::Ignored
                    }
                    None => MutationOutcome::Local,
                }
            }
        }
    }

    async fn add_remote(&self, request: &AddToCart) -> ClientResult<(String, u64, Cart)> {
        let (location_id, cart_id) = self.ensure_cart().await?;
        let body = AddLineRequest {
            product_id: request.item.product_id.clone(),
            quantity: request.quantity,
            special_instructions: request.special_instructions.clone(),
            selections: request.selections.clone(),
        };

        let seq = self.state.lock().take_seq();
        let response = self
            .guarded(self.api.add_line(&location_id, &cart_id, &body))
            .await?;
        let cart = match response.cart {
            Some(cart) => cart,
            None => {
                tracing::debug!(cart_id = %cart_id, "Add response carried no cart, re-fetching");
                self.guarded(self.api.fetch_cart(&location_id, &cart_id))
                    .await?
            }
        };
        tracing::info!(cart_id = %cart_id, product_id = %request.item.product_id, "Added line to remote cart");
        Ok((location_id, seq, cart))
    }

    /// Set a line's quantity; `<= 0` removes the line
    pub async fn update_quantity(&self, line_id: &str, quantity: i64) -> MutationOutcome {
        if quantity <= 0 {
            return self.remove_item(line_id).await;
        }
        let quantity = match u32::try_from(quantity) {
            Ok(q) if q <= MAX_QUANTITY => q,
            _ => {
                self.state.lock().error = Some(format!(
                    "quantity exceeds maximum allowed ({}), got {}",
                    MAX_QUANTITY, quantity
                ));
                return MutationOutcome::Ignored;
            }
        };
        self.set_line_quantity(line_id, quantity).await
    }

    /// Remove a line
    pub async fn remove_item(&self, line_id: &str) -> MutationOutcome {
        self.set_line_quantity(line_id, 0).await
    }

    async fn set_line_quantity(&self, line_id: &str, quantity: u32) -> MutationOutcome {
        if self.is_torn_down() {
            return MutationOutcome::Ignored;
        }
        let Some(_busy) = BusyGuard::acquire(&self.state, line_id) else {
            return MutationOutcome::Ignored;
        };

        let target = {
            let mut st = self.state.lock();
            if !st.using_api() {
                return if st.fallback.set_quantity(line_id, quantity) {
                    MutationOutcome::Local
                } else {
                    MutationOutcome::Ignored
                };
            }
            let location_id = st.location.location_id().map(str::to_string);
            let cart_id = st.cart_id().map(str::to_string);
            match (location_id, cart_id) {
                (Some(location_id), Some(cart_id)) => (location_id, cart_id, st.take_seq()),
                _ => {
                    tracing::debug!(line_id = %line_id, "No remote cart, nothing to update");
                    return MutationOutcome::Ignored;
                }
            }
        };
        let (location_id, cart_id, seq) = target;

        let _loading = LoadingGuard::new(&self.state);
        let result = self
            .guarded(
                self.api
                    .set_line_quantity(&location_id, &cart_id, line_id, quantity),
            )
            .await;

        match result {
            Ok(cart) => {
                tracing::info!(cart_id = %cart_id, line_id = %line_id, quantity, "Updated remote line");
                self.apply_remote_cart(seq, Some(line_id), cart);
                MutationOutcome::Remote
            }
            Err(ClientError::Cancelled) => MutationOutcome::Ignored,
            Err(e) => {
                self.degrade(&e, |fallback| {
                    fallback.set_quantity(line_id, quantity);
                });
                MutationOutcome::Local
            }
        }
    }

    /// Delete the cart everywhere and re-arm remote mode
    ///
    /// The local cart is always emptied. If the remote delete fails the
    /// synchronizer degrades instead of re-arming, so the undeleted remote
    /// cart is not shown again.
    pub async fn clear_cart(&self) -> MutationOutcome {
        if self.is_torn_down() {
            return MutationOutcome::Ignored;
        }

        let (using_api, location_id, cart_id) = {
            let st = self.state.lock();
            (
                st.using_api(),
                st.location.location_id().map(str::to_string),
                st.cart_id().map(str::to_string),
            )
        };

        let mut outcome = MutationOutcome::Local;
        let mut delete_error = None;
        if let (true, Some(location_id), Some(cart_id)) = (using_api, &location_id, &cart_id) {
            let _loading = LoadingGuard::new(&self.state);
            match self
                .guarded(self.api.delete_cart(location_id, cart_id))
                .await
            {
                Ok(()) | Err(ClientError::NotFound(_)) => {
                    tracing::info!(cart_id = %cart_id, "Remote cart deleted");
                    outcome = MutationOutcome::Remote;
                }
                Err(ClientError::Cancelled) => return MutationOutcome::Ignored,
                Err(e) => {
                    tracing::warn!(cart_id = %cart_id, error = %e, "Failed to delete remote cart");
                    delete_error = Some(e);
                }
            }
        }

        if let Some(location_id) = &location_id {
            self.persist_cart_id(location_id, None);
        }

        {
            let mut st = self.state.lock();
            st.reset_cart();
            st.fallback.clear();
            st.error = None;
            if delete_error.is_none()
                && self.settings.api_enabled
                && st.location.is_resolved()
                && st.session.is_some()
            {
                if st.phase == SyncPhase::Degraded {
                    tracing::info!("Cart cleared, remote mode re-armed");
                }
                st.remote_enabled = true;
                st.phase = SyncPhase::Ready;
            }
        }

        if let Some(e) = delete_error {
            self.degrade(&e, FallbackCart::clear);
        }
        outcome
    }

    /// Re-read the remote cart
    pub async fn refresh_cart(&self) {
        let target = {
            let mut st = self.state.lock();
            if !st.using_api() {
                return;
            }
            let location_id = st.location.location_id().map(str::to_string);
            let cart_id = st.cart_id().map(str::to_string);
            match (location_id, cart_id) {
                (Some(location_id), Some(cart_id)) => (location_id, cart_id, st.take_seq()),
                _ => return,
            }
        };
        let (location_id, cart_id, seq) = target;

        let _loading = LoadingGuard::new(&self.state);
        match self
            .guarded(self.api.fetch_cart(&location_id, &cart_id))
            .await
        {
            Ok(cart) => {
                self.apply_remote_cart(seq, None, cart);
            }
            Err(ClientError::NotFound(_)) => {
                tracing::info!(cart_id = %cart_id, "Remote cart no longer exists");
                self.forget_cart(&location_id);
            }
            Err(ClientError::Cancelled) => {}
            Err(e) => self.degrade(&e, |_| {}),
        }
    }

    // ========== UI state ==========

    pub fn open_cart(&self) {
        self.state.lock().is_cart_open = true;
    }

    pub fn close_cart(&self) {
        self.state.lock().is_cart_open = false;
    }

    pub fn clear_error(&self) {
        self.state.lock().error = None;
    }

    pub fn snapshot(&self) -> CartSnapshot {
        self.state.lock().snapshot(self.settings.tax_rate)
    }

    pub fn cart(&self) -> CartView {
        self.state.lock().view()
    }

    pub fn items(&self) -> Vec<CartItemView> {
        self.cart().items()
    }

    pub fn totals(&self) -> CartTotals {
        self.cart().totals(self.settings.tax_rate)
    }

    pub fn item_count(&self) -> u32 {
        self.totals().quantity
    }

    pub fn phase(&self) -> SyncPhase {
        self.state.lock().phase.clone()
    }

    pub fn using_api(&self) -> bool {
        self.state.lock().using_api()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().pending > 0
    }

    pub fn busy_item_id(&self) -> Option<String> {
        self.state.lock().busy_item_id.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn session_error(&self) -> Option<String> {
        self.state
            .lock()
            .session
            .as_ref()
            .and_then(|s| s.session_error())
            .map(str::to_string)
    }

    pub fn is_cart_open(&self) -> bool {
        self.state.lock().is_cart_open
    }

    pub fn location_id(&self) -> Option<String> {
        self.state.lock().location.location_id().map(str::to_string)
    }

    pub fn cart_id(&self) -> Option<String> {
        self.state.lock().cart_id().map(str::to_string)
    }

    /// Snapshot of the fallback cart (empty unless degraded)
    pub fn fallback_cart(&self) -> FallbackCart {
        self.state.lock().fallback.clone()
    }

    // ========== Internals ==========

    /// Run a remote call unless the synchronizer is torn down first
    async fn guarded<T>(&self, fut: impl Future<Output = ClientResult<T>>) -> ClientResult<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ClientError::Cancelled),
            result = fut => result,
        }
    }

    /// The cart id to mutate, provisioning a cart if none is known yet.
    /// This is the only place a cart gets created.
    async fn ensure_cart(&self) -> ClientResult<(String, String)> {
        let location_id = {
            let st = self.state.lock();
            let location_id = st
                .location
                .location_id()
                .map(str::to_string)
                .ok_or_else(|| ClientError::Resolution("location not resolved".into()))?;
            if let Some(cart_id) = st.cart_id() {
                return Ok((location_id, cart_id.to_string()));
            }
            location_id
        };

        let _provisioning = self.provision.lock().await;

        {
            let st = self.state.lock();
            if let Some(cart_id) = st.cart_id() {
                return Ok((location_id, cart_id.to_string()));
            }
            if let Some(message) = st.session.as_ref().and_then(|s| s.session_error()) {
                return Err(ClientError::SessionUnavailable(message.to_string()));
            }
        }

        tracing::info!(location_id = %location_id, "Provisioning cart");
        let start = self
            .guarded(self.bootstrapper.start(
                &location_id,
                StartOptions {
                    existing_cart_id: None,
                    fulfillment_method: self.settings.fulfillment_method,
                },
            ))
            .await?;

        let cart_id = {
            let mut st = self.state.lock();
            let fulfillment = self.settings.fulfillment_method;
            match start.cart_id {
                Some(id) => st
                    .session
                    .get_or_insert_with(|| OrderingSession::new(location_id.clone(), fulfillment))
                    .adopt_cart_id(id)
                    .to_string(),
                None => {
                    let message = start
                        .session_error
                        .unwrap_or_else(|| "Ordering is currently unavailable".to_string());
                    st.session = Some(OrderingSession::from_start(
                        location_id.clone(),
                        fulfillment,
                        SessionStart {
                            cart_id: None,
                            session_error: Some(message.clone()),
                        },
                    ));
                    return Err(ClientError::SessionUnavailable(message));
                }
            }
        };

        self.persist_cart_id(&location_id, Some(&cart_id));
        Ok((location_id, cart_id))
    }

    /// Take a response into the cached cart (see `SyncState::apply_cart`).
    /// Returns whether the cart stays live afterwards.
    fn apply_remote_cart(&self, seq: u64, target: Option<&str>, mut cart: Cart) -> bool {
        let completed = {
            let mut st = self.state.lock();
            cart.lines.retain(|l| l.quantity > 0);
            match st.apply_cart(seq, target, cart) {
                Applied::Discarded => {
                    tracing::debug!(seq, applied = st.applied_seq, line_id = ?target, "Discarding stale cart response");
                    return false;
                }
                Applied::Merged => {
                    tracing::debug!(seq, line_id = ?target, "Merged late line into cached cart");
                    None
                }
                Applied::Replaced if st.cart.as_ref().is_some_and(Cart::is_completed) => {
                    st.reset_cart();
                    st.location.location_id().map(str::to_string)
                }
                Applied::Replaced => None,
            }
        };

        if let Some(location_id) = completed {
            tracing::info!(location_id = %location_id, "Cart already checked out, starting fresh");
            self.forget_cart(&location_id);
            return false;
        }
        true
    }

    /// Drop the cached cart and its id (checked out or deleted remotely)
    fn forget_cart(&self, location_id: &str) {
        {
            self.state.lock().reset_cart();
        }
        self.persist_cart_id(location_id, None);
    }

    /// Switch to the fallback cart for the rest of the session and apply the
    /// user's intent there
    fn degrade(&self, err: &ClientError, replay: impl FnOnce(&mut FallbackCart)) {
        let mut st = self.state.lock();
        if st.phase != SyncPhase::Degraded {
            tracing::warn!(
                location_id = ?st.location.location_id(),
                cart_id = ?st.cart_id(),
                error = %err,
                "Remote cart unavailable, switching to local cart"
            );
            match st.cart.take() {
                Some(cart) => st.fallback.seed_from(&cart),
                None => st.fallback.clear(),
            }
            st.remote_enabled = false;
            st.phase = SyncPhase::Degraded;
        }
        replay(&mut st.fallback);
        st.error = Some(err.user_message());
    }

    /// Write-through to the cart id store; never while degraded
    fn persist_cart_id(&self, location_id: &str, cart_id: Option<&str>) {
        if cart_id.is_some() && self.state.lock().phase == SyncPhase::Degraded {
            return;
        }
        if let Err(e) = self.store.set(location_id, cart_id) {
            tracing::warn!(location_id = %location_id, error = %e, "Failed to persist cart id");
        }
    }
}

impl Drop for CartSynchronizer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
