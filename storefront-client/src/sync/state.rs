//! Synchronizer state and the read-only views handed to the UI

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::money::line_total;
use shared::{Cart, CartLine, LineSelection};

use crate::fallback::{FallbackCart, FallbackCartLine};
use crate::identity::LocationContext;
use crate::session::OrderingSession;
use crate::totals::{CartTotals, derive_totals};

/// Lifecycle phase of a `CartSynchronizer`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPhase {
    Uninitialized,
    ResolvingLocation,
    AwaitingSession,
    /// Remote cart is the source of truth
    Ready,
    /// Local fallback cart is the source of truth for the rest of the session
    Degraded,
    /// No location could be resolved
    Failed(String),
}

/// The cart as the UI should render it
#[derive(Debug, Clone, PartialEq)]
pub enum CartView {
    Remote(Cart),
    Fallback(Vec<FallbackCartLine>),
}

impl CartView {
    pub fn items(&self) -> Vec<CartItemView> {
        match self {
            CartView::Remote(cart) => cart.lines.iter().map(CartItemView::from).collect(),
            CartView::Fallback(lines) => lines.iter().map(CartItemView::from).collect(),
        }
    }

    pub fn totals(&self, tax_rate: Decimal) -> CartTotals {
        match self {
            CartView::Remote(cart) => derive_totals(Some(cart), &cart.lines, tax_rate),
            CartView::Fallback(lines) => derive_totals(None, lines, tax_rate),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, CartView::Remote(_))
    }
}

/// One renderable cart line, whatever its source
#[derive(Debug, Clone, PartialEq)]
pub struct CartItemView {
    pub line_id: String,
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
    pub special_instructions: Option<String>,
    pub selections: Vec<LineSelection>,
}

impl From<&CartLine> for CartItemView {
    fn from(line: &CartLine) -> Self {
        Self {
            line_id: line.line_id.clone(),
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total: line_total(line.unit_price, line.quantity),
            special_instructions: line.special_instructions.clone(),
            selections: line.selections.clone(),
        }
    }
}

impl From<&FallbackCartLine> for CartItemView {
    fn from(line: &FallbackCartLine) -> Self {
        Self {
            line_id: line.line_id.clone(),
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total: line_total(line.unit_price, line.quantity),
            special_instructions: line.special_instructions.clone(),
            selections: line.selections.clone(),
        }
    }
}

/// Everything the UI reads, captured at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct CartSnapshot {
    pub phase: SyncPhase,
    pub using_api: bool,
    pub location_id: Option<String>,
    pub cart_id: Option<String>,
    pub cart: CartView,
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub totals: CartTotals,
    pub checkout_url: Option<String>,
    pub is_loading: bool,
    pub busy_item_id: Option<String>,
    pub error: Option<String>,
    pub session_error: Option<String>,
    pub is_cart_open: bool,
}

/// What happened to a remote cart response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Applied {
    /// Newest response so far; replaced the cached cart
    Replaced,
    /// Older than the cached cart but newest for its line; only that line
    /// was taken
    Merged,
    Discarded,
}

/// Mutable state owned by one synchronizer
#[derive(Debug)]
pub(crate) struct SyncState {
    pub phase: SyncPhase,
    pub location: LocationContext,
    pub session: Option<OrderingSession>,
    pub remote_enabled: bool,
    /// Latest remote cart
    pub cart: Option<Cart>,
    pub fallback: FallbackCart,
    pub busy_item_id: Option<String>,
    pub error: Option<String>,
    /// Remote calls in flight
    pub pending: u32,
    pub is_cart_open: bool,
    /// Sequence handed to the next remote cart request
    pub next_seq: u64,
    /// Sequence of the newest response that replaced `cart`
    pub applied_seq: u64,
    /// Per line id, sequence of the newest response that targeted it
    pub line_seq: HashMap<String, u64>,
}

impl SyncState {
    pub fn new(location: LocationContext, remote_enabled: bool) -> Self {
        Self {
            phase: SyncPhase::Uninitialized,
            location,
            session: None,
            remote_enabled,
            cart: None,
            fallback: FallbackCart::new(),
            busy_item_id: None,
            error: None,
            pending: 0,
            is_cart_open: false,
            next_seq: 1,
            applied_seq: 0,
            line_seq: HashMap::new(),
        }
    }

    /// usingApi: location resolved, remote enabled, resolution complete
    pub fn using_api(&self) -> bool {
        self.location.is_resolved() && self.remote_enabled && self.phase == SyncPhase::Ready
    }

    pub fn cart_id(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.cart_id())
    }

    pub fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Take a remote cart response issued at `seq` for an operation on
    /// `target` (`None` for reads).
    ///
    /// The newest response replaces the cache. An older one is still newer
    /// for its own line when a later request on another line overtook it;
    /// then only that line is merged in and the cart-level amounts are
    /// dropped so they get derived from the lines. A response older than
    /// the last one applied for the same line is discarded.
    pub fn apply_cart(&mut self, seq: u64, target: Option<&str>, cart: Cart) -> Applied {
        if let Some(line_id) = target
            && self.line_seq.get(line_id).is_some_and(|&newest| seq < newest)
        {
            return Applied::Discarded;
        }

        if seq > self.applied_seq {
            self.applied_seq = seq;
            if let Some(line_id) = target {
                self.line_seq.insert(line_id.to_string(), seq);
            }
            self.cart = Some(cart);
            return Applied::Replaced;
        }

        let (Some(line_id), Some(cached)) = (target, self.cart.as_mut()) else {
            return Applied::Discarded;
        };
        if cached.id != cart.id {
            return Applied::Discarded;
        }
        match cart.line(line_id) {
            Some(incoming) => match cached.lines.iter_mut().find(|l| l.line_id == line_id) {
                Some(line) => *line = incoming.clone(),
                None => cached.lines.push(incoming.clone()),
            },
            None => cached.lines.retain(|l| l.line_id != line_id),
        }
        cached.subtotal = None;
        cached.discount = None;
        cached.tax = None;
        cached.total = None;
        cached.total_quantity = None;
        self.line_seq.insert(line_id.to_string(), seq);
        Applied::Merged
    }

    /// Drop the cached cart and the cart id held by the session
    pub fn reset_cart(&mut self) {
        self.cart = None;
        self.line_seq.clear();
        if let Some(session) = self.session.as_mut() {
            session.forget_cart();
        }
    }

    pub fn view(&self) -> CartView {
        match (&self.cart, self.using_api()) {
            (Some(cart), true) => CartView::Remote(cart.clone()),
            _ => CartView::Fallback(self.fallback.lines().to_vec()),
        }
    }

    pub fn snapshot(&self, tax_rate: Decimal) -> CartSnapshot {
        let cart = self.view();
        let items = cart.items();
        let totals = cart.totals(tax_rate);
        let checkout_url = match &cart {
            CartView::Remote(c) => c.checkout_url.clone(),
            CartView::Fallback(_) => None,
        };
        CartSnapshot {
            phase: self.phase.clone(),
            using_api: self.using_api(),
            location_id: self.location.location_id().map(str::to_string),
            cart_id: self.cart_id().map(str::to_string),
            items,
            item_count: totals.quantity,
            totals,
            checkout_url,
            cart,
            is_loading: self.pending > 0,
            busy_item_id: self.busy_item_id.clone(),
            error: self.error.clone(),
            session_error: self
                .session
                .as_ref()
                .and_then(|s| s.session_error())
                .map(str::to_string),
            is_cart_open: self.is_cart_open,
        }
    }
}
