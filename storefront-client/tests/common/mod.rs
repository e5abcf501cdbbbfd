//! In-process ordering API for integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use shared::{
    AddLineRequest, AddLineResponse, Cart, CartLine, CartStatus, LocationRecord, MerchantRecord,
    StartSessionRequest, StartSessionResponse,
};
use storefront_client::{
    AddToCart, CartIdStore, CartSynchronizer, ClientError, ClientResult, MenuItem, OrderingApi,
    StorefrontConfig, StorefrontContext,
};
use tokio::sync::Notify;

pub const API_URL: &str = "http://ordering.test";

/// Operation names used for failures, gates and call counts
pub const GET_LOCATION: &str = "get_location";
pub const GET_MERCHANT: &str = "get_merchant";
pub const START_SESSION: &str = "start_session";
pub const FETCH_CART: &str = "fetch_cart";
pub const ADD_LINE: &str = "add_line";
pub const SET_QUANTITY: &str = "set_line_quantity";
pub const DELETE_CART: &str = "delete_cart";

/// How a scripted failure surfaces
#[derive(Debug, Clone)]
pub enum Failure {
    Internal(String),
    NotFound,
    Api { code: i32, message: String },
}

impl Failure {
    fn to_error(&self) -> ClientError {
        match self {
            Failure::Internal(msg) => ClientError::Internal(msg.clone()),
            Failure::NotFound => ClientError::NotFound("not found".into()),
            Failure::Api { code, message } => ClientError::Api {
                code: *code,
                message: message.clone(),
            },
        }
    }
}

/// What `start_session` answers
#[derive(Debug, Clone)]
pub enum SessionReply {
    /// Resume the hinted cart if known, otherwise create one
    Cart,
    /// Menu-only: no cart, this message
    Closed(String),
    /// Neither cart id nor message
    Empty,
}

/// Holds one call of an operation until released
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
struct FakeState {
    locations: HashMap<String, LocationRecord>,
    merchants: HashMap<String, MerchantRecord>,
    catalog: HashMap<String, (String, Decimal)>,
    session_reply: Option<SessionReply>,
    carts: HashMap<String, Cart>,
    next_cart: u32,
    next_line: u32,
    omit_cart_in_add: bool,
    failures: HashMap<&'static str, Failure>,
    gates: HashMap<&'static str, Arc<Gate>>,
    /// Gated ops whose change is made when the gate opens, not on arrival
    apply_on_release: HashSet<&'static str>,
    calls: HashMap<&'static str, usize>,
    session_requests: Vec<StartSessionRequest>,
}

/// Scriptable `OrderingApi`
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    /// A single location `location_id` with the default catalog
    pub fn with_location(location_id: &str) -> Arc<Self> {
        let api = Self::default();
        api.add_location(location_id, location_id, true);
        {
            let mut st = api.state.lock();
            st.catalog
                .insert("burger".into(), ("Burger".into(), Decimal::new(950, 2)));
            st.catalog
                .insert("fries".into(), ("Fries".into(), Decimal::new(325, 2)));
            st.catalog
                .insert("soda".into(), ("Soda".into(), Decimal::new(200, 2)));
        }
        Arc::new(api)
    }

    pub fn add_location(&self, id: &str, name: &str, is_main_location: bool) {
        self.state.lock().locations.insert(
            id.to_string(),
            LocationRecord {
                id: id.to_string(),
                name: Some(name.to_string()),
                is_main_location,
            },
        );
    }

    pub fn add_merchant(&self, slug: &str, locations: Vec<LocationRecord>) {
        self.state.lock().merchants.insert(
            slug.to_string(),
            MerchantRecord {
                slug: Some(slug.to_string()),
                locations,
            },
        );
    }

    pub fn set_session_reply(&self, reply: SessionReply) {
        self.state.lock().session_reply = Some(reply);
    }

    pub fn omit_cart_in_add_response(&self) {
        self.state.lock().omit_cart_in_add = true;
    }

    /// Make `op` fail until `heal(op)`
    pub fn fail(&self, op: &'static str, failure: Failure) {
        self.state.lock().failures.insert(op, failure);
    }

    pub fn heal(&self, op: &'static str) {
        self.state.lock().failures.remove(op);
    }

    /// Hold the next call of `op` until the returned gate is released
    pub fn hold(&self, op: &'static str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.state.lock().gates.insert(op, gate.clone());
        gate
    }

    /// Hold the next call of `op` before the server acts on it; the change
    /// and the response happen only once the gate is released
    pub fn hold_unapplied(&self, op: &'static str) -> Arc<Gate> {
        let gate = self.hold(op);
        self.state.lock().apply_on_release.insert(op);
        gate
    }

    pub fn calls(&self, op: &'static str) -> usize {
        self.state.lock().calls.get(op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.values().sum()
    }

    pub fn session_requests(&self) -> Vec<StartSessionRequest> {
        self.state.lock().session_requests.clone()
    }

    pub fn cart(&self, cart_id: &str) -> Option<Cart> {
        self.state.lock().carts.get(cart_id).cloned()
    }

    pub fn cart_count(&self) -> usize {
        self.state.lock().carts.len()
    }

    /// Insert or replace a server-side cart
    pub fn put_cart(&self, cart: Cart) {
        self.state.lock().carts.insert(cart.id.clone(), cart);
    }

    /// Count the call, then fail or pass through the gate
    async fn enter(&self, op: &'static str) -> ClientResult<()> {
        let (failure, gate) = {
            let mut st = self.state.lock();
            *st.calls.entry(op).or_default() += 1;
            (st.failures.get(op).cloned(), st.gates.remove(op))
        };
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        match failure {
            Some(f) => Err(f.to_error()),
            None => Ok(()),
        }
    }

    /// Like `enter`, but the response is computed before the gate opens so a
    /// held call returns the cart as it was when the request arrived (unless
    /// held with `hold_unapplied`)
    async fn respond<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut FakeState) -> ClientResult<T>,
    ) -> ClientResult<T> {
        let mut apply = Some(f);
        let (failure, gate, result) = {
            let mut st = self.state.lock();
            *st.calls.entry(op).or_default() += 1;
            let failure = st.failures.get(op).cloned();
            let gate = st.gates.remove(op);
            let deferred = gate.is_some() && st.apply_on_release.remove(op);
            let result = match (&failure, deferred, apply.take()) {
                (None, false, Some(f)) => Some(f(&mut *st)),
                (_, _, f) => {
                    apply = f;
                    None
                }
            };
            (failure, gate, result)
        };
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if let Some(f) = failure {
            return Err(f.to_error());
        }
        match (result, apply) {
            (Some(result), _) => result,
            (None, Some(f)) => f(&mut *self.state.lock()),
            (None, None) => Err(ClientError::Internal("unreachable".into())),
        }
    }
}

fn not_found(what: &str) -> ClientError {
    ClientError::NotFound(format!("{} not found", what))
}

#[async_trait]
impl OrderingApi for FakeApi {
    async fn get_location(&self, location_id: &str) -> ClientResult<LocationRecord> {
        self.enter(GET_LOCATION).await?;
        self.state
            .lock()
            .locations
            .get(location_id)
            .cloned()
            .ok_or_else(|| not_found("location"))
    }

    async fn get_merchant(&self, slug: &str) -> ClientResult<MerchantRecord> {
        self.enter(GET_MERCHANT).await?;
        self.state
            .lock()
            .merchants
            .get(slug)
            .cloned()
            .ok_or_else(|| not_found("merchant"))
    }

    async fn start_session(
        &self,
        location_id: &str,
        request: &StartSessionRequest,
    ) -> ClientResult<StartSessionResponse> {
        let location_id = location_id.to_string();
        let request = request.clone();
        self.respond(START_SESSION, move |st| {
            st.session_requests.push(request.clone());
            match st.session_reply.clone().unwrap_or(SessionReply::Cart) {
                SessionReply::Closed(message) => Ok(StartSessionResponse {
                    cart_id: None,
                    error_message: Some(message),
                }),
                SessionReply::Empty => Ok(StartSessionResponse::default()),
                SessionReply::Cart => {
                    if let Some(existing) = request.existing_cart_id.as_ref()
                        && st.carts.contains_key(existing)
                    {
                        return Ok(StartSessionResponse {
                            cart_id: Some(existing.clone()),
                            error_message: None,
                        });
                    }
                    st.next_cart += 1;
                    let id = format!("cart-{}", st.next_cart);
                    st.carts.insert(id.clone(), Cart::empty(id.clone(), location_id));
                    Ok(StartSessionResponse {
                        cart_id: Some(id),
                        error_message: None,
                    })
                }
            }
        })
        .await
    }

    async fn fetch_cart(&self, _location_id: &str, cart_id: &str) -> ClientResult<Cart> {
        let cart_id = cart_id.to_string();
        self.respond(FETCH_CART, move |st| {
            st.carts.get(&cart_id).cloned().ok_or_else(|| not_found("cart"))
        })
        .await
    }

    async fn add_line(
        &self,
        _location_id: &str,
        cart_id: &str,
        request: &AddLineRequest,
    ) -> ClientResult<AddLineResponse> {
        let cart_id = cart_id.to_string();
        let request = request.clone();
        self.respond(ADD_LINE, move |st| {
            let (name, price) = st
                .catalog
                .get(&request.product_id)
                .cloned()
                .unwrap_or_else(|| (request.product_id.clone(), Decimal::ZERO));
            let unit_price = price
                + request
                    .selections
                    .iter()
                    .map(|s| s.price_modifier)
                    .sum::<Decimal>();
            st.next_line += 1;
            let line_id = format!("line-{}", st.next_line);
            let omit = st.omit_cart_in_add;
            let cart = st.carts.get_mut(&cart_id).ok_or_else(|| not_found("cart"))?;
            match cart
                .lines
                .iter_mut()
                .find(|l| l.product_id == request.product_id && l.selections == request.selections)
            {
                Some(line) => line.quantity += request.quantity,
                None => cart.lines.push(CartLine {
                    line_id,
                    product_id: request.product_id.clone(),
                    name,
                    unit_price,
                    quantity: request.quantity,
                    special_instructions: request.special_instructions.clone(),
                    selections: request.selections.clone(),
                }),
            }
            cart.total_quantity = Some(cart.lines.iter().map(|l| l.quantity).sum());
            Ok(AddLineResponse {
                cart: if omit { None } else { Some(cart.clone()) },
            })
        })
        .await
    }

    async fn set_line_quantity(
        &self,
        _location_id: &str,
        cart_id: &str,
        line_id: &str,
        quantity: u32,
    ) -> ClientResult<Cart> {
        let cart_id = cart_id.to_string();
        let line_id = line_id.to_string();
        self.respond(SET_QUANTITY, move |st| {
            let cart = st.carts.get_mut(&cart_id).ok_or_else(|| not_found("cart"))?;
            let index = cart
                .lines
                .iter()
                .position(|l| l.line_id == line_id)
                .ok_or_else(|| not_found("line"))?;
            if quantity == 0 {
                cart.lines.remove(index);
            } else {
                cart.lines[index].quantity = quantity;
            }
            cart.total_quantity = Some(cart.lines.iter().map(|l| l.quantity).sum());
            Ok(cart.clone())
        })
        .await
    }

    async fn delete_cart(&self, _location_id: &str, cart_id: &str) -> ClientResult<()> {
        let cart_id = cart_id.to_string();
        self.respond(DELETE_CART, move |st| {
            st.carts
                .remove(&cart_id)
                .map(|_| ())
                .ok_or_else(|| not_found("cart"))
        })
        .await
    }
}

// ========== Helpers ==========

pub fn config(organization: &str) -> StorefrontConfig {
    StorefrontConfig::new(API_URL, organization)
}

pub fn memory_store() -> CartIdStore {
    CartIdStore::open_in_memory("test:cart").expect("in-memory store")
}

pub async fn mount(api: &Arc<FakeApi>, store: CartIdStore) -> StorefrontContext {
    mount_config(api, store, config("L1")).await
}

pub async fn mount_config(
    api: &Arc<FakeApi>,
    store: CartIdStore,
    config: StorefrontConfig,
) -> StorefrontContext {
    let api: Arc<dyn OrderingApi> = api.clone();
    StorefrontContext::mount_with(config, api, store)
        .await
        .expect("mount")
}

/// Synchronizer mounted on location `L1` with an in-memory store
pub async fn ready_cart(api: &Arc<FakeApi>) -> (StorefrontContext, Arc<CartSynchronizer>) {
    let ctx = mount(api, memory_store()).await;
    let cart = ctx.cart();
    (ctx, cart)
}

pub fn burger() -> MenuItem {
    MenuItem::new("burger", "Burger", Decimal::new(950, 2))
}

pub fn fries() -> MenuItem {
    MenuItem::new("fries", "Fries", Decimal::new(325, 2))
}

pub fn add(item: MenuItem, quantity: u32) -> AddToCart {
    AddToCart::new(item, quantity)
}

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal literal")
}

pub fn cart_with_status(id: &str, status: CartStatus) -> Cart {
    let mut cart = Cart::empty(id, "L1");
    cart.status = status;
    cart
}
