//! Remote ordering API surface
//!
//! `OrderingApi` is the seam between the cart engine and the network. The
//! engine only ever sees this trait, so tests drive it with an in-process
//! implementation.

use std::time::Duration;

use async_trait::async_trait;
use shared::{
    AddLineRequest, AddLineResponse, Cart, LocationRecord, MerchantRecord, SetQuantityRequest,
    StartSessionRequest, StartSessionResponse,
};

use crate::http::NetworkHttpClient;
use crate::{ClientResult, StorefrontConfig};

/// Remote ordering API
#[async_trait]
pub trait OrderingApi: Send + Sync {
    /// location-lookup(locationId)
    async fn get_location(&self, location_id: &str) -> ClientResult<LocationRecord>;

    /// merchant-lookup(slug)
    async fn get_merchant(&self, slug: &str) -> ClientResult<MerchantRecord>;

    /// start-ordering-session(locationId, {existingCartId, fulfillmentMethod})
    async fn start_session(
        &self,
        location_id: &str,
        request: &StartSessionRequest,
    ) -> ClientResult<StartSessionResponse>;

    /// fetch-cart(locationId, cartId)
    async fn fetch_cart(&self, location_id: &str, cart_id: &str) -> ClientResult<Cart>;

    /// add-line(locationId, cartId, line)
    async fn add_line(
        &self,
        location_id: &str,
        cart_id: &str,
        request: &AddLineRequest,
    ) -> ClientResult<AddLineResponse>;

    /// set-line-quantity(locationId, cartId, lineId, quantity); 0 removes the line
    async fn set_line_quantity(
        &self,
        location_id: &str,
        cart_id: &str,
        line_id: &str,
        quantity: u32,
    ) -> ClientResult<Cart>;

    /// delete-cart(locationId, cartId)
    async fn delete_cart(&self, location_id: &str, cart_id: &str) -> ClientResult<()>;
}

/// `OrderingApi` over HTTP
#[derive(Debug, Clone)]
pub struct NetworkOrderingApi {
    http: NetworkHttpClient,
}

impl NetworkOrderingApi {
    pub fn new(http: NetworkHttpClient) -> Self {
        Self { http }
    }

    /// Build from configuration
    pub fn from_config(config: &StorefrontConfig) -> ClientResult<Self> {
        let http = NetworkHttpClient::new(
            &config.api_url,
            Duration::from_millis(config.request_timeout_ms),
        )?;
        Ok(Self::new(http))
    }

    fn cart_path(location_id: &str, cart_id: &str) -> String {
        format!("api/locations/{}/carts/{}", location_id, cart_id)
    }
}

#[async_trait]
impl OrderingApi for NetworkOrderingApi {
    async fn get_location(&self, location_id: &str) -> ClientResult<LocationRecord> {
        self.http
            .get(&format!("api/locations/{}", location_id))
            .await
    }

    async fn get_merchant(&self, slug: &str) -> ClientResult<MerchantRecord> {
        self.http.get(&format!("api/merchants/{}", slug)).await
    }

    async fn start_session(
        &self,
        location_id: &str,
        request: &StartSessionRequest,
    ) -> ClientResult<StartSessionResponse> {
        self.http
            .post(
                &format!("api/locations/{}/ordering-sessions", location_id),
                request,
            )
            .await
    }

    async fn fetch_cart(&self, location_id: &str, cart_id: &str) -> ClientResult<Cart> {
        self.http.get(&Self::cart_path(location_id, cart_id)).await
    }

    async fn add_line(
        &self,
        location_id: &str,
        cart_id: &str,
        request: &AddLineRequest,
    ) -> ClientResult<AddLineResponse> {
        self.http
            .post(
                &format!("{}/lines", Self::cart_path(location_id, cart_id)),
                request,
            )
            .await
    }

    async fn set_line_quantity(
        &self,
        location_id: &str,
        cart_id: &str,
        line_id: &str,
        quantity: u32,
    ) -> ClientResult<Cart> {
        self.http
            .put(
                &format!("{}/lines/{}", Self::cart_path(location_id, cart_id), line_id),
                &SetQuantityRequest { quantity },
            )
            .await
    }

    async fn delete_cart(&self, location_id: &str, cart_id: &str) -> ClientResult<()> {
        self.http.delete(&Self::cart_path(location_id, cart_id)).await
    }
}
