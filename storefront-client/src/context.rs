//! Storefront context
//!
//! Owns one `CartSynchronizer` per location context. Built at storefront
//! mount, torn down when the location changes or the context is dropped.

use std::sync::Arc;

use crate::api::{NetworkOrderingApi, OrderingApi};
use crate::cart_store::CartIdStore;
use crate::error::ClientResult;
use crate::sync::{CartSynchronizer, SyncSettings};
use crate::StorefrontConfig;

/// Injected handle to the cart engine for one storefront session
pub struct StorefrontContext {
    config: StorefrontConfig,
    api: Arc<dyn OrderingApi>,
    store: CartIdStore,
    cart: Arc<CartSynchronizer>,
}

impl std::fmt::Debug for StorefrontContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontContext")
            .field("organization", &self.config.organization)
            .field("cart", &self.cart)
            .finish()
    }
}

impl StorefrontContext {
    /// Mount against the network API described by `config`
    ///
    /// Durable cart ids are kept under `config.data_dir` when set. A store
    /// that cannot be opened is replaced by the unavailable store; the cart
    /// still works, it just won't survive a restart.
    pub async fn mount(config: StorefrontConfig) -> ClientResult<Self> {
        let api: Arc<dyn OrderingApi> = Arc::new(NetworkOrderingApi::from_config(&config)?);
        let store = match config.cart_store_path() {
            Some(path) => match CartIdStore::open(&path, config.cart_key_prefix.clone()) {
                Ok(store) => store,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Cart id store unavailable");
                    CartIdStore::unavailable(config.cart_key_prefix.clone())
                }
            },
            None => CartIdStore::unavailable(config.cart_key_prefix.clone()),
        };
        Self::mount_with(config, api, store).await
    }

    /// Mount with an explicit API and store
    pub async fn mount_with(
        config: StorefrontConfig,
        api: Arc<dyn OrderingApi>,
        store: CartIdStore,
    ) -> ClientResult<Self> {
        let cart = Self::start_synchronizer(&config, api.clone(), store.clone()).await?;
        Ok(Self {
            config,
            api,
            store,
            cart,
        })
    }

    async fn start_synchronizer(
        config: &StorefrontConfig,
        api: Arc<dyn OrderingApi>,
        store: CartIdStore,
    ) -> ClientResult<Arc<CartSynchronizer>> {
        let cart = Arc::new(CartSynchronizer::new(api, store, SyncSettings::from(config)));
        cart.initialize().await?;
        Ok(cart)
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    /// The cart engine of the current location
    pub fn cart(&self) -> Arc<CartSynchronizer> {
        self.cart.clone()
    }

    /// Switch to another organization
    ///
    /// Tears down the current synchronizer first so none of its in-flight
    /// results land after the switch. On error the old synchronizer stays
    /// torn down.
    pub async fn change_organization(&mut self, organization: impl Into<String>) -> ClientResult<()> {
        let organization = organization.into();
        tracing::info!(from = %self.config.organization, to = %organization, "Changing organization");
        self.cart.teardown();
        self.config.organization = organization;
        self.cart =
            Self::start_synchronizer(&self.config, self.api.clone(), self.store.clone()).await?;
        Ok(())
    }

    pub fn teardown(&self) {
        self.cart.teardown();
    }
}

impl Drop for StorefrontContext {
    fn drop(&mut self) {
        self.cart.teardown();
    }
}
