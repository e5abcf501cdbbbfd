//! Storefront client - cart reconciliation engine
//!
//! Resolves the ordering location, bootstraps the server-side ordering
//! session and keeps the cart in sync with the remote ordering API, falling
//! back to a local cart when the remote side misbehaves.

pub mod api;
pub mod cart_store;
pub mod config;
pub mod context;
pub mod error;
pub mod fallback;
pub mod http;
pub mod identity;
pub mod logger;
pub mod session;
pub mod sync;
pub mod totals;
pub mod types;

pub use api::{NetworkOrderingApi, OrderingApi};
pub use cart_store::{CartIdStore, StorageError};
pub use config::StorefrontConfig;
pub use context::StorefrontContext;
pub use error::{ClientError, ClientResult};
pub use fallback::{FallbackCart, FallbackCartLine};
pub use http::NetworkHttpClient;
pub use identity::{IdentityResolver, LocationContext, ResolutionState};
pub use session::{OrderingSession, SessionBootstrapper, SessionStart, StartOptions};
pub use sync::{CartItemView, CartSnapshot, CartSynchronizer, CartView, SyncPhase, SyncSettings};
pub use totals::{CartTotals, derive_totals, local_totals};
pub use types::{AddToCart, MenuItem, MutationOutcome};

// Re-export shared types for convenience
pub use shared::{Cart, CartLine, CartStatus, Decimal, FulfillmentMethod, LineSelection};
