//! Shared types for the storefront
//!
//! Wire types of the remote ordering API (carts, locations, sessions) and
//! the money helpers used to price carts locally.

pub mod cart;
pub mod location;
pub mod money;
pub mod session;
pub mod util;

// Re-exports
pub use cart::{AddLineRequest, AddLineResponse, Cart, CartLine, CartStatus, LineSelection, SetQuantityRequest};
pub use location::{LocationRecord, MerchantRecord};
pub use rust_decimal::Decimal;
pub use serde::{Deserialize, Serialize};
pub use session::{FulfillmentMethod, StartSessionRequest, StartSessionResponse};
