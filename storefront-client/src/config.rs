//! Storefront configuration
//!
//! # 环境变量
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | STOREFRONT_API_URL | (required) | Ordering API base URL |
//! | STOREFRONT_ORGANIZATION | (required) | Organization slug or location id |
//! | STOREFRONT_API_ENABLED | true | Use the remote cart at all |
//! | STOREFRONT_TAX_RATE | 0.08 | Regional tax rate for local pricing |
//! | STOREFRONT_CART_KEY_PREFIX | storefront:cart | Namespace of persisted cart ids |
//! | STOREFRONT_DATA_DIR | (unset) | Directory of the cart id database |
//! | STOREFRONT_FULFILLMENT | PICKUP | PICKUP or DELIVERY |
//! | REQUEST_TIMEOUT_MS | 30000 | HTTP timeout (ms) |

use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use shared::FulfillmentMethod;

use crate::error::{ClientError, ClientResult};

/// Default regional tax rate (8%)
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// Default namespace of persisted cart ids
pub const DEFAULT_CART_KEY_PREFIX: &str = "storefront:cart";

/// Storefront configuration
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Ordering API base URL (e.g., "https://api.example.com")
    pub api_url: String,
    /// Organization slug, or a location id used directly
    pub organization: String,
    /// Remote-mode-enabled flag
    pub api_enabled: bool,
    /// Tax rate applied by local pricing
    pub tax_rate: Decimal,
    /// Namespace of persisted cart ids
    pub cart_key_prefix: String,
    /// Where the cart id database lives; `None` disables durable storage
    pub data_dir: Option<PathBuf>,
    pub fulfillment_method: FulfillmentMethod,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl StorefrontConfig {
    /// Create a configuration with defaults for everything optional
    pub fn new(api_url: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            organization: organization.into(),
            api_enabled: true,
            tax_rate: DEFAULT_TAX_RATE,
            cart_key_prefix: DEFAULT_CART_KEY_PREFIX.to_string(),
            data_dir: None,
            fulfillment_method: FulfillmentMethod::Pickup,
            request_timeout_ms: 30_000,
        }
    }

    /// Load from the process environment (and `.env`, if present)
    pub fn from_env() -> ClientResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    ///
    /// Missing required keys and unparsable values fail immediately.
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> ClientResult<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ClientError::Config(format!("{} is required", key)))
        };

        let mut config = Self::new(
            required("STOREFRONT_API_URL")?,
            required("STOREFRONT_ORGANIZATION")?,
        );

        if let Some(v) = lookup("STOREFRONT_API_ENABLED") {
            config.api_enabled = parse_value("STOREFRONT_API_ENABLED", &v)?;
        }
        if let Some(v) = lookup("STOREFRONT_TAX_RATE") {
            let rate: Decimal = parse_value("STOREFRONT_TAX_RATE", &v)?;
            if rate.is_sign_negative() || rate >= Decimal::ONE {
                return Err(ClientError::Config(format!(
                    "STOREFRONT_TAX_RATE must be a fraction in [0, 1), got {}",
                    rate
                )));
            }
            config.tax_rate = rate;
        }
        if let Some(v) = lookup("STOREFRONT_CART_KEY_PREFIX").filter(|v| !v.trim().is_empty()) {
            config.cart_key_prefix = v.trim().to_string();
        }
        if let Some(v) = lookup("STOREFRONT_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            config.data_dir = Some(PathBuf::from(v.trim()));
        }
        if let Some(v) = lookup("STOREFRONT_FULFILLMENT") {
            config.fulfillment_method = parse_value("STOREFRONT_FULFILLMENT", &v)?;
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = parse_value("REQUEST_TIMEOUT_MS", &v)?;
        }

        Ok(config)
    }

    /// Set the remote-mode-enabled flag
    pub fn with_api_enabled(mut self, enabled: bool) -> Self {
        self.api_enabled = enabled;
        self
    }

    /// Set the regional tax rate
    pub fn with_tax_rate(mut self, rate: Decimal) -> Self {
        self.tax_rate = rate;
        self
    }

    /// Set the cart id key namespace
    pub fn with_cart_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cart_key_prefix = prefix.into();
        self
    }

    /// Set the cart id database directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_fulfillment_method(mut self, method: FulfillmentMethod) -> Self {
        self.fulfillment_method = method;
        self
    }

    /// Set the request timeout
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.request_timeout_ms = ms;
        self
    }

    /// Path of the cart id database, when durable storage is configured
    pub fn cart_store_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("cart_ids.redb"))
    }
}

fn parse_value<T>(key: &str, raw: &str) -> ClientResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ClientError::Config(format!("{} is invalid: {}", key, e)))
}
