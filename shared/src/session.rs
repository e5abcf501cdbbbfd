//! Ordering session bootstrap types

use serde::{Deserialize, Serialize};

/// How the order will be handed over
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentMethod {
    /// 到店自取
    #[default]
    Pickup,
    /// 外送
    Delivery,
}

impl std::str::FromStr for FulfillmentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PICKUP" => Ok(Self::Pickup),
            "DELIVERY" => Ok(Self::Delivery),
            other => Err(format!("unknown fulfillment method: {other}")),
        }
    }
}

/// Body of start-ordering-session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    /// Previously persisted cart id, offered so a returning visitor resumes it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_cart_id: Option<String>,
    pub fulfillment_method: FulfillmentMethod,
}

/// Response of start-ordering-session
///
/// `cart_id: None` together with an `error_message` means the location is in
/// menu-only mode (ordering closed) but still browsable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    #[serde(default)]
    pub cart_id: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}
