//! Cart wire types
//!
//! The remote ordering API owns these. The storefront only caches the
//! latest `Cart` it received.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Cart
// ============================================================================

/// Lifecycle status of a remote cart
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartStatus {
    /// Open for mutation
    #[default]
    Active,
    /// Checked out, no longer mutable
    Completed,
}

/// Remote-authoritative cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub location_id: String,
    #[serde(default)]
    pub status: CartStatus,
    #[serde(default)]
    pub lines: Vec<CartLine>,
    /// Amounts are optional: a freshly provisioned cart may not report them yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

impl Cart {
    /// An empty active cart with no amounts reported
    pub fn empty(id: impl Into<String>, location_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location_id: location_id.into(),
            status: CartStatus::Active,
            lines: Vec::new(),
            subtotal: None,
            discount: None,
            tax: None,
            total: None,
            total_quantity: None,
            checkout_url: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == CartStatus::Completed
    }

    /// Find a line by its server id
    pub fn line(&self, line_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.line_id == line_id)
    }
}

/// One line of a remote cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub line_id: String,
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub selections: Vec<LineSelection>,
}

/// Selected modifier option on a line (e.g. "Size: Large")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LineSelection {
    pub group_id: String,
    pub option_id: String,
    pub name: String,
    /// Per-unit price delta of this option
    #[serde(default)]
    pub price_modifier: Decimal,
}

// ============================================================================
// Mutation bodies
// ============================================================================

/// Body of the add-line call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddLineRequest {
    pub product_id: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub selections: Vec<LineSelection>,
}

/// Response of the add-line call; some deployments omit the updated cart
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLineResponse {
    #[serde(default)]
    pub cart: Option<Cart>,
}

/// Body of the set-line-quantity call. Quantity 0 removes the line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetQuantityRequest {
    pub quantity: u32,
}
