//! Request and outcome types of the cart engine

use rust_decimal::Decimal;
use shared::LineSelection;

/// A sellable menu item as the UI knows it
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub product_id: String,
    pub name: String,
    /// Base unit price before selection modifiers
    pub price: Decimal,
}

impl MenuItem {
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            price,
        }
    }
}

/// Input of `addToCart`
#[derive(Debug, Clone, PartialEq)]
pub struct AddToCart {
    pub item: MenuItem,
    pub quantity: u32,
    pub selections: Vec<LineSelection>,
    pub special_instructions: Option<String>,
}

impl AddToCart {
    pub fn new(item: MenuItem, quantity: u32) -> Self {
        Self {
            item,
            quantity,
            selections: Vec::new(),
            special_instructions: None,
        }
    }

    pub fn with_selections(mut self, selections: Vec<LineSelection>) -> Self {
        self.selections = selections;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.special_instructions = Some(instructions.into());
        self
    }

    /// Base price plus every selection's modifier
    pub fn unit_price(&self) -> Decimal {
        self.item.price
            + self
                .selections
                .iter()
                .map(|s| s.price_modifier)
                .sum::<Decimal>()
    }
}

/// Where a mutation ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Applied by the remote cart
    Remote,
    /// Applied to the local fallback cart (degraded, or replayed after a failure)
    Local,
    /// Not applied: line busy, unknown line, or invalid input
    Ignored,
}
