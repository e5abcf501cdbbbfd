//! Local fallback cart
//!
//! In-memory cart lines priced on the client. Used while the remote cart is
//! unavailable for the session; never persisted.

use rust_decimal::Decimal;
use shared::money::validate_quantity;
use shared::util::now_millis;
use shared::{Cart, CartLine, LineSelection};

use crate::types::AddToCart;

/// Locally synthesized cart line
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackCartLine {
    /// Client key: `<productId>-<createdAt>`, or the remote line id when
    /// seeded from a remote cart
    pub line_id: String,
    pub product_id: String,
    pub name: String,
    /// Price per unit including selection modifiers
    pub unit_price: Decimal,
    pub quantity: u32,
    pub special_instructions: Option<String>,
    pub selections: Vec<LineSelection>,
    pub created_at: i64,
}

impl FallbackCartLine {
    fn same_item(&self, product_id: &str, selections: &[LineSelection]) -> bool {
        self.product_id == product_id && same_selections(&self.selections, selections)
    }
}

impl From<&CartLine> for FallbackCartLine {
    fn from(line: &CartLine) -> Self {
        Self {
            line_id: line.line_id.clone(),
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            special_instructions: line.special_instructions.clone(),
            selections: line.selections.clone(),
            created_at: now_millis(),
        }
    }
}

/// Whether two selection sets pick the same options, in any order
pub(crate) fn same_selections(a: &[LineSelection], b: &[LineSelection]) -> bool {
    selection_key(a) == selection_key(b)
}

/// Order-insensitive identity of a selection set
fn selection_key(selections: &[LineSelection]) -> Vec<(&str, &str)> {
    let mut key: Vec<(&str, &str)> = selections
        .iter()
        .map(|s| (s.group_id.as_str(), s.option_id.as_str()))
        .collect();
    key.sort_unstable();
    key
}

/// The fallback cart
#[derive(Debug, Clone, Default)]
pub struct FallbackCart {
    lines: Vec<FallbackCartLine>,
}

impl FallbackCart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[FallbackCartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, line_id: &str) -> Option<&FallbackCartLine> {
        self.lines.iter().find(|l| l.line_id == line_id)
    }

    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Append a line, or coalesce into the line with the same product and
    /// selections. Returns the id of the affected line; `None` for quantity 0.
    /// A merge that would exceed the per-line maximum is rejected and leaves
    /// the line untouched.
    pub fn add(&mut self, request: &AddToCart) -> Result<Option<String>, String> {
        if request.quantity == 0 {
            return Ok(None);
        }
        validate_quantity(request.quantity)?;

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.same_item(&request.item.product_id, &request.selections))
        {
            let merged = line.quantity.saturating_add(request.quantity);
            validate_quantity(merged)?;
            line.quantity = merged;
            return Ok(Some(line.line_id.clone()));
        }

        let created_at = now_millis();
        let line_id = self.unique_line_id(&request.item.product_id, created_at);
        self.lines.push(FallbackCartLine {
            line_id: line_id.clone(),
            product_id: request.item.product_id.clone(),
            name: request.item.name.clone(),
            unit_price: request.unit_price(),
            quantity: request.quantity,
            special_instructions: request.special_instructions.clone(),
            selections: request.selections.clone(),
            created_at,
        });
        Ok(Some(line_id))
    }

    fn unique_line_id(&self, product_id: &str, created_at: i64) -> String {
        let base = format!("{}-{}", product_id, created_at);
        if self.line(&base).is_none() {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if self.line(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Set a line's quantity; 0 removes it. Returns whether the line existed.
    pub fn set_quantity(&mut self, line_id: &str, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(line_id);
        }
        match self.lines.iter_mut().find(|l| l.line_id == line_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a line by id. Returns whether it existed.
    pub fn remove(&mut self, line_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.line_id != line_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Replace the contents with the lines of a remote cart, keeping their ids
    pub fn seed_from(&mut self, cart: &Cart) {
        self.lines = cart
            .lines
            .iter()
            .filter(|l| l.quantity > 0)
            .map(FallbackCartLine::from)
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MenuItem;
    use shared::money::MAX_QUANTITY;

    fn taco() -> MenuItem {
        MenuItem::new("p-taco", "Taco", Decimal::new(350, 2))
    }

    fn selection(group: &str, option: &str, modifier: Decimal) -> LineSelection {
        LineSelection {
            group_id: group.into(),
            option_id: option.into(),
            name: option.into(),
            price_modifier: modifier,
        }
    }

    #[test]
    fn test_add_coalesces_identical_items() {
        let mut cart = FallbackCart::new();
        let a = cart.add(&AddToCart::new(taco(), 1)).unwrap().unwrap();
        let b = cart.add(&AddToCart::new(taco(), 2)).unwrap().unwrap();
        assert_eq!(a, b);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_selection_order_does_not_matter() {
        let mut cart = FallbackCart::new();
        let s1 = selection("size", "large", Decimal::ONE);
        let s2 = selection("salsa", "verde", Decimal::ZERO);
        cart.add(&AddToCart::new(taco(), 1).with_selections(vec![s1.clone(), s2.clone()]))
            .unwrap();
        cart.add(&AddToCart::new(taco(), 1).with_selections(vec![s2, s1]))
            .unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_different_selections_are_separate_lines() {
        let mut cart = FallbackCart::new();
        cart.add(&AddToCart::new(taco(), 1)).unwrap();
        cart.add(
            &AddToCart::new(taco(), 1)
                .with_selections(vec![selection("size", "large", Decimal::new(150, 2))]),
        )
        .unwrap();
        assert_eq!(cart.lines().len(), 2);
        assert_ne!(cart.lines()[0].line_id, cart.lines()[1].line_id);
        assert_eq!(cart.lines()[1].unit_price, Decimal::new(500, 2));
    }

    #[test]
    fn test_zero_quantity_add_is_ignored() {
        let mut cart = FallbackCart::new();
        assert_eq!(cart.add(&AddToCart::new(taco(), 0)), Ok(None));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_merge_past_max_quantity_is_rejected() {
        let mut cart = FallbackCart::new();
        cart.add(&AddToCart::new(taco(), MAX_QUANTITY)).unwrap();
        let err = cart.add(&AddToCart::new(taco(), MAX_QUANTITY)).unwrap_err();
        assert!(err.contains("9999"));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total_quantity(), MAX_QUANTITY);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = FallbackCart::new();
        let id = cart.add(&AddToCart::new(taco(), 2)).unwrap().unwrap();
        assert!(cart.set_quantity(&id, 5));
        assert_eq!(cart.total_quantity(), 5);
        assert!(cart.set_quantity(&id, 0));
        assert!(cart.is_empty());
        assert!(!cart.set_quantity(&id, 1));
    }

    #[test]
    fn test_remove_unknown_line() {
        let mut cart = FallbackCart::new();
        cart.add(&AddToCart::new(taco(), 1)).unwrap();
        assert!(!cart.remove("nope"));
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_seed_from_remote_keeps_line_ids() {
        let mut remote = Cart::empty("c1", "L1");
        remote.lines.push(CartLine {
            line_id: "srv-1".into(),
            product_id: "p-taco".into(),
            name: "Taco".into(),
            unit_price: Decimal::new(350, 2),
            quantity: 1,
            special_instructions: None,
            selections: vec![],
        });
        let mut cart = FallbackCart::new();
        cart.add(&AddToCart::new(MenuItem::new("p-old", "Old", Decimal::ONE), 1))
            .unwrap();
        cart.seed_from(&remote);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line("srv-1").map(|l| l.quantity), Some(1));

        // later adds of the same item coalesce into the seeded line
        cart.add(&AddToCart::new(taco(), 1)).unwrap();
        assert_eq!(cart.line("srv-1").map(|l| l.quantity), Some(2));
    }
}
