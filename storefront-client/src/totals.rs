//! Derived totals
//!
//! Each field is chosen independently: a remote-reported value is used when
//! present and non-zero, otherwise the field is computed from the local line
//! items. A freshly provisioned remote cart reports zeros before its first
//! line lands, and the view must not flash a zero total in that window.

use rust_decimal::Decimal;
use shared::money::{line_total, round_money, tax_on};
use shared::{Cart, CartLine};

use crate::fallback::FallbackCartLine;

/// Anything with a unit price and a quantity
pub trait PricedLine {
    fn unit_price(&self) -> Decimal;
    fn quantity(&self) -> u32;
}

impl PricedLine for CartLine {
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }
    fn quantity(&self) -> u32 {
        self.quantity
    }
}

impl PricedLine for FallbackCartLine {
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }
    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// Quantity and money totals exposed to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    pub quantity: u32,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Totals computed purely from line items
pub fn local_totals<L: PricedLine>(lines: &[L], tax_rate: Decimal) -> CartTotals {
    let quantity = lines.iter().map(|l| l.quantity()).sum();
    let subtotal = round_money(
        lines
            .iter()
            .map(|l| line_total(l.unit_price(), l.quantity()))
            .sum::<Decimal>(),
    );
    let tax = tax_on(subtotal, tax_rate);
    CartTotals {
        quantity,
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

fn present(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| !v.is_zero())
}

/// Per-field merge of remote-reported totals and local computation
///
/// Pass `remote: None` when remote mode is not active. A remote total of
/// zero is trusted (not treated as missing) when the remote cart reports a
/// positive discount: that zero is a fully discounted order.
pub fn derive_totals<L: PricedLine>(
    remote: Option<&Cart>,
    local_lines: &[L],
    tax_rate: Decimal,
) -> CartTotals {
    let local = local_totals(local_lines, tax_rate);
    let Some(cart) = remote else {
        return local;
    };

    let discounted_to_zero = cart.total.is_some_and(|t| t.is_zero())
        && cart.discount.is_some_and(|d| d > Decimal::ZERO);

    CartTotals {
        quantity: cart
            .total_quantity
            .filter(|q| *q > 0)
            .unwrap_or(local.quantity),
        subtotal: present(cart.subtotal).unwrap_or(local.subtotal),
        tax: present(cart.tax).unwrap_or(local.tax),
        total: if discounted_to_zero {
            Decimal::ZERO
        } else {
            present(cart.total).unwrap_or(local.total)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

    fn line(id: &str, cents: i64, quantity: u32) -> CartLine {
        CartLine {
            line_id: id.into(),
            product_id: format!("p-{}", id),
            name: id.into(),
            unit_price: Decimal::new(cents, 2),
            quantity,
            special_instructions: None,
            selections: vec![],
        }
    }

    fn remote_cart(lines: Vec<CartLine>) -> Cart {
        let mut cart = Cart::empty("c1", "L1");
        cart.lines = lines;
        cart
    }

    #[test]
    fn test_local_totals() {
        let lines = vec![line("a", 350, 2), line("b", 1000, 1)];
        let totals = local_totals(&lines, RATE);
        assert_eq!(totals.quantity, 3);
        assert_eq!(totals.subtotal, Decimal::new(1700, 2));
        assert_eq!(totals.tax, Decimal::new(136, 2));
        assert_eq!(totals.total, Decimal::new(1836, 2));
    }

    #[test]
    fn test_empty_lines_total_zero() {
        let totals = local_totals::<CartLine>(&[], RATE);
        assert_eq!(totals, CartTotals::default());
    }

    #[test]
    fn test_zero_remote_subtotal_uses_local() {
        let mut cart = remote_cart(vec![line("a", 350, 2)]);
        cart.subtotal = Some(Decimal::ZERO);
        cart.total_quantity = Some(0);
        let totals = derive_totals(Some(&cart), &cart.lines, RATE);
        assert_eq!(totals.subtotal, Decimal::new(700, 2));
        assert_eq!(totals.quantity, 2);
    }

    #[test]
    fn test_positive_remote_subtotal_wins() {
        let mut cart = remote_cart(vec![line("a", 350, 2)]);
        cart.subtotal = Some(Decimal::new(650, 2));
        let totals = derive_totals(Some(&cart), &cart.lines, RATE);
        assert_eq!(totals.subtotal, Decimal::new(650, 2));
    }

    #[test]
    fn test_fields_fall_back_independently() {
        let mut cart = remote_cart(vec![line("a", 1000, 1)]);
        cart.subtotal = Some(Decimal::new(900, 2));
        cart.tax = None;
        cart.total = Some(Decimal::ZERO);
        cart.total_quantity = Some(1);
        let totals = derive_totals(Some(&cart), &cart.lines, RATE);
        assert_eq!(totals.subtotal, Decimal::new(900, 2));
        // tax and total are local: 10.00 * 0.08
        assert_eq!(totals.tax, Decimal::new(80, 2));
        assert_eq!(totals.total, Decimal::new(1080, 2));
    }

    #[test]
    fn test_discounted_zero_total_is_trusted() {
        let mut cart = remote_cart(vec![line("a", 1000, 1)]);
        cart.subtotal = Some(Decimal::new(1000, 2));
        cart.discount = Some(Decimal::new(1000, 2));
        cart.total = Some(Decimal::ZERO);
        let totals = derive_totals(Some(&cart), &cart.lines, RATE);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_no_remote_means_local() {
        let lines = vec![line("a", 350, 1)];
        let totals = derive_totals(None, &lines, RATE);
        assert_eq!(totals, local_totals(&lines, RATE));
    }
}
