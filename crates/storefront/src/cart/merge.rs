//! Pure cart merge functions.
//!
//! Nothing here touches the network or shared state; the reconciler calls
//! these under its lock.

use std::collections::HashMap;

use rust_decimal::Decimal;
use shopline_core::{CartLine, EnrichedCartLine, Product, ProductId, Quantity};

use super::mutation::{Intent, PendingMutation};

/// Join cart lines with the catalog.
///
/// Lines whose product is not in the catalog are dropped: a cart reference
/// to a deleted product is invisible, not an error. Order follows `server`.
/// Pure and idempotent.
#[must_use]
pub fn reconcile(server: &[CartLine], catalog: &[Product]) -> Vec<EnrichedCartLine> {
    let by_id: HashMap<&ProductId, &Product> = catalog.iter().map(|p| (&p.id, p)).collect();

    server
        .iter()
        .filter_map(|line| {
            by_id.get(&line.product_id).map(|product| EnrichedCartLine {
                product: (*product).clone(),
                quantity: line.quantity,
            })
        })
        .collect()
}

/// Sum of `price * quantity` over displayed lines.
#[must_use]
pub fn cart_total(lines: &[EnrichedCartLine]) -> Decimal {
    lines.iter().map(EnrichedCartLine::line_total).sum()
}

/// Total number of units over displayed lines.
#[must_use]
pub fn item_count(lines: &[EnrichedCartLine]) -> u64 {
    lines.iter().map(|l| u64::from(l.quantity.get())).sum()
}

/// Quantity of `product_id` in a raw cart.
#[must_use]
pub fn quantity_of(lines: &[CartLine], product_id: &ProductId) -> Option<Quantity> {
    lines
        .iter()
        .find(|l| &l.product_id == product_id)
        .map(|l| l.quantity)
}

/// Apply one intent to a raw cart.
///
/// `Set` overwrites an existing line in place (last writer wins) or appends
/// a new one; `Remove` drops the line if present.
pub fn apply_intent(lines: &mut Vec<CartLine>, product_id: &ProductId, intent: Intent) {
    match intent {
        Intent::Set(quantity) => {
            if let Some(line) = lines.iter_mut().find(|l| &l.product_id == product_id) {
                line.quantity = quantity;
            } else {
                lines.push(CartLine::new(product_id.clone(), quantity));
            }
        }
        Intent::Remove => lines.retain(|l| &l.product_id != product_id),
    }
}

/// The cart the client wants the server to hold: `server` with every pending
/// intent applied in issue order.
#[must_use]
pub fn overlay(
    server: &[CartLine],
    pending: &HashMap<ProductId, PendingMutation>,
) -> Vec<CartLine> {
    let mut ordered: Vec<(&ProductId, &PendingMutation)> = pending.iter().collect();
    ordered.sort_by_key(|(_, m)| m.seq);

    let mut lines = server.to_vec();
    for (product_id, mutation) in ordered {
        apply_intent(&mut lines, product_id, mutation.intent);
    }
    lines
}

/// Displayed cart: the overlay joined with the catalog.
#[must_use]
pub fn project(
    server: &[CartLine],
    catalog: &[Product],
    pending: &HashMap<ProductId, PendingMutation>,
) -> Vec<EnrichedCartLine> {
    reconcile(&overlay(server, pending), catalog)
}

/// Copy the line for `product_id` from `canonical` into `server`, leaving
/// every other line alone.
pub fn splice(server: &mut Vec<CartLine>, canonical: &[CartLine], product_id: &ProductId) {
    restore_line(server, product_id, quantity_of(canonical, product_id));
}

/// Set the line for `product_id` in `server` to `quantity`, removing it for
/// `None`.
pub fn restore_line(server: &mut Vec<CartLine>, product_id: &ProductId, quantity: Option<Quantity>) {
    apply_intent(server, product_id, quantity.map_or(Intent::Remove, Intent::Set));
}

/// Collapse duplicate product keys, keeping the first position and the last
/// quantity.
#[must_use]
pub fn dedup(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut out: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        apply_intent(&mut out, &line.product_id, Intent::Set(line.quantity));
    }
    out
}
