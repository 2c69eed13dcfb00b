//! Cart reconciler.
//!
//! Holds the server cart (last backend-confirmed lines), the catalog snapshot
//! and the per-product pending mutations, and derives the displayed cart
//! from them. Every mutation is applied optimistically, sent to the backend,
//! and then either committed from the backend's response or rolled back.
//!
//! Responses may arrive in any order. Each mutation is tagged with a
//! monotonic sequence number; only the response to the latest mutation for a
//! product may settle that product, so the displayed quantity always ends at
//! the last intent the user expressed. A response carrying a full cart that
//! is older than one already applied only contributes its own product's line.
//!
//! Full-cart writes carry every pending intent. When one of those intents is
//! rolled back while the write is in flight, or after the write already
//! landed, its line is restored and the backend is sent the corrected cart.

mod merge;
mod mutation;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;
use shopline_core::{CartLine, EnrichedCartLine, ProductId, Quantity};
use tracing::{debug, instrument, warn};

pub use merge::{cart_total, item_count, reconcile};
pub use mutation::{Intent, MutationOutcome, PendingMutation, Reverted};

use crate::api::{AccessToken, ApiError, CartBackend};
use crate::catalog::CatalogSnapshot;
use crate::error::Result;

#[derive(Debug)]
struct CartState {
    server: Vec<CartLine>,
    catalog: CatalogSnapshot,
    /// Always `merge::project(server, catalog, pending)`.
    local: Vec<EnrichedCartLine>,
    pending: HashMap<ProductId, PendingMutation>,
    /// Latest rolled-back chain per product.
    reverted: HashMap<ProductId, Reverted>,
    /// Sequence of the newest full cart written into `server`.
    applied_seq: u64,
    last_seq: u64,
}

impl Default for CartState {
    fn default() -> Self {
        Self {
            server: Vec::new(),
            catalog: Arc::from(Vec::new()),
            local: Vec::new(),
            pending: HashMap::new(),
            reverted: HashMap::new(),
            applied_seq: 0,
            last_seq: 0,
        }
    }
}

impl CartState {
    fn next_seq(&mut self) -> u64 {
        self.last_seq += 1;
        self.last_seq
    }

    fn refresh(&mut self) {
        self.local = merge::project(&self.server, &self.catalog, &self.pending);
    }

    fn displayed_quantity(&self, product_id: &ProductId) -> Option<Quantity> {
        self.local
            .iter()
            .find(|l| l.product_id() == product_id)
            .map(|l| l.quantity)
    }

    /// Record a new optimistic mutation and return its tag.
    fn issue(&mut self, product_id: &ProductId, intent: Intent) -> u64 {
        let seq = self.next_seq();
        let mutation = match self.pending.get(product_id) {
            Some(existing) => existing.supersede(seq, intent),
            None => PendingMutation::new(
                seq,
                intent,
                merge::quantity_of(&self.server, product_id),
            ),
        };
        self.pending.insert(product_id.clone(), mutation);
        self.refresh();
        seq
    }

    /// Cart to send to the backend: server lines with all pending intents.
    fn intended(&self) -> Vec<CartLine> {
        merge::overlay(&self.server, &self.pending)
    }

    /// Tags of the pending intents included in [`Self::intended`].
    fn carried(&self) -> Carried {
        self.pending
            .iter()
            .map(|(id, m)| (id.clone(), m.seq))
            .collect()
    }

    /// Restore lines whose carried intent has been rolled back. Returns
    /// whether anything was restored, i.e. the backend now holds a value
    /// the client rejected.
    fn undo_reverted(&mut self, carried: &Carried) -> bool {
        let mut undone = false;
        for (product_id, seq) in carried {
            if let Some(reverted) = self.reverted.get(product_id).filter(|r| r.covers(*seq)) {
                merge::restore_line(&mut self.server, product_id, reverted.restore);
                undone = true;
            }
        }
        undone
    }

    fn write_server(&mut self, seq: u64, lines: Vec<CartLine>) -> bool {
        if seq <= self.applied_seq {
            return false;
        }
        self.server = merge::dedup(lines);
        self.applied_seq = seq;
        true
    }

    /// Apply the response to mutation `seq`. `None` if it is stale,
    /// otherwise whether the backend needs the corrected cart.
    fn commit(
        &mut self,
        product_id: &ProductId,
        seq: u64,
        canonical: Vec<CartLine>,
        carried: &Carried,
    ) -> Option<bool> {
        mutation::take_current(&mut self.pending, product_id, seq)?;
        let mut diverged = false;
        if seq > self.applied_seq {
            self.write_server(seq, canonical);
            diverged = self.undo_reverted(carried);
        } else {
            // A newer full cart is already applied; take only this product.
            merge::splice(&mut self.server, &canonical, product_id);
        }
        self.refresh();
        Some(diverged)
    }

    /// Undo mutation `seq` by restoring its chain's confirmed quantity.
    /// `None` if it is stale, otherwise the mutation and whether the backend
    /// already holds a different value through another product's write.
    fn roll_back(
        &mut self,
        product_id: &ProductId,
        seq: u64,
    ) -> Option<(PendingMutation, bool)> {
        let mutation = mutation::take_current(&mut self.pending, product_id, seq)?;
        let diverged = merge::quantity_of(&self.server, product_id) != mutation.previous;
        merge::restore_line(&mut self.server, product_id, mutation.previous);
        self.reverted
            .insert(product_id.clone(), Reverted::of(&mutation, seq));
        self.refresh();
        Some((mutation, diverged))
    }
}

/// Pending intents included in one full-cart write, with their tags.
type Carried = Vec<(ProductId, u64)>;

/// Optimistic cart state for one authenticated session.
pub struct CartReconciler {
    backend: Arc<dyn CartBackend>,
    state: Mutex<CartState>,
}

impl CartReconciler {
    #[must_use]
    pub fn new(backend: Arc<dyn CartBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(CartState::default()),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut CartState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Fetch the server cart and reconcile it with the current catalog.
    ///
    /// A response overtaken by a newer confirmed cart is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorefrontError::Backend`] if the fetch fails.
    #[instrument(skip(self, token))]
    pub async fn load(&self, token: &AccessToken) -> Result<()> {
        let seq = self.with_state(CartState::next_seq);
        let lines = self.backend.fetch_cart(token).await?;
        let count = lines.len();

        let applied = self.with_state(|s| {
            let applied = s.write_server(seq, lines);
            if applied {
                s.refresh();
            }
            applied
        });
        if applied {
            debug!(lines = count, "Server cart loaded");
        } else {
            debug!(seq, "Discarded outdated cart fetch");
        }
        Ok(())
    }

    /// Replace the server cart with lines confirmed elsewhere.
    pub fn replace_server_cart(&self, lines: Vec<CartLine>) {
        self.with_state(|s| {
            let seq = s.next_seq();
            s.write_server(seq, lines);
            s.refresh();
        });
    }

    /// Swap in a new catalog snapshot and re-derive the displayed cart.
    pub fn set_catalog(&self, catalog: CatalogSnapshot) {
        self.with_state(|s| {
            s.catalog = catalog;
            s.refresh();
        });
    }

    /// Forget all cart state, including in-flight mutations.
    ///
    /// Responses to mutations issued before the call are discarded when they
    /// arrive. The catalog snapshot is kept.
    pub fn clear(&self) {
        self.with_state(|s| {
            s.server.clear();
            s.pending.clear();
            s.reverted.clear();
            // Fetches already in flight belong to the old session.
            s.applied_seq = s.last_seq;
            s.refresh();
        });
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Set the quantity of a product, adding a line if it is not in the cart.
    ///
    /// An existing line is overwritten, not incremented.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorefrontError::Backend`] if the backend rejects the
    /// latest mutation for this product; the line is rolled back first.
    #[instrument(skip(self, token), fields(product_id = %product_id, quantity = %quantity))]
    pub async fn add_or_set_quantity(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<MutationOutcome> {
        let (seq, intended, carried) = self.with_state(|s| {
            let seq = s.issue(product_id, Intent::Set(quantity));
            (seq, s.intended(), s.carried())
        });

        let response = self.backend.replace_cart(token, &intended).await;
        self.settle(token, product_id, seq, &carried, response).await
    }

    /// Change the quantity of an existing line by `delta`.
    ///
    /// The result is clamped to at least one; deleting is a separate
    /// operation. Nothing is sent if the product is not displayed or the
    /// quantity would not change.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorefrontError::Backend`] if the backend rejects the
    /// latest mutation for this product; the line is rolled back first.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
        delta: i64,
    ) -> Result<MutationOutcome> {
        let issued = self.with_state(|s| {
            let current = s.displayed_quantity(product_id)?;
            let next = current.offset(delta);
            if next == current {
                return None;
            }
            let seq = s.issue(product_id, Intent::Set(next));
            Some((seq, s.intended(), s.carried(), next))
        });

        let Some((seq, intended, carried, next)) = issued else {
            debug!(delta, "Quantity unchanged, nothing sent");
            return Ok(MutationOutcome::Unchanged);
        };
        debug!(seq, quantity = %next, "Optimistic quantity applied");

        let response = self.backend.replace_cart(token, &intended).await;
        self.settle(token, product_id, seq, &carried, response).await
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorefrontError::Backend`] if the backend rejects the
    /// latest mutation for this product; the line reappears first.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn delete_line(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<MutationOutcome> {
        let seq = self.with_state(|s| {
            merge::quantity_of(&s.intended(), product_id)?;
            Some(s.issue(product_id, Intent::Remove))
        });

        let Some(seq) = seq else {
            return Ok(MutationOutcome::Unchanged);
        };

        // The delete endpoint touches one line and carries no other intent.
        let response = self.backend.delete_line(token, product_id).await;
        self.settle(token, product_id, seq, &Carried::new(), response)
            .await
    }

    async fn settle(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
        seq: u64,
        carried: &Carried,
        response: std::result::Result<Vec<CartLine>, ApiError>,
    ) -> Result<MutationOutcome> {
        match response {
            Ok(canonical) => {
                let committed =
                    self.with_state(|s| s.commit(product_id, seq, canonical, carried));
                match committed {
                    Some(diverged) => {
                        debug!(seq, "Cart mutation committed");
                        if diverged {
                            self.resync(token).await;
                        }
                        Ok(MutationOutcome::Committed)
                    }
                    None => {
                        debug!(seq, "Discarded superseded cart response");
                        Ok(MutationOutcome::Superseded)
                    }
                }
            }
            Err(e) => match self.with_state(|s| s.roll_back(product_id, seq)) {
                Some((rolled_back, diverged)) => {
                    warn!(
                        seq,
                        error = %e,
                        restored = ?rolled_back.previous.map(Quantity::get),
                        "Cart mutation failed, rolled back"
                    );
                    if diverged {
                        self.resync(token).await;
                    }
                    Err(e.into())
                }
                None => {
                    debug!(seq, error = %e, "Discarded superseded cart failure");
                    Ok(MutationOutcome::Superseded)
                }
            },
        }
    }

    /// Send the client's intended cart after a rolled-back intent reached
    /// the backend through another product's write. One attempt; a failure
    /// is logged and the next full-cart write corrects the backend.
    async fn resync(&self, token: &AccessToken) {
        let (seq, intended, carried) =
            self.with_state(|s| (s.next_seq(), s.intended(), s.carried()));

        match self.backend.replace_cart(token, &intended).await {
            Ok(canonical) => {
                self.with_state(|s| {
                    if s.write_server(seq, canonical) {
                        s.undo_reverted(&carried);
                    }
                    s.refresh();
                });
                debug!(seq, "Backend cart corrected after rollback");
            }
            Err(e) => warn!(seq, error = %e, "Could not correct backend cart after rollback"),
        }
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Displayed cart lines, including optimistic changes.
    #[must_use]
    pub fn lines(&self) -> Vec<EnrichedCartLine> {
        self.with_state(|s| s.local.clone())
    }

    /// Last backend-confirmed cart, including lines for unknown products.
    #[must_use]
    pub fn server_cart(&self) -> Vec<CartLine> {
        self.with_state(|s| s.server.clone())
    }

    #[must_use]
    pub fn total(&self) -> Decimal {
        self.with_state(|s| cart_total(&s.local))
    }

    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.with_state(|s| item_count(&s.local))
    }

    /// Displayed quantity for one product.
    #[must_use]
    pub fn quantity(&self, product_id: &ProductId) -> Option<Quantity> {
        self.with_state(|s| s.displayed_quantity(product_id))
    }

    #[must_use]
    pub fn is_pending(&self, product_id: &ProductId) -> bool {
        self.with_state(|s| s.pending.contains_key(product_id))
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.with_state(|s| !s.pending.is_empty())
    }
}
