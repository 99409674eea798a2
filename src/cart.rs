use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::ServiceOffering;
use crate::storage::{self, SharedStorage, CART_KEY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub service_id: i64,
    pub name: String,
    pub unit_price: f64,
    /// Always 1: re-adding a service resets it rather than incrementing.
    pub quantity: u32,
    #[serde(default)]
    pub hours: Option<f64>,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.unit_price * self.hours.unwrap_or(self.quantity as f64)
    }
}

#[derive(Debug, Default)]
struct CartState {
    items: Vec<CartItem>,
    open: bool,
}

/// Transient shopping cart, mirrored to the `cart` storage key.
pub struct CartStore {
    state: RwLock<CartState>,
    storage: SharedStorage,
}

impl CartStore {
    pub fn open(storage: SharedStorage) -> Self {
        let items: Vec<CartItem> = storage::read_json(storage.as_ref(), CART_KEY).unwrap_or_default();
        Self { state: RwLock::new(CartState { items, open: false }), storage }
    }

    pub fn items(&self) -> Vec<CartItem> { self.state.read().items.clone() }

    pub fn is_empty(&self) -> bool { self.state.read().items.is_empty() }

    pub fn item_count(&self) -> u32 { self.state.read().items.iter().map(|i| i.quantity).sum() }

    /// Σ unit_price × hours; items without hours count their quantity.
    pub fn total_price(&self) -> f64 { self.state.read().items.iter().map(CartItem::line_total).sum() }

    pub fn add_item(&self, service: &ServiceOffering) {
        let mut st = self.state.write();
        match st.items.iter().position(|i| i.service_id == service.id) {
            Some(idx) => st.items[idx].quantity = 1,
            None => st.items.push(CartItem {
                service_id: service.id,
                name: service.name.clone(),
                unit_price: service.base_price,
                quantity: 1,
                hours: None,
            }),
        }
        debug!(target: "cart", service_id = service.id, items = st.items.len(), "add");
        self.persist(&st.items);
    }

    pub fn remove_item(&self, service_id: i64) {
        let mut st = self.state.write();
        if let Some(idx) = st.items.iter().position(|i| i.service_id == service_id) {
            st.items.remove(idx);
            debug!(target: "cart", service_id, "remove");
            self.persist(&st.items);
        }
    }

    pub fn update_hours(&self, service_id: i64, hours: f64) -> AppResult<()> {
        if !hours.is_finite() || hours <= 0.0 {
            return Err(AppError::validation("invalid_hours", format!("hours must be a positive number, got {}", hours)));
        }
        let mut st = self.state.write();
        let item = st
            .items
            .iter_mut()
            .find(|i| i.service_id == service_id)
            .ok_or_else(|| AppError::not_found("cart_item_missing", format!("service {} is not in the cart", service_id)))?;
        item.hours = Some(hours);
        self.persist(&st.items);
        Ok(())
    }

    /// Empty the cart and drop its storage entry.
    pub fn clear(&self) {
        self.state.write().items.clear();
        if let Err(e) = self.storage.remove(CART_KEY) {
            warn!(target: "cart", "failed to remove persisted cart: {}", e);
        }
    }

    pub fn is_open(&self) -> bool { self.state.read().open }

    pub fn set_open(&self, open: bool) { self.state.write().open = open; }

    pub fn toggle_open(&self) -> bool {
        let mut st = self.state.write();
        st.open = !st.open;
        st.open
    }

    fn persist(&self, items: &[CartItem]) {
        if let Err(e) = storage::write_json(self.storage.as_ref(), CART_KEY, &items) {
            warn!(target: "cart", "failed to persist cart: {}", e);
        }
    }
}
