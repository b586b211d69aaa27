//! Store hooks handed to remotes.
//!
//! Remotes are compiled without this crate, so the hooks cross the boundary as
//! a map of named callbacks taking JSON arguments. [`StoreActions`] is the
//! typed facade the host itself uses; [`StoreActions::hooks`] erases it.
use std::collections::BTreeMap;
use std::sync::Arc;

use federation::{Action, StateBridge};
use serde_json::Value;

use crate::services::{ProductService, ServiceError};
use crate::state::actions;

/// One exported callback.
pub type StoreHook = Arc<dyn Fn(Value) + Send + Sync>;

/// What `./hooks/useStore` exports.
pub type StoreHooks = BTreeMap<String, StoreHook>;

pub const INCREMENT_COUNTER: &str = "incrementCounter";
pub const DECREMENT_COUNTER: &str = "decrementCounter";
pub const INCREMENT_BY_AMOUNT_COUNTER: &str = "incrementByAmountCounter";
pub const GET_PRODUCT_LIST: &str = "getProductList";

/// Dispatching facade over the host store.
#[derive(Clone, Debug)]
pub struct StoreActions {
    bridge: StateBridge<Value>,
    products: ProductService,
}

impl StoreActions {
    pub fn new(bridge: StateBridge<Value>, products: ProductService) -> Self {
        Self { bridge, products }
    }

    pub fn increment_counter(&self) -> bool {
        self.bridge.dispatch(Action::new(actions::INCREMENT))
    }

    pub fn decrement_counter(&self) -> bool {
        self.bridge.dispatch(Action::new(actions::DECREMENT))
    }

    pub fn increment_by_amount_counter(&self, amount: i64) -> bool {
        self.bridge
            .dispatch(Action::with_payload(actions::INCREMENT_BY_AMOUNT, amount))
    }

    /// Fetch the product listing and store it. Returns how many products were stored.
    ///
    /// A failed fetch leaves the product slice untouched.
    pub async fn get_product_list(&self) -> Result<usize, ServiceError> {
        let listing = self.products.get_product_list().await?;
        let count = listing.products.len();
        self.bridge
            .dispatch(Action::with_payload(actions::SET_PRODUCTS, listing.products));
        Ok(count)
    }

    /// Erase into the callback map exported as `./hooks/useStore`.
    pub fn hooks(&self) -> StoreHooks {
        let mut hooks = StoreHooks::new();

        let this = self.clone();
        hooks.insert(
            INCREMENT_COUNTER.to_string(),
            Arc::new(move |_: Value| {
                this.increment_counter();
            }),
        );

        let this = self.clone();
        hooks.insert(
            DECREMENT_COUNTER.to_string(),
            Arc::new(move |_: Value| {
                this.decrement_counter();
            }),
        );

        let this = self.clone();
        hooks.insert(
            INCREMENT_BY_AMOUNT_COUNTER.to_string(),
            Arc::new(move |amount: Value| match amount.as_i64() {
                Some(amount) => {
                    this.increment_by_amount_counter(amount);
                }
                None => tracing::warn!(
                    "{} ignored non-integer amount {}",
                    INCREMENT_BY_AMOUNT_COUNTER,
                    amount
                ),
            }),
        );

        let this = self.clone();
        hooks.insert(
            GET_PRODUCT_LIST.to_string(),
            Arc::new(move |_: Value| {
                let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                    tracing::warn!("{} called outside a runtime", GET_PRODUCT_LIST);
                    return;
                };
                let this = this.clone();
                runtime.spawn(async move {
                    if let Err(err) = this.get_product_list().await {
                        tracing::warn!("{}", err);
                    }
                });
            }),
        );

        hooks
    }
}
