//! Typed view of the container's store.
//!
//! The container's hooks arrive type-erased; the mirrored types here are this
//! bundle's own declaration of the container's state shape.
use std::collections::BTreeMap;
use std::sync::Arc;

use federation::{Federation, FederationError, Result, StateBridge, Subscription};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::contract;

pub type StoreHook = Arc<dyn Fn(Value) + Send + Sync>;
pub type StoreHooks = BTreeMap<String, StoreHook>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductItem {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub discount_percentage: f64,
    pub rating: f64,
    pub stock: u64,
    #[serde(default)]
    pub brand: String,
    pub category: String,
    pub thumbnail: String,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductState {
    pub products: Vec<ProductItem>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct CounterState {
    pub value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RootState {
    pub counter: CounterState,
    pub product: ProductState,
}

/// `container/hooks/useStore`
#[derive(Clone)]
pub struct StoreActions {
    hooks: Arc<StoreHooks>,
}

impl StoreActions {
    pub fn new(hooks: Arc<StoreHooks>) -> Self {
        Self { hooks }
    }

    pub fn increment_counter(&self) -> Result<()> {
        self.call("incrementCounter", Value::Null)
    }

    pub fn decrement_counter(&self) -> Result<()> {
        self.call("decrementCounter", Value::Null)
    }

    pub fn increment_by_amount_counter(&self, amount: i64) -> Result<()> {
        self.call("incrementByAmountCounter", Value::from(amount))
    }

    /// Starts the host's product fetch; results land in the product slice.
    pub fn get_product_list(&self) -> Result<()> {
        self.call("getProductList", Value::Null)
    }

    fn call(&self, name: &str, argument: Value) -> Result<()> {
        let hook = self
            .hooks
            .get(name)
            .ok_or_else(|| FederationError::ContractMismatch {
                remote: "container".to_string(),
                symbol: format!("./hooks/useStore#{}", name),
                expected: "function".to_string(),
                found: "nothing".to_string(),
            })?;
        hook(argument);
        Ok(())
    }
}

/// `container/hooks/useStoreSelector`
#[derive(Clone, Debug)]
pub struct StoreSelector {
    bridge: Arc<StateBridge<Value>>,
}

impl StoreSelector {
    pub fn new(bridge: Arc<StateBridge<Value>>) -> Self {
        Self { bridge }
    }

    /// Current host state, or `None` if it no longer has the mirrored shape.
    pub fn state(&self) -> Option<RootState> {
        decode(&self.bridge.get_snapshot())
    }

    pub fn select<T, F>(&self, selector: F) -> Option<T>
    where
        F: FnOnce(&RootState) -> T,
    {
        self.state().as_ref().map(selector)
    }

    /// Call `listener` with each new host state that decodes.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&RootState) + Send + Sync + 'static,
    {
        self.bridge.subscribe(move |state: &Value| {
            if let Some(state) = decode::<RootState>(state) {
                listener(&state);
            }
        })
    }
}

fn decode<T: DeserializeOwned>(state: &Value) -> Option<T> {
    T::deserialize(state)
        .map_err(|err| tracing::warn!("Host state does not match the mirrored shape: {}", err))
        .ok()
}

/// Load the container's store hooks after checking its contract.
pub async fn use_store(federation: &Federation) -> Result<StoreActions> {
    let handle = federation
        .loader()
        .load_checked("container", "./hooks/useStore", &contract::container_expectation())
        .await?;
    Ok(StoreActions::new(handle.downcast::<StoreHooks>()?))
}

pub async fn use_store_selector(federation: &Federation) -> Result<StoreSelector> {
    let handle = federation
        .loader()
        .load_checked(
            "container",
            "./hooks/useStoreSelector",
            &contract::container_expectation(),
        )
        .await?;
    Ok(StoreSelector::new(handle.downcast::<StateBridge<Value>>()?))
}
