//! Host state slices and the reducer that owns every transition.
use federation::{Action, Reducer};
use serde::{Deserialize, Serialize};

/// Recognized action types, `slice/verb`.
pub mod actions {
    pub const INCREMENT: &str = "counter/increment";
    pub const DECREMENT: &str = "counter/decrement";
    pub const INCREMENT_BY_AMOUNT: &str = "counter/incrementByAmount";
    pub const SET_PRODUCTS: &str = "product/setProducts";

    pub const ALL: [&str; 4] = [INCREMENT, DECREMENT, INCREMENT_BY_AMOUNT, SET_PRODUCTS];
}

/// Slice names of [`HostState`].
pub const SLICES: [&str; 2] = ["counter", "product"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductState {
    pub products: Vec<ProductItem>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    pub value: i64,
}

/// Root state of the host store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostState {
    pub counter: CounterState,
    pub product: ProductState,
}

/// Reducer over [`HostState`]. Unknown actions and malformed payloads are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostReducer;

impl Reducer for HostReducer {
    type State = HostState;

    fn initial_state(&self) -> HostState {
        HostState::default()
    }

    fn reduce(&self, state: &HostState, action: &Action) -> Option<HostState> {
        let mut next = state.clone();
        match action.kind.as_str() {
            actions::INCREMENT => next.counter.value += 1,
            actions::DECREMENT => next.counter.value -= 1,
            actions::INCREMENT_BY_AMOUNT => {
                next.counter.value += action.payload_as::<i64>()?;
            }
            actions::SET_PRODUCTS => {
                next.product.products = action.payload_as::<Vec<ProductItem>>()?;
            }
            _ => return None,
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: u64, title: &str) -> ProductItem {
        ProductItem {
            id,
            title: title.to_string(),
            description: String::new(),
            price: 9.99,
            discount_percentage: 0.0,
            rating: 4.5,
            stock: 3,
            brand: "Acme".to_string(),
            category: "tools".to_string(),
            thumbnail: String::new(),
            images: Vec::new(),
        }
    }

    #[test]
    fn counter_actions() {
        let reducer = HostReducer;
        let state = reducer.initial_state();
        let state = reducer.reduce(&state, &Action::new(actions::INCREMENT)).unwrap();
        let state = reducer
            .reduce(&state, &Action::with_payload(actions::INCREMENT_BY_AMOUNT, 5))
            .unwrap();
        let state = reducer.reduce(&state, &Action::new(actions::DECREMENT)).unwrap();
        assert_eq!(state.counter.value, 5);
    }

    #[test]
    fn set_products_replaces_list() {
        let reducer = HostReducer;
        let action = Action::with_payload(actions::SET_PRODUCTS, vec![product(1, "Hammer")]);
        let state = reducer.reduce(&HostState::default(), &action).unwrap();
        assert_eq!(state.product.products.len(), 1);
        assert_eq!(state.product.products[0].title, "Hammer");
    }

    #[test]
    fn malformed_payload_is_ignored() {
        let reducer = HostReducer;
        let action = Action::with_payload(actions::INCREMENT_BY_AMOUNT, "lots");
        assert!(reducer.reduce(&HostState::default(), &action).is_none());
        assert!(reducer.reduce(&HostState::default(), &Action::new("cart/add")).is_none());
    }

    #[test]
    fn state_serializes_in_wire_shape() {
        let mut state = HostState::default();
        state.product.products.push(product(7, "Saw"));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["counter"]["value"], 0);
        assert_eq!(json["product"]["products"][0]["discountPercentage"], 0.0);
    }
}
