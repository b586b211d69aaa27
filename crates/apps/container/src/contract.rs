//! Versioned surface the container exposes to remotes.
use federation::{ContractSurface, SymbolShape};
use semver::Version;

use crate::hooks;
use crate::state::{SLICES, actions};

pub const BUTTON: &str = "./Button";
pub const USE_STORE: &str = "./hooks/useStore";
pub const USE_STORE_SELECTOR: &str = "./hooks/useStoreSelector";
pub const STORE_STATE: &str = "./types/storeState";
pub const STORE_PROVIDER: &str = "./providers/StoreProvider";

/// Bump the major version whenever a symbol below loses a prop, field,
/// slice or action, or changes arity.
pub fn surface() -> ContractSurface {
    ContractSurface::new(Version::new(1, 0, 0))
        .with_symbol(
            BUTTON,
            SymbolShape::component([
                "label",
                "buttonType",
                "size",
                "padding",
                "rounded",
                "isFullWidth",
                "className",
                "buttonWrapperClassName",
            ]),
        )
        .with_symbol(
            USE_STORE,
            SymbolShape::state_accessor(
                Vec::<&str>::new(),
                [
                    hooks::INCREMENT_COUNTER,
                    hooks::DECREMENT_COUNTER,
                    hooks::INCREMENT_BY_AMOUNT_COUNTER,
                    hooks::GET_PRODUCT_LIST,
                ],
            ),
        )
        .with_symbol(
            USE_STORE_SELECTOR,
            SymbolShape::state_accessor(SLICES, actions::ALL),
        )
        .with_symbol(STORE_STATE, SymbolShape::data(SLICES))
        .with_symbol(STORE_PROVIDER, SymbolShape::component(["children"]))
}
