//! Contracts on both sides of this bundle: what it expects from the
//! container, and what it exposes itself.
use federation::{ContractExpectation, ContractSurface, SymbolShape};
use semver::{Comparator, Op, Prerelease, Version, VersionReq};

pub const TEST_PAGE: &str = "./TestPage";

/// Symbols of `container` this bundle reads, at the shapes it reads them.
pub fn container_expectation() -> ContractExpectation {
    ContractExpectation::new(compatible_with(1))
        .expect("./Button", SymbolShape::component(["label", "buttonType"]))
        .expect(
            "./hooks/useStore",
            SymbolShape::state_accessor(
                Vec::<&str>::new(),
                [
                    "incrementCounter",
                    "decrementCounter",
                    "incrementByAmountCounter",
                    "getProductList",
                ],
            ),
        )
        .expect(
            "./hooks/useStoreSelector",
            SymbolShape::state_accessor(["counter", "product"], Vec::<&str>::new()),
        )
}

pub fn surface() -> ContractSurface {
    ContractSurface::new(Version::new(1, 0, 0))
        .with_symbol(TEST_PAGE, SymbolShape::component(Vec::<&str>::new()))
}

/// `^major`
fn compatible_with(major: u64) -> VersionReq {
    VersionReq {
        comparators: vec![Comparator {
            op: Op::Caret,
            major,
            minor: None,
            patch: None,
            pre: Prerelease::EMPTY,
        }],
    }
}
