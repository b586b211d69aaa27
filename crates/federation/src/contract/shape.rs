//! Declared shapes of symbols crossing the bundle boundary.
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Shape of one exported symbol.
///
/// Shapes compare structurally: a provider satisfies a consumer when it offers
/// at least what the consumer reads (props, fields, slices, actions) and the
/// exact arity the consumer calls with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SymbolShape {
    Component {
        #[serde(default)]
        props: BTreeSet<String>,
    },
    Function {
        arity: usize,
    },
    Data {
        #[serde(default)]
        fields: BTreeSet<String>,
    },
    #[serde(rename_all = "camelCase")]
    StateAccessor {
        #[serde(default)]
        slices: BTreeSet<String>,
        #[serde(default)]
        actions: BTreeSet<String>,
    },
}

impl SymbolShape {
    pub fn component<I, S>(props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SymbolShape::Component {
            props: props.into_iter().map(Into::into).collect(),
        }
    }

    pub fn function(arity: usize) -> Self {
        SymbolShape::Function { arity }
    }

    pub fn data<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SymbolShape::Data {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn state_accessor<I, J, S, T>(slices: I, actions: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        SymbolShape::StateAccessor {
            slices: slices.into_iter().map(Into::into).collect(),
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SymbolShape::Component { .. } => "component",
            SymbolShape::Function { .. } => "function",
            SymbolShape::Data { .. } => "data",
            SymbolShape::StateAccessor { .. } => "stateAccessor",
        }
    }

    /// Whether `self` (the provided shape) can serve a consumer expecting `expected`.
    pub fn satisfies(&self, expected: &SymbolShape) -> bool {
        match (self, expected) {
            (
                SymbolShape::Component { props },
                SymbolShape::Component { props: wanted },
            ) => wanted.is_subset(props),
            (SymbolShape::Function { arity }, SymbolShape::Function { arity: wanted }) => {
                arity == wanted
            }
            (SymbolShape::Data { fields }, SymbolShape::Data { fields: wanted }) => {
                wanted.is_subset(fields)
            }
            (
                SymbolShape::StateAccessor { slices, actions },
                SymbolShape::StateAccessor {
                    slices: wanted_slices,
                    actions: wanted_actions,
                },
            ) => wanted_slices.is_subset(slices) && wanted_actions.is_subset(actions),
            _ => false,
        }
    }
}

impl fmt::Display for SymbolShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(items: &BTreeSet<String>) -> String {
            items.iter().cloned().collect::<Vec<_>>().join(", ")
        }

        match self {
            SymbolShape::Component { props } => write!(f, "component({})", list(props)),
            SymbolShape::Function { arity } => write!(f, "function/{}", arity),
            SymbolShape::Data { fields } => write!(f, "data{{{}}}", list(fields)),
            SymbolShape::StateAccessor { slices, actions } => write!(
                f,
                "stateAccessor(slices: [{}], actions: [{}])",
                list(slices),
                list(actions)
            ),
        }
    }
}
