//! Identifiers for bindings and the two independent index spaces inside one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a binding within a [`super::BindingTable`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BindingId(pub u32);

/// Position of an influence in its binding. Assigned monotonically, never reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct InfluenceIndex(pub u32);

/// Stable index of an affected geometry, distinct from influence indices.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GeometryIndex(pub u32);

macro_rules! display_index {
    ($($ty:ident),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

display_index!(BindingId, InfluenceIndex, GeometryIndex);

/// Key of one membership record.
pub type RecordKey = (GeometryIndex, InfluenceIndex);
