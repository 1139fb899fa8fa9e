use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a fact holds one value per entity or a series over time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Temporality {
    /// One value per entity
    #[default]
    Constant,
    /// Reserved: one value per entity and point in time
    TimeSeries,
}

/// The shape of a single fact value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactAtom {
    /// Real-valued measurement
    Numeric,
    /// Yes/no flag
    Boolean,
    /// One label out of a closed list
    Categorical,
}

/// Full kind of a fact: temporality × atom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactKind {
    /// A constant value of the given atom
    Constant(FactAtom),
    /// A time series of the given atom (reserved, not served by any store)
    TimeSeries(FactAtom),
}

impl FactKind {
    /// Build a kind from its two components
    #[must_use]
    pub const fn new(temporality: Temporality, atom: FactAtom) -> Self {
        match temporality {
            Temporality::Constant => Self::Constant(atom),
            Temporality::TimeSeries => Self::TimeSeries(atom),
        }
    }

    /// The atom regardless of temporality
    #[must_use]
    pub const fn atom(self) -> FactAtom {
        match self {
            Self::Constant(atom) | Self::TimeSeries(atom) => atom,
        }
    }

    /// The temporality regardless of atom
    #[must_use]
    pub const fn temporality(self) -> Temporality {
        match self {
            Self::Constant(_) => Temporality::Constant,
            Self::TimeSeries(_) => Temporality::TimeSeries,
        }
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(atom) => write!(f, "constant {atom:?}"),
            Self::TimeSeries(atom) => write!(f, "time-series {atom:?}"),
        }
    }
}
