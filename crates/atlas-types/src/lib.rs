//! Atlas Types
//!
//! This crate defines the value model shared by the Atlas crates: the tagged
//! domain and image values, the fact-kind taxonomy, numeric ranges and the
//! display formatting primitives. It has no knowledge of storage or mapping.

#![warn(missing_docs)]

mod kind;
mod number;
mod value;

pub use kind::{FactAtom, FactKind, Temporality};
pub use number::{format_abbreviated, format_truncated, truncate};
pub use value::{Alignment, DomainValue, FormattedValue, ImageValue, ValueRange};
