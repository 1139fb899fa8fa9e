use serde::{Deserialize, Serialize};
use std::fmt;

/// A fact value as stored for an entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DomainValue {
    /// Numeric measurement
    Numeric(f64),
    /// Category label
    Categorical(String),
}

/// A fact value as needed by the visualization: a position in `[0, 1]` or a
/// category index used for color lookup and legend ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ImageValue {
    /// Normalized position, expected in `[0, 1]`
    Numeric(f64),
    /// Index into the fact's category list
    Categorical(usize),
}

// -------------------------------------------------------------------------------------------------
// Conversion from `DomainValue` to `serde_json::Value` for the JSON surfaces of the CLI.
// -------------------------------------------------------------------------------------------------

impl From<&DomainValue> for serde_json::Value {
    fn from(value: &DomainValue) -> Self {
        match value {
            DomainValue::Numeric(n) => serde_json::Number::from_f64(*n).map_or(Self::Null, Self::Number),
            DomainValue::Categorical(label) => Self::String(label.clone()),
        }
    }
}

impl std::hash::Hash for DomainValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Self::Numeric(n) => {
                0u8.hash(state);
                n.to_bits().hash(state);
            }
            Self::Categorical(label) => {
                1u8.hash(state);
                label.hash(state);
            }
        }
    }
}

impl fmt::Display for DomainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Categorical(label) => write!(f, "{label}"),
        }
    }
}

impl DomainValue {
    /// The numeric payload, if this is a numeric value
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(n) => Some(*n),
            Self::Categorical(_) => None,
        }
    }

    /// The label, if this is a categorical value
    #[must_use]
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Categorical(label) => Some(label),
            Self::Numeric(_) => None,
        }
    }
}

impl ImageValue {
    /// The normalized position, if numeric
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(n) => Some(*n),
            Self::Categorical(_) => None,
        }
    }

    /// The category index, if categorical
    #[must_use]
    pub const fn as_index(&self) -> Option<usize> {
        match self {
            Self::Categorical(i) => Some(*i),
            Self::Numeric(_) => None,
        }
    }
}

/// Closed numeric interval `[lower, upper]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ValueRange {
    /// Inclusive lower bound
    pub lower: f64,
    /// Inclusive upper bound
    pub upper: f64,
}

impl ValueRange {
    /// The unit interval, used whenever a range cannot be derived from data
    pub const UNIT: Self = Self { lower: 0.0, upper: 1.0 };

    /// Create a range; the bounds are taken as given
    #[must_use]
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// `upper - lower`
    #[must_use]
    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }

    /// True when the range collapses to a single point
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_degenerate(&self) -> bool {
        self.upper == self.lower
    }

    /// Inclusive containment test
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::UNIT
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

/// Horizontal alignment hint for a formatted value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Flush left, used for labels
    Left,
    /// Centered
    Center,
    /// Flush right, used for numbers
    Right,
}

/// A value ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedValue {
    /// The rendered value
    pub value: String,
    /// Unit to show next to the value
    pub unit: Option<String>,
    /// Alignment hint
    pub alignment: Alignment,
}

impl fmt::Display for FormattedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{} {unit}", self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_value_json_conversion() {
        let json: serde_json::Value = (&DomainValue::Numeric(2.5)).into();
        assert_eq!(json, serde_json::json!(2.5));

        let json: serde_json::Value = (&DomainValue::Categorical("Sovereign".to_string())).into();
        assert_eq!(json, serde_json::json!("Sovereign"));
    }

    #[test]
    fn test_non_finite_numeric_serializes_as_null() {
        let json: serde_json::Value = (&DomainValue::Numeric(f64::NAN)).into();
        assert_eq!(json, serde_json::Value::Null);
    }

    #[test]
    fn test_range_helpers() {
        let range = ValueRange::new(10.0, 20.0);
        assert_eq!(range.span(), 10.0);
        assert!(range.contains(10.0));
        assert!(range.contains(20.0));
        assert!(!range.contains(20.5));
        assert!(!range.is_degenerate());
        assert!(ValueRange::new(3.0, 3.0).is_degenerate());
        assert_eq!(ValueRange::default(), ValueRange::UNIT);
    }

    #[test]
    fn test_formatted_value_display() {
        let formatted = FormattedValue {
            value: "1200".to_string(),
            unit: Some("km²".to_string()),
            alignment: Alignment::Right,
        };
        assert_eq!(formatted.to_string(), "1200 km²");
    }
}
