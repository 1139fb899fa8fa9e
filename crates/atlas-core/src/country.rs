use crate::facts::Fact;
use atlas_types::DomainValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A hydrated country record.
///
/// Attributes are keyed by fact id; a missing key is an absent value, never a
/// zero. Records are immutable once built, re-hydration produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    id: String,
    values: BTreeMap<String, DomainValue>,
}

impl Country {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), values: BTreeMap::new() }
    }

    /// Builder used during hydration and by fixtures
    #[must_use]
    pub fn with_value(mut self, fact_id: impl Into<String>, value: DomainValue) -> Self {
        self.values.insert(fact_id.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self, fact: &Fact) -> Option<&DomainValue> {
        self.values.get(fact.id())
    }

    pub fn value_by_id(&self, fact_id: &str) -> Option<&DomainValue> {
        self.values.get(fact_id)
    }

    pub fn values(&self) -> &BTreeMap<String, DomainValue> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::NumericFact;

    #[test]
    fn test_absent_is_not_zero() {
        let area: Fact = NumericFact::new("Area").into();
        let country = Country::new("DEU").with_value("Population", DomainValue::Numeric(83.0));
        assert_eq!(country.id(), "DEU");
        assert!(country.value(&area).is_none());
        assert_eq!(country.value_by_id("Population"), Some(&DomainValue::Numeric(83.0)));
    }
}
