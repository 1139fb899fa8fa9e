//! Map state and the frames rendered from it
//!
//! A [`MapFrame`] is everything the map layer consumes: the filtered ids,
//! per-country color images and labels, and the legend.

use crate::error::AtlasResult;
use crate::facts::Fact;
use crate::filter::Filter;
use crate::mapper::{DomainMapper, MapperRegistry, NullMapper, LINEAR};
use crate::provider::{DataProvider, FactMetadata};
use atlas_types::{DomainValue, ImageValue};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Shown for countries without a value
pub const NOT_AVAILABLE: &str = "N/A";

/// Steps of a numeric legend between image 0 and 1
pub const NUMERIC_LEGEND_STEPS: u32 = 10;

/// Selections driving the map
#[derive(Debug, Clone, PartialEq)]
pub struct MapState {
    filter: Filter,
    color_fact: Option<Fact>,
    label_fact: Option<Fact>,
    mapper_id: String,
    show_filtered: bool,
    revision: u64,
}

impl Default for MapState {
    fn default() -> Self {
        Self::new(LINEAR)
    }
}

impl MapState {
    pub fn new(mapper_id: impl Into<String>) -> Self {
        Self {
            filter: Filter::all(),
            color_fact: None,
            label_fact: None,
            mapper_id: mapper_id.into(),
            show_filtered: true,
            revision: 0,
        }
    }

    fn touch(&mut self, changed: bool) -> bool {
        if changed {
            self.revision += 1;
        }
        changed
    }

    /// Returns whether the filter differs from the current one
    pub fn set_filter(&mut self, filter: Filter) -> bool {
        let changed = self.filter != filter;
        if changed {
            self.filter = filter;
        }
        self.touch(changed)
    }

    pub fn set_color_fact(&mut self, fact: Option<Fact>) -> bool {
        let changed = self.color_fact != fact;
        if changed {
            self.color_fact = fact;
        }
        self.touch(changed)
    }

    pub fn set_label_fact(&mut self, fact: Option<Fact>) -> bool {
        let changed = self.label_fact != fact;
        if changed {
            self.label_fact = fact;
        }
        self.touch(changed)
    }

    pub fn set_mapper(&mut self, mapper_id: impl Into<String>) -> bool {
        let mapper_id = mapper_id.into();
        let changed = self.mapper_id != mapper_id;
        if changed {
            self.mapper_id = mapper_id;
        }
        self.touch(changed)
    }

    pub fn set_show_filtered(&mut self, show: bool) -> bool {
        let changed = self.show_filtered != show;
        self.show_filtered = show;
        self.touch(changed)
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn color_fact(&self) -> Option<&Fact> {
        self.color_fact.as_ref()
    }

    pub fn label_fact(&self) -> Option<&Fact> {
        self.label_fact.as_ref()
    }

    pub fn mapper_id(&self) -> &str {
        &self.mapper_id
    }

    pub fn show_filtered(&self) -> bool {
        self.show_filtered
    }

    /// Incremented on every effective change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether both states select the same thing, regardless of revision
    pub fn same_selection(&self, other: &MapState) -> bool {
        self.filter == other.filter
            && self.color_fact == other.color_fact
            && self.label_fact == other.label_fact
            && self.mapper_id == other.mapper_id
            && self.show_filtered == other.show_filtered
    }

    /// Build the mapper for the color fact under the current filter
    pub fn mapper(&self, provider: &DataProvider, mappers: &MapperRegistry) -> AtlasResult<Box<dyn DomainMapper>> {
        match &self.color_fact {
            Some(fact) => mappers.create(&self.mapper_id, fact, &self.filter, provider),
            None => Ok(Box::new(NullMapper)),
        }
    }

    /// Compute the frame for the current selections
    #[instrument(skip_all, fields(revision = self.revision))]
    pub fn render(&self, provider: &DataProvider, mappers: &MapperRegistry) -> AtlasResult<MapFrame> {
        let filtered_ids = provider.country_ids(&self.filter)?;
        let selected: HashSet<&str> = filtered_ids.iter().map(String::as_str).collect();
        let mapper = self.mapper(provider, mappers)?;

        let countries = provider
            .countries(&Filter::all())?
            .iter()
            .map(|country| {
                let in_filter = selected.contains(country.id());
                let image = self
                    .color_fact
                    .as_ref()
                    .and_then(|fact| country.value(fact))
                    .map(|value| mapper.domain_to_image(value));
                let label = match &self.label_fact {
                    Some(fact) => display(fact, country.value(fact)),
                    None => String::new(),
                };
                CountryView {
                    id: country.id().to_string(),
                    image,
                    label,
                    in_filter,
                    visible: in_filter || self.show_filtered,
                }
            })
            .collect::<Vec<_>>();

        let legend = match &self.color_fact {
            Some(fact) => legend(fact, mapper.as_ref(), &provider.fact_metadata(fact, &self.filter)?),
            None => Vec::new(),
        };

        debug!(countries = countries.len(), filtered = filtered_ids.len(), "Rendered frame");
        Ok(MapFrame {
            revision: self.revision,
            mapper: mapper.id().to_string(),
            color_fact: self.color_fact.as_ref().map(|f| f.id().to_string()),
            label_fact: self.label_fact.as_ref().map(|f| f.id().to_string()),
            show_filtered: self.show_filtered,
            filtered_ids,
            countries,
            legend,
        })
    }
}

/// Formatted value of a fact, or "N/A"
pub fn display(fact: &Fact, value: Option<&DomainValue>) -> String {
    value.and_then(|v| fact.format(v)).map_or_else(|| NOT_AVAILABLE.to_string(), |formatted| formatted.to_string())
}

/// Legend entries spanning the mapper's image range.
///
/// Numeric facts get images `0.0, 0.1, ..., 1.0`; categorical facts get one
/// entry per index of the metadata range.
pub fn legend(fact: &Fact, mapper: &dyn DomainMapper, metadata: &FactMetadata) -> Vec<LegendEntry> {
    let images: Vec<ImageValue> = match metadata {
        FactMetadata::Numeric { .. } => (0..=NUMERIC_LEGEND_STEPS)
            .map(|step| ImageValue::Numeric(f64::from(step) / f64::from(NUMERIC_LEGEND_STEPS)))
            .collect(),
        FactMetadata::Categorical { indices } => indices.clone().map(ImageValue::Categorical).collect(),
    };

    images
        .into_iter()
        .map(|image| LegendEntry { label: display(fact, mapper.image_to_domain(&image).as_ref()), image })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryView {
    pub id: String,
    /// `None` when the country has no value for the color fact
    pub image: Option<ImageValue>,
    pub label: String,
    pub in_filter: bool,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub image: ImageValue,
}

/// Output of one render
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFrame {
    pub revision: u64,
    pub mapper: String,
    pub color_fact: Option<String>,
    pub label_fact: Option<String>,
    pub show_filtered: bool,
    pub filtered_ids: Vec<String>,
    pub countries: Vec<CountryView>,
    pub legend: Vec<LegendEntry>,
}

impl MapFrame {
    pub fn country(&self, id: &str) -> Option<&CountryView> {
        self.countries.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{CategoricalFact, NumericFact};
    use crate::filter::Condition;
    use crate::mapper::{CategoricalMapper, LinearMapper};
    use atlas_types::ValueRange;

    #[test]
    fn test_setters_report_changes() {
        let area: Fact = NumericFact::new("Area").into();
        let mut state = MapState::default();

        assert!(state.set_color_fact(Some(area.clone())));
        assert!(!state.set_color_fact(Some(area.clone())));
        assert!(!state.set_filter(Filter::all()));
        assert!(state.set_filter(Filter::single(Condition::numeric(area.clone(), 0.0, 1.0))));
        assert!(!state.set_filter(Filter::single(Condition::numeric(area, 0.0, 1.0))));
        assert!(!state.set_mapper(LINEAR));
        assert!(state.set_mapper("Rank"));
        assert!(state.set_show_filtered(false));
        assert!(!state.set_show_filtered(false));
        assert_eq!(state.revision(), 4);
    }

    #[test]
    fn test_same_selection_ignores_revision() {
        let area: Fact = NumericFact::new("Area").into();
        let before = MapState::default();
        let mut state = before.clone();

        assert!(state.set_color_fact(Some(area)));
        assert!(!state.same_selection(&before));
        assert!(state.set_color_fact(None));
        assert_eq!(state.revision(), 2);
        assert!(state.same_selection(&before));
        assert_ne!(state, before);
    }

    #[test]
    fn test_legend_without_categories_is_empty() {
        let kind: Fact = CategoricalFact::new("Kind", Vec::<String>::new()).into();
        let mapper = CategoricalMapper::new(Vec::new());
        let metadata = FactMetadata::Categorical { indices: std::ops::RangeInclusive::new(1, 0) };
        assert!(legend(&kind, &mapper, &metadata).is_empty());
    }

    #[test]
    fn test_numeric_legend() {
        let area: Fact = NumericFact::new("Area").with_round_digits(0).into();
        let mapper = LinearMapper::new(ValueRange::new(0.0, 100.0));
        let entries = legend(&area, &mapper, &FactMetadata::Numeric { range: ValueRange::new(0.0, 100.0) });

        assert_eq!(entries.len(), 11);
        assert_eq!(entries[0].label, "0");
        assert_eq!(entries[5].label, "50");
        assert_eq!(entries[10].label, "100");
        assert_eq!(entries[10].image, ImageValue::Numeric(1.0));
    }

    #[test]
    fn test_categorical_legend() {
        let continent: Fact = CategoricalFact::new("Continent", ["Africa", "Asia"]).into();
        let mapper = CategoricalMapper::new(vec!["Africa".into(), "Asia".into()]);
        let entries = legend(&continent, &mapper, &FactMetadata::Categorical { indices: 0..=1 });

        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Africa", "Asia"]);
    }

    #[test]
    fn test_legend_without_inverse() {
        let area: Fact = NumericFact::new("Area").into();
        let entries = legend(&area, &NullMapper, &FactMetadata::Numeric { range: ValueRange::UNIT });
        assert!(entries.iter().all(|e| e.label == NOT_AVAILABLE));
    }

    #[test]
    fn test_display_absent_value() {
        let area: Fact = NumericFact::new("Area").into();
        assert_eq!(display(&area, None), NOT_AVAILABLE);
        assert_eq!(display(&area, Some(&DomainValue::Categorical("x".into()))), NOT_AVAILABLE);
    }
}
