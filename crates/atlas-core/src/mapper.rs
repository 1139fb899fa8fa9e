//! Domain mappers: conversions between stored values and normalized map
//! values, plus the factories that build them for the active fact and filter.
//!
//! A factory asked for a fact of the wrong kind degrades to [`NullMapper`]
//! instead of failing, so the map always has something to draw.

use crate::error::{AtlasError, AtlasResult};
use crate::facts::Fact;
use crate::filter::Filter;
use crate::provider::{DataProvider, RankTable};
use atlas_types::{DomainValue, ImageValue, ValueRange};
use std::fmt;
use tracing::{debug, warn};

pub const LINEAR: &str = "Linear";
pub const RANK: &str = "Rank";
pub const CATEGORICAL: &str = "Categorical";
pub const NULL: &str = "Null";

/// Converts domain values into image values and, best effort, back
pub trait DomainMapper: fmt::Debug + Send + Sync {
    /// Id of the strategy that produced this mapper
    fn id(&self) -> &'static str;

    fn domain_to_image(&self, value: &DomainValue) -> ImageValue;

    /// Approximate inverse, `None` where the image has no preimage
    fn image_to_domain(&self, image: &ImageValue) -> Option<DomainValue>;
}

/// Affine normalization over a metadata range.
///
/// Images are clamped to `[0, 1]`; a degenerate range maps everything to 0.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearMapper {
    range: ValueRange,
}

impl LinearMapper {
    pub fn new(range: ValueRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> ValueRange {
        self.range
    }
}

impl DomainMapper for LinearMapper {
    fn id(&self) -> &'static str {
        LINEAR
    }

    fn domain_to_image(&self, value: &DomainValue) -> ImageValue {
        let Some(v) = value.as_f64() else {
            return ImageValue::Numeric(0.0);
        };
        if self.range.is_degenerate() {
            return ImageValue::Numeric(0.0);
        }
        let image = (v - self.range.lower) / self.range.span();
        if image.is_nan() {
            return ImageValue::Numeric(0.0);
        }
        ImageValue::Numeric(image.clamp(0.0, 1.0))
    }

    fn image_to_domain(&self, image: &ImageValue) -> Option<DomainValue> {
        let ImageValue::Numeric(p) = image else {
            return None;
        };
        if self.range.is_degenerate() {
            return Some(DomainValue::Numeric(self.range.lower));
        }
        Some(DomainValue::Numeric(self.range.lower + p * self.range.span()))
    }
}

/// Percentile position within a rank table
#[derive(Debug, Clone, PartialEq)]
pub struct RankMapper {
    values: Vec<f64>,
}

impl RankMapper {
    pub fn new(table: &RankTable) -> Self {
        Self { values: table.values().collect() }
    }

    /// From already sorted values
    pub fn from_sorted(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Index of the first entry strictly greater than `v`, or the last index
    fn position(&self, v: f64) -> usize {
        let index = self.values.partition_point(|x| *x <= v);
        index.min(self.values.len().saturating_sub(1))
    }
}

impl DomainMapper for RankMapper {
    fn id(&self) -> &'static str {
        RANK
    }

    #[allow(clippy::cast_precision_loss)]
    fn domain_to_image(&self, value: &DomainValue) -> ImageValue {
        let count = self.values.len();
        let Some(v) = value.as_f64() else {
            return ImageValue::Numeric(0.0);
        };
        if count < 2 || v.is_nan() {
            return ImageValue::Numeric(0.0);
        }
        ImageValue::Numeric(self.position(v) as f64 / (count - 1) as f64)
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn image_to_domain(&self, image: &ImageValue) -> Option<DomainValue> {
        let ImageValue::Numeric(p) = image else {
            return None;
        };
        if p.is_nan() {
            return None;
        }
        let last = self.values.len().checked_sub(1)?;
        let position = p.clamp(0.0, 1.0) * last as f64;
        let lower = position.floor() as usize;
        let below = self.values[lower];
        if position == position.floor() || lower >= last {
            return Some(DomainValue::Numeric(below));
        }
        let above = self.values[lower + 1];
        let t = position - lower as f64;
        Some(DomainValue::Numeric(below + (above - below) * t))
    }
}

/// Label to index in the fact's category list
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalMapper {
    labels: Vec<String>,
}

impl CategoricalMapper {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }
}

impl DomainMapper for CategoricalMapper {
    fn id(&self) -> &'static str {
        CATEGORICAL
    }

    fn domain_to_image(&self, value: &DomainValue) -> ImageValue {
        let index = value.as_label().and_then(|label| self.labels.iter().position(|l| l == label)).unwrap_or(0);
        ImageValue::Categorical(index)
    }

    fn image_to_domain(&self, image: &ImageValue) -> Option<DomainValue> {
        let index = image.as_index()?;
        self.labels.get(index).map(|label| DomainValue::Categorical(label.clone()))
    }
}

/// Maps everything to 0
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NullMapper;

impl DomainMapper for NullMapper {
    fn id(&self) -> &'static str {
        NULL
    }

    fn domain_to_image(&self, _value: &DomainValue) -> ImageValue {
        ImageValue::Numeric(0.0)
    }

    fn image_to_domain(&self, _image: &ImageValue) -> Option<DomainValue> {
        None
    }
}

/// Builds a mapper for a fact under the active filter
pub trait DomainMapperFactory: Send + Sync {
    fn id(&self) -> &'static str;

    fn create(&self, fact: &Fact, filter: &Filter, provider: &DataProvider) -> AtlasResult<Box<dyn DomainMapper>>;
}

fn fallback(factory: &str, fact: &Fact) -> Box<dyn DomainMapper> {
    warn!(mapper = factory, fact = fact.id(), kind = %fact.kind(), "Fact kind not supported, using null mapper");
    Box::new(NullMapper)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinearMapperFactory;

impl DomainMapperFactory for LinearMapperFactory {
    fn id(&self) -> &'static str {
        LINEAR
    }

    fn create(&self, fact: &Fact, filter: &Filter, provider: &DataProvider) -> AtlasResult<Box<dyn DomainMapper>> {
        match provider.fact_metadata(fact, filter)?.numeric_range() {
            Some(range) => {
                debug!(fact = fact.id(), %range, "Linear mapper");
                Ok(Box::new(LinearMapper::new(range)))
            }
            None => Ok(fallback(LINEAR, fact)),
        }
    }
}

/// Rank mapper over the whole-set table restricted to the filter
#[derive(Debug, Clone, Copy, Default)]
pub struct RankMapperFactory;

impl DomainMapperFactory for RankMapperFactory {
    fn id(&self) -> &'static str {
        RANK
    }

    fn create(&self, fact: &Fact, filter: &Filter, provider: &DataProvider) -> AtlasResult<Box<dyn DomainMapper>> {
        let Some(numeric) = fact.as_numeric() else {
            return Ok(fallback(RANK, fact));
        };
        let table = provider.fact_rank_filtered(numeric, filter)?;
        debug!(fact = fact.id(), entries = table.len(), "Rank mapper");
        Ok(Box::new(RankMapper::new(&table)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CategoricalMapperFactory;

impl DomainMapperFactory for CategoricalMapperFactory {
    fn id(&self) -> &'static str {
        CATEGORICAL
    }

    fn create(&self, fact: &Fact, _filter: &Filter, _provider: &DataProvider) -> AtlasResult<Box<dyn DomainMapper>> {
        match fact.as_categorical() {
            Some(categorical) => Ok(Box::new(CategoricalMapper::new(categorical.category_labels.clone()))),
            None => Ok(fallback(CATEGORICAL, fact)),
        }
    }
}

/// The mapper a fact asks for when none is chosen explicitly
pub fn preferred_mapper_id(fact: &Fact) -> &'static str {
    match fact {
        Fact::Numeric(numeric) if numeric.distribute_by_rank => RANK,
        Fact::Numeric(_) => LINEAR,
        Fact::Categorical(_) => CATEGORICAL,
    }
}

/// Mapper factories keyed by id, in registration order
pub struct MapperRegistry {
    factories: Vec<Box<dyn DomainMapperFactory>>,
}

impl fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperRegistry").field("ids", &self.ids()).finish()
    }
}

impl MapperRegistry {
    /// Registry holding the linear, rank and categorical factories
    pub fn new() -> Self {
        Self {
            factories: vec![
                Box::new(LinearMapperFactory),
                Box::new(RankMapperFactory),
                Box::new(CategoricalMapperFactory),
            ],
        }
    }

    pub fn empty() -> Self {
        Self { factories: Vec::new() }
    }

    pub fn register(&mut self, factory: Box<dyn DomainMapperFactory>) -> AtlasResult<()> {
        if self.get(factory.id()).is_some() {
            return Err(AtlasError::configuration(
                "mappers",
                format!("Mapper '{}' is registered more than once", factory.id()),
            ));
        }
        self.factories.push(factory);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&dyn DomainMapperFactory> {
        self.factories.iter().find(|f| f.id() == id).map(|f| f.as_ref())
    }

    pub fn require(&self, id: &str) -> AtlasResult<&dyn DomainMapperFactory> {
        self.get(id).ok_or_else(|| AtlasError::shape(format!("Unknown mapper '{id}'")))
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.factories.iter().map(|f| f.id()).collect()
    }

    pub fn create(
        &self,
        id: &str,
        fact: &Fact,
        filter: &Filter,
        provider: &DataProvider,
    ) -> AtlasResult<Box<dyn DomainMapper>> {
        self.require(id)?.create(fact, filter, provider)
    }
}

impl Default for MapperRegistry {
    fn default() -> Self {
        Self::new()
    }
}
