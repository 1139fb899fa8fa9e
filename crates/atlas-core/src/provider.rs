//! Data provider: runs compiled queries, hydrates countries and serves rank
//! tables and fact metadata.
//!
//! Rank tables are always built over the whole country set and cached per
//! fact. Filter-scoped views are derived from the cached table by id
//! membership and are never cached themselves.

use crate::cache::{CacheStats, SessionCache};
use crate::country::Country;
use crate::error::{AtlasError, AtlasResult};
use crate::facts::{Fact, FactRegistry, NumericFact};
use crate::filter::Filter;
use crate::query::{column_for, hydrate_query, rank_query, select_ids_query, SqlQuery, SqlValue, TABLE_NAME};
use crate::store::CountryStore;
use atlas_types::{DomainValue, ValueRange};
use serde::Serialize;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Sorted ascending `(country id, value)` pairs for one numeric fact
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankTable {
    entries: Vec<(String, f64)>,
}

impl RankTable {
    /// Build a table, sorting by value. Equal values keep their input order.
    pub fn new(mut entries: Vec<(String, f64)>) -> Self {
        entries.sort_by(|a, b| a.1.total_cmp(&b.1));
        Self { entries }
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(_, v)| *v)
    }

    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.entries.get(index).map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only the entries whose id is in `ids`, preserving order
    pub fn restrict_to(&self, ids: &HashSet<String>) -> Self {
        Self { entries: self.entries.iter().filter(|(id, _)| ids.contains(id)).cloned().collect() }
    }

    /// `[min, max]` of the table, `None` when empty
    pub fn range(&self) -> Option<ValueRange> {
        let first = self.entries.first()?;
        let last = self.entries.last()?;
        Some(ValueRange::new(first.1, last.1))
    }
}

/// Data-dependent bounds of a fact under a filter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactMetadata {
    Numeric { range: ValueRange },
    Categorical { indices: RangeInclusive<usize> },
}

impl FactMetadata {
    pub fn numeric_range(&self) -> Option<ValueRange> {
        match self {
            FactMetadata::Numeric { range } => Some(*range),
            FactMetadata::Categorical { .. } => None,
        }
    }

    pub fn category_indices(&self) -> Option<RangeInclusive<usize>> {
        match self {
            FactMetadata::Categorical { indices } => Some(indices.clone()),
            FactMetadata::Numeric { .. } => None,
        }
    }
}

/// Cache counters of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderCacheStats {
    pub countries: CacheStats,
    pub ranks: CacheStats,
}

pub struct DataProvider {
    store: Box<dyn CountryStore>,
    registry: Arc<FactRegistry>,
    columns: HashSet<String>,
    countries: SessionCache<String, Country>,
    ranks: SessionCache<String, RankTable>,
}

impl std::fmt::Debug for DataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataProvider")
            .field("facts", &self.registry.len())
            .field("columns", &self.columns.len())
            .field("countries", &self.countries.len())
            .field("ranks", &self.ranks.len())
            .finish()
    }
}

impl DataProvider {
    /// Create a provider over a store.
    ///
    /// Reads the column list of the `country` table once; facts whose column
    /// is missing are hydrated as absent.
    pub fn new(store: Box<dyn CountryStore>, registry: Arc<FactRegistry>) -> AtlasResult<Self> {
        let rows = store.query(&SqlQuery {
            sql: format!("SELECT name FROM pragma_table_info('{TABLE_NAME}')"),
            params: Vec::new(),
        })?;
        let columns: HashSet<String> =
            rows.iter().filter_map(|row| row.first().and_then(SqlValue::as_text)).map(str::to_lowercase).collect();
        if columns.is_empty() {
            return Err(AtlasError::configuration("store", format!("Table '{TABLE_NAME}' has no columns")));
        }

        for fact in registry.all() {
            if !columns.contains(&fact.column_name()) {
                warn!(fact = fact.id(), column = %fact.column_name(), "Fact has no backing column");
            }
        }

        info!(columns = columns.len(), facts = registry.len(), "Data provider ready");
        Ok(Self {
            store,
            registry,
            columns,
            countries: SessionCache::new(),
            ranks: SessionCache::new(),
        })
    }

    pub fn registry(&self) -> &Arc<FactRegistry> {
        &self.registry
    }

    fn has_column(&self, fact_id: &str) -> bool {
        self.columns.contains(&column_for(fact_id))
    }

    /// Ids of the countries matching `filter`, in store order
    #[instrument(skip(self, filter), fields(match_all = filter.is_match_all()))]
    pub fn country_ids(&self, filter: &Filter) -> AtlasResult<Vec<String>> {
        let query = select_ids_query(filter)?;
        let rows = self.store.query(&query)?;
        let ids: Vec<String> = rows.iter().filter_map(|row| row.first().and_then(SqlValue::to_id)).collect();
        debug!(count = ids.len(), "Selected country ids");
        Ok(ids)
    }

    /// Countries matching `filter`, hydrated through the cache
    #[instrument(skip(self, filter))]
    pub fn countries(&self, filter: &Filter) -> AtlasResult<Vec<Arc<Country>>> {
        let ids = self.country_ids(filter)?;
        let mut countries = Vec::with_capacity(ids.len());
        for id in ids {
            match self.hydrate(&id)? {
                Some(country) => countries.push(country),
                None => warn!(id = %id, "Selected country vanished before hydration"),
            }
        }
        Ok(countries)
    }

    /// Load one country with every table and map fact, cache-first.
    ///
    /// `Ok(None)` when no row has this id.
    #[instrument(skip(self))]
    pub fn hydrate(&self, id: &str) -> AtlasResult<Option<Arc<Country>>> {
        if let Some(country) = self.countries.get(id) {
            debug!("Country cache hit");
            return Ok(Some(country));
        }

        let facts: Vec<&Fact> =
            self.registry.hydration_facts().into_iter().filter(|f| self.has_column(f.id())).collect();
        let rows = self.store.query(&hydrate_query(&facts, id))?;
        let Some(row) = rows.into_iter().next() else {
            debug!("No such country");
            return Ok(None);
        };

        let country_id = row.first().and_then(SqlValue::to_id).unwrap_or_else(|| id.to_string());
        let mut country = Country::new(country_id);
        for (fact, cell) in facts.iter().zip(row.iter().skip(1)) {
            if let Some(value) = decode_cell(fact, cell) {
                country = country.with_value(fact.id(), value);
            }
        }

        Ok(Some(self.countries.insert(id.to_string(), country)))
    }

    /// Whole-set rank table of a numeric fact, built once per session
    #[instrument(skip(self, fact), fields(fact = %fact.id))]
    pub fn fact_rank(&self, fact: &NumericFact) -> AtlasResult<Arc<RankTable>> {
        self.ranks.get_or_try_insert_with(fact.id.clone(), || {
            if !self.has_column(&fact.id) {
                return Ok(RankTable::default());
            }
            let rows = self.store.query(&rank_query(fact))?;
            let entries: Vec<(String, f64)> = rows
                .iter()
                .filter_map(|row| {
                    let id = row.first().and_then(SqlValue::to_id)?;
                    let value = row.get(1).and_then(SqlValue::as_f64)?;
                    Some((id, value))
                })
                .collect();
            info!(entries = entries.len(), "Built rank table");
            Ok(RankTable::new(entries))
        })
    }

    /// Rank table restricted to the countries matching `filter`
    #[instrument(skip(self, fact, filter), fields(fact = %fact.id))]
    pub fn fact_rank_filtered(&self, fact: &NumericFact, filter: &Filter) -> AtlasResult<Arc<RankTable>> {
        let table = self.fact_rank(fact)?;
        if filter.is_match_all() {
            return Ok(table);
        }
        let ids: HashSet<String> = self.country_ids(filter)?.into_iter().collect();
        Ok(Arc::new(table.restrict_to(&ids)))
    }

    /// Range or category indices of `fact` under `filter`.
    ///
    /// An empty numeric selection yields `[0, 1]`. A categorical fact without
    /// labels yields an empty index range.
    pub fn fact_metadata(&self, fact: &Fact, filter: &Filter) -> AtlasResult<FactMetadata> {
        match fact {
            Fact::Numeric(numeric) => {
                let range = self.fact_rank_filtered(numeric, filter)?.range().unwrap_or(ValueRange::UNIT);
                Ok(FactMetadata::Numeric { range })
            }
            Fact::Categorical(categorical) => {
                let indices = match categorical.category_labels.len() {
                    0 => RangeInclusive::new(1, 0),
                    len => 0..=len - 1,
                };
                Ok(FactMetadata::Categorical { indices })
            }
        }
    }

    /// Drop every cached country and rank table
    pub fn invalidate_caches(&self) {
        self.countries.clear();
        self.ranks.clear();
        info!("Provider caches invalidated");
    }

    /// Drop the cached entry of one country
    pub fn invalidate_country(&self, id: &str) -> bool {
        self.countries.invalidate(id)
    }

    pub fn cache_stats(&self) -> ProviderCacheStats {
        ProviderCacheStats { countries: self.countries.stats(), ranks: self.ranks.stats() }
    }
}

/// Interpret a stored cell according to the owning fact's kind
fn decode_cell(fact: &Fact, cell: &SqlValue) -> Option<DomainValue> {
    if cell.is_null() {
        return None;
    }
    match fact {
        Fact::Numeric(_) => {
            let value = cell.as_f64();
            if value.is_none() {
                warn!(fact = fact.id(), cell = ?cell, "Numeric column holds a non-numeric value");
            }
            value.map(DomainValue::Numeric)
        }
        Fact::Categorical(categorical) => match cell {
            SqlValue::Text(label) => Some(DomainValue::Categorical(label.clone())),
            _ => {
                let label = cell
                    .as_f64()
                    .filter(|i| *i >= 0.0 && i.fract() == 0.0)
                    .and_then(|i| categorical.label(i as usize));
                if label.is_none() {
                    warn!(fact = fact.id(), cell = ?cell, "Category index out of range");
                }
                label.map(|l| DomainValue::Categorical(l.to_string()))
            }
        },
    }
}
