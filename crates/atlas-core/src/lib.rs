#![allow(missing_docs)]
//! Core of the Atlas country map.
//!
//! This crate provides the typed fact registry, the filter model and its SQL
//! compiler, the data provider that hydrates countries and rank tables from a
//! read-only store, and the domain mappers that turn stored values into
//! normalized values for coloring the map.

/// Session caches owned by the data provider
pub mod cache;
/// Debounced event handling at the map boundary
pub mod controller;
/// Hydrated country records
pub mod country;
/// Error taxonomy
pub mod error;
/// Fact descriptors and the fact registry
pub mod facts;
/// Filter model and reference evaluator
pub mod filter;
/// Domain mapper strategies and factories
pub mod mapper;
/// Query execution, hydration, rank tables and metadata
pub mod provider;
/// Filter to SQL compilation
pub mod query;
/// Map selections and rendered frames
pub mod state;
/// Backing store access
pub mod store;

pub use cache::{CacheStats, SessionCache};
pub use controller::{DEFAULT_DEBOUNCE, MapController, MapEvent, event_channel};
pub use country::Country;
pub use error::{AtlasError, AtlasResult, ErrorSeverity, ResultExt};
pub use facts::{CategoricalFact, ConcreteFact, Fact, FactRegistry, FactUsage, NumericFact};
pub use filter::{Condition, ConditionSpec, ConditionValue, Conjunction, ConjunctionSpec, Filter, FilterSpec};
pub use mapper::{
    CategoricalMapper, CategoricalMapperFactory, DomainMapper, DomainMapperFactory, LinearMapper,
    LinearMapperFactory, MapperRegistry, NullMapper, RankMapper, RankMapperFactory, preferred_mapper_id,
};
pub use provider::{DataProvider, FactMetadata, ProviderCacheStats, RankTable};
pub use query::{SqlQuery, SqlValue, compile_condition, compile_filter, select_ids_query};
pub use state::{CountryView, LegendEntry, MapFrame, MapState};
pub use store::{CountryStore, SqlRow, SqliteStore};
