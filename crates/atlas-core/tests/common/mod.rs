//! Shared country fixture for integration tests
#![allow(dead_code)]

use atlas_core::{
    AtlasResult, CategoricalFact, CountryStore, DataProvider, FactRegistry, NumericFact, SqlQuery, SqlRow,
    SqliteStore,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const CONTINENTS: [&str; 5] = ["Africa", "Americas", "Asia", "Europe", "Oceania"];

/// Seven countries. `AQ` stores its continent as a raw label and has no
/// population; `XX` has no values at all.
pub const FIXTURE_SQL: &str = "
    CREATE TABLE country (
        country_id TEXT NOT NULL,
        country_population REAL,
        country_area REAL,
        country_continent
    );
    INSERT INTO country VALUES ('FR', 68.0, 549.0, 3);
    INSERT INTO country VALUES ('DE', 84.0, 357.0, 3);
    INSERT INTO country VALUES ('JP', 125.0, 378.0, 2);
    INSERT INTO country VALUES ('NG', 223.0, 924.0, 0);
    INSERT INTO country VALUES ('AQ', NULL, 14000.0, 'Antarctica');
    INSERT INTO country VALUES ('VA', 0.8, 0.44, 3);
    INSERT INTO country VALUES ('XX', NULL, NULL, NULL);
";

pub fn registry() -> Arc<FactRegistry> {
    Arc::new(
        FactRegistry::new(vec![
            NumericFact::new("Population").by_rank().with_round_digits(0).into(),
            NumericFact::new("Area").with_round_digits(0).with_unit("km²").into(),
            CategoricalFact::new("Continent", CONTINENTS).into(),
        ])
        .expect("fixture registry"),
    )
}

pub fn store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().expect("in-memory store");
    store.execute_batch(FIXTURE_SQL).expect("fixture schema");
    store
}

pub fn provider() -> DataProvider {
    DataProvider::new(Box::new(store()), registry()).expect("provider")
}

/// Store wrapper counting round trips
pub struct SpyStore {
    inner: SqliteStore,
    calls: Arc<AtomicUsize>,
}

impl CountryStore for SpyStore {
    fn query(&self, query: &SqlQuery) -> AtlasResult<Vec<SqlRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.query(query)
    }
}

pub struct SpiedProvider {
    pub provider: DataProvider,
    calls: Arc<AtomicUsize>,
}

impl SpiedProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn spied_provider() -> SpiedProvider {
    let calls = Arc::new(AtomicUsize::new(0));
    let spy = SpyStore { inner: store(), calls: Arc::clone(&calls) };
    let provider = DataProvider::new(Box::new(spy), registry()).expect("provider");
    SpiedProvider { provider, calls }
}

pub fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}
