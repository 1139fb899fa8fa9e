//! Mapper factories against provider metadata

mod common;

use atlas_core::mapper::{CATEGORICAL, LINEAR, NULL, RANK};
use atlas_core::{AtlasError, Condition, Filter, MapperRegistry};
use atlas_types::{DomainValue, ImageValue};
use common::provider;

fn image(value: f64, mapper: &dyn atlas_core::DomainMapper) -> ImageValue {
    mapper.domain_to_image(&DomainValue::Numeric(value))
}

#[test]
fn test_linear_uses_filtered_range() {
    let provider = provider();
    let mappers = MapperRegistry::new();
    let registry = provider.registry().clone();
    let area = registry.require("Area").unwrap();
    let filter = Filter::single(Condition::numeric(registry.require("Population").unwrap().clone(), 50.0, 150.0));

    let mapper = mappers.create(LINEAR, area, &filter, &provider).unwrap();
    assert_eq!(mapper.id(), LINEAR);
    assert_eq!(image(357.0, mapper.as_ref()), ImageValue::Numeric(0.0));
    assert_eq!(image(453.0, mapper.as_ref()), ImageValue::Numeric(0.5));
    assert_eq!(image(549.0, mapper.as_ref()), ImageValue::Numeric(1.0));
}

#[test]
fn test_rank_over_whole_set() {
    let provider = provider();
    let mappers = MapperRegistry::new();
    let population = provider.registry().require("Population").unwrap().clone();

    let mapper = mappers.create(RANK, &population, &Filter::all(), &provider).unwrap();
    assert_eq!(image(0.8, mapper.as_ref()), ImageValue::Numeric(0.25));
    assert_eq!(image(84.0, mapper.as_ref()), ImageValue::Numeric(0.75));
    assert_eq!(image(223.0, mapper.as_ref()), ImageValue::Numeric(1.0));
    assert_eq!(mapper.image_to_domain(&ImageValue::Numeric(0.5)), Some(DomainValue::Numeric(84.0)));
    assert_eq!(mapper.image_to_domain(&ImageValue::Numeric(1.0)), Some(DomainValue::Numeric(223.0)));
}

#[test]
fn test_rank_restricted_to_filter() {
    let provider = provider();
    let mappers = MapperRegistry::new();
    let registry = provider.registry().clone();
    let population = registry.require("Population").unwrap();
    let filter = Filter::single(Condition::numeric(registry.require("Area").unwrap().clone(), 0.0, 500.0));

    let mapper = mappers.create(RANK, population, &filter, &provider).unwrap();
    assert_eq!(image(0.5, mapper.as_ref()), ImageValue::Numeric(0.0));
    assert_eq!(image(0.8, mapper.as_ref()), ImageValue::Numeric(0.5));
    assert_eq!(image(84.0, mapper.as_ref()), ImageValue::Numeric(1.0));
    assert_eq!(image(125.0, mapper.as_ref()), ImageValue::Numeric(1.0));
}

#[test]
fn test_rank_is_monotonic_over_table() {
    let provider = provider();
    let population = provider.registry().require("Population").unwrap().clone();
    let mapper = MapperRegistry::new().create(RANK, &population, &Filter::all(), &provider).unwrap();

    let mut previous = 0.0;
    for value in [-1.0, 0.8, 10.0, 68.0, 70.0, 84.0, 125.0, 200.0, 223.0, 1e6] {
        let current = image(value, mapper.as_ref()).as_f64().unwrap();
        assert!(current >= previous, "{value} mapped below its predecessor");
        previous = current;
    }
}

#[test]
fn test_categorical_factory() {
    let provider = provider();
    let continent = provider.registry().require("Continent").unwrap().clone();
    let mapper = MapperRegistry::new().create(CATEGORICAL, &continent, &Filter::all(), &provider).unwrap();

    let asia = mapper.domain_to_image(&DomainValue::Categorical("Asia".into()));
    assert_eq!(asia, ImageValue::Categorical(2));
    assert_eq!(mapper.image_to_domain(&asia), Some(DomainValue::Categorical("Asia".into())));
}

#[test]
fn test_kind_mismatch_degrades_to_null() {
    let provider = provider();
    let mappers = MapperRegistry::new();
    let registry = provider.registry().clone();
    let continent = registry.require("Continent").unwrap();
    let area = registry.require("Area").unwrap();

    for (id, fact) in [(RANK, continent), (LINEAR, continent), (CATEGORICAL, area)] {
        let mapper = mappers.create(id, fact, &Filter::all(), &provider).unwrap();
        assert_eq!(mapper.id(), NULL, "{id} on {}", fact.id());
        assert_eq!(mapper.domain_to_image(&DomainValue::Numeric(5.0)), ImageValue::Numeric(0.0));
    }
}

#[test]
fn test_unknown_mapper_is_rejected() {
    let provider = provider();
    let area = provider.registry().require("Area").unwrap().clone();
    let err = MapperRegistry::new().create("Log", &area, &Filter::all(), &provider).unwrap_err();
    assert!(matches!(err, AtlasError::Shape { .. }));
}
