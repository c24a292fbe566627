#![cfg(test)]

use ww_filters::saved::{
    FilterRegistry, MemoryStore, SaveError, SaveRequest, SavedFilterStore, SavedFilters,
};
use ww_filters::{FilterCollection, Model, ModelOptions, Params, QuerySet};

#[derive(Model)]
#[allow(dead_code)]
struct Book {
    title: String,
    pages: u32,
    #[filter(exclude)]
    isbn: String,
}

fn service() -> SavedFilters<MemoryStore> {
    let books = FilterCollection::for_model::<Book>(ModelOptions::new()).unwrap();
    SavedFilters::new(FilterRegistry::new().register("books", books), MemoryStore::new())
}

fn request(user: u64, name: &str, data: &str) -> SaveRequest {
    SaveRequest {
        user,
        name: name.to_string(),
        data: data.to_string(),
        source: "/books/".to_string(),
        filter_type: "books".to_string(),
    }
}

#[test_log::test]
fn saved_selection_resolves() {
    let mut saved = service();
    let long = saved
        .save(request(
            1,
            "Long books",
            "?pages_filter=greater_than&pages_filter_greater_than_0_value=500",
        ))
        .unwrap();

    let fc = saved.registry().get(&long.filter_type).unwrap();
    let resolved = fc
        .resolve(QuerySet::all(), Some(&Params::parse(&long.data)), None)
        .unwrap();
    assert!(!resolved.resolution.has_errors());
    assert_eq!(resolved.query.to_string(), "pages__gt=500");
}

#[test_log::test]
fn invalid_selections_are_not_stored() {
    let mut saved = service();
    let err = saved
        .save(request(
            1,
            "Broken",
            "?title_filter=contains&pages_filter=less_than&pages_filter_less_than_0_value=ten",
        ))
        .unwrap_err();
    assert!(
        matches!(err, SaveError::Invalid { ref fields } if fields == &["title", "pages"]),
        "{:?}",
        err
    );

    let err = saved
        .save(request(1, "Unknown operator", "?pages_filter=contains"))
        .unwrap_err();
    assert!(err.is_rejection());

    let err = saved
        .save(request(1, "Blank operator", "?title_filter="))
        .unwrap_err();
    assert!(matches!(err, SaveError::Resolve(_)), "{:?}", err);
    assert!(saved.store().is_empty());
}

#[test_log::test]
fn listing_is_per_user() {
    let mut saved = service();
    saved.save(request(1, "a", "")).unwrap();
    saved.save(request(2, "b", "")).unwrap();
    saved
        .save(request(1, "c", "?pages_filter=less_than&pages_filter_less_than_0_value=9"))
        .unwrap();

    let names = |saved: &SavedFilters<MemoryStore>, user| {
        saved
            .list(user, "books")
            .into_iter()
            .map(|f| f.name)
            .collect::<Vec<_>>()
    };
    assert_eq!(names(&saved, 1), ["a", "c"]);
    assert_eq!(names(&saved, 2), ["b"]);

    let id = saved.store().list(2, "books")[0].id;
    assert_eq!(saved.delete(id).unwrap(), "/books/");
    assert!(names(&saved, 2).is_empty());
    assert_eq!(saved.store().len(), 2);
}
