//! # Saved filters
//!
//! Users can store a filter selection under a name, and apply it
//! again later. A [`SavedFilter`] records the selection as the query
//! string that produced it, the location it was saved from, and the
//! type tag of the [`FilterCollection`] it applies to.
//!
//! Saving goes through [`SavedFilters`], which looks the type tag up
//! in a [`FilterRegistry`] and refuses selections that the collection
//! would reject, so that a saved filter always resolves cleanly.
//!
//! Example:
//! ```rust
//! use ww_filters::collection::FilterCollection;
//! use ww_filters::filters::Filter;
//! use ww_filters::saved::{FilterRegistry, MemoryStore, SaveRequest, SavedFilters};
//!
//! let people = FilterCollection::builder()
//!     .filter("age", Filter::integer("Age"))
//!     .build()
//!     .unwrap();
//! let registry = FilterRegistry::new().register("people", people);
//! let mut saved = SavedFilters::new(registry, MemoryStore::new());
//!
//! let adults = saved
//!     .save(SaveRequest {
//!         user: 1,
//!         name: "Adults".to_string(),
//!         data: "?age_filter=greater_than&age_filter_greater_than_0_value=17".to_string(),
//!         source: "/people/".to_string(),
//!         filter_type: "people".to_string(),
//!     })
//!     .unwrap();
//! assert_eq!(saved.list(1, "people").len(), 1);
//! assert_eq!(saved.delete(adults.id).unwrap(), "/people/");
//! ```

use std::collections::{BTreeMap, HashMap};

use log::{debug, trace};
use thiserror::Error;

use crate::collection::FilterCollection;
use crate::filters::ResolveError;
use crate::forms::Params;
use crate::query::QuerySet;

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_DATA_LENGTH: usize = 255;
pub const MAX_SOURCE_LENGTH: usize = 255;
pub const MAX_TYPE_LENGTH: usize = 30;

/// A stored filter selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFilter {
    pub id: u64,
    /// The owning user.
    pub user: u64,
    pub name: String,
    /// The query string of the selection.
    pub data: String,
    /// Where the selection was saved from.
    pub source: String,
    /// The [`FilterRegistry`] key of the collection the selection is for.
    pub filter_type: String,
}

/// A request to store a filter selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub user: u64,
    pub name: String,
    pub data: String,
    pub source: String,
    pub filter_type: String,
}

impl SaveRequest {
    /// Read a request from the parameters `user`, `name`, `data`,
    /// `source` and `type`.
    pub fn from_params(params: &Params) -> Result<Self, SaveError> {
        let get = |key: &'static str| {
            params
                .get(key)
                .map(str::to_string)
                .ok_or(SaveError::MissingParam(key))
        };
        let user = get("user")?;
        Ok(Self {
            user: user.trim().parse().map_err(|_| SaveError::BadUser(user.clone()))?,
            name: get("name")?,
            data: get("data")?,
            source: get("source")?,
            filter_type: get("type")?,
        })
    }

    fn check_lengths(&self) -> Result<(), SaveError> {
        for (field, value, max) in [
            ("name", &self.name, MAX_NAME_LENGTH),
            ("data", &self.data, MAX_DATA_LENGTH),
            ("source", &self.source, MAX_SOURCE_LENGTH),
            ("type", &self.filter_type, MAX_TYPE_LENGTH),
        ] {
            if value.chars().count() > max {
                return Err(SaveError::TooLong { field, max });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no saved filter with id {0}")]
    NotFound(u64),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("missing parameter '{0}'")]
    MissingParam(&'static str),
    #[error("'{0}' is not a user id")]
    BadUser(String),
    #[error("no filters are registered for type '{0}'")]
    UnknownType(String),
    #[error("'{field}' is longer than {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("invalid input for filters: {}", .fields.join(", "))]
    Invalid { fields: Vec<String> },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SaveError {
    /// Whether the request was well formed, but the selection it
    /// carries cannot be saved.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            SaveError::TooLong { .. } | SaveError::Invalid { .. } | SaveError::Resolve(_)
        )
    }
}

/// Check that `data`, a query string with or without its leading `?`,
/// resolves against `collection` without input errors.
///
/// The selection is resolved against an empty query; only the
/// validation outcome matters.
pub fn check_filter_form_valid(collection: &FilterCollection, data: &str) -> Result<(), SaveError> {
    let params = Params::parse(data);
    let resolved = collection.resolve(QuerySet::none(), Some(&params), None)?;
    let fields = resolved.resolution.errors();
    if fields.is_empty() {
        Ok(())
    } else {
        debug!("rejecting selection '{}': {:?}", data, fields);
        Err(SaveError::Invalid {
            fields: fields.into_iter().map(str::to_string).collect(),
        })
    }
}

/// The collections that saved filters can apply to, by type tag.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    collections: HashMap<String, FilterCollection>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn register(mut self, filter_type: &str, collection: FilterCollection) -> Self {
        self.collections.insert(filter_type.to_string(), collection);
        self
    }

    pub fn get(&self, filter_type: &str) -> Option<&FilterCollection> {
        self.collections.get(filter_type)
    }
}

/// Storage for saved filters.
pub trait SavedFilterStore {
    fn create(&mut self, request: SaveRequest) -> Result<SavedFilter, StoreError>;
    /// Remove a saved filter, returning it.
    fn delete(&mut self, id: u64) -> Result<SavedFilter, StoreError>;
    fn get(&self, id: u64) -> Result<SavedFilter, StoreError>;
    /// The saved filters of `user` for `filter_type`, oldest first.
    fn list(&self, user: u64, filter_type: &str) -> Vec<SavedFilter>;
}

/// A [`SavedFilterStore`] held in memory. Ids start at 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: u64,
    rows: BTreeMap<u64, SavedFilter>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl SavedFilterStore for MemoryStore {
    fn create(&mut self, request: SaveRequest) -> Result<SavedFilter, StoreError> {
        self.next_id += 1;
        let row = SavedFilter {
            id: self.next_id,
            user: request.user,
            name: request.name,
            data: request.data,
            source: request.source,
            filter_type: request.filter_type,
        };
        self.rows.insert(row.id, row.clone());
        Ok(row)
    }

    fn delete(&mut self, id: u64) -> Result<SavedFilter, StoreError> {
        self.rows.remove(&id).ok_or(StoreError::NotFound(id))
    }

    fn get(&self, id: u64) -> Result<SavedFilter, StoreError> {
        self.rows.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn list(&self, user: u64, filter_type: &str) -> Vec<SavedFilter> {
        self.rows
            .values()
            .filter(|r| r.user == user && r.filter_type == filter_type)
            .cloned()
            .collect()
    }
}

/// Validated storage of filter selections.
#[derive(Debug)]
pub struct SavedFilters<S> {
    registry: FilterRegistry,
    store: S,
}

impl<S: SavedFilterStore> SavedFilters<S> {
    pub fn new(registry: FilterRegistry, store: S) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Store a selection, if its collection accepts it.
    pub fn save(&mut self, request: SaveRequest) -> Result<SavedFilter, SaveError> {
        let collection = self
            .registry
            .get(&request.filter_type)
            .ok_or_else(|| SaveError::UnknownType(request.filter_type.clone()))?;
        request.check_lengths()?;
        check_filter_form_valid(collection, &request.data)?;
        let row = self.store.create(request)?;
        trace!("saved filter {} '{}' for user {}", row.id, row.name, row.user);
        Ok(row)
    }

    /// Remove a saved filter, returning the location it was saved from.
    pub fn delete(&mut self, id: u64) -> Result<String, StoreError> {
        let row = self.store.delete(id)?;
        trace!("deleted saved filter {}", id);
        Ok(row.source)
    }

    pub fn list(&self, user: u64, filter_type: &str) -> Vec<SavedFilter> {
        self.store.list(user, filter_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Filter;

    fn people() -> FilterCollection {
        FilterCollection::builder()
            .filter("name", Filter::string("Name"))
            .filter("age", Filter::integer("Age"))
            .build()
            .unwrap()
    }

    fn service() -> SavedFilters<MemoryStore> {
        SavedFilters::new(
            FilterRegistry::new().register("people", people()),
            MemoryStore::new(),
        )
    }

    fn request(data: &str) -> SaveRequest {
        SaveRequest {
            user: 7,
            name: "mine".to_string(),
            data: data.to_string(),
            source: "/people/?page=2".to_string(),
            filter_type: "people".to_string(),
        }
    }

    #[test_log::test]
    fn validity() {
        let fc = people();
        assert!(check_filter_form_valid(&fc, "").is_ok());
        assert!(check_filter_form_valid(&fc, "?name_filter=contains&name_filter_contains_0_value=a%20b").is_ok());

        let err = check_filter_form_valid(
            &fc,
            "?name_filter=contains&name_filter_contains_0_value=&age_filter=equal&age_filter_equal_0_value=x",
        )
        .unwrap_err();
        assert!(
            matches!(err, SaveError::Invalid { ref fields } if fields == &["name", "age"]),
            "{:?}",
            err
        );

        assert!(matches!(
            check_filter_form_valid(&fc, "?age_filter=starts_with"),
            Err(SaveError::Resolve(_))
        ));
    }

    #[test_log::test]
    fn save_and_list() {
        let mut s = service();
        let a = s.save(request("?age_filter=equal&age_filter_equal_0_value=3")).unwrap();
        let b = s.save(request("")).unwrap();
        let other = s
            .save(SaveRequest {
                user: 8,
                ..request("")
            })
            .unwrap();
        assert_eq!((a.id, b.id, other.id), (1, 2, 3));
        assert_eq!(s.list(7, "people"), vec![a, b]);
        assert!(s.list(7, "things").is_empty());
    }

    #[test_log::test]
    fn rejected_saves() {
        let mut s = service();
        let err = s
            .save(SaveRequest {
                filter_type: "things".to_string(),
                ..request("")
            })
            .unwrap_err();
        assert!(matches!(err, SaveError::UnknownType(_)));
        assert!(!err.is_rejection());

        let err = s.save(request("?age_filter=equal")).unwrap_err();
        assert!(err.is_rejection());

        let err = s
            .save(SaveRequest {
                name: "n".repeat(101),
                ..request("")
            })
            .unwrap_err();
        assert!(matches!(err, SaveError::TooLong { field: "name", max: 100 }));
        assert!(s.store().is_empty());
    }

    #[test_log::test]
    fn delete_returns_source() {
        let mut s = service();
        let a = s.save(request("")).unwrap();
        assert_eq!(s.delete(a.id).unwrap(), "/people/?page=2");
        assert!(matches!(s.delete(a.id), Err(StoreError::NotFound(1))));
    }

    #[test_log::test]
    fn request_from_params() {
        let p = Params::new()
            .with("user", "3")
            .with("name", "x")
            .with("data", "?a=1")
            .with("source", "/")
            .with("type", "people");
        let r = SaveRequest::from_params(&p).unwrap();
        assert_eq!(r.user, 3);
        assert_eq!(r.filter_type, "people");

        let p = p.with("user", "bob");
        assert!(matches!(SaveRequest::from_params(&p), Err(SaveError::BadUser(_))));
        assert!(matches!(
            SaveRequest::from_params(&Params::new().with("user", "1")),
            Err(SaveError::MissingParam("name"))
        ));
    }
}
