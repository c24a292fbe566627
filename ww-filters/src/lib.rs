//! # ww-filters
//!
//! Declarative filters that turn the query parameters of a request
//! into refinements of a query.
//!
//! A [`FilterCollection`] holds one [`Filter`] per field of an entity.
//! Each filter offers a set of operators ([`Updater`]s), of which a
//! request selects at most one, and supplies that operator's inputs.
//! Resolving the collection narrows a query by every selected
//! operator whose input is valid, and reports which fields had
//! invalid input.
//!
//! ```rust
//! use ww_filters::{FilterCollection, Model, ModelOptions, Params, QuerySet, Record};
//!
//! #[derive(Model, Record)]
//! struct Person {
//!     name: String,
//!     age: i32,
//!     #[filter(exclude)]
//!     password: String,
//! }
//!
//! let filters = FilterCollection::for_model::<Person>(ModelOptions::new()).unwrap();
//! assert_eq!(filters.names(), ["name", "age"]);
//!
//! let data = Params::parse("?age_filter=less_than&age_filter_less_than_0_value=18");
//! let resolved = filters.resolve(QuerySet::all(), Some(&data), None).unwrap();
//! assert!(!resolved.resolution.has_errors());
//!
//! let mut people = vec![
//!     Person { name: "Ann".into(), age: 12, password: String::new() },
//!     Person { name: "Bob".into(), age: 40, password: String::new() },
//! ];
//! resolved.query.filter_vec(&mut people);
//! assert_eq!(people.len(), 1);
//! assert_eq!(people[0].name, "Ann");
//! ```
//!
//! Named selections can be stored per user with the [`saved`]
//! module, and with the `wiremock` feature the [`mock`] module serves
//! them over HTTP for testing front ends.

pub mod collection;
pub mod filters;
pub mod forms;
#[cfg(feature = "wiremock")]
pub mod mock;
pub mod query;
pub mod saved;
pub mod schema;
pub mod updaters;
pub mod value;

pub use crate::collection::{FilterCollection, ModelOptions, Resolution, Resolved};
pub use crate::filters::{Filter, ResolveError};
pub use crate::forms::Params;
pub use crate::query::{Lookup, QuerySet, Record, Refine, Q};
pub use crate::saved::{check_filter_form_valid, SavedFilter, SavedFilters};
pub use crate::schema::{Choice, FieldDescriptor, FieldKind, Model, Schema};
pub use crate::updaters::{Operation, Updater};
pub use crate::value::{IntoValue, Value};

#[cfg(feature = "derive")]
pub use ww_filters_derive::{Model, Record};
