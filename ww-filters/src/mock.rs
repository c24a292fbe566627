//! # A mock saved filter backend
//!
//! [`SavedFilterEndpoint`] implements [`wiremock::Respond`], serving
//! the HTTP surface of saved filters from a [`MemoryStore`]. Mount it
//! on a [`wiremock::MockServer`] to run a front end against a fake
//! backend.
//!
//! Path                 | Parameters                                | Response
//! ---------------------|-------------------------------------------|---------
//! `/save/`             | `user`, `name`, `data`, `source`, `type`  | `ok`, or `error` if the selection is invalid
//! `/delete/{id}/`      |                                           | a redirect to the filter's `source`
//! `/list/`             | `user`, `type`                            | the user's saved filters as JSON
//!
//! Parameters are read from the query string, and from a form
//! encoded body if there is one. Malformed requests get a 400, and
//! unknown paths or ids a 404.
//!
//! Example:
//! ```rust
//! # tokio_test::block_on(async {
//! use wiremock::{Mock, MockServer, matchers};
//! use ww_filters::collection::FilterCollection;
//! use ww_filters::filters::Filter;
//! use ww_filters::mock::SavedFilterEndpoint;
//! use ww_filters::saved::FilterRegistry;
//!
//! let people = FilterCollection::builder()
//!     .filter("age", Filter::integer("Age"))
//!     .build()
//!     .unwrap();
//! let server = MockServer::start().await;
//! Mock::given(matchers::any())
//!     .respond_with(
//!         SavedFilterEndpoint::new(FilterRegistry::new().register("people", people)).unwrap(),
//!     )
//!     .mount(&server)
//!     .await;
//! # });
//! ```
#![cfg(feature = "wiremock")]

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use log::{debug, trace};
use regex::Regex;
use serde_json::map::Map;
use serde_json::Value as Json;
use wiremock::{Request, Respond, ResponseTemplate};

use crate::forms::Params;
use crate::saved::{
    FilterRegistry, MemoryStore, SaveRequest, SavedFilter, SavedFilters, StoreError,
};

const DELETE_PATH: &str = r"^/delete/(\d+)/$";

/// A [`Respond`] implementation for the saved filter endpoints.
#[derive(Clone)]
pub struct SavedFilterEndpoint {
    saved: Arc<Mutex<SavedFilters<MemoryStore>>>,
    delete_path: Regex,
}

impl SavedFilterEndpoint {
    /// Serve an empty store of filters for the collections in `registry`.
    pub fn new(registry: FilterRegistry) -> Result<Self, regex::Error> {
        Self::with_store(Arc::new(Mutex::new(SavedFilters::new(
            registry,
            MemoryStore::new(),
        ))))
    }

    /// Serve a shared store, which the caller can inspect or seed.
    pub fn with_store(
        saved: Arc<Mutex<SavedFilters<MemoryStore>>>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            saved,
            delete_path: Regex::new(DELETE_PATH)?,
        })
    }

    pub fn store(&self) -> Arc<Mutex<SavedFilters<MemoryStore>>> {
        self.saved.clone()
    }

    fn handle(&self, request: &Request) -> anyhow::Result<ResponseTemplate> {
        let mut params = Params::parse(request.url.query().unwrap_or(""));
        if !request.body.is_empty() {
            let body = std::str::from_utf8(&request.body).context("request body is not UTF-8")?;
            for (k, v) in Params::parse(body).iter() {
                params.insert(k, v);
            }
        }

        let mut saved = self
            .saved
            .lock()
            .map_err(|_| anyhow!("saved filter store is poisoned"))?;

        let path = request.url.path();
        if path == "/save/" {
            let save = match SaveRequest::from_params(&params) {
                Ok(save) => save,
                Err(e) => return Ok(ResponseTemplate::new(400).set_body_string(e.to_string())),
            };
            return Ok(match saved.save(save) {
                Ok(_) => ResponseTemplate::new(200).set_body_string("ok"),
                Err(e) if e.is_rejection() => {
                    debug!("Refused to save filter: {}", e);
                    ResponseTemplate::new(200).set_body_string("error")
                }
                Err(e) => ResponseTemplate::new(400).set_body_string(e.to_string()),
            });
        }

        if path == "/list/" {
            let (user, filter_type) = match (params.get("user"), params.get("type")) {
                (Some(user), Some(filter_type)) => (user, filter_type),
                _ => return Ok(ResponseTemplate::new(400).set_body_string("user and type are required")),
            };
            let user = match user.trim().parse() {
                Ok(user) => user,
                Err(_) => return Ok(ResponseTemplate::new(400).set_body_string("bad user")),
            };
            let rows = saved.list(user, filter_type).iter().map(to_json).collect();
            return Ok(ResponseTemplate::new(200).set_body_json(Json::Array(rows)));
        }

        if let Some(captures) = self.delete_path.captures(path) {
            // Too many digits for an id; no such filter.
            let id = match captures[1].parse::<u64>() {
                Ok(id) => id,
                Err(_) => return Ok(ResponseTemplate::new(404)),
            };
            return Ok(match saved.delete(id) {
                Ok(source) => ResponseTemplate::new(302).insert_header("Location", source.as_str()),
                Err(StoreError::NotFound(_)) => ResponseTemplate::new(404),
            });
        }

        Ok(ResponseTemplate::new(404))
    }
}

fn to_json(row: &SavedFilter) -> Json {
    let mut map = Map::new();
    map.insert("id".to_string(), Json::from(row.id));
    map.insert("user".to_string(), Json::from(row.user));
    map.insert("name".to_string(), Json::String(row.name.clone()));
    map.insert("data".to_string(), Json::String(row.data.clone()));
    map.insert("source".to_string(), Json::String(row.source.clone()));
    map.insert("type".to_string(), Json::String(row.filter_type.clone()));
    Json::Object(map)
}

impl Respond for SavedFilterEndpoint {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        trace!("Request URL: {}", request.url);
        match self.handle(request) {
            Ok(response) => response,
            Err(e) => {
                debug!("Failed to respond to {}: {:#}", request.url, e);
                ResponseTemplate::new(500).set_body_string(e.to_string())
            }
        }
    }
}
