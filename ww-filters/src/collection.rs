//! # Collections of filters
//!
//! A [`FilterCollection`] holds the filters for one entity, in the
//! order they are applied and displayed. It can be declared by hand
//! with [`FilterCollection::builder`], or derived from a [`Model`]'s
//! schema with [`FilterCollection::for_model`], which picks a default
//! [`Filter`] for each field from its kind:
//!
//! Field kind                     | Filter
//! -------------------------------|---------------------------------------
//! relation                       | [`model_choice`](Filter::model_choice)
//! any field with choices         | [`choice`](Filter::choice)
//! text                           | [`string`](Filter::string)
//! integer, decimal, float        | [`integer`](Filter::integer)
//! date                           | [`date`](Filter::date)
//! datetime                       | [`datetime`](Filter::datetime)
//! boolean                        | [`boolean`](Filter::boolean)
//!
//! Nullable fields get the `_with_empty` variant of their filter,
//! except for booleans. Fields of any other kind are not filterable.
//!
//! Resolving a collection folds each of its filters over a query, in
//! order, and returns the narrowed query together with a
//! [`Resolution`] recording what each filter did. The collection
//! itself is never modified, so one collection can serve any number
//! of requests.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use indexmap::IndexMap;
use log::trace;
use serde_json::map::Map;
use serde_json::Value as Json;
use thiserror::Error;

use crate::filters::{input_prefix, Filter, FilterState, ResolveError};
use crate::forms::{input_name, Params};
use crate::query::Refine;
use crate::schema::{Choice, FieldDescriptor, FieldKind, Model, Schema};

/// Errors in declaring a collection.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A field named in an ordering has no filter.
    #[error("cannot order by '{0}': there is no such filter")]
    UnknownField(String),
}

/// An ordered set of filters for one entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterCollection {
    filters: IndexMap<String, Filter>,
}

/// The output of [`FilterCollection::resolve`].
#[derive(Debug)]
pub struct Resolved<T> {
    pub query: T,
    pub resolution: Resolution,
}

impl FilterCollection {
    pub fn builder() -> FilterCollectionBuilder {
        FilterCollectionBuilder {
            filters: IndexMap::new(),
            order: None,
        }
    }

    /// Build the default filters for model `M`.
    pub fn for_model<M: Model>(options: ModelOptions) -> Result<Self, BuildError> {
        Self::from_schema(&M::schema(), options)
    }

    /// Build the default filters for the fields of `schema`.
    pub fn from_schema(schema: &Schema, options: ModelOptions) -> Result<Self, BuildError> {
        let mut builder = Self::builder();
        for field in schema.fields.iter() {
            if let Some(ref fields) = options.fields {
                if !fields.contains(&field.name) {
                    continue;
                }
            }
            if options.exclude.contains(&field.name) {
                continue;
            }
            match default_filter(field, &options) {
                Some(filter) => builder = builder.filter(&field.name, filter),
                None => trace!("{}: no filter for {:?}", field.name, field.kind),
            }
        }
        for (name, filter) in options.declared {
            builder = builder.filter(&name, filter);
        }
        builder.order = options.order.or(options.fields);
        builder.build()
    }

    pub fn filters(&self) -> &IndexMap<String, Filter> {
        &self.filters
    }

    pub fn get(&self, name: &str) -> Option<&Filter> {
        self.filters.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Narrow `query` by every filter in turn, using today's local
    /// date for the "today" operators.
    ///
    /// When both `data` and `initial` are absent the query is returned
    /// unchanged, and the resolution is unbound.
    pub fn resolve<T: Refine>(
        &self,
        query: T,
        data: Option<&Params>,
        initial: Option<&Params>,
    ) -> Result<Resolved<T>, ResolveError> {
        self.resolve_at(query, data, initial, chrono::Local::now().date_naive())
    }

    /// As [`resolve`](FilterCollection::resolve), with a fixed date
    /// for "today".
    pub fn resolve_at<T: Refine>(
        &self,
        query: T,
        data: Option<&Params>,
        initial: Option<&Params>,
        today: NaiveDate,
    ) -> Result<Resolved<T>, ResolveError> {
        let mut resolution = Resolution {
            bound: data.is_some() || initial.is_some(),
            states: self
                .filters
                .keys()
                .map(|name| (name.clone(), FilterState::default()))
                .collect(),
        };
        if !resolution.bound {
            return Ok(Resolved { query, resolution });
        }

        let mut query = query;
        for (name, filter) in self.filters.iter() {
            let state = resolution.states.entry(name.clone()).or_default();
            query = filter.resolve(query, name, data, initial, state, today)?;
        }
        Ok(Resolved { query, resolution })
    }
}

/// Declare a [`FilterCollection`].
pub struct FilterCollectionBuilder {
    filters: IndexMap<String, Filter>,
    order: Option<Vec<String>>,
}

impl FilterCollectionBuilder {
    /// Add a filter, or replace an earlier filter of the same name
    /// without moving it.
    pub fn filter(mut self, name: &str, filter: Filter) -> Self {
        self.filters.insert(name.to_string(), filter);
        self
    }

    /// Inherit the filters of `base`. They come before any filters
    /// declared here, and are replaced by them on a name clash.
    pub fn extend(mut self, base: &FilterCollection) -> Self {
        let mut merged = base.filters.clone();
        for (name, filter) in self.filters.drain(..) {
            merged.insert(name, filter);
        }
        self.filters = merged;
        self
    }

    /// Put the named filters first, in the given order. The remaining
    /// filters follow in their declared order.
    pub fn order(mut self, names: &[&str]) -> Self {
        self.order = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<FilterCollection, BuildError> {
        let filters = match self.order {
            Some(order) => reorder(self.filters, &order)?,
            None => self.filters,
        };
        Ok(FilterCollection { filters })
    }
}

fn reorder(
    mut filters: IndexMap<String, Filter>,
    order: &[String],
) -> Result<IndexMap<String, Filter>, BuildError> {
    let mut sorted = IndexMap::with_capacity(filters.len());
    for name in order {
        let filter = filters
            .shift_remove(name)
            .ok_or_else(|| BuildError::UnknownField(name.clone()))?;
        sorted.insert(name.clone(), filter);
    }
    sorted.extend(filters);
    Ok(sorted)
}

/// Options for [`FilterCollection::for_model`].
#[derive(Debug, Clone, Default)]
pub struct ModelOptions {
    fields: Option<Vec<String>>,
    exclude: Vec<String>,
    order: Option<Vec<String>>,
    titles: HashMap<String, String>,
    select2: HashSet<String>,
    relation_choices: HashMap<String, Vec<Choice>>,
    declared: IndexMap<String, Filter>,
}

impl ModelOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Only build filters for these fields. Unless [`order`] is also
    /// given, they come first in this order.
    ///
    /// [`order`]: ModelOptions::order
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Do not build filters for these fields.
    pub fn exclude(mut self, fields: &[&str]) -> Self {
        self.exclude = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Put these filters first, in this order.
    pub fn order(mut self, fields: &[&str]) -> Self {
        self.order = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Override the title of a field's filter; by default it is the
    /// field's label.
    pub fn title(mut self, field: &str, title: &str) -> Self {
        self.titles.insert(field.to_string(), title.to_string());
        self
    }

    /// Use a widget suited to large option sets for a choice field.
    pub fn select2(mut self, field: &str) -> Self {
        self.select2.insert(field.to_string());
        self
    }

    /// The rows a relation field can point at.
    pub fn relation_choices(mut self, field: &str, choices: Vec<Choice>) -> Self {
        self.relation_choices.insert(field.to_string(), choices);
        self
    }

    /// Declare a filter by hand. It follows the schema's filters, or
    /// replaces the one for the field of the same name.
    pub fn filter(mut self, name: &str, filter: Filter) -> Self {
        self.declared.insert(name.to_string(), filter);
        self
    }
}

fn default_filter(field: &FieldDescriptor, options: &ModelOptions) -> Option<Filter> {
    let title = options
        .titles
        .get(&field.name)
        .map(String::as_str)
        .unwrap_or(&field.label);
    let select2 = options.select2.contains(&field.name);
    let nullable = field.nullable;

    let filter = match (&field.kind, &field.choices) {
        (FieldKind::Relation { .. }, _) => {
            let choices = options
                .relation_choices
                .get(&field.name)
                .cloned()
                .unwrap_or_default();
            if nullable {
                Filter::model_choice_with_empty(title, choices, select2)
            } else {
                Filter::model_choice(title, choices, select2)
            }
        }
        (_, Some(choices)) => {
            if nullable {
                Filter::choice_with_empty(title, choices.clone(), select2)
            } else {
                Filter::choice(title, choices.clone(), select2)
            }
        }
        (FieldKind::Text, None) if nullable => Filter::string_with_empty(title),
        (FieldKind::Text, None) => Filter::string(title),
        (FieldKind::Integer | FieldKind::Decimal | FieldKind::Float, None) if nullable => {
            Filter::integer_with_empty(title)
        }
        (FieldKind::Integer | FieldKind::Decimal | FieldKind::Float, None) => {
            Filter::integer(title)
        }
        (FieldKind::DateTime, None) if nullable => Filter::datetime_with_empty(title),
        (FieldKind::DateTime, None) => Filter::datetime(title),
        (FieldKind::Date, None) if nullable => Filter::date_with_empty(title),
        (FieldKind::Date, None) => Filter::date(title),
        (FieldKind::Boolean, None) => Filter::boolean(title),
        (FieldKind::Other, None) => return None,
    };
    Some(filter)
}

/// What every filter of a collection did during one resolution.
#[derive(Debug)]
pub struct Resolution {
    bound: bool,
    states: IndexMap<String, FilterState>,
}

impl Resolution {
    /// Whether any data was supplied.
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn get(&self, name: &str) -> Option<&FilterState> {
        self.states.get(name)
    }

    pub fn states(&self) -> &IndexMap<String, FilterState> {
        &self.states
    }

    pub fn has_errors(&self) -> bool {
        self.states.values().any(FilterState::has_error)
    }

    /// The names of the filters whose submitted input was invalid.
    pub fn errors(&self) -> Vec<&str> {
        self.states
            .iter()
            .filter(|(_, s)| s.has_error())
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Describe the filters of `collection` and their state as JSON,
    /// for a front end to render. Input values are echoed from `data`.
    pub fn describe(&self, collection: &FilterCollection, data: Option<&Params>) -> Json {
        let mut filters = Vec::new();
        for (name, filter) in collection.filters() {
            let state = self.states.get(name);
            let mut map = Map::new();
            map.insert("name".to_string(), Json::String(name.clone()));
            map.insert("title".to_string(), Json::String(filter.title().to_string()));
            map.insert("select2".to_string(), Json::Bool(filter.select2()));
            map.insert(
                "bound".to_string(),
                state
                    .and_then(|s| s.bound.clone())
                    .map(Json::String)
                    .unwrap_or(Json::Null),
            );
            map.insert(
                "error".to_string(),
                state
                    .and_then(|s| s.error.as_ref())
                    .map(|e| Json::String(e.to_string()))
                    .unwrap_or(Json::Null),
            );

            let mut operators = Vec::new();
            for (op, updater) in filter.updaters() {
                let form = updater.form();
                let prefix = input_prefix(name, op);
                let mut o = Map::new();
                o.insert("name".to_string(), Json::String(op.clone()));
                o.insert("title".to_string(), Json::String(updater.title().to_string()));
                o.insert(
                    "operation".to_string(),
                    Json::String(updater.operation().as_ref().to_string()),
                );
                o.insert("widget".to_string(), Json::String(form.widget().to_string()));

                let mut inputs = Vec::new();
                for input in form.inputs() {
                    let key = input_name(&prefix, input);
                    let mut i = Map::new();
                    i.insert(
                        "value".to_string(),
                        data.and_then(|d| d.get(&key))
                            .map(|v| Json::String(v.to_string()))
                            .unwrap_or(Json::Null),
                    );
                    i.insert("name".to_string(), Json::String(key));
                    inputs.push(Json::Object(i));
                }
                o.insert("inputs".to_string(), Json::Array(inputs));

                if let Some(choices) = form.choices() {
                    let choices = choices
                        .iter()
                        .map(|c| {
                            let mut m = Map::new();
                            m.insert("key".to_string(), Json::String(c.key.clone()));
                            m.insert("label".to_string(), Json::String(c.label.clone()));
                            Json::Object(m)
                        })
                        .collect();
                    o.insert("choices".to_string(), Json::Array(choices));
                }
                operators.push(Json::Object(o));
            }
            map.insert("operators".to_string(), Json::Array(operators));
            filters.push(Json::Object(map));
        }

        let mut top = Map::new();
        top.insert("bound".to_string(), Json::Bool(self.bound));
        top.insert("filters".to_string(), Json::Array(filters));
        Json::Object(top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Lookup, Q, QuerySet};
    use crate::updaters::{Operation, Updater};
    use crate::value::Value;

    struct Person;

    impl Model for Person {
        fn schema() -> Schema {
            Schema::new(vec![
                FieldDescriptor::new("a", FieldKind::Text),
                FieldDescriptor::new("b", FieldKind::Integer),
                FieldDescriptor::new("c", FieldKind::Date),
            ])
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, 15).unwrap()
    }

    #[test_log::test]
    fn explicit_order() {
        let fc = FilterCollection::for_model::<Person>(ModelOptions::new().order(&["c", "a"]))
            .unwrap();
        assert_eq!(fc.names(), ["c", "a", "b"]);
    }

    #[test_log::test]
    fn order_must_name_filters() {
        let res = FilterCollection::for_model::<Person>(ModelOptions::new().order(&["zz"]));
        assert!(matches!(res, Err(BuildError::UnknownField(ref f)) if f == "zz"));
    }

    #[test_log::test]
    fn inclusion_and_exclusion() {
        let fc = FilterCollection::for_model::<Person>(ModelOptions::new().fields(&["c", "a"]))
            .unwrap();
        assert_eq!(fc.names(), ["c", "a"]);
        let fc = FilterCollection::for_model::<Person>(
            ModelOptions::new()
                .fields(&["c", "a"])
                .filter("z", Filter::boolean("Z")),
        )
        .unwrap();
        assert_eq!(fc.names(), ["c", "a", "z"]);
        let res = FilterCollection::for_model::<Person>(ModelOptions::new().fields(&["a", "nope"]));
        assert!(matches!(res, Err(BuildError::UnknownField(ref f)) if f == "nope"));
        let fc = FilterCollection::for_model::<Person>(ModelOptions::new().exclude(&["b"]))
            .unwrap();
        assert_eq!(fc.names(), ["a", "c"]);
    }

    #[test_log::test]
    fn declared_filters() {
        let flag = Filter::boolean("Flag");
        let fc = FilterCollection::for_model::<Person>(
            ModelOptions::new()
                .filter("flag", flag.clone())
                .filter("b", Filter::string("B as text")),
        )
        .unwrap();
        assert_eq!(fc.names(), ["a", "b", "c", "flag"]);
        assert_eq!(fc.get("b").unwrap().title(), "B as text");
        assert_eq!(fc.get("flag"), Some(&flag));
    }

    #[test_log::test]
    fn kinds_and_titles() {
        let schema = Schema::new(vec![
            FieldDescriptor::new("owner", FieldKind::Relation { target: "User".into() })
                .nullable(true),
            FieldDescriptor::new("state", FieldKind::Text)
                .choices(vec![Choice::new("o", "Open"), Choice::new("c", "Closed")]),
            FieldDescriptor::new("active", FieldKind::Boolean).nullable(true),
            FieldDescriptor::new("created_at", FieldKind::DateTime),
            FieldDescriptor::new("blob", FieldKind::Other),
        ]);
        let fc = FilterCollection::from_schema(
            &schema,
            ModelOptions::new()
                .title("state", "Status")
                .select2("owner")
                .relation_choices("owner", vec![Choice::int(1, "alice")]),
        )
        .unwrap();
        assert_eq!(fc.names(), ["owner", "state", "active", "created_at"]);

        let owner = fc.get("owner").unwrap();
        assert!(owner.select2());
        assert_eq!(
            owner.updaters().keys().collect::<Vec<_>>(),
            ["choice_equal", "empty", "not_empty"]
        );
        assert_eq!(
            owner.updater("choice_equal").unwrap().operation(),
            &Operation::Choice(vec![Choice::int(1, "alice")])
        );

        assert_eq!(fc.get("state").unwrap().title(), "Status");
        assert_eq!(fc.get("created_at").unwrap().title(), "created at");
        assert_eq!(fc.get("active").unwrap(), &Filter::boolean("active"));
    }

    #[test_log::test]
    fn unbound_is_identity() {
        let fc = FilterCollection::for_model::<Person>(ModelOptions::new()).unwrap();
        let res = fc.resolve(QuerySet::all(), None, None).unwrap();
        assert_eq!(res.query, QuerySet::all());
        assert!(!res.resolution.is_bound());
        assert!(!res.resolution.has_errors());
    }

    #[test_log::test]
    fn folds_in_order() {
        let fc = FilterCollection::for_model::<Person>(ModelOptions::new().order(&["c"])).unwrap();
        let data = Params::new()
            .with("a_filter", "starts_with")
            .with("a_filter_starts_with_0_value", "Jo")
            .with("b_filter", "less_than")
            .with("b_filter_less_than_0_value", "3")
            .with("c_filter", "today");
        let res = fc.resolve_at(QuerySet::all(), Some(&data), None, today()).unwrap();
        assert_eq!(
            res.query.predicates(),
            &[
                Q::new("c", Lookup::Exact(Value::Date(today()))),
                Q::new("a", Lookup::IStartsWith("Jo".into())),
                Q::new("b", Lookup::Lt(Value::Int(3))),
            ]
        );
        assert!(res.resolution.is_bound());
    }

    #[test_log::test]
    fn errors_are_collected() {
        let fc = FilterCollection::for_model::<Person>(ModelOptions::new()).unwrap();
        let data = Params::new()
            .with("a_filter", "equal")
            .with("b_filter", "equal")
            .with("b_filter_equal_0_value", "x");
        let res = fc.resolve_at(QuerySet::all(), Some(&data), None, today()).unwrap();
        assert_eq!(res.query, QuerySet::all());
        assert_eq!(res.resolution.errors(), ["a", "b"]);
    }

    #[test_log::test]
    fn requests_do_not_share_state() {
        let fc = FilterCollection::for_model::<Person>(ModelOptions::new()).unwrap();
        let bad = Params::new().with("a_filter", "equal");
        let first = fc.resolve_at(QuerySet::all(), Some(&bad), None, today()).unwrap();
        assert!(first.resolution.has_errors());
        let second = fc
            .resolve_at(QuerySet::all(), Some(&Params::new()), None, today())
            .unwrap();
        assert!(!second.resolution.has_errors());
        assert!(second.resolution.get("a").unwrap().bound.is_none());
    }

    #[test_log::test]
    fn extend_collection() {
        let base = FilterCollection::builder()
            .filter("x", Filter::integer("X"))
            .filter("y", Filter::integer("Y"))
            .build()
            .unwrap();
        let fc = FilterCollection::builder()
            .filter("z", Filter::integer("Z"))
            .filter("x", Filter::string("X"))
            .extend(&base)
            .build()
            .unwrap();
        assert_eq!(fc.names(), ["x", "y", "z"]);
        assert_eq!(fc.get("x"), Some(&Filter::string("X")));
    }

    #[test_log::test]
    fn describe() {
        let fc = FilterCollection::builder()
            .filter(
                "status",
                Filter::builder("Status")
                    .updater(
                        "is",
                        Updater::new("Is", Operation::Choice(vec![Choice::new("o", "Open")])),
                    )
                    .build(),
            )
            .filter("age", Filter::integer("Age"))
            .build()
            .unwrap();
        let data = Params::new()
            .with("age_filter", "equal")
            .with("age_filter_equal_0_value", "x");
        let res = fc.resolve_at(QuerySet::all(), Some(&data), None, today()).unwrap();
        let json = res.resolution.describe(&fc, Some(&data));

        assert_eq!(json["bound"], Json::Bool(true));
        let status = &json["filters"][0];
        assert_eq!(status["name"], "status");
        assert_eq!(status["bound"], Json::Null);
        assert_eq!(status["operators"][0]["widget"], "select");
        assert_eq!(status["operators"][0]["choices"][0]["label"], "Open");

        let age = &json["filters"][1];
        assert_eq!(age["bound"], "equal");
        assert!(age["error"].is_string());
        assert_eq!(age["operators"][0]["operation"], "integer_equal");
        assert_eq!(
            age["operators"][0]["inputs"][0]["name"],
            "age_filter_equal_0_value"
        );
        assert_eq!(age["operators"][0]["inputs"][0]["value"], "x");
        assert_eq!(age["operators"][1]["inputs"][0]["value"], Json::Null);
    }
}
