//! # Per-field filters
//!
//! A [`Filter`] is the set of operators available for one field,
//! such as "equal", "starts with" and "contains" for a text field.
//! A request selects at most one of them by naming it in the
//! parameter `{field}_filter`, and supplies that operator's inputs in
//! parameters prefixed with `{field}_filter_{operator}`.
//!
//! Example:
//! ```rust
//! use chrono::NaiveDate;
//! use ww_filters::filters::{Filter, FilterState};
//! use ww_filters::forms::Params;
//! use ww_filters::query::QuerySet;
//!
//! let age = Filter::integer("Age");
//! let data = Params::parse("age_filter=greater_than&age_filter_greater_than_0_value=30");
//! let mut state = FilterState::default();
//! let today = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
//! let qs = age
//!     .resolve(QuerySet::all(), "age", Some(&data), None, &mut state, today)
//!     .unwrap();
//! assert_eq!(qs.to_string(), "age__gt=30");
//! assert_eq!(state.bound.as_deref(), Some("greater_than"));
//! ```
//!
//! Filters are immutable once built, and can be shared between
//! requests. Everything a request changes is kept in a
//! [`FilterState`] owned by the caller.

use chrono::NaiveDate;
use indexmap::IndexMap;
use log::trace;
use thiserror::Error;

use crate::forms::{FormError, Params};
use crate::query::Refine;
use crate::schema::Choice;
use crate::updaters::{Operation, Source, Updater};

/// Errors in resolving a filter.
///
/// These indicate that the filters and the data submitted to them
/// were built for different declarations, rather than that the user
/// typed something wrong.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The submitted operator name is not registered on the filter.
    #[error("filter '{field}' has no operator '{operator}'")]
    UnknownOperator { field: String, operator: String },
}

/// What happened to one filter during one resolution.
#[derive(Debug, Default)]
pub struct FilterState {
    /// The operator selected by submitted data.
    pub bound: Option<String>,
    /// The validation failure of the selected operator, if the
    /// submitted input was invalid.
    pub error: Option<FormError>,
}

impl FilterState {
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// The operators available for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    title: String,
    select2: bool,
    updaters: IndexMap<String, Updater>,
}

/// The name of the parameter selecting an operator for `field`.
pub fn selector_name(field: &str) -> String {
    format!("{}_filter", field)
}

/// The input prefix of `operator` on `field`.
pub fn input_prefix(field: &str, operator: &str) -> String {
    format!("{}_filter_{}", field, operator)
}

impl Filter {
    pub fn builder(title: &str) -> FilterBuilder {
        FilterBuilder {
            title: title.to_string(),
            select2: false,
            updaters: IndexMap::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Whether the choice widget should be one suited to large option
    /// sets.
    pub fn select2(&self) -> bool {
        self.select2
    }

    pub fn updaters(&self) -> &IndexMap<String, Updater> {
        &self.updaters
    }

    pub fn updater(&self, name: &str) -> Option<&Updater> {
        self.updaters.get(name)
    }

    /// A copy of this filter with a different title.
    pub fn with_title(&self, title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..self.clone()
        }
    }

    /// Apply the selected operator, if any, to `query`.
    ///
    /// The operator is named by `{field}_filter` in `data`, or failing
    /// that in `initial`. Only input problems in `data` are recorded
    /// in `state`. Any operator name not registered on this filter,
    /// including a blank one, is an error.
    pub fn resolve<T: Refine>(
        &self,
        query: T,
        field: &str,
        data: Option<&Params>,
        initial: Option<&Params>,
        state: &mut FilterState,
        today: NaiveDate,
    ) -> Result<T, ResolveError> {
        let selector = selector_name(field);
        let selected = data
            .and_then(|d| d.get(&selector).map(|op| (d, op, Source::Submitted)))
            .or_else(|| {
                initial.and_then(|i| i.get(&selector).map(|op| (i, op, Source::Initial)))
            });

        let (params, operator, source) = match selected {
            Some(selected) => selected,
            None => {
                trace!("{}: nothing selected", field);
                return Ok(query);
            }
        };

        let updater = self
            .updaters
            .get(operator)
            .ok_or_else(|| ResolveError::UnknownOperator {
                field: field.to_string(),
                operator: operator.to_string(),
            })?;

        trace!("{}: {:?} operator '{}'", field, source, operator);
        if source == Source::Submitted {
            state.bound = Some(operator.to_string());
        }

        let applied = updater.apply(
            query,
            field,
            &input_prefix(field, operator),
            params,
            source,
            today,
        );
        if applied.error.is_some() {
            state.error = applied.error;
        }
        Ok(applied.query)
    }

    /// Equal, starts with, ends with, contains.
    pub fn string(title: &str) -> Self {
        Self::builder(title)
            .updater("equal", Updater::new("Equal", Operation::CharEqual))
            .updater("starts_with", Updater::new("Starts with", Operation::StartsWith))
            .updater("ends_with", Updater::new("Ends with", Operation::EndsWith))
            .updater("contains", Updater::new("Contains", Operation::Contains))
            .build()
    }

    /// [`string`](Filter::string), plus checks for blank text.
    pub fn string_with_empty(title: &str) -> Self {
        Self::builder(title)
            .extend(&Self::string(title))
            .updater("empty", Updater::new("Empty", Operation::Empty))
            .updater("not_empty", Updater::new("Filled", Operation::NotEmpty))
            .build()
    }

    /// Equal, greater than, less than.
    pub fn integer(title: &str) -> Self {
        Self::builder(title)
            .updater("equal", Updater::new("Equal", Operation::IntegerEqual))
            .updater("greater_than", Updater::new("Greater than", Operation::GreaterThan))
            .updater("less_than", Updater::new("Less than", Operation::LessThan))
            .build()
    }

    pub fn integer_with_empty(title: &str) -> Self {
        Self::builder(title)
            .extend(&Self::integer(title))
            .with_null_checks()
            .build()
    }

    /// Today, equal, between.
    pub fn date(title: &str) -> Self {
        Self::builder(title)
            .updater("today", Updater::new("Today", Operation::DateToday))
            .updater("equal", Updater::new("Equal", Operation::DateEqual))
            .updater("range", Updater::new("Between", Operation::DateRange))
            .build()
    }

    pub fn date_with_empty(title: &str) -> Self {
        Self::builder(title)
            .extend(&Self::date(title))
            .with_null_checks()
            .build()
    }

    /// Today, equal, between; each spanning whole days.
    pub fn datetime(title: &str) -> Self {
        Self::builder(title)
            .updater("today", Updater::new("Today", Operation::DateTimeToday))
            .updater("equal", Updater::new("Equal", Operation::DateTimeEqual))
            .updater("range", Updater::new("Between", Operation::DateTimeRange))
            .build()
    }

    pub fn datetime_with_empty(title: &str) -> Self {
        Self::builder(title)
            .extend(&Self::datetime(title))
            .with_null_checks()
            .build()
    }

    pub fn boolean(title: &str) -> Self {
        Self::builder(title)
            .updater("true", Updater::new("Checked", Operation::True))
            .updater("false", Updater::new("Not checked", Operation::False))
            .build()
    }

    /// Equal to one of `choices`.
    pub fn choice(title: &str, choices: Vec<Choice>, select2: bool) -> Self {
        Self::builder(title)
            .updater("choice_equal", Updater::new("Equal", Operation::Choice(choices)))
            .select2(select2)
            .build()
    }

    pub fn choice_with_empty(title: &str, choices: Vec<Choice>, select2: bool) -> Self {
        Self::builder(title)
            .extend(&Self::choice(title, choices, select2))
            .with_null_checks()
            .build()
    }

    /// Equal to one of the rows of a related entity, given as
    /// `choices` keyed by primary key.
    pub fn model_choice(title: &str, choices: Vec<Choice>, select2: bool) -> Self {
        Self::choice(title, choices, select2)
    }

    pub fn model_choice_with_empty(title: &str, choices: Vec<Choice>, select2: bool) -> Self {
        Self::choice_with_empty(title, choices, select2)
    }
}

/// Declare a [`Filter`].
///
/// Operators keep the order in which they are first declared.
/// Declaring an operator again replaces it without moving it.
pub struct FilterBuilder {
    title: String,
    select2: bool,
    updaters: IndexMap<String, Updater>,
}

impl FilterBuilder {
    pub fn updater(mut self, name: &str, updater: Updater) -> Self {
        self.updaters.insert(name.to_string(), updater);
        self
    }

    /// Inherit the operators of `base`. They come before any
    /// operators declared here, and are replaced by them on a name
    /// clash. The `select2` flag is inherited if set.
    pub fn extend(mut self, base: &Filter) -> Self {
        let mut merged = base.updaters.clone();
        for (name, updater) in self.updaters.drain(..) {
            merged.insert(name, updater);
        }
        self.updaters = merged;
        self.select2 |= base.select2;
        self
    }

    pub fn select2(mut self, select2: bool) -> Self {
        self.select2 = select2;
        self
    }

    fn with_null_checks(self) -> Self {
        self.updater("empty", Updater::new("Empty", Operation::IsNull))
            .updater("not_empty", Updater::new("Filled", Operation::NotNull))
    }

    pub fn build(self) -> Filter {
        Filter {
            title: self.title,
            select2: self.select2,
            updaters: self.updaters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Lookup, Q, QuerySet};
    use crate::value::Value;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, 15).unwrap()
    }

    fn resolve(
        filter: &Filter,
        data: Option<&Params>,
        initial: Option<&Params>,
    ) -> (Result<QuerySet, ResolveError>, FilterState) {
        let mut state = FilterState::default();
        let res = filter.resolve(QuerySet::all(), "age", data, initial, &mut state, today());
        (res, state)
    }

    #[test_log::test]
    fn nothing_selected_is_identity() {
        let f = Filter::integer("Age");
        let unrelated = Params::new().with("name_filter", "equal");
        for (data, initial) in [
            (None, None),
            (Some(&unrelated), None),
            (None, Some(&unrelated)),
            (Some(&unrelated), Some(&unrelated)),
        ] {
            let (qs, state) = resolve(&f, data, initial);
            assert_eq!(qs.unwrap(), QuerySet::all());
            assert!(state.bound.is_none());
            assert!(!state.has_error());
        }
    }

    #[test_log::test]
    fn submitted_error_is_recorded() {
        let f = Filter::integer("Age");
        let data = Params::new()
            .with("age_filter", "greater_than")
            .with("age_filter_greater_than_0_value", "thirty");
        let (qs, state) = resolve(&f, Some(&data), None);
        assert_eq!(qs.unwrap(), QuerySet::all());
        assert_eq!(state.bound.as_deref(), Some("greater_than"));
        assert!(state.has_error());
    }

    #[test_log::test]
    fn initial_errors_are_hidden() {
        let f = Filter::integer("Age");
        let initial = Params::new().with("age_filter", "less_than");
        let (qs, state) = resolve(&f, Some(&Params::new()), Some(&initial));
        assert_eq!(qs.unwrap(), QuerySet::all());
        assert!(state.bound.is_none());
        assert!(!state.has_error());

        let initial = initial.with("age_filter_less_than_0_value", "18");
        let (qs, _) = resolve(&f, Some(&Params::new()), Some(&initial));
        assert_eq!(
            qs.unwrap().predicates(),
            &[Q::new("age", Lookup::Lt(Value::Int(18)))]
        );
    }

    #[test_log::test]
    fn submitted_beats_initial() {
        let f = Filter::integer("Age");
        let data = Params::new()
            .with("age_filter", "equal")
            .with("age_filter_equal_0_value", "4");
        let initial = Params::new()
            .with("age_filter", "less_than")
            .with("age_filter_less_than_0_value", "18");
        let (qs, _) = resolve(&f, Some(&data), Some(&initial));
        assert_eq!(qs.unwrap().to_string(), "age=4");
    }

    #[test_log::test]
    fn unknown_operator_fails() {
        let f = Filter::integer("Age");
        let data = Params::new().with("age_filter", "contains");
        let (qs, _) = resolve(&f, Some(&data), None);
        assert!(matches!(
            qs,
            Err(ResolveError::UnknownOperator { ref operator, .. }) if operator == "contains"
        ));

        for name in ["", " equal"] {
            let data = Params::new().with("age_filter", name);
            let (qs, state) = resolve(&f, Some(&data), None);
            assert!(matches!(
                qs,
                Err(ResolveError::UnknownOperator { ref operator, .. }) if operator == name
            ));
            assert!(state.bound.is_none());
        }

        let initial = Params::new().with("age_filter", "");
        let (qs, _) = resolve(&f, None, Some(&initial));
        assert!(qs.is_err());
    }

    #[test_log::test]
    fn presets() {
        let names = |f: &Filter| f.updaters().keys().cloned().collect::<Vec<_>>();
        assert_eq!(
            names(&Filter::string_with_empty("x")),
            ["equal", "starts_with", "ends_with", "contains", "empty", "not_empty"]
        );
        assert_eq!(
            Filter::string_with_empty("x").updater("not_empty").unwrap().operation(),
            &Operation::NotEmpty
        );
        assert_eq!(
            names(&Filter::datetime_with_empty("x")),
            ["today", "equal", "range", "empty", "not_empty"]
        );
        assert_eq!(
            Filter::datetime_with_empty("x").updater("empty").unwrap().operation(),
            &Operation::IsNull
        );
        assert_eq!(names(&Filter::boolean("x")), ["true", "false"]);
        let c = Filter::choice_with_empty("x", vec![Choice::new("a", "A")], true);
        assert_eq!(names(&c), ["choice_equal", "empty", "not_empty"]);
        assert!(c.select2());
    }

    #[test_log::test]
    fn extend_keeps_base_order() {
        let base = Filter::integer("Age");
        let f = Filter::builder("Age")
            .updater("all", Updater::new("All", Operation::All))
            .updater("equal", Updater::new("Exactly", Operation::IntegerEqual))
            .extend(&base)
            .build();
        let names = f.updaters().keys().cloned().collect::<Vec<_>>();
        assert_eq!(names, ["equal", "greater_than", "less_than", "all"]);
        assert_eq!(f.updater("equal").unwrap().title(), "Exactly");
    }

    #[test_log::test]
    fn choice_in() {
        let f = Filter::builder("Status")
            .updater(
                "one_of",
                Updater::new(
                    "One of",
                    Operation::ChoiceIn(vec![Choice::new("a", "A"), Choice::int(2, "Two")]),
                ),
            )
            .build();
        let data = Params::new()
            .with("age_filter", "one_of")
            .with("age_filter_one_of_0_values", "a")
            .with("age_filter_one_of_0_values", "2");
        let (qs, state) = resolve(&f, Some(&data), None);
        assert!(!state.has_error());
        assert_eq!(
            qs.unwrap().predicates(),
            &[Q::new(
                "age",
                Lookup::In(vec![Value::from("a"), Value::Int(2)])
            )]
        );
    }
}
