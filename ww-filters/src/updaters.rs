//! Single filter operators.
//!
//! An [`Updater`] is one choice in a filter's operator drop-down,
//! like "starts with" or "between". It knows what input it needs (its
//! [`FormKind`]) and, given valid input, which predicate to add to a
//! query.
//!
//! Operator | Input | Predicate
//! ---------|-------|----------
//! [`CharEqual`](Operation::CharEqual) | text | `field = v`
//! [`StartsWith`](Operation::StartsWith) | text | `field__istartswith = v`
//! [`EndsWith`](Operation::EndsWith) | text | `field__iendswith = v`
//! [`Contains`](Operation::Contains) | text | `field__icontains = v`
//! [`IntegerEqual`](Operation::IntegerEqual) | integer | `field = v`
//! [`GreaterThan`](Operation::GreaterThan) | integer | `field__gt = v`
//! [`LessThan`](Operation::LessThan) | integer | `field__lt = v`
//! [`IsNull`](Operation::IsNull) | | `field__isnull = True`
//! [`NotNull`](Operation::NotNull) | | `field__isnull = False`
//! [`Empty`](Operation::Empty) | | `field__isnull = True OR field = ""`
//! [`NotEmpty`](Operation::NotEmpty) | | `field__isnull = False AND NOT field = ""`
//! [`True`](Operation::True) | | `field = True`
//! [`False`](Operation::False) | | `field = False`
//! [`DateToday`](Operation::DateToday) | | `field = today`
//! [`DateEqual`](Operation::DateEqual) | date | `field = d`
//! [`DateRange`](Operation::DateRange) | two dates | `field__range = (start, end)`
//! [`DateTimeToday`](Operation::DateTimeToday) | | today, start to end of day
//! [`DateTimeEqual`](Operation::DateTimeEqual) | date | that day, start to end
//! [`DateTimeRange`](Operation::DateTimeRange) | two dates | start of `start` to end of `end`
//! [`Choice`](Operation::Choice) | choice | `field = choice`
//! [`ChoiceIn`](Operation::ChoiceIn) | choices | `field__in = choices`
//! [`All`](Operation::All) | | nothing

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, trace};

use crate::forms::{Cleaned, FormError, FormKind, Params};
use crate::query::{Lookup, Q, Refine};
use crate::schema::Choice;
use crate::value::Value;

/// What an [`Updater`] does to a query.
#[derive(Debug, Clone, PartialEq, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    CharEqual,
    StartsWith,
    EndsWith,
    Contains,
    IntegerEqual,
    GreaterThan,
    LessThan,
    IsNull,
    NotNull,
    Empty,
    NotEmpty,
    True,
    False,
    DateToday,
    DateEqual,
    DateRange,
    DateTimeToday,
    DateTimeEqual,
    DateTimeRange,
    Choice(Vec<Choice>),
    ChoiceIn(Vec<Choice>),
    All,
}

/// Where the data an updater is reading came from.
///
/// Only problems with submitted data are reported; initial data is
/// configuration supplied by the application, and a bad value there
/// just means the operator has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Submitted,
    Initial,
}

/// The result of applying an [`Updater`].
#[derive(Debug)]
pub struct Applied<T> {
    pub query: T,
    /// Set when submitted input failed validation.
    pub error: Option<FormError>,
}

/// A titled operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Updater {
    title: String,
    operation: Operation,
}

impl Updater {
    pub fn new(title: &str, operation: Operation) -> Self {
        Self {
            title: title.to_string(),
            operation,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// The input this operator needs.
    pub fn form(&self) -> FormKind {
        use Operation::*;
        match &self.operation {
            CharEqual | StartsWith | EndsWith | Contains => FormKind::char(),
            IntegerEqual | GreaterThan | LessThan => FormKind::Integer,
            DateEqual | DateTimeEqual => FormKind::Date,
            DateRange | DateTimeRange => FormKind::DateRange,
            Choice(choices) => FormKind::Choice(choices.clone()),
            ChoiceIn(choices) => FormKind::MultiChoice(choices.clone()),
            IsNull | NotNull | Empty | NotEmpty | True | False | DateToday | DateTimeToday
            | All => FormKind::Empty,
        }
    }

    /// Build the predicate for validated input, or [`None`] if this
    /// operator leaves the query alone.
    pub fn predicate(&self, field: &str, cleaned: Cleaned, today: NaiveDate) -> Option<Q> {
        use Operation::*;
        let q = match (&self.operation, cleaned) {
            (CharEqual, Cleaned::Text(v)) => Q::new(field, Lookup::Exact(Value::Str(v))),
            (StartsWith, Cleaned::Text(v)) => Q::new(field, Lookup::IStartsWith(v)),
            (EndsWith, Cleaned::Text(v)) => Q::new(field, Lookup::IEndsWith(v)),
            (Contains, Cleaned::Text(v)) => Q::new(field, Lookup::IContains(v)),
            (IntegerEqual, Cleaned::Integer(v)) => Q::new(field, Lookup::Exact(Value::Int(v))),
            (GreaterThan, Cleaned::Integer(v)) => Q::new(field, Lookup::Gt(Value::Int(v))),
            (LessThan, Cleaned::Integer(v)) => Q::new(field, Lookup::Lt(Value::Int(v))),
            (IsNull, _) => Q::new(field, Lookup::IsNull(true)),
            (NotNull, _) => Q::new(field, Lookup::IsNull(false)),
            (Empty, _) => {
                Q::new(field, Lookup::IsNull(true))
                    | Q::new(field, Lookup::Exact(Value::Str(String::new())))
            }
            (NotEmpty, _) => {
                Q::new(field, Lookup::IsNull(false))
                    & !Q::new(field, Lookup::Exact(Value::Str(String::new())))
            }
            (True, _) => Q::new(field, Lookup::Exact(Value::Bool(true))),
            (False, _) => Q::new(field, Lookup::Exact(Value::Bool(false))),
            (DateToday, _) => Q::new(field, Lookup::Exact(Value::Date(today))),
            (DateEqual, Cleaned::Date(d)) => Q::new(field, Lookup::Exact(Value::Date(d))),
            (DateRange, Cleaned::DateRange(start, end)) => Q::new(
                field,
                Lookup::Range(Value::Date(start), Value::Date(end)),
            ),
            (DateTimeToday, _) => day_range(field, today, today),
            (DateTimeEqual, Cleaned::Date(d)) => day_range(field, d, d),
            (DateTimeRange, Cleaned::DateRange(start, end)) => day_range(field, start, end),
            (Choice(_), Cleaned::Choice(c)) => Q::new(field, Lookup::Exact(c.value)),
            (ChoiceIn(_), Cleaned::Choices(cs)) => Q::new(
                field,
                Lookup::In(cs.into_iter().map(|c| c.value).collect()),
            ),
            (All, _) => return None,
            // form() and this table disagree
            (op, cleaned) => {
                debug!("operator {:?} cannot use input {:?}", op, cleaned);
                return None;
            }
        };
        Some(q)
    }

    /// Validate the input under `prefix` in `params`, and refine
    /// `query` on `field` if it is valid.
    ///
    /// Invalid input leaves the query unchanged. It is reported in the
    /// result only when `source` is [`Source::Submitted`].
    pub fn apply<T: Refine>(
        &self,
        query: T,
        field: &str,
        prefix: &str,
        params: &Params,
        source: Source,
        today: NaiveDate,
    ) -> Applied<T> {
        match self.form().clean(prefix, params) {
            Ok(cleaned) => {
                let query = match self.predicate(field, cleaned, today) {
                    Some(q) => {
                        trace!("{}: applying {}", prefix, q);
                        query.refine(q)
                    }
                    None => query,
                };
                Applied { query, error: None }
            }
            Err(e) => {
                debug!("{}: rejected {:?} input: {}", prefix, source, e);
                Applied {
                    query,
                    error: match source {
                        Source::Submitted => Some(e),
                        Source::Initial => None,
                    },
                }
            }
        }
    }
}

/// The first instant of `day`.
pub fn start_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

/// The last representable microsecond of `day`, 23:59:59.999999.
pub fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    start_of_day(day) + Duration::days(1) - Duration::microseconds(1)
}

fn day_range(field: &str, start: NaiveDate, end: NaiveDate) -> Q {
    Q::new(
        field,
        Lookup::Range(
            Value::DateTime(start_of_day(start)),
            Value::DateTime(end_of_day(end)),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QuerySet;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, 15).unwrap()
    }

    fn run(u: &Updater, params: &Params, source: Source) -> Applied<QuerySet> {
        u.apply(
            QuerySet::all(),
            "f",
            "f_filter_op",
            params,
            source,
            today(),
        )
    }

    #[test_log::test]
    fn text_requires_value() {
        for op in [
            Operation::CharEqual,
            Operation::StartsWith,
            Operation::EndsWith,
            Operation::Contains,
        ] {
            let u = Updater::new("x", op);
            let missing = run(&u, &Params::new(), Source::Submitted);
            assert_eq!(missing.query, QuerySet::all());
            assert!(missing.error.is_some());

            let blank = Params::new().with("f_filter_op_0_value", "");
            let initial = run(&u, &blank, Source::Initial);
            assert_eq!(initial.query, QuerySet::all());
            assert!(initial.error.is_none());
        }
    }

    #[test_log::test]
    fn greater_than() {
        let u = Updater::new("Greater than", Operation::GreaterThan);
        let p = Params::new().with("f_filter_op_0_value", "30");
        let res = run(&u, &p, Source::Submitted);
        assert!(res.error.is_none());
        assert_eq!(
            res.query.predicates(),
            &[Q::new("f", Lookup::Gt(Value::Int(30)))]
        );
    }

    #[test_log::test]
    fn today_needs_no_input() {
        let u = Updater::new("Today", Operation::DateToday);
        let res = run(&u, &Params::new(), Source::Submitted);
        assert_eq!(
            res.query.predicates(),
            &[Q::new("f", Lookup::Exact(Value::Date(today())))]
        );

        let u = Updater::new("Today", Operation::DateTimeToday);
        let res = run(&u, &Params::new(), Source::Submitted);
        let start = today().and_hms_opt(0, 0, 0).unwrap();
        let end = today().and_hms_micro_opt(23, 59, 59, 999_999).unwrap();
        assert_eq!(
            res.query.predicates(),
            &[Q::new(
                "f",
                Lookup::Range(Value::DateTime(start), Value::DateTime(end))
            )]
        );
    }

    #[test_log::test]
    fn empty_and_not_empty_are_negations() {
        let empty = Updater::new("Empty", Operation::Empty)
            .predicate("f", Cleaned::Nothing, today())
            .unwrap();
        let not_empty = Updater::new("Filled", Operation::NotEmpty)
            .predicate("f", Cleaned::Nothing, today())
            .unwrap();
        assert_eq!(empty.to_string(), "(f__isnull=True OR f=)");
        assert_eq!(not_empty.to_string(), "(f__isnull=False AND NOT (f=))");
    }

    #[test_log::test]
    fn all_is_a_no_op() {
        let u = Updater::new("All", Operation::All);
        let res = run(&u, &Params::new(), Source::Submitted);
        assert_eq!(res.query, QuerySet::all());
        assert!(res.error.is_none());
    }

    #[test_log::test]
    fn operation_names() {
        assert_eq!(Operation::DateTimeRange.as_ref(), "date_time_range");
        assert_eq!(Operation::Choice(Vec::new()).as_ref(), "choice");
    }
}
