//! Validation of submitted filter inputs.
//!
//! Each operator expects a particular shape of input: nothing at all,
//! a single string, an integer, a date, a pair of dates or a choice
//! from a list. A [`FormKind`] names that shape, and
//! [`clean`](FormKind::clean) extracts and checks the inputs from a
//! set of [`Params`].
//!
//! Input names are namespaced by a prefix, so that every operator on
//! every field has its own inputs. The input `value` of prefix
//! `age_filter_greater_than` is read from the key
//! `age_filter_greater_than_0_value`, where `0` is the index of the
//! form; each operator binds exactly one form.

use std::num::ParseIntError;

use chrono::NaiveDate;
use thiserror::Error;

use crate::schema::Choice;

/// The length limit of free text inputs.
pub const MAX_TEXT_LENGTH: usize = 255;

// `%Y` also accepts two digit years, so `%y` goes first.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%y", "%d.%m.%Y", "%m/%d/%Y"];

/// Errors in submitted input.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("input '{0}' is required")]
    Required(String),
    #[error("input '{field}' is longer than {max} characters")]
    TooLong { field: String, max: usize },
    #[error("input '{field}' is not a whole number")]
    BadInteger {
        field: String,
        #[source]
        source: ParseIntError,
    },
    #[error("input '{field}' is not a valid date: '{value}'")]
    BadDate { field: String, value: String },
    #[error("input '{field}' is not one of the available choices: '{value}'")]
    InvalidChoice { field: String, value: String },
}

/// An ordered multimap of query parameters.
///
/// As with Django's `QueryDict`, [`get`](Params::get) returns the
/// last value given for a key, and [`get_all`](Params::get_all)
/// returns all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Default::default()
    }

    /// Parse a URL query string, with or without its leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Builder-style [`insert`](Params::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize back into a query string, without a leading `?`.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The kind of input control a front end should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Widget {
    Hidden,
    Text,
    Number,
    Date,
    DateRange,
    Select,
    SelectMultiple,
}

/// The shape of input an operator expects.
#[derive(Debug, Clone, PartialEq)]
pub enum FormKind {
    /// No input; always valid.
    Empty,
    /// A non-empty string.
    Char { max_length: usize },
    Integer,
    Date,
    /// A `start` and an `end` date.
    DateRange,
    /// One of the given choices.
    Choice(Vec<Choice>),
    /// At least one of the given choices, as repeated `values`.
    MultiChoice(Vec<Choice>),
}

/// Validated input.
#[derive(Debug, Clone, PartialEq)]
pub enum Cleaned {
    Nothing,
    Text(String),
    Integer(i64),
    Date(NaiveDate),
    DateRange(NaiveDate, NaiveDate),
    Choice(Choice),
    Choices(Vec<Choice>),
}

/// The full key of input `input` under `prefix`.
pub fn input_name(prefix: &str, input: &str) -> String {
    format!("{}_0_{}", prefix, input)
}

impl FormKind {
    pub fn char() -> Self {
        FormKind::Char {
            max_length: MAX_TEXT_LENGTH,
        }
    }

    /// The names of the inputs this form reads, before prefixing.
    pub fn inputs(&self) -> &'static [&'static str] {
        match self {
            FormKind::Empty => &[],
            FormKind::Char { .. } | FormKind::Integer | FormKind::Date | FormKind::Choice(_) => {
                &["value"]
            }
            FormKind::DateRange => &["start", "end"],
            FormKind::MultiChoice(_) => &["values"],
        }
    }

    pub fn widget(&self) -> Widget {
        match self {
            FormKind::Empty => Widget::Hidden,
            FormKind::Char { .. } => Widget::Text,
            FormKind::Integer => Widget::Number,
            FormKind::Date => Widget::Date,
            FormKind::DateRange => Widget::DateRange,
            FormKind::Choice(_) => Widget::Select,
            FormKind::MultiChoice(_) => Widget::SelectMultiple,
        }
    }

    pub fn choices(&self) -> Option<&[Choice]> {
        match self {
            FormKind::Choice(c) | FormKind::MultiChoice(c) => Some(c),
            _ => None,
        }
    }

    /// Read and validate this form's inputs from `params`.
    pub fn clean(&self, prefix: &str, params: &Params) -> Result<Cleaned, FormError> {
        match self {
            FormKind::Empty => Ok(Cleaned::Nothing),
            FormKind::Char { max_length } => {
                let (field, value) = required(prefix, "value", params)?;
                if value.chars().count() > *max_length {
                    return Err(FormError::TooLong {
                        field,
                        max: *max_length,
                    });
                }
                Ok(Cleaned::Text(value.to_string()))
            }
            FormKind::Integer => {
                let (field, value) = required(prefix, "value", params)?;
                value
                    .parse::<i64>()
                    .map(Cleaned::Integer)
                    .map_err(|source| FormError::BadInteger { field, source })
            }
            FormKind::Date => {
                let (field, value) = required(prefix, "value", params)?;
                parse_date(&field, value).map(Cleaned::Date)
            }
            FormKind::DateRange => {
                let (start_field, start) = required(prefix, "start", params)?;
                let (end_field, end) = required(prefix, "end", params)?;
                Ok(Cleaned::DateRange(
                    parse_date(&start_field, start)?,
                    parse_date(&end_field, end)?,
                ))
            }
            FormKind::Choice(choices) => {
                let (field, value) = required(prefix, "value", params)?;
                find_choice(choices, &field, value).map(Cleaned::Choice)
            }
            FormKind::MultiChoice(choices) => {
                let field = input_name(prefix, "values");
                let values = params
                    .get_all(&field)
                    .into_iter()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .collect::<Vec<_>>();
                if values.is_empty() {
                    return Err(FormError::Required(field));
                }
                values
                    .into_iter()
                    .map(|v| find_choice(choices, &field, v))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Cleaned::Choices)
            }
        }
    }
}

fn required<'p>(
    prefix: &str,
    input: &str,
    params: &'p Params,
) -> Result<(String, &'p str), FormError> {
    let field = input_name(prefix, input);
    match params.get(&field).map(str::trim) {
        Some(value) if !value.is_empty() => Ok((field, value)),
        _ => Err(FormError::Required(field)),
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, FormError> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .ok_or_else(|| FormError::BadDate {
            field: field.to_string(),
            value: value.to_string(),
        })
}

fn find_choice(choices: &[Choice], field: &str, value: &str) -> Result<Choice, FormError> {
    choices
        .iter()
        .find(|c| c.key == value)
        .cloned()
        .ok_or_else(|| FormError::InvalidChoice {
            field: field.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn params_last_value_wins() {
        let p = Params::parse("?a=1&b=x%20y&a=2");
        assert_eq!(p.get("a"), Some("2"));
        assert_eq!(p.get_all("a"), vec!["1", "2"]);
        assert_eq!(p.get("b"), Some("x y"));
        assert_eq!(p.get("c"), None);
        assert_eq!(Params::parse(&p.to_query_string()), p);
    }

    #[test_log::test]
    fn char_requires_value() {
        let p = Params::new().with("name_filter_equal_0_value", "  ");
        assert!(matches!(
            FormKind::char().clean("name_filter_equal", &p),
            Err(FormError::Required(_))
        ));
        let p = Params::new().with("name_filter_equal_0_value", "x".repeat(256));
        assert!(matches!(
            FormKind::char().clean("name_filter_equal", &p),
            Err(FormError::TooLong { max: 255, .. })
        ));
        let p = Params::new().with("name_filter_equal_0_value", " bob ");
        assert_eq!(
            FormKind::char().clean("name_filter_equal", &p).unwrap(),
            Cleaned::Text("bob".to_string())
        );
    }

    #[test_log::test]
    fn integer_and_dates() {
        let p = Params::new()
            .with("n_0_value", "-12")
            .with("d_0_start", "01.02.2020")
            .with("d_0_end", "2020-02-03");
        assert_eq!(FormKind::Integer.clean("n", &p).unwrap(), Cleaned::Integer(-12));
        assert_eq!(
            FormKind::DateRange.clean("d", &p).unwrap(),
            Cleaned::DateRange(
                NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 2, 3).unwrap()
            )
        );
        let p = Params::new().with("n_0_value", "twelve");
        assert!(matches!(
            FormKind::Integer.clean("n", &p),
            Err(FormError::BadInteger { .. })
        ));
        let p = Params::new().with("d_0_value", "01.02.20");
        assert_eq!(
            FormKind::Date.clean("d", &p).unwrap(),
            Cleaned::Date(NaiveDate::from_ymd_opt(2020, 2, 1).unwrap())
        );
        let p = Params::new().with("d_0_value", "01.02.1920");
        assert_eq!(
            FormKind::Date.clean("d", &p).unwrap(),
            Cleaned::Date(NaiveDate::from_ymd_opt(1920, 2, 1).unwrap())
        );
        let p = Params::new().with("d_0_value", "2020-13-40");
        assert!(matches!(
            FormKind::Date.clean("d", &p),
            Err(FormError::BadDate { .. })
        ));
    }

    #[test_log::test]
    fn choices() {
        let choices = vec![Choice::new("a", "Alpha"), Choice::new("b", "Beta")];
        let p = Params::new()
            .with("c_0_value", "b")
            .with("c_0_values", "a")
            .with("c_0_values", "b");
        assert_eq!(
            FormKind::Choice(choices.clone()).clean("c", &p).unwrap(),
            Cleaned::Choice(Choice::new("b", "Beta"))
        );
        assert_eq!(
            FormKind::MultiChoice(choices.clone()).clean("c", &p).unwrap(),
            Cleaned::Choices(choices.clone())
        );
        let p = Params::new().with("c_0_value", "z");
        assert!(matches!(
            FormKind::Choice(choices).clean("c", &p),
            Err(FormError::InvalidChoice { .. })
        ));
    }

    #[test_log::test]
    fn widget_names() {
        assert_eq!(FormKind::DateRange.widget().to_string(), "date_range");
        assert_eq!(FormKind::Empty.widget().as_ref(), "hidden");
    }
}
