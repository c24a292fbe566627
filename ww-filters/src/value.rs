//! Scalar values carried by predicates and records.
//!
//! A [`Value`] is what a predicate compares against, and what a
//! [`Record`](crate::query::Record) hands back for one of its
//! fields. Most Rust scalar types convert into one via
//! [`IntoValue`]; [`Option<T>`] maps [`None`] to [`Value::Null`].

use core::cmp::Ordering;
use core::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A single scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Compare two values of compatible kinds.
    ///
    /// Integers and floats compare numerically, and a date compares
    /// against a datetime as midnight of that day. Anything else,
    /// including [`Value::Null`] on either side, is incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::DateTime(b)) => Some(a.and_time(NaiveTime::MIN).cmp(b)),
            (Value::DateTime(a), Value::Date(b)) => Some(a.cmp(&b.and_time(NaiveTime::MIN))),
            _ => None,
        }
    }

    /// Equality in the sense of a lookup: null never matches.
    pub fn matches(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.6f")),
        }
    }
}

/// Convert a field's contents into a [`Value`].
pub trait IntoValue {
    fn to_value(&self) -> Value;
}

/// A marker for integer types that fit in an [`i64`].
pub trait IntegerValue: Copy + Into<i64> {}

impl IntegerValue for i8 {}
impl IntegerValue for u8 {}
impl IntegerValue for i16 {}
impl IntegerValue for u16 {}
impl IntegerValue for i32 {}
impl IntegerValue for u32 {}
impl IntegerValue for i64 {}

impl<T> IntoValue for T
where
    T: IntegerValue,
{
    fn to_value(&self) -> Value {
        Value::Int((*self).into())
    }
}

impl IntoValue for u64 {
    fn to_value(&self) -> Value {
        i64::try_from(*self)
            .map(Value::Int)
            .unwrap_or(Value::Float(*self as f64))
    }
}

impl IntoValue for usize {
    fn to_value(&self) -> Value {
        (*self as u64).to_value()
    }
}

impl IntoValue for isize {
    fn to_value(&self) -> Value {
        Value::Int(*self as i64)
    }
}

impl IntoValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float((*self).into())
    }
}

impl IntoValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl IntoValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl IntoValue for String {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
}

impl IntoValue for &str {
    fn to_value(&self) -> Value {
        Value::Str(self.to_string())
    }
}

impl IntoValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Date(*self)
    }
}

impl IntoValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }
}

impl<Tz: chrono::TimeZone> IntoValue for chrono::DateTime<Tz> {
    fn to_value(&self) -> Value {
        Value::DateTime(self.naive_local())
    }
}

impl<T> IntoValue for Option<T>
where
    T: IntoValue,
{
    fn to_value(&self) -> Value {
        self.as_ref().map(IntoValue::to_value).unwrap_or(Value::Null)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn null_is_incomparable() {
        assert_eq!(Value::Null.compare(&Value::Null), None);
        assert!(!Value::Null.matches(&Value::Str(String::new())));
    }

    #[test_log::test]
    fn date_against_datetime() {
        let d = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let dt = d.and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(Value::Date(d).compare(&Value::DateTime(dt)), Some(Ordering::Less));
        assert_eq!(Value::Int(3).compare(&Value::Float(2.5)), Some(Ordering::Greater));
    }

    #[test_log::test]
    fn option_maps_to_null() {
        let x: Option<i32> = None;
        assert_eq!(x.to_value(), Value::Null);
        assert_eq!(Some(4u8).to_value(), Value::Int(4));
    }
}
