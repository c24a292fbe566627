//! # Query descriptors
//!
//! Filters never run queries themselves. They describe what they
//! want by building a [`Q`] predicate and handing it to something that
//! implements [`Refine`], which returns a narrower query. Whatever
//! consumes the final query is responsible for executing it.
//!
//! The predicates follow Django's lookup vocabulary: `exact`,
//! `istartswith`, `iendswith`, `icontains`, `gt`, `lt`, `isnull`,
//! `range` and `in`. Predicates combine with `&`, `|` and `!`, in the
//! same way that Django's `Q` objects combine with `&`, `|` and `~`.
//!
//! [`QuerySet`] is a simple implementation of [`Refine`] that records
//! its predicates, and can evaluate them against anything that
//! implements [`Record`]:
//!
//! ```rust
//! use ww_filters::query::{Lookup, Q, QuerySet, Record, Refine};
//! use ww_filters::value::Value;
//!
//! struct Person {
//!     age: i64,
//! }
//!
//! impl Record for Person {
//!     fn value(&self, field: &str) -> Option<Value> {
//!         match field {
//!             "age" => Some(Value::Int(self.age)),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let qs = QuerySet::all().refine(Q::new("age", Lookup::Gt(Value::Int(30))));
//! let mut people = vec![Person { age: 25 }, Person { age: 40 }];
//! qs.filter_vec(&mut people);
//! assert_eq!(people.len(), 1);
//! assert_eq!(qs.to_string(), "age__gt=30");
//! ```

use core::cmp::Ordering;
use core::fmt;
use core::ops::{BitAnd, BitOr, Not};

use crate::value::Value;

/// The right hand side of a single condition, tagged by lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// `field = value`
    Exact(Value),
    /// Case insensitive prefix match.
    IStartsWith(String),
    /// Case insensitive suffix match.
    IEndsWith(String),
    /// Case insensitive substring match.
    IContains(String),
    /// `field > value`
    Gt(Value),
    /// `field < value`
    Lt(Value),
    /// `field IS NULL` when `true`, `field IS NOT NULL` when `false`.
    IsNull(bool),
    /// Inclusive range.
    Range(Value, Value),
    /// `field` is one of the values.
    In(Vec<Value>),
}

impl Lookup {
    /// The Django name of the lookup, as it appears after `__`.
    pub fn name(&self) -> &'static str {
        match self {
            Lookup::Exact(_) => "exact",
            Lookup::IStartsWith(_) => "istartswith",
            Lookup::IEndsWith(_) => "iendswith",
            Lookup::IContains(_) => "icontains",
            Lookup::Gt(_) => "gt",
            Lookup::Lt(_) => "lt",
            Lookup::IsNull(_) => "isnull",
            Lookup::Range(_, _) => "range",
            Lookup::In(_) => "in",
        }
    }

    /// Test a single field value against this lookup.
    pub fn apply(&self, value: &Value) -> bool {
        match self {
            Lookup::Exact(target) => value.matches(target),
            Lookup::IStartsWith(target) => {
                text(value).map_or(false, |s| s.starts_with(&target.to_lowercase()))
            }
            Lookup::IEndsWith(target) => {
                text(value).map_or(false, |s| s.ends_with(&target.to_lowercase()))
            }
            Lookup::IContains(target) => {
                text(value).map_or(false, |s| s.contains(&target.to_lowercase()))
            }
            Lookup::Gt(target) => value.compare(target) == Some(Ordering::Greater),
            Lookup::Lt(target) => value.compare(target) == Some(Ordering::Less),
            Lookup::IsNull(target) => value.is_null() == *target,
            Lookup::Range(start, end) => {
                matches!(
                    value.compare(start),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(value.compare(end), Some(Ordering::Less | Ordering::Equal))
            }
            Lookup::In(targets) => targets.iter().any(|t| value.matches(t)),
        }
    }
}

fn text(value: &Value) -> Option<String> {
    if value.is_null() {
        None
    } else {
        Some(value.to_string().to_lowercase())
    }
}

/// One `field__lookup=value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub lookup: Lookup,
}

/// A predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Q {
    Condition(Condition),
    And(Vec<Q>),
    Or(Vec<Q>),
    Not(Box<Q>),
}

impl Q {
    pub fn new(field: &str, lookup: Lookup) -> Self {
        Q::Condition(Condition {
            field: field.to_string(),
            lookup,
        })
    }

    /// Evaluate the predicate against a record. Fields the record
    /// does not know about read as [`Value::Null`].
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        match self {
            Q::Condition(c) => c
                .lookup
                .apply(&record.value(&c.field).unwrap_or(Value::Null)),
            Q::And(qs) => qs.iter().all(|q| q.matches(record)),
            Q::Or(qs) => qs.iter().any(|q| q.matches(record)),
            Q::Not(q) => !q.matches(record),
        }
    }
}

impl BitAnd for Q {
    type Output = Q;
    fn bitand(self, rhs: Q) -> Q {
        match self {
            Q::And(mut qs) => {
                qs.push(rhs);
                Q::And(qs)
            }
            q => Q::And(vec![q, rhs]),
        }
    }
}

impl BitOr for Q {
    type Output = Q;
    fn bitor(self, rhs: Q) -> Q {
        match self {
            Q::Or(mut qs) => {
                qs.push(rhs);
                Q::Or(qs)
            }
            q => Q::Or(vec![q, rhs]),
        }
    }
}

impl Not for Q {
    type Output = Q;
    fn not(self) -> Q {
        Q::Not(Box::new(self))
    }
}

impl fmt::Display for Q {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Q::Condition(Condition { field, lookup }) => match lookup {
                Lookup::Exact(v) => write!(f, "{}={}", field, v),
                Lookup::IStartsWith(s) | Lookup::IEndsWith(s) | Lookup::IContains(s) => {
                    write!(f, "{}__{}={}", field, lookup.name(), s)
                }
                Lookup::Gt(v) | Lookup::Lt(v) => write!(f, "{}__{}={}", field, lookup.name(), v),
                Lookup::IsNull(b) => write!(f, "{}__isnull={}", field, Value::Bool(*b)),
                Lookup::Range(a, b) => write!(f, "{}__range=({}, {})", field, a, b),
                Lookup::In(vs) => {
                    write!(f, "{}__in=(", field)?;
                    for (i, v) in vs.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", v)?;
                    }
                    write!(f, ")")
                }
            },
            Q::And(qs) => join(f, qs, " AND "),
            Q::Or(qs) => join(f, qs, " OR "),
            Q::Not(q) => write!(f, "NOT ({})", q),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, qs: &[Q], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, q) in qs.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", q)?;
    }
    write!(f, ")")
}

/// Something that can be narrowed by a predicate.
///
/// This is the only thing filters need from a query: the ability to
/// produce a new query with one more predicate applied. Implementations
/// must not execute anything.
pub trait Refine: Sized {
    fn refine(self, q: Q) -> Self;
}

/// Something whose fields can be read by name, so that a [`QuerySet`]
/// can be evaluated against it in memory.
///
/// This has an associated derive macro, [`macro@Record`](crate::Record),
/// when the `derive` feature is enabled.
pub trait Record {
    /// Return the value of `field`, or [`None`] if there is no such
    /// field.
    fn value(&self, field: &str) -> Option<Value>;
}

/// An immutable, chainable list of predicates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySet {
    predicates: Vec<Q>,
    empty: bool,
}

impl QuerySet {
    /// A query matching everything.
    pub fn all() -> Self {
        Default::default()
    }

    /// A query matching nothing, however it is refined.
    pub fn none() -> Self {
        Self {
            predicates: Vec::new(),
            empty: true,
        }
    }

    pub fn filter(&self, q: Q) -> Self {
        let mut predicates = self.predicates.clone();
        predicates.push(q);
        Self {
            predicates,
            empty: self.empty,
        }
    }

    pub fn predicates(&self) -> &[Q] {
        &self.predicates
    }

    pub fn is_none(&self) -> bool {
        self.empty
    }

    /// Test whether a record is included in the result set.
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        !self.empty && self.predicates.iter().all(|q| q.matches(record))
    }

    /// Filter an entire [`Vec`] in place.
    pub fn filter_vec<R: Record>(&self, data: &mut Vec<R>) {
        data.retain(|r| self.matches(r))
    }

    /// Filter an entire [`Vec`] of references in place.
    pub fn filter_ref_vec<R: Record>(&self, data: &mut Vec<&R>) {
        data.retain(|r| self.matches(*r))
    }
}

impl Refine for QuerySet {
    fn refine(self, q: Q) -> Self {
        let mut qs = self;
        qs.predicates.push(q);
        qs
    }
}

impl fmt::Display for QuerySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.empty {
            return write!(f, "<none>");
        }
        for (i, q) in self.predicates.iter().enumerate() {
            if i > 0 {
                write!(f, "&")?;
            }
            write!(f, "{}", q)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct Row(BTreeMap<&'static str, Value>);

    impl Record for Row {
        fn value(&self, field: &str) -> Option<Value> {
            self.0.get(field).cloned()
        }
    }

    fn row(name: Value) -> Row {
        Row(BTreeMap::from([("name", name)]))
    }

    #[test_log::test]
    fn case_insensitive_text() {
        let r = row(Value::from("Hello World"));
        assert!(Q::new("name", Lookup::IStartsWith("hello".into())).matches(&r));
        assert!(Q::new("name", Lookup::IEndsWith("WORLD".into())).matches(&r));
        assert!(Q::new("name", Lookup::IContains("o w".into())).matches(&r));
        assert!(!Q::new("name", Lookup::IContains("xyz".into())).matches(&r));
    }

    #[test_log::test]
    fn combinators() {
        let empty = Q::new("name", Lookup::IsNull(true)) | Q::new("name", Lookup::Exact("".into()));
        assert!(empty.matches(&row(Value::Null)));
        assert!(empty.matches(&row(Value::from(""))));
        assert!(!empty.matches(&row(Value::from("x"))));
        assert!((!empty).matches(&row(Value::from("x"))));
    }

    #[test_log::test]
    fn none_matches_nothing() {
        let qs = QuerySet::none().refine(Q::new("name", Lookup::IsNull(true)));
        assert!(qs.is_none());
        assert!(!qs.matches(&row(Value::Null)));
        assert!(QuerySet::all().matches(&row(Value::Null)));
    }

    #[test_log::test]
    fn display() {
        let qs = QuerySet::all()
            .refine(Q::new("age", Lookup::Gt(Value::Int(30))))
            .refine(Q::new("name", Lookup::IsNull(false)) & !Q::new("name", Lookup::Exact("".into())));
        assert_eq!(
            qs.to_string(),
            "age__gt=30&(name__isnull=False AND NOT (name=))"
        );
    }
}
