//! Descriptions of a model's fields.
//!
//! A [`FilterCollection`](crate::collection::FilterCollection) can be
//! built automatically for any type implementing [`Model`]. The
//! schema lists the model's fields in declaration order, with the
//! information needed to pick a default set of filter operators for
//! each of them.
//!
//! [`Model`] has an associated derive macro, which infers each
//! field's [`FieldKind`] from its Rust type:
//!
//! Rust type                        | [`FieldKind`]
//! ---------------------------------|----------------------------------
//! `String`, `&str`                 | [`Text`](FieldKind::Text)
//! `i8`..`i64`, `u8`..`u64`, `usize`, `isize` | [`Integer`](FieldKind::Integer)
//! `f32`, `f64`                     | [`Float`](FieldKind::Float)
//! `bool`                           | [`Boolean`](FieldKind::Boolean)
//! `NaiveDate`                      | [`Date`](FieldKind::Date)
//! `NaiveDateTime`, `DateTime<_>`   | [`DateTime`](FieldKind::DateTime)
//! `Option<T>`                      | as `T`, and nullable
//!
//! Anything else is [`Other`](FieldKind::Other), unless annotated
//! with `#[filter(relation = "Target")]` or `#[filter(kind = ...)]`.

use crate::value::Value;

/// One option of a choice field.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    /// The key submitted in queries.
    pub key: String,
    /// The label shown to users.
    pub label: String,
    /// The value stored in the field.
    pub value: Value,
}

impl Choice {
    /// A choice whose stored value is its key.
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            value: Value::Str(key.clone()),
            key,
            label: label.into(),
        }
    }

    /// A choice stored as an integer, such as a related row's primary key.
    pub fn int(id: i64, label: impl Into<String>) -> Self {
        Self {
            key: id.to_string(),
            label: label.into(),
            value: Value::Int(id),
        }
    }
}

/// The storage type of a field, as far as filtering is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Float,
    Boolean,
    Date,
    DateTime,
    /// A reference to another entity, named by `target`.
    Relation {
        target: String,
    },
    Other,
}

/// One field of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    /// The human readable name of the field.
    pub label: String,
    /// Whether the field may be left blank, which adds "empty" and
    /// "filled" operators to its filter.
    pub nullable: bool,
    pub kind: FieldKind,
    /// An enumerated set of values, if the field has one.
    pub choices: Option<Vec<Choice>>,
}

impl FieldDescriptor {
    /// Create a descriptor whose label is derived from its name, by
    /// replacing underscores with spaces.
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: name.replace('_', " "),
            nullable: false,
            kind,
            choices: None,
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = Some(choices);
        self
    }
}

/// The ordered list of a model's fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub fields: Vec<FieldDescriptor>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A type which can describe its fields.
pub trait Model {
    fn schema() -> Schema;
}
