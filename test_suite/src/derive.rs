#![cfg(test)]

use chrono::{NaiveDate, NaiveDateTime, Utc};
use ww_filters::schema::{Choice, FieldDescriptor, FieldKind};
use ww_filters::{Model, Record, Value};

fn statuses() -> Vec<Choice> {
    vec![Choice::new("o", "Open"), Choice::new("c", "Closed")]
}

#[derive(Model, Record)]
struct Ticket {
    title: String,
    priority: u8,
    estimate: Option<f64>,
    urgent: bool,
    due: Option<NaiveDate>,
    created: NaiveDateTime,
    closed: Option<chrono::DateTime<Utc>>,
    #[filter(relation = "User", nullable)]
    assignee: i64,
    #[filter(choices = statuses, label = "Status")]
    state: String,
    #[filter(rename = "cost", kind = decimal)]
    price_cents: i64,
    #[filter(exclude)]
    #[allow(dead_code)]
    secret: Vec<u8>,
}

#[derive(Model)]
#[allow(dead_code)]
struct Borrowed<'a> {
    name: &'a str,
    tags: Vec<String>,
    #[filter(kind = other)]
    score: i32,
}

#[test_log::test]
fn schema() {
    let schema = Ticket::schema();
    let names = schema.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>();
    assert_eq!(
        names,
        [
            "title", "priority", "estimate", "urgent", "due", "created", "closed", "assignee",
            "state", "cost"
        ]
    );

    assert_eq!(
        schema.field("title"),
        Some(&FieldDescriptor::new("title", FieldKind::Text))
    );
    assert_eq!(
        schema.field("estimate"),
        Some(&FieldDescriptor::new("estimate", FieldKind::Float).nullable(true))
    );
    assert_eq!(schema.field("priority").unwrap().kind, FieldKind::Integer);
    assert_eq!(schema.field("urgent").unwrap().kind, FieldKind::Boolean);
    assert_eq!(schema.field("due").unwrap().kind, FieldKind::Date);
    assert!(schema.field("due").unwrap().nullable);
    assert_eq!(schema.field("created").unwrap().kind, FieldKind::DateTime);
    assert_eq!(schema.field("closed").unwrap().kind, FieldKind::DateTime);
    assert_eq!(
        schema.field("assignee"),
        Some(
            &FieldDescriptor::new(
                "assignee",
                FieldKind::Relation {
                    target: "User".to_string()
                }
            )
            .nullable(true)
        )
    );
    assert_eq!(
        schema.field("state"),
        Some(
            &FieldDescriptor::new("state", FieldKind::Text)
                .label("Status")
                .choices(statuses())
        )
    );
    assert_eq!(schema.field("cost").unwrap().kind, FieldKind::Decimal);
    assert!(schema.field("secret").is_none());
}

#[test_log::test]
fn schema_of_borrowed() {
    let schema = Borrowed::schema();
    assert_eq!(schema.field("name").unwrap().kind, FieldKind::Text);
    assert_eq!(schema.field("tags").unwrap().kind, FieldKind::Other);
    assert_eq!(schema.field("score").unwrap().kind, FieldKind::Other);
}

#[test_log::test]
fn record_values() {
    let created = NaiveDate::from_ymd_opt(2022, 3, 4)
        .unwrap()
        .and_hms_opt(5, 6, 7)
        .unwrap();
    let t = Ticket {
        title: "Leak".to_string(),
        priority: 3,
        estimate: None,
        urgent: true,
        due: NaiveDate::from_ymd_opt(2022, 4, 1),
        created,
        closed: None,
        assignee: 12,
        state: "o".to_string(),
        price_cents: 1999,
        secret: vec![1, 2, 3],
    };
    assert_eq!(t.value("title"), Some(Value::from("Leak")));
    assert_eq!(t.value("priority"), Some(Value::Int(3)));
    assert_eq!(t.value("estimate"), Some(Value::Null));
    assert_eq!(t.value("urgent"), Some(Value::Bool(true)));
    assert_eq!(
        t.value("due"),
        Some(Value::Date(NaiveDate::from_ymd_opt(2022, 4, 1).unwrap()))
    );
    assert_eq!(t.value("created"), Some(Value::DateTime(created)));
    assert_eq!(t.value("assignee"), Some(Value::Int(12)));
    assert_eq!(t.value("cost"), Some(Value::Int(1999)));
    assert_eq!(t.value("price_cents"), None);
    assert_eq!(t.value("secret"), None);
}
