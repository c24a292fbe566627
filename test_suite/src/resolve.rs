#![cfg(test)]

use chrono::{NaiveDate, NaiveDateTime};
use ww_filters::filters::Filter;
use ww_filters::schema::Choice;
use ww_filters::{
    check_filter_form_valid, FilterCollection, Model, ModelOptions, Params, QuerySet, Record,
};

#[derive(Clone, Debug, Model, Record)]
struct Person {
    name: String,
    nickname: Option<String>,
    age: i32,
    born: NaiveDate,
    seen: Option<NaiveDateTime>,
    #[filter(relation = "Team")]
    team: i64,
    active: bool,
}

fn people() -> Vec<Person> {
    let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
    vec![
        Person {
            name: "Alice".to_string(),
            nickname: Some("Al".to_string()),
            age: 34,
            born: d(1988, 2, 1),
            seen: Some(d(2021, 6, 15).and_hms_opt(0, 0, 0).unwrap()),
            team: 1,
            active: true,
        },
        Person {
            name: "Bob".to_string(),
            nickname: None,
            age: 30,
            born: d(1992, 7, 9),
            seen: Some(d(2021, 6, 15).and_hms_micro_opt(23, 59, 59, 999_999).unwrap()),
            team: 2,
            active: false,
        },
        Person {
            name: "Carol".to_string(),
            nickname: Some(String::new()),
            age: 51,
            born: d(1971, 1, 30),
            seen: Some(d(2021, 6, 16).and_hms_opt(0, 0, 0).unwrap()),
            team: 1,
            active: true,
        },
        Person {
            name: "alan".to_string(),
            nickname: Some("Big Al".to_string()),
            age: 12,
            born: d(2021, 6, 15),
            seen: None,
            team: 2,
            active: false,
        },
    ]
}

fn collection() -> FilterCollection {
    FilterCollection::for_model::<Person>(
        ModelOptions::new()
            .relation_choices("team", vec![Choice::int(1, "Red"), Choice::int(2, "Blue")]),
    )
    .unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 6, 15).unwrap()
}

fn run(query: &str) -> (Vec<String>, Vec<String>) {
    let fc = collection();
    let data = Params::parse(query);
    let resolved = fc
        .resolve_at(QuerySet::all(), Some(&data), None, today())
        .unwrap();
    let mut rows = people();
    resolved.query.filter_vec(&mut rows);
    (
        rows.into_iter().map(|p| p.name).collect(),
        resolved
            .resolution
            .errors()
            .into_iter()
            .map(str::to_string)
            .collect(),
    )
}

#[test_log::test]
fn default_filters() {
    let fc = collection();
    assert_eq!(
        fc.names(),
        ["name", "nickname", "age", "born", "seen", "team", "active"]
    );
    let keys = |name: &str| {
        fc.get(name)
            .unwrap()
            .updaters()
            .keys()
            .cloned()
            .collect::<Vec<_>>()
    };
    assert_eq!(
        keys("nickname"),
        ["equal", "starts_with", "ends_with", "contains", "empty", "not_empty"]
    );
    assert_eq!(keys("seen"), ["today", "equal", "range", "empty", "not_empty"]);
    assert_eq!(keys("team"), ["choice_equal"]);
    assert_eq!(keys("active"), ["true", "false"]);
}

#[test_log::test]
fn no_data_is_identity() {
    let fc = collection();
    let resolved = fc.resolve(QuerySet::all(), None, None).unwrap();
    assert_eq!(resolved.query, QuerySet::all());

    let (rows, errors) = run("");
    assert_eq!(rows.len(), 4);
    assert!(errors.is_empty());
}

#[test_log::test]
fn text_operators() {
    assert_eq!(
        run("name_filter=starts_with&name_filter_starts_with_0_value=al").0,
        ["Alice", "alan"]
    );
    assert_eq!(
        run("name_filter=ends_with&name_filter_ends_with_0_value=OL").0,
        ["Carol"]
    );
    assert_eq!(
        run("name_filter=equal&name_filter_equal_0_value=Bob").0,
        ["Bob"]
    );

    let (rows, errors) = run("name_filter=contains&name_filter_contains_0_value=");
    assert_eq!(rows.len(), 4);
    assert_eq!(errors, ["name"]);
}

#[test_log::test]
fn integer_operators() {
    assert_eq!(
        run("age_filter=greater_than&age_filter_greater_than_0_value=30").0,
        ["Alice", "Carol"]
    );
    let (rows, errors) = run("age_filter=greater_than&age_filter_greater_than_0_value=thirty");
    assert_eq!(rows.len(), 4);
    assert_eq!(errors, ["age"]);
}

#[test_log::test]
fn today_operators() {
    assert_eq!(run("born_filter=today").0, ["alan"]);
    assert_eq!(run("seen_filter=today").0, ["Alice", "Bob"]);
}

#[test_log::test]
fn date_ranges() {
    assert_eq!(
        run("born_filter=range&born_filter_range_0_start=1971-01-30&born_filter_range_0_end=09.07.1992").0,
        ["Alice", "Bob", "Carol"]
    );
    assert_eq!(
        run("seen_filter=range&seen_filter_range_0_start=2021-06-16&seen_filter_range_0_end=2021-06-16").0,
        ["Carol"]
    );
    assert_eq!(
        run("seen_filter=equal&seen_filter_equal_0_value=06/15/2021").0,
        ["Alice", "Bob"]
    );
}

#[test_log::test]
fn empty_and_filled() {
    assert_eq!(run("nickname_filter=empty").0, ["Bob", "Carol"]);
    assert_eq!(run("nickname_filter=not_empty").0, ["Alice", "alan"]);
    assert_eq!(run("seen_filter=empty").0, ["alan"]);
    assert_eq!(run("seen_filter=not_empty").0, ["Alice", "Bob", "Carol"]);
}

#[test_log::test]
fn choices_and_booleans() {
    assert_eq!(
        run("team_filter=choice_equal&team_filter_choice_equal_0_value=2").0,
        ["Bob", "alan"]
    );
    let (rows, errors) = run("team_filter=choice_equal&team_filter_choice_equal_0_value=3");
    assert_eq!(rows.len(), 4);
    assert_eq!(errors, ["team"]);

    assert_eq!(run("active_filter=false").0, ["Bob", "alan"]);
}

#[test_log::test]
fn filters_combine() {
    assert_eq!(
        run("active_filter=true&age_filter=less_than&age_filter_less_than_0_value=40").0,
        ["Alice"]
    );
}

#[test_log::test]
fn initial_data() {
    let fc = collection();
    let initial = Params::new()
        .with("active_filter", "true")
        .with("age_filter", "less_than");
    let resolved = fc
        .resolve_at(QuerySet::all(), None, Some(&initial), today())
        .unwrap();
    assert!(!resolved.resolution.has_errors());
    let mut rows = people();
    resolved.query.filter_vec(&mut rows);
    assert_eq!(rows.len(), 2);
}

#[test_log::test]
fn one_failure_rejects_all() {
    let fc = collection();
    let data = "?name_filter=contains&name_filter_contains_0_value=a\
                &age_filter=equal&age_filter_equal_0_value=x\
                &born_filter=today\
                &active_filter=true\
                &team_filter=choice_equal&team_filter_choice_equal_0_value=1";
    let err = check_filter_form_valid(&fc, data).unwrap_err();
    assert_eq!(err.to_string(), "invalid input for filters: age");

    let data = data.replace("age_filter_equal_0_value=x", "age_filter_equal_0_value=5");
    assert!(check_filter_form_valid(&fc, &data).is_ok());
}

#[test_log::test]
fn explicit_order() {
    let fc = FilterCollection::for_model::<Person>(
        ModelOptions::new()
            .fields(&["name", "age", "born"])
            .order(&["born", "name"]),
    )
    .unwrap();
    assert_eq!(fc.names(), ["born", "name", "age"]);

    let fc = FilterCollection::for_model::<Person>(
        ModelOptions::new()
            .exclude(&["team"])
            .filter("name", Filter::string("Full name"))
            .filter("anything", Filter::boolean("Anything")),
    )
    .unwrap();
    assert_eq!(
        fc.names(),
        ["name", "nickname", "age", "born", "seen", "active", "anything"]
    );
    assert_eq!(fc.get("name").unwrap().title(), "Full name");
}
