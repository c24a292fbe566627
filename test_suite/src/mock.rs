#![cfg(test)]

use std::sync::{Arc, Mutex};

use ww_filters::mock::SavedFilterEndpoint;
use ww_filters::saved::{FilterRegistry, MemoryStore, SavedFilterStore, SavedFilters};
use ww_filters::{Filter, FilterCollection};

fn registry() -> FilterRegistry {
    let people = FilterCollection::builder()
        .filter("name", Filter::string("Name"))
        .filter("age", Filter::integer("Age"))
        .build()
        .unwrap();
    FilterRegistry::new().register("people", people)
}

async fn serve() -> (wiremock::MockServer, Arc<Mutex<SavedFilters<MemoryStore>>>) {
    let server = wiremock::MockServer::start().await;
    let endpoint = SavedFilterEndpoint::new(registry()).unwrap();
    let store = endpoint.store();

    wiremock::Mock::given(wiremock::matchers::any())
        .respond_with(endpoint)
        .mount(&server)
        .await;

    (server, store)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn save_url(server: &wiremock::MockServer, params: &[(&str, &str)]) -> reqwest::Url {
    reqwest::Url::parse_with_params(&format!("{}/save/", server.uri()), params).unwrap()
}

#[test_log::test(tokio::test)]
async fn save_and_delete() {
    let (server, store) = serve().await;
    let client = client();

    let res = client
        .get(save_url(
            &server,
            &[
                ("user", "4"),
                ("name", "Adults"),
                ("data", "?age_filter=greater_than&age_filter_greater_than_0_value=17"),
                ("source", "/people/?page=3"),
                ("type", "people"),
            ],
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");

    let saved = store.lock().unwrap().list(4, "people");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].name, "Adults");

    let res = client
        .get(format!("{}/list/?user=4&type=people", server.uri()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body[0]["id"], saved[0].id);
    assert_eq!(body[0]["source"], "/people/?page=3");

    let res = client
        .post(format!("{}/delete/{}/", server.uri(), saved[0].id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 302);
    assert_eq!(res.headers()["location"], "/people/?page=3");
    assert!(store.lock().unwrap().store().is_empty());

    let res = client
        .post(format!("{}/delete/{}/", server.uri(), saved[0].id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[test_log::test(tokio::test)]
async fn invalid_selection() {
    let (server, store) = serve().await;

    let res = client()
        .get(save_url(
            &server,
            &[
                ("user", "4"),
                ("name", "Broken"),
                ("data", "?name_filter=equal&age_filter=equal&age_filter_equal_0_value=1"),
                ("source", "/people/"),
                ("type", "people"),
            ],
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "error");
    assert!(store.lock().unwrap().store().is_empty());
}

#[test_log::test(tokio::test)]
async fn form_body() {
    let (server, store) = serve().await;

    let res = client()
        .post(format!("{}/save/", server.uri()))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("user=9&name=Everyone&data=&source=%2Fpeople%2F&type=people")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");
    assert_eq!(store.lock().unwrap().store().list(9, "people").len(), 1);
}

#[test_log::test(tokio::test)]
async fn bad_requests() {
    let (server, store) = serve().await;
    let client = client();

    let missing = client
        .get(save_url(&server, &[("user", "4"), ("name", "x"), ("type", "people")]))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 400);

    let unknown = client
        .get(save_url(
            &server,
            &[
                ("user", "4"),
                ("name", "x"),
                ("data", ""),
                ("source", "/"),
                ("type", "planets"),
            ],
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 400);
    assert_eq!(
        unknown.text().await.unwrap(),
        "no filters are registered for type 'planets'"
    );

    let nowhere = client
        .get(format!("{}/elsewhere/", server.uri()))
        .send()
        .await
        .unwrap();
    assert_eq!(nowhere.status(), 404);

    let huge = client
        .post(format!("{}/delete/{}0/", server.uri(), u64::MAX))
        .send()
        .await
        .unwrap();
    assert_eq!(huge.status(), 404);

    assert!(store.lock().unwrap().store().is_empty());
}
