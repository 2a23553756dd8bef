//! End-to-end lifecycle of `putio_rss_feed` against a mock put.io.

use hemmer_provider_putio::rss_feed::RSS_FEED;
use hemmer_provider_putio::testing::{
    assert_plan_creates, assert_plan_no_changes, assert_planned_value, ProviderTester, TestError,
};
use hemmer_provider_putio::{ProviderError, PutioProvider};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_string, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn minimal_config() -> Value {
    json!({
        "title": "one",
        "rss_source_url": "https://google.fr",
        "keyword": "foo"
    })
}

fn feed_response(id: u64, feed: Value) -> ResponseTemplate {
    let mut feed = feed;
    feed["id"] = json!(id);
    ResponseTemplate::new(200).set_body_json(json!({ "feed": feed, "status": "OK" }))
}

fn put_io_error(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "error_type": "ERROR",
        "error_message": message,
        "status_code": status
    }))
}

async fn mount_token_check(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/v2/oauth2/validate"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": "OK", "user_id": 1})),
        )
        .mount(server)
        .await;
}

async fn configured_tester(server: &MockServer) -> ProviderTester<PutioProvider> {
    mount_token_check(server, TOKEN).await;

    let tester = ProviderTester::new(PutioProvider::with_env(|_| None));
    assert_ok!(
        tester
            .configure(json!({"oauth_token": TOKEN, "base_url": server.uri()}))
            .await
    );
    tester
}

/// The feed put.io stores for `minimal_config()`.
fn stored_minimal_feed() -> Value {
    json!({
        "title": "one",
        "rss_source_url": "https://google.fr",
        "parent_dir_id": 0,
        "delete_old_files": false,
        "keyword": "foo",
        "unwanted_keywords": "",
        "paused": false
    })
}

#[tokio::test]
async fn test_defaults_fill_unset_attributes() {
    let server = MockServer::start().await;
    let tester = configured_tester(&server).await;

    Mock::given(method("POST"))
        .and(path("/v2/rss/create"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string(
            "title=one&rss_source_url=https%3A%2F%2Fgoogle.fr&parent_dir_id=0\
             &delete_old_files=false&dont_process_whole_feed=false&keyword=foo\
             &unwanted_keywords=&paused=false",
        ))
        .respond_with(feed_response(1234, stored_minimal_feed()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/rss/1234"))
        .respond_with(feed_response(1234, stored_minimal_feed()))
        .mount(&server)
        .await;

    let plan = tester.plan_create(RSS_FEED, minimal_config()).await.unwrap();
    assert_plan_creates(&plan);
    assert_planned_value(&plan, "parent_dir_id", &json!(0));
    assert_planned_value(&plan, "delete_old_files", &json!(false));
    assert_planned_value(&plan, "unwanted_keywords", &json!(""));
    assert_planned_value(&plan, "paused", &json!(false));

    let state = tester
        .lifecycle_create(RSS_FEED, minimal_config())
        .await
        .unwrap();
    assert_eq!(
        state,
        json!({
            "id": "1234",
            "title": "one",
            "rss_source_url": "https://google.fr",
            "parent_dir_id": 0,
            "delete_old_files": false,
            "keyword": "foo",
            "unwanted_keywords": "",
            "paused": false
        })
    );
}

#[tokio::test]
async fn test_configured_values_reach_put_io() {
    let server = MockServer::start().await;
    let tester = configured_tester(&server).await;

    let mut config = minimal_config();
    config["parent_dir_id"] = json!(42);
    config["delete_old_files"] = json!(true);
    config["unwanted_keywords"] = json!("cam,ts");
    config["paused"] = json!(true);

    let mut stored = stored_minimal_feed();
    stored["parent_dir_id"] = json!(42);
    stored["delete_old_files"] = json!(true);
    stored["unwanted_keywords"] = json!("cam,ts");
    stored["paused"] = json!(true);

    Mock::given(method("POST"))
        .and(path("/v2/rss/create"))
        .and(body_string_contains("parent_dir_id=42"))
        .and(body_string_contains("delete_old_files=true"))
        .and(body_string_contains("unwanted_keywords=cam%2Cts"))
        .and(body_string_contains("paused=true"))
        .respond_with(feed_response(7, stored))
        .expect(1)
        .mount(&server)
        .await;

    let plan = tester.plan_create(RSS_FEED, config).await.unwrap();
    assert_planned_value(&plan, "parent_dir_id", &json!(42));
    assert_planned_value(&plan, "paused", &json!(true));

    let state = tester.create(RSS_FEED, plan.planned_state).await.unwrap();
    assert_eq!(state["id"], "7");
    assert_eq!(state["unwanted_keywords"], "cam,ts");
}

#[tokio::test]
async fn test_put_io_values_win_over_plan() {
    let server = MockServer::start().await;
    let tester = configured_tester(&server).await;

    // put.io files the feed under a folder of its own choosing.
    let mut stored = stored_minimal_feed();
    stored["parent_dir_id"] = json!(555);
    Mock::given(method("POST"))
        .and(path("/v2/rss/create"))
        .respond_with(feed_response(3, stored))
        .mount(&server)
        .await;

    let plan = tester.plan_create(RSS_FEED, minimal_config()).await.unwrap();
    let state = tester.create(RSS_FEED, plan.planned_state).await.unwrap();
    assert_eq!(state["parent_dir_id"], 555);

    // The next plan keeps put.io's folder instead of reverting to the default.
    let plan = tester
        .plan_update(RSS_FEED, state, minimal_config())
        .await
        .unwrap();
    assert_plan_no_changes(&plan);
}

#[tokio::test]
async fn test_import_matches_create() {
    let server = MockServer::start().await;
    let tester = configured_tester(&server).await;

    Mock::given(method("POST"))
        .and(path("/v2/rss/create"))
        .respond_with(feed_response(1234, stored_minimal_feed()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/rss/1234"))
        .respond_with(feed_response(1234, stored_minimal_feed()))
        .mount(&server)
        .await;

    let created = tester
        .lifecycle_create(RSS_FEED, minimal_config())
        .await
        .unwrap();

    let imported = tester.import_resource(RSS_FEED, "1234").await.unwrap();
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].resource_type, RSS_FEED);
    assert_eq!(imported[0].state, created);

    let reread = tester.lifecycle_import(RSS_FEED, "1234").await.unwrap();
    assert_eq!(reread, created);
}

#[tokio::test]
async fn test_update_does_not_call_put_io() {
    let server = MockServer::start().await;
    let tester = configured_tester(&server).await;

    let prior = json!({
        "id": "1234",
        "title": "one",
        "rss_source_url": "https://google.fr",
        "parent_dir_id": 0,
        "delete_old_files": false,
        "keyword": "foo",
        "unwanted_keywords": "",
        "paused": false
    });
    let mut config = minimal_config();
    config["title"] = json!("two");
    config["paused"] = json!(true);

    let plan = tester
        .plan_update(RSS_FEED, prior.clone(), config)
        .await
        .unwrap();
    let state = tester
        .update(RSS_FEED, prior, plan.planned_state.clone())
        .await
        .unwrap();
    assert_eq!(state, plan.planned_state);
    assert_eq!(state["id"], "1234");
    assert_eq!(state["title"], "two");

    // Only the token check from configure reached the server.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/v2/oauth2/validate");
}

#[tokio::test]
async fn test_delete() {
    let server = MockServer::start().await;
    let tester = configured_tester(&server).await;

    Mock::given(method("POST"))
        .and(path("/v2/rss/1234/delete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK"})))
        .expect(1)
        .mount(&server)
        .await;

    let state = json!({"id": "1234", "title": "one"});
    assert_ok!(tester.lifecycle_delete(RSS_FEED, state).await);
}

#[tokio::test]
async fn test_delete_nonexistent_feed_fails() {
    let server = MockServer::start().await;
    let tester = configured_tester(&server).await;

    Mock::given(method("POST"))
        .and(path("/v2/rss/999/delete"))
        .respond_with(put_io_error(404, "RSS feed not found"))
        .mount(&server)
        .await;

    let err = assert_err!(tester.delete(RSS_FEED, json!({"id": "999"})).await);
    assert!(matches!(err, ProviderError::Client { .. }));

    let diagnostic = err.to_diagnostic();
    assert_eq!(diagnostic.summary, "Client Error");
    let detail = diagnostic.detail.unwrap();
    assert!(detail.starts_with("Unable to delete rss feed, got error:"));
    assert!(detail.contains("RSS feed not found"));
}

#[tokio::test]
async fn test_read_of_missing_feed_fails() {
    let server = MockServer::start().await;
    let tester = configured_tester(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/rss/404"))
        .respond_with(put_io_error(404, "RSS feed not found"))
        .mount(&server)
        .await;

    let err = assert_err!(tester.read(RSS_FEED, json!({"id": "404"})).await);
    assert!(err.to_string().contains("Unable to read rss feed"));

    let err = assert_err!(tester.import_resource(RSS_FEED, "404").await);
    assert!(err.to_string().contains("HTTP 404"));
}

#[tokio::test]
async fn test_create_rejected_by_put_io() {
    let server = MockServer::start().await;
    let tester = configured_tester(&server).await;

    Mock::given(method("POST"))
        .and(path("/v2/rss/create"))
        .respond_with(put_io_error(400, "Invalid RSS source URL"))
        .expect(1)
        .mount(&server)
        .await;

    let plan = tester.plan_create(RSS_FEED, minimal_config()).await.unwrap();
    let err = assert_err!(tester.create(RSS_FEED, plan.planned_state).await);
    assert_eq!(err.category(), "Client Error");
    assert!(err.to_string().contains("Invalid RSS source URL"));
}

#[tokio::test]
async fn test_token_from_environment() {
    let server = MockServer::start().await;
    mount_token_check(&server, "env-token").await;

    let tester = ProviderTester::new(PutioProvider::with_env(|key| {
        (key == "PUTIO_OAUTH_TOKEN").then(|| "env-token".to_string())
    }));
    assert_ok!(tester.configure(json!({"base_url": server.uri()})).await);
}

#[tokio::test]
async fn test_empty_token_is_rejected() {
    let tester = ProviderTester::new(PutioProvider::with_env(|_| None));

    match tester.configure(json!({"oauth_token": ""})).await {
        Err(TestError::Provider(err)) => {
            let diagnostic = err.to_diagnostic();
            assert_eq!(diagnostic.summary, "Unable to find put.io token");
            assert_eq!(
                diagnostic.detail.as_deref(),
                Some("Cannot use token as an empty string")
            );
        }
        other => panic!("unexpected configure result: {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_token_fails_configure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/oauth2/validate"))
        .respond_with(put_io_error(401, "invalid_grant"))
        .expect(1)
        .mount(&server)
        .await;

    let tester = ProviderTester::new(PutioProvider::with_env(|_| None));
    let err = assert_err!(
        tester
            .configure(json!({"oauth_token": "revoked", "base_url": server.uri()}))
            .await
    );
    assert!(err.to_string().contains("Unable to create put.io client"));

    // Still unconfigured.
    let err = assert_err!(tester.read(RSS_FEED, json!({"id": "1"})).await);
    assert!(matches!(err, ProviderError::NotConfigured(_)));
}

#[tokio::test]
async fn test_invalid_configs_are_reported() {
    let tester = ProviderTester::new(PutioProvider::with_env(|_| None));

    assert_ok!(tester.validate_provider_config(json!({"oauth_token": "t"})).await);
    assert_err!(tester.validate_provider_config(json!({"oauth_token": 1})).await);

    assert_ok!(tester.validate_resource_config(RSS_FEED, minimal_config()).await);
    match tester
        .validate_resource_config(RSS_FEED, json!({"title": "one", "paused": "yes"}))
        .await
    {
        Err(TestError::Diagnostics(diagnostics)) => assert_eq!(diagnostics.len(), 3),
        other => panic!("unexpected validation result: {:?}", other),
    }
}

#[tokio::test]
async fn test_import_rejects_non_digit_id() {
    let server = MockServer::start().await;
    let tester = configured_tester(&server).await;

    for id in ["+5", "5 ", "-1"] {
        let err = assert_err!(tester.import_resource(RSS_FEED, id).await);
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}
