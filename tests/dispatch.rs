use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tracing_google_chat::{
    ChatConfig, ChatError, GoogleChatSink, LogRecord, MessageFormatter, RequestContext, Severity,
    StaticConfig,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record() -> LogRecord {
    LogRecord::new(Severity::Critical, "database unreachable")
        .with_formatted("[2024-05-01T10:00:00+00:00] shop.CRITICAL: database unreachable [] []")
        .with_timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        .with_request(RequestContext::new("https://shop.test/orders").with_field("user_id", 42))
}

fn config(webhook: String) -> ChatConfig {
    let mut cfg = ChatConfig::default()
        .with_webhook(webhook.as_str())
        .with_app("shop", "production");
    cfg.notify.default = Some("all".to_string());
    cfg.notify.set(Severity::Critical, "111,222");
    cfg
}

async fn mock_ok(server: &MockServer, route: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn posts_cards_v2_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sink = GoogleChatSink::new(StaticConfig(config(format!("{}/hook", server.uri()))));
    sink.dispatch(&record()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();

    assert_eq!(
        body["text"],
        json!("<users/all> <users/111> <users/222> [2024-05-01T10:00:00+00:00] shop.CRITICAL: database unreachable [] []")
    );
    let card = &body["cardsV2"][0];
    assert_eq!(card["cardId"], json!("info-card-id"));
    assert_eq!(
        card["card"]["header"],
        json!({"title": "Critical: database unreachable", "subtitle": "shop"})
    );

    let section = &card["card"]["sections"];
    assert_eq!(section["header"], json!("Details"));
    assert_eq!(section["collapsible"], json!(true));
    assert_eq!(section["uncollapsibleWidgetsCount"], json!(3));

    let widgets: Vec<(&str, &str)> = section["widgets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| {
            (
                w["decoratedText"]["startIcon"]["knownIcon"].as_str().unwrap(),
                w["decoratedText"]["text"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        widgets,
        vec![
            ("BOOKMARK", "Production [Env]"),
            ("TICKET", "<font color='#ff1100'>Critical</font>"),
            ("CLOCK", "2024-05-01T10:00:00.000000+00:00"),
            ("BUS", "https://shop.test/orders"),
        ]
    );
}

#[tokio::test]
async fn fans_out_to_every_target() {
    let server = MockServer::start().await;
    mock_ok(&server, "/a", 1).await;
    mock_ok(&server, "/b", 1).await;

    let targets = format!("{0}/a , {0}/b", server.uri());
    let sink = GoogleChatSink::new(StaticConfig(config(targets)));
    sink.dispatch(&record()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url.path(), "/a");
    assert_eq!(requests[1].url.path(), "/b");
    assert_eq!(requests[0].body, requests[1].body);
}

#[tokio::test]
async fn first_failure_stops_the_fan_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;
    mock_ok(&server, "/b", 0).await;

    let targets = format!("{0}/a,{0}/b", server.uri());
    let sink = GoogleChatSink::new(StaticConfig(config(targets)));
    let err = sink.dispatch(&record()).await.unwrap_err();

    match err {
        ChatError::Status { status, body, url } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
            assert!(url.ends_with("/a"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_webhook_makes_no_requests() {
    let server = MockServer::start().await;
    mock_ok(&server, "/hook", 0).await;

    let sink = GoogleChatSink::new(StaticConfig(ChatConfig::default()));
    let err = sink.dispatch(&record()).await.unwrap_err();

    assert!(matches!(err, ChatError::Configuration));
    assert_eq!(err.to_string(), "webhook url is not configured");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn hook_fields_are_appended_after_url() {
    let server = MockServer::start().await;
    mock_ok(&server, "/hook", 1).await;

    let formatter = MessageFormatter::new().with_additional_fields(|req: &RequestContext| {
        let user_id = req.fields.get("user_id").cloned().unwrap_or(Value::Null);
        json!({"user_id": user_id, "plan_tier": "gold"})
    });
    let sink = GoogleChatSink::new(StaticConfig(config(format!("{}/hook", server.uri()))))
        .with_formatter(formatter);
    sink.dispatch(&record()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    let widgets = body["cardsV2"][0]["card"]["sections"]["widgets"].as_array().unwrap();

    assert_eq!(widgets.len(), 6);
    assert_eq!(widgets[3]["decoratedText"]["startIcon"]["knownIcon"], json!("BUS"));
    assert_eq!(widgets[4]["decoratedText"]["text"], json!("<b>User Id:</b> 42"));
    assert_eq!(widgets[5]["decoratedText"]["text"], json!("<b>Plan Tier:</b> gold"));
    assert_eq!(
        widgets[5]["decoratedText"]["startIcon"]["knownIcon"],
        json!("CONFIRMATION_NUMBER_ICON")
    );
}

#[tokio::test]
async fn invalid_hook_result_aborts_before_sending() {
    let server = MockServer::start().await;
    mock_ok(&server, "/hook", 0).await;

    let formatter = MessageFormatter::new().with_additional_fields(|_: &RequestContext| json!(7));
    let sink = GoogleChatSink::new(StaticConfig(config(format!("{}/hook", server.uri()))))
        .with_formatter(formatter);

    let err = sink.dispatch(&record()).await.unwrap_err();
    assert!(matches!(err, ChatError::InvalidExtensionResult { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn config_is_read_on_every_dispatch() {
    let server = MockServer::start().await;
    mock_ok(&server, "/first", 1).await;
    mock_ok(&server, "/second", 1).await;

    let current = Arc::new(Mutex::new(format!("{}/first", server.uri())));
    let source = {
        let current = Arc::clone(&current);
        move || ChatConfig::default().with_webhook(current.lock().unwrap().as_str())
    };
    let sink = GoogleChatSink::new(source);

    sink.dispatch(&record()).await.unwrap();
    *current.lock().unwrap() = format!("{}/second", server.uri());
    sink.dispatch(&record()).await.unwrap();

    let paths: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(paths, vec!["/first", "/second"]);
}

#[tokio::test]
async fn unreachable_target_is_an_http_error() {
    let sink = GoogleChatSink::new(StaticConfig(config("http://127.0.0.1:1/hook".to_string())));
    let err = sink.dispatch(&record()).await.unwrap_err();
    assert!(matches!(err, ChatError::Http(_)));
}
