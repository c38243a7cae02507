//! Consuming a surface over HTTP with the UI host.

mod fixtures;

use fixtures::sse_response;
use relay_kit::a2ui::{HostError, ProcessorEvent, RenderNode, UiHost, UserAction};
use serde_json::{Map, json};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn surface_stream() -> String {
    let frames = [
        json!({"surfaceUpdate": {"surfaceId": "main", "components": [
            {"id": "root", "component": {"Column": {"children": {"explicitList": ["title", "weather"]}}}},
            {"id": "title", "component": {"Text": {"text": {"literalString": "Trip planner"}}}},
            {"id": "weather", "component": {"Card": {"title": {"literalString": "Weather"}, "body": {"path": "/weather/temp_text"}}}}
        ]}}),
        json!({"dataModelUpdate": {"surfaceId": "main", "path": "/weather", "contents": [
            {"key": "temp_text", "valueString": ""}
        ]}}),
        json!({"beginRendering": {"surfaceId": "main", "root": "root"}}),
        json!({"dataModelUpdate": {"surfaceId": "main", "path": "/weather", "contents": [
            {"key": "temp_text", "valueString": "18 ~ 24 °C"}
        ]}}),
    ];

    let mut body = String::from(":\n\n");
    for frame in frames {
        body.push_str(&format!("data: {frame}\n\n"));
    }
    body
}

#[tokio::test]
async fn test_host_renders_surface() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ui/stream"))
        .and(query_param("surfaceId", "main"))
        .respond_with(sse_response(&surface_stream()))
        .mount(&server)
        .await;

    let mut host = UiHost::connect(&server.uri(), "main").await.unwrap();

    let mut batches = Vec::new();
    while let Some(events) = host.next_events().await.unwrap() {
        batches.push(events);
    }

    assert_eq!(batches.len(), 4);
    assert!(!host.is_connected());
    assert!(batches[2].iter().any(|e| matches!(e, ProcessorEvent::SurfaceCreated(_))));

    let tree = host.processor().tree().unwrap();
    assert!(matches!(
        tree.find("weather"),
        Some(RenderNode::Card { body, .. }) if body == "18 ~ 24 °C"
    ));
}

#[tokio::test]
async fn test_send_action_posts_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ui/stream"))
        .respond_with(sse_response(":\n\n"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ui/event"))
        .and(body_json(json!({"userAction": {
            "surfaceId": "main",
            "name": "submit",
            "context": {"query": "Tokyo"}
        }})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let host = UiHost::connect(&server.uri(), "main").await.unwrap();
    let mut context = Map::new();
    context.insert("query".to_string(), json!("Tokyo"));

    host.send_action(&UserAction {
        surface_id: "main".to_string(),
        name: "submit".to_string(),
        context,
        component_id: None,
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_send_action_without_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ui/stream"))
        .respond_with(sse_response(":\n\n"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ui/event"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({"error": "No active stream for surfaceId"})),
        )
        .mount(&server)
        .await;

    let host = UiHost::connect(&server.uri(), "main").await.unwrap();
    let err = host
        .send_action(&UserAction {
            surface_id: "main".to_string(),
            name: "submit".to_string(),
            context: Map::new(),
            component_id: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, HostError::NoActiveStream(surface) if surface == "main"));
}

#[tokio::test]
async fn test_flush_actions_posts_clicks_in_order() {
    let form = [
        json!({"surfaceUpdate": {"surfaceId": "main", "components": [
            {"id": "root", "component": {"Row": {"children": {"explicitList": ["query", "go"]}}}},
            {"id": "query", "component": {"TextField": {"text": {"path": "/form/query"}}}},
            {"id": "go", "component": {"Button": {
                "label": {"literalString": "Plan"},
                "action": {"name": "submit", "context": [{"key": "query", "value": {"path": "/form/query"}}]}
            }}}
        ]}}),
        json!({"beginRendering": {"surfaceId": "main", "root": "root"}}),
    ];
    let mut body = String::from(":\n\n");
    for frame in form {
        body.push_str(&format!("data: {frame}\n\n"));
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ui/stream"))
        .respond_with(sse_response(&body))
        .mount(&server)
        .await;
    for query in ["Tokyo", "Osaka"] {
        Mock::given(method("POST"))
            .and(path("/ui/event"))
            .and(body_json(json!({"userAction": {
                "surfaceId": "main",
                "name": "submit",
                "context": {"query": query},
                "componentId": "go"
            }})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut host = UiHost::connect(&server.uri(), "main").await.unwrap();
    while host.next_events().await.unwrap().is_some() {}

    for query in ["Tokyo", "Osaka"] {
        let processor = host.processor_mut();
        processor.input_text("query", query).unwrap();
        processor.click("go").unwrap();
    }

    assert_eq!(host.flush_actions().await.unwrap(), 2);
    assert_eq!(host.flush_actions().await.unwrap(), 0);
}
