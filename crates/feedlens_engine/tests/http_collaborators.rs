mod common;

use std::sync::Arc;
use std::time::Duration;

use common::recorder;
use feedlens_engine::{
    HttpModelLoader, HttpStopwordSource, InferenceSettings, InvokeOptions, ModelError,
    ModelLoader, ModelSpec, ProgressEvent, ResourceBroker, StopwordError, StopwordSettings,
    StopwordSource,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn stopword_source(server: &MockServer) -> HttpStopwordSource {
    HttpStopwordSource::new(&StopwordSettings {
        endpoint: format!("{}/api/v1/stopwords", server.uri()),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn inference_settings(server: &MockServer) -> InferenceSettings {
    InferenceSettings {
        endpoint: server.uri(),
        poll_interval: Duration::from_millis(10),
        load_timeout: Duration::from_secs(5),
        ..InferenceSettings::default()
    }
}

#[tokio::test]
async fn stopwords_accept_a_bare_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/stopwords"))
        .and(query_param("langs", "fr"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["le", "la", "de"])))
        .expect(1)
        .mount(&server)
        .await;

    let words = stopword_source(&server).fetch("fr").await.unwrap();
    assert_eq!(words, vec!["le", "la", "de"]);
}

#[tokio::test]
async fn stopwords_accept_lists_keyed_by_language() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/stopwords"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"fr": ["et", "ou"], "en": ["and"]})),
        )
        .mount(&server)
        .await;

    let words = stopword_source(&server).fetch("fr").await.unwrap();
    assert_eq!(words, vec!["et", "ou"]);
}

#[tokio::test]
async fn stopword_service_errors_are_typed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = stopword_source(&server).fetch("fr").await.unwrap_err();
    assert_eq!(err, StopwordError::HttpStatus(503));
}

#[tokio::test]
async fn stopword_garbage_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let err = stopword_source(&server).fetch("fr").await.unwrap_err();
    assert!(matches!(err, StopwordError::Decode(_)));
}

#[tokio::test]
async fn loader_polls_until_ready_and_reports_progress() {
    let server = MockServer::start().await;
    let model_path = "/models/facebook/bart-large-mnli";
    Mock::given(method("GET"))
        .and(path(model_path))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "downloading", "progress": 42.5})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(model_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ready"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(model_path))
        .and(body_json(json!({
            "inputs": "rust sorti",
            "parameters": {"candidate_labels": ["rust", "sport"], "multi_label": true}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sequence": "rust sorti",
            "labels": ["rust", "sport"],
            "scores": [0.97, 0.03]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let broker = ResourceBroker::new(
        Arc::new(HttpModelLoader::new(inference_settings(&server))),
        ModelSpec::default(),
    );
    let (subscriber, events) = recorder();
    let pipeline = broker.acquire(Some(subscriber)).await.unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec![ProgressEvent::downloading(Some(42.5)), ProgressEvent::ready()]
    );

    let output = pipeline
        .invoke(
            "rust sorti",
            &["rust".to_string(), "sport".to_string()],
            InvokeOptions { multi_label: true },
        )
        .await
        .unwrap();
    assert_eq!(output.labels, vec!["rust", "sport"]);
    assert_eq!(output.scores, vec![0.97, 0.03]);
}

#[tokio::test]
async fn loader_surfaces_server_side_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "error", "message": "out of memory"})),
        )
        .mount(&server)
        .await;

    let (subscriber, _events) = recorder();
    let loader = HttpModelLoader::new(inference_settings(&server));
    let sink = SinkAdapter(subscriber);
    let err = loader.load(&ModelSpec::default(), &sink).await.unwrap_err();

    assert_eq!(err, ModelError::Load("out of memory".to_string()));
}

#[tokio::test]
async fn loader_rejects_other_tasks() {
    let server = MockServer::start().await;
    let loader = HttpModelLoader::new(inference_settings(&server));
    let spec = ModelSpec {
        task: "summarization".to_string(),
        ..ModelSpec::default()
    };
    let (subscriber, _events) = recorder();

    let err = loader.load(&spec, &SinkAdapter(subscriber)).await.unwrap_err();
    assert!(matches!(err, ModelError::Load(_)));
}

struct SinkAdapter(feedlens_engine::ProgressSubscriber);

impl feedlens_engine::ProgressSink for SinkAdapter {
    fn emit(&self, event: ProgressEvent) {
        (self.0)(&event);
    }
}
