use super::provider::{build_body, error_for_status, into_completion};
use super::types::ChatResponse;
use super::*;
use crate::backend::client::{BackendClient, BackendFactory};
use crate::completion::CompletionRequest;
use crate::error::Error;
use crate::message::Message;
use reqwest::StatusCode;
use std::time::Duration;

fn response(json: &str) -> ChatResponse {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_config_base_url_selection() {
    assert_eq!(OpenAiCompatibleConfig::new("openai").base_url, DEFAULT_BASE_URL);
    assert_eq!(
        OpenAiCompatibleConfig::new("openrouter").base_url,
        "https://openrouter.ai/api/v1"
    );

    let config = OpenAiCompatibleConfig::new("local")
        .with_base_url("http://localhost:8080/v1/")
        .with_timeout(Duration::from_secs(5));
    assert_eq!(config.base_url, "http://localhost:8080/v1");
    assert_eq!(config.timeout, Duration::from_secs(5));
}

#[test]
fn test_body_carries_parameters_and_extra_fields() {
    let mut request = CompletionRequest::new("gpt-4o")
        .with_message(Message::system("plan carefully"))
        .with_message(Message::user("refactor the parser"))
        .with_max_tokens(512)
        .with_temperature(0.2);
    request.top_p = Some(0.9);
    request
        .extra
        .insert("reasoning_effort".to_string(), serde_json::json!("high"));

    let body = serde_json::to_value(build_body("ignored", request)).unwrap();
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["max_tokens"], 512);
    assert_eq!(body["reasoning_effort"], "high");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "refactor the parser");
    assert!(body.get("stop").is_none());
}

#[test]
fn test_body_falls_back_to_client_model() {
    let body = build_body("bound-model", CompletionRequest::default());
    assert_eq!(body.model, "bound-model");
}

#[test]
fn test_status_mapping() {
    assert!(matches!(
        error_for_status(StatusCode::TOO_MANY_REQUESTS, ""),
        Error::RateLimit
    ));
    assert!(matches!(
        error_for_status(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Incorrect API key provided"}}"#
        ),
        Error::Auth(_)
    ));

    let err = error_for_status(
        StatusCode::BAD_REQUEST,
        r#"{"error":{"message":"context too long"}}"#,
    );
    match err {
        Error::Api(message) => assert_eq!(message, "400: context too long"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_completion_mapping() {
    let completion = into_completion(response(
        r#"{
            "model": "gpt-4o",
            "choices": [{"message": {"role": "assistant", "content": "1. do it"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
        }"#,
    ))
    .unwrap();
    assert_eq!(completion.content, "1. do it");
    assert_eq!(completion.usage.unwrap().total_tokens, 14);
}

#[test]
fn test_content_filter_is_an_error() {
    let result = into_completion(response(
        r#"{"choices": [{"message": {"role": "assistant", "content": null}, "finish_reason": "content_filter"}]}"#,
    ));
    assert!(matches!(result, Err(Error::ContentFiltered(_))));
}

#[test]
fn test_empty_choices_is_invalid() {
    let result = into_completion(response(r#"{"choices": []}"#));
    assert!(matches!(result, Err(Error::InvalidResponse(_))));
}

#[test]
fn test_factory_requires_key() {
    let factory = OpenAiCompatibleFactory::new(OpenAiCompatibleConfig::new("openai"));
    assert!(matches!(
        factory.create("  ", "gpt-4o"),
        Err(Error::NotConfigured(_))
    ));

    let client = factory.create("sk-test-1234567890", "gpt-4o").unwrap();
    assert_eq!(client.provider(), "openai");
    assert_eq!(client.model_id(), "gpt-4o");
}
