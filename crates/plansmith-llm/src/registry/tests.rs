use super::*;
use crate::backend::{BackendClient, BackendFactory, MockFactory};
use std::sync::Arc;

fn mock_factory(id: &str) -> Arc<dyn BackendFactory> {
    Arc::new(MockFactory::new(id))
}

fn float(v: f64) -> ParameterValue {
    ParameterValue::Float(v)
}

#[test]
fn test_resolve_and_names() {
    let registry = Registry::from_config(
        vec![
            ModelDefinition::new("sonnet", "mock", 200_000, 8_192),
            ModelDefinition::new("gpt", "mock", 128_000, 4_096).with_backend_model("gpt-4o"),
        ],
        vec![mock_factory("mock")],
    )
    .unwrap();

    assert_eq!(registry.model_names(), vec!["gpt", "sonnet"]);
    let spec = registry.resolve("gpt").unwrap();
    assert_eq!(spec.backend_model_id, "gpt-4o");
    assert_eq!(spec.context_window_tokens, 128_000);
    assert_eq!(registry.resolve("sonnet").unwrap().backend_model_id, "sonnet");
    assert!(matches!(
        registry.resolve("missing"),
        Err(RegistryError::ModelNotFound(name)) if name == "missing"
    ));
}

#[test]
fn test_unknown_provider_fails_fast() {
    let result = Registry::from_config(
        vec![ModelDefinition::new("a", "nowhere", 1000, 100)],
        vec![mock_factory("mock")],
    );
    assert!(matches!(
        result,
        Err(RegistryError::ProviderNotRegistered { provider, .. }) if provider == "nowhere"
    ));
}

#[test]
fn test_structural_errors() {
    let factories = || vec![mock_factory("mock")];

    let duplicate = Registry::from_config(
        vec![
            ModelDefinition::new("a", "mock", 1000, 100),
            ModelDefinition::new("a", "mock", 2000, 100),
        ],
        factories(),
    );
    assert!(matches!(duplicate, Err(RegistryError::Invalid(_))));

    let zero_window =
        Registry::from_config(vec![ModelDefinition::new("a", "mock", 0, 100)], factories());
    assert!(matches!(zero_window, Err(RegistryError::Invalid(_))));

    let zero_output =
        Registry::from_config(vec![ModelDefinition::new("a", "mock", 1000, 0)], factories());
    assert!(matches!(zero_output, Err(RegistryError::Invalid(_))));

    let empty_name =
        Registry::from_config(vec![ModelDefinition::new(" ", "mock", 1000, 10)], factories());
    assert!(matches!(empty_name, Err(RegistryError::Invalid(_))));

    let twice = Registry::from_config(vec![], vec![mock_factory("mock"), mock_factory("mock")]);
    assert!(matches!(twice, Err(RegistryError::Invalid(_))));
}

#[test]
fn test_parameter_type_mismatch_rejected() {
    let bad_override = ModelDefinition::new("a", "mock", 1000, 100).with_parameter(
        "temperature",
        ParameterSpec::new(ParameterKind::Float, float(0.5))
            .with_override(ParameterValue::Str("hot".into())),
    );
    assert!(matches!(
        Registry::from_config(vec![bad_override], vec![mock_factory("mock")]),
        Err(RegistryError::Invalid(_))
    ));

    let wrong_kind = ModelDefinition::new("a", "mock", 1000, 100).with_parameter(
        "max_tokens",
        ParameterSpec::new(ParameterKind::Float, float(10.0)),
    );
    assert!(matches!(
        Registry::from_config(vec![wrong_kind], vec![mock_factory("mock")]),
        Err(RegistryError::Invalid(_))
    ));
}

#[test]
fn test_create_client_and_backend_init_error() {
    let factory = Arc::new(MockFactory::new("mock"));
    factory.fail_init("broken-backend");
    let registry = Registry::from_config(
        vec![
            ModelDefinition::new("ok", "mock", 1000, 100),
            ModelDefinition::new("broken", "mock", 1000, 100).with_backend_model("broken-backend"),
        ],
        vec![factory.clone() as Arc<dyn BackendFactory>],
    )
    .unwrap();

    let client = registry.create_client("key", "ok").unwrap();
    assert_eq!(client.model_id(), "ok");
    assert_eq!(client.provider(), "mock");

    assert!(matches!(
        registry.create_client("key", "broken"),
        Err(RegistryError::BackendInit { model, .. }) if model == "broken"
    ));
    assert!(matches!(
        registry.create_client("key", "nope"),
        Err(RegistryError::ModelNotFound(_))
    ));
    assert_eq!(factory.created(), 1);
}

#[test]
fn test_build_request_maps_parameters() {
    let spec = ModelDefinition::new("gpt", "mock", 128_000, 4_096)
        .with_backend_model("gpt-4o")
        .with_parameter(
            "temperature",
            ParameterSpec::new(ParameterKind::Float, float(0.7)).with_override(float(0.2)),
        )
        .with_parameter(
            "max_tokens",
            ParameterSpec::new(ParameterKind::Int, ParameterValue::Int(100_000)),
        )
        .with_parameter(
            "reasoning_effort",
            ParameterSpec::new(ParameterKind::String, ParameterValue::Str("high".into())),
        )
        .into_spec();

    let request = spec.build_request("plan it");
    assert_eq!(request.model, "gpt-4o");
    assert_eq!(request.temperature, Some(0.2));
    assert_eq!(request.max_tokens, Some(4_096));
    assert_eq!(request.extra["reasoning_effort"], "high");
    assert_eq!(request.prompt_text(), "plan it");
}

#[test]
fn test_build_request_defaults_max_tokens_to_limit() {
    let spec = ModelDefinition::new("a", "mock", 1000, 256).into_spec();
    let request = spec.build_request("x");
    assert_eq!(request.max_tokens, Some(256));
    assert!(request.temperature.is_none());
    assert!(request.extra.is_empty());
}

#[test]
fn test_definitions_from_toml() {
    #[derive(serde::Deserialize)]
    struct File {
        models: Vec<ModelDefinition>,
    }

    let file: File = toml::from_str(
        r#"
        [[models]]
        name = "o3"
        provider = "openai"
        context_window = 200000
        max_output_tokens = 100000

        [models.parameters.reasoning_effort]
        type = "string"
        default = "medium"
        override = "high"

        [models.parameters.temperature]
        type = "float"
        default = 1
        "#,
    )
    .unwrap();

    let spec = file.models[0].clone().into_spec();
    assert_eq!(spec.backend_model_id, "o3");
    assert_eq!(
        spec.parameter("reasoning_effort"),
        Some(&ParameterValue::Str("high".into()))
    );
    assert_eq!(spec.parameter("temperature"), Some(&ParameterValue::Int(1)));
    assert!(spec.parameters["temperature"].validate("temperature").is_ok());
}
