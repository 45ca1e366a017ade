//! End-to-end orchestration behavior against scripted backends

use plansmith_core::{
    MemoryOutputWriter, ModelStatus, NoopAuditLogger, OrchestrationResult, Orchestrator,
    OrchestratorError, OrchestratorSettings, OverallStatus, ProcessorSettings,
    ProviderRateLimiter, RetryConfig,
};
use plansmith_llm::{BackendFactory, MockBackend, MockFactory, MockReply, ModelDefinition, Registry};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct World {
    factory: Arc<MockFactory>,
    writer: Arc<MemoryOutputWriter>,
    orchestrator: Orchestrator,
}

fn world(definitions: Vec<ModelDefinition>) -> World {
    let factory = Arc::new(MockFactory::new("mock"));
    let registry = Registry::from_config(
        definitions,
        vec![Arc::clone(&factory) as Arc<dyn BackendFactory>],
    )
    .expect("registry");
    let writer = Arc::new(MemoryOutputWriter::new());
    let settings = OrchestratorSettings::default().with_processor(ProcessorSettings {
        retry: RetryConfig::new()
            .with_initial_delay(Duration::from_millis(5))
            .with_jitter(false),
        allow_blank_output: false,
    });
    let orchestrator = Orchestrator::new(
        Arc::new(registry),
        Arc::new(ProviderRateLimiter::unlimited()),
        writer.clone(),
    )
    .with_audit(Arc::new(NoopAuditLogger))
    .with_settings(settings);

    World {
        factory,
        writer,
        orchestrator,
    }
}

fn models(names: &[&str]) -> Vec<ModelDefinition> {
    names
        .iter()
        .map(|name| ModelDefinition::new(*name, "mock", 100_000, 2048))
        .collect()
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|n| n.to_string()).collect()
}

async fn run(world: &World, requested: &[&str], synthesis: Option<&str>) -> OrchestrationResult {
    world
        .orchestrator
        .run(
            &CancellationToken::new(),
            "Add request tracing to the HTTP layer",
            "src/http.rs\nfn handle() {}",
            &names(requested),
            synthesis,
        )
        .await
        .expect("run should be accepted")
}

#[tokio::test]
async fn all_succeeding_backends_give_sorted_complete_results() {
    for requested in [
        vec!["solo"],
        vec!["zeta", "alpha"],
        vec!["m3", "m1", "m4", "m2", "m0"],
    ] {
        let world = world(models(&requested));
        let result = run(&world, &requested, None).await;

        assert_eq!(result.overall_status, OverallStatus::AllSucceeded);
        assert_eq!(result.outcomes.len(), requested.len());
        let mut expected: Vec<&str> = requested.clone();
        expected.sort_unstable();
        let got: Vec<&str> = result
            .outcomes
            .iter()
            .map(|o| o.model_name.as_str())
            .collect();
        assert_eq!(got, expected);
        assert!(result.outcomes.iter().all(|o| o.artifact_path.is_some()));
    }
}

#[tokio::test]
async fn one_api_failure_gives_partial_success_without_artifact() {
    let world = world(models(&["alpha", "bravo", "charlie"]));
    world.factory.register(Arc::new(
        MockBackend::new("mock", "bravo")
            .with_default_reply(MockReply::ApiError("503: overloaded".into())),
    ));

    let result = run(&world, &["alpha", "bravo", "charlie"], None).await;

    assert_eq!(result.overall_status, OverallStatus::PartialSuccess);
    let bravo = result.outcome("bravo").unwrap();
    assert_eq!(bravo.status, ModelStatus::ApiError);
    assert!(bravo.artifact_path.is_none());
    assert!(bravo.content.is_none());
    assert!(world.writer.get("bravo").is_none());
    assert_eq!(world.writer.artifacts(), vec!["alpha", "charlie"]);
    assert_eq!(result.exit_code(false), 2);
}

#[tokio::test]
async fn unresolvable_synthesis_model_makes_no_backend_calls() {
    let world = world(models(&["alpha", "bravo"]));
    let err = world
        .orchestrator
        .run(
            &CancellationToken::new(),
            "task",
            "",
            &names(&["alpha", "bravo"]),
            Some("nonexistent"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Configuration(_)));
    assert_eq!(world.factory.created(), 0);
    assert_eq!(world.factory.total_generate_calls(), 0);
    assert!(world.writer.artifacts().is_empty());
}

#[tokio::test]
async fn all_failures_skip_synthesis() {
    let world = world(models(&["alpha", "bravo", "judge"]));
    for name in ["alpha", "bravo"] {
        world.factory.register(Arc::new(
            MockBackend::new("mock", name).with_default_reply(MockReply::ApiError("500".into())),
        ));
    }

    let result = run(&world, &["alpha", "bravo"], Some("judge")).await;

    assert_eq!(result.overall_status, OverallStatus::AllFailed);
    assert!(result.synthesis.is_none());
    assert_eq!(world.factory.backend("judge").generate_calls(), 0);
}

#[tokio::test]
async fn synthesis_failure_keeps_individual_successes() {
    let world = world(models(&["alpha", "bravo", "judge"]));
    world.factory.register(Arc::new(
        MockBackend::new("mock", "judge").with_default_reply(MockReply::Content("   ".into())),
    ));

    let result = run(&world, &["alpha", "bravo"], Some("judge")).await;

    assert_eq!(result.overall_status, OverallStatus::SynthesisFailed);
    assert!(result
        .outcomes
        .iter()
        .all(|o| o.status == ModelStatus::Success));
    let synthesis = result.synthesis.unwrap();
    assert_eq!(synthesis.model_name, "judge");
    assert_eq!(synthesis.status, ModelStatus::ApiError);
    assert!(world.writer.get("judge+synthesis").is_none());
}

#[tokio::test]
async fn oversized_prompt_skips_generation_for_that_model() {
    let mut definitions = models(&["roomy"]);
    definitions.push(ModelDefinition::new("tiny", "mock", 8, 64));
    let world = world(definitions);
    let tiny = world.factory.backend("tiny");

    let result = run(&world, &["roomy", "tiny"], None).await;

    let outcome = result.outcome("tiny").unwrap();
    assert_eq!(outcome.status, ModelStatus::TokenLimitExceeded);
    let info = outcome.token_info.unwrap();
    assert!(info.count > info.limit);
    assert_eq!(info.limit, 8);
    assert_eq!(tiny.count_calls(), 1);
    assert_eq!(tiny.generate_calls(), 0);
    assert_eq!(result.overall_status, OverallStatus::PartialSuccess);
}

#[tokio::test(start_paused = true)]
async fn cancelling_mid_run_resolves_pending_models_as_cancelled() {
    let world = world(models(&["fast", "slow", "stuck", "judge"]));
    world.factory.register(Arc::new(
        MockBackend::new("mock", "slow").with_delay(Duration::from_secs(60)),
    ));
    world.factory.register(Arc::new(
        MockBackend::new("mock", "stuck").with_default_reply(MockReply::Hang),
    ));

    let cancel = CancellationToken::new();
    let requested = names(&["fast", "slow", "stuck"]);
    let started = tokio::time::Instant::now();
    let (result, ()) = tokio::join!(
        world
            .orchestrator
            .run(&cancel, "task", "", &requested, Some("judge")),
        async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        }
    );
    let result = result.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(result.overall_status, OverallStatus::Aborted);
    assert_eq!(result.outcome("fast").unwrap().status, ModelStatus::Success);
    assert_eq!(result.outcome("slow").unwrap().status, ModelStatus::Cancelled);
    assert_eq!(result.outcome("stuck").unwrap().status, ModelStatus::Cancelled);
    assert!(result.synthesis.is_none());
    assert_eq!(world.factory.backend("judge").generate_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn backend_rate_limit_then_success_is_reported() {
    let world = world(models(&["alpha", "bravo"]));
    world.factory.register(Arc::new(
        MockBackend::new("mock", "alpha")
            .with_reply(MockReply::RateLimited)
            .with_reply(MockReply::RateLimited)
            .with_reply(MockReply::Content("third time".into())),
    ));

    let result = run(&world, &["alpha", "bravo"], None).await;

    let alpha = result.outcome("alpha").unwrap();
    assert_eq!(alpha.status, ModelStatus::RateLimitedThenSucceeded);
    assert_eq!(alpha.attempts, 3);
    assert_eq!(result.overall_status, OverallStatus::AllSucceeded);
}

#[tokio::test]
async fn summary_lists_every_model() {
    let world = world(models(&["alpha", "bravo"]));
    world.factory.register(Arc::new(
        MockBackend::new("mock", "bravo").with_default_reply(MockReply::ApiError("boom".into())),
    ));

    let summary = run(&world, &["alpha", "bravo"], None).await.summary();
    assert!(summary.contains("alpha"));
    assert!(summary.contains("bravo"));
    assert!(summary.contains("1 of 2 models succeeded"));
}
