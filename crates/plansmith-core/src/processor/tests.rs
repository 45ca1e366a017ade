use super::*;
use crate::audit::{AuditError, AuditEvent, MockAuditLogger, NoopAuditLogger};
use crate::output::{MemoryOutputWriter, MockOutputWriter, OutputError};
use crate::utils::{RateLimitScope, RateLimitSettings, RatePolicy};
use plansmith_llm::{BackendFactory, MockBackend, MockFactory, MockReply, ModelDefinition};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct RecordingAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl AuditLogger for RecordingAudit {
    fn log(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

impl RecordingAudit {
    fn kinds(&self) -> Vec<AuditEventKind> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.kind.clone())
            .collect()
    }
}

struct Harness {
    factory: Arc<MockFactory>,
    registry: Arc<Registry>,
    limiter: Arc<ProviderRateLimiter>,
    writer: Arc<MemoryOutputWriter>,
    settings: ProcessorSettings,
}

impl Harness {
    fn new(models: Vec<ModelDefinition>) -> Self {
        let factory = Arc::new(MockFactory::new("mock"));
        let registry = Registry::from_config(
            models,
            vec![Arc::clone(&factory) as Arc<dyn BackendFactory>],
        )
        .unwrap();
        Self {
            factory,
            registry: Arc::new(registry),
            limiter: Arc::new(ProviderRateLimiter::unlimited()),
            writer: Arc::new(MemoryOutputWriter::new()),
            settings: ProcessorSettings {
                retry: RetryConfig::new()
                    .with_initial_delay(Duration::from_millis(10))
                    .with_jitter(false),
                allow_blank_output: false,
            },
        }
    }

    fn single(window: usize) -> Self {
        Self::new(vec![ModelDefinition::new("alpha", "mock", window, 1024)])
    }

    fn backend(&self, model: &str) -> Arc<MockBackend> {
        self.factory.backend(model)
    }

    fn processor(&self, audit: Arc<dyn AuditLogger>) -> ModelProcessor {
        ModelProcessor::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.limiter),
            self.writer.clone(),
            audit,
            Arc::new(ApiKeys::new()),
            self.settings.clone(),
            Uuid::new_v4(),
        )
    }

    async fn run(&self, model: &str) -> ModelOutcome {
        self.processor(Arc::new(NoopAuditLogger))
            .process(&CancellationToken::new(), job(model))
            .await
    }
}

fn job(model: &str) -> ProcessorJob {
    ProcessorJob {
        model_name: model.to_string(),
        prompt: Arc::from("Plan the migration to async I/O."),
        artifact: crate::output::artifact_name(model),
        stage: Stage::Model,
    }
}

#[tokio::test]
async fn test_success_writes_artifact_and_reports_tokens() {
    let harness = Harness::single(100_000);
    harness.factory.register(Arc::new(
        MockBackend::new("mock", "alpha").with_default_reply(MockReply::Content("1. step".into())),
    ));
    let audit = Arc::new(RecordingAudit::default());

    let outcome = harness
        .processor(audit.clone())
        .process(&CancellationToken::new(), job("alpha"))
        .await;

    assert_eq!(outcome.status, ModelStatus::Success);
    assert_eq!(outcome.content.as_deref(), Some("1. step"));
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.artifact_path, Some(PathBuf::from("memory://alpha")));
    assert_eq!(harness.writer.get("alpha").as_deref(), Some("1. step"));
    let info = outcome.token_info.unwrap();
    assert!(info.count > 0 && !info.exceeds);

    let kinds = audit.kinds();
    assert_eq!(kinds.len(), 2);
    assert!(matches!(kinds[0], AuditEventKind::CallStarted { .. }));
    assert!(matches!(
        kinds[1],
        AuditEventKind::CallCompleted { attempts: 1, .. }
    ));
}

#[tokio::test]
async fn test_unknown_model_is_configuration_error() {
    let harness = Harness::single(100_000);
    let outcome = harness.run("missing").await;

    assert_eq!(outcome.status, ModelStatus::ConfigurationError);
    assert!(outcome.error_detail.unwrap().contains("missing"));
    assert_eq!(harness.factory.created(), 0);
}

#[tokio::test]
async fn test_backend_init_failure_is_configuration_error() {
    let harness = Harness::single(100_000);
    harness.factory.fail_init("alpha");

    let outcome = harness.run("alpha").await;
    assert_eq!(outcome.status, ModelStatus::ConfigurationError);
    assert_eq!(harness.factory.total_generate_calls(), 0);
}

#[tokio::test]
async fn test_token_limit_skips_generation() {
    let harness = Harness::single(1_000);
    let backend = Arc::new(MockBackend::new("mock", "alpha").with_token_count(1_001));
    harness.factory.register(backend.clone());
    let audit = Arc::new(RecordingAudit::default());

    let outcome = harness
        .processor(audit.clone())
        .process(&CancellationToken::new(), job("alpha"))
        .await;

    assert_eq!(outcome.status, ModelStatus::TokenLimitExceeded);
    assert!(outcome.token_info.unwrap().exceeds);
    assert_eq!(backend.count_calls(), 1);
    assert_eq!(backend.generate_calls(), 0);
    assert!(harness.writer.artifacts().is_empty());
    assert!(matches!(
        audit.kinds()[..],
        [AuditEventKind::CallFailed {
            status: ModelStatus::TokenLimitExceeded,
            ..
        }]
    ));
}

#[tokio::test]
async fn test_api_error_writes_nothing() {
    let harness = Harness::single(100_000);
    harness.factory.register(Arc::new(
        MockBackend::new("mock", "alpha")
            .with_default_reply(MockReply::ApiError("500: upstream exploded".into())),
    ));

    let outcome = harness.run("alpha").await;
    assert_eq!(outcome.status, ModelStatus::ApiError);
    assert!(outcome.content.is_none());
    assert!(outcome.artifact_path.is_none());
    assert!(outcome.error_detail.unwrap().contains("upstream exploded"));
    assert!(harness.writer.artifacts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_then_succeeded() {
    let harness = Harness::single(100_000);
    let backend = Arc::new(
        MockBackend::new("mock", "alpha")
            .with_reply(MockReply::RateLimited)
            .with_reply(MockReply::Content("plan".into())),
    );
    harness.factory.register(backend.clone());

    let outcome = harness.run("alpha").await;
    assert_eq!(outcome.status, ModelStatus::RateLimitedThenSucceeded);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(backend.generate_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_backend_rate_limit() {
    let harness = Harness::single(100_000);
    harness.factory.register(Arc::new(
        MockBackend::new("mock", "alpha").with_default_reply(MockReply::RateLimited),
    ));

    let outcome = harness.run("alpha").await;
    assert_eq!(outcome.status, ModelStatus::RateLimitTimeout);
    assert_eq!(outcome.attempts, 3);
}

#[tokio::test]
async fn test_blank_output_policy() {
    let mut harness = Harness::new(vec![
        ModelDefinition::new("blank", "mock", 100_000, 100),
        ModelDefinition::new("empty", "mock", 100_000, 100),
    ]);
    harness.factory.register(Arc::new(
        MockBackend::new("mock", "blank").with_default_reply(MockReply::Content(" \n ".into())),
    ));
    harness.factory.register(Arc::new(
        MockBackend::new("mock", "empty").with_default_reply(MockReply::Content(String::new())),
    ));

    let strict = harness.run("blank").await;
    assert_eq!(strict.status, ModelStatus::ApiError);
    assert_eq!(
        strict.error_detail.as_deref(),
        Some("backend returned empty output")
    );

    harness.settings.allow_blank_output = true;
    assert_eq!(harness.run("blank").await.status, ModelStatus::Success);
    assert_eq!(harness.run("empty").await.status, ModelStatus::ApiError);
}

#[tokio::test]
async fn test_output_failure_is_output_error() {
    let harness = Harness::single(100_000);
    let mut writer = MockOutputWriter::new();
    writer.expect_write().times(1).returning(|artifact, _| {
        Err(OutputError::Rejected {
            artifact: artifact.to_string(),
            reason: "read-only".into(),
        })
    });

    let processor = ModelProcessor::new(
        Arc::clone(&harness.registry),
        Arc::clone(&harness.limiter),
        Arc::new(writer),
        Arc::new(NoopAuditLogger),
        Arc::new(ApiKeys::new()),
        harness.settings.clone(),
        Uuid::new_v4(),
    );
    let outcome = processor
        .process(&CancellationToken::new(), job("alpha"))
        .await;

    assert_eq!(outcome.status, ModelStatus::OutputError);
    assert!(outcome.content.is_none());
    assert!(outcome.error_detail.unwrap().contains("read-only"));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_waiting_for_slot() {
    let mut harness = Harness::single(100_000);
    harness.limiter = Arc::new(ProviderRateLimiter::new(RateLimitSettings::new(
        RateLimitScope::Provider,
        RatePolicy::default().with_max_concurrent(1),
    )));
    let cancel = CancellationToken::new();
    let _held = harness.limiter.acquire(&cancel, "mock", "other").await.unwrap();

    let processor = harness.processor(Arc::new(NoopAuditLogger));
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { processor.process(&cancel, job("alpha")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let outcome = task.await.unwrap();
    assert_eq!(outcome.status, ModelStatus::Cancelled);
    assert!(outcome.token_info.is_none());
    assert_eq!(harness.factory.total_generate_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_generation() {
    let harness = Harness::single(100_000);
    harness.factory.register(Arc::new(
        MockBackend::new("mock", "alpha").with_default_reply(MockReply::Hang),
    ));
    let cancel = CancellationToken::new();

    let processor = harness.processor(Arc::new(NoopAuditLogger));
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { processor.process(&cancel, job("alpha")).await })
    };
    tokio::time::sleep(Duration::from_secs(30)).await;
    cancel.cancel();

    let outcome = task.await.unwrap();
    assert_eq!(outcome.status, ModelStatus::Cancelled);
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_model() {
    let harness = Harness::single(100_000);
    let mut audit = MockAuditLogger::new();
    audit
        .expect_log()
        .returning(|_| Err(AuditError::Sink("unavailable".into())));

    let outcome = harness
        .processor(Arc::new(audit))
        .process(&CancellationToken::new(), job("alpha"))
        .await;
    assert_eq!(outcome.status, ModelStatus::Success);
}
