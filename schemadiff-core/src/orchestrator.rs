//! Diff orchestration across object types.
//!
//! The orchestrator sequences per-type engine invocations, applies the
//! timeout and cancellation rules, surfaces engine diagnostics to the log,
//! and assembles the per-type diffs into a [`DiffReport`] in requested order.
//!
//! Fail-fast is the only failure policy: the first failing type (in
//! requested order) ends the run. By default the diffs collected so far are
//! discarded; [`DiffOrchestrator::compare_all_best_effort`] returns them as an
//! explicitly partial report instead.

use crate::{
    Result,
    config::{ConnectionTarget, ExecutionMode, OrchestratorConfig},
    engine::{ComparisonEngine, EngineOutput},
    error::{SchemaDiffError, redact_secrets},
    models::{DiffReport, DiffSegment, RunFailure, SchemaObjectType},
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Drives a [`ComparisonEngine`] over a list of object types.
///
/// # Example
/// ```rust,no_run
/// use schemadiff_core::{
///     DiffOrchestrator, SchemaObjectType,
///     config::{ConnectionTarget, OrchestratorConfig},
///     engine::{CommandEngine, PlatformEngineResolver},
/// };
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> schemadiff_core::Result<()> {
/// let engine = CommandEngine::from_resolver(&PlatformEngineResolver::new("resources"))?;
/// let orchestrator = DiffOrchestrator::new(Arc::new(engine), OrchestratorConfig::default())?;
///
/// let source = ConnectionTarget::new("app", "secret", "localhost", "app_dev");
/// let target = ConnectionTarget::new("app", "secret", "localhost", "app_prod");
///
/// let diff = orchestrator
///     .compare_all(&source, &target, None, &CancellationToken::new())
///     .await?;
/// println!("{diff}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DiffOrchestrator {
    engine: Arc<dyn ComparisonEngine>,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for DiffOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffOrchestrator")
            .field("engine", &self.engine.describe())
            .field("config", &self.config)
            .finish()
    }
}

impl DiffOrchestrator {
    /// Creates an orchestrator after validating `config`.
    ///
    /// # Errors
    /// Returns a configuration error if `config` is invalid.
    pub fn new(engine: Arc<dyn ComparisonEngine>, config: OrchestratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { engine, config })
    }

    /// Configuration in effect.
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Compares a single object type.
    ///
    /// Returns the engine's diff text verbatim; an empty string means no
    /// differences. Engine diagnostics are logged whether or not the call
    /// succeeds.
    ///
    /// # Errors
    /// - `Configuration` if either target fails validation
    /// - `EngineInvocation` if the engine exits non-zero
    /// - `Timeout` if the engine exceeds the configured timeout
    /// - `Cancelled` if `cancel` fires first
    /// - `EngineUnavailable` if the engine cannot be started
    pub async fn compare_one(
        &self,
        source: &ConnectionTarget,
        target: &ConnectionTarget,
        object_type: SchemaObjectType,
        cancel: &CancellationToken,
    ) -> Result<String> {
        validate_targets(source, target)?;
        self.invoke(source, target, object_type, cancel).await
    }

    /// Compares every requested object type and returns the concatenated diff.
    ///
    /// `types` of `None` selects [`SchemaObjectType::ALL`]. Diffs are joined
    /// with a newline in requested order. The first failure ends the run and
    /// the diffs collected before it are discarded.
    ///
    /// # Errors
    /// Any error from [`Self::compare_one`] for the first failing type, or a
    /// configuration error if `types` is an empty list.
    pub async fn compare_all(
        &self,
        source: &ConnectionTarget,
        target: &ConnectionTarget,
        types: Option<&[SchemaObjectType]>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.compare_all_report(source, target, types, cancel)
            .await
            .map(DiffReport::into_text)
    }

    /// Like [`Self::compare_all`] but returns the per-type report.
    ///
    /// # Errors
    /// Same as [`Self::compare_all`].
    pub async fn compare_all_report(
        &self,
        source: &ConnectionTarget,
        target: &ConnectionTarget,
        types: Option<&[SchemaObjectType]>,
        cancel: &CancellationToken,
    ) -> Result<DiffReport> {
        let types = resolve_types(types)?;
        validate_targets(source, target)?;

        let (segments, failure) = self.collect(source, target, types, cancel).await;
        match failure {
            Some(error) => {
                if !segments.is_empty() {
                    debug!(
                        "Discarding {} collected segment(s) after failure",
                        segments.len()
                    );
                }
                Err(error)
            }
            None => Ok(DiffReport::complete(segments)),
        }
    }

    /// Compares every requested object type, keeping the diffs collected
    /// before a failure.
    ///
    /// The run still stops at the first failure. The returned report is
    /// complete when every type succeeded and partial otherwise, with
    /// [`DiffReport::failure`] describing what stopped it.
    ///
    /// # Errors
    /// Only configuration errors (empty type list, invalid targets) are
    /// returned as `Err`; invocation failures are folded into the report.
    pub async fn compare_all_best_effort(
        &self,
        source: &ConnectionTarget,
        target: &ConnectionTarget,
        types: Option<&[SchemaObjectType]>,
        cancel: &CancellationToken,
    ) -> Result<DiffReport> {
        let types = resolve_types(types)?;
        validate_targets(source, target)?;

        let (segments, failure) = self.collect(source, target, types, cancel).await;
        Ok(match failure {
            Some(error) => {
                warn!(
                    "Returning partial report with {} segment(s): {}",
                    segments.len(),
                    error
                );
                DiffReport::partial(segments, RunFailure::from(&error))
            }
            None => DiffReport::complete(segments),
        })
    }

    async fn collect(
        &self,
        source: &ConnectionTarget,
        target: &ConnectionTarget,
        types: &[SchemaObjectType],
        cancel: &CancellationToken,
    ) -> (Vec<DiffSegment>, Option<SchemaDiffError>) {
        info!(
            "Comparing {} object type(s): {} -> {}",
            types.len(),
            source,
            target
        );

        match self.config.execution {
            ExecutionMode::Sequential => self.collect_sequential(source, target, types, cancel).await,
            ExecutionMode::Concurrent { max_workers } => {
                self.collect_concurrent(source, target, types, cancel, max_workers)
                    .await
            }
        }
    }

    async fn collect_sequential(
        &self,
        source: &ConnectionTarget,
        target: &ConnectionTarget,
        types: &[SchemaObjectType],
        cancel: &CancellationToken,
    ) -> (Vec<DiffSegment>, Option<SchemaDiffError>) {
        let mut segments = Vec::with_capacity(types.len());

        for &object_type in types {
            match self.invoke(source, target, object_type, cancel).await {
                Ok(diff) => segments.push(DiffSegment::new(object_type, diff)),
                Err(error) => return (segments, Some(error)),
            }
        }

        (segments, None)
    }

    async fn collect_concurrent(
        &self,
        source: &ConnectionTarget,
        target: &ConnectionTarget,
        types: &[SchemaObjectType],
        cancel: &CancellationToken,
        max_workers: usize,
    ) -> (Vec<DiffSegment>, Option<SchemaDiffError>) {
        let mut segments = Vec::with_capacity(types.len());

        // `buffered` yields results in input order regardless of completion
        // order. Dropping the stream on failure drops the in-flight
        // invocations, which kills their engine processes.
        let mut results = stream::iter(types.iter().copied())
            .map(|object_type| async move {
                let diff = self.invoke(source, target, object_type, cancel).await;
                (object_type, diff)
            })
            .buffered(max_workers);

        while let Some((object_type, result)) = results.next().await {
            match result {
                Ok(diff) => segments.push(DiffSegment::new(object_type, diff)),
                Err(error) => return (segments, Some(error)),
            }
        }

        (segments, None)
    }

    async fn invoke(
        &self,
        source: &ConnectionTarget,
        target: &ConnectionTarget,
        object_type: SchemaObjectType,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(SchemaDiffError::cancelled(Some(object_type)));
        }

        debug!("Invoking {} for {}", self.engine.describe(), object_type);

        let output = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!("Cancelled while comparing {}", object_type);
                return Err(SchemaDiffError::cancelled(Some(object_type)));
            }
            output = self.run_engine(source, target, object_type) => output?,
        };

        let diagnostics = redact_secrets(
            output.stderr.trim_end(),
            &[
                source.credentials().expose_password(),
                target.credentials().expose_password(),
            ],
        );

        if output.is_success() {
            if !diagnostics.is_empty() {
                info!(object_type = %object_type, "Engine diagnostics: {}", diagnostics);
            }
            debug!(
                "{} compared ({} byte(s) of diff)",
                object_type,
                output.stdout.len()
            );
            Ok(output.stdout)
        } else {
            warn!(
                object_type = %object_type,
                status = output.status,
                "Engine failed: {}",
                diagnostics
            );
            Err(SchemaDiffError::engine_invocation(
                object_type,
                output.status,
                diagnostics,
            ))
        }
    }

    async fn run_engine(
        &self,
        source: &ConnectionTarget,
        target: &ConnectionTarget,
        object_type: SchemaObjectType,
    ) -> Result<EngineOutput> {
        let call = self.engine.compare(source, target, object_type);
        match self.config.timeout {
            Some(timeout) => tokio::time::timeout(timeout, call).await.map_err(|_| {
                warn!("{} timed out after {:?}", object_type, timeout);
                SchemaDiffError::timeout(object_type, timeout)
            })?,
            None => call.await,
        }
    }
}

fn resolve_types(types: Option<&[SchemaObjectType]>) -> Result<&[SchemaObjectType]> {
    match types {
        None => Ok(SchemaObjectType::ALL),
        Some([]) => Err(SchemaDiffError::configuration(
            "at least one object type must be requested",
        )),
        Some(types) => Ok(types),
    }
}

fn validate_targets(source: &ConnectionTarget, target: &ConnectionTarget) -> Result<()> {
    source
        .validate()
        .map_err(|e| SchemaDiffError::configuration(format!("source: {e}")))?;
    target
        .validate()
        .map_err(|e| SchemaDiffError::configuration(format!("target: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory engine returning canned output per object type.
    #[derive(Default)]
    struct ScriptedEngine {
        outputs: HashMap<SchemaObjectType, EngineOutput>,
        delays: HashMap<SchemaObjectType, Duration>,
        calls: Mutex<Vec<SchemaObjectType>>,
    }

    impl ScriptedEngine {
        fn with(mut self, object_type: SchemaObjectType, output: EngineOutput) -> Self {
            self.outputs.insert(object_type, output);
            self
        }

        fn with_delay(mut self, object_type: SchemaObjectType, delay: Duration) -> Self {
            self.delays.insert(object_type, delay);
            self
        }

        fn calls(&self) -> Vec<SchemaObjectType> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ComparisonEngine for ScriptedEngine {
        async fn compare(
            &self,
            _source: &ConnectionTarget,
            _target: &ConnectionTarget,
            object_type: SchemaObjectType,
        ) -> Result<EngineOutput> {
            self.calls.lock().unwrap().push(object_type);
            if let Some(delay) = self.delays.get(&object_type) {
                tokio::time::sleep(*delay).await;
            }
            Ok(self.outputs.get(&object_type).cloned().unwrap_or_default())
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn targets() -> (ConnectionTarget, ConnectionTarget) {
        (
            ConnectionTarget::new("u", "source-pw", "a", "db1"),
            ConnectionTarget::new("u", "target-pw", "b", "db2"),
        )
    }

    fn orchestrator(engine: Arc<ScriptedEngine>, config: OrchestratorConfig) -> DiffOrchestrator {
        DiffOrchestrator::new(engine, config).unwrap()
    }

    #[tokio::test]
    async fn test_compare_one_returns_diff_verbatim() {
        let engine = Arc::new(
            ScriptedEngine::default().with(SchemaObjectType::Table, EngineOutput::success("  x\n")),
        );
        let (s, t) = targets();
        let diff = orchestrator(engine.clone(), OrchestratorConfig::default())
            .compare_one(&s, &t, SchemaObjectType::Table, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(diff, "  x\n");
        assert_eq!(engine.calls(), vec![SchemaObjectType::Table]);
    }

    #[tokio::test]
    async fn test_compare_one_failure_scrubs_passwords() {
        let engine = Arc::new(ScriptedEngine::default().with(
            SchemaObjectType::Role,
            EngineOutput::failure(1, "login failed with password source-pw\n"),
        ));
        let (s, t) = targets();
        let error = orchestrator(engine, OrchestratorConfig::default())
            .compare_one(&s, &t, SchemaObjectType::Role, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(error.status(), Some(1));
        assert_eq!(
            error.diagnostics(),
            Some("login failed with password ****")
        );
    }

    #[tokio::test]
    async fn test_compare_one_rejects_invalid_target() {
        let engine = Arc::new(ScriptedEngine::default());
        let (s, _) = targets();
        let bad = ConnectionTarget::new("u", "p", "", "db");
        let error = orchestrator(engine.clone(), OrchestratorConfig::default())
            .compare_one(&s, &bad, SchemaObjectType::Table, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, SchemaDiffError::Configuration { .. }));
        assert!(error.to_string().contains("target"));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_compare_all_rejects_empty_type_list() {
        let engine = Arc::new(ScriptedEngine::default());
        let (s, t) = targets();
        let result = orchestrator(engine, OrchestratorConfig::default())
            .compare_all(&s, &t, Some(&[]), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SchemaDiffError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let engine = Arc::new(
            ScriptedEngine::default().with_delay(SchemaObjectType::Index, Duration::from_secs(5)),
        );
        let (s, t) = targets();
        let config = OrchestratorConfig::new().with_timeout(Duration::from_millis(20));
        let error = orchestrator(engine.clone(), config)
            .compare_all(
                &s,
                &t,
                Some(&[SchemaObjectType::Index, SchemaObjectType::View]),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            SchemaDiffError::Timeout {
                object_type: SchemaObjectType::Index,
                ..
            }
        ));
        assert_eq!(engine.calls(), vec![SchemaObjectType::Index]);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_invokes_nothing() {
        let engine = Arc::new(ScriptedEngine::default());
        let (s, t) = targets();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = orchestrator(engine.clone(), OrchestratorConfig::default())
            .compare_all(&s, &t, None, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            SchemaDiffError::Cancelled {
                object_type: Some(SchemaObjectType::Schema)
            }
        ));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_in_flight_returns_partial_in_best_effort() {
        let engine = Arc::new(
            ScriptedEngine::default()
                .with(SchemaObjectType::Schema, EngineOutput::success("CREATE SCHEMA x;"))
                .with_delay(SchemaObjectType::Role, Duration::from_secs(30)),
        );
        let (s, t) = targets();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let report = orchestrator(engine.clone(), OrchestratorConfig::default())
            .compare_all_best_effort(&s, &t, None, &cancel)
            .await
            .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.text(), "CREATE SCHEMA x;");
        let failure = report.failure().unwrap();
        assert_eq!(failure.object_type, Some(SchemaObjectType::Role));
        assert_eq!(
            engine.calls(),
            vec![SchemaObjectType::Schema, SchemaObjectType::Role]
        );
    }

    #[tokio::test]
    async fn test_concurrent_preserves_requested_order() {
        let engine = Arc::new(
            ScriptedEngine::default()
                .with(SchemaObjectType::Table, EngineOutput::success("table"))
                .with_delay(SchemaObjectType::Table, Duration::from_millis(50))
                .with(SchemaObjectType::View, EngineOutput::success("view"))
                .with(SchemaObjectType::Role, EngineOutput::success("role")),
        );
        let (s, t) = targets();
        let types = [
            SchemaObjectType::Table,
            SchemaObjectType::View,
            SchemaObjectType::Role,
        ];
        let diff = orchestrator(engine.clone(), OrchestratorConfig::new().with_max_workers(3))
            .compare_all(&s, &t, Some(&types), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(diff, "table\nview\nrole");
        assert_eq!(engine.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_reports_first_failure_in_requested_order() {
        let engine = Arc::new(
            ScriptedEngine::default()
                .with(SchemaObjectType::Table, EngineOutput::failure(4, "table broke"))
                .with_delay(SchemaObjectType::Table, Duration::from_millis(50))
                .with(SchemaObjectType::View, EngineOutput::failure(5, "view broke")),
        );
        let (s, t) = targets();
        let error = orchestrator(engine, OrchestratorConfig::new().with_max_workers(2))
            .compare_all(
                &s,
                &t,
                Some(&[SchemaObjectType::Table, SchemaObjectType::View]),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(error.status(), Some(4));
        assert_eq!(error.object_type(), Some(SchemaObjectType::Table));
    }

    /// Log sink shared between a test and its subscriber.
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl CapturedLog {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_success_diagnostics_are_logged_scrubbed() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let engine = Arc::new(ScriptedEngine::default().with(
            SchemaObjectType::Table,
            EngineOutput {
                stdout: "ALTER TABLE t;".to_string(),
                stderr: "warning: x source-pw\n".to_string(),
                status: 0,
            },
        ));
        let (s, t) = targets();
        let diff = orchestrator(engine, OrchestratorConfig::default())
            .compare_one(&s, &t, SchemaObjectType::Table, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(diff, "ALTER TABLE t;");
        let logged = log.contents();
        assert!(logged.contains("warning: x ****"), "log was: {logged}");
        assert!(!logged.contains("source-pw"));
    }

    /// Engine that tracks how many calls overlap.
    #[derive(Default)]
    struct OverlapEngine {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ComparisonEngine for OverlapEngine {
        async fn compare(
            &self,
            _source: &ConnectionTarget,
            _target: &ConnectionTarget,
            _object_type: SchemaObjectType,
        ) -> Result<EngineOutput> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(EngineOutput::default())
        }

        fn describe(&self) -> String {
            "overlap".to_string()
        }
    }

    #[tokio::test]
    async fn test_concurrent_respects_worker_limit() {
        let engine = Arc::new(OverlapEngine::default());
        let (s, t) = targets();
        let orchestrator =
            DiffOrchestrator::new(engine.clone(), OrchestratorConfig::new().with_max_workers(3))
                .unwrap();

        let diff = orchestrator
            .compare_all(&s, &t, None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(diff, "");
        let peak = engine.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak was {peak}");
        assert!(peak >= 2, "peak was {peak}");
        assert_eq!(engine.in_flight.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let engine = Arc::new(ScriptedEngine::default());
        let result = DiffOrchestrator::new(engine, OrchestratorConfig::new().with_max_workers(0));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_uses_engine_description() {
        let engine = Arc::new(ScriptedEngine::default());
        let debug = format!("{:?}", orchestrator(engine, OrchestratorConfig::default()));
        assert!(debug.contains("scripted"));
    }
}
