//! Testing utilities for the RRR workspace
//!
//! Shared fixtures and counting stub collaborators.

#![allow(missing_docs)]

use async_trait::async_trait;
use rrr_cache::{
    CacheBackend, CacheConfig, CacheError, CacheKey, CacheStore, MemoryBackend, StoredEntry,
};
use rrr_core::{
    display_name, AnalysisPayload, CollaboratorError, Collaborators, DocumentExtractor,
    Evaluation, Evaluator, ExtractedDocument, ExtractionError, Hyperlink, Pipeline,
    PipelineConfig, Renderer, ReportWriter, Structurer, Visualization,
};
use rrr_metrics::{
    MetricsDocument, CLIENT_METRIC, END_MARKER, FLAT_METRICS, REQUIRED_CLIENTS, SPLIT_METRICS,
    START_MARKER,
};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Metrics fixtures
// ---------------------------------------------------------------------------

/// Builds structurer output that passes validation
///
/// Every metric gets one reading per version; values default to
/// `10 + index` so no series is all zero.
#[derive(Debug, Clone)]
pub struct MetricsFixture {
    versions: Vec<String>,
    overrides: Vec<(String, Vec<f64>)>,
    reversed: bool,
}

impl MetricsFixture {
    pub fn new(versions: &[&str]) -> Self {
        Self {
            versions: versions.iter().map(|v| (*v).to_string()).collect(),
            overrides: Vec::new(),
            reversed: false,
        }
    }

    /// Use `values` (one per version) for a flat metric, or for both halves
    /// of a split metric
    pub fn values(mut self, metric: &str, values: &[f64]) -> Self {
        self.overrides.push((metric.to_string(), values.to_vec()));
        self
    }

    /// Emit every series newest-first
    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    fn series_values(&self, metric: &str) -> Vec<f64> {
        self.overrides
            .iter()
            .rev()
            .find(|(name, _)| name == metric)
            .map_or_else(
                || (0..self.versions.len()).map(|i| 10.0 + i as f64).collect(),
                |(_, values)| values.clone(),
            )
    }

    fn points(&self, metric: &str) -> Value {
        let mut points: Vec<Value> = self
            .versions
            .iter()
            .zip(self.series_values(metric))
            .map(|(version, value)| json!({"version": version, "value": value, "status": "ON_TRACK"}))
            .collect();
        if self.reversed {
            points.reverse();
        }
        Value::Array(points)
    }

    fn client_points(&self, offset: u64) -> Value {
        let mut points: Vec<Value> = self
            .versions
            .iter()
            .enumerate()
            .map(|(i, version)| {
                json!({
                    "version": version,
                    "pass_count": 90 + offset + i as u64,
                    "fail_count": 10,
                    "status": "MEDIUM_RISK",
                })
            })
            .collect();
        if self.reversed {
            points.reverse();
        }
        Value::Array(points)
    }

    pub fn build(&self) -> Value {
        let mut metrics = Map::new();
        for name in SPLIT_METRICS {
            metrics.insert(
                name.to_string(),
                json!({"ATLS": self.points(name), "BTLS": self.points(name)}),
            );
        }
        let clients: Map<String, Value> = REQUIRED_CLIENTS
            .iter()
            .zip(0u64..)
            .map(|(client, offset)| ((*client).to_string(), self.client_points(offset)))
            .collect();
        metrics.insert(CLIENT_METRIC.to_string(), Value::Object(clients));
        for name in FLAT_METRICS {
            metrics.insert(name.to_string(), self.points(name));
        }
        json!({ "metrics": metrics })
    }
}

/// Document text with a metrics table between the default markers
pub fn report_text(table: &str) -> String {
    format!("Release Readiness Report\n{START_MARKER}\n{table}\n{END_MARKER}\nSign-off pending\n")
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

/// Temporary folder of fake `.pdf` files holding plain text
///
/// Pair with [`StubExtractor`], which reads the files as UTF-8.
#[derive(Debug)]
pub struct ReportFolder {
    dir: TempDir,
}

impl ReportFolder {
    pub fn new(documents: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().expect("create temp folder");
        let folder = Self { dir };
        for (name, text) in documents {
            folder.write(name, text);
        }
        folder
    }

    /// One document per version, each with a valid metrics table
    pub fn with_versions(versions: &[&str]) -> Self {
        let docs: Vec<(String, String)> = versions
            .iter()
            .map(|v| (format!("RRR_{v}.pdf"), report_text(&format!("Metrics for {v}"))))
            .collect();
        let borrowed: Vec<(&str, &str)> =
            docs.iter().map(|(n, t)| (n.as_str(), t.as_str())).collect();
        Self::new(&borrowed)
    }

    pub fn write(&self, name: &str, text: &str) {
        std::fs::write(self.dir.path().join(name), text).expect("write fake pdf");
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn path_str(&self) -> String {
        self.dir.path().display().to_string()
    }
}

// ---------------------------------------------------------------------------
// Stub collaborators
// ---------------------------------------------------------------------------

/// Reads files as UTF-8 text; fails on names containing `fail_on`
#[derive(Debug, Default)]
pub struct StubExtractor {
    pub calls: AtomicUsize,
    fail_on: Mutex<Option<String>>,
}

impl StubExtractor {
    pub fn fail_on(&self, fragment: &str) {
        *self.fail_on.lock().unwrap() = Some(fragment.to_string());
    }
}

impl DocumentExtractor for StubExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = display_name(path);
        if let Some(fragment) = self.fail_on.lock().unwrap().as_deref() {
            if name.contains(fragment) {
                return Err(ExtractionError::Pdf("stub failure".into()));
            }
        }
        let text = std::fs::read_to_string(path)?;
        let hyperlinks = vec![Hyperlink {
            url: format!("https://jira.example/{name}"),
            context: "tracker".into(),
            page: 1,
            source_file: name.clone(),
        }];
        Ok(ExtractedDocument {
            name,
            text,
            hyperlinks,
        })
    }
}

/// Returns a fixed value; records the versions it was asked about
#[derive(Debug)]
pub struct StubStructurer {
    pub calls: AtomicUsize,
    output: Mutex<Value>,
    seen_versions: Mutex<Vec<String>>,
    delay: Mutex<Option<std::time::Duration>>,
}

impl StubStructurer {
    pub fn new(output: Value) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            output: Mutex::new(output),
            seen_versions: Mutex::default(),
            delay: Mutex::default(),
        }
    }

    pub fn set_output(&self, output: Value) {
        *self.output.lock().unwrap() = output;
    }

    /// Sleep this long before answering
    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn seen_versions(&self) -> Vec<String> {
        self.seen_versions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Structurer for StubStructurer {
    async fn structure(
        &self,
        _source_text: &str,
        versions: &[String],
    ) -> Result<Value, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_versions.lock().unwrap() = versions.to_vec();
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.output.lock().unwrap().clone())
    }
}

#[derive(Debug, Default)]
pub struct StubReportWriter {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl ReportWriter for StubReportWriter {
    async fn write_report(&self, metrics: &MetricsDocument) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Status {
                status: 503,
                body: "overloaded".into(),
            });
        }
        Ok(format!("# Release report\n\n{} metrics", metrics.metrics.len()))
    }
}

/// Scores every report 80 and remembers the source text it judged against
#[derive(Debug, Default)]
pub struct StubEvaluator {
    pub calls: AtomicUsize,
    last_source: Mutex<String>,
}

impl StubEvaluator {
    pub fn last_source(&self) -> String {
        self.last_source.lock().unwrap().clone()
    }
}

#[async_trait]
impl Evaluator for StubEvaluator {
    async fn evaluate(
        &self,
        source_text: &str,
        _report: &str,
    ) -> Result<Evaluation, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_source.lock().unwrap() = source_text.to_string();
        Ok(Evaluation::new(80, "Accurate and clear."))
    }
}

/// Lists one chart per metric without touching the filesystem
#[derive(Debug, Default)]
pub struct StubRenderer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn render(
        &self,
        chart_set: &str,
        metrics: &MetricsDocument,
    ) -> Result<Vec<Visualization>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(metrics
            .metrics
            .keys()
            .map(|name| Visualization {
                metric: name.clone(),
                file_name: format!("{chart_set}/{}.svg", name.len()),
                url: format!("/visualizations/{chart_set}/{}.svg", name.len()),
            })
            .collect())
    }
}

/// A full set of counting stubs
#[derive(Debug, Clone)]
pub struct Stubs {
    pub extractor: Arc<StubExtractor>,
    pub structurer: Arc<StubStructurer>,
    pub report_writer: Arc<StubReportWriter>,
    pub evaluator: Arc<StubEvaluator>,
    pub renderer: Arc<StubRenderer>,
}

impl Stubs {
    /// Stubs whose structurer returns `output`
    pub fn new(output: Value) -> Self {
        Self {
            extractor: Arc::default(),
            structurer: Arc::new(StubStructurer::new(output)),
            report_writer: Arc::default(),
            evaluator: Arc::default(),
            renderer: Arc::default(),
        }
    }

    /// Stubs returning valid metrics for `versions`
    pub fn valid(versions: &[&str]) -> Self {
        Self::new(MetricsFixture::new(versions).build())
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            extractor: self.extractor.clone(),
            structurer: self.structurer.clone(),
            report_writer: self.report_writer.clone(),
            evaluator: self.evaluator.clone(),
            renderer: self.renderer.clone(),
        }
    }

    /// Structurer + report writer + evaluator + renderer invocations
    pub fn downstream_calls(&self) -> usize {
        self.structurer.calls.load(Ordering::SeqCst)
            + self.report_writer.calls.load(Ordering::SeqCst)
            + self.evaluator.calls.load(Ordering::SeqCst)
            + self.renderer.calls.load(Ordering::SeqCst)
    }

    pub fn extractor_calls(&self) -> usize {
        self.extractor.calls.load(Ordering::SeqCst)
    }

    pub fn structurer_calls(&self) -> usize {
        self.structurer.calls.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Cache helpers
// ---------------------------------------------------------------------------

/// Backend whose writes fail; reads go to an empty in-memory map
#[derive(Debug, Default)]
pub struct FailingWrites {
    inner: MemoryBackend,
    pub write_attempts: AtomicUsize,
}

impl CacheBackend for FailingWrites {
    fn load(&self, key: &CacheKey) -> rrr_cache::Result<Option<StoredEntry>> {
        self.inner.load(key)
    }

    fn store(&self, _key: &CacheKey, _entry: &StoredEntry) -> rrr_cache::Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("read-only volume".into()))
    }

    fn remove(&self, key: &CacheKey, created_at_ms: i64) -> rrr_cache::Result<bool> {
        self.inner.remove(key, created_at_ms)
    }

    fn purge_older_than(&self, cutoff_ms: i64) -> rrr_cache::Result<usize> {
        self.inner.purge_older_than(cutoff_ms)
    }

    fn len(&self) -> rrr_cache::Result<usize> {
        self.inner.len()
    }
}

/// Backend whose reads fail; writes land in an in-memory map
#[derive(Debug, Default)]
pub struct FailingReads {
    inner: MemoryBackend,
    pub read_attempts: AtomicUsize,
}

impl FailingReads {
    /// Rows written so far
    pub fn stored(&self) -> usize {
        self.inner.len().unwrap_or_default()
    }
}

impl CacheBackend for FailingReads {
    fn load(&self, _key: &CacheKey) -> rrr_cache::Result<Option<StoredEntry>> {
        self.read_attempts.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("database is locked".into()))
    }

    fn store(&self, key: &CacheKey, entry: &StoredEntry) -> rrr_cache::Result<()> {
        self.inner.store(key, entry)
    }

    fn remove(&self, key: &CacheKey, created_at_ms: i64) -> rrr_cache::Result<bool> {
        self.inner.remove(key, created_at_ms)
    }

    fn purge_older_than(&self, cutoff_ms: i64) -> rrr_cache::Result<usize> {
        self.inner.purge_older_than(cutoff_ms)
    }

    fn len(&self) -> rrr_cache::Result<usize> {
        self.inner.len()
    }
}

/// In-memory cache store with default settings
pub fn memory_cache() -> Arc<CacheStore<AnalysisPayload>> {
    Arc::new(CacheStore::new(
        Arc::new(MemoryBackend::new()),
        &CacheConfig::default(),
    ))
}

/// Pipeline over `stubs` and `cache` with default configuration
pub fn stub_pipeline(stubs: &Stubs, cache: Arc<CacheStore<AnalysisPayload>>) -> Pipeline {
    Pipeline::new(PipelineConfig::default(), stubs.collaborators(), cache)
}
