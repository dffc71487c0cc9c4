//! Pipeline coordinator
//!
//! Drives one analysis request through its stages:
//!
//! ```text
//! KEY_COMPUTED → CACHE_CHECKED ─ hit ─→ DONE
//!                     └─ miss → EXTRACTING → STRUCTURING → VALIDATING
//!                               → REPORTING → EVALUATING → RENDERING
//!                               → CACHING → DONE
//! any stage ─→ FAILED
//! ```
//!
//! The cache store owns single-flight: concurrent requests for the same
//! folder contents run the miss path once.

use crate::collaborator::Collaborators;
use crate::config::PipelineConfig;
use crate::discovery::{discover_documents, display_name};
use crate::error::{InputError, PipelineError, Result};
use crate::pool::{ExtractionPool, PoolStats};
use crate::types::{AnalysisPayload, AnalysisResponse, CacheInfo, ExtractedDocument};
use rrr_cache::{CacheError, CacheKey, CacheStats, CacheStatus, CacheStore};
use rrr_metrics::{
    annotate_client_series, annotate_series, compare_versions, locate, version_from_name,
    MetricSeries, MetricsDocument,
};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Pipeline stage, as logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Cache key derived from folder and document bytes
    KeyComputed,
    /// Cache consulted
    CacheChecked,
    /// Documents being extracted on the pool
    Extracting,
    /// Structurer running
    Structuring,
    /// Structured output being validated
    Validating,
    /// Report writer running
    Reporting,
    /// Report being judged
    Evaluating,
    /// Charts being drawn
    Rendering,
    /// Payload being written to the cache
    Caching,
    /// Response ready
    Done,
    /// Request failed
    Failed,
}

impl Stage {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeyComputed => "key_computed",
            Self::CacheChecked => "cache_checked",
            Self::Extracting => "extracting",
            Self::Structuring => "structuring",
            Self::Validating => "validating",
            Self::Reporting => "reporting",
            Self::Evaluating => "evaluating",
            Self::Rendering => "rendering",
            Self::Caching => "caching",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Release-readiness analysis pipeline
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    collaborators: Collaborators,
    cache: Arc<CacheStore<AnalysisPayload>>,
    pool: ExtractionPool,
}

impl Pipeline {
    /// Pipeline over the given collaborators and cache
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        collaborators: Collaborators,
        cache: Arc<CacheStore<AnalysisPayload>>,
    ) -> Self {
        let pool = ExtractionPool::new(config.max_workers);
        Self {
            config,
            collaborators,
            cache,
            pool,
        }
    }

    /// Analyse every PDF in `folder`
    ///
    /// Identical folder contents are served from the cache until they
    /// expire. Nothing is cached unless every stage succeeds.
    ///
    /// # Errors
    /// Returns the first failure, classified by [`PipelineError::kind`].
    pub async fn analyze(&self, folder: &str) -> Result<AnalysisResponse> {
        match self.run(folder).await {
            Ok(response) => {
                tracing::info!(
                    stage = %Stage::Done,
                    cache = ?response.cache.status,
                    key = %response.cache.key,
                    score = response.payload.evaluation.score,
                    "analysis complete"
                );
                Ok(response)
            }
            Err(e) => {
                tracing::error!(
                    stage = %Stage::Failed,
                    kind = %e.kind(),
                    document = e.document().unwrap_or("-"),
                    error = %e,
                    "analysis failed"
                );
                Err(e)
            }
        }
    }

    async fn run(&self, folder: &str) -> Result<AnalysisResponse> {
        let owned = folder.to_string();
        let paths = tokio::task::spawn_blocking(move || discover_documents(&owned))
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))??;
        let mut contents = Vec::with_capacity(paths.len());
        for path in &paths {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| InputError::Unreadable {
                    path: path.clone(),
                    source,
                })?;
            contents.push(bytes);
        }
        let key = CacheKey::compute_named(
            folder,
            paths.iter().map(|path| display_name(path)).zip(&contents),
        );
        drop(contents);
        tracing::info!(
            stage = %Stage::KeyComputed,
            key = %key.short(),
            documents = paths.len(),
            "cache key computed"
        );

        let cached = self
            .cache
            .get_or_compute(&key, || async {
                tracing::info!(stage = %Stage::CacheChecked, key = %key.short(), "cache miss");
                self.compute(&key, paths).await
            })
            .await?;

        if cached.status == CacheStatus::Hit {
            tracing::info!(stage = %Stage::CacheChecked, key = %key.short(), "cache hit");
        }

        Ok(AnalysisResponse {
            payload: cached.value,
            cache: CacheInfo {
                status: cached.status,
                key: key.short(),
                created_at: cached.created_at,
            },
        })
    }

    async fn compute(&self, key: &CacheKey, paths: Vec<PathBuf>) -> Result<AnalysisPayload> {
        let collab = &self.collaborators;

        tracing::info!(
            stage = %Stage::Extracting,
            key = %key.short(),
            workers = self.pool.size(),
            "extracting documents"
        );
        let documents = self
            .pool
            .extract_all(Arc::clone(&collab.extractor), paths)
            .await?;
        let source_text = self.source_text(&documents)?;
        let versions = release_versions(&documents);
        let hyperlinks = documents
            .iter()
            .flat_map(|d| d.hyperlinks.iter().cloned())
            .collect::<Vec<_>>();
        tracing::debug!(
            versions = ?versions,
            links = hyperlinks.len(),
            chars = source_text.len(),
            "documents prepared"
        );

        tracing::info!(stage = %Stage::Structuring, key = %key.short());
        let raw = collab
            .structurer
            .structure(&source_text, &versions)
            .await
            .map_err(|e| PipelineError::collaborator(Stage::Structuring, e))?;

        tracing::info!(stage = %Stage::Validating, key = %key.short());
        let mut metrics = MetricsDocument::from_value(&raw).map_err(|report| {
            tracing::warn!(violations = report.len(), "structured metrics rejected");
            PipelineError::Validation(report)
        })?;
        order_and_annotate(&mut metrics);

        tracing::info!(stage = %Stage::Reporting, key = %key.short());
        let report = collab
            .report_writer
            .write_report(&metrics)
            .await
            .map_err(|e| PipelineError::collaborator(Stage::Reporting, e))?;

        tracing::info!(stage = %Stage::Evaluating, key = %key.short());
        let evaluation = collab
            .evaluator
            .evaluate(&source_text, &report)
            .await
            .map_err(|e| PipelineError::collaborator(Stage::Evaluating, e))?;

        tracing::info!(stage = %Stage::Rendering, key = %key.short());
        let visualizations = collab
            .renderer
            .render(&key.dir_name(), &metrics)
            .await
            .map_err(|e| PipelineError::collaborator(Stage::Rendering, e))?;

        tracing::info!(stage = %Stage::Caching, key = %key.short());
        Ok(AnalysisPayload {
            metrics,
            report,
            visualizations,
            evaluation,
            hyperlinks,
        })
    }

    /// `File: <name>\n<table>` per document, in document order
    fn source_text(&self, documents: &[ExtractedDocument]) -> Result<String> {
        let mut sections = Vec::with_capacity(documents.len());
        for doc in documents {
            let table = locate(&doc.text, &self.config.start_marker, &self.config.end_marker)
                .map_err(|source| PipelineError::Locate {
                    document: doc.name.clone(),
                    source,
                })?;
            tracing::debug!(document = %doc.name, chars = table.text().len(), "located metrics table");
            sections.push(format!("File: {}\n{}", doc.name, table.text()));
        }
        Ok(sections.join("\n"))
    }

    /// Drop cache entries older than the TTL
    ///
    /// # Errors
    /// Returns an error if the cache backend fails.
    pub async fn purge_expired(&self) -> std::result::Result<usize, CacheError> {
        self.cache.purge_expired().await
    }

    /// Cache counters
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Extraction pool counters
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

/// Distinct version labels of `documents`, ascending
fn release_versions(documents: &[ExtractedDocument]) -> Vec<String> {
    let mut versions: Vec<String> = documents
        .iter()
        .map(|d| version_from_name(&d.name))
        .collect();
    versions.sort_by(|a, b| compare_versions(a, b));
    versions.dedup();
    versions
}

/// Sort every series by version ascending, then annotate trends
///
/// Trends compare neighbours, so the sort must come first.
pub fn order_and_annotate(metrics: &mut MetricsDocument) {
    for series in metrics.metrics.values_mut() {
        match series {
            MetricSeries::Split(split) => {
                for points in [&mut split.atls, &mut split.btls] {
                    points.sort_by(|a, b| compare_versions(&a.version, &b.version));
                    annotate_series(points);
                }
            }
            MetricSeries::Client(clients) => {
                for points in clients.values_mut() {
                    points.sort_by(|a, b| compare_versions(&a.version, &b.version));
                    annotate_client_series(points);
                }
            }
            MetricSeries::Flat(points) => {
                points.sort_by(|a, b| compare_versions(&a.version, &b.version));
                annotate_series(points);
            }
        }
    }
}
