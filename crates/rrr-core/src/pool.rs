//! Fixed-size extraction worker pool
//!
//! Runs blocking document extraction off the async runtime with bounded
//! parallelism:
//! - at most `size` extractions run at once
//! - results come back in input order
//! - every submitted job runs to completion on its own task and returns its
//!   slot, even if the caller stops waiting

use crate::collaborator::DocumentExtractor;
use crate::discovery::display_name;
use crate::error::{ExtractionError, PipelineError};
use crate::types::ExtractedDocument;
use futures::future::join_all;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Configured number of slots
    pub size: usize,
    /// Slots free right now
    pub available: usize,
    /// Jobs finished, successfully or not
    pub completed: usize,
    /// Jobs that returned an error
    pub failed: usize,
}

#[derive(Debug, Default)]
struct Counters {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

/// Bounded pool for document extraction
#[derive(Debug, Clone)]
pub struct ExtractionPool {
    size: usize,
    slots: Arc<Semaphore>,
    counters: Arc<Counters>,
}

impl ExtractionPool {
    /// Pool with `size` slots (at least one)
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            slots: Arc::new(Semaphore::new(size)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Extract every path, preserving order
    ///
    /// All jobs are awaited; the first failure in input order is returned.
    ///
    /// # Errors
    /// [`PipelineError::Extraction`] naming the first failing document.
    pub async fn extract_all(
        &self,
        extractor: Arc<dyn DocumentExtractor>,
        paths: Vec<PathBuf>,
    ) -> Result<Vec<ExtractedDocument>, PipelineError> {
        let jobs: Vec<_> = paths
            .into_iter()
            .map(|path| {
                let slots = Arc::clone(&self.slots);
                let counters = Arc::clone(&self.counters);
                let extractor = Arc::clone(&extractor);
                let name = display_name(&path);
                let job = tokio::spawn(async move {
                    let _permit = slots
                        .acquire_owned()
                        .await
                        .map_err(|_| ExtractionError::Pdf("extraction pool closed".into()))?;
                    let result = tokio::task::spawn_blocking(move || extractor.extract(&path))
                        .await
                        .unwrap_or(Err(ExtractionError::Panicked));
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                    if result.is_err() {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                    }
                    result
                });
                (name, job)
            })
            .collect();

        let (names, handles): (Vec<_>, Vec<_>) = jobs.into_iter().unzip();
        let results = join_all(handles).await;

        let mut documents = Vec::with_capacity(results.len());
        for (name, joined) in names.into_iter().zip(results) {
            let outcome = joined.map_err(|e| PipelineError::Worker(e.to_string()))?;
            match outcome {
                Ok(document) => {
                    tracing::debug!(
                        document = %name,
                        chars = document.text.len(),
                        links = document.hyperlinks.len(),
                        "extracted document"
                    );
                    documents.push(document);
                }
                Err(source) => {
                    return Err(PipelineError::Extraction {
                        document: name,
                        source,
                    })
                }
            }
        }
        Ok(documents)
    }

    /// Current statistics
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.size,
            available: self.slots.available_permits(),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Configured number of slots
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Default for ExtractionPool {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    /// Records peak concurrency; fails on names containing "bad"
    #[derive(Debug, Default)]
    struct Probe {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl DocumentExtractor for Probe {
        fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.running.fetch_sub(1, Ordering::SeqCst);

            let name = display_name(path);
            if name.contains("bad") {
                return Err(ExtractionError::Pdf("corrupt xref".into()));
            }
            Ok(ExtractedDocument {
                text: format!("text of {name}"),
                name,
                hyperlinks: Vec::new(),
            })
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn bounded_and_ordered() {
        let probe = Arc::new(Probe::default());
        let pool = ExtractionPool::new(2);
        let docs = pool
            .extract_all(probe.clone(), paths(&["1.pdf", "2.pdf", "3.pdf", "4.pdf", "5.pdf"]))
            .await
            .unwrap();

        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["1.pdf", "2.pdf", "3.pdf", "4.pdf", "5.pdf"]);
        assert!(probe.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.stats().completed, 5);
        assert_eq!(pool.stats().available, 2);
    }

    #[tokio::test]
    async fn one_failure_fails_the_batch() {
        let pool = ExtractionPool::new(3);
        let err = pool
            .extract_all(Arc::new(Probe::default()), paths(&["ok.pdf", "bad.pdf", "ok2.pdf"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Extraction { ref document, .. } if document == "bad.pdf"));
        assert_eq!(pool.stats().failed, 1);
        assert_eq!(pool.stats().available, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn abandoned_batch_releases_slots() {
        let pool = ExtractionPool::new(1);
        let batch = pool.extract_all(Arc::new(Probe::default()), paths(&["a.pdf", "b.pdf"]));
        // Start the jobs, then walk away.
        let _ = tokio::time::timeout(Duration::from_millis(5), batch).await;

        tokio::time::sleep(Duration::from_millis(200)).await;
        let stats = pool.stats();
        assert_eq!(stats.available, 1);
        assert_eq!(stats.completed, 2);
    }

    #[test]
    fn zero_size_is_promoted() {
        assert_eq!(ExtractionPool::new(0).size(), 1);
    }
}
