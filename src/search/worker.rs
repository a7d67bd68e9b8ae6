use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::matcher::rank;
use crate::config::SearchConfig;

/// Matches produced by one search run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    pub generation: u64,
    pub query: String,
    pub matches: Vec<String>,
}

struct Running {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Background document search with cooperative cancellation.
///
/// At most one scan runs at a time. Starting a new one raises the previous
/// scan's stop flag and waits for it to finish first, so a cancelled scan
/// can never deliver after its replacement started.
pub struct SearchWorker {
    sender: mpsc::UnboundedSender<SearchResults>,
    check_interval: usize,
    generation: u64,
    running: Option<Running>,
}

impl SearchWorker {
    pub fn new(check_interval: usize) -> (Self, mpsc::UnboundedReceiver<SearchResults>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = Self { sender, check_interval, generation: 0, running: None };
        (worker, receiver)
    }

    pub fn from_config(config: &SearchConfig) -> (Self, mpsc::UnboundedReceiver<SearchResults>) {
        Self::new(config.cancel_check_interval)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `results` came from the newest started scan.
    pub fn is_current(&self, results: &SearchResults) -> bool {
        results.generation == self.generation
    }

    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.handle.is_finished())
    }

    /// Cancel any running scan and start a new one over `candidates`.
    pub async fn start(&mut self, query: impl Into<String>, candidates: Vec<String>) -> u64 {
        self.cancel().await;

        self.generation += 1;
        let generation = self.generation;
        let query = query.into();
        let stop = Arc::new(AtomicBool::new(false));
        let sender = self.sender.clone();
        let check_interval = self.check_interval;

        debug!(generation, query = %query, candidates = candidates.len(), "Search started");
        let handle = tokio::task::spawn_blocking({
            let stop = stop.clone();
            move || {
                let Some(matches) = rank(&query, &candidates, &stop, check_interval) else {
                    debug!(generation, "Search cancelled");
                    return;
                };
                if sender.send(SearchResults { generation, query, matches }).is_err() {
                    debug!(generation, "Search results dropped, receiver closed");
                }
            }
        });

        self.running = Some(Running { stop, handle });
        generation
    }

    /// Raise the stop flag of the running scan and wait for it to exit.
    pub async fn cancel(&mut self) {
        let Some(Running { stop, handle }) = self.running.take() else {
            return;
        };
        stop.store(true, Ordering::Relaxed);
        if let Err(err) = handle.await {
            warn!(error = %err, "Search task failed");
        }
    }
}

impl Drop for SearchWorker {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.stop.store(true, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_uses_check_interval() {
        let config = SearchConfig { cancel_check_interval: 3 };
        let (mut worker, mut results) = SearchWorker::from_config(&config);
        assert_eq!(worker.check_interval, 3);

        worker.start("b", vec!["a".to_string(), "b".to_string()]).await;
        assert_eq!(results.recv().await.unwrap().matches, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_start_delivers_ranked_results() {
        let (mut worker, mut results) = SearchWorker::new(64);
        let candidates = vec!["table".to_string(), "chair".to_string()];

        let generation = worker.start("ch", candidates).await;
        let found = results.recv().await.unwrap();

        assert_eq!(found.generation, generation);
        assert_eq!(found.matches, vec!["chair".to_string()]);
        assert!(worker.is_current(&found));
    }

    #[tokio::test]
    async fn test_generations_increase() {
        let (mut worker, _results) = SearchWorker::new(64);
        assert_eq!(worker.start("a", Vec::new()).await, 1);
        assert_eq!(worker.start("b", Vec::new()).await, 2);
        assert_eq!(worker.generation(), 2);
    }

    #[tokio::test]
    async fn test_cancel_without_running_scan() {
        let (mut worker, _results) = SearchWorker::new(64);
        worker.cancel().await;
        assert!(!worker.is_running());
    }
}
