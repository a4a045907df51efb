use crate::config::WorkerConfig;
use crate::services::metrics::record_scoring_run;
use crate::services::MatchingEngine;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One scoring request. Scoring runs for different documents share no
/// mutable state, so jobs fan out freely across workers.
#[derive(Debug, Clone)]
pub struct ScoringJob {
    pub tenant_id: Uuid,
    pub document_id: Uuid,
}

pub struct WorkerOrchestrator {
    config: WorkerConfig,
    engine: Arc<MatchingEngine>,
    job_tx: mpsc::Sender<ScoringJob>,
    job_rx: Option<mpsc::Receiver<ScoringJob>>,
    shutdown_token: CancellationToken,
}

impl WorkerOrchestrator {
    pub fn new(config: WorkerConfig, engine: Arc<MatchingEngine>) -> (Self, mpsc::Sender<ScoringJob>) {
        let (job_tx, job_rx) = mpsc::channel(config.queue_size);
        let shutdown_token = CancellationToken::new();

        let orchestrator = Self {
            config,
            engine,
            job_tx: job_tx.clone(),
            job_rx: Some(job_rx),
            shutdown_token,
        };

        (orchestrator, job_tx)
    }

    pub async fn start(mut self) {
        if !self.config.enabled {
            tracing::info!("Scoring worker pool disabled by configuration");
            return;
        }

        let mut job_rx = self.job_rx.take().expect("start() can only be called once");

        tracing::info!(
            worker_count = self.config.worker_count,
            "Starting scoring worker pool"
        );

        let mut workers = Vec::new();
        for worker_id in 0..self.config.worker_count {
            workers.push(Worker {
                id: worker_id,
                engine: self.engine.clone(),
            });
        }

        let shutdown = self.shutdown_token.clone();

        // Single distributor task hands jobs to workers round-robin.
        tokio::spawn(async move {
            let mut next_worker = 0;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("Job distributor shutting down");
                        break;
                    }
                    job = job_rx.recv() => {
                        match job {
                            Some(job) => {
                                let worker = &workers[next_worker];
                                next_worker = (next_worker + 1) % workers.len();

                                tracing::info!(
                                    worker_id = worker.id,
                                    document_id = %job.document_id,
                                    "Dispatching scoring job to worker"
                                );

                                let worker_clone = worker.clone();
                                tokio::spawn(async move {
                                    worker_clone.process_job(job).await;
                                });
                            }
                            None => {
                                tracing::info!("Channel closed, job distributor exiting");
                                break;
                            }
                        }
                    }
                }
            }
        });
    }

    pub async fn shutdown(&self) {
        tracing::info!("Initiating scoring worker pool shutdown");
        self.shutdown_token.cancel();
    }
}

#[derive(Clone)]
struct Worker {
    id: usize,
    engine: Arc<MatchingEngine>,
}

impl Worker {
    async fn process_job(&self, job: ScoringJob) {
        let start = Instant::now();

        tracing::info!(
            worker_id = self.id,
            document_id = %job.document_id,
            "Scoring job started"
        );

        // No in-worker retry: a scoring run is idempotent and the document
        // stays scorable, so the next process/rescore supersedes this run.
        match self
            .engine
            .score_document(job.tenant_id, job.document_id)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    worker_id = self.id,
                    document_id = %job.document_id,
                    duration_ms = start.elapsed().as_millis(),
                    "Scoring job finished"
                );
            }
            Err(e) => {
                record_scoring_run("error");
                tracing::error!(
                    worker_id = self.id,
                    document_id = %job.document_id,
                    error = %e,
                    "Scoring job failed"
                );
            }
        }
    }
}
