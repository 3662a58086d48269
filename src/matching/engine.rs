// src/matching/engine.rs - Worker pool that scores every reference row against all candidates
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use indicatif::ProgressBar;
use log::{debug, error};

use crate::matching::policy::MatchMode;
use crate::matching::queue::{WorkItem, WorkQueue};
use crate::matching::similarity::PairScores;
use crate::models::matching::MatchResultRow;
use crate::models::record::Record;
use crate::models::stats_models::{EngineStats, ReferenceSide};
use crate::utils::progress_bars::logging::MatchingLogger;
use crate::utils::result_sink::{ResultSink, RunCounter};
use crate::utils::run_config::EngineConfig;
use crate::utils::run_log::RunLog;

/// One unit of work: a single reference row compared against every candidate.
pub struct MatchTask {
    /// 1-based position in the reference list
    pub reference_row: usize,
    pub references: Arc<Vec<Record>>,
    pub candidates: Arc<Vec<Record>>,
    pub threshold: u8,
    pub mode: MatchMode,
}

impl MatchTask {
    pub fn reference(&self) -> &Record {
        &self.references[self.reference_row - 1]
    }
}

/// Scores one task. Rows come back in candidate order; candidate row numbers
/// are 1-based positions in the candidate list.
pub fn score_task(task: &MatchTask) -> Vec<MatchResultRow> {
    let reference = task.reference();
    task.candidates
        .iter()
        .enumerate()
        .filter_map(|(idx, candidate)| {
            let scores = PairScores::between(reference, candidate);
            if !task.mode.is_match(&scores, task.threshold) {
                return None;
            }
            Some(MatchResultRow {
                reference_row: task.reference_row,
                reference_author: reference.author.clone(),
                reference_title: reference.title.clone(),
                candidate_row: idx + 1,
                candidate_author: candidate.author.clone(),
                candidate_title: candidate.title.clone(),
                author_score: scores.author,
                title_score: scores.title,
                combined_score: scores.combined,
            })
        })
        .collect()
}

/// Puts the smaller dataset on the reference side. On a tie the first
/// dataset stays the reference.
pub fn orient(first: Vec<Record>, second: Vec<Record>) -> (Vec<Record>, Vec<Record>, ReferenceSide) {
    if first.len() <= second.len() {
        (first, second, ReferenceSide::First)
    } else {
        (second, first, ReferenceSide::Second)
    }
}

/// State shared by every worker of one run.
struct WorkerContext {
    queue: WorkQueue<MatchTask>,
    sink: Arc<dyn ResultSink>,
    counter: Arc<RunCounter>,
    run_log: Arc<RunLog>,
    logger: MatchingLogger,
    progress: Option<ProgressBar>,
    total_rows: usize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

pub struct MatchingEngine {
    config: EngineConfig,
    sink: Arc<dyn ResultSink>,
    run_log: Arc<RunLog>,
    progress: Option<ProgressBar>,
}

impl MatchingEngine {
    pub fn new(config: EngineConfig, sink: Arc<dyn ResultSink>, run_log: Arc<RunLog>) -> Self {
        Self {
            config,
            sink,
            run_log,
            progress: None,
        }
    }

    pub fn with_progress_bar(mut self, progress: Option<ProgressBar>) -> Self {
        self.progress = progress;
        self
    }

    /// Runs one matching pass and returns once every worker has exited.
    ///
    /// The smaller of the two lists is iterated, one task per row. Tasks that
    /// fail are logged and skipped; they never stall the pool.
    pub async fn run(
        &self,
        first: Vec<Record>,
        second: Vec<Record>,
        threshold: u8,
        mode: MatchMode,
    ) -> Result<EngineStats> {
        let logger = MatchingLogger::new(mode);
        let (references, candidates, reference_side) = orient(first, second);
        let total_rows = references.len();
        let candidate_rows = candidates.len();
        logger.log_orientation(reference_side, total_rows, candidate_rows);
        self.run_log.log(&format!("Total rows in GR CSV={}", total_rows));

        let references = Arc::new(references);
        let candidates = Arc::new(candidates);
        let worker_count = self.config.worker_count.max(1);

        if let Some(pb) = &self.progress {
            pb.set_length(total_rows as u64);
        }

        let ctx = Arc::new(WorkerContext {
            queue: WorkQueue::new(self.config.queue_capacity),
            sink: Arc::clone(&self.sink),
            counter: Arc::new(RunCounter::new()),
            run_log: Arc::clone(&self.run_log),
            logger: logger.clone(),
            progress: self.progress.clone(),
            total_rows,
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        });

        let handles: Vec<_> = (0..worker_count)
            .map(|worker_id| tokio::spawn(worker_loop(worker_id, Arc::clone(&ctx))))
            .collect();
        logger.log_pool_start(worker_count, self.config.queue_capacity);
        self.run_log.log("Initialized threads. Adding rows to worker queue...");

        let mut enqueue_result = Ok(());
        for reference_row in 1..=total_rows {
            let task = MatchTask {
                reference_row,
                references: Arc::clone(&references),
                candidates: Arc::clone(&candidates),
                threshold,
                mode,
            };
            if let Err(e) = ctx.queue.put(task).await {
                enqueue_result = Err(e).context("Failed to enqueue match task");
                break;
            }
        }

        // Every enqueued task is done before any worker is told to stop.
        ctx.queue.join().await;
        let stop_result = ctx.queue.stop_workers(worker_count).await;

        for (worker_id, outcome) in join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = outcome {
                error!("💥 Worker {} panicked or failed to join: {:?}", worker_id, e);
            }
        }
        self.run_log.log("Stopped all worker threads.");

        let tasks_failed = ctx.failed.load(Ordering::Acquire);
        logger.log_pool_stopped(tasks_failed);
        if let Some(pb) = &self.progress {
            pb.finish_with_message(format!("{} matches", ctx.counter.get()));
        }

        enqueue_result?;
        stop_result.context("Failed to stop workers")?;

        Ok(EngineStats {
            reference_side,
            reference_rows: total_rows,
            candidate_rows,
            tasks_enqueued: total_rows,
            tasks_failed,
            total_matches: ctx.counter.get(),
        })
    }
}

async fn worker_loop(worker_id: usize, ctx: Arc<WorkerContext>) {
    debug!("Worker {} started", worker_id);
    loop {
        let task = match ctx.queue.get().await {
            Some(WorkItem::Task(task)) => task,
            Some(WorkItem::Stop) | None => break,
        };
        let reference_row = task.reference_row;

        match process_task(task, Arc::clone(&ctx.sink), Arc::clone(&ctx.counter)).await {
            Ok(running_total) => {
                ctx.run_log
                    .record_progress(reference_row, ctx.total_rows, running_total);
            }
            Err(e) => {
                ctx.failed.fetch_add(1, Ordering::AcqRel);
                ctx.run_log.error(&format!("Error occurred: {:#}", e));
                ctx.logger
                    .log_error(&format!("Worker {} skipped row {}", worker_id, reference_row));
            }
        }

        // Always mark the task done, even on failure, so join() can return.
        ctx.queue.task_done();

        let completed = ctx.completed.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(pb) = &ctx.progress {
            pb.inc(1);
        }
        ctx.logger
            .log_progress_update(completed, ctx.total_rows, ctx.counter.get());
    }
    debug!("Worker {} stopped", worker_id);
}

/// Scores and writes one task off the async runtime. A panic inside the
/// blocking section surfaces here as an error. Returns the running match total.
async fn process_task(
    task: MatchTask,
    sink: Arc<dyn ResultSink>,
    counter: Arc<RunCounter>,
) -> Result<usize> {
    let reference_row = task.reference_row;
    tokio::task::spawn_blocking(move || -> Result<usize> {
        let rows = score_task(&task);
        if rows.is_empty() {
            return Ok(counter.get());
        }
        sink.append(&rows)?;
        Ok(counter.add(rows.len()))
    })
    .await
    .with_context(|| format!("Worker panicked while processing row {}", reference_row))?
    .with_context(|| format!("Failed to process row {}", reference_row))
}
