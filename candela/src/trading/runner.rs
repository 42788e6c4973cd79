//! Scheduled strategy execution.
//!
//! The runner keeps one next-run instant per job. Each tick it runs every
//! due job (evaluate, then execute through the job's market executor) and
//! advances the job by one cycle. Failures are logged and reported; they
//! never stop the loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use candela_core::{CandelaError, OrderAck};

use super::config::JobConfig;
use super::executor::OrderExecutor;
use super::strategy::{Decision, StrategyContext, StrategyRegistry};
use crate::Candela;

/// Longest single sleep between schedule checks.
pub const DEFAULT_POLL: Duration = Duration::from_secs(60);

struct ScheduledJob {
    job: JobConfig,
    next: Option<DateTime<Utc>>,
}

/// Result of one job run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    /// Strategy that ran.
    pub strategy: String,
    /// Slot the run was due at.
    pub due: DateTime<Utc>,
    /// Decision and order acknowledgement, or the failure.
    pub result: Result<(Decision, Option<OrderAck>), CandelaError>,
}

/// Runs registered strategies on their schedules.
pub struct TradingRunner {
    candela: Arc<Candela>,
    registry: StrategyRegistry,
    executors: HashMap<String, OrderExecutor>,
    jobs: Vec<ScheduledJob>,
    poll: Duration,
}

impl TradingRunner {
    /// Runner over `registry`, reading data through `candela`.
    #[must_use]
    pub fn new(candela: Arc<Candela>, registry: StrategyRegistry) -> Self {
        Self {
            candela,
            registry,
            executors: HashMap::new(),
            jobs: Vec::new(),
            poll: DEFAULT_POLL,
        }
    }

    /// Route orders for `market` (e.g. `upbit`) through `executor`.
    #[must_use]
    pub fn with_executor(mut self, market: &str, executor: OrderExecutor) -> Self {
        self.executors.insert(market.to_ascii_lowercase(), executor);
        self
    }

    /// Cap the sleep between schedule checks.
    #[must_use]
    pub const fn poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// Schedule `job`.
    ///
    /// # Errors
    /// `NotFound` when the job names an unregistered strategy.
    pub fn add_job(&mut self, job: JobConfig) -> Result<(), CandelaError> {
        if self.registry.get(&job.strategy).is_none() {
            return Err(CandelaError::not_found(format!("strategy {}", job.strategy)));
        }
        self.jobs.push(ScheduledJob { job, next: None });
        Ok(())
    }

    /// Schedule every job in `jobs`.
    ///
    /// # Errors
    /// See [`add_job`](Self::add_job).
    pub fn with_jobs(mut self, jobs: impl IntoIterator<Item = JobConfig>) -> Result<Self, CandelaError> {
        for job in jobs {
            self.add_job(job)?;
        }
        Ok(self)
    }

    /// Earliest pending slot, once the jobs have been armed.
    #[must_use]
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.jobs.iter().filter_map(|j| j.next).min()
    }

    /// Evaluate `job` now and execute its decision.
    ///
    /// Markets without an executor evaluate the strategy but place no order.
    ///
    /// # Errors
    /// `NotFound` for an unknown strategy, `Strategy` when evaluation fails,
    /// or the executor error.
    pub async fn run_job(
        &self,
        job: &JobConfig,
        now: DateTime<Utc>,
    ) -> Result<(Decision, Option<OrderAck>), CandelaError> {
        let strategy = self
            .registry
            .get(&job.strategy)
            .ok_or_else(|| CandelaError::not_found(format!("strategy {}", job.strategy)))?;
        let ctx = StrategyContext {
            now,
            market: &job.market,
            budget: job.budget,
            candela: &self.candela,
        };
        let decision = strategy.evaluate(&ctx).await.map_err(|e| match e {
            e @ CandelaError::Strategy { .. } => e,
            other => CandelaError::Strategy {
                name: job.strategy.clone(),
                msg: other.to_string(),
            },
        })?;
        let Some(executor) = self.executors.get(&job.market) else {
            #[cfg(feature = "tracing")]
            tracing::warn!(market = %job.market, strategy = %job.strategy, "no executor for market; order skipped");
            return Ok((decision, None));
        };
        let budget = (job.budget > Decimal::ZERO).then_some(job.budget);
        let ack = executor.execute(&decision, budget).await?;
        Ok((decision, ack))
    }

    /// Run every job due at or before `now` and advance it one cycle.
    ///
    /// Jobs are armed on the first call: their first slot is the next one
    /// after `now`, so nothing fires immediately.
    pub async fn run_due(&mut self, now: DateTime<Utc>) -> Vec<JobOutcome> {
        let mut due = Vec::new();
        for (i, j) in self.jobs.iter_mut().enumerate() {
            match j.next {
                None => j.next = Some(j.job.schedule.next_after(now)),
                Some(at) if at <= now => {
                    due.push((i, at));
                    // A late runner skips missed slots rather than replaying them
                    let mut next = j.job.schedule.following(at);
                    if next <= now {
                        next = j.job.schedule.next_after(now);
                    }
                    j.next = Some(next);
                }
                Some(_) => {}
            }
        }

        let mut outcomes = Vec::with_capacity(due.len());
        for (i, at) in due {
            let job = &self.jobs[i].job;
            let result = self.run_job(job, now).await;
            #[cfg(feature = "tracing")]
            {
                match &result {
                    Ok((d, ack)) => tracing::info!(
                        strategy = %job.strategy,
                        action = ?d.action,
                        ticker = %d.ticker,
                        order = ack.as_ref().map_or("-", |a| a.id.as_str()),
                        "job ran"
                    ),
                    Err(e) => tracing::error!(strategy = %job.strategy, error = %e, "job failed"),
                }
            }
            outcomes.push(JobOutcome {
                strategy: job.strategy.clone(),
                due: at,
                result,
            });
        }
        outcomes
    }

    /// Run jobs on schedule until `cancel` fires.
    ///
    /// # Errors
    /// Returns `InvalidArg` when no jobs are scheduled; job failures never end the loop.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "candela::trading::run", skip(self, cancel), fields(jobs = self.jobs.len())),
    )]
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), CandelaError> {
        if self.jobs.is_empty() {
            return Err(CandelaError::InvalidArg("no trading jobs scheduled".into()));
        }
        loop {
            self.run_due(Utc::now()).await;
            let wait = self
                .next_due()
                .and_then(|at| (at - Utc::now()).to_std().ok())
                .map_or(self.poll, |d| d.min(self.poll));
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::info!("trading runner stopped");
                    return Ok(());
                }
                () = tokio::time::sleep(wait) => {}
            }
        }
    }
}
