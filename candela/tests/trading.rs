mod helpers;

#[path = "trading/executor_orders.rs"]
mod executor_orders;
#[path = "trading/runner_jobs.rs"]
mod runner_jobs;
