//! The `queue` subcommands: read-only views over the job queue.

use clap::Subcommand;

/// Sub-commands available under `queue`.
#[derive(Debug, Subcommand)]
pub enum QueueCommands {
    /// Show per-status counts for a queue
    Stats {
        /// Queue name
        #[arg(long, default_value = "reports")]
        queue: String,
    },
    /// List a queue's jobs, newest first
    List {
        /// Queue name
        #[arg(long, default_value = "reports")]
        queue: String,
        /// Filter by status (pending, processing, completed, failed)
        #[arg(long)]
        status: Option<String>,
        /// Maximum number of jobs to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
}

pub(crate) async fn run_queue(pool: &sqlx::PgPool, command: QueueCommands) -> anyhow::Result<()> {
    match command {
        QueueCommands::Stats { queue } => {
            let stats = campdb_db::queue_stats(pool, &queue).await?;
            println!("queue: {queue}");
            println!("  pending:    {}", stats.pending);
            println!("  processing: {}", stats.processing);
            println!("  completed:  {}", stats.completed);
            println!("  failed:     {}", stats.failed);
            println!("  total:      {}", stats.total);
        }
        QueueCommands::List {
            queue,
            status,
            limit,
        } => {
            let jobs = campdb_db::list_jobs(pool, &queue, status.as_deref(), limit).await?;
            if jobs.is_empty() {
                println!("no jobs");
                return Ok(());
            }
            for job in &jobs {
                println!(
                    "{}  {:<10}  {}  attempts {}/{}  run_at {}{}",
                    job.public_id,
                    job.status,
                    job.job_type,
                    job.attempts,
                    job.max_attempts,
                    job.run_at.format("%Y-%m-%d %H:%M:%S"),
                    job.last_error
                        .as_deref()
                        .map(|e| format!("  last_error: {e}"))
                        .unwrap_or_default(),
                );
            }
        }
    }
    Ok(())
}
