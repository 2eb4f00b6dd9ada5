//! Batch worker
//!
//! Runs one pipeline per input row, committing each row's outputs before
//! charging for it.

use catena_core::domain::credentials::Credentials;
use catena_core::domain::job::{JobStatus, Progress};
use catena_core::domain::step::StepDefinition;
use catena_core::template::Variables;
use catena_runner::ChainLoader;
use serde_json::Value;
use tracing::info;

use super::context::JobContext;
use crate::repository::RepositoryError;

/// Work accepted for a batch job
pub struct BatchJob {
    pub steps: Vec<StepDefinition>,
    pub inputs: Variables,
    pub rows: Vec<Variables>,
    pub credentials: Credentials,
}

pub async fn run_batch(ctx: JobContext, loader: ChainLoader, job: BatchJob) {
    if let Err(e) = execute(&ctx, &loader, job).await {
        ctx.abandon(e).await;
    }
}

async fn execute(
    ctx: &JobContext,
    loader: &ChainLoader,
    job: BatchJob,
) -> Result<(), RepositoryError> {
    if ctx.is_cancelled() {
        return ctx.stopped().await;
    }

    let chain = match loader.load(&job.steps, &ctx.owner, &job.credentials).await {
        Ok(chain) => chain,
        Err(e) => {
            return ctx
                .fail(&format!("application load failure: {}", e))
                .await;
        }
    };

    let cost = ctx.quota().pipeline_cost(&job.steps, &job.credentials);
    let mut progress = Progress::new(job.rows.len());
    let mut results: Vec<Value> = Vec::with_capacity(job.rows.len());

    info!(
        "Batch job {} running {} rows at cost {} each",
        ctx.job_id, progress.total, cost
    );
    ctx.commit_progress(progress, &results).await?;

    for row in job.rows {
        if ctx.is_cancelled() {
            info!(
                "Batch job {} stopped after {} rows",
                ctx.job_id, progress.completed
            );
            return ctx.stopped().await;
        }

        if let Err(e) = ctx.admit(cost).await {
            return ctx.refuse(e).await;
        }

        let mut inputs = job.inputs.clone();
        inputs.extend(row);

        let outputs = match chain.run(inputs).await {
            Ok(outputs) => outputs,
            Err(e) => return ctx.fail(&e.to_string()).await,
        };

        results.push(Value::Object(outputs.into_iter().collect()));
        progress.completed += 1;
        ctx.commit_progress(progress, &results).await?;

        if let Err(e) = ctx.charge(cost).await {
            return ctx.refuse(e).await;
        }
    }

    ctx.finish(JobStatus::Completed, None).await
}
