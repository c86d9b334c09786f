//! Deep Research Service
//!
//! Owns the research job state machine:
//!
//! 1. `initiate` stores a pending job and hands `run` to the spawner
//! 2. `run` marks the job in progress, calls the engine, enhances the answer
//!    and completes the job
//! 3. any failure after the job was started marks it failed (best effort,
//!    logged); a run that finds the job already started does nothing
//!
//! The caller of `initiate` only gets the job id back and polls for status.

use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::models::{NewResearchJob, ResearchJob, ResearchStatus};
use crate::research::client::{HttpResearchClient, ResearchEngine};
use crate::research::enhancer::{EnhancementContext, ResultEnhancer, TemplateEnhancer};
use crate::research::spawner::{TaskSpawner, TokioSpawner};
use crate::research::store::ResearchStore;
use crate::research::template::{ResearchParameters, ResearchTemplate};
use crate::types::{AppError, AppResult};

const TITLE_MAX_CHARS: usize = 100;

/// Input to [`DeepResearchService::initiate`]. Ranges and the project
/// reference are expected to be checked by the caller.
#[derive(Debug, Clone)]
pub struct InitiateResearch {
    pub query: String,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub template: ResearchTemplate,
    pub depth: Option<i32>,
    pub breadth: Option<i32>,
    pub client_context: Option<String>,
    pub industry_focus: Option<String>,
}

impl InitiateResearch {
    /// Explicit depth/breadth are used only when both are given.
    pub fn parameters(&self) -> ResearchParameters {
        match (self.depth, self.breadth) {
            (Some(depth), Some(breadth)) => ResearchParameters { depth, breadth },
            _ => self.template.parameters(),
        }
    }
}

#[derive(Clone)]
pub struct DeepResearchService {
    store: Arc<dyn ResearchStore>,
    engine: Arc<dyn ResearchEngine>,
    enhancer: Arc<dyn ResultEnhancer>,
    spawner: Arc<dyn TaskSpawner>,
}

impl DeepResearchService {
    pub fn new(
        store: Arc<dyn ResearchStore>,
        engine: Arc<dyn ResearchEngine>,
        enhancer: Arc<dyn ResultEnhancer>,
        spawner: Arc<dyn TaskSpawner>,
    ) -> Self {
        Self {
            store,
            engine,
            enhancer,
            spawner,
        }
    }

    /// HTTP engine at `api_url`, template enhancer, tokio spawner.
    pub fn with_engine_url(store: Arc<dyn ResearchStore>, api_url: &str) -> Self {
        Self::new(
            store,
            Arc::new(HttpResearchClient::new(api_url)),
            Arc::new(TemplateEnhancer),
            Arc::new(TokioSpawner),
        )
    }

    /// Stores a pending job and starts it in the background.
    ///
    /// Returns as soon as the record is stored; storage errors are returned
    /// here and no job is started.
    pub async fn initiate(&self, request: InitiateResearch) -> AppResult<Uuid> {
        if request.query.trim().is_empty() {
            return Err(AppError::InvalidRequest("Research query is required".to_string()));
        }

        let ResearchParameters { depth, breadth } = request.parameters();
        let job = self
            .store
            .create(NewResearchJob {
                title: request.query.chars().take(TITLE_MAX_CHARS).collect(),
                query: request.query,
                project_id: request.project_id,
                creator_id: request.user_id,
                depth,
                breadth,
                template: request.template,
                client_context: request.client_context,
                industry_focus: request.industry_focus,
            })
            .await?;

        info!(
            research_id = %job.id,
            project_id = %job.project_id,
            template = %job.template,
            depth,
            breadth,
            "Research initiated"
        );

        let service = self.clone();
        let id = job.id;
        self.spawner
            .spawn_detached(async move { service.run(id).await }.boxed());

        Ok(job.id)
    }

    /// Executes a stored job to a terminal status. Never returns an error:
    /// failures end up as `failed` on the record and in the log.
    ///
    /// A job that is no longer pending belongs to whichever run started it,
    /// so this run leaves it untouched.
    #[instrument(skip_all, fields(research_id = %id))]
    pub async fn run(&self, id: Uuid) {
        let job = match self.store.get(id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                error!("Research job not found, aborting");
                return;
            }
            Err(e) => {
                error!(error = %e, "Failed to load research job");
                self.mark_failed(id).await;
                return;
            }
        };

        match self.store.transition(id, ResearchStatus::InProgress, None).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(status = %job.status, "Research job already started or finished, aborting");
                return;
            }
            Err(e) => {
                error!(error = %e, "Failed to start research job");
                self.mark_failed(id).await;
                return;
            }
        }
        info!(depth = job.depth, breadth = job.breadth, "Research in progress");

        if let Err(e) = self.execute(job).await {
            error!(error = %e, "Research process failed");
            self.mark_failed(id).await;
        }
    }

    /// Engine call, enhancement and completion of a job this run has
    /// moved to `in_progress`.
    async fn execute(&self, job: ResearchJob) -> AppResult<()> {
        let raw = self
            .engine
            .fetch_research(&job.query, job.depth, job.breadth)
            .await?;

        let context = EnhancementContext {
            client_context: job.client_context.clone(),
            industry_focus: job.industry_focus.clone(),
        };
        let result = self.enhancer.enhance(raw, &context).await?;
        let learnings = result.learnings.len();

        if !self
            .store
            .transition(job.id, ResearchStatus::Completed, Some(result))
            .await?
        {
            return Err(AppError::Internal(format!(
                "research {} is no longer in progress",
                job.id
            )));
        }

        info!(learnings, "Research completed");
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid) {
        match self.store.transition(id, ResearchStatus::Failed, None).await {
            Ok(true) => warn!(research_id = %id, "Research marked as failed"),
            Ok(false) => warn!(research_id = %id, "Research missing or already finished, not marked as failed"),
            Err(e) => error!(research_id = %id, error = %e, "Failed to mark research as failed"),
        }
    }

    pub async fn get_research(&self, id: Uuid) -> AppResult<Option<ResearchJob>> {
        self.store.get(id).await
    }

    pub async fn list_research_for_project(&self, project_id: Uuid) -> AppResult<Vec<ResearchJob>> {
        self.store.list_for_project(project_id).await
    }

    /// Fails jobs a previous process left pending or in progress. Their
    /// background tasks died with that process, so nothing else will finish
    /// them.
    pub async fn reconcile_interrupted(&self) -> AppResult<u64> {
        let failed = self.store.fail_in_flight().await?;
        if failed > 0 {
            warn!(failed, "Marked interrupted research jobs as failed");
        } else {
            info!("No interrupted research jobs found");
        }
        Ok(failed)
    }
}
