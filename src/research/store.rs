use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{NewResearchJob, ResearchJob, ResearchResult, ResearchStatus};
use crate::research::template::ResearchTemplate;
use crate::types::{AppError, AppResult};

/// Durable research job records.
///
/// Status changes go through [`ResearchStore::transition`], which only
/// applies when the stored status is a legal predecessor of the new one.
/// That makes each transition an atomic compare-and-set, so terminal jobs
/// can never be reopened.
#[async_trait]
pub trait ResearchStore: Send + Sync {
    async fn create(&self, job: NewResearchJob) -> AppResult<ResearchJob>;

    async fn get(&self, id: Uuid) -> AppResult<Option<ResearchJob>>;

    /// Jobs of one project, most recently created first.
    async fn list_for_project(&self, project_id: Uuid) -> AppResult<Vec<ResearchJob>>;

    /// Moves a job to `next`. Returns `false` when the job does not exist or
    /// is not in a state `next` may follow.
    async fn transition(
        &self,
        id: Uuid,
        next: ResearchStatus,
        result: Option<ResearchResult>,
    ) -> AppResult<bool>;

    /// Fails every pending or in-progress job. Returns how many were changed.
    async fn fail_in_flight(&self) -> AppResult<u64>;
}

fn check_transition_payload(next: ResearchStatus, result: &Option<ResearchResult>) -> AppResult<()> {
    match (next, result.is_some()) {
        (ResearchStatus::Completed, false) => Err(AppError::InvalidRequest(
            "a completed research job requires a result".to_string(),
        )),
        (ResearchStatus::Completed, true) | (_, false) => Ok(()),
        (other, true) => Err(AppError::InvalidRequest(format!(
            "a {} research job cannot carry a result",
            other
        ))),
    }
}

// PostgreSQL

#[derive(Debug, sqlx::FromRow)]
struct ResearchRow {
    id: Uuid,
    title: String,
    query: String,
    project_id: Uuid,
    creator_id: Uuid,
    depth: i32,
    breadth: i32,
    template: String,
    client_context: Option<String>,
    industry_focus: Option<String>,
    result: Option<Json<ResearchResult>>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ResearchRow> for ResearchJob {
    type Error = AppError;

    fn try_from(row: ResearchRow) -> Result<Self, Self::Error> {
        let template = ResearchTemplate::from_name(&row.template).ok_or_else(|| {
            AppError::Internal(format!("research {} has unknown template '{}'", row.id, row.template))
        })?;
        let status = ResearchStatus::from_name(&row.status).ok_or_else(|| {
            AppError::Internal(format!("research {} has unknown status '{}'", row.id, row.status))
        })?;

        Ok(ResearchJob {
            id: row.id,
            title: row.title,
            query: row.query,
            project_id: row.project_id,
            creator_id: row.creator_id,
            depth: row.depth,
            breadth: row.breadth,
            template,
            client_context: row.client_context,
            industry_focus: row.industry_focus,
            result: row.result.map(|Json(result)| result),
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgResearchStore {
    pool: PgPool,
}

impl PgResearchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResearchStore for PgResearchStore {
    async fn create(&self, job: NewResearchJob) -> AppResult<ResearchJob> {
        let row = sqlx::query_as::<_, ResearchRow>(
            r#"
            INSERT INTO research_jobs
                (id, title, query, project_id, creator_id, depth, breadth, template,
                 client_context, industry_focus, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&job.title)
        .bind(&job.query)
        .bind(job.project_id)
        .bind(job.creator_id)
        .bind(job.depth)
        .bind(job.breadth)
        .bind(job.template.as_str())
        .bind(&job.client_context)
        .bind(&job.industry_focus)
        .bind(ResearchStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<ResearchJob>> {
        let row = sqlx::query_as::<_, ResearchRow>("SELECT * FROM research_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ResearchJob::try_from).transpose()
    }

    async fn list_for_project(&self, project_id: Uuid) -> AppResult<Vec<ResearchJob>> {
        let rows = sqlx::query_as::<_, ResearchRow>(
            r#"
            SELECT * FROM research_jobs
            WHERE project_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ResearchJob::try_from).collect()
    }

    async fn transition(
        &self,
        id: Uuid,
        next: ResearchStatus,
        result: Option<ResearchResult>,
    ) -> AppResult<bool> {
        check_transition_payload(next, &result)?;

        let predecessors: Vec<String> = next
            .predecessors()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let outcome = sqlx::query(
            r#"
            UPDATE research_jobs
            SET status = $1, result = $2, updated_at = NOW()
            WHERE id = $3 AND status = ANY($4)
            "#,
        )
        .bind(next.as_str())
        .bind(result.map(Json))
        .bind(id)
        .bind(predecessors)
        .execute(&self.pool)
        .await?;

        Ok(outcome.rows_affected() > 0)
    }

    async fn fail_in_flight(&self) -> AppResult<u64> {
        let outcome = sqlx::query(
            r#"
            UPDATE research_jobs
            SET status = 'failed', updated_at = NOW()
            WHERE status IN ('pending', 'in_progress')
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(outcome.rows_affected())
    }
}

// In-process

struct StoredJob {
    seq: u64,
    job: ResearchJob,
    history: Vec<ResearchStatus>,
}

#[derive(Default)]
struct MemoryState {
    jobs: HashMap<Uuid, StoredJob>,
    next_seq: u64,
}

/// Process-local store. Records every status a job passes through.
#[derive(Clone, Default)]
pub struct InMemoryResearchStore {
    inner: Arc<RwLock<MemoryState>>,
}

impl InMemoryResearchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses a job has held, oldest first.
    pub async fn status_history(&self, id: Uuid) -> Vec<ResearchStatus> {
        let guard = self.inner.read().await;
        guard
            .jobs
            .get(&id)
            .map(|stored| stored.history.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResearchStore for InMemoryResearchStore {
    async fn create(&self, job: NewResearchJob) -> AppResult<ResearchJob> {
        let now = Utc::now();
        let record = ResearchJob {
            id: Uuid::new_v4(),
            title: job.title,
            query: job.query,
            project_id: job.project_id,
            creator_id: job.creator_id,
            depth: job.depth,
            breadth: job.breadth,
            template: job.template,
            client_context: job.client_context,
            industry_focus: job.industry_focus,
            result: None,
            status: ResearchStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let mut guard = self.inner.write().await;
        let seq = guard.next_seq;
        guard.next_seq += 1;
        guard.jobs.insert(
            record.id,
            StoredJob {
                seq,
                job: record.clone(),
                history: vec![ResearchStatus::Pending],
            },
        );

        Ok(record)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<ResearchJob>> {
        let guard = self.inner.read().await;
        Ok(guard.jobs.get(&id).map(|stored| stored.job.clone()))
    }

    async fn list_for_project(&self, project_id: Uuid) -> AppResult<Vec<ResearchJob>> {
        let guard = self.inner.read().await;
        let mut matching: Vec<&StoredJob> = guard
            .jobs
            .values()
            .filter(|stored| stored.job.project_id == project_id)
            .collect();
        matching.sort_by(|a, b| {
            b.job
                .created_at
                .cmp(&a.job.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        Ok(matching.into_iter().map(|stored| stored.job.clone()).collect())
    }

    async fn transition(
        &self,
        id: Uuid,
        next: ResearchStatus,
        result: Option<ResearchResult>,
    ) -> AppResult<bool> {
        check_transition_payload(next, &result)?;

        let mut guard = self.inner.write().await;
        let Some(stored) = guard.jobs.get_mut(&id) else {
            return Ok(false);
        };
        if !stored.job.status.can_transition_to(next) {
            return Ok(false);
        }

        stored.job.status = next;
        stored.job.result = result;
        stored.job.updated_at = Utc::now();
        stored.history.push(next);
        Ok(true)
    }

    async fn fail_in_flight(&self) -> AppResult<u64> {
        let mut guard = self.inner.write().await;
        let now = Utc::now();
        let mut changed = 0;
        for stored in guard.jobs.values_mut() {
            if !stored.job.status.is_terminal() {
                stored.job.status = ResearchStatus::Failed;
                stored.job.result = None;
                stored.job.updated_at = now;
                stored.history.push(ResearchStatus::Failed);
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job(project_id: Uuid, query: &str) -> NewResearchJob {
        NewResearchJob {
            title: query.to_string(),
            query: query.to_string(),
            project_id,
            creator_id: Uuid::new_v4(),
            depth: 2,
            breadth: 4,
            template: ResearchTemplate::Custom,
            client_context: None,
            industry_focus: None,
        }
    }

    fn result() -> ResearchResult {
        ResearchResult {
            answer: "answer".to_string(),
            learnings: vec![],
            visited_urls: vec![],
            executive_summary: None,
            recommendations: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryResearchStore::new();
        let created = store.create(new_job(Uuid::new_v4(), "q")).await.unwrap();

        assert_eq!(created.status, ResearchStatus::Pending);
        assert!(created.result.is_none());

        let loaded = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, created.id);
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_for_project_newest_first() {
        let store = InMemoryResearchStore::new();
        let project = Uuid::new_v4();
        let other = Uuid::new_v4();

        let first = store.create(new_job(project, "first")).await.unwrap();
        let _foreign = store.create(new_job(other, "foreign")).await.unwrap();
        let second = store.create(new_job(project, "second")).await.unwrap();
        let third = store.create(new_job(project, "third")).await.unwrap();

        let listed: Vec<Uuid> = store
            .list_for_project(project)
            .await
            .unwrap()
            .into_iter()
            .map(|job| job.id)
            .collect();
        assert_eq!(listed, vec![third.id, second.id, first.id]);
    }

    #[tokio::test]
    async fn test_transitions_follow_state_machine() {
        let store = InMemoryResearchStore::new();
        let job = store.create(new_job(Uuid::new_v4(), "q")).await.unwrap();

        // Cannot skip in_progress
        assert!(!store.transition(job.id, ResearchStatus::Completed, Some(result())).await.unwrap());
        assert!(store.transition(job.id, ResearchStatus::InProgress, None).await.unwrap());
        assert!(store.transition(job.id, ResearchStatus::Completed, Some(result())).await.unwrap());

        // Terminal
        assert!(!store.transition(job.id, ResearchStatus::Failed, None).await.unwrap());
        assert!(!store.transition(job.id, ResearchStatus::InProgress, None).await.unwrap());

        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ResearchStatus::Completed);
        assert_eq!(stored.result, Some(result()));
        assert_eq!(
            store.status_history(job.id).await,
            vec![ResearchStatus::Pending, ResearchStatus::InProgress, ResearchStatus::Completed]
        );
    }

    #[tokio::test]
    async fn test_transition_payload_must_match_status() {
        let store = InMemoryResearchStore::new();
        let job = store.create(new_job(Uuid::new_v4(), "q")).await.unwrap();
        store.transition(job.id, ResearchStatus::InProgress, None).await.unwrap();

        assert!(store.transition(job.id, ResearchStatus::Completed, None).await.is_err());
        assert!(store.transition(job.id, ResearchStatus::Failed, Some(result())).await.is_err());
        assert_eq!(
            store.get(job.id).await.unwrap().unwrap().status,
            ResearchStatus::InProgress
        );
    }

    #[tokio::test]
    async fn test_transition_missing_job() {
        let store = InMemoryResearchStore::new();
        assert!(!store.transition(Uuid::new_v4(), ResearchStatus::Failed, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_fail_in_flight() {
        let store = InMemoryResearchStore::new();
        let project = Uuid::new_v4();
        let pending = store.create(new_job(project, "pending")).await.unwrap();
        let running = store.create(new_job(project, "running")).await.unwrap();
        let done = store.create(new_job(project, "done")).await.unwrap();

        store.transition(running.id, ResearchStatus::InProgress, None).await.unwrap();
        store.transition(done.id, ResearchStatus::InProgress, None).await.unwrap();
        store.transition(done.id, ResearchStatus::Completed, Some(result())).await.unwrap();

        assert_eq!(store.fail_in_flight().await.unwrap(), 2);

        let status = |id| {
            let store = store.clone();
            async move { store.get(id).await.unwrap().unwrap().status }
        };
        assert_eq!(status(pending.id).await, ResearchStatus::Failed);
        assert_eq!(status(running.id).await, ResearchStatus::Failed);
        assert_eq!(status(done.id).await, ResearchStatus::Completed);
        assert_eq!(store.fail_in_flight().await.unwrap(), 0);
    }

    // PostgreSQL, run when DATABASE_URL is set

    mod postgres {
        use super::*;
        use crate::db::test_support::{seed_project, seed_user, test_database};
        use std::time::Duration;

        fn full_result() -> ResearchResult {
            ResearchResult {
                answer: "Freight rates fell 12% year over year.".to_string(),
                learnings: vec!["Spot rates lead contract rates".to_string()],
                visited_urls: vec!["https://freight.example/report".to_string()],
                executive_summary: Some("Executive Summary: Freight rates fell".to_string()),
                recommendations: Some(vec!["Renegotiate contracts".to_string()]),
            }
        }

        #[tokio::test]
        async fn test_pg_transitions_and_result() {
            let Some((_guard, pool)) = test_database().await else { return };
            let owner = seed_user(&pool, "Store").await;
            let project = seed_project(&pool, &owner, vec![]).await;
            let store = PgResearchStore::new(pool);

            let mut job = new_job(project.id, "freight outlook");
            job.creator_id = owner.id;
            job.template = ResearchTemplate::CompetitiveAnalysis;
            let created = store.create(job).await.unwrap();
            assert_eq!(created.status, ResearchStatus::Pending);
            assert_eq!(created.template, ResearchTemplate::CompetitiveAnalysis);

            assert!(!store.transition(created.id, ResearchStatus::Completed, Some(full_result())).await.unwrap());
            assert!(store.transition(created.id, ResearchStatus::InProgress, None).await.unwrap());
            assert!(!store.transition(created.id, ResearchStatus::InProgress, None).await.unwrap());
            assert!(store.transition(created.id, ResearchStatus::Completed, Some(full_result())).await.unwrap());
            assert!(!store.transition(created.id, ResearchStatus::Failed, None).await.unwrap());

            let loaded = store.get(created.id).await.unwrap().unwrap();
            assert_eq!(loaded.status, ResearchStatus::Completed);
            assert_eq!(loaded.result, Some(full_result()));

            assert!(!store.transition(Uuid::new_v4(), ResearchStatus::Failed, None).await.unwrap());
            assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_pg_list_and_fail_in_flight() {
            let Some((_guard, pool)) = test_database().await else { return };
            let owner = seed_user(&pool, "Store").await;
            let project = seed_project(&pool, &owner, vec![]).await;
            let store = PgResearchStore::new(pool);

            let mut ids = Vec::new();
            for query in ["pending", "running", "done"] {
                let mut job = new_job(project.id, query);
                job.creator_id = owner.id;
                ids.push(store.create(job).await.unwrap().id);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            let (pending, running, done) = (ids[0], ids[1], ids[2]);

            store.transition(running, ResearchStatus::InProgress, None).await.unwrap();
            store.transition(done, ResearchStatus::InProgress, None).await.unwrap();
            store.transition(done, ResearchStatus::Completed, Some(full_result())).await.unwrap();

            let listed: Vec<Uuid> = store
                .list_for_project(project.id)
                .await
                .unwrap()
                .into_iter()
                .map(|job| job.id)
                .collect();
            assert_eq!(listed, vec![done, running, pending]);

            // Other tests may have left jobs behind in the same database
            assert!(store.fail_in_flight().await.unwrap() >= 2);
            for id in [pending, running] {
                let job = store.get(id).await.unwrap().unwrap();
                assert_eq!(job.status, ResearchStatus::Failed);
                assert!(job.result.is_none());
            }
            assert_eq!(store.get(done).await.unwrap().unwrap().status, ResearchStatus::Completed);
            assert_eq!(store.fail_in_flight().await.unwrap(), 0);
        }
    }
}
