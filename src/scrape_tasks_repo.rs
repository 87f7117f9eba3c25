use anyhow::Result;
use chrono::Utc;
use diesel::prelude::*;

use crate::db::PgPool;
use crate::scrape_tasks::{NewScrapeTask, ScrapeTask, TaskCounts};

#[derive(Clone)]
pub struct ScrapeTasksRepository {
    pool: PgPool,
}

impl ScrapeTasksRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert tasks, skipping (url, date) pairs that already exist.
    /// Returns the number of newly created tasks.
    pub async fn insert_tasks(&self, tasks: &[NewScrapeTask]) -> Result<usize> {
        use crate::schema::scrape_tasks;

        if tasks.is_empty() {
            return Ok(0);
        }

        let pool = self.pool.clone();
        let tasks = tasks.to_vec();

        let inserted = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let inserted = diesel::insert_into(scrape_tasks::table)
                .values(&tasks)
                .on_conflict((scrape_tasks::url, scrape_tasks::date))
                .do_nothing()
                .execute(&mut conn)?;

            Ok::<usize, anyhow::Error>(inserted)
        })
        .await??;

        Ok(inserted)
    }

    /// All tasks not yet processed, oldest first
    pub async fn get_pending(&self) -> Result<Vec<ScrapeTask>> {
        use crate::schema::scrape_tasks;

        let pool = self.pool.clone();

        let results = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let tasks: Vec<ScrapeTask> = scrape_tasks::table
                .filter(scrape_tasks::processed.eq(false))
                .order(scrape_tasks::id.asc())
                .select(ScrapeTask::as_select())
                .load(&mut conn)?;

            Ok::<Vec<ScrapeTask>, anyhow::Error>(tasks)
        })
        .await??;

        Ok(results)
    }

    /// Flip a task to processed. Never flips it back.
    pub async fn mark_processed(&self, task_id: i64) -> Result<bool> {
        use crate::schema::scrape_tasks;

        let pool = self.pool.clone();

        let rows_affected = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let rows = diesel::update(
                scrape_tasks::table
                    .filter(scrape_tasks::id.eq(task_id))
                    .filter(scrape_tasks::processed.eq(false)),
            )
            .set((
                scrape_tasks::processed.eq(true),
                scrape_tasks::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

            Ok::<usize, anyhow::Error>(rows)
        })
        .await??;

        Ok(rows_affected > 0)
    }

    pub async fn counts(&self) -> Result<TaskCounts> {
        use crate::schema::scrape_tasks;

        let pool = self.pool.clone();

        let rows = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let rows: Vec<(bool, i64)> = scrape_tasks::table
                .group_by(scrape_tasks::processed)
                .select((scrape_tasks::processed, diesel::dsl::count_star()))
                .load(&mut conn)?;

            Ok::<Vec<(bool, i64)>, anyhow::Error>(rows)
        })
        .await??;

        let mut counts = TaskCounts::default();
        for (processed, total) in rows {
            if processed {
                counts.processed = total;
            } else {
                counts.pending = total;
            }
        }
        Ok(counts)
    }
}
