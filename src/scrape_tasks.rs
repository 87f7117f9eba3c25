use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// One unit of crawl work: a listing URL, optionally narrowed to a single day
#[derive(Debug, Clone, PartialEq, Eq, Hash, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::scrape_tasks)]
pub struct NewScrapeTask {
    pub url: String,
    /// `YYYY-MM-DD`, or empty for the whole listing
    pub date: String,
}

impl NewScrapeTask {
    pub fn whole(url: &str) -> Self {
        Self {
            url: url.to_string(),
            date: String::new(),
        }
    }

    pub fn for_date(url: &str, date: &str) -> Self {
        Self {
            url: url.to_string(),
            date: date.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::scrape_tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ScrapeTask {
    pub id: i64,
    pub url: String,
    pub date: String,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScrapeTask {
    pub fn date_filter(&self) -> Option<&str> {
        let date = self.date.trim();
        (!date.is_empty()).then_some(date)
    }
}

/// Ledger totals, logged before and after a scrape run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub pending: i64,
    pub processed: i64,
}
