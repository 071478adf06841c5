use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::cache::Cache;
use crate::shared::error::AppError;
use crate::store::{LoggedTotalsQuery, Store};

pub const TOP_TASKS_LIMIT: i64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopTask {
    pub id: Uuid,
    pub title: String,
    pub total_minutes: i64,
}

/// Half-open `[start, end)` interval covering one calendar month in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl MonthWindow {
    /// The calendar month before the one containing `now`.
    pub fn previous(now: DateTime<Utc>) -> Self {
        let current_first = first_day_of_month(now.date_naive());
        let previous_first = first_day_of_month(current_first - Days::new(1));
        Self {
            start: midnight(previous_first),
            end: midnight(current_first),
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }
}

pub fn cache_key(user_id: Uuid) -> String {
    format!("top_logged_tasks_by_user_{user_id}")
}

pub struct AggregationService {
    store: Arc<dyn Store>,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl AggregationService {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    pub async fn total_logged_minutes(&self, task_id: Uuid) -> Result<i64, AppError> {
        let totals = self.store.total_logged_minutes(vec![task_id]).await?;
        Ok(totals.get(&task_id).copied().unwrap_or(0))
    }

    pub async fn totals_for(&self, task_ids: Vec<Uuid>) -> Result<HashMap<Uuid, i64>, AppError> {
        Ok(self.store.total_logged_minutes(task_ids).await?)
    }

    pub async fn top_logged_tasks(
        &self,
        user_id: Uuid,
        window: MonthWindow,
        limit: i64,
    ) -> Result<Vec<TopTask>, AppError> {
        let query = LoggedTotalsQuery {
            user_id: Some(user_id),
            window: Some(window),
            limit,
        };
        Ok(self.store.logged_totals(query).await?)
    }

    /// JSON array of the user's top tasks for the previous month. Cached
    /// entries are returned as stored.
    pub async fn top_logged_tasks_last_month(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let key = cache_key(user_id);
        match self.cache.get(&key).await {
            Ok(Some(cached)) => {
                debug!("Cache hit for {key}");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => warn!("Cache read failed for {key}: {e}"),
        }

        let tasks = self
            .top_logged_tasks(user_id, MonthWindow::previous(now), TOP_TASKS_LIMIT)
            .await?;
        let json =
            serde_json::to_string(&tasks).map_err(|e| AppError::Internal(e.to_string()))?;

        if let Err(e) = self.cache.set(&key, &json, self.ttl).await {
            warn!("Cache write failed for {key}: {e}");
        }
        Ok(json)
    }

    pub async fn user_logged_minutes_last_month(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        Ok(self
            .store
            .user_logged_minutes(user_id, MonthWindow::previous(now))
            .await?)
    }
}
