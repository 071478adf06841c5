use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::dsl::sum;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{BigInt, Date, Nullable, Text, Timestamptz};
use std::collections::HashMap;
use uuid::Uuid;

use crate::shared::schema::{attachments, comments, tasks, time_logs, users};
use crate::shared::utils::{get_conn, DbConnection, DbPool};
use crate::tasks::aggregation::{MonthWindow, TopTask};
use crate::tasks::types::{
    minutes_between, Attachment, AttachmentStatus, Comment, NewAttachment, NewComment, NewTask,
    NewTimeLog, Task, TaskFilter, TaskPatch, TaskStatus, TimeLog,
};
use crate::users::types::{NewUser, User};

use super::{
    AttachmentStore, CommentStore, LoggedTotalsQuery, StoreError, StoreResult, TaskStore,
    TimeLogStore, UserStore, TIMER_OVERLAP,
};

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::Conflict(info.message().to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
pub struct DbUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tasks)]
pub struct DbTask {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub assignee_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbTask> for Task {
    type Error = StoreError;

    fn try_from(row: DbTask) -> Result<Self, Self::Error> {
        let status = row.status.parse::<TaskStatus>().map_err(StoreError::Query)?;
        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            assignee_id: row.assignee_id,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = tasks)]
struct TaskChangeset {
    title: Option<String>,
    description: Option<String>,
    status: Option<String>,
    assignee_id: Option<Uuid>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = comments)]
pub struct DbComment {
    pub id: Uuid,
    pub text: String,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbComment> for Comment {
    fn from(row: DbComment) -> Self {
        Self {
            id: row.id,
            text: row.text,
            task_id: row.task_id,
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = time_logs)]
pub struct DbTimeLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub date: Option<NaiveDate>,
    pub duration_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbTimeLog> for TimeLog {
    fn from(row: DbTimeLog) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            task_id: row.task_id,
            start_time: row.start_time,
            end_time: row.end_time,
            date: row.date,
            duration_minutes: row.duration_minutes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = attachments)]
pub struct DbAttachment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub filename: Option<String>,
    pub status: String,
    pub bucket: Option<String>,
    pub content_type: Option<String>,
    pub object_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbAttachment> for Attachment {
    type Error = StoreError;

    fn try_from(row: DbAttachment) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<AttachmentStatus>()
            .map_err(StoreError::Query)?;
        Ok(Self {
            id: row.id,
            task_id: row.task_id,
            filename: row.filename,
            status,
            bucket: row.bucket,
            content_type: row.content_type,
            object_name: row.object_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(QueryableByName)]
struct TopTaskRow {
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    id: Uuid,
    #[diesel(sql_type = Text)]
    title: String,
    #[diesel(sql_type = BigInt)]
    total_minutes: i64,
}

#[derive(QueryableByName)]
struct MinutesRow {
    #[diesel(sql_type = BigInt)]
    total_minutes: i64,
}

const LOGGED_TOTALS_SQL: &str = r#"
SELECT t.id, t.title, SUM(l.duration_minutes)::BIGINT AS total_minutes
FROM time_logs l
JOIN tasks t ON t.id = l.task_id
WHERE ($1::uuid IS NULL OR l.user_id = $1)
  AND ($2::timestamptz IS NULL OR (
        (l.start_time >= $2 AND l.end_time IS NOT NULL AND l.end_time < $3)
        OR (l.date >= $4 AND l.date < $5)))
GROUP BY t.id, t.title
HAVING COALESCE(SUM(l.duration_minutes), 0) > 0
ORDER BY total_minutes DESC, t.id ASC
LIMIT $6
"#;

const USER_LOGGED_MINUTES_SQL: &str = r#"
SELECT COALESCE(SUM(l.duration_minutes), 0)::BIGINT AS total_minutes
FROM time_logs l
WHERE l.user_id = $1
  AND ((l.start_time >= $2 AND l.end_time IS NOT NULL AND l.end_time < $3)
       OR (l.date >= $4 AND l.date < $5))
"#;

/// `ILIKE` pattern matching `search` literally anywhere in the value.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Diesel-backed store. Every call checks out a pooled connection on the
/// blocking thread pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut DbConnection) -> StoreResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = get_conn(&pool)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, task: NewTask) -> StoreResult<Task> {
        let now = Utc::now();
        let row = DbTask {
            id: Uuid::new_v4(),
            title: task.title,
            description: task.description,
            assignee_id: task.assignee_id,
            status: task.status.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.run(move |conn| {
            let saved = diesel::insert_into(tasks::table)
                .values(&row)
                .returning(DbTask::as_returning())
                .get_result::<DbTask>(conn)?;
            Task::try_from(saved)
        })
        .await
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        self.run(move |conn| {
            tasks::table
                .find(id)
                .select(DbTask::as_select())
                .first::<DbTask>(conn)
                .optional()?
                .map(Task::try_from)
                .transpose()
        })
        .await
    }

    async fn list_tasks(&self, filter: TaskFilter) -> StoreResult<Vec<Task>> {
        self.run(move |conn| {
            let mut query = tasks::table.select(DbTask::as_select()).into_boxed();

            if let Some(assignee) = filter.assignee {
                query = query.filter(tasks::assignee_id.eq(assignee));
            }
            if let Some(status) = filter.status {
                query = query.filter(tasks::status.eq(status.to_string()));
            }
            if let Some(ref search) = filter.search {
                query = query.filter(tasks::title.ilike(like_pattern(search)));
            }

            query
                .order(tasks::created_at.desc())
                .load::<DbTask>(conn)?
                .into_iter()
                .map(Task::try_from)
                .collect()
        })
        .await
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let changes = TaskChangeset {
            title: patch.title,
            description: patch.description,
            status: patch.status.map(|s| s.to_string()),
            assignee_id: patch.assignee_id,
            updated_at: Utc::now(),
        };
        self.run(move |conn| {
            diesel::update(tasks::table.find(id))
                .set(&changes)
                .returning(DbTask::as_returning())
                .get_result::<DbTask>(conn)
                .optional()?
                .map(Task::try_from)
                .transpose()
        })
        .await
    }

    async fn mark_completed(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let completed = TaskStatus::Completed.to_string();
        self.run(move |conn| {
            diesel::update(
                tasks::table
                    .filter(tasks::id.eq(id))
                    .filter(tasks::status.ne(&completed)),
            )
            .set((
                tasks::status.eq(&completed),
                tasks::updated_at.eq(Utc::now()),
            ))
            .returning(DbTask::as_returning())
            .get_result::<DbTask>(conn)
            .optional()?
            .map(Task::try_from)
            .transpose()
        })
        .await
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        self.run(move |conn| Ok(diesel::delete(tasks::table.find(id)).execute(conn)? > 0))
            .await
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let now = Utc::now();
        let row = DbComment {
            id: Uuid::new_v4(),
            text: comment.text,
            task_id: comment.task_id,
            author_id: comment.author_id,
            created_at: now,
            updated_at: now,
        };
        self.run(move |conn| {
            let saved = diesel::insert_into(comments::table)
                .values(&row)
                .returning(DbComment::as_returning())
                .get_result::<DbComment>(conn)?;
            Ok(Comment::from(saved))
        })
        .await
    }

    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        self.run(move |conn| {
            Ok(comments::table
                .find(id)
                .select(DbComment::as_select())
                .first::<DbComment>(conn)
                .optional()?
                .map(Comment::from))
        })
        .await
    }

    async fn list_comments(&self, task_id: Option<Uuid>) -> StoreResult<Vec<Comment>> {
        self.run(move |conn| {
            let mut query = comments::table.select(DbComment::as_select()).into_boxed();
            if let Some(task_id) = task_id {
                query = query.filter(comments::task_id.eq(task_id));
            }
            let rows = query
                .order(comments::created_at.asc())
                .load::<DbComment>(conn)?;
            Ok(rows.into_iter().map(Comment::from).collect())
        })
        .await
    }
}

#[async_trait]
impl TimeLogStore for PgStore {
    async fn start_timer(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        start_time: DateTime<Utc>,
    ) -> StoreResult<TimeLog> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                // serialises concurrent starts for the same user
                users::table
                    .find(user_id)
                    .select(users::id)
                    .for_update()
                    .first::<Uuid>(conn)?;

                let open: Vec<DbTimeLog> = time_logs::table
                    .filter(time_logs::user_id.eq(user_id))
                    .filter(time_logs::start_time.is_not_null())
                    .filter(time_logs::end_time.is_null())
                    .select(DbTimeLog::as_select())
                    .load::<DbTimeLog>(conn)?;

                let now = Utc::now();
                for log in open {
                    let started = log.start_time.unwrap_or(start_time);
                    if start_time <= started {
                        return Err(StoreError::Conflict(TIMER_OVERLAP.to_string()));
                    }
                    diesel::update(time_logs::table.find(log.id))
                        .set((
                            time_logs::end_time.eq(Some(start_time)),
                            time_logs::duration_minutes
                                .eq(Some(minutes_between(started, start_time))),
                            time_logs::updated_at.eq(now),
                        ))
                        .execute(conn)?;
                }

                let row = DbTimeLog {
                    id: Uuid::new_v4(),
                    user_id,
                    task_id,
                    start_time: Some(start_time),
                    end_time: None,
                    date: None,
                    duration_minutes: None,
                    created_at: now,
                    updated_at: now,
                };
                let saved = diesel::insert_into(time_logs::table)
                    .values(&row)
                    .returning(DbTimeLog::as_returning())
                    .get_result::<DbTimeLog>(conn)?;
                Ok(TimeLog::from(saved))
            })
        })
        .await
    }

    async fn active_timer(&self, user_id: Uuid, task_id: Uuid) -> StoreResult<Option<TimeLog>> {
        self.run(move |conn| {
            Ok(time_logs::table
                .filter(time_logs::user_id.eq(user_id))
                .filter(time_logs::task_id.eq(task_id))
                .filter(time_logs::start_time.is_not_null())
                .filter(time_logs::end_time.is_null())
                .select(DbTimeLog::as_select())
                .first::<DbTimeLog>(conn)
                .optional()?
                .map(TimeLog::from))
        })
        .await
    }

    async fn close_timer(
        &self,
        id: Uuid,
        end_time: DateTime<Utc>,
        duration_minutes: i32,
    ) -> StoreResult<Option<TimeLog>> {
        self.run(move |conn| {
            Ok(diesel::update(
                time_logs::table
                    .filter(time_logs::id.eq(id))
                    .filter(time_logs::end_time.is_null()),
            )
            .set((
                time_logs::end_time.eq(Some(end_time)),
                time_logs::duration_minutes.eq(Some(duration_minutes)),
                time_logs::updated_at.eq(Utc::now()),
            ))
            .returning(DbTimeLog::as_returning())
            .get_result::<DbTimeLog>(conn)
            .optional()?
            .map(TimeLog::from))
        })
        .await
    }

    async fn insert_time_log(&self, log: NewTimeLog) -> StoreResult<TimeLog> {
        let now = Utc::now();
        let row = DbTimeLog {
            id: Uuid::new_v4(),
            user_id: log.user_id,
            task_id: log.task_id,
            start_time: log.start_time,
            end_time: None,
            date: log.date,
            duration_minutes: log.duration_minutes,
            created_at: now,
            updated_at: now,
        };
        self.run(move |conn| {
            let saved = diesel::insert_into(time_logs::table)
                .values(&row)
                .returning(DbTimeLog::as_returning())
                .get_result::<DbTimeLog>(conn)?;
            Ok(TimeLog::from(saved))
        })
        .await
    }

    async fn get_time_log(&self, id: Uuid) -> StoreResult<Option<TimeLog>> {
        self.run(move |conn| {
            Ok(time_logs::table
                .find(id)
                .select(DbTimeLog::as_select())
                .first::<DbTimeLog>(conn)
                .optional()?
                .map(TimeLog::from))
        })
        .await
    }

    async fn list_time_logs(&self, task_id: Option<Uuid>) -> StoreResult<Vec<TimeLog>> {
        self.run(move |conn| {
            let mut query = time_logs::table.select(DbTimeLog::as_select()).into_boxed();
            if let Some(task_id) = task_id {
                query = query.filter(time_logs::task_id.eq(task_id));
            }
            let rows = query
                .order(time_logs::created_at.desc())
                .load::<DbTimeLog>(conn)?;
            Ok(rows.into_iter().map(TimeLog::from).collect())
        })
        .await
    }

    async fn delete_time_log(&self, id: Uuid) -> StoreResult<bool> {
        self.run(move |conn| Ok(diesel::delete(time_logs::table.find(id)).execute(conn)? > 0))
            .await
    }

    async fn total_logged_minutes(&self, task_ids: Vec<Uuid>) -> StoreResult<HashMap<Uuid, i64>> {
        if task_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.run(move |conn| {
            let rows: Vec<(Uuid, Option<i64>)> = time_logs::table
                .filter(time_logs::task_id.eq_any(&task_ids))
                .group_by(time_logs::task_id)
                .select((time_logs::task_id, sum(time_logs::duration_minutes)))
                .load(conn)?;
            Ok(rows
                .into_iter()
                .map(|(task_id, total)| (task_id, total.unwrap_or(0)))
                .collect())
        })
        .await
    }

    async fn logged_totals(&self, query: LoggedTotalsQuery) -> StoreResult<Vec<TopTask>> {
        self.run(move |conn| {
            let window = query.window;
            let rows: Vec<TopTaskRow> = diesel::sql_query(LOGGED_TOTALS_SQL)
                .bind::<Nullable<diesel::sql_types::Uuid>, _>(query.user_id)
                .bind::<Nullable<Timestamptz>, _>(window.map(|w| w.start))
                .bind::<Nullable<Timestamptz>, _>(window.map(|w| w.end))
                .bind::<Nullable<Date>, _>(window.map(|w| w.start_date()))
                .bind::<Nullable<Date>, _>(window.map(|w| w.end_date()))
                .bind::<BigInt, _>(query.limit)
                .load(conn)?;
            Ok(rows
                .into_iter()
                .map(|row| TopTask {
                    id: row.id,
                    title: row.title,
                    total_minutes: row.total_minutes,
                })
                .collect())
        })
        .await
    }

    async fn user_logged_minutes(&self, user_id: Uuid, window: MonthWindow) -> StoreResult<i64> {
        self.run(move |conn| {
            let row: MinutesRow = diesel::sql_query(USER_LOGGED_MINUTES_SQL)
                .bind::<diesel::sql_types::Uuid, _>(user_id)
                .bind::<Timestamptz, _>(window.start)
                .bind::<Timestamptz, _>(window.end)
                .bind::<Date, _>(window.start_date())
                .bind::<Date, _>(window.end_date())
                .get_result(conn)?;
            Ok(row.total_minutes)
        })
        .await
    }
}

#[async_trait]
impl AttachmentStore for PgStore {
    async fn insert_attachment(&self, attachment: NewAttachment) -> StoreResult<Attachment> {
        let now = Utc::now();
        let row = DbAttachment {
            id: Uuid::new_v4(),
            task_id: attachment.task_id,
            filename: attachment.filename,
            status: AttachmentStatus::Pending.to_string(),
            bucket: attachment.bucket,
            content_type: attachment.content_type,
            object_name: attachment.object_name,
            created_at: now,
            updated_at: now,
        };
        self.run(move |conn| {
            let saved = diesel::insert_into(attachments::table)
                .values(&row)
                .returning(DbAttachment::as_returning())
                .get_result::<DbAttachment>(conn)?;
            Attachment::try_from(saved)
        })
        .await
    }

    async fn list_attachments(&self, task_id: Option<Uuid>) -> StoreResult<Vec<Attachment>> {
        self.run(move |conn| {
            let mut query = attachments::table
                .select(DbAttachment::as_select())
                .into_boxed();
            if let Some(task_id) = task_id {
                query = query.filter(attachments::task_id.eq(task_id));
            }
            query
                .order(attachments::created_at.desc())
                .load::<DbAttachment>(conn)?
                .into_iter()
                .map(Attachment::try_from)
                .collect()
        })
        .await
    }

    async fn get_attachment_by_object_name(
        &self,
        object_name: &str,
    ) -> StoreResult<Option<Attachment>> {
        let object_name = object_name.to_string();
        self.run(move |conn| {
            attachments::table
                .filter(attachments::object_name.eq(&object_name))
                .select(DbAttachment::as_select())
                .first::<DbAttachment>(conn)
                .optional()?
                .map(Attachment::try_from)
                .transpose()
        })
        .await
    }

    async fn set_attachment_status(
        &self,
        id: Uuid,
        status: AttachmentStatus,
    ) -> StoreResult<Option<Attachment>> {
        self.run(move |conn| {
            diesel::update(attachments::table.find(id))
                .set((
                    attachments::status.eq(status.to_string()),
                    attachments::updated_at.eq(Utc::now()),
                ))
                .returning(DbAttachment::as_returning())
                .get_result::<DbAttachment>(conn)
                .optional()?
                .map(Attachment::try_from)
                .transpose()
        })
        .await
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let row = DbUser {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        self.run(move |conn| {
            let saved = diesel::insert_into(users::table)
                .values(&row)
                .returning(DbUser::as_returning())
                .get_result::<DbUser>(conn)?;
            Ok(User::from(saved))
        })
        .await
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.run(move |conn| {
            Ok(users::table
                .find(id)
                .select(DbUser::as_select())
                .first::<DbUser>(conn)
                .optional()?
                .map(User::from))
        })
        .await
    }

    async fn get_users(&self, ids: Vec<Uuid>) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.run(move |conn| {
            let rows = users::table
                .filter(users::id.eq_any(&ids))
                .select(DbUser::as_select())
                .load::<DbUser>(conn)?;
            Ok(rows.into_iter().map(User::from).collect())
        })
        .await
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let username = username.to_string();
        self.run(move |conn| {
            Ok(users::table
                .filter(users::username.eq(&username))
                .select(DbUser::as_select())
                .first::<DbUser>(conn)
                .optional()?
                .map(User::from))
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.to_string();
        self.run(move |conn| {
            Ok(users::table
                .filter(users::email.eq(&email))
                .select(DbUser::as_select())
                .first::<DbUser>(conn)
                .optional()?
                .map(User::from))
        })
        .await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.run(move |conn| {
            let rows = users::table
                .select(DbUser::as_select())
                .order(users::username.asc())
                .load::<DbUser>(conn)?;
            Ok(rows.into_iter().map(User::from).collect())
        })
        .await
    }
}
