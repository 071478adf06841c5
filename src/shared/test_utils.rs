//! In-memory stand-ins for the database, search index, mailer and object
//! storage, plus a fixture that wires them together.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;
use uuid::Uuid;

use crate::api_router::build_router;
use crate::auth::TokenKind;
use crate::cache::MemoryCache;
use crate::config::AppConfig;
use crate::drive::{AttachmentService, ObjectStorage, StorageError};
use crate::notifications::{
    MailError, Mailer, NotificationDispatcher, NotificationJob, NotificationQueue, OutgoingEmail,
};
use crate::search::{
    Document, DocumentIndex, IndexError, SearchHit, SearchSynchronizer, SearchTarget,
};
use crate::shared::state::AppState;
use crate::store::{
    AttachmentStore, CommentStore, LoggedTotalsQuery, StoreError, StoreResult, TaskStore,
    TimeLogStore, UserStore, TIMER_OVERLAP,
};
use crate::tasks::aggregation::{MonthWindow, TopTask};
use crate::tasks::lifecycle::TaskLifecycle;
use crate::tasks::types::{
    minutes_between, Attachment, AttachmentStatus, Comment, NewAttachment, NewComment, NewTask,
    NewTimeLog, Task, TaskFilter, TaskPatch, TaskStatus, TimeLog,
};
use crate::users::types::{NewUser, User};

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_WEBHOOK_TOKEN: &str = "hook-token";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tasks: Vec<Task>,
    comments: Vec<Comment>,
    time_logs: Vec<TimeLog>,
    attachments: Vec<Attachment>,
}

/// Mirrors the PostgreSQL store, including cascades, ordering and the
/// time-window predicates of the aggregate queries.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    completed_elsewhere: AtomicBool,
}

impl MemoryStore {
    /// The next `mark_completed` finds the task already completed by
    /// another writer, as if it lost the race.
    pub fn complete_elsewhere_next(&self) {
        self.completed_elsewhere.store(true, Ordering::SeqCst);
    }
}

fn in_window(log: &TimeLog, window: &MonthWindow) -> bool {
    let timed = match (log.start_time, log.end_time) {
        (Some(start), Some(end)) => start >= window.start && end < window.end,
        _ => false,
    };
    let dated = log
        .date
        .is_some_and(|date| date >= window.start_date() && date < window.end_date());
    timed || dated
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: NewTask) -> StoreResult<Task> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: task.title,
            description: task.description,
            assignee_id: task.assignee_id,
            status: task.status,
            created_at: now,
            updated_at: now,
        };
        lock(&self.tables).tasks.push(task.clone());
        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let tables = lock(&self.tables);
        Ok(tables.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tasks(&self, filter: TaskFilter) -> StoreResult<Vec<Task>> {
        let search = filter.search.map(|s| s.to_lowercase());
        Ok(lock(&self.tables)
            .tasks
            .iter()
            .rev()
            .filter(|t| filter.assignee.map_or(true, |a| t.assignee_id == a))
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .filter(|t| {
                search
                    .as_ref()
                    .map_or(true, |s| t.title.to_lowercase().contains(s))
            })
            .cloned()
            .collect())
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let mut tables = lock(&self.tables);
        let Some(task) = tables.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(assignee) = patch.assignee_id {
            task.assignee_id = assignee;
        }
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn mark_completed(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let mut tables = lock(&self.tables);
        if self.completed_elsewhere.swap(false, Ordering::SeqCst) {
            if let Some(task) = tables.tasks.iter_mut().find(|t| t.id == id) {
                task.status = TaskStatus::Completed;
            }
        }
        let Some(task) = tables
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.status != TaskStatus::Completed)
        else {
            return Ok(None);
        };
        task.status = TaskStatus::Completed;
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = lock(&self.tables);
        let before = tables.tasks.len();
        tables.tasks.retain(|t| t.id != id);
        if tables.tasks.len() == before {
            return Ok(false);
        }
        tables.comments.retain(|c| c.task_id != id);
        tables.time_logs.retain(|l| l.task_id != id);
        tables.attachments.retain(|a| a.task_id != id);
        Ok(true)
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            text: comment.text,
            task_id: comment.task_id,
            author_id: comment.author_id,
            created_at: now,
            updated_at: now,
        };
        lock(&self.tables).comments.push(comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let tables = lock(&self.tables);
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_comments(&self, task_id: Option<Uuid>) -> StoreResult<Vec<Comment>> {
        Ok(lock(&self.tables)
            .comments
            .iter()
            .filter(|c| task_id.map_or(true, |t| c.task_id == t))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TimeLogStore for MemoryStore {
    async fn start_timer(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        start_time: DateTime<Utc>,
    ) -> StoreResult<TimeLog> {
        let mut tables = lock(&self.tables);
        if !tables.users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::Query("Record not found".to_string()));
        }

        let open_starts: Vec<DateTime<Utc>> = tables
            .time_logs
            .iter()
            .filter(|l| l.user_id == user_id && l.is_active_timer())
            .filter_map(|l| l.start_time)
            .collect();
        if open_starts.iter().any(|started| start_time <= *started) {
            return Err(StoreError::Conflict(TIMER_OVERLAP.to_string()));
        }

        let now = Utc::now();
        for log in tables
            .time_logs
            .iter_mut()
            .filter(|l| l.user_id == user_id && l.is_active_timer())
        {
            let started = log.start_time.unwrap_or(start_time);
            log.end_time = Some(start_time);
            log.duration_minutes = Some(minutes_between(started, start_time));
            log.updated_at = now;
        }

        let log = TimeLog {
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
        tables.time_logs.push(log.clone());
        Ok(log)
    }

    async fn active_timer(&self, user_id: Uuid, task_id: Uuid) -> StoreResult<Option<TimeLog>> {
        Ok(lock(&self.tables)
            .time_logs
            .iter()
            .find(|l| l.user_id == user_id && l.task_id == task_id && l.is_active_timer())
            .cloned())
    }

    async fn close_timer(
        &self,
        id: Uuid,
        end_time: DateTime<Utc>,
        duration_minutes: i32,
    ) -> StoreResult<Option<TimeLog>> {
        let mut tables = lock(&self.tables);
        let Some(log) = tables
            .time_logs
            .iter_mut()
            .find(|l| l.id == id && l.end_time.is_none())
        else {
            return Ok(None);
        };
        log.end_time = Some(end_time);
        log.duration_minutes = Some(duration_minutes);
        log.updated_at = Utc::now();
        Ok(Some(log.clone()))
    }

    async fn insert_time_log(&self, log: NewTimeLog) -> StoreResult<TimeLog> {
        let now = Utc::now();
        let log = TimeLog {
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
        lock(&self.tables).time_logs.push(log.clone());
        Ok(log)
    }

    async fn get_time_log(&self, id: Uuid) -> StoreResult<Option<TimeLog>> {
        let tables = lock(&self.tables);
        Ok(tables.time_logs.iter().find(|l| l.id == id).cloned())
    }

    async fn list_time_logs(&self, task_id: Option<Uuid>) -> StoreResult<Vec<TimeLog>> {
        Ok(lock(&self.tables)
            .time_logs
            .iter()
            .rev()
            .filter(|l| task_id.map_or(true, |t| l.task_id == t))
            .cloned()
            .collect())
    }

    async fn delete_time_log(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = lock(&self.tables);
        let before = tables.time_logs.len();
        tables.time_logs.retain(|l| l.id != id);
        Ok(tables.time_logs.len() != before)
    }

    async fn total_logged_minutes(&self, task_ids: Vec<Uuid>) -> StoreResult<HashMap<Uuid, i64>> {
        let mut totals = HashMap::new();
        for log in lock(&self.tables)
            .time_logs
            .iter()
            .filter(|l| task_ids.contains(&l.task_id))
        {
            *totals.entry(log.task_id).or_insert(0) += i64::from(log.duration_minutes.unwrap_or(0));
        }
        Ok(totals)
    }

    async fn logged_totals(&self, query: LoggedTotalsQuery) -> StoreResult<Vec<TopTask>> {
        let tables = lock(&self.tables);
        let mut sums: BTreeMap<Uuid, i64> = BTreeMap::new();
        for log in tables
            .time_logs
            .iter()
            .filter(|l| query.user_id.map_or(true, |u| l.user_id == u))
            .filter(|l| query.window.as_ref().map_or(true, |w| in_window(l, w)))
        {
            *sums.entry(log.task_id).or_insert(0) += i64::from(log.duration_minutes.unwrap_or(0));
        }

        let mut totals: Vec<TopTask> = sums
            .into_iter()
            .filter(|(_, total)| *total > 0)
            .filter_map(|(id, total_minutes)| {
                let task = tables.tasks.iter().find(|t| t.id == id)?;
                Some(TopTask {
                    id,
                    title: task.title.clone(),
                    total_minutes,
                })
            })
            .collect();
        totals.sort_by(|a, b| b.total_minutes.cmp(&a.total_minutes).then(a.id.cmp(&b.id)));
        totals.truncate(usize::try_from(query.limit).unwrap_or(0));
        Ok(totals)
    }

    async fn user_logged_minutes(&self, user_id: Uuid, window: MonthWindow) -> StoreResult<i64> {
        Ok(lock(&self.tables)
            .time_logs
            .iter()
            .filter(|l| l.user_id == user_id && in_window(l, &window))
            .map(|l| i64::from(l.duration_minutes.unwrap_or(0)))
            .sum())
    }
}

#[async_trait]
impl AttachmentStore for MemoryStore {
    async fn insert_attachment(&self, attachment: NewAttachment) -> StoreResult<Attachment> {
        let mut tables = lock(&self.tables);
        if tables
            .attachments
            .iter()
            .any(|a| a.object_name == attachment.object_name)
        {
            return Err(StoreError::Conflict("duplicate object_name".to_string()));
        }
        let now = Utc::now();
        let attachment = Attachment {
            id: Uuid::new_v4(),
            task_id: attachment.task_id,
            filename: attachment.filename,
            status: AttachmentStatus::Pending,
            bucket: attachment.bucket,
            content_type: attachment.content_type,
            object_name: attachment.object_name,
            created_at: now,
            updated_at: now,
        };
        tables.attachments.push(attachment.clone());
        Ok(attachment)
    }

    async fn list_attachments(&self, task_id: Option<Uuid>) -> StoreResult<Vec<Attachment>> {
        Ok(lock(&self.tables)
            .attachments
            .iter()
            .rev()
            .filter(|a| task_id.map_or(true, |t| a.task_id == t))
            .cloned()
            .collect())
    }

    async fn get_attachment_by_object_name(
        &self,
        object_name: &str,
    ) -> StoreResult<Option<Attachment>> {
        Ok(lock(&self.tables)
            .attachments
            .iter()
            .find(|a| a.object_name == object_name)
            .cloned())
    }

    async fn set_attachment_status(
        &self,
        id: Uuid,
        status: AttachmentStatus,
    ) -> StoreResult<Option<Attachment>> {
        let mut tables = lock(&self.tables);
        let Some(attachment) = tables.attachments.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        attachment.status = status;
        attachment.updated_at = Utc::now();
        Ok(Some(attachment.clone()))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = lock(&self.tables);
        if tables
            .users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(StoreError::Conflict(
                "duplicate key value violates unique constraint".to_string(),
            ));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = lock(&self.tables);
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_users(&self, ids: Vec<Uuid>) -> StoreResult<Vec<User>> {
        Ok(lock(&self.tables)
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(lock(&self.tables)
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = lock(&self.tables);
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users = lock(&self.tables).users.clone();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }
}

/// Document index with a naive relevance score: a title hit outranks a hit
/// in any other field.
#[derive(Default)]
pub struct FakeIndex {
    documents: Mutex<HashMap<(SearchTarget, Uuid), Document>>,
    failing: AtomicBool,
    search_calls: AtomicUsize,
}

impl FakeIndex {
    pub fn document(&self, target: SearchTarget, id: Uuid) -> Option<Document> {
        lock(&self.documents).get(&(target, id)).cloned()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), IndexError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(IndexError::Connection("index unavailable".to_string()));
        }
        Ok(())
    }
}

fn field_matches(document: &Document, field: &str, query: &str) -> bool {
    document
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|value| value.to_lowercase().contains(query))
}

#[async_trait]
impl DocumentIndex for FakeIndex {
    async fn get(&self, target: SearchTarget, id: Uuid) -> Result<Option<Document>, IndexError> {
        self.check()?;
        Ok(self.document(target, id))
    }

    async fn put(
        &self,
        target: SearchTarget,
        id: Uuid,
        source: Document,
    ) -> Result<(), IndexError> {
        self.check()?;
        lock(&self.documents).insert((target, id), source);
        Ok(())
    }

    async fn delete(&self, target: SearchTarget, id: Uuid) -> Result<(), IndexError> {
        self.check()?;
        lock(&self.documents).remove(&(target, id));
        Ok(())
    }

    async fn search(
        &self,
        target: SearchTarget,
        query: &str,
    ) -> Result<Vec<SearchHit>, IndexError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let query = query.to_lowercase();

        let mut scored: Vec<(u8, SearchHit)> = lock(&self.documents)
            .iter()
            .filter(|((t, _), _)| *t == target)
            .filter_map(|((_, id), source)| {
                let score = if field_matches(source, "title", &query) {
                    2
                } else if field_matches(source, "description", &query)
                    || field_matches(source, "text", &query)
                {
                    1
                } else {
                    return None;
                };
                Some((
                    score,
                    SearchHit {
                        id: *id,
                        source: source.clone(),
                    },
                ))
            })
            .collect();
        scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then(a.id.cmp(&b.id)));
        Ok(scored.into_iter().map(|(_, hit)| hit).collect())
    }
}

/// Keeps every email it is asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail_next: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        lock(&self.sent).clone()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        lock(&self.sent).push(email);
        Ok(())
    }
}

pub struct FakeStorage;

#[async_trait]
impl ObjectStorage for FakeStorage {
    fn bucket(&self) -> &str {
        "attachments"
    }

    async fn presign_put(
        &self,
        object_name: &str,
        _content_type: Option<&str>,
    ) -> Result<String, StorageError> {
        Ok(format!(
            "http://storage.test/attachments/{object_name}?X-Amz-Signature=fake"
        ))
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    config.drive.webhook_token = TEST_WEBHOOK_TOKEN.to_string();
    config
}

pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub index: Arc<FakeIndex>,
    pub mailer: Arc<RecordingMailer>,
    pub storage: Arc<FakeStorage>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::default()),
            index: Arc::new(FakeIndex::default()),
            mailer: Arc::new(RecordingMailer::default()),
            storage: Arc::new(FakeStorage),
        }
    }

    pub async fn user(&self, username: &str) -> User {
        self.user_with_email(username, &format!("{username}@example.com"))
            .await
    }

    /// Fixture users carry a placeholder hash; log in through the register
    /// endpoint when a real password is needed.
    pub async fn user_with_email(&self, username: &str, email: &str) -> User {
        self.store
            .insert_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                first_name: username.to_string(),
                last_name: "Tester".to_string(),
                password_hash: "!".to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn task(&self, title: &str, assignee_id: Uuid) -> Task {
        self.store
            .insert_task(NewTask {
                title: title.to_string(),
                description: String::new(),
                assignee_id,
                status: TaskStatus::Open,
            })
            .await
            .unwrap()
    }

    pub async fn comment(&self, task_id: Uuid, author_id: Uuid, text: &str) -> Comment {
        self.store
            .insert_comment(NewComment {
                text: text.to_string(),
                task_id,
                author_id,
            })
            .await
            .unwrap()
    }

    /// A closed timer from `start` to `end`.
    pub async fn timer_log(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> TimeLog {
        let log = self
            .store
            .insert_time_log(NewTimeLog {
                user_id,
                task_id,
                start_time: Some(start),
                date: None,
                duration_minutes: None,
            })
            .await
            .unwrap();
        self.store
            .close_timer(log.id, end, minutes_between(start, end))
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn date_log(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        date: NaiveDate,
        duration_minutes: i32,
    ) -> TimeLog {
        self.store
            .insert_time_log(NewTimeLog {
                user_id,
                task_id,
                start_time: None,
                date: Some(date),
                duration_minutes: Some(duration_minutes),
            })
            .await
            .unwrap()
    }

    pub fn dispatcher(&self) -> Arc<NotificationDispatcher> {
        Arc::new(NotificationDispatcher::new(
            self.store.clone(),
            self.mailer.clone(),
        ))
    }

    pub fn attachments(&self) -> AttachmentService {
        AttachmentService::new(self.store.clone(), self.storage.clone())
    }

    pub fn lifecycle(&self) -> (TaskLifecycle, UnboundedReceiver<NotificationJob>) {
        let (queue, jobs) = NotificationQueue::channel();
        let search = Arc::new(SearchSynchronizer::new(self.index.clone()));
        (TaskLifecycle::new(self.store.clone(), search, queue), jobs)
    }

    pub fn app(&self) -> TestApp {
        let (queue, jobs) = NotificationQueue::channel();
        let state = AppState::new(
            test_config(),
            self.store.clone(),
            Arc::new(MemoryCache::new()),
            self.index.clone(),
            self.storage.clone(),
            queue,
        )
        .unwrap();
        let state = Arc::new(state);
        TestApp {
            router: build_router(state.clone()),
            state,
            jobs,
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub jobs: UnboundedReceiver<NotificationJob>,
}

impl TestApp {
    pub fn token_for(&self, user: &User) -> String {
        self.state.tokens.issue(user.id, TokenKind::Access).unwrap()
    }

    /// Sends one request through the router and parses the JSON body
    /// (`Value::Null` when empty).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        authorization: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(authorization) = authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: &User) -> (StatusCode, Value) {
        let bearer = format!("Bearer {}", self.token_for(user));
        self.call(Method::GET, uri, Some(&bearer), None).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: &User,
        body: Value,
    ) -> (StatusCode, Value) {
        let bearer = format!("Bearer {}", self.token_for(user));
        self.call(method, uri, Some(&bearer), Some(body)).await
    }
}
