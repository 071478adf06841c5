use log::{error, info, warn};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::AppError;
use crate::tasks::types::{Comment, Task};

use super::{into_document, Document, DocumentIndex, IndexError, SearchHit, SearchTarget};

pub fn task_document(task: &Task) -> Document {
    into_document(json!({
        "title": task.title,
        "description": task.description,
        "assignee": task.assignee_id,
        "status": task.status,
        "created_at": task.created_at,
        "updated_at": task.updated_at,
    }))
}

pub fn comment_document(comment: &Comment) -> Document {
    into_document(json!({
        "text": comment.text,
        "task": comment.task_id,
        "author": comment.author_id,
        "created_at": comment.created_at,
        "updated_at": comment.updated_at,
    }))
}

/// Mirrors task and comment writes into the document index. Write-path
/// failures are logged and swallowed; the database stays authoritative.
pub struct SearchSynchronizer {
    index: Arc<dyn DocumentIndex>,
}

impl SearchSynchronizer {
    pub fn new(index: Arc<dyn DocumentIndex>) -> Self {
        Self { index }
    }

    fn report(action: &str, target: SearchTarget, id: Uuid, result: Result<(), IndexError>) {
        if let Err(e) = result {
            error!("Failed to {action} {target} {id} in search index: {e}");
        }
    }

    async fn merge(
        &self,
        target: SearchTarget,
        id: Uuid,
        fields: Document,
    ) -> Result<(), IndexError> {
        let document = match self.index.get(target, id).await? {
            Some(mut existing) => {
                existing.extend(fields);
                existing
            }
            None => {
                warn!("{target} {id} missing from search index, reindexing in full");
                fields
            }
        };
        self.index.put(target, id, document).await
    }

    pub async fn task_created(&self, task: &Task) {
        let result = self
            .index
            .put(SearchTarget::Task, task.id, task_document(task))
            .await;
        Self::report("index", SearchTarget::Task, task.id, result);
    }

    pub async fn task_updated(&self, task: &Task) {
        let result = self
            .merge(SearchTarget::Task, task.id, task_document(task))
            .await;
        Self::report("update", SearchTarget::Task, task.id, result);
    }

    /// Removes the task and the comments that were attached to it.
    pub async fn task_deleted(&self, task_id: Uuid, comment_ids: &[Uuid]) {
        let result = self.index.delete(SearchTarget::Task, task_id).await;
        Self::report("remove", SearchTarget::Task, task_id, result);
        for comment_id in comment_ids {
            self.comment_deleted(*comment_id).await;
        }
    }

    pub async fn comment_created(&self, comment: &Comment) {
        let result = self
            .index
            .put(SearchTarget::Comment, comment.id, comment_document(comment))
            .await;
        Self::report("index", SearchTarget::Comment, comment.id, result);
    }

    pub async fn comment_deleted(&self, comment_id: Uuid) {
        let result = self.index.delete(SearchTarget::Comment, comment_id).await;
        Self::report("remove", SearchTarget::Comment, comment_id, result);
    }

    pub async fn search(&self, target: &str, query: &str) -> Result<Vec<SearchHit>, AppError> {
        let target = target
            .parse::<SearchTarget>()
            .map_err(AppError::Validation)?;
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::validation("Query parameter is required"));
        }

        let hits = self.index.search(target, query).await?;
        info!("Search {target} '{query}' returned {} hit(s)", hits.len());
        Ok(hits)
    }
}
