//! In-process [`LogStore`] backed by a vector. Used to exercise the handlers without Postgres.
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    database::LogStore,
    error::StoreError,
    models::{Action, ArticleLog, NewArticleLog},
};

#[derive(Default)]
pub struct MemoryStore {
    logs: RwLock<Vec<ArticleLog>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.logs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.logs.read().await.is_empty()
    }

    pub async fn snapshot(&self) -> Vec<ArticleLog> {
        self.logs.read().await.clone()
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn insert(&self, record: NewArticleLog) -> Result<ArticleLog, StoreError> {
        let mut logs = self.logs.write().await;

        // assigned under the write lock so id order matches vector order
        let log = ArticleLog {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            user_id: record.user_id,
            article_id: record.article_id,
            action: record.action,
            created_at: Utc::now(),
        };
        logs.push(log.clone());

        Ok(log)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<ArticleLog>, StoreError> {
        Ok(self
            .logs
            .read()
            .await
            .iter()
            .filter(|log| log.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_article_and_action(
        &self,
        article_id: &str,
        action: Action,
    ) -> Result<Vec<ArticleLog>, StoreError> {
        Ok(self
            .logs
            .read()
            .await
            .iter()
            .filter(|log| log.article_id == article_id && log.action == action)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_log(user_id: &str, article_id: &str, action: Action) -> NewArticleLog {
        NewArticleLog {
            user_id: user_id.to_string(),
            article_id: article_id.to_string(),
            action,
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = MemoryStore::new();

        let first = store.insert(new_log("u1", "a1", Action::Click)).await.unwrap();
        let second = store.insert(new_log("u1", "a1", Action::Reading)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(second.created_at >= first.created_at);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn queries_filter_on_every_field() {
        let store = MemoryStore::new();
        store.insert(new_log("u1", "a1", Action::Click)).await.unwrap();
        store.insert(new_log("u1", "a1", Action::Reading)).await.unwrap();
        store.insert(new_log("u2", "a1", Action::Reading)).await.unwrap();
        store.insert(new_log("u2", "a2", Action::Reading)).await.unwrap();

        assert_eq!(store.find_by_user("u1").await.unwrap().len(), 2);
        assert_eq!(store.find_by_user("u3").await.unwrap(), vec![]);

        let reading = store
            .find_by_article_and_action("a1", Action::Reading)
            .await
            .unwrap();
        assert_eq!(reading.len(), 2);
        assert!(reading.iter().all(|log| log.action == Action::Reading));

        let clicks = store
            .find_by_article_and_action("a2", Action::Click)
            .await
            .unwrap();
        assert!(clicks.is_empty());
    }
}
