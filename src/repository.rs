// Copyright 2025 Folia Interiors
// SPDX-License-Identifier: Apache-2.0

//! Repository seam for task persistence.
//!
//! The hosted relational store is an external collaborator; the core only
//! talks through this narrow interface. The in-memory backend is the one
//! shipped here and the one the tests exercise.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::model::{TaskInsight, TaskRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Backend-agnostic task persistence.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, task: TaskRecord) -> Result<TaskRecord, RepoError>;
    async fn find(&self, id: Uuid) -> Result<Option<TaskRecord>, RepoError>;
    async fn update(&self, task: TaskRecord) -> Result<TaskRecord, RepoError>;
    async fn delete(&self, id: Uuid) -> Result<bool, RepoError>;
    async fn insert_insight(&self, insight: TaskInsight) -> Result<(), RepoError>;
    async fn insights_for(&self, task_id: Uuid) -> Result<Vec<TaskInsight>, RepoError>;
}

/// Repository handle that can wrap different backends.
#[derive(Clone)]
pub struct Repository {
    backend: Arc<dyn TaskRepository>,
}

impl Repository {
    pub fn new(backend: impl TaskRepository + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub async fn insert(&self, task: TaskRecord) -> Result<TaskRecord, RepoError> {
        self.backend.insert(task).await
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<TaskRecord>, RepoError> {
        self.backend.find(id).await
    }

    pub async fn update(&self, task: TaskRecord) -> Result<TaskRecord, RepoError> {
        self.backend.update(task).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        self.backend.delete(id).await
    }

    pub async fn insert_insight(&self, insight: TaskInsight) -> Result<(), RepoError> {
        self.backend.insert_insight(insight).await
    }

    pub async fn insights_for(&self, task_id: Uuid) -> Result<Vec<TaskInsight>, RepoError> {
        self.backend.insights_for(task_id).await
    }
}

/// Process-local backend over tokio RwLocks.
#[derive(Default)]
pub struct MemoryRepository {
    tasks: RwLock<HashMap<Uuid, TaskRecord>>,
    insights: RwLock<Vec<TaskInsight>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for MemoryRepository {
    async fn insert(&self, task: TaskRecord) -> Result<TaskRecord, RepoError> {
        let mut guard = self.tasks.write().await;
        if guard.contains_key(&task.id) {
            return Err(RepoError::Conflict(format!("task {} already exists", task.id)));
        }
        guard.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find(&self, id: Uuid) -> Result<Option<TaskRecord>, RepoError> {
        let guard = self.tasks.read().await;
        Ok(guard.get(&id).cloned())
    }

    async fn update(&self, task: TaskRecord) -> Result<TaskRecord, RepoError> {
        let mut guard = self.tasks.write().await;
        if !guard.contains_key(&task.id) {
            return Err(RepoError::NotFound);
        }
        guard.insert(task.id, task.clone());
        Ok(task)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut guard = self.tasks.write().await;
        Ok(guard.remove(&id).is_some())
    }

    async fn insert_insight(&self, insight: TaskInsight) -> Result<(), RepoError> {
        let mut guard = self.insights.write().await;
        guard.push(insight);
        Ok(())
    }

    async fn insights_for(&self, task_id: Uuid) -> Result<Vec<TaskInsight>, RepoError> {
        let guard = self.insights.read().await;
        Ok(guard
            .iter()
            .filter(|insight| insight.task_id == task_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InsightType, TaskStatus};
    use crate::scoring::{PriorityLevel, SuggestionBundle};
    use chrono::Utc;

    fn sample_task() -> TaskRecord {
        let now = Utc::now();
        TaskRecord {
            id: Uuid::new_v4(),
            title: "Measure hallway panels".to_string(),
            description: None,
            status: TaskStatus::Pending,
            due_date: None,
            priority_level: PriorityLevel::Medium,
            category: None,
            complexity_score: 3,
            priority_score: 60,
            suggestions: SuggestionBundle::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_then_find_roundtrip() {
        let repo = Repository::new(MemoryRepository::new());
        let task = sample_task();

        repo.insert(task.clone()).await.unwrap();
        let found = repo.find(task.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Measure hallway panels");
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_conflict() {
        let repo = Repository::new(MemoryRepository::new());
        let task = sample_task();

        repo.insert(task.clone()).await.unwrap();
        let err = repo.insert(task).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_missing_task_is_not_found() {
        let repo = Repository::new(MemoryRepository::new());
        let err = repo.update(sample_task()).await.unwrap_err();
        assert_eq!(err, RepoError::NotFound);
    }

    #[tokio::test]
    async fn delete_reports_whether_record_existed() {
        let repo = Repository::new(MemoryRepository::new());
        let task = sample_task();

        repo.insert(task.clone()).await.unwrap();
        assert!(repo.delete(task.id).await.unwrap());
        assert!(!repo.delete(task.id).await.unwrap());
    }

    #[tokio::test]
    async fn insights_are_scoped_to_their_task() {
        let repo = Repository::new(MemoryRepository::new());
        let task = sample_task();
        let other = Uuid::new_v4();
        let now = Utc::now();

        repo.insert_insight(TaskInsight {
            id: Uuid::new_v4(),
            task_id: task.id,
            insight_type: InsightType::StatusChange,
            previous_status: TaskStatus::InProgress,
            new_status: TaskStatus::Completed,
            changed_at: now,
            completion_time_seconds: 3600,
        })
        .await
        .unwrap();

        assert_eq!(repo.insights_for(task.id).await.unwrap().len(), 1);
        assert!(repo.insights_for(other).await.unwrap().is_empty());
    }
}
