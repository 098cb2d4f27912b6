// Copyright 2025 Folia Interiors
// SPDX-License-Identifier: Apache-2.0

//! Task records, insight records, and request/response schemas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::{PriorityLevel, SuggestionBundle, TaskCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

/// A persisted task with its computed score fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub priority_level: PriorityLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<TaskCategory>,
    pub complexity_score: u8,
    pub priority_score: u8,
    pub suggestions: SuggestionBundle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    StatusChange,
}

/// Audit-style record synthesized when a task reaches `completed` from a
/// different prior status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInsight {
    pub id: Uuid,
    pub task_id: Uuid,
    pub insight_type: InsightType,
    pub previous_status: TaskStatus,
    pub new_status: TaskStatus,
    pub changed_at: DateTime<Utc>,
    /// Seconds from task creation to the completing transition.
    pub completion_time_seconds: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub authenticated: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority_level: PriorityLevel,
    /// Free-form on the wire; unmatched values fall back to no category.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub complexity_score: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority_level: Option<PriorityLevel>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub complexity_score: Option<u8>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

impl CreateTaskRequest {
    pub fn parsed_category(&self) -> Option<TaskCategory> {
        self.category.as_deref().and_then(TaskCategory::parse)
    }
}

impl UpdateTaskRequest {
    pub fn parsed_category(&self) -> Option<TaskCategory> {
        self.category.as_deref().and_then(TaskCategory::parse)
    }
}

#[derive(Debug, Serialize)]
pub struct InsightListResponse {
    pub task_id: Uuid,
    pub insights: Vec<TaskInsight>,
}
