// Copyright 2025 Folia Interiors
// SPDX-License-Identifier: Apache-2.0

//! Deterministic task scoring.
//!
//! Everything here is a pure function of its inputs: the priority score is an
//! additive rule set clamped to [0, 100], complexity is a per-category lookup,
//! and suggestions are fixed tables. The only time dependency is the explicit
//! `now` parameter used for due-date proximity.
//!
//! The category-bonus table and the complexity table are intentionally
//! independent: they cover different category sets and different fallbacks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const BASE_SCORE: i32 = 50;

/// Default complexity for absent or unlisted categories.
const DEFAULT_COMPLEXITY: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    ClientMeetings,
    Installations,
    Measurements,
    Quotes,
    FollowUps,
    Administrative,
}

impl TaskCategory {
    /// Exact-match parse; anything else is treated as an unknown category
    /// rather than an error.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "client_meetings" => Some(Self::ClientMeetings),
            "installations" => Some(Self::Installations),
            "measurements" => Some(Self::Measurements),
            "quotes" => Some(Self::Quotes),
            "follow_ups" => Some(Self::FollowUps),
            "administrative" => Some(Self::Administrative),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClientMeetings => "client_meetings",
            Self::Installations => "installations",
            Self::Measurements => "measurements",
            Self::Quotes => "quotes",
            Self::FollowUps => "follow_ups",
            Self::Administrative => "administrative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
}

/// Attributes the score is computed from. Ephemeral; never persisted as-is.
#[derive(Debug, Clone, Default)]
pub struct TaskScoreInput {
    pub due_date: Option<DateTime<Utc>>,
    pub priority_level: PriorityLevel,
    pub category: Option<TaskCategory>,
    pub complexity_score: Option<u8>,
}

/// Actionable suggestion tables for one category. Lists are always present,
/// possibly empty; never null on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionBundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_time_of_day: Option<TimeOfDay>,
    pub preparation_items: Vec<String>,
    pub follow_up_tasks: Vec<String>,
    pub efficiency_tips: Vec<String>,
}

/// Compute the 0-100 priority score.
///
/// Additive terms over a base of 50: due-date proximity, priority level,
/// supplied complexity x3, and a category bonus. The sum is clamped to the
/// closed interval, never wrapped or rejected.
pub fn score_priority(input: &TaskScoreInput, now: DateTime<Utc>) -> u8 {
    let mut score = BASE_SCORE;

    if let Some(due) = input.due_date {
        score += due_date_term(due, now);
    }

    score += match input.priority_level {
        PriorityLevel::Urgent => 25,
        PriorityLevel::High => 20,
        PriorityLevel::Medium => 10,
        PriorityLevel::Low => 0,
    };

    if let Some(complexity) = input.complexity_score {
        score += i32::from(complexity) * 3;
    }

    score += match input.category {
        Some(TaskCategory::ClientMeetings) => 15,
        Some(TaskCategory::Installations) => 12,
        Some(TaskCategory::Measurements) => 10,
        Some(TaskCategory::Quotes) => 8,
        Some(TaskCategory::FollowUps) => 5,
        Some(TaskCategory::Administrative) => 2,
        None => 0,
    };

    score.clamp(0, 100) as u8
}

/// Urgency term from `days_diff = ceil((due - now) / 1 day)`.
fn due_date_term(due: DateTime<Utc>, now: DateTime<Utc>) -> i32 {
    let seconds = (due - now).num_seconds();
    // Ceiling division; a due date later today still counts as day 0.
    let days_diff = -((-seconds).div_euclid(86_400));

    if days_diff < 0 {
        30
    } else if days_diff <= 1 {
        25
    } else if days_diff <= 3 {
        20
    } else if days_diff <= 7 {
        15
    } else if days_diff <= 14 {
        10
    } else {
        5
    }
}

/// Category complexity lookup. Not a measurement: a fixed table with a
/// default of 3 for anything unlisted or absent.
pub fn assign_complexity(category: Option<TaskCategory>) -> u8 {
    match category {
        Some(TaskCategory::Installations) => 4,
        Some(TaskCategory::ClientMeetings) => 3,
        Some(TaskCategory::Measurements) => 2,
        Some(TaskCategory::Administrative) => 1,
        _ => DEFAULT_COMPLEXITY,
    }
}

/// Fixed suggestion tables per category. Absent categories yield an empty
/// bundle with no recommended time.
pub fn generate_suggestions(category: Option<TaskCategory>) -> SuggestionBundle {
    let Some(category) = category else {
        return SuggestionBundle::default();
    };

    let recommended_time_of_day = Some(match category {
        TaskCategory::ClientMeetings | TaskCategory::Installations | TaskCategory::Quotes => {
            TimeOfDay::Morning
        }
        TaskCategory::Measurements | TaskCategory::FollowUps | TaskCategory::Administrative => {
            TimeOfDay::Afternoon
        }
    });

    let preparation_items = match category {
        TaskCategory::ClientMeetings => vec![
            "Review the client's quote and booking history".to_string(),
            "Bring the film sample book and finish catalog".to_string(),
            "Prepare a measurement sheet for on-site estimates".to_string(),
        ],
        TaskCategory::Installations => vec![
            "Confirm film stock and batch numbers match the order".to_string(),
            "Check squeegees, heat gun and trimming blades".to_string(),
            "Verify site access and parking with the client".to_string(),
        ],
        TaskCategory::Measurements => vec![
            "Charge the laser measurer".to_string(),
            "Print floor plans if the client provided any".to_string(),
        ],
        TaskCategory::Quotes => vec![
            "Check current film prices with suppliers".to_string(),
            "Review the measurement notes for the space".to_string(),
        ],
        _ => Vec::new(),
    };

    let follow_up_tasks = match category {
        TaskCategory::ClientMeetings => vec![
            "Send a meeting summary to the client".to_string(),
            "Draft an updated quote from the agreed changes".to_string(),
        ],
        TaskCategory::Installations => vec![
            "Photograph finished surfaces for the portfolio".to_string(),
            "Schedule a post-installation quality check".to_string(),
        ],
        TaskCategory::Quotes => vec![
            "Set a reminder to chase the quote in three days".to_string(),
        ],
        _ => Vec::new(),
    };

    let efficiency_tips = match category {
        TaskCategory::Installations => vec![
            "Cut panels for the full job before laminating".to_string(),
            "Work high-traffic edges first while adhesive is fresh".to_string(),
        ],
        TaskCategory::Measurements => vec![
            "Batch nearby site visits into one route".to_string(),
            "Record wall conditions while measuring".to_string(),
        ],
        TaskCategory::Administrative => vec![
            "Batch invoicing at the end of the day".to_string(),
        ],
        _ => Vec::new(),
    };

    SuggestionBundle {
        recommended_time_of_day,
        preparation_items,
        follow_up_tasks,
        efficiency_tips,
    }
}
