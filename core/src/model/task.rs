use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::model::zero_time;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Label {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TaskReminder {
    #[serde(default, with = "zero_time")]
    pub reminder: Option<DateTime<Utc>>,
    #[serde(default)]
    pub relative_period: i64,
    #[serde(default)]
    pub relative_to: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Bucket {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_done_bucket: bool,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub count_tasks: i64,
}

/// A task as the remote API returns it.
///
/// `urgency` is not part of the remote model. It is filled in by
/// [`crate::service::urgency::refresh_urgency`] after every read and is
/// stale as soon as `done`, `due_date`, `priority` or `is_favorite` change.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub is_favorite: bool,
    #[serde(with = "zero_time")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_empty")]
    pub reminders: Vec<TaskReminder>,
    pub repeat_mode: i64,
    pub repeat_after: i64,
    #[serde(with = "zero_time")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(with = "zero_time")]
    pub end_date: Option<DateTime<Utc>>,
    pub percent_done: f64,
    pub done: bool,
    #[serde(with = "zero_time")]
    pub done_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_empty")]
    pub labels: Vec<Label>,
    #[serde(skip_serializing_if = "is_zero")]
    pub project_id: i64,
    pub position: f64,
    pub bucket_id: i64,
    pub kanban_position: f64,
    #[serde(with = "zero_time")]
    pub created: Option<DateTime<Utc>>,
    #[serde(with = "zero_time")]
    pub updated: Option<DateTime<Utc>>,
    pub urgency: f64,
}

impl Task {
    pub fn new(title: impl Into<String>, project_id: i64) -> Self {
        Self {
            title: title.into(),
            project_id,
            ..Self::default()
        }
    }

    pub fn with_due_date(mut self, due: Option<DateTime<Utc>>) -> Self {
        self.due_date = due;
        self
    }
}

/// Query string accepted by `GET /tasks/all`. Empty fields are left out.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct TaskQuery {
    #[serde(skip_serializing_if = "is_zero")]
    pub page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub per_page: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub s: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sort_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub order_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filter_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filter_value: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filter_comparator: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filter_concat: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filter_include_nulls: String,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

// The API sends `null` instead of `[]` for empty collections.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
