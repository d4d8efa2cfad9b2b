use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use exn::ResultExt;
use serde::{Deserialize, Serialize};

/// A submitted waste report. Only counted by the impact summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Report {
    pub id: i64,
    pub location: String,
    pub waste_type: String,
    pub amount: String,
    pub status: String,
}

/// Points granted to a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reward {
    pub id: i64,
    pub name: String,
    pub points: Option<i64>,
}

/// A pickup task. `amount` is free text such as `"12.5 kg"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionTask {
    pub id: i64,
    pub location: String,
    pub waste_type: String,
    pub amount: String,
    pub status: String,
}

/// Errors returned by [`Records`] implementations.
#[derive(Debug)]
pub struct Error(String);

impl Error {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Error {}

/// The pending result of a [`Records`] query.
pub type Query<'a, T> = Pin<Box<dyn Future<Output = exn::Result<Vec<T>, Error>> + Send + 'a>>;

/// Read access to the persistence layer holding reports, rewards and tasks.
pub trait Records: Send + Sync {
    /// Up to `limit` reports, newest first.
    fn recent_reports(&self, limit: usize) -> Query<'_, Report>;

    fn all_rewards(&self) -> Query<'_, Reward>;

    /// Up to `limit` collection tasks, newest first.
    fn collection_tasks(&self, limit: usize) -> Query<'_, CollectionTask>;
}

/// Records loaded from a JSON document, newest entries first:
///
/// ```json
/// { "reports": [...], "rewards": [...], "tasks": [...] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub reports: Vec<Report>,
    pub rewards: Vec<Reward>,
    pub tasks: Vec<CollectionTask>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> exn::Result<Self, Error> {
        serde_json::from_str(json).or_raise(|| Error("decode records snapshot".into()))
    }

    pub fn from_path(path: &Path) -> exn::Result<Self, Error> {
        let json = std::fs::read_to_string(path)
            .or_raise(|| Error(format!("read records snapshot {}", path.display())))?;
        Self::from_json(&json)
    }
}

fn ready<T: Send + 'static>(items: Vec<T>) -> Query<'static, T> {
    let result: exn::Result<Vec<T>, Error> = Ok(items);
    Box::pin(async move { result })
}

impl Records for Snapshot {
    fn recent_reports(&self, limit: usize) -> Query<'_, Report> {
        ready(self.reports.iter().take(limit).cloned().collect())
    }

    fn all_rewards(&self) -> Query<'_, Reward> {
        ready(self.rewards.clone())
    }

    fn collection_tasks(&self, limit: usize) -> Query<'_, CollectionTask> {
        ready(self.tasks.iter().take(limit).cloned().collect())
    }
}
