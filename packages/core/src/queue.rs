//! Queue names, counts and consistent snapshots.

use serde::{Deserialize, Serialize};

use crate::JobSummary;

/// The four job queues, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueName {
    Todo,
    Running,
    Done,
    Dead,
}

impl QueueName {
    pub const ALL: [QueueName; 4] = [
        QueueName::Todo,
        QueueName::Running,
        QueueName::Done,
        QueueName::Dead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Todo => "todo",
            QueueName::Running => "running",
            QueueName::Done => "done",
            QueueName::Dead => "dead",
        }
    }

    /// Name of the event announcing a mutation of this queue.
    pub fn event_name(&self) -> &'static str {
        match self {
            QueueName::Todo => "todo_update",
            QueueName::Running => "run_update",
            QueueName::Done => "done_update",
            QueueName::Dead => "dead_update",
        }
    }

    /// Lock acquisition order when more than one queue is held at once.
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueueName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(QueueName::Todo),
            "running" | "run" => Ok(QueueName::Running),
            "done" => Ok(QueueName::Done),
            "dead" => Ok(QueueName::Dead),
            other => Err(format!("unknown queue: {other}")),
        }
    }
}

/// Counts across the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueStats {
    pub todo: u64,
    pub running: u64,
    pub done: u64,
    pub dead: u64,
    /// Pending notifications across all users, whether or not their target
    /// was reachable when they were pushed.
    pub notifications: u64,
}

impl QueueStats {
    /// Jobs not yet finished (todo + running).
    pub fn active(&self) -> u64 {
        self.todo + self.running
    }

    /// Total finished jobs.
    pub fn processed(&self) -> u64 {
        self.done + self.dead
    }

    /// Success rate as a percentage.
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.processed();
        if total == 0 {
            None
        } else {
            Some((self.done as f64 / total as f64) * 100.0)
        }
    }
}

/// All four queues captured at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub todo: Vec<JobSummary>,
    pub running: Vec<JobSummary>,
    pub done: Vec<JobSummary>,
    pub dead: Vec<JobSummary>,
}

impl PipelineSnapshot {
    pub fn queue(&self, name: QueueName) -> &[JobSummary] {
        match name {
            QueueName::Todo => &self.todo,
            QueueName::Running => &self.running,
            QueueName::Done => &self.done,
            QueueName::Dead => &self.dead,
        }
    }

    pub fn len(&self) -> usize {
        self.todo.len() + self.running.len() + self.done.len() + self.dead.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;

    #[test]
    fn parses_run_alias() {
        assert_eq!("run".parse::<QueueName>(), Ok(QueueName::Running));
        assert_eq!(" Running ".parse::<QueueName>(), Ok(QueueName::Running));
        assert_eq!("dead".parse::<QueueName>(), Ok(QueueName::Dead));
        assert!("later".parse::<QueueName>().is_err());
    }

    #[test]
    fn rank_follows_pipeline_order() {
        let ranks: Vec<u8> = QueueName::ALL.iter().map(QueueName::rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn success_rate() {
        let stats = QueueStats {
            done: 3,
            dead: 1,
            ..Default::default()
        };
        assert_eq!(stats.processed(), 4);
        assert_eq!(stats.success_rate(), Some(75.0));
        assert_eq!(QueueStats::default().success_rate(), None);
    }
}
