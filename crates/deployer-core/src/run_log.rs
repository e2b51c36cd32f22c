//! Bounded, in-memory log of triggered passes.
//!
//! Diagnostic only: the control plane stays the source of truth.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Format of trigger timestamps returned to callers.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Apply,
    Delete,
}

impl PassKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassKind::Apply => "apply",
            PassKind::Delete => "delete",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    /// Finished, but some groups, steps or legacy workloads failed.
    Partial,
    /// Aborted before reconciliation could complete.
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: u64,
    #[serde(with = "local_timestamp")]
    pub triggered_at: DateTime<Local>,
    pub kind: PassKind,
    pub description: String,
    pub status: RunStatus,
    #[serde(default, with = "local_timestamp_opt")]
    pub completed_at: Option<DateTime<Local>>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug)]
pub struct RunLog {
    capacity: usize,
    next_id: u64,
    entries: VecDeque<RunRecord>,
}

impl RunLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            next_id: 1,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a `running` record, evicting the oldest entry when full.
    pub fn record(&mut self, kind: PassKind, rev: &str, now: DateTime<Local>) -> RunRecord {
        let record = RunRecord {
            id: self.next_id,
            triggered_at: now,
            kind,
            description: format!("{}: {}", kind.as_str(), rev),
            status: RunStatus::Running,
            completed_at: None,
            summary: None,
        };
        self.next_id += 1;
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(record.clone());
        record
    }

    /// Mark run `id` finished. Returns false when the record was already evicted.
    pub fn finish(
        &mut self,
        id: u64,
        status: RunStatus,
        summary: impl Into<String>,
        now: DateTime<Local>,
    ) -> bool {
        match self.entries.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.status = status;
                record.completed_at = Some(now);
                record.summary = Some(summary.into());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: u64) -> Option<&RunRecord> {
        self.entries.iter().find(|r| r.id == id)
    }

    /// Oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &RunRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `"<timestamp> #<id>" -> description`. The id keeps runs triggered
    /// within the same second apart.
    pub fn descriptions(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|r| {
                let key = format!("{} #{}", format_timestamp(&r.triggered_at), r.id);
                (key, r.description.clone())
            })
            .collect()
    }
}

mod local_timestamp {
    use chrono::{DateTime, Local};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Local>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse(raw: &str) -> Result<DateTime<Local>, String> {
        let naive = chrono::NaiveDateTime::parse_from_str(raw, super::TIMESTAMP_FORMAT)
            .map_err(|e| e.to_string())?;
        naive
            .and_local_timezone(Local)
            .earliest()
            .ok_or_else(|| format!("ambiguous local time '{raw}'"))
    }
}

mod local_timestamp_opt {
    use chrono::{DateTime, Local};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        ts: &Option<DateTime<Local>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.serialize_some(&super::format_timestamp(ts)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Local>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|r| super::local_timestamp::parse(&r).map_err(serde::de::Error::custom))
            .transpose()
    }
}
