//! Core data types for `issue_store`.
//!
//! This module defines the entities the store persists:
//! - [`Issue`] — the work item.
//! - [`Status`] — lifecycle state.
//! - [`IssueType`] — category.
//! - [`Priority`] — 0 (critical) to 4 (backlog).
//! - [`Dependency`] — a typed edge to another issue.
//! - [`DependencyKind`] — the ten edge types and their cycle/ready semantics.
//! - [`Comment`] — a per-issue, monotonically numbered note.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::BeadsError;

/// Issue lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Blocked,
    Deferred,
    Hooked,
    Pinned,
    Closed,
    Tombstone,
    Custom(String),
}

impl Status {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Blocked => "blocked",
            Self::Deferred => "deferred",
            Self::Hooked => "hooked",
            Self::Pinned => "pinned",
            Self::Closed => "closed",
            Self::Tombstone => "tombstone",
            Self::Custom(value) => value,
        }
    }

    /// Whether this status is one of the recognised built-ins (i.e. not
    /// [`Self::Custom`]).
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = BeadsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "open" => Self::Open,
            "in-progress" | "in_progress" => Self::InProgress,
            "blocked" => Self::Blocked,
            "deferred" => Self::Deferred,
            "hooked" => Self::Hooked,
            "pinned" => Self::Pinned,
            "closed" => Self::Closed,
            "tombstone" => Self::Tombstone,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(value.parse().unwrap_or(Self::Custom(value)))
    }
}

/// Issue priority, 0 (critical) through 4 (backlog).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    pub const CRITICAL: Self = Self(0);
    pub const HIGH: Self = Self(1);
    pub const MEDIUM: Self = Self(2);
    pub const LOW: Self = Self(3);
    pub const BACKLOG: Self = Self(4);

    #[must_use]
    pub const fn in_range(self) -> bool {
        self.0 >= Self::CRITICAL.0 && self.0 <= Self::BACKLOG.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl FromStr for Priority {
    type Err = BeadsError;

    /// Accepts `0`..`4` or `P0`..`P4`. Word forms (`high`, `low`, ...) are
    /// rejected on this path per the stricter reading of the spec's open
    /// question about `defaults.priority` (see DESIGN.md).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('P')
            .or_else(|| trimmed.strip_prefix('p'))
            .unwrap_or(trimmed);
        match digits.parse::<i32>() {
            Ok(p) if (Self::CRITICAL.0..=Self::BACKLOG.0).contains(&p) => Ok(Self(p)),
            _ => Err(BeadsError::invalid_field(
                "priority",
                format!("must be 0-4 or P0-P4, got {s:?}"),
            )),
        }
    }
}

/// Issue type category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum IssueType {
    #[default]
    Task,
    Bug,
    Feature,
    Epic,
    Chore,
    Gate,
    Molecule,
    Custom(String),
}

impl IssueType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Epic => "epic",
            Self::Chore => "chore",
            Self::Gate => "gate",
            Self::Molecule => "molecule",
            Self::Custom(value) => value,
        }
    }

    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = BeadsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "task" => Self::Task,
            "bug" => Self::Bug,
            "feature" => Self::Feature,
            "epic" => Self::Epic,
            "chore" => Self::Chore,
            "gate" => Self::Gate,
            "molecule" => Self::Molecule,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl Serialize for IssueType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IssueType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(value.parse().unwrap_or(Self::Custom(value)))
    }
}

/// The ten typed dependency edges (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Blocks,
    Tracks,
    Related,
    ParentChild,
    DiscoveredFrom,
    Until,
    CausedBy,
    Validates,
    RelatesTo,
    Supersedes,
}

impl DependencyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::Tracks => "tracks",
            Self::Related => "related",
            Self::ParentChild => "parent-child",
            Self::DiscoveredFrom => "discovered-from",
            Self::Until => "until",
            Self::CausedBy => "caused-by",
            Self::Validates => "validates",
            Self::RelatesTo => "relates-to",
            Self::Supersedes => "supersedes",
        }
    }

    /// The one edge type that gates `Ready`/`Blocked` (spec glossary).
    #[must_use]
    pub const fn gates_readiness(self) -> bool {
        matches!(self, Self::Blocks)
    }

    /// `related` and `relates-to` are symmetric for display only; they are
    /// excluded from cycle detection (spec §4.3).
    #[must_use]
    pub const fn is_symmetric(self) -> bool {
        matches!(self, Self::Related | Self::RelatesTo)
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DependencyKind {
    type Err = BeadsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blocks" => Ok(Self::Blocks),
            "tracks" => Ok(Self::Tracks),
            "related" => Ok(Self::Related),
            "parent-child" => Ok(Self::ParentChild),
            "discovered-from" => Ok(Self::DiscoveredFrom),
            "until" => Ok(Self::Until),
            "caused-by" => Ok(Self::CausedBy),
            "validates" => Ok(Self::Validates),
            "relates-to" => Ok(Self::RelatesTo),
            "supersedes" => Ok(Self::Supersedes),
            other => Err(BeadsError::invalid_field(
                "dependency type",
                format!("unrecognised edge type {other:?}"),
            )),
        }
    }
}

impl Serialize for DependencyKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DependencyKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// One typed edge, as stored in an issue's `dependencies` or `dependents`
/// list. On `dependencies` (outbound), `id` is the target; on `dependents`
/// (inbound), `id` is the origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dependency {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DependencyKind,
}

impl Dependency {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: DependencyKind) -> Self {
        Self { id: id.into(), kind }
    }
}

/// A comment on an issue. `id` is monotonically increasing within the
/// issue, not globally (spec §9).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: u64,
    pub author: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// The primary issue entity (spec §3.1).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub issue_type: IssueType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub dependents: Vec<Dependency>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub close_reason: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_by: Option<String>,
    #[serde(default)]
    pub delete_reason: Option<String>,
    #[serde(default)]
    pub original_type: Option<String>,
    #[serde(default)]
    pub ephemeral: bool,
    // Gate-only fields; this store only persists and round-trips them.
    #[serde(default)]
    pub await_type: Option<String>,
    #[serde(default)]
    pub await_id: Option<String>,
    #[serde(default)]
    pub timeout_ns: Option<i64>,
    #[serde(default)]
    pub waiters: Vec<String>,
}

impl Issue {
    /// A fresh, minimal issue. Callers fill in the rest before `Create`.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            issue_type: IssueType::default(),
            priority: Priority::default(),
            status: Status::default(),
            assignee: None,
            created_by: None,
            owner: None,
            labels: Vec::new(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
            comments: Vec::new(),
            description: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
            close_reason: None,
            deleted_at: None,
            deleted_by: None,
            delete_reason: None,
            original_type: None,
            ephemeral: false,
            await_type: None,
            await_id: None,
            timeout_ns: None,
            waiters: Vec::new(),
        }
    }

    /// The issue's parent, derived from its single outbound `parent-child`
    /// edge (spec §3.1: "derived from parent-child edges; one-of").
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.dependencies
            .iter()
            .find(|d| d.kind == DependencyKind::ParentChild)
            .map(|d| d.id.as_str())
    }

    /// Children, derived from inbound `parent-child` edges in
    /// edge-insertion order.
    #[must_use]
    pub fn children(&self) -> Vec<&str> {
        self.dependents
            .iter()
            .filter(|d| d.kind == DependencyKind::ParentChild)
            .map(|d| d.id.as_str())
            .collect()
    }

    #[must_use]
    pub fn has_dependency(&self, target: &str) -> bool {
        self.dependencies.iter().any(|d| d.id == target)
    }

    #[must_use]
    pub fn has_dependent(&self, origin: &str) -> bool {
        self.dependents.iter().any(|d| d.id == origin)
    }
}

/// A new issue awaiting creation (spec §4.5). `issue_type` and `priority`
/// are `Option`, unlike the concrete fields on [`Issue`]: `None` means the
/// field was omitted and `Create` should fall back to
/// `StoreConfig::default_type`/`default_priority` (spec §6.3), rather than
/// a hardcoded constructor default that would make those config keys
/// unreachable.
#[derive(Debug, Clone)]
pub struct Draft {
    pub id: String,
    pub title: String,
    pub issue_type: Option<IssueType>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub assignee: Option<String>,
    pub created_by: Option<String>,
    pub owner: Option<String>,
    pub labels: Vec<String>,
    pub description: Option<String>,
    pub ephemeral: bool,
    pub await_type: Option<String>,
    pub await_id: Option<String>,
    pub timeout_ns: Option<i64>,
}

impl Draft {
    /// A fresh, minimal draft. Callers fill in the rest before `Create`.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            issue_type: None,
            priority: None,
            status: None,
            assignee: None,
            created_by: None,
            owner: None,
            labels: Vec::new(),
            description: None,
            ephemeral: false,
            await_type: None,
            await_id: None,
            timeout_ns: None,
        }
    }
}

/// Hand-written so the emitted YAML has a fixed, diff-friendly key order
/// (spec §6.1), independent of struct declaration order or serde defaults.
impl Serialize for Issue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("title", &self.title)?;
        map.serialize_entry("type", &self.issue_type)?;
        map.serialize_entry("priority", &self.priority)?;
        map.serialize_entry("status", &self.status)?;
        if let Some(assignee) = &self.assignee {
            map.serialize_entry("assignee", assignee)?;
        }
        if !self.labels.is_empty() {
            map.serialize_entry("labels", &self.labels)?;
        }
        if let Some(parent) = self.parent() {
            map.serialize_entry("parent", parent)?;
        }
        if !self.dependencies.is_empty() {
            map.serialize_entry("dependencies", &self.dependencies)?;
        }
        if !self.dependents.is_empty() {
            map.serialize_entry("dependents", &self.dependents)?;
        }
        if !self.comments.is_empty() {
            map.serialize_entry("comments", &self.comments)?;
        }
        if let Some(description) = &self.description {
            map.serialize_entry("description", description)?;
        }
        map.serialize_entry("created_at", &self.created_at)?;
        map.serialize_entry("updated_at", &self.updated_at)?;
        if let Some(v) = &self.closed_at {
            map.serialize_entry("closed_at", v)?;
        }
        if let Some(v) = &self.close_reason {
            map.serialize_entry("close_reason", v)?;
        }
        if let Some(v) = &self.deleted_at {
            map.serialize_entry("deleted_at", v)?;
        }
        if let Some(v) = &self.deleted_by {
            map.serialize_entry("deleted_by", v)?;
        }
        if let Some(v) = &self.delete_reason {
            map.serialize_entry("delete_reason", v)?;
        }
        if let Some(v) = &self.original_type {
            map.serialize_entry("original_type", v)?;
        }
        if self.ephemeral {
            map.serialize_entry("ephemeral", &self.ephemeral)?;
        }
        if let Some(v) = &self.created_by {
            map.serialize_entry("created_by", v)?;
        }
        if let Some(v) = &self.owner {
            map.serialize_entry("owner", v)?;
        }
        if let Some(v) = &self.await_type {
            map.serialize_entry("await_type", v)?;
        }
        if let Some(v) = &self.await_id {
            map.serialize_entry("await_id", v)?;
        }
        if let Some(v) = &self.timeout_ns {
            map.serialize_entry("timeout_ns", v)?;
        }
        if !self.waiters.is_empty() {
            map.serialize_entry("waiters", &self.waiters)?;
        }
        map.end()
    }
}
