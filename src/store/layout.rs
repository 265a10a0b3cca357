//! On-disk layout, atomic writes, and file location (spec §4.2).
//!
//! ```text
//! <project>/open/<ID>.yaml
//! <project>/closed/<ID>.yaml
//! <project>/deleted/<ID>.yaml
//! ```
//!
//! Writes go to a sibling temp file in the destination directory and are
//! renamed into place, following the `fs::rename(&temp_path, output_path)`
//! pattern already used for JSONL export in the teacher crate's
//! `src/sync/mod.rs`, generalized here to a single issue's YAML file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{BeadsError, Result};
use crate::model::{Issue, Status};

/// The three status directories an issue can live under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Open,
    Closed,
    Deleted,
}

impl Bucket {
    #[must_use]
    pub const fn dirname(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Deleted => "deleted",
        }
    }

    /// Which bucket a given status belongs in. Only `closed` and
    /// `tombstone` leave the `open/` directory (spec §4.2: every other
    /// status — in-progress, blocked, deferred, hooked, pinned — is a
    /// sub-state of "open").
    #[must_use]
    pub fn for_status(status: &Status) -> Self {
        match status {
            Status::Closed => Self::Closed,
            Status::Tombstone => Self::Deleted,
            _ => Self::Open,
        }
    }

    pub const ALL: [Self; 3] = [Self::Open, Self::Closed, Self::Deleted];
}

fn io_err(path: &Path, source: std::io::Error) -> BeadsError {
    BeadsError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn yaml_err(path: &Path, source: serde_yaml::Error) -> BeadsError {
    BeadsError::Yaml {
        path: path.to_path_buf(),
        source,
    }
}

/// Ensure `open/`, `closed/`, `deleted/` exist under `project_dir`.
pub fn ensure_layout(project_dir: &Path) -> Result<()> {
    for bucket in Bucket::ALL {
        let dir = project_dir.join(bucket.dirname());
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    }
    Ok(())
}

#[must_use]
pub fn path_for(project_dir: &Path, bucket: Bucket, id: &str) -> PathBuf {
    project_dir.join(bucket.dirname()).join(format!("{id}.yaml"))
}

/// Locate an issue's current file across all three buckets. If the same
/// ID is found in more than one bucket (a crash left a stale copy behind
/// mid-relocation), prefer the newer-mtime file, remove the stale one,
/// and log the reconciliation (spec §4.2).
pub fn locate(project_dir: &Path, id: &str) -> Result<(PathBuf, Bucket)> {
    let mut candidates = Vec::new();
    for bucket in Bucket::ALL {
        let path = path_for(project_dir, bucket, id);
        if path.is_file() {
            candidates.push((path, bucket));
        }
    }

    match candidates.len() {
        0 => Err(BeadsError::NotFound { id: id.to_string() }),
        1 => Ok(candidates.into_iter().next().unwrap()),
        _ => {
            candidates.sort_by_key(|(path, _)| mtime(path));
            let Some((newest, stale)) = candidates.split_last() else {
                unreachable!()
            };
            let (newest_path, newest_bucket) = newest.clone();
            for (path, _) in stale {
                tracing::warn!(id, stale = %path.display(), kept = %newest_path.display(), "reconciling duplicate issue file left by an interrupted relocation");
                let _ = fs::remove_file(path);
            }
            Ok((newest_path, newest_bucket))
        }
    }
}

fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(UNIX_EPOCH)
}

pub fn read_issue(path: &Path) -> Result<Issue> {
    let contents = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| yaml_err(path, e))
}

/// Write `issue` to `path` atomically: serialize to a sibling temp file in
/// the same directory, `sync_all`, then rename into place.
pub fn atomic_write(path: &Path, issue: &Issue) -> Result<()> {
    let dir = path.parent().ok_or_else(|| BeadsError::invalid_field("path", "missing parent directory"))?;
    fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let yaml = serde_yaml::to_string(issue).map_err(|e| yaml_err(path, e))?;
    let temp_path = dir.join(format!(".{}.tmp-{}", issue.id, std::process::id()));

    {
        use std::io::Write;
        let mut file = fs::File::create(&temp_path).map_err(|e| io_err(&temp_path, e))?;
        file.write_all(yaml.as_bytes()).map_err(|e| io_err(&temp_path, e))?;
        file.sync_all().map_err(|e| io_err(&temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        io_err(path, e)
    })
}

pub fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| io_err(path, e))
}

/// List every issue ID present in `bucket`, in filename (alphabetical)
/// order (spec §4.6: "Results are returned in filename order unless
/// otherwise specified").
pub fn list_ids(project_dir: &Path, bucket: Bucket) -> Result<Vec<String>> {
    let dir = project_dir.join(bucket.dirname());
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut ids: Vec<String> = fs::read_dir(&dir)
        .map_err(|e| io_err(&dir, e))?
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("yaml") {
                path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
            } else {
                None
            }
        })
        .filter(|name| !name.starts_with('.'))
        .collect();
    ids.sort();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Issue;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_then_read_round_trips() {
        let temp = TempDir::new().unwrap();
        ensure_layout(temp.path()).unwrap();
        let issue = Issue::new("bd-abcd", "Test");
        let path = path_for(temp.path(), Bucket::Open, "bd-abcd");
        atomic_write(&path, &issue).unwrap();
        let loaded = read_issue(&path).unwrap();
        assert_eq!(loaded.id, "bd-abcd");
        assert_eq!(loaded.title, "Test");
    }

    #[test]
    fn locate_finds_issue_in_its_bucket() {
        let temp = TempDir::new().unwrap();
        ensure_layout(temp.path()).unwrap();
        let issue = Issue::new("bd-abcd", "Test");
        let path = path_for(temp.path(), Bucket::Closed, "bd-abcd");
        atomic_write(&path, &issue).unwrap();
        let (found, bucket) = locate(temp.path(), "bd-abcd").unwrap();
        assert_eq!(found, path);
        assert!(matches!(bucket, Bucket::Closed));
    }

    #[test]
    fn locate_missing_returns_not_found() {
        let temp = TempDir::new().unwrap();
        ensure_layout(temp.path()).unwrap();
        assert!(matches!(
            locate(temp.path(), "bd-missing"),
            Err(BeadsError::NotFound { .. })
        ));
    }

    #[test]
    fn locate_reconciles_duplicate_by_keeping_newer_mtime() {
        let temp = TempDir::new().unwrap();
        ensure_layout(temp.path()).unwrap();
        let issue = Issue::new("bd-dup", "Test");
        let open_path = path_for(temp.path(), Bucket::Open, "bd-dup");
        let closed_path = path_for(temp.path(), Bucket::Closed, "bd-dup");
        atomic_write(&open_path, &issue).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        atomic_write(&closed_path, &issue).unwrap();

        let (found, bucket) = locate(temp.path(), "bd-dup").unwrap();
        assert_eq!(found, closed_path);
        assert!(matches!(bucket, Bucket::Closed));
        assert!(!open_path.exists());
    }

    #[test]
    fn list_ids_is_alphabetical_and_ignores_other_buckets() {
        let temp = TempDir::new().unwrap();
        ensure_layout(temp.path()).unwrap();
        for id in ["bd-zzzz", "bd-aaaa", "bd-mmmm"] {
            atomic_write(&path_for(temp.path(), Bucket::Open, id), &Issue::new(id, "x")).unwrap();
        }
        atomic_write(&path_for(temp.path(), Bucket::Closed, "bd-cccc"), &Issue::new("bd-cccc", "x")).unwrap();

        let ids = list_ids(temp.path(), Bucket::Open).unwrap();
        assert_eq!(ids, vec!["bd-aaaa", "bd-mmmm", "bd-zzzz"]);
    }
}
