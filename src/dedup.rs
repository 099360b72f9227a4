// Dedup cache: records postings already processed so repeated runs skip
// them until the TTL lapses. One JSON snapshot shared across platforms.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::posting::JobPosting;

const DEFAULT_TTL_DAYS: i64 = 7;
const CLEANUP_INTERVAL_HOURS: i64 = 24;

/// Deduplication key for a posting: the canonical link when present,
/// otherwise company+title with whitespace runs collapsed to underscores.
/// Must stay deterministic across runs.
pub fn identity(posting: &JobPosting) -> String {
    if !posting.link.is_empty() {
        return posting.link.clone();
    }
    format!("{}_{}", posting.company, posting.title)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub timestamp: DateTime<Utc>,
    pub company: String,
    pub title: String,
    pub platform: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    jobs: BTreeMap<String, CacheEntry>,
    last_cleanup: DateTime<Utc>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            jobs: BTreeMap::new(),
            last_cleanup: Utc::now(),
        }
    }
}

#[derive(Debug)]
pub struct CacheStats {
    pub total: usize,
    pub by_platform: BTreeMap<String, usize>,
    pub last_cleanup: DateTime<Utc>,
}

/// TTL-expiring identity set, read whole at load and written whole on save.
/// Single-writer discipline: no concurrent runs against the same file.
pub struct DedupCache {
    path: PathBuf,
    snapshot: Snapshot,
    ttl: Duration,
}

impl DedupCache {
    /// Read the snapshot at `path`. An unreadable or corrupt file starts a
    /// fresh cache; re-processing is cheaper than refusing to run.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snapshot = match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!("Dedup cache corrupt, starting fresh: {e}");
                    Snapshot::empty()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::empty(),
            Err(e) => {
                tracing::warn!("Dedup cache unreadable, starting fresh: {e}");
                Snapshot::empty()
            }
        };

        Self {
            path,
            snapshot,
            ttl: Duration::days(DEFAULT_TTL_DAYS),
        }
    }

    /// Split a batch into postings not seen within the TTL and duplicates.
    /// Triggers the lazy expiry sweep at most once per 24 hours.
    pub fn filter(&mut self, postings: Vec<JobPosting>) -> (Vec<JobPosting>, Vec<JobPosting>) {
        let now = Utc::now();
        if now - self.snapshot.last_cleanup > Duration::hours(CLEANUP_INTERVAL_HOURS) {
            let cleaned = self.cleanup_expired();
            if cleaned > 0 {
                tracing::info!("Dedup cache: removed {cleaned} expired entries");
            }
        }

        let mut unique = Vec::new();
        let mut duplicates = Vec::new();
        for posting in postings {
            if self.is_duplicate(&posting, now) {
                duplicates.push(posting);
            } else {
                unique.push(posting);
            }
        }
        (unique, duplicates)
    }

    fn is_duplicate(&self, posting: &JobPosting, now: DateTime<Utc>) -> bool {
        match self.snapshot.jobs.get(&identity(posting)) {
            // Expired entries no longer suppress; they linger until a sweep.
            Some(entry) => now - entry.timestamp <= self.ttl,
            None => false,
        }
    }

    /// Record postings as processed. Idempotent: an existing identity gets a
    /// fresh timestamp, never a second row.
    pub fn mark_seen(&mut self, postings: &[JobPosting]) {
        let now = Utc::now();
        for posting in postings {
            self.snapshot.jobs.insert(
                identity(posting),
                CacheEntry {
                    timestamp: now,
                    company: posting.company.clone(),
                    title: posting.title.clone(),
                    platform: if posting.platform.is_empty() {
                        "unknown".to_string()
                    } else {
                        posting.platform.clone()
                    },
                },
            );
        }
    }

    /// Drop entries whose age exceeds the TTL. Returns how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Utc::now();
        let before = self.snapshot.jobs.len();
        let ttl = self.ttl;
        self.snapshot.jobs.retain(|_, entry| now - entry.timestamp <= ttl);
        self.snapshot.last_cleanup = now;
        before - self.snapshot.jobs.len()
    }

    /// Write the whole snapshot back to disk.
    pub fn save(&self) -> Result<(), AppError> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(&self.snapshot)
            .map_err(|e| AppError::Parse(format!("Dedup cache serialize failed: {e}")))?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        let mut by_platform = BTreeMap::new();
        for entry in self.snapshot.jobs.values() {
            *by_platform.entry(entry.platform.clone()).or_insert(0) += 1;
        }
        CacheStats {
            total: self.snapshot.jobs.len(),
            by_platform,
            last_cleanup: self.snapshot.last_cleanup,
        }
    }

    /// Reset to an empty cache and persist the reset.
    pub fn clear(&mut self) -> Result<(), AppError> {
        self.snapshot = Snapshot::empty();
        self.save()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    fn backdate(&mut self, id: &str, age: Duration) {
        let entry = self.snapshot.jobs.get_mut(id).expect("entry exists");
        entry.timestamp = Utc::now() - age;
    }

    #[cfg(test)]
    fn force_cleanup_due(&mut self) {
        self.snapshot.last_cleanup = Utc::now() - Duration::hours(CLEANUP_INTERVAL_HOURS + 1);
    }
}
