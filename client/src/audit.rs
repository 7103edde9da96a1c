//! Local side cache of audit metadata, and the rule for merging it into
//! records read from the server.
//!
//! The server is authoritative. A cached value only ever fills an audit
//! field the server left empty; it never replaces one the server supplied.
//! Every cache failure is logged and otherwise ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use shared::{ActivityEntry, Cattle, MilkRecord};

/// Audit attributes remembered for one record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,
}

impl AuditEntry {
    /// Overlay the values `newer` carries onto this entry.
    fn absorb(&mut self, newer: AuditEntry) {
        let AuditEntry {
            created_by,
            last_edited_by,
            last_edited_at,
            last_edited_field,
            added_by,
        } = newer;
        if created_by.is_some() {
            self.created_by = created_by;
        }
        if last_edited_by.is_some() {
            self.last_edited_by = last_edited_by;
        }
        if last_edited_at.is_some() {
            self.last_edited_at = last_edited_at;
        }
        if last_edited_field.is_some() {
            self.last_edited_field = last_edited_field;
        }
        if added_by.is_some() {
            self.added_by = added_by;
        }
    }
}

fn is_empty_text(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn fill_text(slot: &mut Option<String>, fallback: &Option<String>) {
    if is_empty_text(slot) && !is_empty_text(fallback) {
        *slot = fallback.clone();
    }
}

/// Authoritative record first, cache second.
pub fn reconcile_cattle(mut cattle: Cattle, cached: Option<&AuditEntry>) -> Cattle {
    let Some(cached) = cached else {
        return cattle;
    };
    let audit = &mut cattle.audit;
    fill_text(&mut audit.created_by, &cached.created_by);
    fill_text(&mut audit.last_edited_by, &cached.last_edited_by);
    fill_text(&mut audit.last_edited_field, &cached.last_edited_field);
    if audit.last_edited_at.is_none() {
        audit.last_edited_at = cached.last_edited_at;
    }
    cattle
}

pub fn reconcile_milk(mut record: MilkRecord, cached: Option<&AuditEntry>) -> MilkRecord {
    if let Some(cached) = cached {
        fill_text(&mut record.added_by, &cached.added_by);
    }
    record
}

/// On-disk layout of the cache file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheState {
    #[serde(default)]
    cattle: HashMap<String, AuditEntry>,
    #[serde(default)]
    milk: HashMap<String, AuditEntry>,
    /// Last activity list successfully fetched.
    #[serde(default)]
    activities: Vec<ActivityEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Cattle,
    Milk,
}

impl CacheState {
    fn entries(&mut self, namespace: Namespace) -> &mut HashMap<String, AuditEntry> {
        match namespace {
            Namespace::Cattle => &mut self.cattle,
            Namespace::Milk => &mut self.milk,
        }
    }
}

/// Audit side cache, file-backed when given a path
#[derive(Debug)]
pub struct AuditCache {
    path: Option<PathBuf>,
    state: Mutex<CacheState>,
}

impl AuditCache {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Open the cache file at `path`. A missing or unreadable file starts
    /// an empty cache.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(state) => state,
                Err(e) => {
                    warn!("Ignoring unreadable audit cache {}: {}", path.display(), e);
                    CacheState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No audit cache at {}", path.display());
                CacheState::default()
            }
            Err(e) => {
                warn!("Failed to read audit cache {}: {}", path.display(), e);
                CacheState::default()
            }
        };
        Self {
            path: Some(path),
            state: Mutex::new(state),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, state: &CacheState) {
        let Some(path) = &self.path else {
            return;
        };
        let text = match serde_json::to_string_pretty(state) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode audit cache: {}", e);
                return;
            }
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!("Failed to create audit cache directory {}: {}", parent.display(), e);
                return;
            }
        }
        if let Err(e) = tokio::fs::write(path, text).await {
            warn!("Failed to write audit cache {}: {}", path.display(), e);
        }
    }

    pub async fn get(&self, namespace: Namespace, id: &str) -> Option<AuditEntry> {
        self.state.lock().await.entries(namespace).get(id).cloned()
    }

    /// Merge `entry` into whatever is cached for `id`
    pub async fn remember(&self, namespace: Namespace, id: &str, entry: AuditEntry) {
        let mut state = self.state.lock().await;
        state
            .entries(namespace)
            .entry(id.to_string())
            .or_default()
            .absorb(entry);
        self.persist(&state).await;
    }

    pub async fn forget(&self, namespace: Namespace, id: &str) {
        let mut state = self.state.lock().await;
        if state.entries(namespace).remove(id).is_some() {
            self.persist(&state).await;
        }
    }

    /// Move the entry for a record whose id changed. Values already cached
    /// under `new_id` win over the migrated ones.
    pub async fn migrate(&self, namespace: Namespace, old_id: &str, new_id: &str) {
        let mut state = self.state.lock().await;
        let entries = state.entries(namespace);
        let Some(mut migrated) = entries.remove(old_id) else {
            return;
        };
        if let Some(existing) = entries.remove(new_id) {
            migrated.absorb(existing);
        }
        entries.insert(new_id.to_string(), migrated);
        debug!("Migrated audit entry {} -> {}", old_id, new_id);
        self.persist(&state).await;
    }

    pub async fn reconcile_cattle(&self, cattle: Vec<Cattle>) -> Vec<Cattle> {
        let state = self.state.lock().await;
        cattle
            .into_iter()
            .map(|c| {
                let cached = state.cattle.get(&c.id);
                reconcile_cattle(c, cached)
            })
            .collect()
    }

    pub async fn reconcile_milk(&self, records: Vec<MilkRecord>) -> Vec<MilkRecord> {
        let state = self.state.lock().await;
        records
            .into_iter()
            .map(|r| {
                let cached = state.milk.get(&r.id);
                reconcile_milk(r, cached)
            })
            .collect()
    }

    pub async fn store_activities(&self, entries: &[ActivityEntry]) {
        let mut state = self.state.lock().await;
        state.activities = entries.to_vec();
        self.persist(&state).await;
    }

    pub async fn cached_activities(&self) -> Vec<ActivityEntry> {
        self.state.lock().await.activities.clone()
    }
}
