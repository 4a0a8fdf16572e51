use chrono::NaiveDate;
use fs_err as fs;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use tracing::warn;

use crate::cli::Theme;
use crate::errors::BuilderError;

pub const VERCEL_TOKEN_KEY: &str = "vercelToken";
pub const THEME_KEY: &str = "theme";
pub const DAILY_LIMIT_KEY: &str = "dailyGenerationLimit";

/// Small string store for settings and credentials that outlive a session.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), BuilderError>;
    fn remove(&self, key: &str) -> Result<(), BuilderError>;
}

/// A JSON object on disk, read once and rewritten on every change.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
    /// Set when the file exists but could not be read; writes are refused so it is never clobbered.
    read_error: Option<String>,
}

impl JsonFileStore {
    /// A missing file is an empty store. Any other read failure is reported, and the
    /// store stays empty and read-only for the session.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut read_error = None;
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring unreadable store");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read store; settings will not be saved");
                read_error = Some(e.to_string());
                BTreeMap::new()
            }
        };
        Self { path, entries: Mutex::new(entries), read_error }
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), BuilderError> {
        if let Some(e) = &self.read_error {
            return Err(BuilderError::Storage(format!("store was not loaded, refusing to overwrite it: {e}")));
        }
        let write = || -> anyhow::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
            Ok(())
        };
        write().map_err(|e| BuilderError::Storage(e.to_string()))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BuilderError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), BuilderError> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BuilderError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BuilderError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

pub fn load_theme(store: &dyn KeyValueStore, default: Theme) -> Theme {
    match store.get(THEME_KEY).as_deref() {
        Some("dark") => Theme::Dark,
        Some("light") => Theme::Light,
        _ => default,
    }
}

pub fn save_theme(store: &dyn KeyValueStore, theme: Theme) -> Result<(), BuilderError> {
    let value = match theme {
        Theme::Dark => "dark",
        Theme::Light => "light",
    };
    store.set(THEME_KEY, value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLimit {
    pub count: u32,
    pub date: NaiveDate,
}

/// Generations left for today. Resets to `limit` whenever the stored day is not `today`.
pub struct DailyQuota<'a> {
    store: &'a dyn KeyValueStore,
    state: DailyLimit,
}

impl<'a> DailyQuota<'a> {
    pub fn load(store: &'a dyn KeyValueStore, limit: u32, today: NaiveDate) -> Self {
        let stored = store
            .get(DAILY_LIMIT_KEY)
            .and_then(|raw| serde_json::from_str::<DailyLimit>(&raw).ok());
        let state = match stored {
            Some(s) if s.date == today => s,
            _ => {
                let fresh = DailyLimit { count: limit, date: today };
                let quota = Self { store, state: fresh };
                quota.persist();
                return quota;
            }
        };
        Self { store, state }
    }

    pub fn remaining(&self) -> u32 {
        self.state.count
    }

    pub fn has_generations_left(&self) -> bool {
        self.state.count > 0
    }

    /// Count one generation; never goes below zero.
    pub fn decrement(&mut self) {
        self.state.count = self.state.count.saturating_sub(1);
        self.persist();
    }

    fn persist(&self) {
        let saved = serde_json::to_string(&self.state)
            .map_err(|e| BuilderError::Storage(e.to_string()))
            .and_then(|raw| self.store.set(DAILY_LIMIT_KEY, &raw));
        if let Err(e) = saved {
            warn!(error = %e, "could not persist daily quota");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn json_store_round_trips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("store.json");
        {
            let s = JsonFileStore::open(&path);
            s.set(VERCEL_TOKEN_KEY, "tok").unwrap();
            s.set(THEME_KEY, "light").unwrap();
            s.remove(THEME_KEY).unwrap();
        }
        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get(VERCEL_TOKEN_KEY).as_deref(), Some("tok"));
        assert_eq!(reopened.get(THEME_KEY), None);
    }

    #[test]
    fn corrupt_store_is_treated_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(JsonFileStore::open(&path).get(THEME_KEY), None);
    }

    #[test]
    fn unreadable_store_is_never_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let s = JsonFileStore::open(&path);
        assert_eq!(s.get(THEME_KEY), None);
        assert!(matches!(s.set(THEME_KEY, "light"), Err(BuilderError::Storage(_))));
        assert!(path.join("keep").exists());
    }

    #[test]
    fn theme_defaults_when_unset() {
        let s = MemoryStore::default();
        assert_eq!(load_theme(&s, Theme::Dark), Theme::Dark);
        save_theme(&s, Theme::Light).unwrap();
        assert_eq!(load_theme(&s, Theme::Dark), Theme::Light);
    }

    #[test]
    fn quota_counts_down_and_floors_at_zero() {
        let s = MemoryStore::default();
        let mut q = DailyQuota::load(&s, 2, day(19));
        assert_eq!(q.remaining(), 2);
        q.decrement();
        q.decrement();
        q.decrement();
        assert_eq!(q.remaining(), 0);
        assert!(!q.has_generations_left());

        let same_day = DailyQuota::load(&s, 2, day(19));
        assert_eq!(same_day.remaining(), 0);
    }

    #[test]
    fn quota_resets_on_a_new_day() {
        let s = MemoryStore::default();
        let mut q = DailyQuota::load(&s, 5, day(18));
        q.decrement();
        let next = DailyQuota::load(&s, 5, day(19));
        assert_eq!(next.remaining(), 5);
        let stored: DailyLimit = serde_json::from_str(&s.get(DAILY_LIMIT_KEY).unwrap()).unwrap();
        assert_eq!(stored, DailyLimit { count: 5, date: day(19) });
    }
}
