#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use purretys::config::Settings;
use purretys::db::{FullRepository, LocalRepository};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Serializes access to the process environment and restores the previous
/// values on unwind. `None` removes a variable.
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _restore = EnvSnapshot::apply(changes);
    f()
}

struct EnvSnapshot {
    saved: Vec<(String, Option<String>)>,
}

impl EnvSnapshot {
    fn apply(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let saved = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect();
        for (key, value) in changes {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
        Self { saved }
    }
}

impl Drop for EnvSnapshot {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..) {
            match value {
                Some(v) => std::env::set_var(&key, v),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// Default settings with a cheap bcrypt cost.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.auth.bcrypt_cost = 4;
    settings
}

pub fn test_repository() -> Arc<dyn FullRepository> {
    Arc::new(LocalRepository::new())
}
