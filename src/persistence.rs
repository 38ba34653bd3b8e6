//! File-backed settings store
//!
//! Stands in for the host's settings daemon: one JSON document holding
//! `namespace -> key -> printed value`. Every changed value rewrites the
//! whole document (temp file + rename), so each write is atomic per key.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::{debug, error, info, warn};

use crate::constants::{accelerators, keys, native, schema};
use crate::event_handler::HostEvent;
use crate::settings::{SettingsKey, SettingsStore};
use crate::subscription::{SubscriptionId, Subscribers};
use crate::variant::{self, Variant};

type Document = BTreeMap<String, BTreeMap<String, String>>;

pub struct JsonSettingsStore {
    path: PathBuf,
    values: BTreeMap<SettingsKey, Variant>,
    subscribers: Subscribers<SettingsKey>,
}

impl JsonSettingsStore {
    /// Default store location under the XDG data dir
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::STORE_FILENAME);
        path
    }

    /// Open the store at `path`, seeding host defaults for absent keys.
    /// A missing file is a fresh store; an unreadable document is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut values = BTreeMap::new();

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings store {:?}", path))?;
            let document: Document = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings store {:?}", path))?;
            for (namespace, entries) in document {
                for (key, text) in entries {
                    match variant::decode(&text) {
                        Ok(value) => {
                            values.insert(SettingsKey::new(namespace.clone(), key), value);
                        }
                        Err(e) => {
                            warn!(namespace = %namespace, key = %key, error = %e, "Skipping undecodable setting");
                        }
                    }
                }
            }
            info!(path = %path.display(), count = values.len(), "Loaded settings store");
        } else {
            info!(path = %path.display(), "No settings store found, starting fresh");
        }

        let mut store = Self {
            path,
            values,
            subscribers: Subscribers::new(),
        };
        if store.seed_defaults() > 0 {
            store.flush()?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert host defaults for keys the store does not have yet.
    /// Returns the number of keys seeded.
    fn seed_defaults(&mut self) -> usize {
        let mut seeded = 0;
        for (key, value) in host_defaults() {
            if !self.values.contains_key(&key) {
                debug!(setting = %key, value = %value, "Seeding default");
                self.values.insert(key, value);
                seeded += 1;
            }
        }
        seeded
    }

    fn document(&self) -> Document {
        let mut document = Document::new();
        for (key, value) in &self.values {
            document
                .entry(key.namespace.clone())
                .or_default()
                .insert(key.key.clone(), variant::encode(value));
        }
        document
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(&self.document())
            .context("Failed to serialize settings store")?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to move {:?} into place", tmp))?;
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get_value(&self, key: &SettingsKey) -> Option<Variant> {
        self.values.get(key).cloned()
    }

    fn set_value(&mut self, key: &SettingsKey, value: Variant) -> bool {
        let previous = self.values.insert(key.clone(), value.clone());
        if previous.as_ref() == Some(&value) {
            return true;
        }

        if let Err(e) = self.flush() {
            error!(setting = %key, error = ?e, "Failed to persist setting, rolling back");
            match previous {
                Some(old) => self.values.insert(key.clone(), old),
                None => self.values.remove(key),
            };
            return false;
        }

        debug!(setting = %key, value = %value, "Setting changed");
        self.subscribers
            .notify(key, HostEvent::SettingChanged(key.clone()));
        true
    }

    fn subscribe(&mut self, key: &SettingsKey, sender: Sender<HostEvent>) -> SubscriptionId {
        self.subscribers.subscribe(key.clone(), sender)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}

/// Values a stock desktop session starts with
pub fn host_defaults() -> Vec<(SettingsKey, Variant)> {
    vec![
        (
            SettingsKey::new(schema::MUTTER, native::EDGE_TILING),
            Variant::Bool(true),
        ),
        (
            SettingsKey::new(schema::MUTTER, native::EXPERIMENTAL_FEATURES),
            Variant::StringList(vec![]),
        ),
        (
            SettingsKey::new(schema::MUTTER_KEYBINDINGS, native::TOGGLE_TILED_RIGHT),
            Variant::strv([accelerators::SUPER_RIGHT]),
        ),
        (
            SettingsKey::new(schema::MUTTER_KEYBINDINGS, native::TOGGLE_TILED_LEFT),
            Variant::strv([accelerators::SUPER_LEFT]),
        ),
        (
            SettingsKey::new(schema::DESKTOP_WM_KEYBINDINGS, native::MAXIMIZE),
            Variant::strv([accelerators::SUPER_UP]),
        ),
        (
            SettingsKey::new(schema::DESKTOP_WM_KEYBINDINGS, native::UNMAXIMIZE),
            Variant::strv([accelerators::SUPER_DOWN, accelerators::ALT_F5]),
        ),
        (
            SettingsKey::new(schema::EXTENSION, keys::MOVE_WINDOW_RIGHT),
            Variant::strv([accelerators::SUPER_RIGHT]),
        ),
        (
            SettingsKey::new(schema::EXTENSION, keys::MOVE_WINDOW_LEFT),
            Variant::strv([accelerators::SUPER_LEFT]),
        ),
        (
            SettingsKey::new(schema::EXTENSION, keys::MOVE_WINDOW_UP),
            Variant::strv([accelerators::SUPER_UP]),
        ),
        (
            SettingsKey::new(schema::EXTENSION, keys::MOVE_WINDOW_DOWN),
            Variant::strv([accelerators::SUPER_DOWN]),
        ),
        (
            SettingsKey::new(schema::EXTENSION, keys::OVERRIDDEN_SETTINGS),
            Variant::Str("{}".to_string()),
        ),
        (
            SettingsKey::new(schema::EXTENSION, keys::SELECTED_LAYOUTS),
            Variant::Str("[]".to_string()),
        ),
        (
            SettingsKey::new(schema::EXTENSION, keys::LAST_VERSION_INSTALLED),
            Variant::Str("0".to_string()),
        ),
    ]
}
