//! Durable record of overridden host settings
//!
//! Before the first write to a host-owned key, the journal captures that
//! key's original value. Restoring writes the original back and forgets
//! the entry. The journal is persisted in full under the extension's
//! `overridden-settings` key after every change, so originals survive a
//! restart until they are explicitly restored:
//!
//! ```text
//! {"org.gnome.mutter":{"edge-tiling":"true"},
//!  "org.gnome.desktop.wm.keybindings":{"unmaximize":"['<Super>Down', '<Alt>F5']"}}
//! ```

use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

use crate::constants::{keys, schema};
use crate::settings::{SettingsKey, SettingsStore};
use crate::variant::{self, DecodeError, Variant};

/// Persisted grouping: namespace -> key -> printed original value
type Blob = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, PartialEq)]
pub struct OverrideJournal {
    entries: BTreeMap<SettingsKey, Variant>,
}

impl OverrideJournal {
    /// Reserved key the journal blob is stored under
    pub fn blob_key() -> SettingsKey {
        SettingsKey::new(schema::EXTENSION, keys::OVERRIDDEN_SETTINGS)
    }

    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Load the persisted journal. Absent or malformed data yields an empty
    /// journal.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let Some(value) = store.get_value(&Self::blob_key()) else {
            debug!("No persisted override journal");
            return Self::new();
        };
        let Some(text) = value.as_str() else {
            warn!(kind = value.kind(), "Override journal blob is not a string, starting empty");
            return Self::new();
        };
        match Self::from_blob(text) {
            Ok(journal) => {
                info!(entries = journal.len(), "Loaded override journal");
                journal
            }
            Err(e) => {
                warn!(error = %e, "Malformed override journal, starting empty");
                Self::new()
            }
        }
    }

    /// Parse a journal blob. Entries whose value does not decode are
    /// dropped with a warning; a blob that is not a namespace/key object
    /// is an error.
    pub fn from_blob(text: &str) -> Result<Self, DecodeError> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let blob: Blob = serde_json::from_str(text)?;
        let mut entries = BTreeMap::new();
        for (namespace, overrides) in blob {
            for (key, printed) in overrides {
                match variant::decode(&printed) {
                    Ok(value) => {
                        entries.insert(SettingsKey::new(namespace.clone(), key), value);
                    }
                    Err(e) => {
                        warn!(namespace = %namespace, key = %key, error = %e, "Dropping undecodable journal entry");
                    }
                }
            }
        }
        Ok(Self { entries })
    }

    /// Serialize grouped by namespace. An empty journal is `{}`.
    pub fn to_blob(&self) -> String {
        let mut blob = Blob::new();
        for (key, value) in &self.entries {
            blob.entry(key.namespace.clone())
                .or_default()
                .insert(key.key.clone(), variant::encode(value));
        }
        // map of string maps always serializes
        serde_json::to_string(&blob).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn original(&self, key: &SettingsKey) -> Option<&Variant> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &SettingsKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&SettingsKey, &Variant)> {
        self.entries.iter()
    }

    /// Write `new_value` to `key`, capturing the key's current value as the
    /// original the first time it is overridden. Later overrides keep the
    /// first original.
    ///
    /// The original is persisted before the setting is touched, so a key is
    /// never left overridden without a durable record. Returns false with
    /// no effect if either write is rejected.
    pub fn override_value(
        &mut self,
        store: &mut dyn SettingsStore,
        key: &SettingsKey,
        new_value: Variant,
    ) -> bool {
        let Some(current) = store.get_value(key) else {
            warn!(setting = %key, "Cannot override a setting with no current value");
            return false;
        };

        let first = !self.contains(key);
        if first {
            self.entries.insert(key.clone(), current.clone());
            if !self.persist(store) {
                self.entries.remove(key);
                warn!(setting = %key, "Could not journal original, leaving setting untouched");
                return false;
            }
        } else {
            debug!(setting = %key, "Already overridden, keeping first original");
        }

        if !store.set_value(key, new_value.clone()) {
            warn!(setting = %key, value = %new_value, "Store rejected override");
            if first {
                self.entries.remove(key);
                self.persist(store);
            }
            return false;
        }

        info!(setting = %key, original = %current, value = %new_value, "Overrode setting");
        true
    }

    /// Write the recorded original back to `key` and forget it. Returns
    /// false with no effect if `key` was never overridden or the store
    /// rejected the write.
    pub fn restore(&mut self, store: &mut dyn SettingsStore, key: &SettingsKey) -> bool {
        let Some(original) = self.entries.get(key).cloned() else {
            debug!(setting = %key, "Nothing to restore");
            return false;
        };
        if !store.set_value(key, original.clone()) {
            warn!(setting = %key, "Store rejected restore, keeping journal entry");
            return false;
        }
        self.entries.remove(key);
        info!(setting = %key, value = %original, "Restored setting");
        self.persist(store);
        true
    }

    /// Restore every entry. Entries whose write is rejected stay in the
    /// journal; the rest are removed. Returns the number restored.
    pub fn restore_all(&mut self, store: &mut dyn SettingsStore) -> usize {
        let mut restored = 0;
        let keys: Vec<SettingsKey> = self.entries.keys().cloned().collect();
        for key in keys {
            let Some(original) = self.entries.get(&key).cloned() else {
                continue;
            };
            if store.set_value(&key, original) {
                self.entries.remove(&key);
                restored += 1;
            } else {
                warn!(setting = %key, "Store rejected restore, keeping journal entry");
            }
        }
        info!(restored, remaining = self.entries.len(), "Restored overridden settings");
        self.persist(store);
        restored
    }

    /// Write the full journal to its reserved key
    fn persist(&self, store: &mut dyn SettingsStore) -> bool {
        let ok = store.set_if_changed(&Self::blob_key(), Variant::Str(self.to_blob()));
        if !ok {
            error!(entries = self.entries.len(), "Failed to persist override journal");
        }
        ok
    }
}

impl Default for OverrideJournal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, OpLog};
    use pretty_assertions::assert_eq;

    fn edge_tiling() -> SettingsKey {
        SettingsKey::new(schema::MUTTER, "edge-tiling")
    }

    fn unmaximize() -> SettingsKey {
        SettingsKey::new("org.gnome.desktop.wm.keybindings", "unmaximize")
    }

    fn host() -> MemoryStore {
        MemoryStore::with([
            (edge_tiling(), Variant::Bool(true)),
            (unmaximize(), Variant::strv(["<Super>Down", "<Alt>F5"])),
        ])
    }

    #[test]
    fn test_override_then_restore_returns_original() {
        let mut store = host();
        let mut journal = OverrideJournal::new();

        assert!(journal.override_value(&mut store, &edge_tiling(), Variant::Bool(false)));
        assert!(journal.override_value(&mut store, &unmaximize(), Variant::StringList(vec![])));
        assert_eq!(store.get_bool(&edge_tiling()), Some(false));

        assert!(journal.restore(&mut store, &edge_tiling()));
        assert!(journal.restore(&mut store, &unmaximize()));

        assert_eq!(store.get_bool(&edge_tiling()), Some(true));
        assert_eq!(
            store.get_strv(&unmaximize()),
            Some(vec!["<Super>Down".to_string(), "<Alt>F5".to_string()])
        );
        assert!(journal.is_empty());
    }

    #[test]
    fn test_first_override_wins() {
        let mut store = MemoryStore::with([(unmaximize(), Variant::strv(["v0"]))]);
        let mut journal = OverrideJournal::new();

        journal.override_value(&mut store, &unmaximize(), Variant::strv(["v1"]));
        journal.override_value(&mut store, &unmaximize(), Variant::strv(["v2"]));

        assert_eq!(journal.original(&unmaximize()), Some(&Variant::strv(["v0"])));
        assert_eq!(store.get_strv(&unmaximize()), Some(vec!["v2".to_string()]));

        assert!(journal.restore(&mut store, &unmaximize()));
        assert_eq!(store.get_strv(&unmaximize()), Some(vec!["v0".to_string()]));
    }

    #[test]
    fn test_rejected_override_records_nothing() {
        let mut store = host();
        store.reject(edge_tiling());
        let mut journal = OverrideJournal::new();

        assert!(!journal.override_value(&mut store, &edge_tiling(), Variant::Bool(false)));
        assert!(journal.is_empty());
        assert_eq!(store.get_bool(&edge_tiling()), Some(true));
        assert!(OverrideJournal::load(&store).is_empty());
    }

    #[test]
    fn test_unjournaled_override_is_refused() {
        let mut store = host();
        store.reject(OverrideJournal::blob_key());
        let mut journal = OverrideJournal::new();

        assert!(!journal.override_value(&mut store, &edge_tiling(), Variant::Bool(false)));

        // setting untouched, so nothing is lost across a restart
        assert!(journal.is_empty());
        assert_eq!(store.get_bool(&edge_tiling()), Some(true));
        assert!(!OverrideJournal::load(&store).contains(&edge_tiling()));
    }

    #[test]
    fn test_original_is_persisted_before_setting_is_written() {
        let log = OpLog::default();
        let mut store = host().with_log(log.clone());
        let mut journal = OverrideJournal::new();
        assert!(journal.override_value(&mut store, &edge_tiling(), Variant::Bool(false)));

        let ops = log.borrow().clone();
        let journaled = ops
            .iter()
            .position(|op| op.starts_with(&format!("set {}", OverrideJournal::blob_key())))
            .unwrap();
        let overridden = ops
            .iter()
            .position(|op| op.starts_with(&format!("set {}", edge_tiling())))
            .unwrap();
        assert!(journaled < overridden, "ops were {ops:?}");

        // a fresh session only has what was persisted
        let mut reloaded = OverrideJournal::load(&store);
        assert!(reloaded.restore(&mut store, &edge_tiling()));
        assert_eq!(store.get_bool(&edge_tiling()), Some(true));
    }

    #[test]
    fn test_override_of_unknown_key_is_refused() {
        let mut store = MemoryStore::new();
        let mut journal = OverrideJournal::new();

        assert!(!journal.override_value(&mut store, &edge_tiling(), Variant::Bool(false)));
        assert!(journal.is_empty());
    }

    #[test]
    fn test_restore_without_entry_is_noop() {
        let mut store = host();
        let mut journal = OverrideJournal::new();
        let writes = store.writes();

        assert!(!journal.restore(&mut store, &edge_tiling()));
        assert_eq!(store.writes(), writes);
    }

    #[test]
    fn test_rejected_restore_keeps_entry() {
        let mut store = host();
        let mut journal = OverrideJournal::new();
        journal.override_value(&mut store, &edge_tiling(), Variant::Bool(false));

        store.reject(edge_tiling());
        assert!(!journal.restore(&mut store, &edge_tiling()));
        assert_eq!(journal.original(&edge_tiling()), Some(&Variant::Bool(true)));

        store.accept(&edge_tiling());
        assert!(journal.restore(&mut store, &edge_tiling()));
        assert_eq!(store.get_bool(&edge_tiling()), Some(true));
    }

    #[test]
    fn test_restore_all_restores_everything() {
        let mut store = host();
        let mut journal = OverrideJournal::new();
        journal.override_value(&mut store, &edge_tiling(), Variant::Bool(false));
        journal.override_value(&mut store, &unmaximize(), Variant::StringList(vec![]));

        assert_eq!(journal.restore_all(&mut store), 2);

        assert!(journal.is_empty());
        assert_eq!(store.get_bool(&edge_tiling()), Some(true));
        assert_eq!(
            store.get_value(&OverrideJournal::blob_key()),
            Some(Variant::Str("{}".into()))
        );
    }

    #[test]
    fn test_restore_all_keeps_only_failed_entries() {
        let mut store = host();
        let mut journal = OverrideJournal::new();
        journal.override_value(&mut store, &edge_tiling(), Variant::Bool(false));
        journal.override_value(&mut store, &unmaximize(), Variant::StringList(vec![]));

        store.reject(unmaximize());
        assert_eq!(journal.restore_all(&mut store), 1);

        assert_eq!(journal.len(), 1);
        assert!(journal.contains(&unmaximize()));
        assert_eq!(store.get_bool(&edge_tiling()), Some(true));

        let persisted = OverrideJournal::load(&store);
        assert_eq!(persisted, journal);
    }

    #[test]
    fn test_journal_survives_reload() {
        let mut store = host();
        let mut journal = OverrideJournal::new();
        journal.override_value(&mut store, &edge_tiling(), Variant::Bool(false));
        journal.override_value(&mut store, &unmaximize(), Variant::StringList(vec![]));

        let mut reloaded = OverrideJournal::load(&store);
        assert_eq!(reloaded, journal);

        assert_eq!(reloaded.restore_all(&mut store), 2);
        assert_eq!(
            store.get_strv(&unmaximize()),
            Some(vec!["<Super>Down".to_string(), "<Alt>F5".to_string()])
        );
    }

    #[test]
    fn test_blob_groups_by_namespace() {
        let mut store = host();
        let mut journal = OverrideJournal::new();
        journal.override_value(&mut store, &edge_tiling(), Variant::Bool(false));
        journal.override_value(&mut store, &unmaximize(), Variant::StringList(vec![]));

        assert_eq!(
            journal.to_blob(),
            r#"{"org.gnome.desktop.wm.keybindings":{"unmaximize":"['<Super>Down', '<Alt>F5']"},"org.gnome.mutter":{"edge-tiling":"true"}}"#
        );
        assert_eq!(OverrideJournal::from_blob(&journal.to_blob()).unwrap(), journal);
    }

    #[test]
    fn test_emptied_namespace_leaves_blob() {
        let mut store = host();
        let mut journal = OverrideJournal::new();
        journal.override_value(&mut store, &edge_tiling(), Variant::Bool(false));
        journal.override_value(&mut store, &unmaximize(), Variant::StringList(vec![]));

        assert!(journal.restore(&mut store, &edge_tiling()));

        assert!(!journal.to_blob().contains("org.gnome.mutter\""));
        assert_eq!(
            store.get_string(&OverrideJournal::blob_key()),
            Some(r#"{"org.gnome.desktop.wm.keybindings":{"unmaximize":"['<Super>Down', '<Alt>F5']"}}"#.to_string())
        );
    }

    #[test]
    fn test_malformed_blob_loads_empty() {
        for blob in ["not json", "[1, 2]", r#"{"ns": "flat"}"#] {
            let store = MemoryStore::with([(OverrideJournal::blob_key(), Variant::Str(blob.into()))]);
            assert!(OverrideJournal::load(&store).is_empty(), "blob was {blob}");
        }

        let store = MemoryStore::with([(OverrideJournal::blob_key(), Variant::Bool(false))]);
        assert!(OverrideJournal::load(&store).is_empty());
        assert!(OverrideJournal::load(&MemoryStore::new()).is_empty());
    }

    #[test]
    fn test_undecodable_entry_is_dropped() {
        let journal = OverrideJournal::from_blob(
            r#"{"org.gnome.mutter":{"edge-tiling":"true","bogus":"nope"}}"#,
        )
        .unwrap();

        assert_eq!(journal.len(), 1);
        assert_eq!(journal.original(&edge_tiling()), Some(&Variant::Bool(true)));
    }

    #[test]
    fn test_empty_journal_blob() {
        assert_eq!(OverrideJournal::new().to_blob(), "{}");
        assert!(OverrideJournal::from_blob("").unwrap().is_empty());
    }
}
