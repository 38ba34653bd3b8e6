//! Host settings access
//!
//! `SettingsStore` is the only way the core touches externally owned
//! configuration. Writes report success as a plain `bool`: a rejected write
//! is an expected outcome, not an error.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::mpsc::Sender;

use crate::event_handler::HostEvent;
use crate::subscription::SubscriptionId;
use crate::variant::Variant;

/// One external configuration value: schema id plus key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettingsKey {
    pub namespace: String,
    pub key: String,
}

impl SettingsKey {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }
}

impl Display for SettingsKey {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{} {}", self.namespace, self.key)
    }
}

/// Key/value settings backend owned by the host.
///
/// Implementations must send `HostEvent::SettingChanged` to subscribers of
/// a key only when its value actually changed.
pub trait SettingsStore {
    fn get_value(&self, key: &SettingsKey) -> Option<Variant>;

    /// Returns false if the store declined the write
    fn set_value(&mut self, key: &SettingsKey, value: Variant) -> bool;

    fn subscribe(&mut self, key: &SettingsKey, sender: Sender<HostEvent>) -> SubscriptionId;

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;

    fn get_bool(&self, key: &SettingsKey) -> Option<bool> {
        self.get_value(key).and_then(|value| value.as_bool())
    }

    fn get_strv(&self, key: &SettingsKey) -> Option<Vec<String>> {
        self.get_value(key)
            .and_then(|value| value.as_strv().map(<[String]>::to_vec))
    }

    fn get_string(&self, key: &SettingsKey) -> Option<String> {
        self.get_value(key)
            .and_then(|value| value.as_str().map(str::to_string))
    }

    /// Write only if the stored value differs. Returns true when the store
    /// holds `value` afterwards.
    fn set_if_changed(&mut self, key: &SettingsKey, value: Variant) -> bool {
        if self.get_value(key).as_ref() == Some(&value) {
            return true;
        }
        self.set_value(key, value)
    }
}
