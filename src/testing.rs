//! Test doubles for the host collaborators

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::sync::mpsc::Sender;

use crate::event_handler::HostEvent;
use crate::extension::ExtensionContext;
use crate::hotkeys::{ActionMode, Direction, KeyDispatcher};
use crate::layouts::{Catalog, StaticCatalog};
use crate::monitors::StaticTopology;
use crate::persistence::host_defaults;
use crate::settings::{SettingsKey, SettingsStore};
use crate::subscription::{SubscriptionId, Subscribers};
use crate::variant::Variant;

/// Shared, ordered record of operations across doubles
pub type OpLog = Rc<RefCell<Vec<String>>>;

/// In-memory store that can be told to reject writes for chosen keys
#[derive(Default)]
pub struct MemoryStore {
    values: BTreeMap<SettingsKey, Variant>,
    rejected: BTreeSet<SettingsKey>,
    writes: usize,
    subscribers: Subscribers<SettingsKey>,
    log: Option<OpLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (SettingsKey, Variant)>,
    {
        Self {
            values: values.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_log(mut self, log: OpLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn reject(&mut self, key: SettingsKey) {
        self.rejected.insert(key);
    }

    pub fn accept(&mut self, key: &SettingsKey) {
        self.rejected.remove(key);
    }

    /// Number of accepted writes so far
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl SettingsStore for MemoryStore {
    fn get_value(&self, key: &SettingsKey) -> Option<Variant> {
        self.values.get(key).cloned()
    }

    fn set_value(&mut self, key: &SettingsKey, value: Variant) -> bool {
        if self.rejected.contains(key) {
            return false;
        }
        if let Some(log) = &self.log {
            log.borrow_mut().push(format!("set {key} {value}"));
        }
        self.writes += 1;
        let changed = self.values.get(key) != Some(&value);
        self.values.insert(key.clone(), value);
        if changed {
            self.subscribers
                .notify(key, HostEvent::SettingChanged(key.clone()));
        }
        true
    }

    fn subscribe(&mut self, key: &SettingsKey, sender: Sender<HostEvent>) -> SubscriptionId {
        self.subscribers.subscribe(key.clone(), sender)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}

/// Dispatcher that only remembers what is registered
#[derive(Default)]
pub struct RecordingDispatcher {
    pub registered: BTreeMap<String, Direction>,
    refused: BTreeSet<String>,
    log: Option<OpLog>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(mut self, log: OpLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn refuse(&mut self, action: &str) {
        self.refused.insert(action.to_string());
    }
}

impl KeyDispatcher for RecordingDispatcher {
    fn register(
        &mut self,
        action: &str,
        _settings: &SettingsKey,
        _mode: ActionMode,
        direction: Direction,
    ) -> bool {
        if self.refused.contains(action) || self.registered.contains_key(action) {
            return false;
        }
        if let Some(log) = &self.log {
            log.borrow_mut().push(format!("register {action}"));
        }
        self.registered.insert(action.to_string(), direction);
        true
    }

    fn unregister(&mut self, action: &str) -> bool {
        if let Some(log) = &self.log {
            log.borrow_mut().push(format!("unregister {action}"));
        }
        self.registered.remove(action).is_some()
    }

    fn is_registered(&self, action: &str) -> bool {
        self.registered.contains_key(action)
    }
}

/// Full set of host doubles, with the store seeded like a fresh install
pub struct FakeHost {
    pub store: MemoryStore,
    pub topology: StaticTopology,
    pub catalog: StaticCatalog,
    pub dispatcher: RecordingDispatcher,
}

impl FakeHost {
    pub fn new(monitors: usize, layouts: &[&str]) -> Self {
        let ids = layouts.iter().map(|id| id.to_string()).collect();
        Self {
            store: MemoryStore::with(host_defaults()),
            topology: StaticTopology::new(vec![1.0; monitors]),
            catalog: StaticCatalog::new(Catalog::new(ids).expect("test catalog is empty")),
            dispatcher: RecordingDispatcher::new(),
        }
    }

    pub fn context(&mut self) -> ExtensionContext<'_> {
        ExtensionContext {
            store: &mut self.store,
            topology: &mut self.topology,
            catalog: &self.catalog,
            dispatcher: &mut self.dispatcher,
        }
    }
}
