//! Extension lifecycle
//!
//! `Extension` owns the session state (keybinding takeover, subscriptions,
//! loaded journal, fractional scaling flag). The host collaborators live in
//! `ExtensionContext` and are passed in explicitly on every call.

use std::sync::mpsc::Sender;
use tracing::{debug, info, warn};

use crate::constants::{keys, native, scaling, schema};
use crate::event_handler::HostEvent;
use crate::hotkeys::KeyDispatcher;
use crate::journal::OverrideJournal;
use crate::keybindings::{default_bindings, KeybindingOverrideManager};
use crate::layouts::{self, LayoutCatalog, LayoutId};
use crate::monitors::MonitorTopology;
use crate::settings::{SettingsKey, SettingsStore};
use crate::subscription::SubscriptionId;
use crate::variant::Variant;

/// Host collaborators, borrowed for the duration of one call
pub struct ExtensionContext<'a> {
    pub store: &'a mut dyn SettingsStore,
    pub topology: &'a mut dyn MonitorTopology,
    pub catalog: &'a dyn LayoutCatalog,
    pub dispatcher: &'a mut dyn KeyDispatcher,
}

#[derive(Debug, Clone, Copy)]
enum Subscription {
    Setting(SubscriptionId),
    Topology(SubscriptionId),
}

pub struct Extension {
    version: String,
    events: Sender<HostEvent>,
    enabled: bool,
    journal: Option<OverrideJournal>,
    keybindings: KeybindingOverrideManager,
    subscriptions: Vec<Subscription>,
    fractional_scaling: bool,
}

/// Mutter experimental features key, watched for scaling changes
pub fn experimental_features_key() -> SettingsKey {
    SettingsKey::new(schema::MUTTER, native::EXPERIMENTAL_FEATURES)
}

/// Persisted layout assignment key, watched for external edits
pub fn selected_layouts_key() -> SettingsKey {
    SettingsKey::new(schema::EXTENSION, keys::SELECTED_LAYOUTS)
}

pub fn is_fractional_scaling(features: &[String]) -> bool {
    features.iter().any(|feature| {
        feature == scaling::SCALE_MONITOR_FRAMEBUFFER
            || feature == scaling::X11_RANDR_FRACTIONAL_SCALING
    })
}

impl Extension {
    pub fn new(version: impl Into<String>, events: Sender<HostEvent>) -> Self {
        Self {
            version: version.into(),
            events,
            enabled: false,
            journal: None,
            keybindings: KeybindingOverrideManager::new(),
            subscriptions: Vec::new(),
            fractional_scaling: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the presentation layer should apply its own scaling
    pub fn scaling_enabled(&self) -> bool {
        !self.fractional_scaling
    }

    /// Journal loaded by the current session
    pub fn journal_mut(&mut self) -> Option<&mut OverrideJournal> {
        self.journal.as_mut()
    }

    pub fn enable(&mut self, ctx: &mut ExtensionContext<'_>) {
        if self.enabled {
            debug!("Extension already enabled");
            return;
        }

        let version_key = SettingsKey::new(schema::EXTENSION, keys::LAST_VERSION_INSTALLED);
        if !ctx
            .store
            .set_if_changed(&version_key, Variant::Str(self.version.clone()))
        {
            warn!(version = %self.version, "Failed to record installed version");
        }

        self.journal = Some(OverrideJournal::load(&*ctx.store));
        self.keybindings
            .enable(&mut *ctx.store, &mut *ctx.dispatcher, &default_bindings());

        self.fractional_scaling = read_fractional_scaling(&*ctx.store);
        self.enabled = true;
        self.reconcile_layouts(ctx);

        for key in [experimental_features_key(), selected_layouts_key()] {
            let id = ctx.store.subscribe(&key, self.events.clone());
            self.subscriptions.push(Subscription::Setting(id));
        }
        let id = ctx.topology.subscribe(self.events.clone());
        self.subscriptions.push(Subscription::Topology(id));

        info!(
            version = %self.version,
            fractional_scaling = self.fractional_scaling,
            shortcuts = self.keybindings.registered().len(),
            "Extension enabled"
        );
    }

    pub fn disable(&mut self, ctx: &mut ExtensionContext<'_>) {
        if !self.enabled {
            debug!("Extension not enabled");
            return;
        }

        for subscription in self.subscriptions.drain(..) {
            match subscription {
                Subscription::Setting(id) => ctx.store.unsubscribe(id),
                Subscription::Topology(id) => ctx.topology.unsubscribe(id),
            };
        }

        self.keybindings
            .disable(&mut *ctx.store, &mut *ctx.dispatcher);

        // journal stays persisted across disable
        self.journal = None;
        self.fractional_scaling = false;
        self.enabled = false;
        info!("Extension disabled");
    }

    /// Repair and persist the layout assignment against the current
    /// topology and catalog. Returns the repaired assignment.
    pub fn reconcile_layouts(&mut self, ctx: &mut ExtensionContext<'_>) -> Vec<LayoutId> {
        let current = layouts::load_assignment(&*ctx.store);
        let monitor_count = ctx.topology.monitor_count();
        let catalog = ctx.catalog.catalog();

        let repaired = layouts::reconcile(&current, monitor_count, &catalog);
        if repaired != current {
            info!(from = ?current, to = ?repaired, monitors = monitor_count, "Repaired layout assignment");
        }
        if !layouts::save_assignment(&mut *ctx.store, &repaired) {
            warn!("Store rejected layout assignment");
        }
        repaired
    }

    pub fn on_topology_changed(&mut self, ctx: &mut ExtensionContext<'_>) {
        if !self.enabled {
            return;
        }
        debug!(monitors = ctx.topology.monitor_count(), "Topology changed");
        self.reconcile_layouts(ctx);
    }

    pub fn on_setting_changed(&mut self, ctx: &mut ExtensionContext<'_>, key: &SettingsKey) {
        if !self.enabled {
            return;
        }
        if *key == experimental_features_key() {
            let fractional = read_fractional_scaling(&*ctx.store);
            if fractional == self.fractional_scaling {
                return;
            }
            info!(fractional_scaling = fractional, "Fractional scaling changed");
            self.fractional_scaling = fractional;
            self.reconcile_layouts(ctx);
        } else if *key == selected_layouts_key() {
            // our own writes land here too; reconcile is a no-op for them
            self.reconcile_layouts(ctx);
        }
    }

    /// Select `layout` for the monitor at `monitor_index`. Returns false if
    /// the index or layout is unknown or the store rejected the write.
    pub fn select_layout(
        &mut self,
        ctx: &mut ExtensionContext<'_>,
        monitor_index: usize,
        layout: &str,
    ) -> bool {
        if !ctx.catalog.catalog().contains(layout) {
            warn!(layout = %layout, "Unknown layout");
            return false;
        }
        let mut assignment = self.reconcile_layouts(ctx);
        let Some(slot) = assignment.get_mut(monitor_index) else {
            warn!(monitor = monitor_index, "No such monitor");
            return false;
        };
        *slot = layout.to_string();
        info!(monitor = monitor_index, layout = %layout, "Selected layout");
        layouts::save_assignment(&mut *ctx.store, &assignment)
    }
}

fn read_fractional_scaling(store: &dyn SettingsStore) -> bool {
    store
        .get_strv(&experimental_features_key())
        .is_some_and(|features| is_fractional_scaling(&features))
}
