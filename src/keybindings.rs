//! Session-scoped takeover of native window-management shortcuts
//!
//! While enabled, the four directional "move window" actions are
//! registered with the host dispatcher. A native binding that shares the
//! action's accelerator is cleared so both handlers don't fire, and the
//! host's own edge tiling is switched off. Everything touched is restored
//! on disable; nothing here is persisted.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::constants::{keys, native, schema};
use crate::hotkeys::{ActionMode, Direction, KeyDispatcher};
use crate::settings::{SettingsKey, SettingsStore};
use crate::variant::Variant;

/// One extension action and the native binding it replaces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Action name, also its key in the extension's namespace
    pub action: String,
    pub native: SettingsKey,
    pub direction: Direction,
}

impl Binding {
    pub fn new(action: &str, native: SettingsKey, direction: Direction) -> Self {
        Self {
            action: action.to_string(),
            native,
            direction,
        }
    }

    fn settings(&self) -> SettingsKey {
        SettingsKey::new(schema::EXTENSION, self.action.as_str())
    }
}

/// The four move-window actions and the native bindings they shadow
pub fn default_bindings() -> Vec<Binding> {
    vec![
        Binding::new(
            keys::MOVE_WINDOW_RIGHT,
            SettingsKey::new(schema::MUTTER_KEYBINDINGS, native::TOGGLE_TILED_RIGHT),
            Direction::Right,
        ),
        Binding::new(
            keys::MOVE_WINDOW_LEFT,
            SettingsKey::new(schema::MUTTER_KEYBINDINGS, native::TOGGLE_TILED_LEFT),
            Direction::Left,
        ),
        Binding::new(
            keys::MOVE_WINDOW_UP,
            SettingsKey::new(schema::DESKTOP_WM_KEYBINDINGS, native::MAXIMIZE),
            Direction::Up,
        ),
        Binding::new(
            keys::MOVE_WINDOW_DOWN,
            SettingsKey::new(schema::DESKTOP_WM_KEYBINDINGS, native::UNMAXIMIZE),
            Direction::Down,
        ),
    ]
}

fn edge_tiling_key() -> SettingsKey {
    SettingsKey::new(schema::MUTTER, native::EDGE_TILING)
}

#[derive(Debug, Default)]
struct Session {
    /// Native values as they were before this session touched them
    originals: BTreeMap<SettingsKey, Variant>,
    registered: Vec<String>,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Disabled,
    Enabled(Session),
}

#[derive(Debug, Default)]
pub struct KeybindingOverrideManager {
    state: State,
}

impl KeybindingOverrideManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.state, State::Enabled(_))
    }

    /// Actions registered by the current session
    pub fn registered(&self) -> &[String] {
        match &self.state {
            State::Enabled(session) => &session.registered,
            State::Disabled => &[],
        }
    }

    /// Take over `bindings` and disable native edge tiling. No-op if
    /// already enabled.
    pub fn enable(
        &mut self,
        store: &mut dyn SettingsStore,
        dispatcher: &mut dyn KeyDispatcher,
        bindings: &[Binding],
    ) {
        if self.is_enabled() {
            debug!("Keybinding overrides already enabled");
            return;
        }

        let mut session = Session::default();
        for binding in bindings {
            steal_native(store, &mut session, binding);

            if dispatcher.register(
                &binding.action,
                &binding.settings(),
                ActionMode::Normal,
                binding.direction,
            ) {
                session.registered.push(binding.action.clone());
            } else {
                warn!(action = %binding.action, "Host refused keybinding registration");
            }
        }

        let edge_tiling = edge_tiling_key();
        match store.get_value(&edge_tiling) {
            Some(original @ Variant::Bool(_)) => {
                if store.set_value(&edge_tiling, Variant::Bool(false)) {
                    session.originals.entry(edge_tiling).or_insert(original);
                } else {
                    warn!("Store rejected disabling native edge tiling");
                }
            }
            Some(other) => warn!(kind = other.kind(), "Native edge tiling is not a boolean, leaving it alone"),
            None => debug!("Host has no edge tiling setting"),
        }

        info!(
            registered = session.registered.len(),
            overridden = session.originals.len(),
            "Keybinding overrides enabled"
        );
        self.state = State::Enabled(session);
    }

    /// Unregister every action, then put every native value back. No-op
    /// if not enabled.
    pub fn disable(&mut self, store: &mut dyn SettingsStore, dispatcher: &mut dyn KeyDispatcher) {
        let State::Enabled(session) = std::mem::take(&mut self.state) else {
            debug!("Keybinding overrides not enabled");
            return;
        };

        for action in &session.registered {
            if !dispatcher.unregister(action) {
                warn!(action = %action, "Action was not registered with the host");
            }
        }

        for (key, original) in session.originals {
            if !store.set_value(&key, original) {
                warn!(setting = %key, "Store rejected restoring native setting");
            }
        }

        info!("Keybinding overrides disabled");
    }
}

/// Clear `binding.native` if it holds the accelerator the action uses,
/// remembering its list for restore.
fn steal_native(store: &mut dyn SettingsStore, session: &mut Session, binding: &Binding) {
    let Some(accelerator) = store
        .get_strv(&binding.settings())
        .and_then(|accels| accels.into_iter().next())
    else {
        debug!(action = %binding.action, "Action has no accelerator");
        return;
    };
    let Some(native_accels) = store.get_strv(&binding.native) else {
        debug!(setting = %binding.native, "No native binding to shadow");
        return;
    };
    if !native_accels.contains(&accelerator) {
        return;
    }

    if store.set_value(&binding.native, Variant::StringList(vec![])) {
        info!(setting = %binding.native, accelerator = %accelerator, "Cleared native binding");
        session
            .originals
            .entry(binding.native.clone())
            .or_insert(Variant::StringList(native_accels));
    } else {
        warn!(setting = %binding.native, "Store rejected clearing native binding");
    }
}
