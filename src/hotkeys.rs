use std::collections::BTreeMap;
use std::sync::mpsc::Sender;
use tracing::{debug, info, warn};

use crate::event_handler::HostEvent;
use crate::settings::{SettingsKey, SettingsStore};

/// Keyboard "move window" direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// Shell action modes in which a shortcut is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMode {
    /// Regular desktop, no modal dialog or overview
    Normal,
}

/// The host's key-dispatch facility.
///
/// An action is registered by name; its accelerators live in the settings
/// key `settings`, so re-binding the shortcut needs no re-registration.
pub trait KeyDispatcher {
    /// Returns false if the host refused the registration
    fn register(
        &mut self,
        action: &str,
        settings: &SettingsKey,
        mode: ActionMode,
        direction: Direction,
    ) -> bool;

    /// Returns false if `action` was not registered
    fn unregister(&mut self, action: &str) -> bool;

    fn is_registered(&self, action: &str) -> bool;
}

#[derive(Debug)]
struct Registration {
    settings: SettingsKey,
    mode: ActionMode,
    direction: Direction,
}

/// In-process dispatcher: resolves a pressed accelerator against the
/// registered actions and sends `HostEvent::MoveWindow` to the event loop.
pub struct SessionDispatcher {
    sender: Sender<HostEvent>,
    actions: BTreeMap<String, Registration>,
}

impl SessionDispatcher {
    pub fn new(sender: Sender<HostEvent>) -> Self {
        Self {
            sender,
            actions: BTreeMap::new(),
        }
    }

    /// Dispatch a key press. Returns the number of actions it activated.
    pub fn press(&self, store: &dyn SettingsStore, accelerator: &str) -> usize {
        let mut activated = 0;
        for (action, registration) in &self.actions {
            let bound = store.get_strv(&registration.settings).unwrap_or_default();
            if !bound.iter().any(|accel| accel == accelerator) {
                continue;
            }
            debug!(action = %action, mode = ?registration.mode, "Shortcut matched");
            match self.sender.send(HostEvent::MoveWindow(registration.direction)) {
                Ok(()) => activated += 1,
                Err(e) => warn!(action = %action, error = %e, "Event loop is gone, dropping shortcut"),
            }
        }
        if activated == 0 {
            info!(accelerator = %accelerator, "No extension action bound to accelerator");
        }
        activated
    }
}

impl KeyDispatcher for SessionDispatcher {
    fn register(
        &mut self,
        action: &str,
        settings: &SettingsKey,
        mode: ActionMode,
        direction: Direction,
    ) -> bool {
        if self.actions.contains_key(action) {
            warn!(action = %action, "Action already registered");
            return false;
        }
        info!(action = %action, direction = ?direction, "Registered keybinding");
        self.actions.insert(
            action.to_string(),
            Registration {
                settings: settings.clone(),
                mode,
                direction,
            },
        );
        true
    }

    fn unregister(&mut self, action: &str) -> bool {
        let removed = self.actions.remove(action).is_some();
        if removed {
            info!(action = %action, "Unregistered keybinding");
        }
        removed
    }

    fn is_registered(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }
}
