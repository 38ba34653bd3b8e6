use tracing::{debug, info};

use crate::extension::{Extension, ExtensionContext};
use crate::hotkeys::Direction;
use crate::settings::SettingsKey;

/// Notifications and requests delivered to the event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A subscribed setting changed value
    SettingChanged(SettingsKey),
    /// Monitors were added, removed or reordered
    TopologyChanged,
    /// A registered move-window shortcut was pressed
    MoveWindow(Direction),
    Enable,
    Disable,
    /// Disable and leave the loop
    Shutdown,
}

/// Whether the loop should keep going after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Handle one event to completion
pub fn handle_event(ext: &mut Extension, ctx: &mut ExtensionContext<'_>, event: HostEvent) -> Flow {
    debug!(event = ?event, "Handling event");
    match event {
        HostEvent::SettingChanged(key) => ext.on_setting_changed(ctx, &key),
        HostEvent::TopologyChanged => ext.on_topology_changed(ctx),
        HostEvent::MoveWindow(direction) => {
            // geometry lives in the tiling manager, which is not part of this core
            info!(direction = ?direction, "Move window requested");
        }
        HostEvent::Enable => ext.enable(ctx),
        HostEvent::Disable => ext.disable(ctx),
        HostEvent::Shutdown => {
            ext.disable(ctx);
            return Flow::Exit;
        }
    }
    Flow::Continue
}
