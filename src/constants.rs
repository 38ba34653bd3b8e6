//! Application-wide constants
//!
//! Schema ids, setting keys and default values shared by the override
//! journal, the keybinding manager and the layout reconciler.

/// Schema ids of the host settings this extension reads or overrides
pub mod schema {
    /// The extension's own settings namespace
    pub const EXTENSION: &str = "org.gnome.shell.extensions.tilingshell";

    /// Native mutter settings (edge tiling, experimental features)
    pub const MUTTER: &str = "org.gnome.mutter";

    /// Native mutter keybindings (tiled left/right)
    pub const MUTTER_KEYBINDINGS: &str = "org.gnome.mutter.keybindings";

    /// Native window manager keybindings (maximize/unmaximize)
    pub const DESKTOP_WM_KEYBINDINGS: &str = "org.gnome.desktop.wm.keybindings";
}

/// Keys inside the extension's own namespace
pub mod keys {
    /// Serialized override journal blob
    pub const OVERRIDDEN_SETTINGS: &str = "overridden-settings";

    /// Serialized per-monitor layout assignment
    pub const SELECTED_LAYOUTS: &str = "selected-layouts";

    /// Version name written on every enable
    pub const LAST_VERSION_INSTALLED: &str = "last-version-installed";

    pub const MOVE_WINDOW_RIGHT: &str = "move-window-right";
    pub const MOVE_WINDOW_LEFT: &str = "move-window-left";
    pub const MOVE_WINDOW_UP: &str = "move-window-up";
    pub const MOVE_WINDOW_DOWN: &str = "move-window-down";
}

/// Keys inside the native namespaces
pub mod native {
    /// Boolean toggle for the host's own edge tiling (mutter)
    pub const EDGE_TILING: &str = "edge-tiling";

    /// String list of enabled mutter experimental features
    pub const EXPERIMENTAL_FEATURES: &str = "experimental-features";

    pub const TOGGLE_TILED_RIGHT: &str = "toggle-tiled-right";
    pub const TOGGLE_TILED_LEFT: &str = "toggle-tiled-left";
    pub const MAXIMIZE: &str = "maximize";
    pub const UNMAXIMIZE: &str = "unmaximize";
}

/// Experimental features that turn on fractional scaling
pub mod scaling {
    /// Wayland framebuffer scaling
    pub const SCALE_MONITOR_FRAMEBUFFER: &str = "scale-monitor-framebuffer";

    /// X11 RandR fractional scaling
    pub const X11_RANDR_FRACTIONAL_SCALING: &str = "x11-randr-fractional-scaling";
}

/// Default accelerators seeded into a fresh store
pub mod accelerators {
    pub const SUPER_RIGHT: &str = "<Super>Right";
    pub const SUPER_LEFT: &str = "<Super>Left";
    pub const SUPER_UP: &str = "<Super>Up";
    pub const SUPER_DOWN: &str = "<Super>Down";
    pub const ALT_F5: &str = "<Alt>F5";
}

/// Layout catalog defaults
pub mod layouts {
    /// Layout id used when the config file lists none
    pub const DEFAULT_LAYOUT: &str = "default-grid";
}

/// File locations (relative to XDG config/data dirs)
pub mod config {
    /// Directory name under the XDG config and data dirs
    pub const APP_DIR: &str = "tiling-overrides";

    /// Host configuration filename
    pub const FILENAME: &str = "config.json";

    /// Settings store filename
    pub const STORE_FILENAME: &str = "settings.json";
}
