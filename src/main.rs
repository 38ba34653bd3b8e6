#![forbid(unsafe_code)]

mod config;
mod constants;
mod event_handler;
mod extension;
mod hotkeys;
mod journal;
mod keybindings;
mod layouts;
mod monitors;
mod persistence;
mod settings;
mod shell;
mod subscription;
#[cfg(test)]
mod testing;
mod variant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{error, info, warn, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use config::HostConfig;
use event_handler::{handle_event, Flow, HostEvent};
use extension::{experimental_features_key, is_fractional_scaling, Extension, ExtensionContext};
use hotkeys::{KeyDispatcher, SessionDispatcher};
use journal::OverrideJournal;
use layouts::{Catalog, LayoutCatalog, StaticCatalog};
use monitors::{MonitorTopology, StaticTopology};
use persistence::JsonSettingsStore;
use settings::{SettingsKey, SettingsStore};
use shell::ShellCommand;

#[derive(Debug, Parser)]
#[command(about, version)]
struct Cli {
    /// Host config file (defaults to the user config dir)
    #[arg(short, long, value_name = "path")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Enable the extension and read host events from stdin (default)
    Run,
    /// Print monitors, layout assignment and overridden settings
    Status,
    /// Override a setting, journaling its original value
    Override {
        namespace: String,
        key: String,
        /// New value in printed form, e.g. "['<Super>Left']"
        value: String,
    },
    /// Put back the original value of one overridden setting
    Restore { namespace: String, key: String },
    /// Put back every overridden setting
    RestoreAll,
    /// Repair the persisted layout assignment once and exit
    Reconcile,
}

/// Concrete host collaborators owned by the binary
struct Host {
    store: JsonSettingsStore,
    topology: StaticTopology,
    catalog: StaticCatalog,
    dispatcher: SessionDispatcher,
}

impl Host {
    fn open(config: &HostConfig, events: Sender<HostEvent>) -> Result<Self> {
        let store = JsonSettingsStore::open(config.store_path())?;
        Ok(Self {
            store,
            topology: StaticTopology::new(config.monitors.clone()),
            catalog: StaticCatalog::new(config.catalog()),
            dispatcher: SessionDispatcher::new(events),
        })
    }

    fn context(&mut self) -> ExtensionContext<'_> {
        ExtensionContext {
            store: &mut self.store,
            topology: &mut self.topology,
            catalog: &self.catalog,
            dispatcher: &mut self.dispatcher,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(HostConfig::default_path);
    let (config, created) = HostConfig::load(&config_path)?;

    // LOG_LEVEL wins over the config file
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| config.log_level.clone())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if created {
        info!(path = %config_path.display(), "Wrote default config");
    }

    let (tx, rx) = mpsc::channel();
    let mut host = Host::open(&config, tx.clone())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_shell(&mut host, tx, rx)?,
        Command::Status => {
            let features = host
                .store
                .get_strv(&experimental_features_key())
                .unwrap_or_default();
            print_status(&host, !is_fractional_scaling(&features));
        }
        Command::Override { namespace, key, value } => {
            let key = SettingsKey::new(namespace, key);
            let value = variant::decode(&value).with_context(|| format!("Invalid value '{value}'"))?;
            let mut journal = OverrideJournal::load(&host.store);
            if !journal.override_value(&mut host.store, &key, value) {
                bail!("Could not override {key}");
            }
            println!("overridden {key} (original {})", journal_original(&journal, &key));
        }
        Command::Restore { namespace, key } => {
            let key = SettingsKey::new(namespace, key);
            let mut journal = OverrideJournal::load(&host.store);
            if !journal.restore(&mut host.store, &key) {
                bail!("Could not restore {key}");
            }
            println!("restored {key}");
        }
        Command::RestoreAll => {
            let mut journal = OverrideJournal::load(&host.store);
            let restored = journal.restore_all(&mut host.store);
            println!("restored {restored}, {} left", journal.len());
            if !journal.is_empty() {
                bail!("{} settings could not be restored", journal.len());
            }
        }
        Command::Reconcile => {
            let mut ext = Extension::new(env!("CARGO_PKG_VERSION"), tx);
            let assignment = ext.reconcile_layouts(&mut host.context());
            println!("{}", assignment.join(" "));
        }
    }

    Ok(())
}

fn journal_original(journal: &OverrideJournal, key: &SettingsKey) -> String {
    journal
        .original(key)
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Handle queued notifications until the channel is empty
fn drain(ext: &mut Extension, host: &mut Host, rx: &Receiver<HostEvent>) -> Flow {
    while let Ok(event) = rx.try_recv() {
        if handle_event(ext, &mut host.context(), event) == Flow::Exit {
            return Flow::Exit;
        }
    }
    Flow::Continue
}

fn run_shell(host: &mut Host, tx: Sender<HostEvent>, rx: Receiver<HostEvent>) -> Result<()> {
    let mut ext = Extension::new(env!("CARGO_PKG_VERSION"), tx.clone());
    handle_event(&mut ext, &mut host.context(), HostEvent::Enable);
    drain(&mut ext, host, &rx);
    info!(store = %host.store.path().display(), "Ready, type 'help' for commands");

    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let command = match shell::parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!("{e:#}");
                continue;
            }
        };

        apply(&mut ext, host, &tx, command);

        if drain(&mut ext, host, &rx) == Flow::Exit {
            return Ok(());
        }
    }

    info!("stdin closed, shutting down");
    handle_event(&mut ext, &mut host.context(), HostEvent::Shutdown);
    Ok(())
}

fn apply(ext: &mut Extension, host: &mut Host, tx: &Sender<HostEvent>, command: ShellCommand) {
    match command {
        ShellCommand::Monitors(scales) => host.topology.set_scales(scales),
        ShellCommand::Layouts(ids) => match Catalog::new(ids) {
            Some(catalog) => {
                host.catalog.replace(catalog);
                // catalog edits raise no event of their own
                if ext.is_enabled() {
                    ext.reconcile_layouts(&mut host.context());
                }
            }
            None => warn!("Layout catalog cannot be empty"),
        },
        ShellCommand::Set(key, value) => {
            if !host.store.set_value(&key, value) {
                error!(setting = %key, "Store rejected write");
            }
        }
        ShellCommand::Get(key) => match host.store.get_value(&key) {
            Some(value) => println!("{key} = {value}"),
            None => println!("{key} is unset"),
        },
        ShellCommand::Press(accelerator) => {
            host.dispatcher.press(&host.store, &accelerator);
        }
        ShellCommand::Select { monitor, layout } => {
            if !ext.select_layout(&mut host.context(), monitor, &layout) {
                warn!(monitor, layout = %layout, "Layout not selected");
            }
        }
        ShellCommand::Override(key, value) => match ext.journal_mut() {
            Some(journal) => {
                if journal.override_value(&mut host.store, &key, value) {
                    println!("overridden {key} (original {})", journal_original(journal, &key));
                }
            }
            None => warn!("Extension is disabled, no journal loaded"),
        },
        ShellCommand::Restore(key) => match ext.journal_mut() {
            Some(journal) => {
                if journal.restore(&mut host.store, &key) {
                    println!("restored {key}");
                }
            }
            None => warn!("Extension is disabled, no journal loaded"),
        },
        ShellCommand::RestoreAll => match ext.journal_mut() {
            Some(journal) => {
                let restored = journal.restore_all(&mut host.store);
                println!("restored {restored}, {} left", journal.len());
            }
            None => warn!("Extension is disabled, no journal loaded"),
        },
        ShellCommand::Status => print_status(host, ext.scaling_enabled()),
        ShellCommand::Help => println!("{}", shell::HELP),
        ShellCommand::Event(event) => {
            if let Err(e) = tx.send(event) {
                error!(error = %e, "Failed to queue event");
            }
        }
    }
}

fn print_status(host: &Host, scaling_enabled: bool) {
    let store: &dyn SettingsStore = &host.store;
    println!("store: {}", host.store.path().display());
    if let Some(version) = store.get_string(&SettingsKey::new(
        constants::schema::EXTENSION,
        constants::keys::LAST_VERSION_INSTALLED,
    )) {
        println!("last version installed: {version}");
    }
    println!("scaling: {}", if scaling_enabled { "extension" } else { "fractional (host)" });
    let edge_tiling = store.get_bool(&SettingsKey::new(
        constants::schema::MUTTER,
        constants::native::EDGE_TILING,
    ));
    println!("native edge tiling: {}", edge_tiling.map_or("unset".to_string(), |on| on.to_string()));
    for binding in keybindings::default_bindings() {
        let state = if host.dispatcher.is_registered(&binding.action) {
            "registered"
        } else {
            "not registered"
        };
        println!("shortcut {}: {state}", binding.action);
    }

    println!("catalog: {}", host.catalog.catalog().ids().join(", "));
    let assignment = layouts::load_assignment(store);
    for monitor in host.topology.monitors() {
        let layout = assignment.get(monitor.index).map(String::as_str).unwrap_or("-");
        println!("monitor {} (scale {}): {layout}", monitor.index, monitor.scale_factor);
    }

    let journal = OverrideJournal::load(store);
    if journal.is_empty() {
        println!("no overridden settings");
    }
    for (key, original) in journal.entries() {
        let current = store
            .get_value(key)
            .map(|value| value.to_string())
            .unwrap_or_else(|| "unset".to_string());
        println!("overridden {key}: {current} (original {original})");
    }
}
