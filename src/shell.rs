//! Line-oriented host simulator for `run`
//!
//! Each stdin line is one thing the desktop would do: change the monitor
//! list, edit a setting, press a shortcut. Commands mutate the context
//! directly; the notifications they cause reach the extension through the
//! event channel like any other host event.

use anyhow::{anyhow, bail, Context, Result};

use crate::event_handler::HostEvent;
use crate::settings::SettingsKey;
use crate::variant::{self, Variant};

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    /// Replace the monitor list with these scale factors
    Monitors(Vec<f64>),
    /// Replace the layout catalog
    Layouts(Vec<String>),
    Set(SettingsKey, Variant),
    Get(SettingsKey),
    Press(String),
    Select { monitor: usize, layout: String },
    Override(SettingsKey, Variant),
    Restore(SettingsKey),
    RestoreAll,
    Status,
    Help,
    /// Lifecycle requests forwarded as events
    Event(HostEvent),
}

pub const HELP: &str = "\
commands:
  monitors <scale>...           replace the monitor list
  layouts <id>...               replace the layout catalog
  set <namespace> <key> <value> write a setting (value in printed form)
  get <namespace> <key>         print a setting
  press <accelerator>           press a shortcut
  select <monitor> <layout>     choose a layout for one monitor
  override <namespace> <key> <value>
  restore <namespace> <key>
  restore-all
  status
  help
  enable | disable | quit";

/// Parse one input line. Blank lines and `#` comments yield None.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "monitors" => ShellCommand::Monitors(
            rest.split_whitespace()
                .map(|scale| {
                    scale
                        .parse::<f64>()
                        .with_context(|| format!("Invalid scale factor '{scale}'"))
                })
                .collect::<Result<_>>()?,
        ),
        "layouts" => {
            let ids: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
            if ids.is_empty() {
                bail!("layouts needs at least one id");
            }
            ShellCommand::Layouts(ids)
        }
        "set" => {
            let (key, value) = key_and_value(rest)?;
            ShellCommand::Set(key, value)
        }
        "override" => {
            let (key, value) = key_and_value(rest)?;
            ShellCommand::Override(key, value)
        }
        "get" => ShellCommand::Get(key_only(rest)?),
        "restore" => ShellCommand::Restore(key_only(rest)?),
        "restore-all" => ShellCommand::RestoreAll,
        "press" => {
            if rest.is_empty() {
                bail!("press needs an accelerator");
            }
            ShellCommand::Press(rest.to_string())
        }
        "select" => {
            let mut parts = rest.split_whitespace();
            let monitor = parts
                .next()
                .ok_or_else(|| anyhow!("select needs a monitor index"))?
                .parse::<usize>()
                .context("Invalid monitor index")?;
            let layout = parts
                .next()
                .ok_or_else(|| anyhow!("select needs a layout id"))?
                .to_string();
            ShellCommand::Select { monitor, layout }
        }
        "status" => ShellCommand::Status,
        "help" | "?" => ShellCommand::Help,
        "enable" => ShellCommand::Event(HostEvent::Enable),
        "disable" => ShellCommand::Event(HostEvent::Disable),
        "quit" | "exit" => ShellCommand::Event(HostEvent::Shutdown),
        other => bail!("Unknown command '{other}'"),
    };
    Ok(Some(command))
}

fn key_only(rest: &str) -> Result<SettingsKey> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(namespace), Some(key), None) => Ok(SettingsKey::new(namespace, key)),
        _ => bail!("expected <namespace> <key>"),
    }
}

fn key_and_value(rest: &str) -> Result<(SettingsKey, Variant)> {
    let mut parts = rest.splitn(3, char::is_whitespace);
    let (Some(namespace), Some(key), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("expected <namespace> <key> <value>");
    };
    let value = variant::decode(value).with_context(|| format!("Invalid value '{value}'"))?;
    Ok((SettingsKey::new(namespace, key), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_set_keeps_spaces_in_value() {
        let command = parse_line("set org.gnome.desktop.wm.keybindings unmaximize ['<Super>Down', '<Alt>F5']")
            .unwrap()
            .unwrap();
        assert_eq!(
            command,
            ShellCommand::Set(
                SettingsKey::new("org.gnome.desktop.wm.keybindings", "unmaximize"),
                Variant::strv(["<Super>Down", "<Alt>F5"])
            )
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(
            parse_line("monitors 1 1.25").unwrap(),
            Some(ShellCommand::Monitors(vec![1.0, 1.25]))
        );
        assert_eq!(parse_line("monitors").unwrap(), Some(ShellCommand::Monitors(vec![])));
        assert_eq!(
            parse_line("select 1 columns").unwrap(),
            Some(ShellCommand::Select { monitor: 1, layout: "columns".into() })
        );
        assert_eq!(
            parse_line("press <Super>Left").unwrap(),
            Some(ShellCommand::Press("<Super>Left".into()))
        );
        assert_eq!(parse_line("quit").unwrap(), Some(ShellCommand::Event(HostEvent::Shutdown)));
        assert_eq!(parse_line("  # comment").unwrap(), None);
        assert_eq!(parse_line("").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_line("frobnicate").is_err());
        assert!(parse_line("monitors one").is_err());
        assert!(parse_line("layouts").is_err());
        assert!(parse_line("set org.gnome.mutter edge-tiling maybe").is_err());
        assert!(parse_line("restore org.gnome.mutter").is_err());
        assert!(parse_line("select x grid").is_err());
    }
}
