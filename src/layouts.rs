//! Per-monitor layout assignment
//!
//! The assignment is an ordered list of layout ids, one per monitor
//! topology index. It is persisted as a JSON array of strings under the
//! extension's `selected-layouts` key and repaired by [`reconcile`]
//! whenever the monitor list or the layout catalog may have moved under it.

use tracing::{debug, warn};

use crate::constants::{keys, schema};
use crate::settings::{SettingsKey, SettingsStore};
use crate::variant::{DecodeError, Variant};

pub type LayoutId = String;

/// Ordered, non-empty list of known layout ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    ids: Vec<LayoutId>,
}

impl Catalog {
    /// None if `ids` is empty
    pub fn new(ids: Vec<LayoutId>) -> Option<Self> {
        if ids.is_empty() {
            None
        } else {
            Some(Self { ids })
        }
    }

    pub fn single(id: impl Into<LayoutId>) -> Self {
        Self { ids: vec![id.into()] }
    }

    pub fn first(&self) -> &LayoutId {
        &self.ids[0]
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|known| known == id)
    }

    pub fn ids(&self) -> &[LayoutId] {
        &self.ids
    }
}

/// Source of the current layout catalog. Re-read on every reconciliation.
pub trait LayoutCatalog {
    fn catalog(&self) -> Catalog;
}

/// Catalog backed by a fixed list (config file or shell)
pub struct StaticCatalog {
    catalog: Catalog,
}

impl StaticCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn replace(&mut self, catalog: Catalog) {
        self.catalog = catalog;
    }
}

impl LayoutCatalog for StaticCatalog {
    fn catalog(&self) -> Catalog {
        self.catalog.clone()
    }
}

/// Repair `assignment` so it has exactly `monitor_count` entries, all
/// members of `catalog`.
///
/// Missing slots copy the first monitor's layout. Unknown ids are replaced
/// by the first still-valid entry, or by the catalog's first layout if none
/// is valid.
pub fn reconcile(assignment: &[LayoutId], monitor_count: usize, catalog: &Catalog) -> Vec<LayoutId> {
    let mut result = assignment.to_vec();

    if result.is_empty() {
        result.push(catalog.first().clone());
    }

    result.truncate(monitor_count);

    while result.len() < monitor_count {
        let first = result[0].clone();
        result.push(first);
    }

    let fallback = result
        .iter()
        .find(|id| catalog.contains(id))
        .unwrap_or_else(|| catalog.first())
        .clone();

    for id in result.iter_mut() {
        if !catalog.contains(id) {
            debug!(layout = %id, fallback = %fallback, "Replacing unknown layout");
            *id = fallback.clone();
        }
    }

    result
}

fn assignment_key() -> SettingsKey {
    SettingsKey::new(schema::EXTENSION, keys::SELECTED_LAYOUTS)
}

/// Parse a persisted assignment blob.
pub fn parse_assignment(value: &Variant) -> Result<Vec<LayoutId>, DecodeError> {
    let text = value.as_str().ok_or(DecodeError::WrongKind {
        expected: "string",
        found: value.kind(),
    })?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(text)?)
}

/// Read the persisted assignment. Absent or corrupt data reads as empty,
/// which the reconciler then seeds.
pub fn load_assignment(store: &dyn SettingsStore) -> Vec<LayoutId> {
    let Some(value) = store.get_value(&assignment_key()) else {
        return Vec::new();
    };
    parse_assignment(&value).unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring malformed layout assignment");
        Vec::new()
    })
}

/// Persist `assignment`, skipping the write if the store already holds it.
/// Returns false if the store rejected the write.
pub fn save_assignment(store: &mut dyn SettingsStore, assignment: &[LayoutId]) -> bool {
    let key = assignment_key();
    let unchanged = store
        .get_value(&key)
        .and_then(|value| parse_assignment(&value).ok())
        .is_some_and(|current| current == assignment);
    if unchanged {
        debug!("Layout assignment unchanged, skipping write");
        return true;
    }

    let json = match serde_json::to_string(assignment) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Failed to serialize layout assignment");
            return false;
        }
    };
    store.set_value(&key, Variant::Str(json))
}
