use hashbrown::HashMap;

use crate::{entry::EntryData, types::EntryName};

/// Maps a raw journal identifier to a canonical entry name.
pub trait NameResolver: Send + Sync {
    /// Canonical name for `raw`, if known.
    fn resolve(&self, raw: &str) -> Option<EntryName>;

    /// Resolved name, or `raw` itself when unresolvable so the unknown-entry
    /// path downstream reports it.
    fn resolve_or_raw(&self, raw: &str) -> EntryName {
        self.resolve(raw).unwrap_or_else(|| raw.to_string())
    }
}

/// Catalog-backed resolver matching names and aliases case- and
/// punctuation-insensitively (`"chemicalprocessors"` → `"Chemical Processors"`).
#[derive(Debug, Default, Clone)]
pub struct ItemNameResolver {
    by_key: HashMap<String, EntryName>,
}

impl ItemNameResolver {
    /// Resolver over catalog names and aliases.
    pub fn new<'a>(catalog: impl IntoIterator<Item = &'a EntryData>) -> Self {
        let mut by_key = HashMap::new();
        for data in catalog {
            by_key.insert(normalize(&data.name), data.name.clone());
            for alias in &data.aliases {
                by_key
                    .entry(normalize(alias))
                    .or_insert_with(|| data.name.clone());
            }
        }
        Self { by_key }
    }
}

impl NameResolver for ItemNameResolver {
    fn resolve(&self, raw: &str) -> Option<EntryName> {
        self.by_key.get(&normalize(raw)).cloned()
    }
}

fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryKind;

    #[test]
    fn resolves_names_and_aliases_loosely() {
        let catalog = vec![
            EntryData::new("Chemical Processors", EntryKind::Material),
            EntryData::new("Iron", EntryKind::Material).with_alias("$iron_name;"),
        ];
        let resolver = ItemNameResolver::new(&catalog);

        assert_eq!(
            resolver.resolve("chemicalprocessors").as_deref(),
            Some("Chemical Processors")
        );
        assert_eq!(resolver.resolve("IRON").as_deref(), Some("Iron"));
        assert_eq!(resolver.resolve("$iron_name;").as_deref(), Some("Iron"));
        assert_eq!(resolver.resolve("gold"), None);
        assert_eq!(resolver.resolve_or_raw("gold"), "gold");
    }
}
