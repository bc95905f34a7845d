use hashbrown::{HashMap, HashSet};

use crate::{core::store::InventoryState, recipe::Recipe, types::EntryName};

/// Entry → recipes cross-reference, built once per catalog load.
#[derive(Debug, Default, Clone)]
pub struct RecipeIndex {
    by_entry: HashMap<EntryName, Vec<usize>>,
    unused: HashSet<EntryName>,
}

impl RecipeIndex {
    /// Indexes `recipes` and writes the `unused` flag of every entry in `state`.
    pub fn build(state: &mut InventoryState, recipes: &[Recipe]) -> Self {
        let mut by_entry: HashMap<EntryName, Vec<usize>> = HashMap::new();
        for (idx, recipe) in recipes.iter().enumerate() {
            for ingredient in &recipe.ingredients {
                let ids = by_entry.entry(ingredient.entry.clone()).or_default();
                if ids.last() != Some(&idx) {
                    ids.push(idx);
                }
            }
        }

        let names: Vec<EntryName> = state.catalog().map(|d| d.name.clone()).collect();
        let mut unused = HashSet::new();
        for name in names {
            let is_unused = !by_entry.contains_key(&name);
            state.set_unused(&name, is_unused);
            if is_unused {
                unused.insert(name);
            }
        }

        Self { by_entry, unused }
    }

    /// Positions, in the recipe slice given to [`Self::build`], of recipes using `entry`.
    pub fn recipes_using(&self, entry: &str) -> &[usize] {
        self.by_entry.get(entry).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when some recipe uses `entry`.
    pub fn is_referenced(&self, entry: &str) -> bool {
        self.by_entry.contains_key(entry)
    }

    /// True for catalog entries no recipe uses.
    pub fn is_unused(&self, entry: &str) -> bool {
        self.unused.contains(entry)
    }

    /// Unused catalog entries, unordered.
    pub fn unused(&self) -> impl Iterator<Item = &EntryName> {
        self.unused.iter()
    }
}
