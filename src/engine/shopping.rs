use hashbrown::HashMap;

use crate::{core::store::InventoryState, recipe::Recipe, types::EntryName};

/// Aggregate need for one entry across the shopping list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    /// Ingredient entry.
    pub entry: EntryName,
    /// Units needed for every planned craft.
    pub required: u64,
    /// Units in inventory.
    pub available: i64,
}

impl ShoppingItem {
    /// Units still to gather; zero when the inventory already covers the need.
    pub fn missing(&self) -> u64 {
        let available = u64::try_from(self.available.max(0)).unwrap_or(0);
        self.required.saturating_sub(available)
    }
}

/// Sums `ingredient.size × shopping_list_count` per entry, in first-seen
/// ingredient order.
pub fn shopping_list(recipes: &[Recipe], state: &InventoryState) -> Vec<ShoppingItem> {
    let mut order: Vec<EntryName> = Vec::new();
    let mut required: HashMap<EntryName, u64> = HashMap::new();

    for recipe in recipes.iter().filter(|r| r.shopping_list_count > 0) {
        for ingredient in &recipe.ingredients {
            let need = u64::from(ingredient.size) * u64::from(recipe.shopping_list_count);
            let slot = required.entry(ingredient.entry.clone()).or_insert_with(|| {
                order.push(ingredient.entry.clone());
                0
            });
            *slot += need;
        }
    }

    order
        .into_iter()
        .map(|entry| ShoppingItem {
            required: required.get(&entry).copied().unwrap_or(0),
            available: state.count(&entry).unwrap_or(0),
            entry,
        })
        .collect()
}
