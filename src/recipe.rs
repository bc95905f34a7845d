//! Crafting recipes and their ingredients.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::EntryName;

/// Composite recipe identity.
///
/// The [`fmt::Display`] form is the text used inside preference keys, so it
/// must stay stable across releases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecipeId {
    /// Blueprint family, e.g. `"FSD"`.
    pub category: String,
    /// Variant name, e.g. `"Increased Range"`.
    pub name: String,
    /// Grade, when the recipe is graded.
    #[serde(default)]
    pub grade: Option<u32>,
}

impl RecipeId {
    /// Ungraded recipe id.
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            grade: None,
        }
    }

    /// Graded recipe id.
    pub fn graded(category: impl Into<String>, name: impl Into<String>, grade: u32) -> Self {
        Self {
            grade: Some(grade),
            ..Self::new(category, name)
        }
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.grade {
            Some(grade) => write!(f, "{} {} (G{grade})", self.category, self.name),
            None => write!(f, "{} {}", self.category, self.name),
        }
    }
}

/// One required input of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Referenced entry, by canonical name.
    pub entry: EntryName,
    /// Units consumed per craft.
    pub size: u32,
}

impl Ingredient {
    /// Ingredient requiring `size` units of `entry`.
    pub fn new(entry: impl Into<EntryName>, size: u32) -> Self {
        Self {
            entry: entry.into(),
            size,
        }
    }
}

/// Catalog recipe plus the three consumer-settable flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Identity.
    pub id: RecipeId,
    /// Ordered ingredient list.
    pub ingredients: Vec<Ingredient>,
    /// Marked favorite for the active commander.
    #[serde(skip)]
    pub favorite: bool,
    /// Hidden by the active commander.
    #[serde(skip)]
    pub ignored: bool,
    /// Planned crafts on the shopping list.
    #[serde(skip)]
    pub shopping_list_count: u32,
}

impl Recipe {
    /// Recipe with cleared flags.
    pub fn new(id: RecipeId, ingredients: Vec<Ingredient>) -> Self {
        Self {
            id,
            ingredients,
            favorite: false,
            ignored: false,
            shopping_list_count: 0,
        }
    }

    /// True when any ingredient references `entry`.
    pub fn uses(&self, entry: &str) -> bool {
        self.ingredients.iter().any(|i| i.entry == entry)
    }
}
