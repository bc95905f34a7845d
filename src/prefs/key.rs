use std::fmt;

use crate::recipe::RecipeId;

/// Structured preference key: a recipe, optionally scoped to a commander.
///
/// Text forms: legacy `"{recipe}"`, scoped `"{commander}:{recipe}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreferenceKey {
    /// Recipe display form.
    pub recipe: String,
    /// Owning commander; `None` for legacy keys.
    pub commander: Option<String>,
}

impl PreferenceKey {
    /// Unscoped key from before commander scoping.
    pub fn legacy(recipe: &RecipeId) -> Self {
        Self {
            recipe: recipe.to_string(),
            commander: None,
        }
    }

    /// Key owned by `commander`.
    pub fn scoped(commander: &str, recipe: &RecipeId) -> Self {
        Self {
            recipe: recipe.to_string(),
            commander: Some(commander.to_string()),
        }
    }

    /// True for unscoped keys.
    pub fn is_legacy(&self) -> bool {
        self.commander.is_none()
    }

    /// Stored text form.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PreferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.commander {
            Some(commander) => write!(f, "{commander}:{}", self.recipe),
            None => f.write_str(&self.recipe),
        }
    }
}
