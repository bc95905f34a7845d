use tracing::info;

use crate::recipe::Recipe;

use super::{PrefList, PreferenceSet, key::PreferenceKey};

/// Upper bound on a recipe's shopping-list count. Each planned craft is one
/// stored key, so the bound caps the size of the persisted list.
pub const MAX_SHOPPING_LIST_COUNT: u32 = 999;

/// Counts from one [`PreferenceBook::migrate`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    /// Legacy keys rewritten into the scoped form.
    pub migrated: usize,
    /// Legacy duplicates dropped because a scoped key already existed.
    pub cleaned: usize,
}

impl MigrationReport {
    /// True when the pass changed nothing.
    pub fn is_noop(&self) -> bool {
        self.migrated == 0 && self.cleaned == 0
    }
}

/// In-memory preference collections for one commander, with dirty tracking.
///
/// Every method that changes the collections marks the book dirty; the owner
/// hands [`PreferenceBook::prefs`] to a store and then calls
/// [`PreferenceBook::mark_saved`].
#[derive(Debug, Clone)]
pub struct PreferenceBook {
    commander: String,
    prefs: PreferenceSet,
    dirty: bool,
}

impl PreferenceBook {
    /// Book for `commander` over the loaded collections.
    pub fn new(commander: impl Into<String>, prefs: PreferenceSet) -> Self {
        Self {
            commander: commander.into(),
            prefs,
            dirty: false,
        }
    }

    /// Commander scoping new keys.
    pub fn commander(&self) -> &str {
        &self.commander
    }

    /// Current collections.
    pub fn prefs(&self) -> &PreferenceSet {
        &self.prefs
    }

    /// True when the collections changed since the last save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty mark.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Sets the dirty mark.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Adopts persisted flags into `recipes`, upgrading legacy keys of the
    /// active commander to scoped keys. A second pass is a no-op.
    pub fn migrate(&mut self, recipes: &mut [Recipe]) -> MigrationReport {
        let mut report = MigrationReport::default();

        for recipe in recipes.iter_mut() {
            let scoped = PreferenceKey::scoped(&self.commander, &recipe.id).encode();
            let legacy = PreferenceKey::legacy(&recipe.id).encode();

            recipe.favorite = self.adopt(PrefList::Favorites, &scoped, &legacy, &mut report) > 0;
            recipe.ignored = self.adopt(PrefList::Ignored, &scoped, &legacy, &mut report) > 0;
            let count = self.adopt(PrefList::ShoppingList, &scoped, &legacy, &mut report);
            recipe.shopping_list_count = u32::try_from(count).unwrap_or(u32::MAX);
        }

        if !report.is_noop() {
            info!(
                commander = %self.commander,
                migrated = report.migrated,
                cleaned = report.cleaned,
                "preferences_migrated"
            );
        }
        report
    }

    // Returns the adopted multiplicity of the scoped key after reconciling.
    fn adopt(
        &mut self,
        list: PrefList,
        scoped: &str,
        legacy: &str,
        report: &mut MigrationReport,
    ) -> usize {
        let scoped_n = self.prefs.occurrences(list, scoped);
        let legacy_n = self.prefs.occurrences(list, legacy);

        if scoped_n > 0 {
            if legacy_n > 0 {
                self.remove_all(list, legacy);
                report.cleaned += 1;
            }
            return scoped_n;
        }

        if legacy_n == 0 {
            return 0;
        }

        self.remove_all(list, legacy);
        let keep = match list {
            PrefList::ShoppingList => legacy_n,
            PrefList::Favorites | PrefList::Ignored => 1,
        };
        let entries = self.prefs.list_mut(list);
        entries.extend(std::iter::repeat_n(scoped.to_string(), keep));
        self.dirty = true;
        report.migrated += 1;
        keep
    }

    /// Sets the favorite flag and its scoped key; false when unchanged.
    pub fn set_favorite(&mut self, recipe: &mut Recipe, favorite: bool) -> bool {
        if recipe.favorite == favorite {
            return false;
        }
        recipe.favorite = favorite;
        self.set_flag(PrefList::Favorites, recipe, favorite);
        true
    }

    /// Sets the ignored flag and its scoped key; false when unchanged.
    pub fn set_ignored(&mut self, recipe: &mut Recipe, ignored: bool) -> bool {
        if recipe.ignored == ignored {
            return false;
        }
        recipe.ignored = ignored;
        self.set_flag(PrefList::Ignored, recipe, ignored);
        true
    }

    /// Rewrites the shopping-list occurrences of `recipe` to exactly `count`.
    /// Counts above [`MAX_SHOPPING_LIST_COUNT`] are rejected.
    pub fn set_shopping_list_count(&mut self, recipe: &mut Recipe, count: u32) -> bool {
        if recipe.shopping_list_count == count || count > MAX_SHOPPING_LIST_COUNT {
            return false;
        }
        let key = PreferenceKey::scoped(&self.commander, &recipe.id).encode();
        self.remove_all(PrefList::ShoppingList, &key);
        self.prefs
            .shopping_list
            .extend(std::iter::repeat_n(key, count as usize));
        recipe.shopping_list_count = count;
        self.dirty = true;
        true
    }

    /// Adds `delta` to the shopping-list count; a result below zero or above
    /// [`MAX_SHOPPING_LIST_COUNT`] is rejected and nothing changes.
    pub fn shopping_list_change(&mut self, recipe: &mut Recipe, delta: i64) -> bool {
        let Some(proposed) = i64::from(recipe.shopping_list_count).checked_add(delta) else {
            return false;
        };
        let Ok(count) = u32::try_from(proposed) else {
            return false;
        };
        self.set_shopping_list_count(recipe, count)
    }

    fn set_flag(&mut self, list: PrefList, recipe: &Recipe, on: bool) {
        let key = PreferenceKey::scoped(&self.commander, &recipe.id).encode();
        self.remove_all(list, &key);
        if on {
            self.prefs.list_mut(list).push(key);
        }
        self.dirty = true;
    }

    fn remove_all(&mut self, list: PrefList, key: &str) {
        let entries = self.prefs.list_mut(list);
        let before = entries.len();
        entries.retain(|k| k != key);
        if entries.len() != before {
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{Ingredient, RecipeId};

    fn recipe(name: &str) -> Recipe {
        Recipe::new(RecipeId::new("FSD", name), vec![Ingredient::new("Iron", 1)])
    }

    #[test]
    fn legacy_favorite_migrates_once() {
        let prefs = PreferenceSet {
            favorites: vec!["FSD RecipeX".to_string()],
            ..PreferenceSet::default()
        };
        let mut book = PreferenceBook::new("CMDR_A", prefs);
        let mut recipes = vec![recipe("RecipeX")];

        let first = book.migrate(&mut recipes);
        assert_eq!(first.migrated, 1);
        assert!(recipes[0].favorite);
        assert_eq!(book.prefs().favorites, vec!["CMDR_A:FSD RecipeX".to_string()]);
        assert!(book.is_dirty());

        book.mark_saved();
        let second = book.migrate(&mut recipes);
        assert!(second.is_noop());
        assert!(!book.is_dirty());
        assert_eq!(book.prefs().favorites, vec!["CMDR_A:FSD RecipeX".to_string()]);
    }

    #[test]
    fn scoped_key_wins_and_legacy_duplicate_is_cleaned() {
        let prefs = PreferenceSet {
            ignored: vec!["FSD RecipeX".to_string(), "CMDR_A:FSD RecipeX".to_string()],
            ..PreferenceSet::default()
        };
        let mut book = PreferenceBook::new("CMDR_A", prefs);
        let mut recipes = vec![recipe("RecipeX")];

        let report = book.migrate(&mut recipes);
        assert_eq!(report.cleaned, 1);
        assert!(recipes[0].ignored);
        assert_eq!(book.prefs().ignored, vec!["CMDR_A:FSD RecipeX".to_string()]);
    }

    #[test]
    fn other_commanders_keys_are_left_alone() {
        let prefs = PreferenceSet {
            favorites: vec!["CMDR_B:FSD RecipeX".to_string()],
            ..PreferenceSet::default()
        };
        let mut book = PreferenceBook::new("CMDR_A", prefs.clone());
        let mut recipes = vec![recipe("RecipeX")];

        assert!(book.migrate(&mut recipes).is_noop());
        assert!(!recipes[0].favorite);
        assert_eq!(book.prefs(), &prefs);
    }

    #[test]
    fn shopping_count_is_key_multiplicity() {
        let prefs = PreferenceSet {
            shopping_list: vec![
                "CMDR_A:FSD RecipeX".to_string(),
                "CMDR_B:FSD RecipeX".to_string(),
                "CMDR_A:FSD RecipeX".to_string(),
            ],
            ..PreferenceSet::default()
        };
        let mut book = PreferenceBook::new("CMDR_A", prefs);
        let mut recipes = vec![recipe("RecipeX")];
        book.migrate(&mut recipes);
        assert_eq!(recipes[0].shopping_list_count, 2);

        assert!(book.set_shopping_list_count(&mut recipes[0], 3));
        assert_eq!(book.prefs().occurrences(PrefList::ShoppingList, "CMDR_A:FSD RecipeX"), 3);
        assert_eq!(book.prefs().occurrences(PrefList::ShoppingList, "CMDR_B:FSD RecipeX"), 1);
    }

    #[test]
    fn negative_shopping_count_is_rejected() {
        let mut book = PreferenceBook::new("CMDR_A", PreferenceSet::default());
        let mut r = recipe("RecipeX");

        assert!(!book.shopping_list_change(&mut r, -1));
        assert_eq!(r.shopping_list_count, 0);
        assert!(!book.is_dirty());

        assert!(book.shopping_list_change(&mut r, 2));
        assert!(book.shopping_list_change(&mut r, -2));
        assert_eq!(r.shopping_list_count, 0);
        assert!(book.prefs().shopping_list.is_empty());
    }

    #[test]
    fn shopping_count_is_bounded() {
        let mut book = PreferenceBook::new("CMDR_A", PreferenceSet::default());
        let mut r = recipe("RecipeX");

        assert!(book.shopping_list_change(&mut r, 1));
        assert!(!book.shopping_list_change(&mut r, i64::MAX));
        assert!(!book.shopping_list_change(&mut r, i64::MIN));
        assert_eq!(r.shopping_list_count, 1);

        assert!(!book.set_shopping_list_count(&mut r, u32::MAX));
        assert!(!book.set_shopping_list_count(&mut r, MAX_SHOPPING_LIST_COUNT + 1));
        assert!(!book.shopping_list_change(&mut r, i64::from(MAX_SHOPPING_LIST_COUNT)));
        assert_eq!(r.shopping_list_count, 1);
        assert_eq!(book.prefs().shopping_list.len(), 1);

        assert!(book.set_shopping_list_count(&mut r, MAX_SHOPPING_LIST_COUNT));
        assert_eq!(book.prefs().shopping_list.len(), MAX_SHOPPING_LIST_COUNT as usize);
    }

    #[test]
    fn toggling_favorite_writes_scoped_key() {
        let mut book = PreferenceBook::new("CMDR_A", PreferenceSet::default());
        let mut r = recipe("RecipeX");

        assert!(book.set_favorite(&mut r, true));
        assert!(!book.set_favorite(&mut r, true));
        assert_eq!(book.prefs().favorites, vec!["CMDR_A:FSD RecipeX".to_string()]);

        assert!(book.set_favorite(&mut r, false));
        assert!(book.prefs().favorites.is_empty());
    }
}
