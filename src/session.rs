//! One commander's inventory, journal replay, recipes, and preferences.

use std::sync::Arc;

use chrono::Utc;
use hashbrown::HashMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    core::{
        indices::RecipeIndex,
        log::OperationLog,
        store::{InventoryState, StateError},
    },
    decode::{
        JournalDecoder,
        resolver::{ItemNameResolver, NameResolver},
    },
    engine::{
        apply::apply_operation,
        replay::{BoundaryPolicy, ReplayReport, ReplayTarget, Watermark, replay},
        shopping::{ShoppingItem, shopping_list},
    },
    entry::{Entry, EntryData},
    op::JournalEntry,
    prefs::{
        PrefError, PreferenceSet, PreferenceStore,
        book::{MigrationReport, PreferenceBook},
    },
    recipe::{Recipe, RecipeId},
    runtime::events::{RecipeChange, SessionEvent},
    types::{EntryName, Timestamp},
};

/// Per-session settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Active commander; scopes preference keys.
    pub commander: String,
    /// Treatment of journal entries stamped exactly at the watermark.
    pub boundary: BoundaryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            commander: "default".to_string(),
            boundary: BoundaryPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Config for `commander` with default replay settings.
    pub fn for_commander(commander: impl Into<String>) -> Self {
        Self {
            commander: commander.into(),
            ..Self::default()
        }
    }
}

/// Session-level failures of direct consumer calls.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The recipe is not part of the loaded catalog.
    #[error("unknown recipe: {0}")]
    UnknownRecipe(RecipeId),
    /// Inventory rejected the mutation.
    #[error(transparent)]
    State(#[from] StateError),
    /// A manual change could not be encoded as a journal line.
    #[error("failed to encode journal line: {0}")]
    Encode(#[from] serde_json::Error),
    /// Preference store failure.
    #[error(transparent)]
    Preferences(#[from] PrefError),
}

/// Single-writer aggregate for one commander.
///
/// Callers serialize access; nothing here spawns or locks. Every mutation
/// queues [`SessionEvent`]s, collected with [`CommanderSession::drain_events`].
pub struct CommanderSession {
    config: SessionConfig,
    decoder: JournalDecoder,
    state: InventoryState,
    log: OperationLog,
    watermark: Watermark,
    recipes: Vec<Recipe>,
    recipe_pos: HashMap<RecipeId, usize>,
    index: RecipeIndex,
    prefs: PreferenceBook,
    pending_events: Vec<SessionEvent>,
}

impl CommanderSession {
    /// Session resolving journal names against `catalog` itself.
    pub fn new(
        config: SessionConfig,
        catalog: Vec<EntryData>,
        recipes: Vec<Recipe>,
        prefs: PreferenceSet,
    ) -> Self {
        let resolver = Arc::new(ItemNameResolver::new(&catalog));
        Self::with_resolver(config, catalog, recipes, resolver, prefs)
    }

    /// Session with an externally supplied name resolver.
    pub fn with_resolver(
        config: SessionConfig,
        catalog: Vec<EntryData>,
        recipes: Vec<Recipe>,
        resolver: Arc<dyn NameResolver>,
        prefs: PreferenceSet,
    ) -> Self {
        let mut state = InventoryState::new(catalog);

        let mut recipes: Vec<Recipe> = recipes
            .into_iter()
            .filter(|r| !r.ingredients.is_empty())
            .collect();
        for recipe in &recipes {
            for ingredient in recipe.ingredients.iter().filter(|i| !state.contains(&i.entry)) {
                warn!(recipe = %recipe.id, entry = %ingredient.entry, "recipe_ingredient_not_in_catalog");
            }
        }

        let index = RecipeIndex::build(&mut state, &recipes);
        let mut prefs = PreferenceBook::new(config.commander.clone(), prefs);
        let migration = prefs.migrate(&mut recipes);

        let recipe_pos = recipes
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.id.clone(), idx))
            .collect();

        info!(
            commander = %config.commander,
            entries = state.entries().count(),
            recipes = recipes.len(),
            migrated = migration.migrated,
            "commander_session_created"
        );

        Self {
            decoder: JournalDecoder::new(resolver),
            config,
            state,
            log: OperationLog::new(),
            watermark: Watermark::new(),
            recipes,
            recipe_pos,
            index,
            prefs,
            pending_events: Vec::new(),
        }
    }

    /// Settings this session was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Active commander.
    pub fn commander(&self) -> &str {
        &self.config.commander
    }

    /// Decoder used for replay; register extra event handlers here.
    pub fn decoder_mut(&mut self) -> &mut JournalDecoder {
        &mut self.decoder
    }

    /// Full reload: zero every entry, rewind the watermark, start a fresh
    /// operation log, and replay `lines` from scratch.
    ///
    /// Entry notifications are collapsed to one per entry whose count differs
    /// from before the reload, followed by [`SessionEvent::Reloaded`].
    pub fn load_state<I, S>(&mut self, lines: I) -> ReplayReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let previous = self.watermark.at();
        self.state.begin_load();
        self.state.reset();
        self.watermark.reset();
        self.log = OperationLog::new();

        let report = self.replay_lines(lines);
        self.state.complete_load();

        self.collect_entry_changes();
        if self.watermark.at() != previous {
            self.pending_events.push(SessionEvent::WatermarkAdvanced {
                watermark: self.watermark.at(),
            });
        }
        self.pending_events.push(SessionEvent::Reloaded {
            applied: report.applied,
        });
        info!(
            commander = %self.config.commander,
            applied = report.applied,
            unusable = report.unusable,
            unknown_entries = report.unknown_entries.len(),
            overflowed = report.overflowed.len(),
            "commander_state_loaded"
        );
        report
    }

    /// Incremental replay of new (or re-submitted) lines.
    pub fn apply_events<I, S>(&mut self, lines: I) -> ReplayReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let report = self.replay_lines(lines);
        self.collect_entry_changes();
        if report.watermark_advanced() {
            self.pending_events.push(SessionEvent::WatermarkAdvanced {
                watermark: report.watermark_after,
            });
        }
        report
    }

    fn replay_lines<I, S>(&mut self, lines: I) -> ReplayReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        replay(
            lines,
            &self.decoder,
            ReplayTarget {
                state: &mut self.state,
                log: &mut self.log,
                watermark: &mut self.watermark,
            },
            self.config.boundary,
        )
    }

    /// Records a user correction stamped now. The returned entry carries the
    /// journal line the host should append to its log.
    pub fn user_change(&mut self, name: &str, delta: i64) -> Result<JournalEntry, SessionError> {
        self.user_change_at(Utc::now(), name, delta)
    }

    /// [`Self::user_change`] with an explicit timestamp.
    pub fn user_change_at(
        &mut self,
        timestamp: Timestamp,
        name: &str,
        delta: i64,
    ) -> Result<JournalEntry, SessionError> {
        let current = self
            .state
            .count(name)
            .ok_or_else(|| StateError::UnknownEntry(name.to_string()))?;
        if current.checked_add(delta).is_none() {
            return Err(StateError::Overflow(name.to_string()).into());
        }
        let entry = self.decoder.manual_change(timestamp, name, delta)?;

        let before = self.watermark.at();
        if let Some(op) = entry.operation.as_ref() {
            apply_operation(op, &mut self.state);
        }
        self.watermark.advance(&entry);
        self.log.append(entry.clone());

        self.collect_entry_changes();
        if self.watermark.at() > before {
            self.pending_events.push(SessionEvent::WatermarkAdvanced {
                watermark: self.watermark.at(),
            });
        }
        Ok(entry)
    }

    /// Sets the favorite flag; `Ok(false)` when already in that state.
    pub fn set_favorite(&mut self, id: &RecipeId, favorite: bool) -> Result<bool, SessionError> {
        let idx = self.recipe_idx(id)?;
        let changed = self.prefs.set_favorite(&mut self.recipes[idx], favorite);
        if changed {
            self.push_recipe_change(id, RecipeChange::Favorite(favorite));
        }
        Ok(changed)
    }

    /// Sets the ignored flag; `Ok(false)` when already in that state.
    pub fn set_ignored(&mut self, id: &RecipeId, ignored: bool) -> Result<bool, SessionError> {
        let idx = self.recipe_idx(id)?;
        let changed = self.prefs.set_ignored(&mut self.recipes[idx], ignored);
        if changed {
            self.push_recipe_change(id, RecipeChange::Ignored(ignored));
        }
        Ok(changed)
    }

    /// Adds `delta` planned crafts; returns `Ok(false)` when rejected because
    /// the count would leave `0..=MAX_SHOPPING_LIST_COUNT`.
    ///
    /// [`MAX_SHOPPING_LIST_COUNT`]: crate::prefs::book::MAX_SHOPPING_LIST_COUNT
    pub fn shopping_list_change(&mut self, id: &RecipeId, delta: i64) -> Result<bool, SessionError> {
        let idx = self.recipe_idx(id)?;
        let changed = self
            .prefs
            .shopping_list_change(&mut self.recipes[idx], delta);
        if changed {
            let count = self.recipes[idx].shopping_list_count;
            self.push_recipe_change(id, RecipeChange::ShoppingListCount(count));
        }
        Ok(changed)
    }

    /// Sets the planned craft count; counts above
    /// [`crate::prefs::book::MAX_SHOPPING_LIST_COUNT`] are rejected with `Ok(false)`.
    pub fn set_shopping_list_count(&mut self, id: &RecipeId, count: u32) -> Result<bool, SessionError> {
        let idx = self.recipe_idx(id)?;
        let changed = self
            .prefs
            .set_shopping_list_count(&mut self.recipes[idx], count);
        if changed {
            self.push_recipe_change(id, RecipeChange::ShoppingListCount(count));
        }
        Ok(changed)
    }

    /// Re-runs preference migration over the loaded recipes.
    pub fn migrate_preferences(&mut self) -> MigrationReport {
        self.prefs.migrate(&mut self.recipes)
    }

    /// Count of `name`; `None` outside the catalog.
    pub fn count(&self, name: &str) -> Option<i64> {
        self.state.count(name)
    }

    /// Created entry for `name`.
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.state.get(name)
    }

    /// Inventory state.
    pub fn state(&self) -> &InventoryState {
        &self.state
    }

    /// Latest applied journal time.
    pub fn watermark(&self) -> Timestamp {
        self.watermark.at()
    }

    /// Entries applied since the last full reload.
    pub fn operations(&self) -> &OperationLog {
        &self.log
    }

    /// Loaded recipes.
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Recipe by identity.
    pub fn recipe(&self, id: &RecipeId) -> Option<&Recipe> {
        self.recipe_pos.get(id).map(|idx| &self.recipes[*idx])
    }

    /// Entry to recipe cross-reference.
    pub fn recipe_index(&self) -> &RecipeIndex {
        &self.index
    }

    /// Recipes flagged favorite.
    pub fn favorites(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter().filter(|r| r.favorite)
    }

    /// Recipes with `entry` among their ingredients.
    pub fn recipes_using(&self, entry: &str) -> Vec<&Recipe> {
        self.index
            .recipes_using(entry)
            .iter()
            .map(|idx| &self.recipes[*idx])
            .collect()
    }

    /// Catalog entries no recipe uses, in catalog order.
    pub fn unused_entries(&self) -> Vec<EntryName> {
        self.state
            .catalog()
            .filter(|d| d.unused)
            .map(|d| d.name.clone())
            .collect()
    }

    /// Requirements of every recipe on the shopping list.
    pub fn shopping_list(&self) -> Vec<ShoppingItem> {
        shopping_list(&self.recipes, &self.state)
    }

    /// Current preference collections.
    pub fn preferences(&self) -> &PreferenceSet {
        self.prefs.prefs()
    }

    /// True when preferences changed since the last save.
    pub fn preferences_dirty(&self) -> bool {
        self.prefs.is_dirty()
    }

    /// Saves preferences through `store` when dirty. On failure the
    /// in-memory state is kept and stays dirty.
    pub fn flush_preferences(&mut self, store: &mut dyn PreferenceStore) -> Result<bool, SessionError> {
        if !self.prefs.is_dirty() {
            return Ok(false);
        }
        match store.save(self.prefs.prefs()) {
            Ok(()) => {
                self.prefs.mark_saved();
                self.pending_events.push(SessionEvent::PreferencesSaved);
                Ok(true)
            }
            Err(err) => {
                warn!(error = %err, commander = %self.config.commander, "preference_save_failed");
                self.pending_events.push(SessionEvent::PreferencesSaveFailed {
                    error: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    /// Hands the dirty preference collections to an asynchronous saver and
    /// clears the dirty mark. Pair with [`Self::mark_preferences_unsaved`] if
    /// that save fails.
    pub fn take_pending_preferences(&mut self) -> Option<PreferenceSet> {
        if !self.prefs.is_dirty() {
            return None;
        }
        let snapshot = self.prefs.prefs().clone();
        self.prefs.mark_saved();
        Some(snapshot)
    }

    /// Restores the dirty mark after an asynchronous save failed.
    pub fn mark_preferences_unsaved(&mut self) {
        self.prefs.mark_dirty();
    }

    /// Takes the queued events, oldest first.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.collect_entry_changes();
        std::mem::take(&mut self.pending_events)
    }

    fn collect_entry_changes(&mut self) {
        for change in self.state.drain_changes() {
            self.pending_events.push(SessionEvent::EntryChanged {
                name: change.name,
                previous: change.previous,
                count: change.count,
            });
        }
    }

    fn push_recipe_change(&mut self, id: &RecipeId, change: RecipeChange) {
        self.pending_events.push(SessionEvent::RecipeChanged {
            recipe: id.clone(),
            change,
        });
    }

    fn recipe_idx(&self, id: &RecipeId) -> Result<usize, SessionError> {
        self.recipe_pos
            .get(id)
            .copied()
            .ok_or_else(|| SessionError::UnknownRecipe(id.clone()))
    }
}
