//! Inventory and crafting-progress reconstruction from an append-only game
//! journal.
//!
//! # Examples
//!
//! Synchronous replay with [`session::CommanderSession`]:
//! ```
//! use craftlog::{
//!     entry::EntryData,
//!     prefs::PreferenceSet,
//!     recipe::{Ingredient, Recipe, RecipeId},
//!     session::{CommanderSession, SessionConfig},
//!     types::EntryKind,
//! };
//!
//! let catalog = vec![
//!     EntryData::new("Iron", EntryKind::Material),
//!     EntryData::new("Gold", EntryKind::Material),
//! ];
//! let recipes = vec![Recipe::new(
//!     RecipeId::graded("FSD", "Increased Range", 1),
//!     vec![Ingredient::new("Iron", 1)],
//! )];
//! let mut session = CommanderSession::new(
//!     SessionConfig::for_commander("CMDR_A"),
//!     catalog,
//!     recipes,
//!     PreferenceSet::default(),
//! );
//!
//! session.load_state([
//!     r#"{"timestamp":"2017-02-10T14:25:51Z","event":"MaterialCollected","Name":"iron","Count":3}"#,
//! ]);
//! assert_eq!(session.count("Iron"), Some(3));
//! assert_eq!(session.unused_entries(), vec!["Gold".to_string()]);
//! ```
//!
//! Runtime usage with a SQLite preference store:
//! ```no_run
//! use craftlog::{
//!     prefs::{sqlite::SqlitePreferenceStore, PreferenceStore},
//!     runtime::handle::{spawn_session, RuntimeConfig},
//!     session::{CommanderSession, SessionConfig},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut store = SqlitePreferenceStore::open("prefs.db").expect("open sqlite");
//! let prefs = store.load().expect("load prefs");
//! let session = CommanderSession::new(
//!     SessionConfig::for_commander("CMDR_A"),
//!     vec![],
//!     vec![],
//!     prefs,
//! );
//! let handle = spawn_session(session, Some(Box::new(store)), RuntimeConfig::default());
//! let _report = handle.load_state(vec![]).await.expect("load");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![warn(missing_docs)]

/// Inventory state, operation log, and recipe index.
pub mod core;
/// Journal line decoding and name resolution.
pub mod decode;
/// Operation application, replay ordering, and derived aggregates.
pub mod engine;
/// Inventory entry records.
pub mod entry;
/// Operation model and journal entry envelope.
pub mod op;
/// Preference store boundary and key migration.
pub mod prefs;
/// Recipe catalog types.
pub mod recipe;
/// Single-writer async runtime and event stream APIs.
pub mod runtime;
/// Commander session orchestrating the core.
pub mod session;
/// Shared primitive types and enums.
pub mod types;
