//! Journal line decoding.
//!
//! A [`JournalDecoder`] turns one raw line into a [`JournalEntry`]. Lines
//! that are not JSON, lack a valid `timestamp`/`event` header, or carry a
//! payload that does not match their event are reported as [`DecodeError`];
//! replay drops them. Events without a registered handler decode fine but
//! are not relevant.

mod events;
/// Raw identifier → canonical entry name resolution.
pub mod resolver;

use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    op::{JournalEntry, MANUAL_CHANGE_EVENT, Operation},
    types::Timestamp,
};

use self::resolver::NameResolver;

/// Decode function registered for one event name.
pub type DecodeFn = fn(&Value, &dyn NameResolver) -> Result<Option<Operation>, serde_json::Error>;

/// Why a line could not be used.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Blank line.
    #[error("empty line")]
    Empty,
    /// Not a JSON document.
    #[error("malformed json: {0}")]
    Json(#[source] serde_json::Error),
    /// Missing or invalid `timestamp`/`event`.
    #[error("invalid header: {0}")]
    Header(#[source] serde_json::Error),
    /// Payload does not match the registered event shape.
    #[error("invalid `{event}` payload: {source}")]
    Payload {
        /// Event name of the line.
        event: String,
        /// Underlying deserialization failure.
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct Header {
    timestamp: Timestamp,
    event: String,
}

#[derive(Serialize)]
struct ManualChangeLine<'a> {
    timestamp: Timestamp,
    event: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Count")]
    count: i64,
}

/// Registry-driven journal decoder.
#[derive(Clone)]
pub struct JournalDecoder {
    resolver: Arc<dyn NameResolver>,
    handlers: HashMap<String, DecodeFn>,
}

impl JournalDecoder {
    /// Decoder with every built-in event handler registered.
    pub fn new(resolver: Arc<dyn NameResolver>) -> Self {
        let handlers = events::builtin_handlers()
            .into_iter()
            .map(|(event, f)| (event.to_string(), f))
            .collect();
        Self { resolver, handlers }
    }

    /// Registers or replaces the handler for `event`.
    pub fn register(&mut self, event: impl Into<String>, handler: DecodeFn) {
        self.handlers.insert(event.into(), handler);
    }

    /// True when `event` has a handler.
    pub fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Name resolver shared with this decoder.
    pub fn resolver(&self) -> &dyn NameResolver {
        self.resolver.as_ref()
    }

    /// Decodes one raw line.
    pub fn decode(&self, line: &str) -> Result<JournalEntry, DecodeError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(DecodeError::Empty);
        }

        let value: Value = serde_json::from_str(trimmed).map_err(DecodeError::Json)?;
        let header = Header::deserialize(&value).map_err(DecodeError::Header)?;

        let operation = match self.handlers.get(header.event.as_str()) {
            Some(handler) => {
                handler(&value, self.resolver.as_ref()).map_err(|source| {
                    DecodeError::Payload {
                        event: header.event.clone(),
                        source,
                    }
                })?
            }
            None => None,
        };

        Ok(JournalEntry {
            timestamp: header.timestamp,
            event: header.event,
            operation,
            original_json: trimmed.to_string(),
        })
    }

    /// Builds the journal entry for a user correction, including the line
    /// that decodes back to it.
    pub fn manual_change(
        &self,
        timestamp: Timestamp,
        name: &str,
        count: i64,
    ) -> Result<JournalEntry, serde_json::Error> {
        let original_json = serde_json::to_string(&ManualChangeLine {
            timestamp,
            event: MANUAL_CHANGE_EVENT,
            name,
            count,
        })?;

        Ok(JournalEntry {
            timestamp,
            event: MANUAL_CHANGE_EVENT.to_string(),
            operation: Some(Operation::ManualChange {
                name: name.to_string(),
                count,
            }),
            original_json,
        })
    }
}

impl std::fmt::Debug for JournalDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut events: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        events.sort_unstable();
        f.debug_struct("JournalDecoder")
            .field("handlers", &events)
            .finish_non_exhaustive()
    }
}
