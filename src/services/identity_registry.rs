// src/services/identity_registry.rs
//! Identity Registry
//!
//! Issues unique identifiers tagged with a role and an owner name, and
//! answers lookups. Records are immutable and never removed.

use crate::error::{DidError, Result};
use crate::models::did::{IdentityRecord, Role};
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Source of fresh identifier strings.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random 128-bit identifiers rendered as UUID v4 text.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[derive(Default)]
struct RegistryState {
    /// Records in registration order
    records: Vec<IdentityRecord>,
    /// Position of each id in `records`
    index: HashMap<String, usize>,
}

/// Thread-safe lookup table of registered identities.
pub struct IdentityRegistry {
    generator: Box<dyn IdGenerator>,
    state: Mutex<RegistryState>,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRegistry {
    /// Creates an empty registry issuing UUID v4 identifiers.
    pub fn new() -> Self {
        Self::with_generator(Box::new(UuidGenerator))
    }

    pub fn with_generator(generator: Box<dyn IdGenerator>) -> Self {
        Self {
            generator,
            state: Mutex::new(RegistryState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new participant.
    ///
    /// A generated id that is already taken is rerolled once; a second
    /// collision fails with `DuplicateIdentifier`.
    pub fn register(&self, name: &str, role: Role) -> Result<IdentityRecord> {
        let mut state = self.state();

        let mut id = self.generator.generate();
        if state.index.contains_key(&id) {
            warn!("Identifier collision on {}, rerolling", id);
            id = self.generator.generate();
            if state.index.contains_key(&id) {
                error!("Identifier collision on {} after reroll", id);
                return Err(DidError::DuplicateIdentifier(id));
            }
        }

        let record = IdentityRecord {
            id: id.clone(),
            owner_name: name.to_string(),
            role,
        };
        let position = state.records.len();
        state.records.push(record.clone());
        state.index.insert(id, position);

        info!("Registered {} identity {} for {}", role, record.id, name);
        Ok(record)
    }

    pub fn lookup(&self, id: &str) -> Option<IdentityRecord> {
        let state = self.state();
        state.index.get(id).map(|&i| state.records[i].clone())
    }

    pub fn name_of(&self, id: &str) -> Option<String> {
        self.lookup(id).map(|record| record.owner_name)
    }

    /// All identities in registration order.
    pub fn all(&self) -> Vec<IdentityRecord> {
        self.state().records.clone()
    }
}
