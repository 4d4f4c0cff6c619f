//! Mapping domain entity and the ordered mapping store.
//!
//! A [`Mapping`] is a user-authored routing rule: "when the *right* hand shows
//! *Open_Palm*, stream its height as a *fader*".  Every mapping owns an OSC
//! address derived from its `(hand, gesture, mode)` triple:
//!
//! ```text
//! /{hand}/{gesture_index}/{mode}      e.g.  /right/0/fader
//! ```
//!
//! The address is never set directly.  It is recomputed whenever one of the
//! three fields changes and again when mappings are loaded from disk, so a
//! hand-edited configuration file cannot desynchronize it.
//!
//! # Ordering
//!
//! [`MappingStore`] keeps mappings in user order.  Order matters: the
//! streaming engine evaluates mappings top to bottom, and two mappings with
//! the same triple share one address (see [`MappingStore::collisions`]).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::domain::gesture::{Gesture, Hand, Mode};

/// Unique identifier for a mapping, derived from UUID v4.
pub type MappingId = Uuid;

/// Errors reported by mapping validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    /// Two or more mappings resolve to the same address.
    #[error("address {address} is shared by {} mappings", ids.len())]
    AddressCollision {
        address: String,
        ids: Vec<MappingId>,
    },
}

/// Builds the OSC address for a `(hand, gesture, mode)` triple.
pub fn derive_address(hand: Hand, gesture: Gesture, mode: Mode) -> String {
    format!("/{}/{}/{}", hand.as_str(), gesture.index(), mode.as_str())
}

/// A routing rule from one hand gesture to one output address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredMapping")]
pub struct Mapping {
    id: MappingId,
    enabled: bool,
    hand: Hand,
    gesture: Gesture,
    mode: Mode,
    address: String,
}

/// On-disk shape of a mapping.  Any stored `address` is ignored.
#[derive(Deserialize)]
struct StoredMapping {
    id: MappingId,
    #[serde(default = "default_enabled")]
    enabled: bool,
    hand: Hand,
    gesture: Gesture,
    mode: Mode,
}

fn default_enabled() -> bool {
    true
}

impl From<StoredMapping> for Mapping {
    fn from(s: StoredMapping) -> Self {
        Mapping::with_id(s.id, s.enabled, s.hand, s.gesture, s.mode)
    }
}

impl Mapping {
    /// Creates an enabled mapping with a fresh id.
    pub fn new(hand: Hand, gesture: Gesture, mode: Mode) -> Self {
        Self::with_id(Uuid::new_v4(), true, hand, gesture, mode)
    }

    /// Creates a mapping with a known id (used when loading).
    pub fn with_id(id: MappingId, enabled: bool, hand: Hand, gesture: Gesture, mode: Mode) -> Self {
        Self {
            id,
            enabled,
            hand,
            gesture,
            mode,
            address: derive_address(hand, gesture, mode),
        }
    }

    pub fn id(&self) -> MappingId {
        self.id
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The derived OSC address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Applies a partial update and recomputes the address.
    ///
    /// Returns `true` when any field actually changed.
    fn apply(&mut self, update: &MappingUpdate) -> bool {
        let before = (self.enabled, self.hand, self.gesture, self.mode);
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(hand) = update.hand {
            self.hand = hand;
        }
        if let Some(gesture) = update.gesture {
            self.gesture = gesture;
        }
        if let Some(mode) = update.mode {
            self.mode = mode;
        }
        self.address = derive_address(self.hand, self.gesture, self.mode);
        before != (self.enabled, self.hand, self.gesture, self.mode)
    }
}

/// Creation request for [`MappingStore::add`].
///
/// Unset fields fall back to: enabled, left hand, `Open_Palm`, fader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingDraft {
    pub enabled: Option<bool>,
    pub hand: Option<Hand>,
    pub gesture: Option<Gesture>,
    pub mode: Option<Mode>,
}

impl MappingDraft {
    pub fn new(hand: Hand, gesture: Gesture, mode: Mode) -> Self {
        Self {
            enabled: None,
            hand: Some(hand),
            gesture: Some(gesture),
            mode: Some(mode),
        }
    }
}

/// Partial update for [`MappingStore::update`].  `None` leaves a field as is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingUpdate {
    pub enabled: Option<bool>,
    pub hand: Option<Hand>,
    pub gesture: Option<Gesture>,
    pub mode: Option<Mode>,
}

/// A set of mappings sharing one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCollision {
    pub address: String,
    /// Ids in list order.
    pub ids: Vec<MappingId>,
}

/// Ordered collection of mappings.
///
/// Every successful mutation bumps [`revision`](Self::revision) so readers
/// holding a previous revision can tell that the list changed without
/// comparing contents.
#[derive(Debug, Clone, Default)]
pub struct MappingStore {
    mappings: Vec<Mapping>,
    revision: u64,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from previously persisted mappings, preserving order.
    pub fn from_mappings(mappings: Vec<Mapping>) -> Self {
        let store = Self {
            mappings,
            revision: 0,
        };
        for collision in store.collisions() {
            warn!(
                "loaded mappings share address {} ({} mappings)",
                collision.address,
                collision.ids.len()
            );
        }
        store
    }

    /// Mappings in user order.
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn get(&self, id: MappingId) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Monotonic counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Appends a new mapping and returns its id.
    pub fn add(&mut self, draft: MappingDraft) -> MappingId {
        let mapping = Mapping::with_id(
            Uuid::new_v4(),
            draft.enabled.unwrap_or(true),
            draft.hand.unwrap_or(Hand::Left),
            draft.gesture.unwrap_or(Gesture::OpenPalm),
            draft.mode.unwrap_or(Mode::Fader),
        );
        let id = mapping.id;
        self.mappings.push(mapping);
        self.bump();
        self.warn_if_shared(id);
        id
    }

    /// Applies a partial update.  Unknown ids are ignored.
    ///
    /// Returns `true` when the mapping existed and a field changed.
    pub fn update(&mut self, id: MappingId, update: MappingUpdate) -> bool {
        let Some(mapping) = self.mappings.iter_mut().find(|m| m.id == id) else {
            warn!("update ignored: no mapping with id {id}");
            return false;
        };
        if !mapping.apply(&update) {
            return false;
        }
        self.bump();
        self.warn_if_shared(id);
        true
    }

    /// Removes a mapping.  Unknown ids are ignored.
    pub fn delete(&mut self, id: MappingId) -> bool {
        let before = self.mappings.len();
        self.mappings.retain(|m| m.id != id);
        if self.mappings.len() == before {
            warn!("delete ignored: no mapping with id {id}");
            return false;
        }
        self.bump();
        true
    }

    /// Reorders mappings to follow `order`.
    ///
    /// Ids in `order` that do not exist are skipped, duplicates count once,
    /// and mappings not mentioned keep their relative order after the listed
    /// ones.
    pub fn reorder(&mut self, order: &[MappingId]) -> bool {
        let mut seen = HashSet::new();
        let mut reordered = Vec::with_capacity(self.mappings.len());
        for id in order {
            if !seen.insert(*id) {
                continue;
            }
            if let Some(m) = self.get(*id) {
                reordered.push(m.clone());
            }
        }
        reordered.extend(
            self.mappings
                .iter()
                .filter(|m| !seen.contains(&m.id))
                .cloned(),
        );

        if reordered == self.mappings {
            return false;
        }
        self.mappings = reordered;
        self.bump();
        true
    }

    /// Enables `id` and disables every other mapping.  Unknown ids are ignored.
    pub fn isolate(&mut self, id: MappingId) -> bool {
        if self.get(id).is_none() {
            warn!("isolate ignored: no mapping with id {id}");
            return false;
        }
        let mut changed = false;
        for m in &mut self.mappings {
            let enabled = m.id == id;
            changed |= m.enabled != enabled;
            m.enabled = enabled;
        }
        if changed {
            self.bump();
        }
        changed
    }

    /// Enables every mapping.
    pub fn enable_all(&mut self) -> bool {
        let mut changed = false;
        for m in &mut self.mappings {
            changed |= !m.enabled;
            m.enabled = true;
        }
        if changed {
            self.bump();
        }
        changed
    }

    /// Every address shared by two or more mappings, in list order.
    pub fn collisions(&self) -> Vec<AddressCollision> {
        let mut groups: Vec<AddressCollision> = Vec::new();
        for m in &self.mappings {
            match groups.iter_mut().find(|g| g.address == m.address) {
                Some(group) => group.ids.push(m.id),
                None => groups.push(AddressCollision {
                    address: m.address.clone(),
                    ids: vec![m.id],
                }),
            }
        }
        groups.retain(|g| g.ids.len() > 1);
        groups
    }

    /// Fails with the first address collision, if any.
    pub fn validate(&self) -> Result<(), MappingError> {
        match self.collisions().into_iter().next() {
            Some(c) => Err(MappingError::AddressCollision {
                address: c.address,
                ids: c.ids,
            }),
            None => Ok(()),
        }
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    fn warn_if_shared(&self, id: MappingId) {
        let Some(mapping) = self.get(id) else {
            return;
        };
        let shared = self
            .mappings
            .iter()
            .filter(|m| m.address == mapping.address)
            .count();
        if shared > 1 {
            warn!(
                "mapping {id} shares address {} with {} other mapping(s)",
                mapping.address,
                shared - 1
            );
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
