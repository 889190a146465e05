//! Species-keyed maps
//!
//! A [`SpeciesMap`] maps a species name to a value (a density field, a
//! scalar parameter, a constraint) and participates in change tracking:
//! every mutating accessor stages the map's own version token, so owners
//! that depend on a map (a grand potential on its constraints, a state on
//! its properties) see cheap invalidation when an entry changes. Key order
//! is irrelevant; lookup by an unknown key is an error.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::tracking::{ObjectId, Token, Tracker};

/// Map from species name to a per-species value, with change tracking.
#[derive(Debug)]
pub struct SpeciesMap<T> {
    data: HashMap<String, T>,
    tracker: Tracker,
}

impl<T> SpeciesMap<T> {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            tracker: Tracker::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.tracker.id()
    }

    /// Commit any staged mutation and return the stable token.
    pub fn token(&mut self) -> Token {
        self.tracker.token()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains(&self, species: &str) -> bool {
        self.data.contains_key(species)
    }

    /// Look up a species; unknown keys are an error.
    pub fn get(&self, species: &str) -> Result<&T> {
        self.data
            .get(species)
            .ok_or_else(|| Error::UnknownSpecies(species.to_string()))
    }

    /// Look up a species mutably, staging the token; unknown keys are an
    /// error.
    pub fn get_mut(&mut self, species: &str) -> Result<&mut T> {
        self.tracker.stage();
        self.data
            .get_mut(species)
            .ok_or_else(|| Error::UnknownSpecies(species.to_string()))
    }

    /// Optional lookup for callers that treat absence as a default.
    pub fn try_get(&self, species: &str) -> Option<&T> {
        self.data.get(species)
    }

    /// Insert or replace an entry, staging the token.
    pub fn insert(&mut self, species: impl Into<String>, value: T) {
        self.tracker.stage();
        self.data.insert(species.into(), value);
    }

    /// Remove an entry, staging the token when one existed.
    pub fn remove(&mut self, species: &str) -> Option<T> {
        let removed = self.data.remove(species);
        if removed.is_some() {
            self.tracker.stage();
        }
        removed
    }

    /// Keep only the entries whose key passes the predicate, staging the
    /// token when anything was dropped.
    pub fn retain_keys<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.data.len();
        self.data.retain(|key, _| keep(key));
        if self.data.len() != before {
            self.tracker.stage();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.data.iter()
    }

    /// Iterate mutably, staging the token.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut T)> {
        self.tracker.stage();
        self.data.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }
}

impl SpeciesMap<crate::state::Field> {
    /// Tokens of every field in the map, committing staged changes.
    ///
    /// Does not stage the map's own token: reading entry versions is not a
    /// mutation of the membership.
    pub fn field_tokens(&mut self) -> Vec<Token> {
        self.data.values_mut().map(|field| field.token()).collect()
    }

    /// Iterate fields mutably for halo maintenance, without staging the
    /// map token.
    pub(crate) fn sync_iter_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut crate::state::Field> {
        self.data.values_mut()
    }
}

impl<T> Default for SpeciesMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for SpeciesMap<T> {
    /// A cloned map copies the entries but is a new object with fresh
    /// identity.
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            tracker: Tracker::new(),
        }
    }
}
