//! Object identity and change tracking
//!
//! Expensive functionals avoid redundant recomputation by comparing cheap
//! version tokens instead of deep-comparing per-cell arrays. This module
//! provides the three pieces of that protocol:
//!
//! - [`Token`]: an (identity, revision) pair with a transient dirty flag.
//!   Two clean tokens compare equal exactly when the object's observable
//!   state has not changed between the two commits.
//! - [`Tracker`]: the identity + token unit embedded in every mutable
//!   simulation object. Mutating accessors call [`Tracker::stage`]; reading
//!   the token commits any staged change first.
//! - [`DependencySet`]: captured token snapshots for the objects an owner
//!   depends on, so staleness propagates transitively through arbitrary
//!   composition graphs with two-integer comparisons.
//!
//! # Identity allocation
//!
//! Identifiers are process-lifetime-unique integers drawn from an atomic
//! counter, never reused. Cloning a [`Tracker`] allocates a fresh identity:
//! a copy of an object is a new object, not an alias of the old one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

// =================================================================================================
// Identifier allocation
// =================================================================================================

/// Process-lifetime-unique object identifier.
pub type ObjectId = u64;

static OBJECT_COUNT: AtomicU64 = AtomicU64::new(0);

/// Allocate the next object identifier.
///
/// Relaxed ordering is sufficient: the counter only needs uniqueness, not
/// ordering with respect to other memory operations.
fn next_object_id() -> ObjectId {
    OBJECT_COUNT.fetch_add(1, Ordering::Relaxed)
}

// =================================================================================================
// Token
// =================================================================================================

/// Version token: cheap comparable proxy for "has this object changed".
///
/// A token is a pair of an object identifier and a monotonically increasing
/// revision counter, plus a transient dirty flag. `stage` marks a pending
/// mutation; `commit` finalizes it by bumping the revision. The revision
/// strictly increases across any committed mutation.
///
/// # Panics
///
/// Comparing a dirty token means "changed but not yet finalized" and is a
/// programmer error, so it panics. Obtain tokens through [`Tracker::token`],
/// which commits first, and this cannot happen.
#[derive(Debug, Clone, Copy)]
pub struct Token {
    id: ObjectId,
    code: u64,
    dirty: bool,
}

impl Token {
    fn new(id: ObjectId) -> Self {
        Self {
            id,
            code: 0,
            dirty: false,
        }
    }

    /// Identity of the tracked object this token belongs to.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Whether a mutation has been staged but not yet committed.
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    fn stage(&mut self) {
        self.dirty = true;
    }

    fn commit(&mut self) {
        if self.dirty {
            self.code += 1;
            self.dirty = false;
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        assert!(
            !self.dirty && !other.dirty,
            "cannot compare tokens with uncommitted changes"
        );
        self.id == other.id && self.code == other.code
    }
}

// =================================================================================================
// Tracker
// =================================================================================================

/// Identity + version token embedded in every mutable simulation object.
#[derive(Debug)]
pub struct Tracker {
    token: Token,
}

impl Tracker {
    pub fn new() -> Self {
        Self {
            token: Token::new(next_object_id()),
        }
    }

    /// Identity of the tracked object.
    pub fn id(&self) -> ObjectId {
        self.token.id
    }

    /// Mark a pending mutation.
    pub fn stage(&mut self) {
        self.token.stage();
    }

    /// Mark and immediately finalize a mutation.
    pub fn stage_and_commit(&mut self) {
        self.token.stage();
        self.token.commit();
    }

    /// Commit any staged change and return the now-stable token.
    pub fn token(&mut self) -> Token {
        self.token.commit();
        self.token
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Tracker {
    /// A cloned tracker is a new object with fresh identity.
    fn clone(&self) -> Self {
        Self::new()
    }
}

// =================================================================================================
// DependencySet
// =================================================================================================

/// Captured token snapshots for the objects an owner depends on.
///
/// The owner gathers the current tokens of its dependencies and asks
/// [`changed`](DependencySet::changed) whether any of them differs from the
/// last captured snapshot. Membership differences count as changes: a
/// dependency added without a snapshot, or one removed since the capture,
/// both invalidate. Dependencies are held by identifier only, never by an
/// owning pointer, so composition graphs stay acyclic.
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    captured: HashMap<ObjectId, Option<Token>>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dependency without a snapshot. Until the next `capture`,
    /// `changed` reports true for it.
    pub fn add(&mut self, id: ObjectId) {
        self.captured.entry(id).or_insert(None);
    }

    /// Drop a dependency and its snapshot.
    pub fn remove(&mut self, id: ObjectId) {
        self.captured.remove(&id);
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.captured.contains_key(&id)
    }

    /// Whether the current dependency tokens differ from the captured
    /// snapshot in value or membership.
    pub fn changed(&self, current: &[Token]) -> bool {
        if current.len() != self.captured.len() {
            return true;
        }
        current.iter().any(|token| match self.captured.get(&token.id()) {
            Some(Some(prev)) => prev != token,
            // tracked but never snapshotted
            Some(None) => true,
            // not tracked at all
            None => true,
        })
    }

    /// Snapshot the current dependency tokens, replacing the membership.
    pub fn capture(&mut self, current: &[Token]) {
        self.captured = current
            .iter()
            .map(|token| (token.id(), Some(*token)))
            .collect();
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_are_unique() {
        let a = Tracker::new();
        let b = Tracker::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_clone_allocates_fresh_identity() {
        let a = Tracker::new();
        let b = a.clone();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_token_stable_without_mutation() {
        let mut t = Tracker::new();
        let first = t.token();
        let second = t.token();
        assert_eq!(first, second);
    }

    #[test]
    fn test_commit_advances_revision_once_per_stage() {
        let mut t = Tracker::new();
        let before = t.token();

        t.stage();
        let after = t.token();
        assert_ne!(before, after);

        // committing again without staging changes nothing
        assert_eq!(after, t.token());

        // two stages between commits collapse into one revision
        t.stage();
        t.stage();
        let third = t.token();
        assert_ne!(after, third);
    }

    #[test]
    #[should_panic(expected = "uncommitted changes")]
    fn test_comparing_dirty_token_panics() {
        let mut t = Tracker::new();
        let clean = t.token();
        t.stage();
        // peek at the dirty token without committing
        let dirty = Token {
            id: clean.id(),
            code: 0,
            dirty: true,
        };
        let _ = dirty == clean;
    }

    #[test]
    fn test_dependency_set_detects_value_change() {
        let mut dep = Tracker::new();
        let mut set = DependencySet::new();
        set.capture(&[dep.token()]);
        assert!(!set.changed(&[dep.token()]));

        dep.stage();
        assert!(set.changed(&[dep.token()]));

        set.capture(&[dep.token()]);
        assert!(!set.changed(&[dep.token()]));
    }

    #[test]
    fn test_dependency_set_detects_membership_change() {
        let mut a = Tracker::new();
        let mut b = Tracker::new();
        let mut set = DependencySet::new();
        set.capture(&[a.token()]);

        // added dependency without snapshot
        assert!(set.changed(&[a.token(), b.token()]));

        // removed dependency
        set.capture(&[a.token(), b.token()]);
        assert!(set.changed(&[a.token()]));
    }

    #[test]
    fn test_added_without_snapshot_reports_changed() {
        let mut dep = Tracker::new();
        let mut set = DependencySet::new();
        set.add(dep.id());
        assert!(set.changed(&[dep.token()]));
    }
}
