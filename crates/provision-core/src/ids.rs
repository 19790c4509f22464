//! POSIX identifier allocation.
//!
//! New accounts receive a number that is used both as `uidNumber` and as the `gidNumber` of the
//! account's personal group, so a candidate is only free when it appears in neither set. The
//! pool is loaded from the directory once per run and every number handed out is reserved in
//! both sets immediately, so entries created later in the same run never collide even though
//! the directory has not seen them yet.

use std::collections::BTreeSet;

use crate::{Error, Result};

/// Default lowest identifier handed out to provisioned accounts.
pub const DEFAULT_MIN_ID: u32 = 2000;

/// Identifiers already in use, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdPool {
    uids: BTreeSet<u32>,
    gids: BTreeSet<u32>,
}

impl IdPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool from the uid and gid numbers found in the directory.
    #[must_use]
    pub fn from_used<U, G>(uids: U, gids: G) -> Self
    where
        U: IntoIterator<Item = u32>,
        G: IntoIterator<Item = u32>,
    {
        Self {
            uids: uids.into_iter().collect(),
            gids: gids.into_iter().collect(),
        }
    }

    /// Marks a uid as used.
    pub fn reserve_uid(&mut self, uid: u32) {
        self.uids.insert(uid);
    }

    /// Marks a gid as used.
    pub fn reserve_gid(&mut self, gid: u32) {
        self.gids.insert(gid);
    }

    /// Returns true if the number is taken as either a uid or a gid.
    #[must_use]
    pub fn is_used(&self, id: u32) -> bool {
        self.uids.contains(&id) || self.gids.contains(&id)
    }

    /// Uids currently in use.
    #[must_use]
    pub fn uids(&self) -> &BTreeSet<u32> {
        &self.uids
    }

    /// Gids currently in use.
    #[must_use]
    pub fn gids(&self) -> &BTreeSet<u32> {
        &self.gids
    }

    /// Allocates the lowest free identifier at or above `floor`.
    ///
    /// # Errors
    ///
    /// See [`allocate`].
    pub fn allocate(&mut self, floor: u32) -> Result<u32> {
        allocate(floor, self)
    }
}

/// Returns the smallest integer `>= floor` present in neither set of `pool` and reserves it in
/// both.
///
/// # Errors
///
/// Returns [`Error::Conflict`] if every identifier from `floor` to `u32::MAX` is taken.
pub fn allocate(floor: u32, pool: &mut IdPool) -> Result<u32> {
    let id = (floor..=u32::MAX)
        .find(|candidate| !pool.is_used(*candidate))
        .ok_or_else(|| Error::Conflict(format!("no free uid/gid at or above {floor}")))?;

    pool.reserve_uid(id);
    pool.reserve_gid(id);
    tracing::debug!(id, floor, "allocated posix identifier");
    Ok(id)
}
