//! Spatial index consistency engine.
//!
//! Keeps the side-car bounding-rectangle table of an indexed geometry
//! column in sync with the geometry data. Per (table, column) the
//! conceptual state machine is:
//!
//! | State                | Reached by                                     |
//! |----------------------|------------------------------------------------|
//! | NotIndexed           | initial, or [`disable_indexing`]               |
//! | Indexed-Unknown      | [`enable_indexing`], or a check hitting a      |
//! |                      | storage error                                  |
//! | Indexed-Consistent   | [`check_consistency`] finding no divergence,   |
//! |                      | or a successful [`recover`]                    |
//! | Indexed-Inconsistent | [`check_consistency`] finding divergence       |
//!
//! Only the indexed/not-indexed half is persisted (the catalog's
//! index-enabled flag); check verdicts are transient. Checks never mutate
//! anything. Recovery deletes and repopulates the side-car inside one
//! transaction, so a crash mid-recovery cannot leave it half-populated.
//! There are no automatic retries and no background self-healing: repair
//! is an explicit operator action.

mod engine;
mod tolerance;

pub use engine::{check_consistency, disable_indexing, enable_indexing, recover};
pub use tolerance::{bound_matches, rect_matches};

use spatlite_types::IndexMode;

/// Verdict of a consistency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Side-car and geometry data agree.
    Consistent,
    /// A genuine, successfully detected divergence — a normal maintenance
    /// finding, not a fault.
    Inconsistent,
    /// The host storage engine failed mid-scan; nothing is known about
    /// the index. Never to be read as evidence of corruption.
    Unknown { detail: String },
}

/// Outcome of a recovery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverOutcome {
    /// The side-car was rebuilt and is now consistent.
    Recovered,
    /// A requested pre-check found nothing to repair.
    AlreadyConsistent,
    /// The rebuild itself failed; the transaction was rolled back and the
    /// side-car is unchanged.
    Failed { detail: String },
    /// The pre-check could not determine index health, so no rebuild was
    /// attempted.
    Unknown { detail: String },
}

/// The conceptual per-column index state (see the module table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    NotIndexed,
    IndexedUnknown,
    IndexedConsistent,
    IndexedInconsistent,
}

impl IndexState {
    /// Combine the persisted index-enabled flag with the most recent
    /// (transient) check verdict, if any.
    #[must_use]
    pub fn from_parts(mode: IndexMode, last_check: Option<&CheckOutcome>) -> Self {
        if !mode.is_indexed() {
            return Self::NotIndexed;
        }
        match last_check {
            Some(CheckOutcome::Consistent) => Self::IndexedConsistent,
            Some(CheckOutcome::Inconsistent) => Self::IndexedInconsistent,
            Some(CheckOutcome::Unknown { .. }) | None => Self::IndexedUnknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_from_parts() {
        assert_eq!(
            IndexState::from_parts(IndexMode::Disabled, None),
            IndexState::NotIndexed
        );
        assert_eq!(
            IndexState::from_parts(IndexMode::RTree, None),
            IndexState::IndexedUnknown
        );
        assert_eq!(
            IndexState::from_parts(IndexMode::RTree, Some(&CheckOutcome::Consistent)),
            IndexState::IndexedConsistent
        );
        assert_eq!(
            IndexState::from_parts(IndexMode::MbrCache, Some(&CheckOutcome::Inconsistent)),
            IndexState::IndexedInconsistent
        );
        assert_eq!(
            IndexState::from_parts(
                IndexMode::RTree,
                Some(&CheckOutcome::Unknown {
                    detail: "disk I/O error".to_owned()
                })
            ),
            IndexState::IndexedUnknown
        );
        // A stale verdict never resurrects a dropped index.
        assert_eq!(
            IndexState::from_parts(IndexMode::Disabled, Some(&CheckOutcome::Consistent)),
            IndexState::NotIndexed
        );
    }
}
