//! Per-entity-type identifier issuance.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

/// The entity types that receive identifiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    Supply,
    Location,
    FamilyGroup,
    MedicalRecord,
    Inquiry,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        Self::Person,
        Self::Supply,
        Self::Location,
        Self::FamilyGroup,
        Self::MedicalRecord,
        Self::Inquiry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Supply => "supply",
            Self::Location => "location",
            Self::FamilyGroup => "family group",
            Self::MedicalRecord => "medical record",
            Self::Inquiry => "inquiry",
        }
    }

    /// First identifier handed out for this kind.
    pub fn seed(&self) -> i64 {
        match self {
            Self::Person => 10,
            _ => 100,
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issues strictly increasing identifiers per [`EntityKind`].
///
/// One allocator is created at program start and passed to every constructor
/// that needs an ID. The counters are atomics, so sharing a single instance
/// between threads cannot hand out the same ID twice.
#[derive(Debug)]
pub struct IdAllocator {
    next: [AtomicI64; 6],
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: EntityKind::ALL.map(|kind| AtomicI64::new(kind.seed())),
        }
    }

    pub fn next_id(&self, kind: EntityKind) -> i64 {
        self.next[kind.index()].fetch_add(1, Ordering::SeqCst)
    }

    /// The ID the next call to [`next_id`](Self::next_id) would return.
    pub fn peek(&self, kind: EntityKind) -> i64 {
        self.next[kind.index()].load(Ordering::SeqCst)
    }

    /// Steps the counter back by one after a failed persistence write.
    ///
    /// The entity that failed keeps the ID it was given; only the next
    /// issuance reuses the number. The counter never drops below the seed.
    pub fn rollback(&self, kind: EntityKind) {
        let seed = kind.seed();
        let _ = self.next[kind.index()].fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            (n > seed).then(|| n - 1)
        });
    }

    /// Moves the counter past an ID loaded from the store.
    pub fn observe(&self, kind: EntityKind, id: i64) {
        self.next[kind.index()].fetch_max(id.saturating_add(1), Ordering::SeqCst);
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
