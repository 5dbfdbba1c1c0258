//! Relationship resolution between a main table and an embedded table.
//!
//! By convention the main table holds `<singular(related)>_id`. Tables
//! registered as reverse relations hold `<singular(main)>_id` instead. An
//! explicit per-pair entry overrides both rules.

use std::collections::{HashMap, HashSet};

/// Which side of a relationship holds the foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The main table holds the foreign key (to-one).
    OwnedByMain,

    /// The related table holds the foreign key (has-many).
    OwnedByRelated,
}

/// A resolved relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Name of the foreign key column.
    pub foreign_key: String,

    /// Which table holds `foreign_key`.
    pub direction: Direction,
}

/// Registry of relationship conventions, built once and shared by a
/// [`Client`](crate::Client).
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    reverse: HashSet<String>,
    explicit: HashMap<(String, String), Relationship>,
}

impl Relationships {
    /// Creates an empty registry: every relation resolves to
    /// [`Direction::OwnedByMain`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `table` as holding the foreign key back to whichever table embeds it.
    #[must_use]
    pub fn reverse(mut self, table: impl Into<String>) -> Self {
        self.reverse.insert(table.into());
        self
    }

    /// Pins the relationship between `main` and `related`, bypassing the
    /// naming convention. Useful for irregular plurals.
    #[must_use]
    pub fn foreign_key(
        mut self, main: impl Into<String>, related: impl Into<String>,
        column: impl Into<String>, direction: Direction,
    ) -> Self {
        self.explicit.insert(
            (main.into(), related.into()),
            Relationship {
                foreign_key: column.into(),
                direction,
            },
        );
        self
    }

    /// Resolves the relationship between `main` and `related`.
    #[must_use]
    pub fn resolve(&self, main: &str, related: &str) -> Relationship {
        if let Some(relationship) = self.explicit.get(&(main.to_string(), related.to_string())) {
            return relationship.clone();
        }

        if self.reverse.contains(related) {
            Relationship {
                foreign_key: format!("{}_id", singularize(main)),
                direction: Direction::OwnedByRelated,
            }
        } else {
            Relationship {
                foreign_key: format!("{}_id", singularize(related)),
                direction: Direction::OwnedByMain,
            }
        }
    }
}

/// Naive English singular: `ies` → `y`, `ses` → `s`, trailing `s` removed.
///
/// Irregular plurals (`people`, `children`) are returned unchanged; register
/// them with [`Relationships::foreign_key`].
#[must_use]
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = word.strip_suffix("ses") {
        format!("{stem}s")
    } else if let Some(stem) = word.strip_suffix('s') {
        stem.to_string()
    } else {
        word.to_string()
    }
}
