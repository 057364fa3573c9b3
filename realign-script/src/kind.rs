//! Entity kinds and sets of them.

use std::fmt;
use std::str::FromStr;

use crate::error::ScriptError;

/// Every structural entity kind the reconciler stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// Schemas.
    Schema,
    /// Tables.
    Table,
    /// Table columns.
    Column,
    /// Column defaults.
    Default,
    /// Check constraints.
    Check,
    /// Indexes, primary keys and unique constraints.
    Index,
    /// Member columns of indexes.
    IndexColumn,
    /// Foreign keys.
    ForeignKey,
    /// Column pairs of foreign keys.
    FkColumn,
    /// Views, functions, procedures and triggers.
    Coded,
}

impl EntityKind {
    /// Staging order.
    pub const ALL: [EntityKind; 10] = [
        Self::Schema,
        Self::Table,
        Self::Column,
        Self::Default,
        Self::Check,
        Self::Index,
        Self::IndexColumn,
        Self::ForeignKey,
        Self::FkColumn,
        Self::Coded,
    ];

    /// Staging table suffix.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Schema => "schemas",
            Self::Table => "tables",
            Self::Column => "columns",
            Self::Default => "defaults",
            Self::Check => "checks",
            Self::Index => "indexes",
            Self::IndexColumn => "index_columns",
            Self::ForeignKey => "fks",
            Self::FkColumn => "fk_columns",
            Self::Coded => "coded",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Table => "table",
            Self::Column => "column",
            Self::Default => "default",
            Self::Check => "check constraint",
            Self::Index => "index",
            Self::IndexColumn => "index column",
            Self::ForeignKey => "foreign key",
            Self::FkColumn => "foreign key column",
            Self::Coded => "coded entity",
        }
    }

    /// Whether rows of this kind belong to a table.
    pub fn is_table_child(&self) -> bool {
        !matches!(self, Self::Schema | Self::Table | Self::Coded)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stage())
    }
}

impl FromStr for EntityKind {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        EntityKind::ALL
            .into_iter()
            .find(|k| k.stage() == wanted || k.label().replace(' ', "_") == wanted)
            .ok_or_else(|| ScriptError::invalid_options(format!("unknown entity kind `{s}`")))
    }
}

/// A set of entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSet(u16);

impl KindSet {
    /// Every kind.
    pub fn all() -> Self {
        Self::from_kinds(EntityKind::ALL)
    }

    /// No kinds.
    pub fn empty() -> Self {
        Self(0)
    }

    /// Exactly the given kinds, completed by [`KindSet::normalized`].
    pub fn from_kinds(kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        let mut set = Self::empty();
        for kind in kinds {
            set.insert(kind);
        }
        set.normalized()
    }

    fn bit(kind: EntityKind) -> u16 {
        1 << (kind as u16)
    }

    /// Add a kind.
    pub fn insert(&mut self, kind: EntityKind) {
        self.0 |= Self::bit(kind);
    }

    /// Whether a kind is included.
    pub fn contains(&self, kind: EntityKind) -> bool {
        self.0 & Self::bit(kind) != 0
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Included kinds in staging order.
    pub fn iter(&self) -> impl Iterator<Item = EntityKind> + '_ {
        EntityKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }

    /// Add the kinds the included ones cannot be reconciled without.
    ///
    /// Table-owned kinds need tables; indexes and foreign keys always travel
    /// with their member rows.
    pub fn normalized(mut self) -> Self {
        if self.iter().any(|k| k.is_table_child()) {
            self.insert(EntityKind::Table);
        }
        if self.contains(EntityKind::Index) || self.contains(EntityKind::IndexColumn) {
            self.insert(EntityKind::Index);
            self.insert(EntityKind::IndexColumn);
        }
        if self.contains(EntityKind::ForeignKey) || self.contains(EntityKind::FkColumn) {
            self.insert(EntityKind::ForeignKey);
            self.insert(EntityKind::FkColumn);
        }
        self
    }
}

impl Default for KindSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for KindSet {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        let kinds = s
            .split(',')
            .filter(|p| !p.trim().is_empty())
            .map(EntityKind::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_kinds(kinds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_kinds_pull_in_tables() {
        let set = KindSet::from_kinds([EntityKind::Column]);
        assert!(set.contains(EntityKind::Table));
        assert!(!set.contains(EntityKind::Schema));
    }

    #[test]
    fn test_indexes_travel_with_members() {
        let set = KindSet::from_kinds([EntityKind::IndexColumn]);
        assert!(set.contains(EntityKind::Index));
        let set = KindSet::from_kinds([EntityKind::ForeignKey]);
        assert!(set.contains(EntityKind::FkColumn));
    }

    #[test]
    fn test_parse() {
        let set: KindSet = "schemas, coded".parse().unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![EntityKind::Schema, EntityKind::Coded]);
        assert_eq!("foreign_key".parse::<EntityKind>().unwrap(), EntityKind::ForeignKey);
        assert!("sequences".parse::<KindSet>().is_err());
        assert_eq!("all".parse::<KindSet>().unwrap(), KindSet::all());
    }
}
