//! Foreign keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::QualifiedName;

/// Referential action for `ON DELETE` / `ON UPDATE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferentialAction {
    /// No action (the default).
    #[default]
    NoAction,
    /// Restrict.
    Restrict,
    /// Cascade.
    Cascade,
    /// Set to NULL.
    SetNull,
    /// Set to the column default.
    SetDefault,
}

impl ReferentialAction {
    /// Canonical catalog code, as projected by the live catalog queries.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoAction => "NO_ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET_NULL",
            Self::SetDefault => "SET_DEFAULT",
        }
    }

    /// SQL keyword form.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Whether deleting a referenced row fails while children exist.
    pub fn is_restrictive(&self) -> bool {
        matches!(self, Self::NoAction | Self::Restrict)
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A foreign key from the owning table to `referenced`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySpec {
    /// Constraint name.
    pub name: SmolStr,
    /// Referenced (parent) table.
    pub referenced: QualifiedName,
    /// Column pairs in constraint order.
    pub columns: Vec<FkColumnSpec>,
    /// Action on parent delete.
    #[serde(default)]
    pub on_delete: ReferentialAction,
    /// Action on parent key update.
    #[serde(default)]
    pub on_update: ReferentialAction,
    /// Disabled (`NOCHECK`) or not validated.
    #[serde(default)]
    pub is_disabled: bool,
}

impl ForeignKeySpec {
    /// Create a foreign key over `(column, referenced column)` pairs.
    pub fn new(
        name: impl Into<SmolStr>,
        referenced: QualifiedName,
        pairs: &[(&str, &str)],
    ) -> Self {
        Self {
            name: name.into(),
            referenced,
            columns: pairs
                .iter()
                .enumerate()
                .map(|(i, (column, referenced_column))| FkColumnSpec {
                    column: (*column).into(),
                    referenced_column: (*referenced_column).into(),
                    ordinal: i as u32 + 1,
                })
                .collect(),
            on_delete: ReferentialAction::NoAction,
            on_update: ReferentialAction::NoAction,
            is_disabled: false,
        }
    }

    /// Set the delete action.
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Set the update action.
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }

    /// Mark the constraint disabled.
    pub fn disabled(mut self) -> Self {
        self.is_disabled = true;
        self
    }

    /// Referencing column names.
    pub fn column_names(&self) -> Vec<SmolStr> {
        self.columns.iter().map(|c| c.column.clone()).collect()
    }

    /// Referenced column names.
    pub fn referenced_names(&self) -> Vec<SmolStr> {
        self.columns
            .iter()
            .map(|c| c.referenced_column.clone())
            .collect()
    }
}

/// One column pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FkColumnSpec {
    /// Referencing column.
    pub column: SmolStr,
    /// Referenced column.
    pub referenced_column: SmolStr,
    /// 1-based position within the constraint.
    pub ordinal: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_codes() {
        assert_eq!(ReferentialAction::SetNull.code(), "SET_NULL");
        assert_eq!(ReferentialAction::SetNull.as_sql(), "SET NULL");
        assert!(ReferentialAction::Restrict.is_restrictive());
        assert!(!ReferentialAction::Cascade.is_restrictive());
    }

    #[test]
    fn test_action_serde_form() {
        let json = serde_json::to_string(&ReferentialAction::SetDefault).unwrap();
        assert_eq!(json, "\"SET_DEFAULT\"");
    }

    #[test]
    fn test_pairs_get_ordinals() {
        let fk = ForeignKeySpec::new(
            "fk_lines_order",
            QualifiedName::new("dbo", "orders"),
            &[("order_id", "id"), ("region", "region")],
        );
        assert_eq!(fk.columns[1].ordinal, 2);
        assert_eq!(fk.referenced_names(), vec![SmolStr::new("id"), SmolStr::new("region")]);
    }
}
