//! Syntax tokens for the two target engines.
//!
//! A [`Dialect`] is a plain table of tokens passed by value into every
//! emitter. The helper methods only splice tokens together; anything with
//! engine-specific structure lives in [`crate::ddl`] and [`crate::runtime`].

use realign_model::{Engine, QualifiedName};

use crate::ddl::{DdlBuilder, MssqlDdl, PostgresDdl};

/// How two values are compared for "has this changed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compare {
    /// Ordinary equality.
    Plain,
    /// Case- and accent-sensitive text equality.
    Text,
    /// Only NULL versus non-NULL; for types without equality.
    NullOnly,
}

/// Syntax tokens for one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    /// Target engine.
    pub engine: Engine,
    /// Prefix of session-scoped staging tables.
    pub temp_prefix: &'static str,
    /// Statement that creates a session-scoped table.
    pub temp_create: &'static str,
    /// Boolean column type.
    pub bool_type: &'static str,
    /// Boolean true literal.
    pub true_literal: &'static str,
    /// Boolean false literal.
    pub false_literal: &'static str,
    /// Unbounded text type.
    pub max_text: &'static str,
    /// 32-bit integer type.
    pub int_type: &'static str,
    /// 64-bit integer type.
    pub bigint_type: &'static str,
    /// Prefix of script variables.
    pub var_prefix: &'static str,
    /// Separator between variable declarations.
    pub declare_separator: &'static str,
    /// String concatenation operator.
    pub concat_op: &'static str,
    /// Suffix for text columns of staging tables.
    pub text_collation: &'static str,
    /// Binary collation forcing exact text comparison.
    pub binary_collation: Option<&'static str>,
    /// Identifier quote characters.
    pub quote_open: char,
    /// Closing identifier quote.
    pub quote_close: char,
    /// Prefix of string literals.
    pub string_prefix: &'static str,
    /// NULL replacement function.
    pub null_fn: &'static str,
    /// Identity column clause with `{seed}` and `{increment}` placeholders.
    pub identity_clause: &'static str,
    /// `ALTER COLUMN` restates nullability, so altered columns need re-tightening.
    pub alter_resets_nullability: bool,
    /// Most rows a single `VALUES` list may carry.
    pub max_values_rows: usize,
}

impl Dialect {
    /// SQL Server / T-SQL.
    pub const MSSQL: Dialect = Dialect {
        engine: Engine::Mssql,
        temp_prefix: "#",
        temp_create: "CREATE TABLE",
        bool_type: "BIT",
        true_literal: "1",
        false_literal: "0",
        max_text: "NVARCHAR(MAX)",
        int_type: "INT",
        bigint_type: "BIGINT",
        var_prefix: "@",
        declare_separator: ",",
        concat_op: " + ",
        text_collation: " COLLATE DATABASE_DEFAULT",
        binary_collation: Some("Latin1_General_BIN2"),
        quote_open: '[',
        quote_close: ']',
        string_prefix: "N",
        null_fn: "ISNULL",
        identity_clause: "IDENTITY({seed}, {increment})",
        alter_resets_nullability: true,
        max_values_rows: 1000,
    };

    /// PostgreSQL / PL/pgSQL.
    pub const POSTGRES: Dialect = Dialect {
        engine: Engine::Postgres,
        temp_prefix: "",
        temp_create: "CREATE TEMP TABLE",
        bool_type: "BOOLEAN",
        true_literal: "TRUE",
        false_literal: "FALSE",
        max_text: "TEXT",
        int_type: "INTEGER",
        bigint_type: "BIGINT",
        var_prefix: "v_",
        declare_separator: ";",
        concat_op: " || ",
        text_collation: "",
        binary_collation: None,
        quote_open: '"',
        quote_close: '"',
        string_prefix: "",
        null_fn: "COALESCE",
        identity_clause: "GENERATED BY DEFAULT AS IDENTITY (START WITH {seed} INCREMENT BY {increment})",
        alter_resets_nullability: false,
        max_values_rows: usize::MAX,
    };

    /// Tokens for an engine.
    pub fn for_engine(engine: Engine) -> Self {
        match engine {
            Engine::Mssql => Self::MSSQL,
            Engine::Postgres => Self::POSTGRES,
        }
    }

    /// DDL builder for this engine.
    pub fn ddl(&self) -> &'static dyn DdlBuilder {
        match self.engine {
            Engine::Mssql => &MssqlDdl,
            Engine::Postgres => &PostgresDdl,
        }
    }

    /// Quote an identifier.
    pub fn quote(&self, ident: &str) -> String {
        let close = self.quote_close.to_string();
        let escaped = ident.replace(self.quote_close, &format!("{close}{close}"));
        format!("{}{}{}", self.quote_open, escaped, self.quote_close)
    }

    /// Quote a schema-qualified name.
    pub fn qualified(&self, name: &QualifiedName) -> String {
        format!("{}.{}", self.quote(&name.schema), self.quote(&name.name))
    }

    /// String literal.
    pub fn string(&self, text: &str) -> String {
        format!("{}'{}'", self.string_prefix, text.replace('\'', "''"))
    }

    /// String literal or `NULL`.
    pub fn opt_string(&self, text: Option<&str>) -> String {
        text.map_or_else(|| "NULL".to_string(), |t| self.string(t))
    }

    /// Boolean literal.
    pub fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            self.true_literal
        } else {
            self.false_literal
        }
    }

    /// Staging table name.
    pub fn temp(&self, stage: &str) -> String {
        format!("{}realign_{}", self.temp_prefix, stage)
    }

    /// Script variable name.
    pub fn var(&self, name: &str) -> String {
        format!("{}{}", self.var_prefix, name)
    }

    /// Text column type for staging tables.
    pub fn text_column(&self) -> String {
        format!("{}{}", self.max_text, self.text_collation)
    }

    /// Condition: a boolean column is set.
    pub fn is_set(&self, column: &str) -> String {
        match self.engine {
            Engine::Mssql => format!("{column} = 1"),
            Engine::Postgres => column.to_string(),
        }
    }

    /// Condition: a boolean column is clear.
    pub fn is_clear(&self, column: &str) -> String {
        match self.engine {
            Engine::Mssql => format!("{column} = 0"),
            Engine::Postgres => format!("NOT {column}"),
        }
    }

    /// Join expressions with the concatenation operator.
    pub fn concat<S: AsRef<str>>(&self, parts: &[S]) -> String {
        parts
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(self.concat_op)
    }

    /// Convert an expression to text.
    pub fn to_text(&self, expr: &str) -> String {
        match self.engine {
            Engine::Mssql => format!("CONVERT({}, {expr})", self.max_text),
            Engine::Postgres => format!("CAST({expr} AS TEXT)"),
        }
    }

    /// Replace NULL with a fallback.
    pub fn null_or(&self, expr: &str, fallback: &str) -> String {
        format!("{}({expr}, {fallback})", self.null_fn)
    }

    /// NULL-aware inequality: two NULLs are equal, NULL versus a value differs.
    pub fn distinct(&self, a: &str, b: &str, compare: Compare) -> String {
        let nulls = format!("({a} IS NULL AND {b} IS NOT NULL) OR ({a} IS NOT NULL AND {b} IS NULL)");
        match (compare, self.engine) {
            (Compare::NullOnly, _) => format!("({nulls})"),
            (_, Engine::Postgres) => format!("{a} IS DISTINCT FROM {b}"),
            (Compare::Text, Engine::Mssql) => {
                let collation = self.binary_collation.unwrap_or("DATABASE_DEFAULT");
                format!("({a} COLLATE {collation} <> {b} COLLATE {collation} OR {nulls})")
            }
            (Compare::Plain, Engine::Mssql) => format!("({a} <> {b} OR {nulls})"),
        }
    }

    /// Condition: a permanent table exists.
    pub fn table_exists(&self, table: &QualifiedName) -> String {
        let name = self.string(&self.qualified(table));
        match self.engine {
            Engine::Mssql => format!("OBJECT_ID({name}, N'U') IS NOT NULL"),
            Engine::Postgres => format!("to_regclass({name}) IS NOT NULL"),
        }
    }

    /// Drop a staging table when it exists.
    pub fn drop_temp(&self, stage: &str) -> String {
        let table = self.temp(stage);
        match self.engine {
            Engine::Mssql => format!(
                "IF OBJECT_ID(N'tempdb..{table}') IS NOT NULL DROP TABLE {table};"
            ),
            Engine::Postgres => format!("DROP TABLE IF EXISTS pg_temp.{table};"),
        }
    }

    /// Create a staging table from column definitions.
    pub fn create_temp(&self, stage: &str, columns: &[String]) -> String {
        format!(
            "{} {} (\n    {}\n);",
            self.temp_create,
            self.temp(stage),
            columns.join(",\n    ")
        )
    }

    /// `UPDATE` of `target` joined to `source`.
    pub fn update_join(
        &self,
        target: &str,
        target_alias: &str,
        set: &str,
        source: &str,
        source_alias: &str,
        on: &str,
        filter: &str,
    ) -> String {
        match self.engine {
            Engine::Mssql => format!(
                "UPDATE {target_alias} SET {set}\nFROM {target} {target_alias}\nJOIN {source} {source_alias} ON {on}\nWHERE {filter};"
            ),
            Engine::Postgres => format!(
                "UPDATE {target} {target_alias} SET {set}\nFROM {source} {source_alias}\nWHERE {on} AND ({filter});"
            ),
        }
    }

    /// `UPDATE` of an aliased table.
    pub fn update_where(&self, table: &str, alias: &str, set: &str, filter: &str) -> String {
        match self.engine {
            Engine::Mssql => format!("UPDATE {alias} SET {set}\nFROM {table} {alias}\nWHERE {filter};"),
            Engine::Postgres => format!("UPDATE {table} {alias} SET {set}\nWHERE {filter};"),
        }
    }

    /// `DELETE` from an aliased table.
    pub fn delete_where(&self, table: &str, alias: &str, filter: &str) -> String {
        match self.engine {
            Engine::Mssql => format!("DELETE {alias}\nFROM {table} {alias}\nWHERE {filter};"),
            Engine::Postgres => format!("DELETE FROM {table} {alias}\nWHERE {filter};"),
        }
    }

    /// Wrap a row query so it yields a single conflict count.
    pub fn count_query(&self, inner: &str) -> String {
        match self.engine {
            Engine::Mssql => format!("SELECT @conflict = COUNT(*) FROM ({inner}) d"),
            Engine::Postgres => format!("SELECT COUNT(*) FROM ({inner}) d"),
        }
    }

    /// Identity clause for a column definition.
    pub fn identity(&self, seed: i64, increment: i64) -> String {
        self.identity_clause
            .replace("{seed}", &seed.to_string())
            .replace("{increment}", &increment.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes_closing_character() {
        assert_eq!(Dialect::MSSQL.quote("odd]name"), "[odd]]name]");
        assert_eq!(Dialect::POSTGRES.quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(Dialect::MSSQL.string("it's"), "N'it''s'");
        assert_eq!(Dialect::POSTGRES.string("it's"), "'it''s'");
        assert_eq!(Dialect::POSTGRES.opt_string(None), "NULL");
    }

    #[test]
    fn test_temp_names() {
        assert_eq!(Dialect::MSSQL.temp("columns"), "#realign_columns");
        assert_eq!(Dialect::POSTGRES.temp("columns"), "realign_columns");
    }

    #[test]
    fn test_distinct_is_null_aware_on_mssql() {
        let expr = Dialect::MSSQL.distinct("s.a", "l.a", Compare::Plain);
        assert_eq!(
            expr,
            "(s.a <> l.a OR (s.a IS NULL AND l.a IS NOT NULL) OR (s.a IS NOT NULL AND l.a IS NULL))"
        );
    }

    #[test]
    fn test_distinct_text_uses_binary_collation() {
        let expr = Dialect::MSSQL.distinct("s.a", "l.a", Compare::Text);
        assert!(expr.starts_with("(s.a COLLATE Latin1_General_BIN2 <> l.a COLLATE Latin1_General_BIN2"));
    }

    #[test]
    fn test_distinct_on_postgres() {
        assert_eq!(
            Dialect::POSTGRES.distinct("s.a", "l.a", Compare::Text),
            "s.a IS DISTINCT FROM l.a"
        );
        assert_eq!(
            Dialect::POSTGRES.distinct("s.a", "l.a", Compare::NullOnly),
            "((s.a IS NULL AND l.a IS NOT NULL) OR (s.a IS NOT NULL AND l.a IS NULL))"
        );
    }

    #[test]
    fn test_table_exists() {
        let t = QualifiedName::new("dbo", "orders");
        assert_eq!(
            Dialect::MSSQL.table_exists(&t),
            "OBJECT_ID(N'[dbo].[orders]', N'U') IS NOT NULL"
        );
        let t = QualifiedName::new("public", "orders");
        assert_eq!(
            Dialect::POSTGRES.table_exists(&t),
            "to_regclass('\"public\".\"orders\"') IS NOT NULL"
        );
    }

    #[test]
    fn test_update_join_shapes() {
        let mssql = Dialect::MSSQL.update_join("#t", "s", "status = 1", "#l", "l", "s.k = l.k", "s.status = 0");
        assert!(mssql.starts_with("UPDATE s SET status = 1\nFROM #t s\nJOIN #l l ON s.k = l.k"));
        let pg = Dialect::POSTGRES.update_join("t", "s", "status = 1", "l", "l", "s.k = l.k", "s.status = 0");
        assert!(pg.ends_with("WHERE s.k = l.k AND (s.status = 0);"));
    }

    #[test]
    fn test_identity_clause() {
        assert_eq!(Dialect::MSSQL.identity(100, 10), "IDENTITY(100, 10)");
        assert!(Dialect::POSTGRES.identity(1, 1).contains("START WITH 1 INCREMENT BY 1"));
    }
}
