//! T-SQL DDL.

use realign_model::{
    CheckConstraintSpec, CodedEntity, CodedKind, ColumnSpec, DefaultSpec, ForeignKeySpec,
    IndexSpec, QualifiedName, ReferentialAction, SchemaObject, TableEntity,
};

use super::{DdlBuilder, column_list, parenthesize};
use crate::dialect::Dialect;

/// DDL builder for SQL Server.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlDdl;

const D: Dialect = Dialect::MSSQL;

impl MssqlDdl {
    fn column_base(&self, column: &ColumnSpec) -> String {
        let mut sql = format!("{} {}", D.quote(&column.name), self.type_sql(column));
        if let Some(collation) = &column.collation {
            sql.push_str(" COLLATE ");
            sql.push_str(collation);
        }
        if let Some(identity) = &column.identity {
            sql.push(' ');
            sql.push_str(&D.identity(identity.seed, identity.increment));
        }
        sql
    }

    fn computed(&self, column: &ColumnSpec, expr: &str) -> String {
        format!("{} AS {}", D.quote(&column.name), parenthesize(expr))
    }

    fn column_definition(&self, table: &TableEntity, column: &ColumnSpec) -> String {
        if let Some(expr) = &column.computed {
            return self.computed(column, expr);
        }
        let mut sql = self.column_base(column);
        sql.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        if let Some(default) = table.default_for(&column.name) {
            if let Some(name) = &default.name {
                sql.push_str(&format!(" CONSTRAINT {}", D.quote(name)));
            }
            sql.push_str(&format!(" DEFAULT {}", parenthesize(&default.definition)));
        }
        sql
    }

    fn index_keys(&self, index: &IndexSpec) -> String {
        index
            .key_columns()
            .map(|c| {
                format!(
                    "{} {}",
                    D.quote(&c.column),
                    if c.descending { "DESC" } else { "ASC" }
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn clustering(index: &IndexSpec) -> &'static str {
        if index.is_clustered {
            "CLUSTERED"
        } else {
            "NONCLUSTERED"
        }
    }

    fn constraint_clause(&self, index: &IndexSpec) -> String {
        let kind = if index.is_primary_key {
            "PRIMARY KEY"
        } else {
            "UNIQUE"
        };
        format!(
            "CONSTRAINT {} {kind} {} ({})",
            D.quote(&index.name),
            Self::clustering(index),
            self.index_keys(index)
        )
    }

    fn action(action: ReferentialAction) -> &'static str {
        match action {
            ReferentialAction::Restrict => ReferentialAction::NoAction.as_sql(),
            other => other.as_sql(),
        }
    }
}

impl DdlBuilder for MssqlDdl {
    fn dialect(&self) -> Dialect {
        D
    }

    fn type_sql(&self, column: &ColumnSpec) -> String {
        let ty = column.type_name.to_ascii_lowercase();
        match ty.as_str() {
            "char" | "varchar" | "nchar" | "nvarchar" | "binary" | "varbinary" => {
                match column.max_length {
                    Some(-1) => format!("{ty}(max)"),
                    Some(n) => format!("{ty}({n})"),
                    None => ty,
                }
            }
            "decimal" | "numeric" => match (column.precision, column.scale) {
                (Some(p), Some(s)) => format!("{ty}({p}, {s})"),
                (Some(p), None) => format!("{ty}({p})"),
                _ => ty,
            },
            "datetime2" | "time" | "datetimeoffset" => match column.scale {
                Some(s) => format!("{ty}({s})"),
                None => ty,
            },
            _ => ty,
        }
    }

    fn create_schema(&self, schema: &SchemaObject) -> String {
        match &schema.owner {
            Some(owner) => format!(
                "CREATE SCHEMA {} AUTHORIZATION {};",
                D.quote(&schema.name),
                D.quote(owner)
            ),
            None => format!("CREATE SCHEMA {};", D.quote(&schema.name)),
        }
    }

    fn alter_schema_owner(&self, schema: &str, owner: &str) -> String {
        format!(
            "ALTER AUTHORIZATION ON SCHEMA::{} TO {};",
            D.quote(schema),
            D.quote(owner)
        )
    }

    fn create_table(&self, table: &TableEntity) -> String {
        let mut parts: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(table, c))
            .collect();
        for check in &table.checks {
            parts.push(format!(
                "CONSTRAINT {} CHECK {}",
                D.quote(&check.name),
                parenthesize(&check.definition)
            ));
        }
        if let Some(pk) = table.primary_key() {
            parts.push(self.constraint_clause(pk));
        }
        let mut sql = format!(
            "CREATE TABLE {} (\n    {}\n);",
            D.qualified(&table.name),
            parts.join(",\n    ")
        );
        for check in table.checks.iter().filter(|c| c.is_disabled) {
            sql.push_str(&format!(
                "\nALTER TABLE {} NOCHECK CONSTRAINT {};",
                D.qualified(&table.name),
                D.quote(&check.name)
            ));
        }
        sql
    }

    fn add_column(&self, table: &QualifiedName, column: &ColumnSpec) -> String {
        let definition = match &column.computed {
            Some(expr) => self.computed(column, expr),
            None if column.identity.is_some() => format!("{} NOT NULL", self.column_base(column)),
            None => format!("{} NULL", self.column_base(column)),
        };
        format!("ALTER TABLE {} ADD {definition};", D.qualified(table))
    }

    fn alter_column(&self, table: &QualifiedName, column: &ColumnSpec) -> String {
        let mut definition = format!("{} {}", D.quote(&column.name), self.type_sql(column));
        if let Some(collation) = &column.collation {
            definition.push_str(" COLLATE ");
            definition.push_str(collation);
        }
        let nullability = if column.identity.is_some() {
            "NOT NULL"
        } else {
            "NULL"
        };
        format!(
            "ALTER TABLE {} ALTER COLUMN {definition} {nullability};",
            D.qualified(table)
        )
    }

    fn relax_column(&self, table: &QualifiedName, column: &ColumnSpec) -> String {
        self.alter_column(table, column)
    }

    fn tighten_column(&self, table: &TableEntity, column: &ColumnSpec) -> Option<String> {
        if column.nullable || column.computed.is_some() || column.identity.is_some() {
            return None;
        }
        let name = D.qualified(&table.name);
        let mut sql = String::new();
        if let Some(default) = table.default_for(&column.name) {
            sql.push_str(&format!(
                "UPDATE {name} SET {} = {} WHERE {} IS NULL;\n",
                D.quote(&column.name),
                parenthesize(&default.definition),
                D.quote(&column.name)
            ));
        }
        let mut definition = format!("{} {}", D.quote(&column.name), self.type_sql(column));
        if let Some(collation) = &column.collation {
            definition.push_str(" COLLATE ");
            definition.push_str(collation);
        }
        sql.push_str(&format!("ALTER TABLE {name} ALTER COLUMN {definition} NOT NULL;"));
        Some(sql)
    }

    fn identity_change(&self, _table: &QualifiedName, _column: &ColumnSpec) -> Option<String> {
        None
    }

    fn add_default(&self, table: &QualifiedName, default: &DefaultSpec) -> String {
        let constraint = default
            .name
            .as_ref()
            .map(|n| format!("CONSTRAINT {} ", D.quote(n)))
            .unwrap_or_default();
        format!(
            "ALTER TABLE {} ADD {constraint}DEFAULT {} FOR {};",
            D.qualified(table),
            parenthesize(&default.definition),
            D.quote(&default.column)
        )
    }

    fn add_check(&self, table: &QualifiedName, check: &CheckConstraintSpec) -> String {
        let name = D.qualified(table);
        let body = format!(
            "ADD CONSTRAINT {} CHECK {};",
            D.quote(&check.name),
            parenthesize(&check.definition)
        );
        if check.is_disabled {
            format!(
                "ALTER TABLE {name} WITH NOCHECK {body}\nALTER TABLE {name} NOCHECK CONSTRAINT {};",
                D.quote(&check.name)
            )
        } else {
            format!("ALTER TABLE {name} WITH CHECK {body}")
        }
    }

    fn toggle_check(&self, table: &QualifiedName, check: &CheckConstraintSpec) -> String {
        toggle_constraint(table, &check.name, check.is_disabled)
    }

    fn create_index(&self, table: &QualifiedName, index: &IndexSpec) -> String {
        if index.is_constraint() {
            return format!(
                "ALTER TABLE {} ADD {};",
                D.qualified(table),
                self.constraint_clause(index)
            );
        }
        let mut sql = format!(
            "CREATE {}{} INDEX {} ON {} ({})",
            if index.is_unique { "UNIQUE " } else { "" },
            Self::clustering(index),
            D.quote(&index.name),
            D.qualified(table),
            self.index_keys(index)
        );
        let included: Vec<&str> = index.included_columns().map(|c| c.column.as_str()).collect();
        if !included.is_empty() {
            sql.push_str(&format!(" INCLUDE ({})", column_list(D, included)));
        }
        if let Some(filter) = &index.filter {
            sql.push_str(&format!(" WHERE {}", parenthesize(filter)));
        }
        sql.push(';');
        sql
    }

    fn add_foreign_key(&self, table: &QualifiedName, fk: &ForeignKeySpec) -> String {
        let name = D.qualified(table);
        let body = format!(
            "ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {};",
            D.quote(&fk.name),
            column_list(D, fk.columns.iter().map(|c| c.column.as_str())),
            D.qualified(&fk.referenced),
            column_list(D, fk.columns.iter().map(|c| c.referenced_column.as_str())),
            Self::action(fk.on_delete),
            Self::action(fk.on_update)
        );
        if fk.is_disabled {
            format!(
                "ALTER TABLE {name} WITH NOCHECK {body}\nALTER TABLE {name} NOCHECK CONSTRAINT {};",
                D.quote(&fk.name)
            )
        } else {
            format!("ALTER TABLE {name} WITH CHECK {body}")
        }
    }

    fn toggle_foreign_key(&self, table: &QualifiedName, fk: &ForeignKeySpec) -> String {
        toggle_constraint(table, &fk.name, fk.is_disabled)
    }

    fn create_coded(&self, entity: &CodedEntity) -> String {
        entity.definition.trim().to_string()
    }

    fn toggle_trigger(&self, entity: &CodedEntity) -> Option<String> {
        let table = entity.table.as_ref()?;
        if entity.kind != CodedKind::Trigger {
            return None;
        }
        Some(format!(
            "{} TRIGGER {} ON {};",
            if entity.is_disabled { "DISABLE" } else { "ENABLE" },
            D.qualified(&entity.name),
            D.qualified(table)
        ))
    }
}

fn toggle_constraint(table: &QualifiedName, name: &str, disabled: bool) -> String {
    if disabled {
        format!(
            "ALTER TABLE {} NOCHECK CONSTRAINT {};",
            D.qualified(table),
            D.quote(name)
        )
    } else {
        format!(
            "ALTER TABLE {} WITH CHECK CHECK CONSTRAINT {};",
            D.qualified(table),
            D.quote(name)
        )
    }
}
