//! PostgreSQL DDL.

use realign_model::{
    CheckConstraintSpec, CodedEntity, CodedKind, ColumnSpec, DefaultSpec, ForeignKeySpec,
    IndexSpec, QualifiedName, SchemaObject, TableEntity,
};

use super::{DdlBuilder, column_list, parenthesize};
use crate::dialect::Dialect;

/// DDL builder for PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDdl;

const D: Dialect = Dialect::POSTGRES;

impl PostgresDdl {
    fn typed(&self, column: &ColumnSpec) -> String {
        let mut sql = format!("{} {}", D.quote(&column.name), self.type_sql(column));
        if let Some(collation) = &column.collation {
            sql.push_str(" COLLATE ");
            sql.push_str(&D.quote(collation));
        }
        sql
    }

    fn generated(&self, column: &ColumnSpec) -> Option<String> {
        if let Some(expr) = &column.computed {
            return Some(format!("GENERATED ALWAYS AS {} STORED", parenthesize(expr)));
        }
        column
            .identity
            .map(|identity| D.identity(identity.seed, identity.increment))
    }

    fn column_definition(&self, table: &TableEntity, column: &ColumnSpec) -> String {
        let mut sql = self.typed(column);
        if let Some(generated) = self.generated(column) {
            sql.push(' ');
            sql.push_str(&generated);
        } else if let Some(default) = table.default_for(&column.name) {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.definition);
        }
        if !column.nullable && column.computed.is_none() {
            sql.push_str(" NOT NULL");
        }
        sql
    }

    fn constraint_clause(&self, index: &IndexSpec) -> String {
        let kind = if index.is_primary_key {
            "PRIMARY KEY"
        } else {
            "UNIQUE"
        };
        format!(
            "CONSTRAINT {} {kind} ({})",
            D.quote(&index.name),
            column_list(D, index.key_columns().map(|c| c.column.as_str()))
        )
    }

    fn check_clause(check: &CheckConstraintSpec) -> String {
        format!(
            "CONSTRAINT {} CHECK {}",
            D.quote(&check.name),
            parenthesize(&check.definition)
        )
    }

    fn fk_clause(fk: &ForeignKeySpec) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            D.quote(&fk.name),
            column_list(D, fk.columns.iter().map(|c| c.column.as_str())),
            D.qualified(&fk.referenced),
            column_list(D, fk.columns.iter().map(|c| c.referenced_column.as_str())),
            fk.on_delete.as_sql(),
            fk.on_update.as_sql()
        )
    }

    fn add_constraint(table: &QualifiedName, clause: String, disabled: bool) -> String {
        format!(
            "ALTER TABLE {} ADD {clause}{};",
            D.qualified(table),
            if disabled { " NOT VALID" } else { "" }
        )
    }

    fn toggle_constraint(table: &QualifiedName, name: &str, clause: String, disabled: bool) -> String {
        if disabled {
            format!(
                "ALTER TABLE {} DROP CONSTRAINT {};\n{}",
                D.qualified(table),
                D.quote(name),
                Self::add_constraint(table, clause, true)
            )
        } else {
            format!(
                "ALTER TABLE {} VALIDATE CONSTRAINT {};",
                D.qualified(table),
                D.quote(name)
            )
        }
    }

    fn terminated(definition: &str) -> String {
        let body = definition.trim().trim_end_matches(';').trim_end();
        format!("{body};")
    }
}

impl DdlBuilder for PostgresDdl {
    fn dialect(&self) -> Dialect {
        D
    }

    fn type_sql(&self, column: &ColumnSpec) -> String {
        let ty = column.type_name.to_ascii_lowercase();
        if let Some(element) = ty.strip_prefix('_') {
            return format!("{element}[]");
        }
        match ty.as_str() {
            "varchar" | "bpchar" | "bit" | "varbit" => match column.max_length {
                Some(n) if n > 0 => format!("{ty}({n})"),
                _ => ty,
            },
            "numeric" => match (column.precision, column.scale) {
                (Some(p), Some(s)) => format!("numeric({p}, {s})"),
                (Some(p), None) => format!("numeric({p})"),
                _ => ty,
            },
            "timestamp" | "timestamptz" | "time" | "timetz" | "interval" => match column.scale {
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
        format!("ALTER SCHEMA {} OWNER TO {};", D.quote(schema), D.quote(owner))
    }

    fn create_table(&self, table: &TableEntity) -> String {
        let mut parts: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(table, c))
            .collect();
        parts.extend(
            table
                .checks
                .iter()
                .filter(|c| !c.is_disabled)
                .map(Self::check_clause),
        );
        if let Some(pk) = table.primary_key() {
            parts.push(self.constraint_clause(pk));
        }
        let mut sql = format!(
            "CREATE TABLE {} (\n    {}\n);",
            D.qualified(&table.name),
            parts.join(",\n    ")
        );
        for check in table.checks.iter().filter(|c| c.is_disabled) {
            sql.push('\n');
            sql.push_str(&self.add_check(&table.name, check));
        }
        sql
    }

    fn add_column(&self, table: &QualifiedName, column: &ColumnSpec) -> String {
        let mut definition = self.typed(column);
        if let Some(generated) = self.generated(column) {
            definition.push(' ');
            definition.push_str(&generated);
        }
        format!("ALTER TABLE {} ADD COLUMN {definition};", D.qualified(table))
    }

    fn alter_column(&self, table: &QualifiedName, column: &ColumnSpec) -> String {
        let ty = self.type_sql(column);
        let mut sql = format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {ty}",
            D.qualified(table),
            D.quote(&column.name)
        );
        if let Some(collation) = &column.collation {
            sql.push_str(" COLLATE ");
            sql.push_str(&D.quote(collation));
        }
        sql.push_str(&format!(" USING {}::{ty};", D.quote(&column.name)));
        sql
    }

    fn relax_column(&self, table: &QualifiedName, column: &ColumnSpec) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL;",
            D.qualified(table),
            D.quote(&column.name)
        )
    }

    fn tighten_column(&self, table: &TableEntity, column: &ColumnSpec) -> Option<String> {
        if column.nullable || column.computed.is_some() || column.identity.is_some() {
            return None;
        }
        let name = D.qualified(&table.name);
        let quoted = D.quote(&column.name);
        let mut sql = String::new();
        if let Some(default) = table.default_for(&column.name) {
            sql.push_str(&format!(
                "UPDATE {name} SET {quoted} = {} WHERE {quoted} IS NULL;\n",
                default.definition
            ));
        }
        sql.push_str(&format!("ALTER TABLE {name} ALTER COLUMN {quoted} SET NOT NULL;"));
        Some(sql)
    }

    fn identity_change(&self, table: &QualifiedName, column: &ColumnSpec) -> Option<String> {
        let name = D.qualified(table);
        let quoted = D.quote(&column.name);
        Some(match column.identity {
            Some(identity) => format!(
                "ALTER TABLE {name} ALTER COLUMN {quoted} SET NOT NULL;\nALTER TABLE {name} ALTER COLUMN {quoted} ADD {};",
                D.identity(identity.seed, identity.increment)
            ),
            None => format!("ALTER TABLE {name} ALTER COLUMN {quoted} DROP IDENTITY IF EXISTS;"),
        })
    }

    fn add_default(&self, table: &QualifiedName, default: &DefaultSpec) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {};",
            D.qualified(table),
            D.quote(&default.column),
            default.definition
        )
    }

    fn add_check(&self, table: &QualifiedName, check: &CheckConstraintSpec) -> String {
        Self::add_constraint(table, Self::check_clause(check), check.is_disabled)
    }

    fn toggle_check(&self, table: &QualifiedName, check: &CheckConstraintSpec) -> String {
        Self::toggle_constraint(table, &check.name, Self::check_clause(check), check.is_disabled)
    }

    fn create_index(&self, table: &QualifiedName, index: &IndexSpec) -> String {
        if index.is_constraint() {
            return format!(
                "ALTER TABLE {} ADD {};",
                D.qualified(table),
                self.constraint_clause(index)
            );
        }
        let keys = index
            .key_columns()
            .map(|c| {
                if c.descending {
                    format!("{} DESC", D.quote(&c.column))
                } else {
                    D.quote(&c.column)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "CREATE {}INDEX {} ON {} ({keys})",
            if index.is_unique { "UNIQUE " } else { "" },
            D.quote(&index.name),
            D.qualified(table)
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
        Self::add_constraint(table, Self::fk_clause(fk), fk.is_disabled)
    }

    fn toggle_foreign_key(&self, table: &QualifiedName, fk: &ForeignKeySpec) -> String {
        Self::toggle_constraint(table, &fk.name, Self::fk_clause(fk), fk.is_disabled)
    }

    fn create_coded(&self, entity: &CodedEntity) -> String {
        match entity.kind {
            CodedKind::View => format!(
                "CREATE VIEW {} AS\n{}",
                D.qualified(&entity.name),
                Self::terminated(&entity.definition)
            ),
            _ => Self::terminated(&entity.definition),
        }
    }

    fn toggle_trigger(&self, entity: &CodedEntity) -> Option<String> {
        let table = entity.table.as_ref()?;
        if entity.kind != CodedKind::Trigger {
            return None;
        }
        Some(format!(
            "ALTER TABLE {} {} TRIGGER {};",
            D.qualified(table),
            if entity.is_disabled { "DISABLE" } else { "ENABLE" },
            D.quote(&entity.name.name)
        ))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn accounts() -> TableEntity {
        TableEntity::new(QualifiedName::new("app", "accounts"))
            .with_column(ColumnSpec::new("id", "int8").identity(1, 1))
            .with_column(ColumnSpec::new("email", "varchar").with_length(200).not_null())
            .with_column(ColumnSpec::new("tags", "_text"))
            .with_column(ColumnSpec::new("balance", "numeric").with_precision(12, 2).not_null())
            .with_default(DefaultSpec::new("balance", "0"))
            .with_check(CheckConstraintSpec::new("ck_balance", "(balance >= (0)::numeric)"))
            .with_check(CheckConstraintSpec::new("ck_email", "(email <> ''::text)").disabled())
            .with_index(IndexSpec::primary_key("accounts_pkey", &["id"]))
    }

    #[test]
    fn test_create_table() {
        let sql = PostgresDdl.create_table(&accounts());
        assert_eq!(
            sql,
            "CREATE TABLE \"app\".\"accounts\" (\n    \
             \"id\" int8 GENERATED BY DEFAULT AS IDENTITY (START WITH 1 INCREMENT BY 1) NOT NULL,\n    \
             \"email\" varchar(200) NOT NULL,\n    \
             \"tags\" text[],\n    \
             \"balance\" numeric(12, 2) DEFAULT 0 NOT NULL,\n    \
             CONSTRAINT \"ck_balance\" CHECK (balance >= (0)::numeric),\n    \
             CONSTRAINT \"accounts_pkey\" PRIMARY KEY (\"id\")\n);\n\
             ALTER TABLE \"app\".\"accounts\" ADD CONSTRAINT \"ck_email\" CHECK (email <> ''::text) NOT VALID;"
        );
    }

    #[test]
    fn test_alter_column_uses_cast() {
        let table = accounts();
        let sql = PostgresDdl.alter_column(&table.name, table.column("email").unwrap());
        assert_eq!(
            sql,
            "ALTER TABLE \"app\".\"accounts\" ALTER COLUMN \"email\" TYPE varchar(200) USING \"email\"::varchar(200);"
        );
    }

    #[test]
    fn test_identity_change() {
        let table = accounts();
        let add = PostgresDdl.identity_change(&table.name, table.column("id").unwrap()).unwrap();
        assert!(add.contains("SET NOT NULL;\nALTER TABLE"));
        assert!(add.ends_with("ADD GENERATED BY DEFAULT AS IDENTITY (START WITH 1 INCREMENT BY 1);"));
        let drop = PostgresDdl.identity_change(&table.name, table.column("email").unwrap()).unwrap();
        assert!(drop.ends_with("DROP IDENTITY IF EXISTS;"));
    }

    #[test]
    fn test_toggle_foreign_key() {
        let fk = ForeignKeySpec::new("fk_a", QualifiedName::new("app", "accounts"), &[("account_id", "id")]);
        let t = QualifiedName::new("app", "ledger");
        assert_eq!(
            PostgresDdl.toggle_foreign_key(&t, &fk),
            "ALTER TABLE \"app\".\"ledger\" VALIDATE CONSTRAINT \"fk_a\";"
        );
        let disabled = PostgresDdl.toggle_foreign_key(&t, &fk.disabled());
        assert!(disabled.starts_with("ALTER TABLE \"app\".\"ledger\" DROP CONSTRAINT \"fk_a\";\n"));
        assert!(disabled.ends_with("ON DELETE NO ACTION ON UPDATE NO ACTION NOT VALID;"));
    }

    #[test]
    fn test_view_definition_is_wrapped() {
        let view = CodedEntity::view(QualifiedName::new("app", "rich"), " SELECT id\n   FROM app.accounts;");
        assert_eq!(
            PostgresDdl.create_coded(&view),
            "CREATE VIEW \"app\".\"rich\" AS\nSELECT id\n   FROM app.accounts;"
        );
    }

    #[test]
    fn test_descending_index() {
        let index = IndexSpec::new("ix_email", &["email"]).descending("email");
        assert_eq!(
            PostgresDdl.create_index(&QualifiedName::new("app", "accounts"), &index),
            "CREATE INDEX \"ix_email\" ON \"app\".\"accounts\" (\"email\" DESC);"
        );
    }
}
