//! `sys.*` catalog queries.

use super::SchemaFilter;
use crate::kind::EntityKind;

fn qualified(schema: &str, name: &str) -> String {
    format!("QUOTENAME({schema}) + N'.' + QUOTENAME({name})")
}

fn alter_table(then: &str) -> String {
    format!(
        "N'ALTER TABLE ' + {} + N' {then} '",
        qualified("s.name", "t.name")
    )
}

const TABLE_JOIN: &str = "JOIN sys.tables t ON t.object_id = {object}\nJOIN sys.schemas s ON s.schema_id = t.schema_id";

fn table_join(object: &str) -> String {
    TABLE_JOIN.replace("{object}", object)
}

pub(super) fn query(kind: EntityKind, filter: &SchemaFilter) -> String {
    let schemas = filter.on("s.name");
    match kind {
        EntityKind::Schema => format!(
            "SELECT s.name AS schema_name,
    p.name AS owner,
    0 AS sort_order,
    N'DROP SCHEMA ' + QUOTENAME(s.name) + N';' AS drop_sql
FROM sys.schemas s
JOIN sys.database_principals p ON p.principal_id = s.principal_id
WHERE {schemas}"
        ),
        EntityKind::Table => format!(
            "SELECT s.name AS schema_name,
    t.name AS table_name,
    0 AS sort_order,
    N'DROP TABLE ' + {} + N';' AS drop_sql
FROM sys.tables t
JOIN sys.schemas s ON s.schema_id = t.schema_id
WHERE t.is_ms_shipped = 0 AND {schemas}",
            qualified("s.name", "t.name")
        ),
        EntityKind::Column => format!(
            "SELECT s.name AS schema_name,
    t.name AS table_name,
    c.name AS column_name,
    ty.name AS type_name,
    CASE
        WHEN c.max_length = -1 THEN -1
        WHEN ty.name IN (N'nchar', N'nvarchar') THEN c.max_length / 2
        WHEN ty.name IN (N'char', N'varchar', N'binary', N'varbinary') THEN c.max_length
    END AS max_length,
    CASE WHEN ty.name IN (N'decimal', N'numeric') THEN CAST(c.precision AS INT) END AS num_precision,
    CASE WHEN ty.name IN (N'decimal', N'numeric', N'datetime2', N'time', N'datetimeoffset') THEN CAST(c.scale AS INT) END AS num_scale,
    CASE WHEN c.collation_name <> CONVERT(SYSNAME, DATABASEPROPERTYEX(DB_NAME(), 'Collation')) THEN c.collation_name END AS collation_name,
    c.is_nullable AS nullable,
    c.is_identity AS is_identity,
    cc.definition AS computed_definition,
    c.column_id AS sort_order,
    {} + QUOTENAME(c.name) + N';' AS drop_sql
FROM sys.columns c
{}
JOIN sys.types ty ON ty.user_type_id = c.user_type_id
LEFT JOIN sys.computed_columns cc ON cc.object_id = c.object_id AND cc.column_id = c.column_id
WHERE t.is_ms_shipped = 0 AND {schemas}",
            alter_table("DROP COLUMN"),
            table_join("c.object_id")
        ),
        EntityKind::Default => format!(
            "SELECT s.name AS schema_name,
    t.name AS table_name,
    c.name AS column_name,
    dc.definition AS definition,
    0 AS sort_order,
    {} + QUOTENAME(dc.name) + N';' AS drop_sql
FROM sys.default_constraints dc
{}
JOIN sys.columns c ON c.object_id = dc.parent_object_id AND c.column_id = dc.parent_column_id
WHERE t.is_ms_shipped = 0 AND {schemas}",
            alter_table("DROP CONSTRAINT"),
            table_join("dc.parent_object_id")
        ),
        EntityKind::Check => format!(
            "SELECT s.name AS schema_name,
    t.name AS table_name,
    cc.name AS check_name,
    cc.definition AS definition,
    cc.is_disabled AS is_disabled,
    0 AS sort_order,
    {} + QUOTENAME(cc.name) + N';' AS drop_sql
FROM sys.check_constraints cc
{}
WHERE t.is_ms_shipped = 0 AND {schemas}",
            alter_table("DROP CONSTRAINT"),
            table_join("cc.parent_object_id")
        ),
        EntityKind::Index => format!(
            "SELECT s.name AS schema_name,
    t.name AS table_name,
    i.name AS index_name,
    i.is_unique AS is_unique,
    i.is_primary_key AS is_primary_key,
    i.is_unique_constraint AS is_unique_constraint,
    CAST(CASE WHEN i.type = 1 THEN 1 ELSE 0 END AS BIT) AS is_clustered,
    i.filter_definition AS filter_definition,
    CASE WHEN i.is_primary_key = 1 THEN 0 ELSE 1 END AS sort_order,
    CASE
        WHEN i.is_primary_key = 1 OR i.is_unique_constraint = 1
            THEN {} + QUOTENAME(i.name) + N';'
        ELSE N'DROP INDEX ' + QUOTENAME(i.name) + N' ON ' + {} + N';'
    END AS drop_sql
FROM sys.indexes i
{}
WHERE i.type IN (1, 2) AND i.is_hypothetical = 0 AND t.is_ms_shipped = 0 AND {schemas}",
            alter_table("DROP CONSTRAINT"),
            qualified("s.name", "t.name"),
            table_join("i.object_id")
        ),
        EntityKind::IndexColumn => format!(
            "SELECT s.name AS schema_name,
    t.name AS table_name,
    i.name AS index_name,
    c.name AS column_name,
    CAST(CASE WHEN ic.is_included_column = 1 THEN 0 ELSE ic.key_ordinal END AS INT) AS key_ordinal,
    ic.is_descending_key AS is_descending,
    ic.is_included_column AS is_included,
    0 AS sort_order,
    CAST(NULL AS NVARCHAR(MAX)) AS drop_sql
FROM sys.index_columns ic
JOIN sys.indexes i ON i.object_id = ic.object_id AND i.index_id = ic.index_id
JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
{}
WHERE i.type IN (1, 2) AND i.is_hypothetical = 0 AND t.is_ms_shipped = 0
    AND (ic.key_ordinal > 0 OR ic.is_included_column = 1)
    AND {schemas}",
            table_join("ic.object_id")
        ),
        EntityKind::ForeignKey => format!(
            "SELECT s.name AS schema_name,
    t.name AS table_name,
    fk.name AS fk_name,
    rs.name AS ref_schema,
    rt.name AS ref_table,
    fk.delete_referential_action_desc AS on_delete,
    fk.update_referential_action_desc AS on_update,
    fk.is_disabled AS is_disabled,
    0 AS sort_order,
    {} + QUOTENAME(fk.name) + N';' AS drop_sql
FROM sys.foreign_keys fk
{}
JOIN sys.tables rt ON rt.object_id = fk.referenced_object_id
JOIN sys.schemas rs ON rs.schema_id = rt.schema_id
WHERE t.is_ms_shipped = 0 AND {schemas}",
            alter_table("DROP CONSTRAINT"),
            table_join("fk.parent_object_id")
        ),
        EntityKind::FkColumn => format!(
            "SELECT s.name AS schema_name,
    t.name AS table_name,
    fk.name AS fk_name,
    c.name AS column_name,
    rc.name AS referenced_column,
    fkc.constraint_column_id AS ordinal,
    0 AS sort_order,
    CAST(NULL AS NVARCHAR(MAX)) AS drop_sql
FROM sys.foreign_key_columns fkc
JOIN sys.foreign_keys fk ON fk.object_id = fkc.constraint_object_id
JOIN sys.columns c ON c.object_id = fkc.parent_object_id AND c.column_id = fkc.parent_column_id
JOIN sys.columns rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
{}
WHERE t.is_ms_shipped = 0 AND {schemas}",
            table_join("fkc.parent_object_id")
        ),
        EntityKind::Coded => {
            let object_type = "CASE o.type WHEN 'V' THEN N'VIEW' WHEN 'P' THEN N'PROCEDURE' WHEN 'TR' THEN N'TRIGGER' ELSE N'FUNCTION' END";
            format!(
                "SELECT s.name AS schema_name,
    o.name AS object_name,
    N'' AS signature,
    {object_type} AS object_type,
    m.definition AS definition,
    CAST(ISNULL(tr.is_disabled, 0) AS BIT) AS is_disabled,
    CASE o.type WHEN 'TR' THEN 0 WHEN 'V' THEN -1 WHEN 'P' THEN -2 ELSE -3 END AS sort_order,
    N'DROP ' + {object_type} + N' ' + {} + N';' AS drop_sql
FROM sys.objects o
JOIN sys.schemas s ON s.schema_id = o.schema_id
JOIN sys.sql_modules m ON m.object_id = o.object_id
LEFT JOIN sys.triggers tr ON tr.object_id = o.object_id
WHERE o.type IN ('V', 'P', 'FN', 'IF', 'TF', 'TR') AND o.is_ms_shipped = 0 AND {schemas}",
                qualified("s.name", "o.name")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    fn filter() -> SchemaFilter {
        SchemaFilter::new(Dialect::MSSQL, &["dbo".into()])
    }

    #[test]
    fn test_column_drop_statement() {
        let sql = query(EntityKind::Column, &filter());
        assert!(sql.contains(
            "N'ALTER TABLE ' + QUOTENAME(s.name) + N'.' + QUOTENAME(t.name) + N' DROP COLUMN ' + QUOTENAME(c.name)"
        ));
        assert!(sql.contains("s.name IN (N'dbo')"));
    }

    #[test]
    fn test_index_drop_depends_on_constraint() {
        let sql = query(EntityKind::Index, &filter());
        assert!(sql.contains("DROP CONSTRAINT"));
        assert!(sql.contains("N'DROP INDEX ' + QUOTENAME(i.name) + N' ON '"));
    }

    #[test]
    fn test_coded_sort_order_drops_triggers_first() {
        let sql = query(EntityKind::Coded, &filter());
        assert!(sql.contains("WHEN 'TR' THEN 0 WHEN 'V' THEN -1"));
    }
}
