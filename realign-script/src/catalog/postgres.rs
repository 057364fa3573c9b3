//! `pg_catalog` queries.

use super::SchemaFilter;
use crate::kind::EntityKind;

/// Condition: the object is not owned by an extension.
fn not_extension(catalog: &str, oid: &str) -> String {
    format!(
        "NOT EXISTS (SELECT 1 FROM pg_depend dep WHERE dep.classid = '{catalog}'::regclass AND dep.objid = {oid} AND dep.deptype = 'e')"
    )
}

/// Joins and conditions selecting user tables as `c` in schema `n`.
fn user_tables(filter: &SchemaFilter) -> (String, String) {
    (
        "JOIN pg_namespace n ON n.oid = c.relnamespace".to_string(),
        format!(
            "c.relkind IN ('r', 'p') AND NOT c.relispartition AND {} AND {}",
            filter.on("n.nspname"),
            not_extension("pg_class", "c.oid")
        ),
    )
}

fn referential(column: &str) -> String {
    format!(
        "CASE {column} WHEN 'a' THEN 'NO_ACTION' WHEN 'r' THEN 'RESTRICT' WHEN 'c' THEN 'CASCADE' WHEN 'n' THEN 'SET_NULL' WHEN 'd' THEN 'SET_DEFAULT' END"
    )
}

pub(super) fn query(kind: EntityKind, filter: &SchemaFilter) -> String {
    let (join, tables) = user_tables(filter);
    match kind {
        EntityKind::Schema => format!(
            "SELECT n.nspname::text AS schema_name,
    pg_get_userbyid(n.nspowner)::text AS owner,
    0 AS sort_order,
    format('DROP SCHEMA %I;', n.nspname) AS drop_sql
FROM pg_namespace n
WHERE {}",
            filter.on("n.nspname")
        ),
        EntityKind::Table => format!(
            "SELECT n.nspname::text AS schema_name,
    c.relname::text AS table_name,
    0 AS sort_order,
    format('DROP TABLE %I.%I;', n.nspname, c.relname) AS drop_sql
FROM pg_class c
{join}
WHERE {tables}"
        ),
        EntityKind::Column => format!(
            "SELECT n.nspname::text AS schema_name,
    c.relname::text AS table_name,
    a.attname::text AS column_name,
    ty.typname::text AS type_name,
    CASE
        WHEN ty.typname IN ('varchar', 'bpchar') AND a.atttypmod > 0 THEN a.atttypmod - 4
        WHEN ty.typname IN ('bit', 'varbit') AND a.atttypmod > 0 THEN a.atttypmod
    END AS max_length,
    CASE WHEN ty.typname = 'numeric' AND a.atttypmod > 0 THEN ((a.atttypmod - 4) >> 16) & 65535 END AS num_precision,
    CASE
        WHEN ty.typname = 'numeric' AND a.atttypmod > 0 THEN (a.atttypmod - 4) & 65535
        WHEN ty.typname IN ('timestamp', 'timestamptz', 'time', 'timetz') AND a.atttypmod >= 0 THEN a.atttypmod
    END AS num_scale,
    CASE WHEN a.attcollation <> ty.typcollation THEN co.collname::text END AS collation_name,
    NOT a.attnotnull AS nullable,
    a.attidentity <> '' AS is_identity,
    CASE WHEN a.attgenerated = 's' THEN pg_get_expr(ad.adbin, ad.adrelid) END AS computed_definition,
    a.attnum AS sort_order,
    format('ALTER TABLE %I.%I DROP COLUMN %I;', n.nspname, c.relname, a.attname) AS drop_sql
FROM pg_attribute a
JOIN pg_class c ON c.oid = a.attrelid
{join}
JOIN pg_type ty ON ty.oid = a.atttypid
LEFT JOIN pg_collation co ON co.oid = a.attcollation
LEFT JOIN pg_attrdef ad ON ad.adrelid = a.attrelid AND ad.adnum = a.attnum
WHERE a.attnum > 0 AND NOT a.attisdropped AND {tables}"
        ),
        EntityKind::Default => format!(
            "SELECT n.nspname::text AS schema_name,
    c.relname::text AS table_name,
    a.attname::text AS column_name,
    pg_get_expr(ad.adbin, ad.adrelid) AS definition,
    0 AS sort_order,
    format('ALTER TABLE %I.%I ALTER COLUMN %I DROP DEFAULT;', n.nspname, c.relname, a.attname) AS drop_sql
FROM pg_attrdef ad
JOIN pg_attribute a ON a.attrelid = ad.adrelid AND a.attnum = ad.adnum
JOIN pg_class c ON c.oid = ad.adrelid
{join}
WHERE a.attgenerated = '' AND NOT a.attisdropped AND {tables}"
        ),
        EntityKind::Check => format!(
            "SELECT n.nspname::text AS schema_name,
    c.relname::text AS table_name,
    con.conname::text AS check_name,
    pg_get_expr(con.conbin, con.conrelid) AS definition,
    NOT con.convalidated AS is_disabled,
    0 AS sort_order,
    format('ALTER TABLE %I.%I DROP CONSTRAINT %I;', n.nspname, c.relname, con.conname) AS drop_sql
FROM pg_constraint con
JOIN pg_class c ON c.oid = con.conrelid
{join}
WHERE con.contype = 'c' AND {tables}"
        ),
        EntityKind::Index => format!(
            "SELECT n.nspname::text AS schema_name,
    c.relname::text AS table_name,
    ic.relname::text AS index_name,
    x.indisunique AS is_unique,
    x.indisprimary AS is_primary_key,
    COALESCE(con.contype = 'u', FALSE) AS is_unique_constraint,
    FALSE AS is_clustered,
    pg_get_expr(x.indpred, x.indrelid) AS filter_definition,
    CASE WHEN x.indisprimary THEN 0 ELSE 1 END AS sort_order,
    CASE
        WHEN con.oid IS NOT NULL THEN format('ALTER TABLE %I.%I DROP CONSTRAINT %I;', n.nspname, c.relname, con.conname)
        ELSE format('DROP INDEX %I.%I;', n.nspname, ic.relname)
    END AS drop_sql
FROM pg_index x
JOIN pg_class ic ON ic.oid = x.indexrelid
JOIN pg_class c ON c.oid = x.indrelid
{join}
LEFT JOIN pg_constraint con ON con.conindid = x.indexrelid AND con.conrelid = x.indrelid AND con.contype IN ('p', 'u')
WHERE x.indexprs IS NULL
    AND NOT EXISTS (SELECT 1 FROM pg_constraint e WHERE e.conindid = x.indexrelid AND e.contype = 'x')
    AND {tables}"
        ),
        EntityKind::IndexColumn => format!(
            "SELECT n.nspname::text AS schema_name,
    c.relname::text AS table_name,
    ic.relname::text AS index_name,
    a.attname::text AS column_name,
    (CASE WHEN k.ord > x.indnkeyatts THEN 0 ELSE k.ord END)::int AS key_ordinal,
    (k.ord <= x.indnkeyatts AND (x.indoption[k.ord - 1] & 1) = 1) AS is_descending,
    k.ord > x.indnkeyatts AS is_included,
    0 AS sort_order,
    NULL::text AS drop_sql
FROM pg_index x
JOIN pg_class ic ON ic.oid = x.indexrelid
JOIN pg_class c ON c.oid = x.indrelid
{join}
CROSS JOIN LATERAL unnest(x.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
JOIN pg_attribute a ON a.attrelid = x.indrelid AND a.attnum = k.attnum
WHERE x.indexprs IS NULL
    AND NOT EXISTS (SELECT 1 FROM pg_constraint e WHERE e.conindid = x.indexrelid AND e.contype = 'x')
    AND {tables}"
        ),
        EntityKind::ForeignKey => format!(
            "SELECT n.nspname::text AS schema_name,
    c.relname::text AS table_name,
    con.conname::text AS fk_name,
    rn.nspname::text AS ref_schema,
    rc.relname::text AS ref_table,
    {} AS on_delete,
    {} AS on_update,
    NOT con.convalidated AS is_disabled,
    0 AS sort_order,
    format('ALTER TABLE %I.%I DROP CONSTRAINT %I;', n.nspname, c.relname, con.conname) AS drop_sql
FROM pg_constraint con
JOIN pg_class c ON c.oid = con.conrelid
{join}
JOIN pg_class rc ON rc.oid = con.confrelid
JOIN pg_namespace rn ON rn.oid = rc.relnamespace
WHERE con.contype = 'f' AND con.conparentid = 0 AND {tables}",
            referential("con.confdeltype"),
            referential("con.confupdtype")
        ),
        EntityKind::FkColumn => format!(
            "SELECT n.nspname::text AS schema_name,
    c.relname::text AS table_name,
    con.conname::text AS fk_name,
    a.attname::text AS column_name,
    ra.attname::text AS referenced_column,
    k.ord::int AS ordinal,
    0 AS sort_order,
    NULL::text AS drop_sql
FROM pg_constraint con
JOIN pg_class c ON c.oid = con.conrelid
{join}
CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, refnum, ord)
JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
JOIN pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.refnum
WHERE con.contype = 'f' AND con.conparentid = 0 AND {tables}"
        ),
        EntityKind::Coded => {
            let schemas = filter.on("n.nspname");
            let routine = "CASE p.prokind WHEN 'p' THEN 'PROCEDURE' ELSE 'FUNCTION' END";
            format!(
                "SELECT n.nspname::text AS schema_name,
    v.relname::text AS object_name,
    ''::text AS signature,
    'VIEW'::text AS object_type,
    pg_get_viewdef(v.oid) AS definition,
    FALSE AS is_disabled,
    -1 AS sort_order,
    format('DROP VIEW %I.%I;', n.nspname, v.relname) AS drop_sql
FROM pg_class v
JOIN pg_namespace n ON n.oid = v.relnamespace
WHERE v.relkind = 'v' AND {schemas} AND {}
UNION ALL
SELECT n.nspname::text,
    p.proname::text,
    pg_get_function_identity_arguments(p.oid),
    {routine},
    pg_get_functiondef(p.oid),
    FALSE,
    CASE p.prokind WHEN 'p' THEN -2 ELSE -3 END,
    format('DROP %s %I.%I(%s);', {routine}, n.nspname, p.proname, pg_get_function_identity_arguments(p.oid))
FROM pg_proc p
JOIN pg_namespace n ON n.oid = p.pronamespace
WHERE p.prokind IN ('f', 'p') AND {schemas} AND {}
UNION ALL
SELECT n.nspname::text,
    tg.tgname::text,
    c.relname::text,
    'TRIGGER',
    pg_get_triggerdef(tg.oid),
    tg.tgenabled = 'D',
    0,
    format('DROP TRIGGER %I ON %I.%I;', tg.tgname, n.nspname, c.relname)
FROM pg_trigger tg
JOIN pg_class c ON c.oid = tg.tgrelid
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE NOT tg.tgisinternal AND {schemas} AND {}",
                not_extension("pg_class", "v.oid"),
                not_extension("pg_proc", "p.oid"),
                not_extension("pg_class", "c.oid")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    fn filter() -> SchemaFilter {
        SchemaFilter::new(Dialect::POSTGRES, &["public".into()])
    }

    #[test]
    fn test_routine_drop_carries_signature() {
        let sql = query(EntityKind::Coded, &filter());
        assert!(sql.contains("pg_get_function_identity_arguments(p.oid))"));
        assert!(sql.contains("format('DROP TRIGGER %I ON %I.%I;'"));
    }

    #[test]
    fn test_index_members_split_key_and_included() {
        let sql = query(EntityKind::IndexColumn, &filter());
        assert!(sql.contains("WITH ORDINALITY AS k(attnum, ord)"));
        assert!(sql.contains("k.ord > x.indnkeyatts AS is_included"));
    }

    #[test]
    fn test_foreign_key_actions_use_codes() {
        let sql = query(EntityKind::ForeignKey, &filter());
        assert!(sql.contains("WHEN 'n' THEN 'SET_NULL'"));
        assert!(sql.contains("con.conparentid = 0"));
    }
}
