//! The reconciliation protocol shared by every structural kind.
//!
//! A kind is a [`KindDescriptor`]: natural key, compared fields with their
//! on-difference action, extras and removal scope. From the descriptor alone
//! this module renders the staging tables, the population of desired rows,
//! the load of live rows and the run-time classification into
//! Unchanged / ToAdd / ToDrop / ToAlter. Kind modules contribute the desired
//! rows with their precomputed payloads and the phase loops.
//!
//! Classification never happens in Rust: the generator only knows what to
//! compare, the script decides what differs when it runs.

pub mod check;
pub mod coded;
pub mod column;
pub mod default;
pub mod foreign_key;
pub mod index;
pub mod links;
pub mod schema;
pub mod table;

use tracing::debug;

use crate::catalog::CatalogQuery;
use crate::context::GenContext;
use crate::dialect::{Compare, Dialect};
use crate::kind::EntityKind;
use crate::runtime::{RowSelect, RowVar, Runtime};

/// Run-time classification of a staged row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Live matches desired.
    Unchanged,
    /// Desired only.
    ToAdd,
    /// Live only.
    ToDrop,
    /// Both, with differences.
    ToAlter,
}

impl Status {
    /// Value stored in the `status` column.
    pub fn code(self) -> i32 {
        match self {
            Self::Unchanged => 0,
            Self::ToAdd => 1,
            Self::ToDrop => 2,
            Self::ToAlter => 3,
        }
    }
}

/// `alias.status` in a set of statuses.
pub fn status_in(alias: &str, statuses: &[Status]) -> String {
    match statuses {
        [one] => format!("{alias}.status = {}", one.code()),
        many => format!(
            "{alias}.status IN ({})",
            many.iter()
                .map(|s| s.code().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Storage type of a staged field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Short text, described in diffs.
    Text,
    /// Definitions; only reported as changed.
    LongText,
    /// Integer.
    Int,
    /// Boolean.
    Bool,
}

/// What a difference in a field leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDiff {
    /// In-place alter payload.
    Alter,
    /// Drop and re-create.
    Rebuild,
    /// Enable/disable payload.
    Toggle,
    /// Identity payload.
    Identity,
    /// Relax or tighten payloads.
    Nullability,
}

/// A compared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Column name in the staging and live tables.
    pub name: &'static str,
    /// Storage type.
    pub ty: FieldType,
    /// Action on difference.
    pub on_diff: OnDiff,
    /// Desired NULL means "not managed"; only non-NULL desired values compare.
    pub optional: bool,
}

impl Field {
    /// A mandatory field.
    pub const fn new(name: &'static str, ty: FieldType, on_diff: OnDiff) -> Self {
        Self {
            name,
            ty,
            on_diff,
            optional: false,
        }
    }

    /// Only compare when the desired value is set.
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Name of the diff flag column.
    pub fn flag(&self) -> String {
        format!("d_{}", self.name)
    }

    fn compare(&self) -> Compare {
        match self.ty {
            FieldType::Text | FieldType::LongText => Compare::Text,
            FieldType::Int | FieldType::Bool => Compare::Plain,
        }
    }
}

/// A staged-only column the kind needs at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extra {
    /// Column name.
    pub name: &'static str,
    /// Storage type.
    pub ty: FieldType,
}

/// Which live rows may be classified ToDrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Only when the schema list is explicit.
    ListedSchemas,
    /// Any live row in a managed schema (the explicit table list when given).
    ManagedSchemas,
    /// Live rows of scripted tables that are not themselves dropped.
    ManagedTables,
    /// Live rows of any scripted table, dropped ones included.
    ScriptedTables,
}

/// Bubble-up target of a member kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent {
    /// Parent kind.
    pub kind: EntityKind,
    /// Child columns that equal the parent's key.
    pub keys: &'static [&'static str],
}

/// Everything the generic protocol needs to know about a kind.
#[derive(Debug, Clone, Copy)]
pub struct KindDescriptor {
    /// The kind.
    pub kind: EntityKind,
    /// Natural key.
    pub keys: &'static [&'static str],
    /// Key columns joined for display.
    pub display: &'static [&'static str],
    /// Compared fields.
    pub fields: &'static [Field],
    /// Staged-only columns.
    pub extras: &'static [Extra],
    /// Member-of relation, if any.
    pub parent: Option<Parent>,
    /// Removal scope.
    pub removal: Removal,
    /// Whether rows carry DDL payloads.
    pub emits_ddl: bool,
}

/// Payload columns of every staging table.
pub const PAYLOADS: [&str; 8] = [
    "create_sql",
    "drop_sql",
    "alter_sql",
    "relax_sql",
    "tighten_sql",
    "toggle_sql",
    "identity_sql",
    "precheck_sql",
];

impl KindDescriptor {
    /// Staging table.
    pub fn stage(&self, d: Dialect) -> String {
        d.temp(self.kind.stage())
    }

    /// Live table.
    pub fn live(&self, d: Dialect) -> String {
        d.temp(&self.live_stage())
    }

    fn live_stage(&self) -> String {
        format!("{}_live", self.kind.stage())
    }

    /// Look up a compared field.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Columns the live catalog query must project, in order.
    pub fn live_columns(&self) -> Vec<&'static str> {
        self.keys
            .iter()
            .copied()
            .chain(self.fields.iter().map(|f| f.name))
            .chain(["sort_order", "drop_sql"])
            .collect()
    }

    /// `a.k = b.k AND ...` over the natural key.
    pub fn key_match(&self, a: &str, b: &str) -> String {
        self.keys
            .iter()
            .map(|k| format!("{a}.{k} = {b}.{k}"))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Display expression of a row.
    pub fn display_expr(&self, d: Dialect, alias: &str) -> String {
        let parts: Vec<String> = self
            .display
            .iter()
            .map(|k| format!("{alias}.{k}"))
            .collect();
        let sep = d.string(".");
        parts.join(&format!("{}{sep}{}", d.concat_op, d.concat_op))
    }

    /// Fields with a given action.
    pub fn fields_with(&self, on_diff: OnDiff) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(move |f| f.on_diff == on_diff)
    }

    /// Condition: any diff flag of the given action is set.
    pub fn any_flag(&self, d: Dialect, alias: &str, on_diff: OnDiff) -> Option<String> {
        let flags: Vec<String> = self
            .fields_with(on_diff)
            .map(|f| d.is_set(&format!("{alias}.{}", f.flag())))
            .collect();
        if flags.is_empty() {
            None
        } else {
            Some(format!("({})", flags.join(" OR ")))
        }
    }

    fn column_type(&self, d: Dialect, ty: FieldType) -> String {
        match ty {
            FieldType::Text | FieldType::LongText => d.text_column(),
            FieldType::Int => d.int_type.to_string(),
            FieldType::Bool => d.bool_type.to_string(),
        }
    }

    /// Column definitions of the staging table.
    pub fn stage_columns(&self, d: Dialect) -> Vec<String> {
        let text = d.text_column();
        let flag = format!("{} NOT NULL DEFAULT {}", d.bool_type, d.false_literal);
        let mut columns: Vec<String> = self
            .keys
            .iter()
            .map(|k| format!("{k} {text} NOT NULL"))
            .collect();
        columns.extend(
            self.fields
                .iter()
                .map(|f| format!("{} {} NULL", f.name, self.column_type(d, f.ty))),
        );
        columns.extend(
            self.extras
                .iter()
                .map(|e| format!("{} {} NULL", e.name, self.column_type(d, e.ty))),
        );
        columns.extend(self.fields.iter().map(|f| format!("{} {flag}", f.flag())));
        columns.push(format!("status {} NOT NULL DEFAULT 0", d.int_type));
        columns.push(format!("rebuild {flag}"));
        columns.push(format!("blocked {flag}"));
        columns.push(format!("diff_desc {text} NULL"));
        columns.push(format!("display_name {text} NULL"));
        columns.push(format!("sort_order {} NOT NULL DEFAULT 0", d.int_type));
        columns.extend(PAYLOADS.iter().map(|p| format!("{p} {text} NULL")));
        columns
    }

    /// Column definitions of the live table.
    pub fn live_table_columns(&self, d: Dialect) -> Vec<String> {
        let text = d.text_column();
        let mut columns: Vec<String> = self
            .keys
            .iter()
            .map(|k| format!("{k} {text} NOT NULL"))
            .collect();
        columns.extend(
            self.fields
                .iter()
                .map(|f| format!("{} {} NULL", f.name, self.column_type(d, f.ty))),
        );
        columns.push(format!("sort_order {} NULL", d.int_type));
        columns.push(format!("drop_sql {text} NULL"));
        columns
    }
}

/// A staged cell value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// Text or long text.
    Text(Option<String>),
    /// Integer.
    Int(Option<i64>),
    /// Boolean.
    Bool(Option<bool>),
}

impl Cell {
    /// Literal for a `VALUES` list.
    pub fn literal(&self, d: Dialect) -> String {
        match self {
            Self::Text(v) => d.opt_string(v.as_deref()),
            Self::Int(Some(v)) => v.to_string(),
            Self::Bool(Some(v)) => d.bool_literal(*v).to_string(),
            Self::Int(None) | Self::Bool(None) => "NULL".to_string(),
        }
    }

    /// Text cell.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(Some(value.into()))
    }
}

impl From<Option<String>> for Cell {
    fn from(v: Option<String>) -> Self {
        Self::Text(v)
    }
}

impl From<bool> for Cell {
    fn from(v: bool) -> Self {
        Self::Bool(Some(v))
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Self::Int(Some(v))
    }
}

impl From<Option<i64>> for Cell {
    fn from(v: Option<i64>) -> Self {
        Self::Int(v)
    }
}

/// Precomputed payloads of a desired row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payloads {
    /// Create / add.
    pub create: Option<String>,
    /// Drop; normally adopted from the live row.
    pub drop: Option<String>,
    /// In-place alter.
    pub alter: Option<String>,
    /// Allow NULL.
    pub relax: Option<String>,
    /// Disallow NULL.
    pub tighten: Option<String>,
    /// Enabled-state change.
    pub toggle: Option<String>,
    /// Identity change.
    pub identity: Option<String>,
    /// Conflict count query.
    pub precheck: Option<String>,
}

impl Payloads {
    fn cells(&self) -> [&Option<String>; 8] {
        [
            &self.create,
            &self.drop,
            &self.alter,
            &self.relax,
            &self.tighten,
            &self.toggle,
            &self.identity,
            &self.precheck,
        ]
    }
}

/// One desired row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRow {
    /// Key values, in descriptor order.
    pub keys: Vec<String>,
    /// Field values, in descriptor order.
    pub fields: Vec<Cell>,
    /// Extra values, in descriptor order.
    pub extras: Vec<Cell>,
    /// Display name.
    pub display: String,
    /// Emission order within the kind.
    pub sort_order: i64,
    /// Payloads.
    pub payloads: Payloads,
}

impl StagedRow {
    /// Start a row from its key.
    pub fn new<S: Into<String>>(keys: impl IntoIterator<Item = S>, display: impl Into<String>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            fields: Vec::new(),
            extras: Vec::new(),
            display: display.into(),
            sort_order: 0,
            payloads: Payloads::default(),
        }
    }

    /// Append a field value.
    pub fn field(mut self, cell: impl Into<Cell>) -> Self {
        self.fields.push(cell.into());
        self
    }

    /// Append an extra value.
    pub fn extra(mut self, cell: impl Into<Cell>) -> Self {
        self.extras.push(cell.into());
        self
    }

    /// Set the sort order.
    pub fn sort_order(mut self, order: i64) -> Self {
        self.sort_order = order;
        self
    }

    /// Set the payloads.
    pub fn payloads(mut self, payloads: Payloads) -> Self {
        self.payloads = payloads;
        self
    }

    fn values(&self, d: Dialect) -> String {
        let cells = self
            .keys
            .iter()
            .map(|k| d.string(k))
            .chain(self.fields.iter().map(|c| c.literal(d)))
            .chain(self.extras.iter().map(|c| c.literal(d)))
            .chain([d.string(&self.display), self.sort_order.to_string()])
            .chain(self.payloads.cells().into_iter().map(|p| d.opt_string(p.as_deref())))
            .collect::<Vec<_>>();
        format!("({})", cells.join(", "))
    }
}

/// Drop and create the staging and live tables.
pub fn stage(d: Dialect, desc: &KindDescriptor) -> Vec<String> {
    let stage = desc.kind.stage();
    let live = desc.live_stage();
    vec![
        d.drop_temp(stage),
        d.create_temp(stage, &desc.stage_columns(d)),
        d.drop_temp(&live),
        d.create_temp(&live, &desc.live_table_columns(d)),
    ]
}

/// Insert desired rows in batches.
pub fn populate(d: Dialect, desc: &KindDescriptor, rows: &[StagedRow], batch: usize) -> Vec<String> {
    let columns: Vec<&str> = desc
        .keys
        .iter()
        .copied()
        .chain(desc.fields.iter().map(|f| f.name))
        .chain(desc.extras.iter().map(|e| e.name))
        .chain(["display_name", "sort_order"])
        .chain(PAYLOADS)
        .collect();
    let table = desc.stage(d);
    rows.chunks(batch.max(1))
        .map(|chunk| {
            let values: Vec<String> = chunk.iter().map(|r| r.values(d)).collect();
            format!(
                "INSERT INTO {table} ({})\nVALUES\n    {};",
                columns.join(", "),
                values.join(",\n    ")
            )
        })
        .collect()
}

/// Fill the live table from the catalog.
pub fn load_live(d: Dialect, desc: &KindDescriptor, query: &CatalogQuery) -> String {
    format!(
        "INSERT INTO {} ({})\n{};",
        desc.live(d),
        query.columns.join(", "),
        query.sql
    )
}

/// Classify additions, removals and alterations, then flag rebuilds.
///
/// `removal` restricts which live-only rows become ToDrop; `None` disables
/// removal for the kind.
pub fn classify(d: Dialect, desc: &KindDescriptor, removal: Option<&str>) -> Vec<String> {
    let stage = desc.stage(d);
    let live = desc.live(d);
    let on = desc.key_match("s", "l");
    let mut out = Vec::new();

    out.push(d.update_where(
        &stage,
        "s",
        &format!("status = {}", Status::ToAdd.code()),
        &format!("NOT EXISTS (SELECT 1 FROM {live} l WHERE {on})"),
    ));

    if let Some(filter) = removal {
        let copied: Vec<&str> = desc
            .keys
            .iter()
            .copied()
            .chain(desc.fields.iter().map(|f| f.name))
            .collect();
        let selected: Vec<String> = copied.iter().map(|c| format!("l.{c}")).collect();
        out.push(format!(
            "INSERT INTO {stage} ({}, display_name, sort_order, drop_sql, status)\nSELECT {}, {}, {}, l.drop_sql, {}\nFROM {live} l\nWHERE NOT EXISTS (SELECT 1 FROM {stage} s WHERE {on})\n  AND ({filter});",
            copied.join(", "),
            selected.join(", "),
            desc.display_expr(d, "l"),
            d.null_or("l.sort_order", "0"),
            Status::ToDrop.code()
        ));
    }

    out.push(d.update_join(
        &stage,
        "s",
        "drop_sql = l.drop_sql",
        &live,
        "l",
        &on,
        &status_in("s", &[Status::Unchanged]),
    ));

    for field in desc.fields {
        let s = format!("s.{}", field.name);
        let l = format!("l.{}", field.name);
        let mut filter = format!(
            "{} AND {}",
            status_in("s", &[Status::Unchanged, Status::ToAlter]),
            d.distinct(&s, &l, field.compare())
        );
        if field.optional {
            filter.push_str(&format!(" AND {s} IS NOT NULL"));
        }
        let set = format!(
            "status = {}, {} = {}, diff_desc = {}",
            Status::ToAlter.code(),
            field.flag(),
            d.true_literal,
            append_note(d, &describe(d, field))
        );
        out.push(d.update_join(&stage, "s", &set, &live, "l", &on, &filter));
    }

    if let Some(rebuild) = desc.any_flag(d, "s", OnDiff::Rebuild) {
        out.push(d.update_where(
            &stage,
            "s",
            &format!("rebuild = {}", d.true_literal),
            &format!("{} AND {rebuild}", status_in("s", &[Status::ToAlter])),
        ));
    }

    debug!(
        kind = desc.kind.stage(),
        fields = desc.fields.len(),
        removal = removal.is_some(),
        "Rendered classification"
    );
    out
}

/// Text describing a field difference, as an expression over `s` and `l`.
fn describe(d: Dialect, field: &Field) -> String {
    match field.ty {
        FieldType::LongText => d.string(&format!("{} changed", field.name)),
        _ => d.concat(&[
            d.string(&format!("{}: ", field.name)),
            d.null_or(&d.to_text(&format!("l.{}", field.name)), &d.string("NULL")),
            d.string(" -> "),
            d.null_or(&d.to_text(&format!("s.{}", field.name)), &d.string("NULL")),
        ]),
    }
}

/// `diff_desc` with a note appended.
pub fn append_note(d: Dialect, note: &str) -> String {
    d.concat(&[
        d.null_or(&d.concat(&["s.diff_desc", &d.string("; ")]), &d.string("")),
        note.to_string(),
    ])
}

/// Narrate per-kind counts and the differences found.
pub fn summary(rt: &Runtime, desc: &KindDescriptor) -> Vec<String> {
    let d = rt.dialect();
    let count = |cond: String| {
        d.to_text(&d.null_or(&format!("SUM(CASE WHEN {cond} THEN 1 ELSE 0 END)"), "0"))
    };
    let parts = [
        (count("status = 1".to_string()), " to add, "),
        (count("status = 2".to_string()), " to drop, "),
        (count("status = 3".to_string()), " to alter ("),
        (count(d.is_set("rebuild")), " rebuilt, "),
        (count(d.is_set("blocked")), " blocked)"),
    ];
    let mut pieces = vec![d.string(&format!("{}: ", desc.kind.stage()))];
    for (expr, label) in parts {
        pieces.push(expr);
        pieces.push(d.string(label));
    }
    let stage = desc.stage(d);
    vec![
        rt.narrate_from("summary", &d.concat(&pieces), &format!("FROM {stage}")),
        rt.narrate_from(
            "diff",
            &d.concat(&[
                "display_name".to_string(),
                d.string(": "),
                "diff_desc".to_string(),
            ]),
            &format!("FROM {stage}\nWHERE status = {} AND diff_desc IS NOT NULL", Status::ToAlter.code()),
        ),
    ]
}

/// A loop executing one payload column over selected staged rows.
#[derive(Debug, Clone)]
pub struct Emit<'a> {
    desc: &'a KindDescriptor,
    verb: &'a str,
    payload: &'static str,
    then: Option<&'static str>,
    check: Option<&'static str>,
    filter: String,
    order: String,
}

impl<'a> Emit<'a> {
    /// Execute `payload` for rows matching a filter over alias `s`.
    pub fn new(desc: &'a KindDescriptor, verb: &'a str, payload: &'static str) -> Self {
        Self {
            desc,
            verb,
            payload,
            then: None,
            check: None,
            filter: "1 = 1".to_string(),
            order: "s.sort_order, s.display_name".to_string(),
        }
    }

    /// Also execute a second payload per row.
    pub fn then(mut self, payload: &'static str) -> Self {
        self.then = Some(payload);
        self
    }

    /// Run a precheck before executing.
    pub fn check(mut self, payload: &'static str) -> Self {
        self.check = Some(payload);
        self
    }

    /// Row filter.
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Row order.
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = order.into();
        self
    }

    /// Render the loop.
    pub fn render(&self, rt: &Runtime) -> String {
        let d = rt.dialect();
        let mut filter = format!("({}) AND s.{} IS NOT NULL", self.filter, self.payload);
        if let Some(then) = self.then {
            filter.push_str(&format!(" AND s.{then} IS NOT NULL"));
        }
        let mut select = RowSelect::from(format!("{} s", self.desc.stage(d)))
            .column(RowVar::Name, "s.display_name")
            .column(RowVar::Sql, format!("s.{}", self.payload))
            .filter(filter)
            .order(self.order.clone());
        if let Some(then) = self.then {
            select = select.column(RowVar::Sql2, format!("s.{then}"));
        }
        if let Some(check) = self.check {
            select = select.column(RowVar::Check, format!("s.{check}"));
        }

        let name = RowVar::Name.expr(d);
        let sql = RowVar::Sql.expr(d);
        let mut body = vec![rt.narrate(
            "action",
            &d.concat(&[
                d.string(&format!("{} {} ", self.verb, self.desc.kind.label())),
                name.clone(),
            ]),
        )];
        match self.check {
            Some(_) => body.extend(rt.exec_checked(&sql, &RowVar::Check.expr(d), &name)),
            None => body.extend(rt.exec(&sql)),
        }
        if self.then.is_some() {
            body.extend(rt.exec(&RowVar::Sql2.expr(d)));
        }
        rt.for_each(&select, body)
    }
}

/// Live-only rows of a kind that may be dropped, as a filter over alias `l`.
pub fn removal_filter(ctx: &GenContext<'_>, desc: &KindDescriptor) -> Option<String> {
    let d = ctx.dialect;
    match desc.removal {
        Removal::ListedSchemas => ctx.drops_schemas().then(|| "1 = 1".to_string()),
        Removal::ManagedSchemas if ctx.has_table_list() => match desc.kind {
            EntityKind::Table => {
                let listed: Vec<String> = ctx
                    .options
                    .scope
                    .tables
                    .iter()
                    .map(|t| {
                        format!(
                            "(l.schema_name = {} AND l.table_name = {})",
                            d.string(&t.schema),
                            d.string(&t.name)
                        )
                    })
                    .collect();
                Some(listed.join(" OR "))
            }
            _ => None,
        },
        Removal::ManagedSchemas => Some("1 = 1".to_string()),
        Removal::ManagedTables => Some(format!(
            "EXISTS (SELECT 1 FROM {} t WHERE t.schema_name = l.schema_name AND t.table_name = l.table_name AND t.status <> {})",
            table::DESCRIPTOR.stage(d),
            Status::ToDrop.code()
        )),
        Removal::ScriptedTables => Some(format!(
            "EXISTS (SELECT 1 FROM {} t WHERE t.schema_name = l.schema_name AND t.table_name = l.table_name)",
            table::DESCRIPTOR.stage(d)
        )),
    }
}

/// Condition over alias `alias`: the owning table has one of the statuses.
pub fn table_status(d: Dialect, alias: &str, statuses: &[Status]) -> String {
    format!(
        "EXISTS (SELECT 1 FROM {} t WHERE t.schema_name = {alias}.schema_name AND t.table_name = {alias}.table_name AND {})",
        table::DESCRIPTOR.stage(d),
        status_in("t", statuses)
    )
}

/// Condition over alias `alias`: the owning table is neither created nor
/// dropped by this run.
pub fn table_persists(d: Dialect, alias: &str) -> String {
    format!("NOT {}", table_status(d, alias, &[Status::ToAdd, Status::ToDrop]))
}

/// Condition over `s`: pre-drop candidates.
pub fn dropping(d: Dialect) -> String {
    format!(
        "({} OR {} OR {})",
        status_in("s", &[Status::ToDrop]),
        d.is_set("s.rebuild"),
        d.is_set("s.blocked")
    )
}

/// Condition over `s`: post-add candidates.
pub fn adding(d: Dialect) -> String {
    format!(
        "({} OR {} OR {})",
        status_in("s", &[Status::ToAdd]),
        d.is_set("s.rebuild"),
        d.is_set("s.blocked")
    )
}

/// Enabled-state changes of rows that are neither rebuilt nor blocked.
pub fn toggle_changed(rt: &Runtime, desc: &KindDescriptor) -> String {
    let d = rt.dialect();
    Emit::new(desc, "toggle", "toggle_sql")
        .filter(format!(
            "{} AND {} AND {} AND {}",
            status_in("s", &[Status::ToAlter]),
            d.is_set("s.d_is_disabled"),
            d.is_clear("s.rebuild"),
            d.is_clear("s.blocked")
        ))
        .render(rt)
}

/// Every descriptor in staging order.
pub fn descriptor(kind: EntityKind) -> &'static KindDescriptor {
    match kind {
        EntityKind::Schema => &schema::DESCRIPTOR,
        EntityKind::Table => &table::DESCRIPTOR,
        EntityKind::Column => &column::DESCRIPTOR,
        EntityKind::Default => &default::DESCRIPTOR,
        EntityKind::Check => &check::DESCRIPTOR,
        EntityKind::Index => &index::DESCRIPTOR,
        EntityKind::IndexColumn => &index::MEMBER_DESCRIPTOR,
        EntityKind::ForeignKey => &foreign_key::DESCRIPTOR,
        EntityKind::FkColumn => &foreign_key::MEMBER_DESCRIPTOR,
        EntityKind::Coded => &coded::DESCRIPTOR,
    }
}

/// Desired rows of a kind.
pub fn rows(ctx: &GenContext<'_>, kind: EntityKind) -> Vec<StagedRow> {
    match kind {
        EntityKind::Schema => schema::rows(ctx),
        EntityKind::Table => table::rows(ctx),
        EntityKind::Column => column::rows(ctx),
        EntityKind::Default => default::rows(ctx),
        EntityKind::Check => check::rows(ctx),
        EntityKind::Index => index::rows(ctx),
        EntityKind::IndexColumn => index::member_rows(ctx),
        EntityKind::ForeignKey => foreign_key::rows(ctx),
        EntityKind::FkColumn => foreign_key::member_rows(ctx),
        EntityKind::Coded => coded::rows(ctx),
    }
}
