//! Control-flow templates of the emitted script.
//!
//! Everything here renders statements that run inside the generated script:
//! flag guards, narration into the results relation, row loops over staged
//! payloads and the guarded execution of those payloads. Statements are plain
//! `String`s; a body is a `Vec<String>` and nesting is rendered with a
//! quote-aware indent so multi-line literals are never altered.

use std::cell::Cell;

use realign_model::Engine;

use crate::dialect::Dialect;

/// Script-level switches, declared once in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// Narrate actions into the results relation.
    Print,
    /// Record the text of every executed payload.
    PrintExec,
    /// Actually execute payloads.
    ExecCode,
}

impl Flag {
    /// Variable name for a dialect.
    pub fn var(self, dialect: Dialect) -> &'static str {
        match (dialect.engine, self) {
            (Engine::Mssql, Self::Print) => "@print",
            (Engine::Mssql, Self::PrintExec) => "@printExec",
            (Engine::Mssql, Self::ExecCode) => "@execCode",
            (Engine::Postgres, Self::Print) => "v_print",
            (Engine::Postgres, Self::PrintExec) => "v_printexec",
            (Engine::Postgres, Self::ExecCode) => "v_execcode",
        }
    }
}

/// Default values written into the header declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagDefaults {
    /// Narrate actions.
    pub print: bool,
    /// Record executed payload text.
    pub print_exec: bool,
    /// Execute payloads.
    pub exec_code: bool,
}

impl Default for FlagDefaults {
    fn default() -> Self {
        Self {
            print: true,
            print_exec: false,
            exec_code: true,
        }
    }
}

/// Per-row variables filled by [`Runtime::for_each`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowVar {
    /// Display name.
    Name,
    /// Main payload.
    Sql,
    /// Secondary payload.
    Sql2,
    /// Precheck query.
    Check,
    /// Narration text.
    Note,
}

impl RowVar {
    const ALL: [RowVar; 5] = [Self::Name, Self::Sql, Self::Sql2, Self::Check, Self::Note];

    fn column(self) -> &'static str {
        match self {
            Self::Name => "row_name",
            Self::Sql => "row_sql",
            Self::Sql2 => "row_sql2",
            Self::Check => "row_check",
            Self::Note => "row_note",
        }
    }

    /// Expression reading the variable inside a loop body.
    pub fn expr(self, dialect: Dialect) -> String {
        match dialect.engine {
            Engine::Mssql => format!("@{}", self.column()),
            Engine::Postgres => format!("r.{}", self.column()),
        }
    }
}

/// Row source of a loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSelect {
    /// `(variable, expression)` pairs.
    pub columns: Vec<(RowVar, String)>,
    /// `FROM` clause body.
    pub from: String,
    /// `WHERE` condition.
    pub filter: String,
    /// `ORDER BY` list.
    pub order: String,
}

impl RowSelect {
    /// Start a select over a table.
    pub fn from(from: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            from: from.into(),
            filter: "1 = 1".to_string(),
            order: String::new(),
        }
    }

    /// Read a column into a row variable.
    pub fn column(mut self, var: RowVar, expr: impl Into<String>) -> Self {
        self.columns.push((var, expr.into()));
        self
    }

    /// Set the filter.
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the ordering.
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = order.into();
        self
    }

    fn render(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|(var, expr)| format!("{expr} AS {}", var.column()))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {columns}\nFROM {}\nWHERE {}", self.from, self.filter);
        if !self.order.is_empty() {
            sql.push_str("\nORDER BY ");
            sql.push_str(&self.order);
        }
        sql
    }
}

/// Where narration goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    /// The script's results relation.
    Results,
    /// The session table read back after a dynamic batch.
    Messages,
}

/// Renders runtime control flow for one dialect.
#[derive(Debug)]
pub struct Runtime {
    dialect: Dialect,
    sink: Sink,
    cursors: Cell<u32>,
}

const INDENT: &str = "    ";

impl Runtime {
    /// Runtime writing to the results relation.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sink: Sink::Results,
            cursors: Cell::new(0),
        }
    }

    /// Runtime for the body of a dynamic batch.
    pub fn for_batch(&self) -> Self {
        Self {
            dialect: self.dialect,
            sink: match self.dialect.engine {
                Engine::Mssql => Sink::Messages,
                Engine::Postgres => Sink::Results,
            },
            cursors: Cell::new(self.cursors.get()),
        }
    }

    /// Dialect in use.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Flag variable.
    pub fn flag(&self, flag: Flag) -> &'static str {
        flag.var(self.dialect)
    }

    /// Condition: a flag is on.
    pub fn flag_on(&self, flag: Flag) -> String {
        self.dialect.is_set(self.flag(flag))
    }

    /// Conflict counter variable.
    pub fn conflict_var(&self) -> &'static str {
        match self.dialect.engine {
            Engine::Mssql => "@conflict",
            Engine::Postgres => "v_conflict",
        }
    }

    fn sink_table(&self) -> &'static str {
        match (self.dialect.engine, self.sink) {
            (Engine::Mssql, Sink::Results) => "@realign_results",
            (Engine::Mssql, Sink::Messages) => "#realign_messages",
            (Engine::Postgres, _) => "realign_results",
        }
    }

    /// `IF cond` around a body; empty bodies render nothing.
    pub fn if_then(&self, cond: &str, body: Vec<String>) -> Option<String> {
        if body.is_empty() {
            return None;
        }
        let inner = indent(&body.join("\n"), self.dialect);
        Some(match self.dialect.engine {
            Engine::Mssql => format!("IF {cond}\nBEGIN\n{inner}\nEND;"),
            Engine::Postgres => format!("IF {cond} THEN\n{inner}\nEND IF;"),
        })
    }

    /// `IF cond ... ELSE ...`.
    pub fn if_else(&self, cond: &str, then: Vec<String>, otherwise: Vec<String>) -> String {
        let then = indent(&non_empty(then, self.dialect).join("\n"), self.dialect);
        let otherwise = indent(&non_empty(otherwise, self.dialect).join("\n"), self.dialect);
        match self.dialect.engine {
            Engine::Mssql => {
                format!("IF {cond}\nBEGIN\n{then}\nEND\nELSE\nBEGIN\n{otherwise}\nEND;")
            }
            Engine::Postgres => format!("IF {cond} THEN\n{then}\nELSE\n{otherwise}\nEND IF;"),
        }
    }

    /// Unconditional insert into the sink.
    pub fn record(&self, category: &str, message: &str) -> String {
        format!(
            "INSERT INTO {} (category, message) VALUES ({}, {message});",
            self.sink_table(),
            self.dialect.string(category)
        )
    }

    /// Insert into the sink when printing is on.
    pub fn narrate(&self, category: &str, message: &str) -> String {
        self.guarded(Flag::Print, self.record(category, message))
    }

    /// Narrate one message per row of a query tail (`FROM ... WHERE ...`).
    pub fn narrate_from(&self, category: &str, message: &str, tail: &str) -> String {
        let insert = format!(
            "INSERT INTO {} (category, message)\nSELECT {}, {message}\n{tail};",
            self.sink_table(),
            self.dialect.string(category)
        );
        self.guarded(Flag::Print, insert)
    }

    /// One statement behind a flag.
    pub fn guarded(&self, flag: Flag, statement: String) -> String {
        match self.dialect.engine {
            Engine::Mssql => format!("IF {} {statement}", self.flag_on(flag)),
            Engine::Postgres => format!("IF {} THEN {statement} END IF;", self.flag_on(flag)),
        }
    }

    /// Record then execute a text expression, under the flags.
    pub fn exec(&self, sql: &str) -> Vec<String> {
        let run = match self.dialect.engine {
            Engine::Mssql => format!("EXEC sp_executesql {sql};"),
            Engine::Postgres => format!("EXECUTE {sql};"),
        };
        vec![
            self.guarded(Flag::PrintExec, self.record("sql", sql)),
            self.guarded(Flag::ExecCode, run),
        ]
    }

    /// Static statements under the flags, recording their text first.
    pub fn exec_static(&self, statements: &[String]) -> Vec<String> {
        let mut out = Vec::new();
        for statement in statements {
            out.push(self.guarded(
                Flag::PrintExec,
                self.record("sql", &self.dialect.string(statement)),
            ));
        }
        out.extend(self.if_then(&self.flag_on(Flag::ExecCode), statements.to_vec()));
        out
    }

    /// Run a precheck, then execute `sql` only when it found no conflicting rows.
    pub fn exec_checked(&self, sql: &str, check: &str, name: &str) -> Vec<String> {
        let conflict = self.conflict_var();
        let probe = match self.dialect.engine {
            Engine::Mssql => format!(
                "EXEC sp_executesql {check}, N'@conflict INT OUTPUT', @conflict = @conflict OUTPUT;"
            ),
            Engine::Postgres => format!("EXECUTE {check} INTO {conflict};"),
        };
        let reset = match self.dialect.engine {
            Engine::Mssql => "SET @conflict = 0;".to_string(),
            Engine::Postgres => "v_conflict := 0;".to_string(),
        };
        let cond = format!("{check} IS NOT NULL AND {}", self.flag_on(Flag::ExecCode));
        let message = self.dialect.concat(&[
            name.to_string(),
            self.dialect.string(": "),
            self.dialect.to_text(conflict),
            self.dialect.string(" conflicting row(s), skipped"),
        ]);
        let mut out = vec![reset];
        out.extend(self.if_then(&cond, vec![probe]));
        out.push(self.if_else(
            &format!("{conflict} > 0"),
            vec![self.record("conflict", &message)],
            self.exec(sql),
        ));
        out
    }

    /// Loop over the rows of a select, binding row variables.
    pub fn for_each(&self, select: &RowSelect, body: Vec<String>) -> String {
        match self.dialect.engine {
            Engine::Mssql => {
                let n = self.cursors.get() + 1;
                self.cursors.set(n);
                let cursor = format!("realign_cur_{n}");
                let vars = select
                    .columns
                    .iter()
                    .map(|(v, _)| v.expr(self.dialect))
                    .collect::<Vec<_>>()
                    .join(", ");
                let fetch = format!("FETCH NEXT FROM {cursor} INTO {vars};");
                let mut inner = body;
                inner.push(fetch.clone());
                format!(
                    "DECLARE {cursor} CURSOR LOCAL FAST_FORWARD FOR\n{};\nOPEN {cursor};\n{fetch}\nWHILE @@FETCH_STATUS = 0\nBEGIN\n{}\nEND;\nCLOSE {cursor};\nDEALLOCATE {cursor};",
                    indent(&select.render(), self.dialect),
                    indent(&inner.join("\n"), self.dialect)
                )
            }
            Engine::Postgres => format!(
                "FOR r IN\n{}\nLOOP\n{}\nEND LOOP;",
                indent(&select.render(), self.dialect),
                indent(&non_empty(body, self.dialect).join("\n"), self.dialect)
            ),
        }
    }

    /// Run a body as a separately compiled batch.
    ///
    /// SQL Server compiles a batch against the columns that exist at compile
    /// time, so statements over user tables whose shape changes earlier in
    /// the script run through `sp_executesql`. PostgreSQL plans lazily and
    /// gets the body inline.
    pub fn batch(&self, body: Vec<String>) -> Vec<String> {
        match self.dialect.engine {
            Engine::Mssql => vec![
                format!("SET @sql = {};", self.dialect.string(&body.join("\n"))),
                "EXEC sp_executesql @sql,\n    N'@print BIT, @printExec BIT, @execCode BIT',\n    @print = @print, @printExec = @printExec, @execCode = @execCode;"
                    .to_string(),
                "INSERT INTO @realign_results (category, message)\nSELECT category, message FROM #realign_messages ORDER BY seq;"
                    .to_string(),
                "DELETE FROM #realign_messages;".to_string(),
            ],
            Engine::Postgres => body,
        }
    }

    /// Declarations and transaction start.
    pub fn prologue(&self, defaults: FlagDefaults) -> Vec<String> {
        let d = self.dialect;
        match d.engine {
            Engine::Mssql => {
                let rows = RowVar::ALL
                    .iter()
                    .map(|v| format!("{} {}", v.expr(d), d.max_text))
                    .collect::<Vec<_>>()
                    .join(", ");
                vec![
                    "SET NOCOUNT ON;".to_string(),
                    "SET XACT_ABORT ON;".to_string(),
                    format!(
                        "DECLARE @print BIT = {}, @printExec BIT = {}, @execCode BIT = {};",
                        d.bool_literal(defaults.print),
                        d.bool_literal(defaults.print_exec),
                        d.bool_literal(defaults.exec_code)
                    ),
                    format!("DECLARE @conflict INT = 0, @sql {};", d.max_text),
                    format!("DECLARE {rows};"),
                    format!("DECLARE @realign_results TABLE ({});", results_columns(d)),
                    d.drop_temp("messages"),
                    format!("CREATE TABLE #realign_messages ({});", results_columns(d)),
                ]
            }
            Engine::Postgres => vec![
                format!(
                    "CREATE TEMP TABLE IF NOT EXISTS realign_results ({});",
                    results_columns(d)
                ),
                "TRUNCATE realign_results;".to_string(),
            ],
        }
    }

    /// Wrap a rendered body into the complete transactional script.
    pub fn wrap(&self, preamble: &[String], body: &str, defaults: FlagDefaults, tag: &str) -> String {
        let d = self.dialect;
        let mut out: Vec<String> = preamble.to_vec();
        out.extend(self.prologue(defaults));
        let select = "SELECT seq, category, message FROM {} ORDER BY seq;";
        match d.engine {
            Engine::Mssql => {
                let results = select.replace("{}", "@realign_results");
                out.push(String::new());
                out.push("BEGIN TRY".to_string());
                out.push(indent("BEGIN TRANSACTION;", d));
                if !body.is_empty() {
                    out.push(indent(body, d));
                }
                out.push(indent("COMMIT TRANSACTION;", d));
                out.push("END TRY".to_string());
                out.push("BEGIN CATCH".to_string());
                out.push(indent(
                    &[
                        "IF XACT_STATE() <> 0 ROLLBACK TRANSACTION;".to_string(),
                        "INSERT INTO @realign_results (category, message) VALUES (N'error', ERROR_MESSAGE());"
                            .to_string(),
                        results.clone(),
                        "THROW;".to_string(),
                    ]
                    .join("\n"),
                    d,
                ));
                out.push("END CATCH;".to_string());
                out.push(String::new());
                out.push(results);
            }
            Engine::Postgres => {
                let flags = format!(
                    "v_print BOOLEAN := {};\nv_printexec BOOLEAN := {};\nv_execcode BOOLEAN := {};\nv_conflict BIGINT := 0;\nv_sql TEXT;\nr RECORD;",
                    d.bool_literal(defaults.print),
                    d.bool_literal(defaults.print_exec),
                    d.bool_literal(defaults.exec_code)
                );
                let inner = if body.is_empty() { "NULL;" } else { body };
                let guarded = format!(
                    "BEGIN\n{}\nEXCEPTION WHEN OTHERS THEN\n{}\nEND;",
                    indent(inner, d),
                    indent(
                        "INSERT INTO realign_results (category, message) VALUES ('error', SQLERRM);\nRAISE WARNING 'realign: %', SQLERRM;",
                        d
                    )
                );
                out.push("BEGIN;".to_string());
                out.push(format!(
                    "DO ${tag}$\nDECLARE\n{}\nBEGIN\n{}\nEND\n${tag}$;",
                    indent(&flags, d),
                    indent(&guarded, d)
                ));
                out.push("COMMIT;".to_string());
                out.push(String::new());
                out.push(select.replace("{}", "realign_results"));
            }
        }
        let mut text = out.join("\n");
        text.push('\n');
        text
    }
}

fn results_columns(d: Dialect) -> String {
    match d.engine {
        Engine::Mssql => format!(
            "seq INT IDENTITY(1, 1) PRIMARY KEY, category NVARCHAR(40) NOT NULL, message {} NULL",
            d.max_text
        ),
        Engine::Postgres => "seq SERIAL PRIMARY KEY, category TEXT NOT NULL, message TEXT".to_string(),
    }
}

fn non_empty(body: Vec<String>, dialect: Dialect) -> Vec<String> {
    if !body.is_empty() {
        return body;
    }
    match dialect.engine {
        Engine::Mssql => vec!["SET @conflict = @conflict;".to_string()],
        Engine::Postgres => vec!["NULL;".to_string()],
    }
}

/// Indent every line that does not start inside a string literal or a
/// quoted identifier.
pub fn indent(text: &str, dialect: Dialect) -> String {
    let mut out = String::with_capacity(text.len() + 64);
    let mut in_string = false;
    let mut in_ident = false;
    let mut at_line_start = true;
    for ch in text.chars() {
        if at_line_start {
            if !in_string && !in_ident && ch != '\n' {
                out.push_str(INDENT);
            }
            at_line_start = false;
        }
        match ch {
            '\'' if !in_ident => in_string = !in_string,
            c if !in_string && !in_ident && c == dialect.quote_open => in_ident = true,
            c if in_ident && c == dialect.quote_close => in_ident = false,
            '\n' => at_line_start = true,
            _ => {}
        }
        out.push(ch);
    }
    out
}
