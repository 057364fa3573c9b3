//! CSV files for bulk-loaded data staging.
//!
//! NULL is written as an empty unquoted field. Tables whose rows cannot
//! survive that encoding (binary values, empty strings) are staged inline.

use std::path::{Path, PathBuf};

use realign_model::{Engine, TableData, Value};

use super::TablePlan;
use crate::dialect::Dialect;
use crate::error::{ScriptError, ScriptResult};
use crate::literal::csv_field;
use crate::report::BulkFile;

/// Whether every captured row of a table can be encoded.
pub fn eligible(data: &TableData) -> bool {
    !data
        .rows
        .iter()
        .flatten()
        .any(|v| matches!(v, Value::Bytes(_)) || matches!(v, Value::Text(s) if s.is_empty()))
}

/// File a table's rows are written to.
pub fn file_path(directory: &Path, plan: &TablePlan<'_>) -> PathBuf {
    let name = &plan.table.name;
    directory.join(format!("{}.{}.csv", name.schema, name.name))
}

/// Encode the selected columns of every row.
///
/// SQL Server's `BULK INSERT` cannot name target columns, so its files carry
/// the trailing status column of the staging table as well.
pub fn encode(d: Dialect, plan: &TablePlan<'_>, path: PathBuf) -> ScriptResult<BulkFile> {
    let shown = path.display().to_string();
    let csv_error = |source: csv::Error| ScriptError::Csv {
        path: shown.clone(),
        source,
    };
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    let mut header: Vec<&str> = plan.columns.iter().map(|(c, _)| c.name.as_str()).collect();
    if d.engine == Engine::Mssql {
        header.push(super::STATUS);
    }
    writer.write_record(&header).map_err(csv_error)?;

    for row in &plan.data.rows {
        let mut record = Vec::with_capacity(header.len());
        for (column, position) in &plan.columns {
            let field = csv_field(d, &row[*position]).map_err(|e| {
                super::rewrap(e, &plan.table.name.to_string(), column.name.as_str())
            })?;
            record.push(field.unwrap_or_default());
        }
        if d.engine == Engine::Mssql {
            record.push("0".to_string());
        }
        writer.write_record(&record).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ScriptError::Io {
            path: shown.clone(),
            source: e.into_error(),
        })?;
    let contents = String::from_utf8_lossy(&bytes).into_owned();
    Ok(BulkFile {
        table: plan.table.name.clone(),
        path,
        rows: plan.data.rows.len(),
        contents,
    })
}

/// Load statement reading `path` into the staging table.
pub fn load(d: Dialect, plan: &TablePlan<'_>, path: &Path) -> String {
    let stage = d.temp(&plan.stage);
    let file = path.display().to_string();
    match d.engine {
        Engine::Mssql => format!(
            "BULK INSERT {stage} FROM {} WITH (FORMAT = 'CSV', FIRSTROW = 2, CODEPAGE = '65001', TABLOCK);",
            d.string(&file)
        ),
        Engine::Postgres => format!(
            "COPY {stage} ({}) FROM {} WITH (FORMAT csv, HEADER true);",
            plan.column_list(d),
            d.string(&file)
        ),
    }
}
