//! Joins rendered sections into one transactional script.

use sha2::{Digest, Sha256};
use tracing::info;

use crate::context::GenContext;
use crate::error::{ScriptError, ScriptResult};
use crate::phases::{self, SectionBody};
use crate::report::{Diagnostic, GeneratedScript, Section, SectionReport};
use crate::runtime::Runtime;

const TAG: &str = "realign";
const MAX_TAG_SUFFIX: u32 = 99;

/// Render and assemble the script for a resolved context.
pub fn assemble(ctx: &GenContext<'_>) -> ScriptResult<GeneratedScript> {
    let d = ctx.dialect;
    let rt = Runtime::new(d);
    let rendered = phases::render(ctx, &rt)?;

    let mut diagnostics = ctx.diagnostics.clone();
    diagnostics.extend(rendered.diagnostics);

    let mut sections = Vec::with_capacity(rendered.sections.len() + 1);
    if !diagnostics.is_empty() {
        sections.push(narrate_diagnostics(&rt, &diagnostics));
    }
    sections.extend(rendered.sections);

    let body = sections
        .iter()
        .map(|s| format!("{}\n{}", banner(s.section), s.statements.join("\n")))
        .collect::<Vec<_>>()
        .join("\n\n");
    let checksum = hex::encode(Sha256::digest(body.as_bytes()));
    let tag = dollar_tag(&body)?;

    let mut preamble = vec![
        "-- realign reconciliation script".to_string(),
        format!("-- engine: {}", d.engine),
        format!("-- checksum: sha256:{checksum}"),
    ];
    if let Some(comment) = &ctx.options.header_comment {
        preamble.extend(comment.lines().map(|line| format!("-- {line}").trim_end().to_string()));
    }
    preamble.push(String::new());

    let prologue = rt.prologue(ctx.options.flags).len();
    let text = rt.wrap(&preamble, &body, ctx.options.flags, &tag);

    let mut reports = vec![SectionReport {
        section: Section::Header,
        kinds: Vec::new(),
        statements: prologue,
    }];
    reports.extend(sections.iter().map(|s| SectionReport {
        section: s.section,
        kinds: s.kinds.clone(),
        statements: s.statements.len(),
    }));
    reports.push(SectionReport {
        section: Section::Footer,
        kinds: Vec::new(),
        statements: 1,
    });

    info!(
        engine = %d.engine,
        sections = reports.len(),
        diagnostics = diagnostics.len(),
        bulk_files = rendered.bulk_files.len(),
        bytes = text.len(),
        "Generated reconciliation script"
    );

    Ok(GeneratedScript {
        text,
        dialect: d,
        sections: reports,
        diagnostics,
        bulk_files: rendered.bulk_files,
        checksum,
    })
}

fn banner(section: Section) -> String {
    format!("-- ==== {section} ====")
}

/// Record every generation-time skip in the results relation.
fn narrate_diagnostics(rt: &Runtime, diagnostics: &[Diagnostic]) -> SectionBody {
    let d = rt.dialect();
    SectionBody {
        section: Section::Diagnostics,
        kinds: Vec::new(),
        statements: diagnostics
            .iter()
            .map(|diag| rt.record("skipped", &d.string(&diag.to_string())))
            .collect(),
    }
}

/// First dollar-quote tag that does not occur in the body.
fn dollar_tag(body: &str) -> ScriptResult<String> {
    std::iter::once(TAG.to_string())
        .chain((1..=MAX_TAG_SUFFIX).map(|n| format!("{TAG}_{n}")))
        .find(|tag| !body.contains(&format!("${tag}$")))
        .ok_or(ScriptError::DelimiterCollision)
}
