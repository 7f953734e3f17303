//! Diagnostics command, rendered as annotated source snippets.

use std::path::Path;

use anyhow::Result;
use ariadne::{Color, Label, Report, ReportKind, Source};
use xmlls_core::{Diagnostic, DiagnosticSeverity, NeverCancel};
use xmlls_dom::Document;

use super::{load, print_json};

pub fn execute(file: &Path, json: bool, settings: Option<&Path>) -> Result<()> {
    let loaded = load(file, settings)?;
    let (published, pending) = loaded
        .service
        .publish_diagnostics(&loaded.document, &NeverCancel);
    if pending.is_some() {
        tracing::warn!("a referenced grammar is still downloading");
    }

    if json {
        print_json(&published)?;
    } else {
        let name = loaded.path.display().to_string();
        for diagnostic in &published.diagnostics {
            print!("{}", render(&name, &loaded.document, diagnostic)?);
        }
    }

    let errors = published
        .diagnostics
        .iter()
        .filter(|d| d.severity == DiagnosticSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("{errors} error(s) in {}", loaded.path.display());
    }
    Ok(())
}

/// Character index of a byte offset, as ariadne counts spans in chars.
fn char_index(text: &str, offset: usize) -> usize {
    text.get(..offset).map_or(0, |prefix| prefix.chars().count())
}

fn render(name: &str, document: &Document, diagnostic: &Diagnostic) -> Result<String> {
    let text = document.text();
    let start = char_index(text, document.offset_at(diagnostic.range.start)?);
    let end = char_index(text, document.offset_at(diagnostic.range.end)?);

    let (kind, color) = match diagnostic.severity {
        DiagnosticSeverity::Error => (ReportKind::Error, Color::Red),
        DiagnosticSeverity::Warning => (ReportKind::Warning, Color::Yellow),
        DiagnosticSeverity::Information => (ReportKind::Advice, Color::Cyan),
        DiagnosticSeverity::Hint => (ReportKind::Advice, Color::Blue),
    };

    let mut report = Report::build(kind, name.to_string(), start);
    report = match &diagnostic.code {
        Some(code) => report.with_message(format!("[{code}] {}", diagnostic.message)),
        None => report.with_message(&diagnostic.message),
    };
    report = report.with_label(
        Label::new((name.to_string(), start..end.max(start)))
            .with_message(&diagnostic.message)
            .with_color(color),
    );

    let mut output = Vec::new();
    report
        .finish()
        .write((name.to_string(), Source::from(text)), &mut output)?;
    Ok(String::from_utf8(output)?)
}
