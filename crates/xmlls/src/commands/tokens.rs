//! Token dump command.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use xmlls_dom::{Scanner, TokenKind, is_dtd_uri};

use super::print_json;

#[derive(Serialize)]
struct TokenOut<'a> {
    kind: TokenKind,
    start: usize,
    end: usize,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn execute(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let scanner = if is_dtd_uri(&file.to_string_lossy()) {
        Scanner::for_dtd(&text)
    } else {
        Scanner::new(&text)
    };

    let tokens: Vec<TokenOut<'_>> = scanner
        .map(|token| TokenOut {
            kind: token.kind,
            start: token.start,
            end: token.end,
            text: &text[token.start..token.end],
            error: token.error.map(|e| e.to_string()),
        })
        .collect();
    print_json(&tokens)
}
