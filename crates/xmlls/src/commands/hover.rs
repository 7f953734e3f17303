//! Hover command.

use std::path::Path;

use anyhow::Result;
use xmlls_core::{NeverCancel, Position};

use super::{load, print_json};

pub fn execute(file: &Path, line: u32, character: u32, settings: Option<&Path>) -> Result<()> {
    let loaded = load(file, settings)?;
    let hover = loaded.service.do_hover(
        &loaded.document,
        Position::new(line, character),
        &NeverCancel,
    )?;
    print_json(&hover)
}
