//! Outline command.

use std::path::Path;

use anyhow::Result;
use xmlls_core::NeverCancel;

use super::{load, print_json};

pub fn execute(file: &Path, flat: bool, settings: Option<&Path>) -> Result<()> {
    let loaded = load(file, settings)?;
    if flat {
        print_json(
            &loaded
                .service
                .find_symbol_informations(&loaded.document, &NeverCancel),
        )
    } else {
        print_json(
            &loaded
                .service
                .find_document_symbols(&loaded.document, &NeverCancel),
        )
    }
}
