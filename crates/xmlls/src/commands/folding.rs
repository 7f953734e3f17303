use std::path::Path;

use anyhow::Result;
use xmlls_core::NeverCancel;

use super::{load, print_json};

pub fn execute(file: &Path, settings: Option<&Path>) -> Result<()> {
    let loaded = load(file, settings)?;
    print_json(
        &loaded
            .service
            .get_folding_ranges(&loaded.document, &NeverCancel),
    )
}
