//! Command implementations for the xmlls CLI
//!
//! Each command loads the input file into an [`XmlLanguageService`] and
//! prints what one feature service returns.

pub mod check;
pub mod folding;
pub mod hover;
pub mod symbols;
pub mod tokens;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use url::Url;
use xmlls_core::XmlLanguageService;
use xmlls_core::extensions::dtd::resolve_uri;
use xmlls_dom::Document;

/// The file read from disk, opened in a fresh service.
pub struct Loaded {
    pub path: PathBuf,
    pub service: XmlLanguageService,
    pub document: Arc<Document>,
}

pub fn file_uri(path: &Path) -> Result<String> {
    let absolute = path
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", path.display()))?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| anyhow::anyhow!("cannot express {} as a URI", absolute.display()))
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

/// Open `path`, plus the external DTD it references when that is a local
/// file, with the settings from `settings` applied.
pub fn load(path: &Path, settings: Option<&Path>) -> Result<Loaded> {
    let service = XmlLanguageService::new();
    if let Some(settings) = settings {
        let value: serde_json::Value = serde_json::from_str(&read(settings)?)
            .with_context(|| format!("invalid JSON in {}", settings.display()))?;
        service
            .did_change_configuration(value)
            .with_context(|| format!("invalid settings in {}", settings.display()))?;
    }

    let uri = file_uri(path)?;
    let document = service.did_open(uri.clone(), read(path)?, 1);

    let system_id = document
        .doctype()
        .and_then(|node| node.as_doctype())
        .filter(|doctype| !doctype.is_synthetic())
        .and_then(|doctype| doctype.system_id_without_quotes())
        .and_then(|system_id| resolve_uri(&uri, system_id));
    if let Some(dtd_uri) = system_id
        && let Some(dtd_path) = Url::parse(&dtd_uri)
            .ok()
            .filter(|url| url.scheme() == "file")
            .and_then(|url| url.to_file_path().ok())
    {
        // A missing DTD is reported by the diagnostics, not here.
        match std::fs::read_to_string(dtd_path) {
            Ok(text) => {
                tracing::debug!(uri = %dtd_uri, "loaded external DTD");
                service.did_open(dtd_uri, text, 1);
            }
            Err(err) => tracing::debug!(uri = %dtd_uri, error = %err, "external DTD not loaded"),
        }
    }

    Ok(Loaded {
        path: path.to_path_buf(),
        service,
        document,
    })
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
