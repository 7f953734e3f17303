//! Extensions: bundles of participants with a start/stop lifecycle.

use serde_json::Value;

use crate::error::SettingsError;
use crate::registry::ExtensionRegistry;
use crate::settings::SharedSettings;

/// A pluggable feature module.
///
/// `start` registers participants and components on the registry, `stop`
/// unregisters them. An extension keeps its participants (as `Arc`s) so it
/// can unregister exactly what it registered.
pub trait XmlExtension: Send + Sync {
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn start(&self, params: &InitializeParams, registry: &ExtensionRegistry) -> anyhow::Result<()>;

    fn stop(&self, _registry: &ExtensionRegistry) -> anyhow::Result<()> {
        Ok(())
    }

    /// Settings changed, or a document was saved.
    fn do_save(&self, _context: &SaveContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Parameters of the `initialize` request, as seen by extensions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitializeParams {
    pub root_uri: Option<String>,
    pub initialization_options: Option<Value>,
    pub settings: SharedSettings,
}

impl InitializeParams {
    pub fn new(root_uri: Option<String>) -> Self {
        Self {
            root_uri,
            ..Self::default()
        }
    }

    /// Attach raw initialization options and parse the `settings.xml` section.
    pub fn with_initialization_options(mut self, options: Value) -> Result<Self, SettingsError> {
        self.settings = SharedSettings::from_initialization_options(Some(&options))?;
        self.initialization_options = Some(options);
        Ok(self)
    }
}

/// What triggered [`XmlExtension::do_save`].
#[derive(Debug, Clone, PartialEq)]
pub enum SaveContext {
    /// New client settings, the raw `xml` settings object.
    SettingsChanged(Value),
    /// A document was saved.
    DocumentSaved { uri: String },
}

impl SaveContext {
    /// The new settings merged over `current`, for a settings change.
    pub fn settings(&self, current: &SharedSettings) -> Option<Result<SharedSettings, SettingsError>> {
        match self {
            Self::SettingsChanged(value) => {
                let mut settings = current.clone();
                Some(settings.merge(value).map(|()| settings))
            }
            Self::DocumentSaved { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initialize_params_parse_settings() {
        let params = InitializeParams::new(Some("file:///ws".to_string()))
            .with_initialization_options(json!({
                "settings": { "xml": { "codeLens": { "enabled": true } } }
            }))
            .unwrap();
        assert!(params.settings.code_lens.enabled);
        assert!(params.initialization_options.is_some());
    }

    #[test]
    fn test_save_context_settings() {
        let current = SharedSettings::default();
        let context = SaveContext::SettingsChanged(json!({ "symbols": { "enabled": false } }));
        let settings = context.settings(&current).unwrap().unwrap();
        assert!(!settings.symbols.enabled);

        let saved = SaveContext::DocumentSaved {
            uri: "file:///a.xml".to_string(),
        };
        assert!(saved.settings(&current).is_none());
    }
}
