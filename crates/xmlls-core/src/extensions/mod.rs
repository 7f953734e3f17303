//! Built-in extensions.

pub mod contentmodel;
pub mod dtd;
pub mod prolog;
pub mod xsd;
pub mod xsi;

use std::sync::Arc;

pub use contentmodel::ContentModelExtension;
pub use dtd::DtdExtension;
pub use prolog::PrologExtension;
pub use xsd::XsdExtension;
pub use xsi::XsiExtension;

use crate::extension::XmlExtension;

/// The extensions installed by [`crate::XmlLanguageService::new`]. The
/// content model comes first: grammar extensions register their providers
/// on its manager when they start.
pub fn built_in() -> Vec<Arc<dyn XmlExtension>> {
    vec![
        Arc::new(ContentModelExtension::new()),
        Arc::new(PrologExtension::new()),
        Arc::new(DtdExtension::new()),
        Arc::new(XsdExtension::new()),
        Arc::new(XsiExtension::new()),
    ]
}
