//! The extension registry.
//!
//! The registry owns the extensions, one ordered list of participants per
//! feature, a typed component map, and an optional [`DocumentProvider`].
//! It is initialized lazily: the first participant lookup starts every
//! extension with the buffered [`InitializeParams`] and replays the
//! buffered [`SaveContext`]. Initialization happens exactly once, even
//! with concurrent first lookups.
//!
//! Failures of extensions and participants never escape the registry's
//! helpers: they are logged with `tracing` and the contribution is skipped.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{
    Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::thread::{self, ThreadId};

use xmlls_dom::Document;

use crate::error::{ParticipantError, ParticipantResult};
use crate::extension::{InitializeParams, SaveContext, XmlExtension};
use crate::participants::{
    CodeActionParticipant, CodeLensParticipant, CompletionParticipant, DefinitionParticipant,
    DiagnosticsParticipant, DocumentLinkParticipant, HighlightingParticipant, HoverParticipant,
    ReferenceParticipant, RenameParticipant, TypeDefinitionParticipant,
};

/// Lookup of other open documents by URI.
pub trait DocumentProvider: Send + Sync {
    fn document(&self, uri: &str) -> Option<Arc<Document>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Starting(ThreadId),
    Initialized,
}

struct Lifecycle {
    phase: Phase,
    params: Option<InitializeParams>,
    pending_save: Option<SaveContext>,
    last_settings: Option<SaveContext>,
    /// Extensions registered while the others were being started.
    late: Vec<Arc<dyn XmlExtension>>,
}

/// Work left to do before the registry can be marked initialized.
enum StartStep {
    Late(Vec<Arc<dyn XmlExtension>>, Option<SaveContext>),
    Save(SaveContext),
}

/// Participants of one feature, in registration order.
struct ParticipantList<P: ?Sized> {
    items: RwLock<Vec<Arc<P>>>,
}

impl<P: ?Sized> Default for ParticipantList<P> {
    fn default() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }
}

impl<P: ?Sized> ParticipantList<P> {
    fn register(&self, participant: Arc<P>) -> bool {
        let mut items = write(&self.items);
        if items.iter().any(|p| same_instance(p, &participant)) {
            return false;
        }
        items.push(participant);
        true
    }

    fn unregister(&self, participant: &Arc<P>) -> bool {
        let mut items = write(&self.items);
        let before = items.len();
        items.retain(|p| !same_instance(p, participant));
        items.len() != before
    }

    fn snapshot(&self) -> Vec<Arc<P>> {
        read(&self.items).clone()
    }

    fn len(&self) -> usize {
        read(&self.items).len()
    }
}

fn same_instance<P: ?Sized>(a: &Arc<P>, b: &Arc<P>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry of extensions, participants, and components for one server session.
pub struct ExtensionRegistry {
    extensions: RwLock<Vec<Arc<dyn XmlExtension>>>,
    lifecycle: Mutex<Lifecycle>,
    started: Condvar,
    initialized: AtomicBool,

    completion: ParticipantList<dyn CompletionParticipant>,
    hover: ParticipantList<dyn HoverParticipant>,
    diagnostics: ParticipantList<dyn DiagnosticsParticipant>,
    code_action: ParticipantList<dyn CodeActionParticipant>,
    document_link: ParticipantList<dyn DocumentLinkParticipant>,
    definition: ParticipantList<dyn DefinitionParticipant>,
    type_definition: ParticipantList<dyn TypeDefinitionParticipant>,
    reference: ParticipantList<dyn ReferenceParticipant>,
    code_lens: ParticipantList<dyn CodeLensParticipant>,
    highlighting: ParticipantList<dyn HighlightingParticipant>,
    rename: ParticipantList<dyn RenameParticipant>,

    components: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    document_provider: RwLock<Option<Arc<dyn DocumentProvider>>>,
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let extensions: Vec<&str> = read(&self.extensions).iter().map(|e| e.name()).collect();
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &extensions)
            .field("initialized", &self.is_initialized())
            .field("completion", &self.completion.len())
            .field("hover", &self.hover.len())
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionRegistry {
    /// A registry without extensions.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ExtensionRegistryBuilder {
        ExtensionRegistryBuilder::default()
    }

    fn with_parts(
        extensions: Vec<Arc<dyn XmlExtension>>,
        params: Option<InitializeParams>,
        document_provider: Option<Arc<dyn DocumentProvider>>,
    ) -> Self {
        Self {
            extensions: RwLock::new(extensions),
            lifecycle: Mutex::new(Lifecycle {
                phase: Phase::Uninitialized,
                params,
                pending_save: None,
                last_settings: None,
                late: Vec::new(),
            }),
            started: Condvar::new(),
            initialized: AtomicBool::new(false),
            completion: ParticipantList::default(),
            hover: ParticipantList::default(),
            diagnostics: ParticipantList::default(),
            code_action: ParticipantList::default(),
            document_link: ParticipantList::default(),
            definition: ParticipantList::default(),
            type_definition: ParticipantList::default(),
            reference: ParticipantList::default(),
            code_lens: ParticipantList::default(),
            highlighting: ParticipantList::default(),
            rename: ParticipantList::default(),
            components: RwLock::new(HashMap::new()),
            document_provider: RwLock::new(document_provider),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Buffer the `initialize` parameters. Ignored once extensions are started.
    pub fn initialize(&self, params: InitializeParams) {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.phase != Phase::Uninitialized {
            tracing::debug!("extensions already started, ignoring initialize parameters");
            return;
        }
        lifecycle.params = Some(params);
    }

    /// Forward a save context to every extension, or buffer it until they start.
    pub fn do_save(&self, context: SaveContext) {
        {
            let mut lifecycle = lock(&self.lifecycle);
            if matches!(context, SaveContext::SettingsChanged(_)) {
                lifecycle.last_settings = Some(context.clone());
            }
            if lifecycle.phase != Phase::Initialized {
                lifecycle.pending_save = Some(context);
                return;
            }
        }
        self.replay_save(&context);
    }

    /// Start the extensions if that has not happened yet.
    ///
    /// Participant getters call this. A call made by an extension while it
    /// is being started returns immediately; calls from other threads wait
    /// for the start to finish.
    pub fn ensure_initialized(&self) {
        if self.is_initialized() {
            return;
        }
        let me = thread::current().id();
        let (params, extensions) = {
            let mut lifecycle = lock(&self.lifecycle);
            loop {
                let phase = lifecycle.phase;
                match phase {
                    Phase::Initialized => return,
                    Phase::Starting(owner) if owner == me => return,
                    Phase::Starting(_) => {
                        lifecycle = self
                            .started
                            .wait(lifecycle)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    Phase::Uninitialized => {
                        lifecycle.phase = Phase::Starting(me);
                        let params = lifecycle.params.clone().unwrap_or_default();
                        break (params, read(&self.extensions).clone());
                    }
                }
            }
        };

        tracing::debug!(count = extensions.len(), "starting extensions");
        for extension in &extensions {
            self.start_extension(extension.as_ref(), &params);
        }

        // Extensions registered and save contexts received while starting
        // are handled before the registry is marked initialized.
        loop {
            let step = {
                let mut lifecycle = lock(&self.lifecycle);
                if !lifecycle.late.is_empty() {
                    let settings = match lifecycle.pending_save {
                        Some(_) => None,
                        None => lifecycle.last_settings.clone(),
                    };
                    StartStep::Late(std::mem::take(&mut lifecycle.late), settings)
                } else if let Some(context) = lifecycle.pending_save.take() {
                    StartStep::Save(context)
                } else {
                    lifecycle.phase = Phase::Initialized;
                    self.initialized.store(true, Ordering::Release);
                    break;
                }
            };
            match step {
                StartStep::Late(late, settings) => {
                    for extension in &late {
                        self.start_late(extension.as_ref(), &params, settings.as_ref());
                    }
                }
                StartStep::Save(context) => self.replay_save(&context),
            }
        }
        self.started.notify_all();
    }

    fn start_extension(&self, extension: &dyn XmlExtension, params: &InitializeParams) {
        tracing::debug!(extension = extension.name(), "starting extension");
        isolate("start", extension.name(), || {
            extension.start(params, self).map_err(ParticipantError::from)
        });
    }

    /// Start an extension registered after the initial start.
    fn start_late(
        &self,
        extension: &dyn XmlExtension,
        params: &InitializeParams,
        settings: Option<&SaveContext>,
    ) {
        self.start_extension(extension, params);
        if let Some(context) = settings {
            isolate("do_save", extension.name(), || {
                extension.do_save(context).map_err(ParticipantError::from)
            });
        }
    }

    fn replay_save(&self, context: &SaveContext) {
        for extension in read(&self.extensions).clone() {
            isolate("do_save", extension.name(), || {
                extension.do_save(context).map_err(ParticipantError::from)
            });
        }
    }

    /// Add an extension. After initialization it is started right away and
    /// receives the latest settings; while the others are being started, it
    /// is started before the registry is marked initialized.
    pub fn register_extension(&self, extension: Arc<dyn XmlExtension>) -> bool {
        // The lifecycle lock is held while the list changes, so the starter's
        // snapshot either contains the extension or `late` does.
        let (params, settings) = {
            let mut lifecycle = lock(&self.lifecycle);
            {
                let mut extensions = write(&self.extensions);
                if extensions.iter().any(|e| same_instance(e, &extension)) {
                    return false;
                }
                extensions.push(extension.clone());
            }
            let phase = lifecycle.phase;
            match phase {
                Phase::Uninitialized => return true,
                Phase::Starting(_) => {
                    lifecycle.late.push(extension);
                    return true;
                }
                Phase::Initialized => (
                    lifecycle.params.clone().unwrap_or_default(),
                    lifecycle.last_settings.clone(),
                ),
            }
        };
        self.start_late(extension.as_ref(), &params, settings.as_ref());
        true
    }

    /// Remove an extension, stopping it if it was started.
    pub fn unregister_extension(&self, extension: &Arc<dyn XmlExtension>) -> bool {
        let (removed, started) = {
            let mut lifecycle = lock(&self.lifecycle);
            lifecycle.late.retain(|e| !same_instance(e, extension));
            let mut extensions = write(&self.extensions);
            let before = extensions.len();
            extensions.retain(|e| !same_instance(e, extension));
            (extensions.len() != before, lifecycle.phase == Phase::Initialized)
        };
        if removed && started {
            tracing::debug!(extension = extension.name(), "stopping extension");
            isolate("stop", extension.name(), || {
                extension.stop(self).map_err(ParticipantError::from)
            });
        }
        removed
    }

    pub fn extensions(&self) -> Vec<Arc<dyn XmlExtension>> {
        read(&self.extensions).clone()
    }

    // ========================================================================
    // Components and documents
    // ========================================================================

    /// Register a component, replacing any previous component of the same type.
    pub fn register_component<T: Any + Send + Sync>(&self, component: Arc<T>) {
        write(&self.components).insert(TypeId::of::<T>(), component);
    }

    pub fn unregister_component<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        write(&self.components)
            .remove(&TypeId::of::<T>())
            .and_then(|c| c.downcast::<T>().ok())
    }

    pub fn component<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        read(&self.components)
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|c| c.downcast::<T>().ok())
    }

    pub fn set_document_provider(&self, provider: Option<Arc<dyn DocumentProvider>>) {
        *write(&self.document_provider) = provider;
    }

    pub fn document_provider(&self) -> Option<Arc<dyn DocumentProvider>> {
        read(&self.document_provider).clone()
    }

    /// Another open document, through the document provider.
    pub fn document(&self, uri: &str) -> Option<Arc<Document>> {
        self.document_provider()?.document(uri)
    }
}

macro_rules! participant_lists {
    ($($field:ident: $participant:ident => $getter:ident, $register:ident, $unregister:ident;)*) => {
        impl ExtensionRegistry {
            $(
                #[doc = concat!("Registered [`", stringify!($participant), "`]s, in registration order.")]
                pub fn $getter(&self) -> Vec<Arc<dyn $participant>> {
                    self.ensure_initialized();
                    self.$field.snapshot()
                }

                /// Returns `false` if this instance is already registered.
                pub fn $register(&self, participant: Arc<dyn $participant>) -> bool {
                    self.$field.register(participant)
                }

                /// Returns `false` if this instance was not registered.
                pub fn $unregister(&self, participant: &Arc<dyn $participant>) -> bool {
                    self.$field.unregister(participant)
                }
            )*
        }
    };
}

participant_lists! {
    completion: CompletionParticipant =>
        completion_participants, register_completion_participant, unregister_completion_participant;
    hover: HoverParticipant =>
        hover_participants, register_hover_participant, unregister_hover_participant;
    diagnostics: DiagnosticsParticipant =>
        diagnostics_participants, register_diagnostics_participant, unregister_diagnostics_participant;
    code_action: CodeActionParticipant =>
        code_action_participants, register_code_action_participant, unregister_code_action_participant;
    document_link: DocumentLinkParticipant =>
        document_link_participants, register_document_link_participant, unregister_document_link_participant;
    definition: DefinitionParticipant =>
        definition_participants, register_definition_participant, unregister_definition_participant;
    type_definition: TypeDefinitionParticipant =>
        type_definition_participants, register_type_definition_participant, unregister_type_definition_participant;
    reference: ReferenceParticipant =>
        reference_participants, register_reference_participant, unregister_reference_participant;
    code_lens: CodeLensParticipant =>
        code_lens_participants, register_code_lens_participant, unregister_code_lens_participant;
    highlighting: HighlightingParticipant =>
        highlighting_participants, register_highlighting_participant, unregister_highlighting_participant;
    rename: RenameParticipant =>
        rename_participants, register_rename_participant, unregister_rename_participant;
}

/// Builder for [`ExtensionRegistry`].
#[derive(Default)]
pub struct ExtensionRegistryBuilder {
    extensions: Vec<Arc<dyn XmlExtension>>,
    params: Option<InitializeParams>,
    document_provider: Option<Arc<dyn DocumentProvider>>,
}

impl ExtensionRegistryBuilder {
    pub fn extension(mut self, extension: Arc<dyn XmlExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn extensions(mut self, extensions: impl IntoIterator<Item = Arc<dyn XmlExtension>>) -> Self {
        self.extensions.extend(extensions);
        self
    }

    pub fn initialize_params(mut self, params: InitializeParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn document_provider(mut self, provider: Arc<dyn DocumentProvider>) -> Self {
        self.document_provider = Some(provider);
        self
    }

    pub fn build(self) -> ExtensionRegistry {
        ExtensionRegistry::with_parts(self.extensions, self.params, self.document_provider)
    }
}

// ============================================================================
// Failure isolation
// ============================================================================

/// Run a participant, turning a panic into [`ParticipantError::Other`].
pub(crate) fn call_participant<T>(
    operation: &'static str,
    participant: &str,
    f: impl FnOnce() -> ParticipantResult<T>,
) -> ParticipantResult<T> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        Err(ParticipantError::Other(anyhow::anyhow!(
            "{participant} panicked during {operation}: {message}"
        )))
    })
}

/// Run a participant; on failure, log it and return `None`.
pub(crate) fn isolate<T>(
    operation: &'static str,
    participant: &str,
    f: impl FnOnce() -> ParticipantResult<T>,
) -> Option<T> {
    match call_participant(operation, participant, f) {
        Ok(value) => Some(value),
        Err(err) => {
            log_failure(operation, participant, &err);
            None
        }
    }
}

pub(crate) fn log_failure(operation: &'static str, participant: &str, err: &ParticipantError) {
    tracing::error!(operation, participant, error = %err, "participant failed");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Nothing;
    impl HoverParticipant for Nothing {}

    #[test]
    fn test_register_is_idempotent_per_instance() {
        let registry = ExtensionRegistry::new();
        let a: Arc<dyn HoverParticipant> = Arc::new(Nothing);
        let b: Arc<dyn HoverParticipant> = Arc::new(Nothing);

        assert!(registry.register_hover_participant(a.clone()));
        assert!(!registry.register_hover_participant(a.clone()));
        assert!(registry.register_hover_participant(b.clone()));
        assert_eq!(registry.hover_participants().len(), 2);

        assert!(registry.unregister_hover_participant(&a));
        assert!(!registry.unregister_hover_participant(&a));
        let remaining = registry.hover_participants();
        assert_eq!(remaining.len(), 1);
        assert!(same_instance(&remaining[0], &b));
    }

    struct Counting {
        starts: AtomicUsize,
        saves: AtomicUsize,
    }

    impl XmlExtension for Counting {
        fn start(&self, _params: &InitializeParams, registry: &ExtensionRegistry) -> anyhow::Result<()> {
            // Lookups made while starting must not deadlock.
            let _ = registry.hover_participants();
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn do_save(&self, _context: &SaveContext) -> anyhow::Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_concurrent_first_access_starts_once() {
        let extension = Arc::new(Counting {
            starts: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
        });
        let registry = Arc::new(ExtensionRegistry::builder().extension(extension.clone()).build());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.completion_participants().len())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(registry.is_initialized());
        assert_eq!(extension.starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_components_are_keyed_by_type() {
        struct Manager(u32);
        let registry = ExtensionRegistry::new();
        assert!(registry.component::<Manager>().is_none());
        registry.register_component(Arc::new(Manager(7)));
        assert_eq!(registry.component::<Manager>().map(|m| m.0), Some(7));
        assert!(registry.component::<String>().is_none());
        assert!(registry.unregister_component::<Manager>().is_some());
        assert!(registry.component::<Manager>().is_none());
    }

    #[test]
    fn test_isolate_catches_panics() {
        let result: Option<()> = isolate("hover", "test", || panic!("boom"));
        assert!(result.is_none());
        let result = isolate("hover", "test", || Ok(3));
        assert_eq!(result, Some(3));

        let err = call_participant::<()>("hover", "test", || panic!("boom")).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
