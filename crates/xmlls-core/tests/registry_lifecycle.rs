//! Extension lifecycle and participant isolation, seen from outside the crate.

use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use serde_json::json;
use xmlls_core::{
    ExtensionRegistry, HoverParticipant, InitializeParams, NeverCancel, ParticipantError,
    ParticipantResult, Position, SaveContext, SharedSettings, XmlExtension, XmlHover,
    request::HoverRequest,
};

/// Records what the registry asks of it and contributes a hover fragment.
#[derive(Default)]
struct Recorder {
    saves: Mutex<Vec<SaveContext>>,
    starts: Mutex<Vec<InitializeParams>>,
    stops: Mutex<usize>,
    hover: Arc<Fragment>,
}

impl XmlExtension for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn start(&self, params: &InitializeParams, registry: &ExtensionRegistry) -> anyhow::Result<()> {
        self.starts.lock().unwrap().push(params.clone());
        registry.register_hover_participant(self.hover.clone());
        Ok(())
    }

    fn stop(&self, registry: &ExtensionRegistry) -> anyhow::Result<()> {
        *self.stops.lock().unwrap() += 1;
        let hover: Arc<dyn HoverParticipant> = self.hover.clone();
        registry.unregister_hover_participant(&hover);
        Ok(())
    }

    fn do_save(&self, context: &SaveContext) -> anyhow::Result<()> {
        self.saves.lock().unwrap().push(context.clone());
        Ok(())
    }
}

#[derive(Default)]
struct Fragment;

impl HoverParticipant for Fragment {
    fn on_tag(&self, request: &HoverRequest<'_>) -> ParticipantResult<Option<String>> {
        Ok(request.current_tag().map(|tag| format!("tag {tag}")))
    }
}

struct Panics;

impl HoverParticipant for Panics {
    fn on_tag(&self, _request: &HoverRequest<'_>) -> ParticipantResult<Option<String>> {
        panic!("hover exploded");
    }
}

struct Fails;

impl HoverParticipant for Fails {
    fn on_tag(&self, _request: &HoverRequest<'_>) -> ParticipantResult<Option<String>> {
        Err(ParticipantError::Other(anyhow::anyhow!("no luck")))
    }
}

struct BrokenStart;

impl XmlExtension for BrokenStart {
    fn start(&self, _params: &InitializeParams, _registry: &ExtensionRegistry) -> anyhow::Result<()> {
        anyhow::bail!("cannot start")
    }
}

/// Holds its own start open until the test lets it go.
struct Gate {
    barrier: Arc<Barrier>,
}

impl XmlExtension for Gate {
    fn start(&self, _params: &InitializeParams, _registry: &ExtensionRegistry) -> anyhow::Result<()> {
        self.barrier.wait();
        self.barrier.wait();
        Ok(())
    }
}

fn hover_text(registry: &Arc<ExtensionRegistry>, text: &str, character: u32) -> Option<String> {
    let doc = xmlls_dom::parse(text, "file:///h.xml");
    XmlHover::new(registry.clone())
        .do_hover(&doc, Position::new(0, character), &SharedSettings::default(), &NeverCancel)
        .unwrap()
        .map(|hover| hover.contents.value)
}

#[test]
fn test_extensions_start_lazily_with_buffered_params() {
    let recorder = Arc::new(Recorder::default());
    let registry = ExtensionRegistry::builder()
        .extension(recorder.clone())
        .build();

    let params = InitializeParams::new(Some("file:///workspace".to_string()));
    registry.initialize(params.clone());
    assert!(!registry.is_initialized());
    assert!(recorder.starts.lock().unwrap().is_empty());

    assert_eq!(registry.hover_participants().len(), 1);
    assert!(registry.is_initialized());
    assert_eq!(*recorder.starts.lock().unwrap(), vec![params]);

    // A later initialize changes nothing.
    registry.initialize(InitializeParams::new(None));
    registry.hover_participants();
    assert_eq!(recorder.starts.lock().unwrap().len(), 1);
}

#[test]
fn test_latest_pending_save_is_replayed_once() {
    let recorder = Arc::new(Recorder::default());
    let registry = ExtensionRegistry::builder()
        .extension(recorder.clone())
        .build();

    registry.do_save(SaveContext::SettingsChanged(json!({ "hover": { "documentation": false } })));
    registry.do_save(SaveContext::SettingsChanged(json!({ "codeLens": { "enabled": true } })));
    assert!(recorder.saves.lock().unwrap().is_empty());

    registry.ensure_initialized();
    registry.ensure_initialized();
    assert_eq!(
        *recorder.saves.lock().unwrap(),
        vec![SaveContext::SettingsChanged(json!({ "codeLens": { "enabled": true } }))]
    );

    registry.do_save(SaveContext::DocumentSaved {
        uri: "file:///a.xml".to_string(),
    });
    assert_eq!(recorder.saves.lock().unwrap().len(), 2);
}

#[test]
fn test_late_extension_gets_the_last_settings() {
    let registry = ExtensionRegistry::new();
    registry.ensure_initialized();
    let settings = SaveContext::SettingsChanged(json!({ "symbols": { "enabled": false } }));
    registry.do_save(settings.clone());
    registry.do_save(SaveContext::DocumentSaved {
        uri: "file:///a.xml".to_string(),
    });

    let recorder = Arc::new(Recorder::default());
    assert!(registry.register_extension(recorder.clone()));
    assert!(!registry.register_extension(recorder.clone()));
    assert_eq!(recorder.starts.lock().unwrap().len(), 1);
    assert_eq!(*recorder.saves.lock().unwrap(), vec![settings]);
    assert_eq!(registry.hover_participants().len(), 1);
}

#[test]
fn test_unregister_extension_stops_it() {
    let recorder = Arc::new(Recorder::default());
    let registry = ExtensionRegistry::builder()
        .extension(recorder.clone())
        .build();
    assert_eq!(registry.hover_participants().len(), 1);

    let extension: Arc<dyn XmlExtension> = recorder.clone();
    assert!(registry.unregister_extension(&extension));
    assert!(!registry.unregister_extension(&extension));
    assert_eq!(*recorder.stops.lock().unwrap(), 1);
    assert!(registry.hover_participants().is_empty());
}

#[test]
fn test_failures_are_isolated() {
    let recorder = Arc::new(Recorder::default());
    let registry = Arc::new(
        ExtensionRegistry::builder()
            .extension(Arc::new(BrokenStart))
            .extension(recorder.clone())
            .build(),
    );
    registry.register_hover_participant(Arc::new(Panics));
    registry.register_hover_participant(Arc::new(Fails));

    // The broken extension did not prevent the recorder from starting, and
    // the failing participants contribute nothing.
    assert_eq!(hover_text(&registry, "<root/>", 2).as_deref(), Some("tag root"));
    assert_eq!(registry.hover_participants().len(), 3);
}

#[test]
fn test_extension_registered_while_starting_is_started() {
    let barrier = Arc::new(Barrier::new(2));
    let registry = Arc::new(
        ExtensionRegistry::builder()
            .extension(Arc::new(Gate {
                barrier: barrier.clone(),
            }))
            .build(),
    );

    let starter = {
        let registry = registry.clone();
        thread::spawn(move || registry.ensure_initialized())
    };
    barrier.wait();
    let recorder = Arc::new(Recorder::default());
    assert!(registry.register_extension(recorder.clone()));
    assert!(!registry.is_initialized());
    barrier.wait();
    starter.join().unwrap();

    assert!(registry.is_initialized());
    assert_eq!(registry.hover_participants().len(), 1);
    assert_eq!(recorder.starts.lock().unwrap().len(), 1);
}

#[test]
fn test_settings_received_while_starting_reach_late_extensions() {
    let barrier = Arc::new(Barrier::new(2));
    let registry = Arc::new(
        ExtensionRegistry::builder()
            .extension(Arc::new(Gate {
                barrier: barrier.clone(),
            }))
            .build(),
    );

    let starter = {
        let registry = registry.clone();
        thread::spawn(move || registry.ensure_initialized())
    };
    barrier.wait();
    let settings = SaveContext::SettingsChanged(json!({ "format": { "enabled": true } }));
    registry.do_save(settings.clone());
    let recorder = Arc::new(Recorder::default());
    registry.register_extension(recorder.clone());
    barrier.wait();
    starter.join().unwrap();

    assert_eq!(recorder.starts.lock().unwrap().len(), 1);
    assert_eq!(*recorder.saves.lock().unwrap(), vec![settings]);
}
