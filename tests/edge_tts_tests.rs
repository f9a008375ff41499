//! Edge TTS end to end over a local HTTP server

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lingo_gateway::config::HttpConfig;
use lingo_gateway::core::history::MemoryHistory;
use lingo_gateway::core::http::ReqwestHttpService;
use lingo_gateway::core::i18n::StaticLocalizer;
use lingo_gateway::core::lang::LangEnum;
use lingo_gateway::core::tts::EdgeTtsSettingsEditor;
use lingo_gateway::errors::ErrorKind;
use lingo_gateway::plugin::capabilities::{Capability, CapabilityRequest};
use lingo_gateway::plugin::catalog::PluginCatalog;
use lingo_gateway::plugin::dispatch::{Dispatcher, Payload};
use lingo_gateway::plugin::lifecycle::HostContext;
use lingo_gateway::plugin::registry::ServiceManager;
use lingo_gateway::settings::SettingsStore;

struct Setup {
    registry: Arc<ServiceManager>,
    dispatcher: Dispatcher,
    history: Arc<MemoryHistory>,
    service_id: String,
}

async fn setup() -> Setup {
    let http = ReqwestHttpService::new(&HttpConfig::default()).unwrap();
    let localizer = Arc::new(StaticLocalizer::english());
    let host = HostContext::new(
        Arc::new(http),
        Arc::new(SettingsStore::in_memory()),
        localizer.clone(),
    );
    let registry = Arc::new(ServiceManager::new(host));
    let service_id = registry
        .register_from_catalog(&PluginCatalog::discover(), "edge-tts", None)
        .await
        .unwrap()
        .service_id()
        .to_string();
    let history = Arc::new(MemoryHistory::new());
    let dispatcher = Dispatcher::new(Arc::clone(&registry), history.clone(), localizer);

    Setup {
        registry,
        dispatcher,
        history,
        service_id,
    }
}

fn speak(text: &str) -> CapabilityRequest {
    CapabilityRequest::new(LangEnum::English, LangEnum::Auto, text)
}

#[tokio::test]
async fn test_synthesis_posts_configured_voice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tts"))
        .and(body_json(json!({
            "text": "Hello",
            "voice": "en-US-AriaNeural",
            "rate": 1.3,
            "pitch": 2,
            "style": "cheerful",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x49, 0x44, 0x33, 0x04]))
        .expect(1)
        .mount(&server)
        .await;

    let setup = setup().await;
    let scoped = setup.registry.settings_for(&setup.service_id).unwrap();
    let editor = EdgeTtsSettingsEditor::open(&scoped).unwrap();
    editor.set_url(&format!("{}/tts", server.uri())).unwrap();
    editor.set_voice("en-US-AriaNeural").unwrap();
    editor.set_speed(1.26).unwrap();
    editor.set_pitch(2).unwrap();
    editor.set_style("cheerful").unwrap();

    let outcome = setup
        .dispatcher
        .dispatch(
            &setup.service_id,
            Capability::TextToSpeech,
            speak("Hello"),
            &CancellationToken::new(),
        )
        .await;

    let payload = outcome.result().and_then(|r| r.payload()).unwrap();
    assert_eq!(payload, &Payload::Audio(vec![0x49, 0x44, 0x33, 0x04].into()));
    assert_eq!(setup.history.len(), 1);
}

#[tokio::test]
async fn test_unconfigured_endpoint_fails_without_request() {
    let setup = setup().await;

    let outcome = setup
        .dispatcher
        .dispatch(
            &setup.service_id,
            Capability::TextToSpeech,
            speak("Hello"),
            &CancellationToken::new(),
        )
        .await;

    let failure = outcome.result().and_then(|r| r.failure()).unwrap();
    assert_eq!(failure.kind, ErrorKind::ProviderFailure);
    assert!(failure.reason.contains("not configured"));
}

#[tokio::test]
async fn test_empty_audio_is_protocol_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let setup = setup().await;
    let scoped = setup.registry.settings_for(&setup.service_id).unwrap();
    EdgeTtsSettingsEditor::open(&scoped)
        .unwrap()
        .set_url(&server.uri())
        .unwrap();

    let outcome = setup
        .dispatcher
        .dispatch(
            &setup.service_id,
            Capability::TextToSpeech,
            speak("Hello"),
            &CancellationToken::new(),
        )
        .await;

    let failure = outcome.result().and_then(|r| r.failure()).unwrap();
    assert_eq!(failure.kind, ErrorKind::ProtocolFailure);
}

#[tokio::test]
async fn test_server_error_is_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let setup = setup().await;
    let scoped = setup.registry.settings_for(&setup.service_id).unwrap();
    EdgeTtsSettingsEditor::open(&scoped)
        .unwrap()
        .set_url(&server.uri())
        .unwrap();

    let outcome = setup
        .dispatcher
        .dispatch(
            &setup.service_id,
            Capability::TextToSpeech,
            speak("Hello"),
            &CancellationToken::new(),
        )
        .await;

    let failure = outcome.result().and_then(|r| r.failure()).unwrap();
    assert_eq!(failure.kind, ErrorKind::TransportFailure);
}
