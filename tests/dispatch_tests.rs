//! Dispatch scenarios against the signed translator
//!
//! The transport is a recording mock, so every test can assert exactly which
//! requests left the gateway.

mod mock_providers;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use lingo_gateway::core::lang::LangEnum;
use lingo_gateway::core::translate::microsoft_builtin::{APP_IDENTITY, SignatureCodec};
use lingo_gateway::errors::ErrorKind;
use lingo_gateway::plugin::capabilities::{Capability, CapabilityRequest};
use lingo_gateway::plugin::dispatch::Dispatched;

use mock_providers::{Harness, MockHttp, MockReply};

const BONJOUR: &str = r#"[{"translations":[{"text":"bonjour","to":"fr"}]}]"#;
const TRANSLATOR: &str = "microsoft-builtin";

fn hello(source: LangEnum, target: LangEnum) -> CapabilityRequest {
    CapabilityRequest::new(source, target, "hello")
}

#[tokio::test]
async fn test_auto_to_french_success() {
    let harness = Harness::new(MockHttp::responding(BONJOUR));
    let service_id = harness.add(TRANSLATOR).await;

    let outcome = harness
        .dispatcher
        .dispatch(
            &service_id,
            Capability::Translate,
            hello(LangEnum::Auto, LangEnum::French),
            &CancellationToken::new(),
        )
        .await;

    let result = outcome.result().expect("dispatch completed");
    assert_eq!(result.text(), Some("bonjour"));

    let call = harness.http.last_call().unwrap();
    assert_eq!(
        call.url,
        "https://api.cognitive.microsofttranslator.com/translate?api-version=3.0&to=fr"
    );
    assert!(!call.url.contains("from="));
    assert_eq!(call.body, serde_json::json!([{ "Text": "hello" }]));
    assert!(call.header("user-agent").unwrap().starts_with("Mozilla/5.0"));

    let signature = call.header("x-mt-signature").expect("signature header");
    let parts: Vec<&str> = signature.split("::").collect();
    assert_eq!(parts.len(), 4);
    assert_eq!(parts[0], APP_IDENTITY);
    assert!(parts[2].ends_with("GMT"));
    assert_eq!(parts[3].len(), 32);
    assert!(SignatureCodec::new().verify(
        &signature,
        "api.cognitive.microsofttranslator.com/translate?api-version=3.0&to=fr"
    ));

    let history = harness.history.records();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].plugin_id, TRANSLATOR);
    assert_eq!(history[0].service_id, service_id);
    assert!(history[0].result.is_success());
}

#[tokio::test]
async fn test_explicit_source_adds_from() {
    let harness = Harness::new(MockHttp::responding(BONJOUR));
    let service_id = harness.add(TRANSLATOR).await;

    harness
        .dispatcher
        .dispatch(
            &service_id,
            Capability::Translate,
            hello(LangEnum::English, LangEnum::ChineseSimplified),
            &CancellationToken::new(),
        )
        .await;

    let call = harness.http.last_call().unwrap();
    assert!(call.url.ends_with("&to=zh-Hans&from=en"));
}

#[tokio::test]
async fn test_unsupported_language_makes_no_network_call() {
    let harness = Harness::new(MockHttp::responding(BONJOUR));
    let service_id = harness.add(TRANSLATOR).await;

    for (source, target) in [
        (LangEnum::Cantonese, LangEnum::French),
        (LangEnum::English, LangEnum::Hindi),
        (LangEnum::English, LangEnum::Auto),
    ] {
        let outcome = harness
            .dispatcher
            .dispatch(
                &service_id,
                Capability::Translate,
                hello(source, target),
                &CancellationToken::new(),
            )
            .await;
        let failure = outcome.result().and_then(|r| r.failure()).unwrap();
        assert_eq!(failure.kind, ErrorKind::UnsupportedLanguage);
    }

    assert_eq!(harness.http.call_count(), 0);
    // Pre-flight failures still complete, so each one is recorded
    assert_eq!(harness.history.len(), 3);
}

#[tokio::test]
async fn test_cantonese_reason_is_localized() {
    let harness = Harness::new(MockHttp::responding(BONJOUR));
    let service_id = harness.add(TRANSLATOR).await;

    let outcome = harness
        .dispatcher
        .dispatch(
            &service_id,
            Capability::Translate,
            hello(LangEnum::Cantonese, LangEnum::French),
            &CancellationToken::new(),
        )
        .await;
    let failure = outcome.result().and_then(|r| r.failure()).unwrap();
    assert!(failure.reason.starts_with("Unsupported source language"));
}

#[tokio::test]
async fn test_empty_array_is_protocol_failure_with_raw() {
    let harness = Harness::new(MockHttp::responding("[]"));
    let service_id = harness.add(TRANSLATOR).await;

    let outcome = harness
        .dispatcher
        .dispatch(
            &service_id,
            Capability::Translate,
            hello(LangEnum::Auto, LangEnum::French),
            &CancellationToken::new(),
        )
        .await;

    let failure = outcome.result().and_then(|r| r.failure()).unwrap();
    assert_eq!(failure.kind, ErrorKind::ProtocolFailure);
    assert!(failure.reason.contains("Raw: []"));
    assert_eq!(harness.history.len(), 1);
}

#[tokio::test]
async fn test_unauthorized_is_authentication_failure() {
    let harness = Harness::new(MockHttp::with_reply(MockReply::Status(
        401,
        "invalid signature".to_string(),
    )));
    let service_id = harness.add(TRANSLATOR).await;

    let outcome = harness
        .dispatcher
        .dispatch(
            &service_id,
            Capability::Translate,
            hello(LangEnum::Auto, LangEnum::French),
            &CancellationToken::new(),
        )
        .await;

    let failure = outcome.result().and_then(|r| r.failure()).unwrap();
    assert_eq!(failure.kind, ErrorKind::AuthenticationFailure);

    let stats = harness.registry.resolve(&service_id).unwrap().stats();
    assert_eq!(stats.error_count, 1);
    assert!(stats.last_error.is_some());
}

#[tokio::test]
async fn test_transport_failure() {
    let harness = Harness::new(MockHttp::with_reply(MockReply::Transport(
        "connection reset".to_string(),
    )));
    let service_id = harness.add(TRANSLATOR).await;

    let outcome = harness
        .dispatcher
        .dispatch(
            &service_id,
            Capability::Translate,
            hello(LangEnum::Auto, LangEnum::French),
            &CancellationToken::new(),
        )
        .await;

    let failure = outcome.result().and_then(|r| r.failure()).unwrap();
    assert_eq!(failure.kind, ErrorKind::TransportFailure);
}

#[tokio::test]
async fn test_unknown_service_writes_no_history() {
    let harness = Harness::new(MockHttp::responding(BONJOUR));

    let outcome = harness
        .dispatcher
        .dispatch(
            "never-registered",
            Capability::Translate,
            hello(LangEnum::Auto, LangEnum::French),
            &CancellationToken::new(),
        )
        .await;

    let failure = outcome.result().and_then(|r| r.failure()).unwrap();
    assert_eq!(failure.kind, ErrorKind::ServiceNotFound);
    assert!(harness.history.is_empty());
    assert_eq!(harness.http.call_count(), 0);
}

#[tokio::test]
async fn test_text_too_long() {
    let harness = Harness::new(MockHttp::responding(BONJOUR));
    let service_id = harness.add(TRANSLATOR).await;

    let request = CapabilityRequest::new(LangEnum::Auto, LangEnum::French, "a".repeat(1001));
    let outcome = harness
        .dispatcher
        .dispatch(
            &service_id,
            Capability::Translate,
            request,
            &CancellationToken::new(),
        )
        .await;

    let failure = outcome.result().and_then(|r| r.failure()).unwrap();
    assert_eq!(failure.kind, ErrorKind::TextTooLong);
    assert!(failure.reason.contains("1001/1000"));
    assert_eq!(harness.http.call_count(), 0);
}

#[tokio::test]
async fn test_capability_not_supported() {
    let harness = Harness::new(MockHttp::responding(BONJOUR));
    let service_id = harness.add(TRANSLATOR).await;

    let outcome = harness
        .dispatcher
        .dispatch(
            &service_id,
            Capability::TextToSpeech,
            hello(LangEnum::English, LangEnum::French),
            &CancellationToken::new(),
        )
        .await;

    let failure = outcome.result().and_then(|r| r.failure()).unwrap();
    assert_eq!(failure.kind, ErrorKind::CapabilityNotSupported);
    assert_eq!(harness.http.call_count(), 0);
}

#[tokio::test]
async fn test_disabled_service() {
    let harness = Harness::new(MockHttp::responding(BONJOUR));
    let service_id = harness.add(TRANSLATOR).await;
    harness.registry.set_enabled(&service_id, false).unwrap();

    let outcome = harness
        .dispatcher
        .dispatch(
            &service_id,
            Capability::Translate,
            hello(LangEnum::Auto, LangEnum::French),
            &CancellationToken::new(),
        )
        .await;

    let failure = outcome.result().and_then(|r| r.failure()).unwrap();
    assert_eq!(failure.kind, ErrorKind::ServiceDisabled);
    assert_eq!(harness.http.call_count(), 0);
    assert_eq!(harness.history.len(), 1);
}

#[tokio::test]
async fn test_cancellation_mid_flight_writes_no_history() {
    let harness =
        Harness::new(MockHttp::responding(BONJOUR).delayed(Duration::from_secs(30)));
    let service_id = harness.add(TRANSLATOR).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = harness
        .dispatcher
        .dispatch(
            &service_id,
            Capability::Translate,
            hello(LangEnum::Auto, LangEnum::French),
            &cancel,
        )
        .await;

    assert_eq!(outcome, Dispatched::Cancelled);
    assert_eq!(harness.http.call_count(), 1);
    assert!(harness.history.is_empty());
}

#[tokio::test]
async fn test_already_cancelled_token_skips_everything() {
    let harness = Harness::new(MockHttp::responding(BONJOUR));
    let service_id = harness.add(TRANSLATOR).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = harness
        .dispatcher
        .dispatch(
            &service_id,
            Capability::Translate,
            hello(LangEnum::Auto, LangEnum::French),
            &cancel,
        )
        .await;

    assert!(outcome.is_cancelled());
    assert_eq!(harness.http.call_count(), 0);
    assert!(harness.history.is_empty());
}

#[tokio::test]
async fn test_dispatch_all_in_rank_order() {
    let harness = Harness::new(MockHttp::responding(BONJOUR));
    let first = harness.add(TRANSLATOR).await;
    let second = harness.add(TRANSLATOR).await;
    harness.registry.move_to(&second, 0).await.unwrap();

    let results = harness
        .dispatcher
        .dispatch_all(
            Capability::Translate,
            hello(LangEnum::Auto, LangEnum::French),
            &CancellationToken::new(),
        )
        .await;

    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);
    assert!(
        results
            .iter()
            .all(|(_, d)| d.result().and_then(|r| r.text()) == Some("bonjour"))
    );
    assert_eq!(harness.history.len(), 2);
}
