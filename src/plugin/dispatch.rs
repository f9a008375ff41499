//! Capability Dispatch
//!
//! The [`Dispatcher`] resolves a service, checks it can serve the request,
//! invokes the capability and normalizes whatever happens into an
//! [`InvocationResult`]. Nothing a provider does, including panicking, unwinds
//! past it.
//!
//! ```text
//! acquire lease ─▶ enabled? ─▶ capability? ─▶ map languages ─▶ length ─▶ call
//!      │               │            │               │             │        │
//!  not found        disabled   not supported   unsupported    too long   select!{cancel, shutdown, call}
//!  (no history)                                                             │
//!                                                      ◀── history (once) ◀─┘
//! ```
//!
//! Pre-flight checks never touch the network. Cancellation, whether from the
//! caller's token or from the service being unregistered mid-call, yields
//! [`Dispatched::Cancelled`] and writes no history.

use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::capabilities::{
    Capability, CapabilityRequest, DictionaryEntry, LanguageMapping, MappedRequest, ProviderError,
};
use super::isolation::catch_plugin_panic;
use super::registry::{Service, ServiceManager};
use crate::core::history::{HistoryRecord, HistorySink};
use crate::core::i18n::{Localizer, keys};
use crate::errors::{DispatchError, ErrorKind, LangSide};

/// Successful output of a capability
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Dictionary(DictionaryEntry),
    Audio(Bytes),
}

/// User-facing failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub reason: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

/// Result envelope: exactly one of success or failure
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    Success(Payload),
    Failure(Failure),
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResult::Success(_))
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            InvocationResult::Success(payload) => Some(payload),
            InvocationResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            InvocationResult::Success(_) => None,
            InvocationResult::Failure(failure) => Some(failure),
        }
    }

    /// Translated text, if this is a text success
    pub fn text(&self) -> Option<&str> {
        match self {
            InvocationResult::Success(Payload::Text(text)) => Some(text),
            _ => None,
        }
    }
}

/// How a dispatch settled
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Completed(InvocationResult),
    /// The call did not complete; there is no result and no history record
    Cancelled,
}

impl Dispatched {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Dispatched::Cancelled)
    }

    pub fn result(&self) -> Option<&InvocationResult> {
        match self {
            Dispatched::Completed(result) => Some(result),
            Dispatched::Cancelled => None,
        }
    }

    pub fn into_result(self) -> Option<InvocationResult> {
        match self {
            Dispatched::Completed(result) => Some(result),
            Dispatched::Cancelled => None,
        }
    }
}

/// `None` when the call was cancelled
type Attempt<T> = Option<Result<T, DispatchError>>;

/// Routes requests to services and records history
pub struct Dispatcher {
    registry: Arc<ServiceManager>,
    history: Arc<dyn HistorySink>,
    localizer: Arc<dyn Localizer>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ServiceManager>,
        history: Arc<dyn HistorySink>,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        Self {
            registry,
            history,
            localizer,
        }
    }

    pub fn registry(&self) -> &Arc<ServiceManager> {
        &self.registry
    }

    /// Invoke `capability` on service `service_id`
    pub async fn dispatch(
        &self,
        service_id: &str,
        capability: Capability,
        request: CapabilityRequest,
        cancel: &CancellationToken,
    ) -> Dispatched {
        if cancel.is_cancelled() {
            return Dispatched::Cancelled;
        }

        let Some(lease) = self.registry.acquire(service_id).await else {
            tracing::debug!(service_id = %service_id, "Dispatch to unknown service");
            let err = DispatchError::ServiceNotFound(service_id.to_string());
            return Dispatched::Completed(InvocationResult::Failure(self.failure(&err)));
        };

        let started = Instant::now();
        let attempt = self.invoke(&lease, capability, &request, cancel).await;

        let plugin_id = lease.plugin_id().to_string();
        let result = match attempt {
            None => {
                tracing::debug!(
                    plugin_id = %plugin_id,
                    service_id = %service_id,
                    capability = %capability,
                    "Dispatch cancelled"
                );
                return Dispatched::Cancelled;
            }
            Some(Ok(payload)) => {
                lease.record_success();
                tracing::info!(
                    plugin_id = %plugin_id,
                    service_id = %service_id,
                    capability = %capability,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Dispatch succeeded"
                );
                InvocationResult::Success(payload)
            }
            Some(Err(err)) => {
                lease.record_error(err.to_string());
                tracing::warn!(
                    plugin_id = %plugin_id,
                    service_id = %service_id,
                    capability = %capability,
                    kind = %err.kind(),
                    error = %err,
                    "Dispatch failed"
                );
                InvocationResult::Failure(self.failure(&err))
            }
        };
        drop(lease);

        let record = HistoryRecord::new(plugin_id, service_id, capability, request, &result);
        if let Err(e) = self.history.append(record).await {
            tracing::warn!(service_id = %service_id, error = %e, "Failed to append history");
        }

        Dispatched::Completed(result)
    }

    /// Dispatch `capability` to every enabled service offering it, concurrently
    ///
    /// Results come back in rank order.
    pub async fn dispatch_all(
        &self,
        capability: Capability,
        request: CapabilityRequest,
        cancel: &CancellationToken,
    ) -> Vec<(String, Dispatched)> {
        let services = self.registry.enabled_by_capability(capability);
        let calls = services.iter().map(|service| {
            let request = request.clone();
            async move {
                let dispatched = self
                    .dispatch(service.service_id(), capability, request, cancel)
                    .await;
                (service.service_id().to_string(), dispatched)
            }
        });
        futures::future::join_all(calls).await
    }

    async fn invoke(
        &self,
        service: &Service,
        capability: Capability,
        request: &CapabilityRequest,
        cancel: &CancellationToken,
    ) -> Attempt<Payload> {
        if !service.is_enabled() {
            return Some(Err(DispatchError::ServiceDisabled(
                service.service_id().to_string(),
            )));
        }

        let unsupported = || {
            Some(Err(DispatchError::CapabilityNotSupported {
                service_id: service.service_id().to_string(),
                capability,
            }))
        };
        if !service.supports(capability) {
            return unsupported();
        }

        let provider = service.provider();
        match capability {
            Capability::Translate => {
                let Some(translator) = provider.as_translate() else {
                    return unsupported();
                };
                let (source_code, target_code) = match map_languages(translator, request) {
                    Ok(codes) => codes,
                    Err(e) => return Some(Err(e)),
                };
                if let Err(e) = check_length(translator.max_text_length(), request) {
                    return Some(Err(e));
                }
                let mapped = mapped_request(request, &source_code, &target_code);
                run_guarded(service, cancel, translator.translate(&mapped, cancel))
                    .await
                    .map(|r| r.map(Payload::Text))
            }
            Capability::Dictionary => {
                let Some(dictionary) = provider.as_dictionary() else {
                    return unsupported();
                };
                let (source_code, target_code) = match map_languages(dictionary, request) {
                    Ok(codes) => codes,
                    Err(e) => return Some(Err(e)),
                };
                let mapped = mapped_request(request, &source_code, &target_code);
                run_guarded(service, cancel, dictionary.lookup(&mapped, cancel))
                    .await
                    .map(|r| r.map(Payload::Dictionary))
            }
            Capability::TextToSpeech => {
                let Some(tts) = provider.as_tts() else {
                    return unsupported();
                };
                if let Err(e) = check_length(tts.max_text_length(), request) {
                    return Some(Err(e));
                }
                run_guarded(
                    service,
                    cancel,
                    tts.synthesize(&request.text, request.source_lang, cancel),
                )
                .await
                .map(|r| r.map(Payload::Audio))
            }
        }
    }

    /// User-facing failure, localized for errors the gateway itself detects
    fn failure(&self, err: &DispatchError) -> Failure {
        let l10n = |key: &str| self.localizer.get_translation(key);
        let reason = match err {
            DispatchError::UnsupportedLanguage {
                side: LangSide::Source,
                lang,
            } => format!("{}: {lang}", l10n(keys::UNSUPPORTED_SOURCE_LANG)),
            DispatchError::UnsupportedLanguage {
                side: LangSide::Target,
                lang,
            } => format!("{}: {lang}", l10n(keys::UNSUPPORTED_TARGET_LANG)),
            DispatchError::ServiceNotFound(id) => {
                format!("{}: {id}", l10n(keys::SERVICE_NOT_FOUND))
            }
            DispatchError::ServiceDisabled(id) => {
                format!("{}: {id}", l10n(keys::SERVICE_DISABLED))
            }
            DispatchError::CapabilityNotSupported { capability, .. } => {
                format!("{}: {capability}", l10n(keys::CAPABILITY_NOT_SUPPORTED))
            }
            DispatchError::TextTooLong { len, max } => {
                format!("{} ({len}/{max})", l10n(keys::TEXT_TOO_LONG))
            }
            other => other.to_string(),
        };
        Failure::new(err.kind(), reason)
    }
}

fn map_languages<M>(mapping: &M, request: &CapabilityRequest) -> Result<(String, String), DispatchError>
where
    M: LanguageMapping + ?Sized,
{
    let source = mapping
        .map_source_language(request.source_lang)
        .ok_or(DispatchError::UnsupportedLanguage {
            side: LangSide::Source,
            lang: request.source_lang,
        })?;
    let target = mapping
        .map_target_language(request.target_lang)
        .ok_or(DispatchError::UnsupportedLanguage {
            side: LangSide::Target,
            lang: request.target_lang,
        })?;
    Ok((source, target))
}

fn check_length(max: Option<usize>, request: &CapabilityRequest) -> Result<(), DispatchError> {
    match max {
        Some(max) if request.text_len() > max => Err(DispatchError::TextTooLong {
            len: request.text_len(),
            max,
        }),
        _ => Ok(()),
    }
}

fn mapped_request<'a>(
    request: &'a CapabilityRequest,
    source_code: &'a str,
    target_code: &'a str,
) -> MappedRequest<'a> {
    MappedRequest {
        text: &request.text,
        source_lang: request.source_lang,
        target_lang: request.target_lang,
        source_code,
        target_code,
    }
}

/// Run a provider call under panic isolation, racing caller cancellation and
/// service shutdown
async fn run_guarded<F, T>(service: &Service, cancel: &CancellationToken, call: F) -> Attempt<T>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        _ = service.shutdown_token().cancelled() => None,
        outcome = catch_plugin_panic(call) => match outcome {
            Ok(Ok(value)) => Some(Ok(value)),
            Ok(Err(ProviderError::Cancelled)) => None,
            Ok(Err(e)) => Some(Err(provider_failure(e))),
            Err(msg) => Some(Err(DispatchError::ProviderFailure(format!(
                "Provider panicked: {msg}"
            )))),
        },
    }
}

fn provider_failure(err: ProviderError) -> DispatchError {
    match err {
        ProviderError::Authentication(msg) => DispatchError::AuthenticationFailure(msg),
        ProviderError::Protocol { message, raw } => DispatchError::ProtocolFailure { message, raw },
        ProviderError::Transport(msg) => DispatchError::TransportFailure(msg),
        ProviderError::Storage(e) => DispatchError::StorageFailure(e.to_string()),
        ProviderError::Cancelled => DispatchError::TransportFailure("Operation cancelled".to_string()),
        other => DispatchError::ProviderFailure(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lang::LangEnum;
    use crate::errors::StorageError;

    #[test]
    fn test_provider_failure_mapping() {
        assert_eq!(
            provider_failure(ProviderError::Authentication("401".to_string())).kind(),
            ErrorKind::AuthenticationFailure
        );
        assert_eq!(
            provider_failure(ProviderError::protocol("No result.", "[]")).kind(),
            ErrorKind::ProtocolFailure
        );
        assert_eq!(
            provider_failure(ProviderError::Transport("reset".to_string())).kind(),
            ErrorKind::TransportFailure
        );
        assert_eq!(
            provider_failure(ProviderError::Storage(StorageError::InvalidKey("x".to_string())))
                .kind(),
            ErrorKind::StorageFailure
        );
        assert_eq!(
            provider_failure(ProviderError::Other("quota".to_string())).kind(),
            ErrorKind::ProviderFailure
        );
    }

    #[test]
    fn test_check_length() {
        let request = CapabilityRequest::new(LangEnum::Auto, LangEnum::French, "abcd");
        assert!(check_length(None, &request).is_ok());
        assert!(check_length(Some(4), &request).is_ok());
        assert_eq!(
            check_length(Some(3), &request),
            Err(DispatchError::TextTooLong { len: 4, max: 3 })
        );
    }

    #[test]
    fn test_invocation_result_accessors() {
        let ok = InvocationResult::Success(Payload::Text("bonjour".to_string()));
        assert!(ok.is_success());
        assert_eq!(ok.text(), Some("bonjour"));
        assert!(ok.failure().is_none());

        let failed = InvocationResult::Failure(Failure::new(ErrorKind::TransportFailure, "reset"));
        assert!(!failed.is_success());
        assert_eq!(failed.failure().map(|f| f.reason.as_str()), Some("reset"));
        assert_eq!(Dispatched::Completed(failed).into_result().map(|r| r.is_success()), Some(false));
        assert!(Dispatched::Cancelled.result().is_none());
    }
}
