//! Settings for the Edge TTS provider.

use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::settings::{ScopedSettings, SettingsView, Subscription};
use crate::utils::url_validation::{UrlValidationError, validate_endpoint_url};

pub const DEFAULT_VOICE: &str = "zh-CN-XiaoxiaoNeural";
pub const DEFAULT_STYLE: &str = "general";

/// Per-service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeTtsSettings {
    /// Synthesis endpoint; empty until the user configures one
    pub url: String,
    pub voice: String,
    /// Speaking rate multiplier, one decimal
    pub speed: f64,
    /// Pitch offset in Hz
    pub pitch: i32,
    pub style: String,
}

impl Default for EdgeTtsSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            voice: DEFAULT_VOICE.to_string(),
            speed: 1.0,
            pitch: 0,
            style: DEFAULT_STYLE.to_string(),
        }
    }
}

/// Round to the single decimal the endpoint understands
pub fn round_speed(speed: f64) -> f64 {
    (speed * 10.0).round() / 10.0
}

#[derive(Debug, thiserror::Error)]
pub enum EdgeSettingsError {
    #[error("Invalid endpoint: {0}")]
    InvalidUrl(#[from] UrlValidationError),

    /// Speeds must stay finite and positive so the blob reads back
    #[error("Invalid speed: {0}")]
    InvalidSpeed(f64),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Live editor over one service's Edge TTS settings
///
/// Each setter writes a single field and saves the whole blob before
/// returning.
pub struct EdgeTtsSettingsEditor {
    view: SettingsView<EdgeTtsSettings>,
}

impl EdgeTtsSettingsEditor {
    pub fn open(settings: &ScopedSettings) -> Result<Self, EdgeSettingsError> {
        Ok(Self {
            view: settings.view::<EdgeTtsSettings>()?,
        })
    }

    pub fn get(&self) -> EdgeTtsSettings {
        self.view.get()
    }

    /// Set the endpoint; rejected URLs leave the stored value untouched
    pub fn set_url(&self, url: &str) -> Result<(), EdgeSettingsError> {
        let parsed = validate_endpoint_url(url)?;
        self.view.update(|s| s.url = parsed.to_string())?;
        Ok(())
    }

    pub fn set_voice(&self, voice: impl Into<String>) -> Result<(), EdgeSettingsError> {
        let voice = voice.into();
        self.view.update(|s| s.voice = voice)?;
        Ok(())
    }

    /// Set the rate; non-finite or non-positive values leave it untouched
    pub fn set_speed(&self, speed: f64) -> Result<(), EdgeSettingsError> {
        let rounded = round_speed(speed);
        if !rounded.is_finite() || rounded <= 0.0 {
            return Err(EdgeSettingsError::InvalidSpeed(speed));
        }
        self.view.update(|s| s.speed = rounded)?;
        Ok(())
    }

    pub fn set_pitch(&self, pitch: i32) -> Result<(), EdgeSettingsError> {
        self.view.update(|s| s.pitch = pitch)?;
        Ok(())
    }

    pub fn set_style(&self, style: impl Into<String>) -> Result<(), EdgeSettingsError> {
        let style = style.into();
        self.view.update(|s| s.style = style)?;
        Ok(())
    }

    /// Observe every saved change
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&EdgeTtsSettings) + Send + Sync + 'static,
    {
        self.view.subscribe(observer)
    }
}
