//! Text-to-speech (TTS) over an OpenAI-compatible `/audio/speech` endpoint

use async_trait::async_trait;
use serde::Serialize;

use crate::config::VoiceConfig;
use crate::providers::Synthesizer;
use crate::{Error, Result};

/// Synthesizes WAV audio from reply text
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    voice: String,
    speed: f32,
    model: String,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
}

impl TextToSpeech {
    /// Create a TTS client from voice configuration and its API key
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn from_config(config: &VoiceConfig, api_key: Option<String>) -> Result<Self> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config("API key required for TTS".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            voice: config.voice.clone(),
            speed: config.speed,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Synthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tracing::debug!(chars = text.chars().count(), voice = %self.voice, "synthesizing audio");

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
            response_format: "wav",
        };

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("speech endpoint returned {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
