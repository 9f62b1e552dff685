//! Speech providers.
//!
//! Transcription turns recorded audio into command text before the rest of
//! the pipeline runs. Synthesis turns a composed message into audio.

use crate::error::SpeechError;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use robohr_core::SpeechConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Audio to text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8], language: &str) -> Result<String, SpeechError>;
}

/// Text to audio.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str) -> Result<SynthesizedSpeech, SpeechError>;
}

/// Result of a synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesizedSpeech {
    /// The provider stored the audio and returned a reference to it.
    Url(String),
    /// The provider answered with the audio itself.
    Inline { content_type: String, audio: Vec<u8> },
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    #[serde(default)]
    transcript: String,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct SynthesisResponse {
    #[serde(default)]
    audio_url: String,
}

/// Client for the speech endpoints of the AI service.
#[derive(Debug, Clone)]
pub struct HttpSpeechClient {
    client: Client,
    base_url: String,
    max_audio_bytes: usize,
}

impl HttpSpeechClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        max_audio_bytes: usize,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_audio_bytes,
        })
    }

    pub fn from_config(config: &SpeechConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
            config.max_audio_bytes,
        )
    }

    fn unavailable(err: reqwest::Error) -> SpeechError {
        SpeechError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl Transcriber for HttpSpeechClient {
    async fn transcribe(&self, audio: &[u8], language: &str) -> Result<String, SpeechError> {
        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        if audio.len() > self.max_audio_bytes {
            return Err(SpeechError::PayloadTooLarge {
                size: audio.len(),
                limit: self.max_audio_bytes,
            });
        }

        let part = Part::bytes(audio.to_vec()).file_name("command.wav");
        let form = Form::new().part("audio_file", part);
        let response = self
            .client
            .post(format!("{}/speech-to-text", self.base_url))
            .query(&[("language", language)])
            .multipart(form)
            .send()
            .await
            .map_err(Self::unavailable)?;
        if !response.status().is_success() {
            return Err(SpeechError::Unavailable(format!(
                "speech-to-text answered with status {}",
                response.status()
            )));
        }

        let body: TranscriptResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::MalformedResponse(e.to_string()))?;
        tracing::debug!(bytes = audio.len(), chars = body.transcript.len(), "Audio transcribed");
        Ok(body.transcript.trim().to_string())
    }
}

#[async_trait]
impl Synthesizer for HttpSpeechClient {
    async fn synthesize(&self, text: &str, language: &str) -> Result<SynthesizedSpeech, SpeechError> {
        let response = self
            .client
            .post(format!("{}/text-to-speech", self.base_url))
            .json(&SynthesisRequest { text, lang: language })
            .send()
            .await
            .map_err(Self::unavailable)?;
        if !response.status().is_success() {
            return Err(SpeechError::Unavailable(format!(
                "text-to-speech answered with status {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if content_type.starts_with("audio/") {
            let audio = response.bytes().await.map_err(Self::unavailable)?;
            return Ok(SynthesizedSpeech::Inline {
                content_type,
                audio: audio.to_vec(),
            });
        }

        let body: SynthesisResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::MalformedResponse(e.to_string()))?;
        if body.audio_url.is_empty() {
            return Err(SpeechError::MalformedResponse("response carries no audio_url".to_string()));
        }
        Ok(SynthesizedSpeech::Url(body.audio_url))
    }
}

/// Stand-in used when no speech provider is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSpeech;

#[async_trait]
impl Transcriber for DisabledSpeech {
    async fn transcribe(&self, _audio: &[u8], _language: &str) -> Result<String, SpeechError> {
        Err(SpeechError::Disabled)
    }
}

#[async_trait]
impl Synthesizer for DisabledSpeech {
    async fn synthesize(&self, _text: &str, _language: &str) -> Result<SynthesizedSpeech, SpeechError> {
        Err(SpeechError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Multipart, Query};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_transcribe_uploads_audio() {
        let router = Router::new().route(
            "/speech-to-text",
            post(
                |Query(q): Query<HashMap<String, String>>, mut multipart: Multipart| async move {
                    let field = multipart.next_field().await.unwrap().unwrap();
                    assert_eq!(field.name(), Some("audio_file"));
                    let bytes = field.bytes().await.unwrap();
                    Json(json!({
                        "success": true,
                        "transcript": format!(" clock in {} ", bytes.len()),
                        "language": q.get("language").cloned().unwrap_or_default(),
                    }))
                },
            ),
        );
        let client = HttpSpeechClient::new(serve(router).await, Duration::from_secs(2), 1024).unwrap();
        let text = client.transcribe(&[1, 2, 3], "en").await.unwrap();
        assert_eq!(text, "clock in 3");
    }

    #[tokio::test]
    async fn test_transcribe_limits() {
        let client = HttpSpeechClient::new("http://127.0.0.1:9", Duration::from_millis(300), 4).unwrap();
        assert_eq!(client.transcribe(&[], "en").await.unwrap_err(), SpeechError::EmptyAudio);
        assert_eq!(
            client.transcribe(&[0; 5], "en").await.unwrap_err(),
            SpeechError::PayloadTooLarge { size: 5, limit: 4 }
        );
        assert!(matches!(
            client.transcribe(&[0; 2], "en").await.unwrap_err(),
            SpeechError::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_synthesize_returns_url() {
        let router = Router::new().route(
            "/text-to-speech",
            post(|Json(body): Json<Value>| async move {
                Json(json!({"success": true, "audio_url": format!("/audio/{}.mp3", body["lang"].as_str().unwrap_or("x"))}))
            }),
        );
        let client = HttpSpeechClient::new(serve(router).await, Duration::from_secs(2), 1024).unwrap();
        let speech = client.synthesize("hello", "fr").await.unwrap();
        assert_eq!(speech, SynthesizedSpeech::Url("/audio/fr.mp3".to_string()));
    }

    #[tokio::test]
    async fn test_disabled() {
        assert_eq!(DisabledSpeech.transcribe(&[1], "en").await.unwrap_err(), SpeechError::Disabled);
        assert_eq!(DisabledSpeech.synthesize("hi", "en").await.unwrap_err(), SpeechError::Disabled);
    }
}
