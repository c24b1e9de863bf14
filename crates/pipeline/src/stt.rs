//! Speech-to-text wiring: HTTP recognizer service and the null engine

use async_trait::async_trait;
use seance_config::SpeechConfig;
use seance_core::{Error, Result, SampleRate, SpeechToText, Transcript};
use serde::Deserialize;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Recognizer behind an HTTP transcription endpoint. The utterance is
/// shipped as a 16-bit mono WAV in a multipart form; the service answers
/// with the transcript as JSON.
pub struct HttpStt {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
    #[serde(default = "default_confidence")]
    confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl HttpStt {
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.stt_timeout_secs))
            .build()
            .map_err(|e| Error::capture(format!("http client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.stt_endpoint.clone(),
        })
    }

    fn encode_wav(samples: &[f32], sample_rate: SampleRate) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: sample_rate.as_u32(),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| Error::capture(format!("wav header: {e}")))?;
            for &sample in samples {
                let pcm = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
                writer
                    .write_sample(pcm)
                    .map_err(|e| Error::capture(format!("wav sample: {e}")))?;
            }
            writer
                .finalize()
                .map_err(|e| Error::capture(format!("wav finalize: {e}")))?;
        }
        Ok(cursor.into_inner())
    }
}

#[async_trait]
impl SpeechToText for HttpStt {
    async fn transcribe(&self, samples: &[f32], sample_rate: SampleRate) -> Result<Transcript> {
        let wav = Self::encode_wav(samples, sample_rate)?;
        debug!(bytes = wav.len(), "sending utterance for transcription");

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::capture(format!("multipart: {e}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::capture(format!("transcription request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::capture(format!("recognizer returned {status}")));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| Error::capture(format!("transcription body: {e}")))?;

        Ok(Transcript::new(parsed.text.trim(), parsed.confidence))
    }

    fn engine_name(&self) -> &str {
        "http"
    }
}

/// Recognizer used when no endpoint is configured: hears nothing. Every
/// utterance comes back empty, so the conversation quietly idles.
pub struct NullStt;

#[async_trait]
impl SpeechToText for NullStt {
    async fn transcribe(&self, _samples: &[f32], _sample_rate: SampleRate) -> Result<Transcript> {
        Ok(Transcript::default())
    }

    fn engine_name(&self) -> &str {
        "null"
    }
}

/// Pick the recognizer for the configured endpoint
pub fn create_speech_to_text(config: &SpeechConfig) -> Arc<dyn SpeechToText> {
    if config.stt_endpoint.is_empty() {
        warn!("no transcription endpoint configured, recognizer disabled");
        return Arc::new(NullStt);
    }
    match HttpStt::new(config) {
        Ok(stt) => {
            info!(endpoint = %config.stt_endpoint, "using http recognizer");
            Arc::new(stt)
        },
        Err(err) => {
            warn!(%err, "failed to build http recognizer, recognizer disabled");
            Arc::new(NullStt)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_encoding_header_and_size() {
        let samples = vec![0.25_f32; 1600];
        let wav = HttpStt::encode_wav(&samples, SampleRate::Hz16000).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte header + 2 bytes per sample
        assert_eq!(wav.len(), 44 + 1600 * 2);
    }

    #[test]
    fn test_response_parsing_defaults_confidence() {
        let parsed: TranscriptionResponse =
            serde_json::from_str(r#"{"text":"what is my future"}"#).unwrap();
        assert_eq!(parsed.text, "what is my future");
        assert_eq!(parsed.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_null_stt_hears_nothing() {
        let transcript = NullStt
            .transcribe(&[0.5; 320], SampleRate::Hz16000)
            .await
            .unwrap();
        assert!(transcript.is_empty());
    }
}
