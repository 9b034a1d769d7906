//! Speech Synthesis: text to a playable WAV data URI.
//!
//! Flow: validate → TTS model call → decode base64 PCM → WAV container → data URI.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audio::wav::{encode_wav, PcmFormat};
use crate::data_uri::DataUri;
use crate::errors::AppError;
use crate::flows::model_error;
use crate::llm_client::{GenerativeModel, ModelRequest, OutputMode, PromptPart, TTS_VOICE};
use crate::validation::validate_speech_text;

pub const NO_MEDIA_MESSAGE: &str = "No media was returned from the text-to-speech model.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechAudio {
    /// `data:audio/wav;base64,...`
    pub media: String,
}

pub async fn synthesize_speech(
    model: &dyn GenerativeModel,
    text: &str,
) -> Result<SpeechAudio, AppError> {
    validate_speech_text(text)?;
    info!(chars = text.len(), voice = TTS_VOICE, "Synthesizing speech");

    let model_request = ModelRequest::new(
        vec![PromptPart::text(text)],
        OutputMode::Speech {
            voice: TTS_VOICE.to_string(),
        },
    );

    let response = model
        .generate(model_request)
        .await
        .map_err(|e| model_error("Speech synthesis", e))?;

    let media = response
        .media
        .filter(|m| !m.data.is_empty())
        .ok_or_else(|| AppError::ModelOutput(NO_MEDIA_MESSAGE.to_string()))?;

    let pcm = DataUri {
        mime_type: media.mime_type.clone(),
        data: media.data,
    }
    .decode()
    .map_err(|e| AppError::ModelOutput(format!("Audio payload is not valid base64: {e}")))?;

    let wav = encode_wav(&pcm, PcmFormat::from_mime_type(&media.mime_type))
        .map_err(|e| AppError::ModelOutput(format!("Audio encoding failed: {e}")))?;

    Ok(SpeechAudio {
        media: DataUri::from_bytes("audio/wav", &wav).to_string(),
    })
}
