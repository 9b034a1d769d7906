// Audio Container Encoder: PCM from the speech model → playable WAV.

pub mod wav;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Invalid PCM format: {0}")]
    InvalidFormat(String),

    #[error("PCM buffer of {len} bytes is not a whole number of {frame}-byte frames")]
    MisalignedBuffer { len: usize, frame: usize },

    #[error("WAV encoder error: {0}")]
    Encoder(#[from] hound::Error),
}
