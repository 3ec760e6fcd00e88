//! Payload decoding.

use base64::{engine::general_purpose, Engine as _};

use crate::error::StepResult;

/// Turns a transport-encoded payload into raw image bytes
pub trait ImageCodec: Send + Sync + 'static {
    fn decode(&self, payload: &str) -> StepResult<Vec<u8>>;
}

/// Standard-alphabet, padded base64
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64ImageCodec;

impl ImageCodec for Base64ImageCodec {
    fn decode(&self, payload: &str) -> StepResult<Vec<u8>> {
        Ok(general_purpose::STANDARD.decode(payload)?)
    }
}
