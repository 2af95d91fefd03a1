use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

/// Hex encoded SHA-256 digest of an artifact
pub fn compute_fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Decode an artifact submitted as standard base64
pub fn decode_artifact(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::STANDARD.decode(encoded.trim())
}
