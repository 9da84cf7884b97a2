//! Save blob encoding.
//!
//! A blob is the JSON form of [`SaveGameData`]. Decoding ignores unknown
//! fields, and an empty blob decodes to an empty save (every node Locked at
//! level 0).

use skilltree_types::SaveGameData;

/// Errors from encoding or decoding a save blob.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Save data could not be serialized.
    #[error("failed to encode save data: {0}")]
    Encode(#[source] serde_json::Error),

    /// The blob is not valid save data.
    #[error("failed to decode save data: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Serialize save data to a blob.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode(data: &SaveGameData) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(data).map_err(CodecError::Encode)
}

/// Deserialize a blob into save data.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the blob is not valid save data.
pub fn decode(blob: &[u8]) -> Result<SaveGameData, CodecError> {
    if blob.iter().all(u8::is_ascii_whitespace) {
        return Ok(SaveGameData::default());
    }
    serde_json::from_slice(blob).map_err(CodecError::Decode)
}
