//! Embedding blob encoding.
//!
//! Embedding artifacts are persisted as a blob (spec §4.8.9: VectorIngest
//! "resolve[s] the embedding blob (float list)"). The source writes a
//! numpy `.npy` array; there is no numpy-format encoder crate in this
//! workspace's dependency stack, so the blob is the compact JSON
//! encoding of the float vector instead, under the same `.npy`-suffixed
//! object key spec §3.1 names. `decode_embedding` is the only reader,
//! so the on-disk shape is an internal detail.

use ingest_error::{IngestResult, JsonError};

/// Serialize an embedding vector to its blob bytes.
pub fn encode_embedding(vector: &[f32]) -> IngestResult<Vec<u8>> {
    serde_json::to_vec(vector).map_err(|e| JsonError::new(e.to_string()).into())
}

/// Parse an embedding blob back into a float vector.
pub fn decode_embedding(bytes: &[u8]) -> IngestResult<Vec<f32>> {
    serde_json::from_slice(bytes).map_err(|e| JsonError::new(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_a_vector() {
        let v = vec![0.1_f32, -0.2, 3.5];
        let bytes = encode_embedding(&v).unwrap();
        assert_eq!(decode_embedding(&bytes).unwrap(), v);
    }
}
