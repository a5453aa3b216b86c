use crate::EncodingError;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationNanoSeconds};
use std::time::Duration;
use time::OffsetDateTime;

/// Outcome of firing a single target.
///
/// Encoded on the wire as one JSON object per line.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackResult {
    pub attack: String,
    pub seq: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde_as(as = "DurationNanoSeconds<u64>")]
    pub latency: Duration,
    #[serde(rename = "code")]
    pub status_code: u16,
    #[serde(default)]
    pub body: String,
    pub bytes_in: u64,
    pub bytes_out: u64,
    #[serde(default)]
    pub error: String,
}

impl AttackResult {
    pub fn is_success(&self) -> bool {
        self.error.is_empty() && (200..300).contains(&self.status_code)
    }

    /// Time at which the response (or failure) was observed.
    pub fn end(&self) -> OffsetDateTime {
        self.timestamp + self.latency
    }

    /// JSON encoding terminated by a newline.
    pub fn encode_line(&self) -> Result<Vec<u8>, EncodingError> {
        let mut bytes = serde_json::to_vec(self).map_err(EncodingError::Encode)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Decodes a newline-delimited stream of attack results. Blank lines are ignored.
pub fn decode_results(bytes: &[u8]) -> Result<Vec<AttackResult>, EncodingError> {
    bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
        .map(|(idx, line)| {
            serde_json::from_slice(line).map_err(|source| EncodingError::Decode {
                line: idx + 1,
                source,
            })
        })
        .collect()
}
