//! Block preimage encoding
//!
//! The text fed to the digest for a block is produced here and nowhere else.
//! Miner and verifier must see exactly the same string.

use serde::{Deserialize, Serialize};

/// Preimage layouts understood by the lab
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreimageVersion {
    /// `previous_fingerprint + data + timestamp + nonce`, no separators
    #[default]
    V1,
}

impl PreimageVersion {
    /// Everything before the nonce. The search appends the decimal nonce.
    pub fn prefix(self, previous_fingerprint: &str, data: &str, timestamp: &str) -> String {
        match self {
            PreimageVersion::V1 => {
                let mut out = String::with_capacity(
                    previous_fingerprint.len() + data.len() + timestamp.len() + 20,
                );
                out.push_str(previous_fingerprint);
                out.push_str(data);
                out.push_str(timestamp);
                out
            }
        }
    }

    /// Full preimage for a given nonce
    pub fn preimage(
        self,
        previous_fingerprint: &str,
        data: &str,
        timestamp: &str,
        nonce: u64,
    ) -> String {
        let mut out = self.prefix(previous_fingerprint, data, timestamp);
        append_nonce(&mut out, nonce);
        out
    }
}

/// Workbench block with no predecessor: `data + timestamp`, nonce appended
/// by the search
pub fn standalone_prefix(data: &str, timestamp: &str) -> String {
    let mut out = String::with_capacity(data.len() + timestamp.len() + 20);
    out.push_str(data);
    out.push_str(timestamp);
    out
}

/// Hand-entered nonce preview: `data + nonce`, no timestamp
pub fn preview_preimage(data: &str, nonce: u64) -> String {
    let mut out = String::with_capacity(data.len() + 20);
    out.push_str(data);
    append_nonce(&mut out, nonce);
    out
}

/// Append the decimal nonce, the only nonce rendering used anywhere
pub fn append_nonce(prefix: &mut String, nonce: u64) {
    use std::fmt::Write as _;
    let _ = write!(prefix, "{nonce}");
}
