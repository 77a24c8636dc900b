//! Stable ID generation.
//!
//! Content-addressable ids use SHA-256 (spec §3: `content_hash` "is a
//! cryptographic digest of the file bytes"), truncated to
//! `constants::hashing::HASH_LENGTH` hex characters where a short id is
//! wanted.

use sha2::{Digest, Sha256};

use crate::shared::constants::hashing::HASH_LENGTH;

pub struct IdGenerator;

impl IdGenerator {
    /// Generate a file's `content_hash` (spec §3 Module).
    pub fn generate_file_id(repo_id: &str, file_path: &str) -> String {
        let input = format!("{repo_id}:file:{file_path}");
        Self::hash_to_hex(&input)
    }

    /// Generate a CPG node id for a synthetic node with no backing
    /// `ast_id` (spec §4.5 phases 2/3: `merge`, phi nodes).
    pub fn generate_synthetic_node_id(function_id: &str, kind: &str, ordinal: usize) -> String {
        format!("cpg:{function_id}:{kind}:{ordinal}")
    }

    fn hash_to_hex(input: &str) -> String {
        let digest = Sha256::digest(input.as_bytes());
        let hex = format!("{digest:x}");
        hex[..HASH_LENGTH.min(hex.len())].to_string()
    }
}

/// Content hash for change detection (spec §3 Module invariant: "equal hash
/// ⇒ no re-analysis needed").
pub fn content_hash(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_deterministic() {
        let h1 = content_hash(b"defmodule A do end");
        let h2 = content_hash(b"defmodule A do end");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_content_hash_sensitive_to_change() {
        let h1 = content_hash(b"defmodule A do end");
        let h2 = content_hash(b"defmodule B do end");
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_file_id_deterministic() {
        let id1 = IdGenerator::generate_file_id("repo", "file.ex");
        let id2 = IdGenerator::generate_file_id("repo", "file.ex");
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_synthetic_node_id_format() {
        let id = IdGenerator::generate_synthetic_node_id("M.f/1", "merge", 0);
        assert_eq!(id, "cpg:M.f/1:merge:0");
    }
}
