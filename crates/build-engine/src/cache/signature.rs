//! File content signatures
//!
//! A signature is the file length plus a SHA-256 digest of its bytes. The
//! modification time is kept for diagnostics only and never decides
//! freshness on its own.

use std::io::Read;
use std::path::Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identity of a file's content at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSignature {
    /// File length in bytes
    pub len: u64,
    /// Last modification time, when the platform reports one
    pub modified: Option<DateTime<Utc>>,
    /// Hex-encoded SHA-256 of the content
    pub sha256: String,
}

impl FileSignature {
    /// Compute the signature of the file at `path`
    pub fn compute(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let sha256 = digest_file(path)?;

        Ok(Self {
            len: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            sha256,
        })
    }

    /// Signature of `bytes` already read from a file
    ///
    /// Lets a reader record exactly the content it processed, even if the
    /// file changes afterwards.
    pub fn of_bytes(bytes: &[u8], modified: Option<DateTime<Utc>>) -> Self {
        Self {
            len: bytes.len() as u64,
            modified,
            sha256: hex::encode(Sha256::digest(bytes)),
        }
    }

    /// Whether the file at `path` still has this content
    ///
    /// Unreadable files never match.
    pub fn matches(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() && metadata.len() == self.len => {}
            _ => return false,
        }
        match digest_file(path) {
            Ok(sha256) => sha256 == self.sha256,
            Err(_) => false,
        }
    }
}

fn digest_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("R.txt");
        std::fs::write(&path, "int id icon 0x1\n").unwrap();

        let signature = FileSignature::compute(&path).unwrap();
        assert_eq!(signature.len, 16);
        assert_eq!(signature.sha256.len(), 64);
        assert!(signature.matches(&path));

        // same length, different bytes
        std::fs::write(&path, "int id icon 0x2\n").unwrap();
        assert!(!signature.matches(&path));
    }

    #[test]
    fn test_bytes_signature_matches_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("R.txt");
        let content = b"int id icon 0x1\nint id logo 0x2\n";
        std::fs::write(&path, content).unwrap();

        let from_bytes = FileSignature::of_bytes(content, None);
        assert_eq!(from_bytes.sha256, FileSignature::compute(&path).unwrap().sha256);
        assert!(from_bytes.matches(&path));

        std::fs::write(&path, "int id icon 0x1\n").unwrap();
        assert!(!from_bytes.matches(&path));
    }

    #[test]
    fn test_missing_file_never_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("R.txt");
        std::fs::write(&path, "").unwrap();
        let signature = FileSignature::compute(&path).unwrap();

        std::fs::remove_file(&path).unwrap();
        assert!(!signature.matches(&path));
        assert!(FileSignature::compute(&path).is_err());
    }
}
