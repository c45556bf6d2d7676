//! SHA-256 checksum utility for recording what a version applied.

use sha2::{Digest, Sha256};

/// Compute one SHA256 checksum over several script bodies, in order.
///
/// Each body is length-prefixed so that moving text between two adjacent
/// files changes the digest.
pub fn compute_files_checksum<'a, I>(contents: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Sha256::new();
    for content in contents {
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(content.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_checksum_respects_boundaries() {
        let a = compute_files_checksum(["ab", "c"]);
        let b = compute_files_checksum(["a", "bc"]);
        assert_ne!(a, b);
        assert_eq!(a, compute_files_checksum(vec!["ab", "c"]));
        assert_eq!(compute_files_checksum([""]).len(), 64);
    }
}
