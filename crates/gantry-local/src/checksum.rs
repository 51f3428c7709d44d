//! SHA-256 checksums in the `sha256:<hex>` format

use std::path::Path;

use sha2::{Digest, Sha256};

const PREFIX: &str = "sha256:";

pub async fn file_checksum(path: &Path) -> std::io::Result<String> {
    let content = tokio::fs::read(path).await?;
    Ok(bytes_checksum(&content))
}

pub fn bytes_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_value() {
        assert_eq!(
            bytes_checksum(b"hello"),
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
