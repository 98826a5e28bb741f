use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Lowercase hex SHA-256 of a source document, as recorded in task details.
/// The file is streamed through the hasher, never loaded whole.
pub fn document_digest(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const EMPTY_DIGEST: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn empty_document_known_vector() {
        let f = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(document_digest(f.path()).unwrap(), EMPTY_DIGEST);
    }

    #[test]
    fn known_vector_for_short_payload() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"abc").unwrap();
        assert_eq!(
            document_digest(f.path()).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn large_document_matches_one_shot_digest() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        let payload = vec![0x25u8; 200_000];
        f.write_all(&payload).unwrap();
        let expected: String = Sha256::digest(&payload)
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        assert_eq!(document_digest(f.path()).unwrap(), expected);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(document_digest(Path::new("/nonexistent/statement.pdf")).is_err());
    }
}
