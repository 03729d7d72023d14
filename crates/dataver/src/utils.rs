use std::fmt::Write;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::DataverResult;

const BUFFER_SIZE: usize = 8192;

/// Returns the lowercase hex representation of a digest.
#[inline]
pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Returns the SHA256 digest of the given bytes.
#[inline]
pub(crate) fn sha256_hex<B: AsRef<[u8]>>(data: B) -> String {
    to_hex(&Sha256::digest(data.as_ref()))
}

/// Returns the SHA256 digest and the size of a file, which is read in
/// chunks.
pub(crate) fn file_digest<P: AsRef<Path>>(
    path: P,
) -> DataverResult<(String, u64)> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut hasher = Sha256::new();
    let mut size = 0;

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }

        hasher.update(&buffer[..n]);
        size += n as u64;
    }

    Ok((to_hex(&hasher.finalize()), size))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    type TestResult = anyhow::Result<()>;

    #[test]
    fn sha256_known_values() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex("hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn to_hex_pads() {
        assert_eq!(to_hex(&[0x00, 0x0f, 0xff]), "000fff");
    }

    #[test]
    fn file_digest_matches() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"hello world")?;
        file.flush()?;

        let (digest, size) = file_digest(file.path())?;
        assert_eq!(digest, sha256_hex("hello world"));
        assert_eq!(size, 11);

        Ok(())
    }
}
