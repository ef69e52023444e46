use thiserror::Error;

/// Fixed ASCII signature at offset 0 of every BK container.
pub const SIGNATURE: &[u8; 3] = b"HE3";
/// Width of the right-padded version text that follows the signature.
pub const VERSION_LEN: usize = 4;
/// Version text written into freshly synthesized containers.
pub const VERSION: &str = "1.0";

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Invalid signature: expected \"HE3\", found {}", String::from_utf8_lossy(.found))]
    InvalidSignature { found: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub signature: [u8; 3],
    pub version: String,
    /// Length of the whole buffer; computed, never stored.
    pub size: usize,
}

impl Header {
    /// Bytes of a freshly synthesized header: signature followed by the
    /// space-padded version text.
    pub fn synthesize(version: &str) -> Vec<u8> {
        let mut out = SIGNATURE.to_vec();
        let mut v = version.as_bytes().to_vec();
        v.resize(VERSION_LEN, b' ');
        out.extend_from_slice(&v[..VERSION_LEN]);
        out
    }

    pub fn check_signature(data: &[u8]) -> Result<(), HeaderError> {
        if data.len() < SIGNATURE.len() || &data[..SIGNATURE.len()] != SIGNATURE {
            return Err(HeaderError::InvalidSignature {
                found: data[..data.len().min(SIGNATURE.len())].to_vec(),
            });
        }
        Ok(())
    }

    pub fn parse(data: &[u8]) -> Result<Self, HeaderError> {
        Self::check_signature(data)?;
        let end = data.len().min(SIGNATURE.len() + VERSION_LEN);
        let version = String::from_utf8_lossy(&data[SIGNATURE.len()..end])
            .trim()
            .to_string();
        Ok(Self {
            signature: *SIGNATURE,
            version,
            size: data.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_header_parses_back() {
        let bytes = Header::synthesize(VERSION);
        assert_eq!(bytes, b"HE31.0 ");
        let h = Header::parse(&bytes).unwrap();
        assert_eq!(h.version, "1.0");
        assert_eq!(h.size, 7);
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let err = Header::parse(b"HE41.0 ").unwrap_err();
        assert!(matches!(err, HeaderError::InvalidSignature { ref found } if found == b"HE4"));
    }

    #[test]
    fn short_buffers_are_rejected() {
        assert!(Header::parse(b"").is_err());
        assert!(Header::parse(b"HE").is_err());
    }

    #[test]
    fn bare_signature_has_empty_version() {
        let h = Header::parse(b"HE3").unwrap();
        assert_eq!(h.version, "");
        assert_eq!(h.size, 3);
    }
}
