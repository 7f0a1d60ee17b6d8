//! Content sniffing
//!
//! Derives a media type from the leading bytes of a payload using magic-byte
//! signatures. Caller-supplied names and content types play no part in it.

use std::io::{self, SeekFrom};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

use upgate_core::models::policy::DEFAULT_SNIFF_BYTES;

pub const TEXT_PLAIN: &str = "text/plain";
pub const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy)]
pub struct ContentSniffer {
    sniff_bytes: usize,
}

impl Default for ContentSniffer {
    fn default() -> Self {
        Self::new(DEFAULT_SNIFF_BYTES)
    }
}

impl ContentSniffer {
    pub fn new(sniff_bytes: usize) -> Self {
        Self {
            sniff_bytes: sniff_bytes.max(1),
        }
    }

    pub fn sniff_bytes(&self) -> usize {
        self.sniff_bytes
    }

    /// Media type of a byte prefix.
    ///
    /// Only the first `sniff_bytes` bytes are considered. Without a matching
    /// signature, UTF-8 text without NUL bytes is `text/plain` and anything
    /// else (including an empty prefix) is `application/octet-stream`.
    pub fn sniff(&self, data: &[u8]) -> String {
        let prefix = &data[..data.len().min(self.sniff_bytes)];

        if let Some(kind) = infer::get(prefix) {
            return kind.mime_type().to_string();
        }

        if !prefix.is_empty() && !prefix.contains(&0) && is_utf8_prefix(prefix) {
            return TEXT_PLAIN.to_string();
        }

        OCTET_STREAM.to_string()
    }

    /// Sniff the start of a seekable reader and rewind it to offset 0.
    pub async fn sniff_reader<R>(&self, reader: &mut R) -> io::Result<String>
    where
        R: AsyncRead + AsyncSeek + Unpin,
    {
        reader.seek(SeekFrom::Start(0)).await?;

        let mut prefix = Vec::with_capacity(self.sniff_bytes);
        (&mut *reader)
            .take(self.sniff_bytes as u64)
            .read_to_end(&mut prefix)
            .await?;

        reader.seek(SeekFrom::Start(0)).await?;

        Ok(self.sniff(&prefix))
    }
}

/// UTF-8 check that tolerates a multi-byte sequence cut off by the prefix limit.
fn is_utf8_prefix(prefix: &[u8]) -> bool {
    match std::str::from_utf8(prefix) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && prefix.len() - e.valid_up_to() < 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_sniff_images_and_pdf() {
        let sniffer = ContentSniffer::default();
        assert_eq!(sniffer.sniff(PNG), "image/png");
        assert_eq!(sniffer.sniff(JPEG), "image/jpeg");
        assert_eq!(sniffer.sniff(b"GIF89a\x01\x00\x01\x00"), "image/gif");
        assert_eq!(sniffer.sniff(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3"), "application/pdf");
    }

    #[test]
    fn test_sniff_text_fallback() {
        let sniffer = ContentSniffer::default();
        assert_eq!(sniffer.sniff(b"<?php echo 'hi'; ?>"), TEXT_PLAIN);
        assert_eq!(sniffer.sniff("héllo wörld".as_bytes()), TEXT_PLAIN);
    }

    #[test]
    fn test_sniff_binary_fallback() {
        let sniffer = ContentSniffer::default();
        assert_eq!(sniffer.sniff(&[0x00, 0x01, 0x02, 0xFE]), OCTET_STREAM);
        assert_eq!(sniffer.sniff(b"text\0with nul"), OCTET_STREAM);
        assert_eq!(sniffer.sniff(&[]), OCTET_STREAM);
    }

    #[test]
    fn test_sniff_ignores_bytes_past_prefix() {
        let sniffer = ContentSniffer::new(8);
        let mut data = b"plain ascii".to_vec();
        data.push(0);
        assert_eq!(sniffer.sniff(&data), TEXT_PLAIN);
    }

    #[test]
    fn test_sniff_tolerates_split_multibyte_char() {
        let text = "aaaé".as_bytes();
        let sniffer = ContentSniffer::new(4);
        assert_eq!(sniffer.sniff(text), TEXT_PLAIN);
    }

    #[tokio::test]
    async fn test_sniff_reader_rewinds() {
        let sniffer = ContentSniffer::default();
        let mut data = PNG.to_vec();
        data.extend_from_slice(&[0xAB; 4096]);
        let mut reader = Cursor::new(data.clone());

        let media_type = sniffer.sniff_reader(&mut reader).await.unwrap();
        assert_eq!(media_type, "image/png");

        let mut all = Vec::new();
        reader.read_to_end(&mut all).await.unwrap();
        assert_eq!(all, data);
    }
}
