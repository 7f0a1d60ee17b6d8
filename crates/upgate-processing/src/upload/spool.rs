//! Bounded spooling of an inbound upload stream.
//!
//! The request body can only be read once, so it is copied into an anonymous
//! temporary file that every later stage re-reads from the start. The file is
//! unlinked on creation and disappears when the `Spool` is dropped.

use std::io::{self, SeekFrom};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum SpoolError {
    #[error("Upload exceeds {max} bytes")]
    TooLarge { max: u64 },

    #[error("Upload stream failed after {received} bytes: {source}")]
    Interrupted {
        received: u64,
        #[source]
        source: io::Error,
    },

    #[error("Upload ended after {received} of {declared} declared bytes")]
    Truncated { received: u64, declared: u64 },

    #[error("Spool file error: {0}")]
    Io(#[source] io::Error),
}

pub struct Spool {
    file: File,
    size: u64,
}

impl Spool {
    /// Copy `body` into a fresh spool file.
    ///
    /// Reads at most `max + 1` bytes so an oversized body is detected without
    /// buffering it. A body shorter than `declared` is truncated.
    pub async fn receive<R>(body: &mut R, max: u64, declared: Option<u64>) -> Result<Self, SpoolError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let std_file = tempfile::tempfile().map_err(SpoolError::Io)?;
        let mut file = File::from_std(std_file);

        let mut limited = (&mut *body).take(max.saturating_add(1));
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut received: u64 = 0;

        loop {
            let n = match limited.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(source) => return Err(SpoolError::Interrupted { received, source }),
            };

            received += n as u64;
            if received > max {
                return Err(SpoolError::TooLarge { max });
            }

            file.write_all(&buf[..n]).await.map_err(SpoolError::Io)?;
        }

        if let Some(declared) = declared {
            if received < declared {
                return Err(SpoolError::Truncated { received, declared });
            }
        }

        file.flush().await.map_err(SpoolError::Io)?;
        file.seek(SeekFrom::Start(0)).await.map_err(SpoolError::Io)?;

        Ok(Self {
            file,
            size: received,
        })
    }

    /// Bytes received.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Position the spool at offset 0 and hand it out for reading.
    pub async fn rewind(&mut self) -> io::Result<&mut File> {
        self.file.seek(SeekFrom::Start(0)).await?;
        Ok(&mut self.file)
    }
}
