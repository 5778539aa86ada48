//! Wire format for the remote execution listener.
//!
//! The request is a UTF-8 JSON object `{"file": ..., "text": ...}`. How the
//! request ends and how the response is delimited depends on [`Framing`]:
//!
//! ```text
//! FirstChunk:      [JSON bytes]                       ->  [first non-empty read]
//! UntilClose:      [JSON bytes] <client half-close>   ->  [response bytes] <listener close>
//! LengthPrefixed:  [u32 BE: len][JSON bytes]          ->  [u32 BE: len][response bytes]
//! ```

use crate::config::Framing;
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Code to execute inside Nuke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Source file the code came from; empty when unsaved or synthetic.
    pub file: String,
    pub text: String,
}

impl ExecutionRequest {
    pub fn new(file: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            text: text.into(),
        }
    }

    /// Serialize to the JSON payload sent on the wire.
    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Write the request payload and mark its end.
pub async fn write_request<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
    framing: Framing,
) -> Result<()> {
    match framing {
        Framing::LengthPrefixed => write_frame(writer, payload).await?,
        Framing::UntilClose => {
            writer.write_all(payload).await?;
            writer.flush().await?;
            writer.shutdown().await?;
        }
        Framing::FirstChunk => {
            writer.write_all(payload).await?;
            writer.flush().await?;
        }
    }
    Ok(())
}

/// Read one response according to `framing`.
///
/// Returns `None` when the peer closed without sending anything.
pub async fn read_response<R: AsyncRead + Unpin>(
    reader: &mut R,
    framing: Framing,
    max_size: usize,
) -> Result<Option<Vec<u8>>> {
    match framing {
        Framing::LengthPrefixed => read_frame(reader, max_size).await,
        Framing::UntilClose => {
            let mut buf = Vec::new();
            // One extra byte distinguishes "exactly max" from "too large".
            let limit = max_size as u64 + 1;
            reader.take(limit).read_to_end(&mut buf).await?;
            if buf.len() > max_size {
                return Err(BridgeError::ResponseTooLarge {
                    size: buf.len(),
                    max: max_size,
                });
            }
            Ok((!buf.is_empty()).then_some(buf))
        }
        Framing::FirstChunk => {
            let mut buf = vec![0u8; max_size.min(crate::config::TransportConfig::READ_CHUNK_SIZE)];
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                return Ok(None);
            }
            buf.truncate(n);
            Ok(Some(buf))
        }
    }
}

/// Read a length-prefixed frame.
///
/// Frame format: `[4-byte BE u32 length][payload bytes]`
///
/// Returns `None` on clean EOF before the header.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_size: usize,
) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_size {
        return Err(BridgeError::ResponseTooLarge {
            size: len,
            max: max_size,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(Some(payload))
}

/// Write a length-prefixed frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        BridgeError::Other(format!("Payload of {} bytes is too large to frame", payload.len()))
    })?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}
