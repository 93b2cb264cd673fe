//! DAP framing (`Content-Length` header, blank line, JSON payload).
//!
//! Frames keep their original header bytes, so a frame that was read can be
//! forwarded byte-for-byte.

use anyhow::{anyhow, Context};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const CONTENT_LENGTH: &str = "Content-Length:";
/// Largest payload accepted from a peer.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;
/// Largest header block accepted from a peer.
const MAX_HEADER_LEN: usize = 8 * 1024;

/// Single framed DAP message.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    header: Vec<u8>,
    payload: Vec<u8>,
}

impl Frame {
    /// Frame a message with a canonical header.
    pub fn from_message(message: &Value) -> anyhow::Result<Self> {
        let payload = serde_json::to_vec(message)?;
        let header = format!("{CONTENT_LENGTH} {}\r\n\r\n", payload.len()).into_bytes();
        Ok(Self { header, payload })
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decode the payload as JSON.
    pub fn message(&self) -> anyhow::Result<Value> {
        serde_json::from_slice(&self.payload).context("malformed DAP payload")
    }

    /// Header and payload exactly as they were read.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header.len() + self.payload.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.payload);
        out
    }

    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> anyhow::Result<()> {
        writer.write_all(&self.header).await?;
        writer.write_all(&self.payload).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Reads frames from a byte stream.
pub struct FrameReader<R> {
    reader: R,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the next frame, `None` if the stream ended cleanly between frames.
    pub async fn read_frame(&mut self) -> anyhow::Result<Option<Frame>> {
        let mut header = Vec::new();
        let mut content_length: Option<usize> = None;
        loop {
            let mut line = Vec::new();
            let budget = (MAX_HEADER_LEN - header.len()) as u64;
            let read_n = (&mut self.reader)
                .take(budget)
                .read_until(b'\n', &mut line)
                .await?;
            if read_n == 0 {
                if header.is_empty() {
                    return Ok(None);
                }
                return Err(anyhow!("DAP stream closed inside a header"));
            }
            header.extend_from_slice(&line);
            if !line.ends_with(b"\n") && header.len() >= MAX_HEADER_LEN {
                return Err(anyhow!("DAP header exceeds {MAX_HEADER_LEN} bytes"));
            }

            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if content_length.is_none() && header.len() == read_n {
                    // stray blank line between frames
                    header.clear();
                    continue;
                }
                break;
            }
            if let Some(v) = line.strip_prefix(CONTENT_LENGTH) {
                content_length = Some(
                    v.trim()
                        .parse()
                        .with_context(|| format!("invalid Content-Length `{}`", v.trim()))?,
                );
            }
        }

        let len = content_length.ok_or_else(|| anyhow!("Missing Content-Length header"))?;
        if len > MAX_FRAME_LEN {
            return Err(anyhow!(
                "DAP payload of {len} bytes exceeds limit of {MAX_FRAME_LEN} bytes"
            ));
        }
        let mut payload = vec![0u8; len];
        self.reader
            .read_exact(&mut payload)
            .await
            .context("DAP stream closed inside a payload")?;
        Ok(Some(Frame { header, payload }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    async fn read_all(input: &[u8]) -> anyhow::Result<Vec<Frame>> {
        let mut reader = FrameReader::new(input);
        let mut frames = vec![];
        while let Some(frame) = reader.read_frame().await? {
            frames.push(frame);
        }
        Ok(frames)
    }

    #[tokio::test]
    async fn test_read_frames() {
        let first = Frame::from_message(&json!({"seq": 1, "type": "event", "event": "initialized"}))
            .unwrap();
        let second = Frame::from_message(&json!({"seq": 2, "type": "event", "event": "output", "body": {"output": "héllo\n"}}))
            .unwrap();
        let mut input = first.to_bytes();
        input.extend(second.to_bytes());

        let frames = read_all(&input).await.unwrap();
        assert_eq!(frames, vec![first, second]);
        assert_eq!(frames[1].message().unwrap()["body"]["output"], "héllo\n");
    }

    #[tokio::test]
    async fn test_header_kept_verbatim() {
        let input = b"Content-Type: application/vscode-jsonrpc\r\nContent-Length:  2\r\n\r\n{}";
        let frames = read_all(input).await.unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].to_bytes(), input.to_vec());
        assert_eq!(frames[0].payload(), b"{}");
    }

    #[tokio::test]
    async fn test_malformed_streams() {
        assert!(read_all(b"Content-Type: x\r\n\r\n{}").await.is_err());
        assert!(read_all(b"Content-Length: abc\r\n\r\n{}").await.is_err());
        assert!(read_all(b"Content-Length: 10\r\n\r\n{}").await.is_err());
        assert!(read_all(b"Content-Length: 2\r\n").await.is_err());
        assert!(read_all(b"").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_frames_rejected() {
        let err = read_all(b"Content-Length: 4611686018427387903\r\n\r\n{}")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceeds limit"), "{err:#}");

        let mut endless_header = b"X-Padding: ".to_vec();
        endless_header.extend(std::iter::repeat(b'a').take(MAX_HEADER_LEN * 2));
        assert!(read_all(&endless_header).await.is_err());
    }

    #[tokio::test]
    async fn test_bad_json_is_a_frame_error_only() {
        let frames = read_all(b"Content-Length: 3\r\n\r\n{{{").await.unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].message().is_err());
    }
}
