//! Drives a [`SessionOutputLogger`] from a DAP byte stream.
//!
//! One stream of adapter messages is one debugging session: the log file is
//! reset when the session starts and every frame is tapped in arrival order.

use crate::dap::tracer::{Direction, FileTracer};
use crate::dap::transport::FrameReader;
use crate::tap::{SessionOutputLogger, SessionTracker};
use crate::{tap_debug, tap_warn};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite};

pub struct Session {
    tracker: SessionTracker,
    tracer: Option<FileTracer>,
}

impl Session {
    /// Notify the logger about a new debugging session.
    pub async fn start(logger: &Arc<SessionOutputLogger>, tracer: Option<FileTracer>) -> Self {
        if let Some(t) = &tracer {
            t.line("session started");
        }
        Self {
            tracker: logger.on_debug_session_tracker_created().await,
            tracer,
        }
    }

    /// Tap every adapter message of `reader` until the stream ends.
    pub async fn record<R: AsyncBufRead + Unpin>(&self, reader: R) -> anyhow::Result<()> {
        self.pump(reader, None::<&mut tokio::io::Sink>).await
    }

    /// Forward adapter messages from `reader` to `writer` unchanged and tap them.
    pub async fn relay<R, W>(&self, reader: R, writer: &mut W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.pump(reader, Some(writer)).await
    }

    async fn pump<R, W>(&self, reader: R, mut writer: Option<&mut W>) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut frames = FrameReader::new(reader);
        let mut count = 0usize;
        while let Some(frame) = frames.read_frame().await? {
            // client must not wait for the log file
            if let Some(w) = writer.as_deref_mut() {
                frame.write_to(w).await?;
            }
            if let Some(t) = &self.tracer {
                t.frame(Direction::FromAdapter, &frame);
            }
            match frame.message() {
                Ok(message) => self.tracker.on_did_send_message(&message).await,
                Err(err) => tap_warn!(target: "dap", "skip adapter frame: {err:#}"),
            }
            count += 1;
        }
        tap_debug!(target: "dap", "adapter stream ended after {count} messages");
        if let Some(t) = &self.tracer {
            t.line("session finished");
        }
        Ok(())
    }
}

/// Copy client requests to the adapter frame by frame.
pub async fn forward_requests<R, W>(
    reader: R,
    writer: &mut W,
    tracer: Option<FileTracer>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut frames = FrameReader::new(reader);
    while let Some(frame) = frames.read_frame().await? {
        if let Some(t) = &tracer {
            t.frame(Direction::ToAdapter, &frame);
        }
        frame.write_to(writer).await?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dap::transport::Frame;
    use crate::tap::{Config, WorkspaceFolders};
    use serde_json::{json, Value};

    fn stream(messages: &[Value]) -> Vec<u8> {
        messages
            .iter()
            .flat_map(|m| Frame::from_message(m).unwrap().to_bytes())
            .collect()
    }

    fn output(text: &str) -> Value {
        json!({"type": "event", "event": "output", "body": {"category": "stdout", "output": text}})
    }

    async fn logger_for(root: &std::path::Path) -> Arc<SessionOutputLogger> {
        let folders = Arc::new(WorkspaceFolders::new(vec![root.to_path_buf()]));
        let logger = Arc::new(SessionOutputLogger::new(folders, Config::default()));
        if let Some(h) = logger.activate() {
            h.await.unwrap();
        }
        logger
    }

    #[tokio::test]
    async fn test_relay_forwards_verbatim_and_taps() {
        let ws = tempfile::tempdir().unwrap();
        let logger = logger_for(ws.path()).await;

        let mut input = stream(&[
            json!({"type": "response", "command": "launch", "success": true}),
            output("hello "),
        ]);
        input.extend_from_slice(b"Content-Length: 5\r\n\r\nnope!");
        input.extend(stream(&[output("world\n")]));

        let session = Session::start(&logger, None).await;
        let mut forwarded = Vec::new();
        session.relay(&input[..], &mut forwarded).await.unwrap();

        assert_eq!(forwarded, input);
        let log = std::fs::read_to_string(logger.log_file().unwrap()).unwrap();
        assert_eq!(log, "hello world\n");
    }

    #[tokio::test]
    async fn test_each_record_is_a_new_session() {
        let ws = tempfile::tempdir().unwrap();
        let logger = logger_for(ws.path()).await;
        let log_file = logger.log_file().unwrap();

        let session = Session::start(&logger, None).await;
        session.record(&stream(&[output("one")])[..]).await.unwrap();
        assert_eq!(std::fs::read_to_string(&log_file).unwrap(), "one");

        let session = Session::start(&logger, None).await;
        session.record(&stream(&[output("two")])[..]).await.unwrap();
        assert_eq!(std::fs::read_to_string(&log_file).unwrap(), "two");
    }

    #[tokio::test]
    async fn test_truncated_stream_keeps_captured_output() {
        let ws = tempfile::tempdir().unwrap();
        let logger = logger_for(ws.path()).await;

        let mut input = stream(&[output("before")]);
        input.extend_from_slice(b"Content-Length: 100\r\n\r\n{\"event\"");

        let session = Session::start(&logger, None).await;
        assert!(session.record(&input[..]).await.is_err());
        let log = std::fs::read_to_string(logger.log_file().unwrap()).unwrap();
        assert_eq!(log, "before");
    }

    #[tokio::test]
    async fn test_forward_requests_traced() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("trace.log");
        let tracer = FileTracer::new(&trace).unwrap();

        let input = stream(&[json!({"seq": 1, "type": "request", "command": "initialize"})]);
        let mut out = Vec::new();
        forward_requests(&input[..], &mut out, Some(tracer))
            .await
            .unwrap();

        assert_eq!(out, input);
        let trace = std::fs::read_to_string(trace).unwrap();
        assert!(trace.starts_with("-> {"));
        assert!(trace.contains("\"initialize\""));
    }
}
