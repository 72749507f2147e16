//! Framed request loop: reads CALL frames from the host, runs each call on its
//! own task and writes RESULT/ERROR frames back through a single writer task.

use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::bridge::Bridge;
use crate::error::{ErrorKind, FileError};
use crate::protocol::{self, CallRequest, ErrorReply, Message, ProtocolError};

/// Initial capacity of the read buffer (64 KB)
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Handle to send frames to the host
#[derive(Clone)]
pub struct ReplyHandle {
    tx: mpsc::Sender<Vec<u8>>,
}

impl ReplyHandle {
    pub async fn send_message(&self, msg: &Message) -> Result<()> {
        self.tx
            .send(msg.encode())
            .await
            .map_err(|_| anyhow::anyhow!("reply channel closed"))
    }
}

/// Serve calls until the host closes `reader`. Returns once every in-flight
/// reply has been written.
pub async fn serve<R, W>(bridge: Arc<Bridge>, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
    let handle = ReplyHandle { tx };

    let writer_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            writer.write_all(&frame).await?;
            writer.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    info!("bridge serving");

    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
    loop {
        while let Some((msg, consumed)) = Message::decode(&buf)? {
            buf.advance(consumed);
            dispatch(&bridge, msg, &handle);
        }

        let n = reader
            .read_buf(&mut buf)
            .await
            .context("failed to read from host")?;
        if n == 0 {
            if !buf.is_empty() {
                warn!("host closed with {} bytes of partial frame", buf.len());
            }
            break;
        }
    }

    info!("host closed input, draining replies");
    // in-flight tasks hold clones; the writer ends once they are all done
    drop(handle);
    writer_task
        .await
        .context("writer task panicked")?
        .context("failed to write to host")?;
    Ok(())
}

fn dispatch(bridge: &Arc<Bridge>, msg: Message, handle: &ReplyHandle) {
    let request_id = msg.header.request_id;

    if msg.header.msg_type != protocol::CALL {
        warn!("bridge: unexpected message type 0x{:02x}", msg.header.msg_type);
        return;
    }

    let bridge = bridge.clone();
    let handle = handle.clone();

    tokio::spawn(async move {
        let outcome = match msg.parse_json::<CallRequest>() {
            Ok(req) => {
                debug!(request_id, method = %req.method, "call");
                let outcome = bridge.call(&req.method, &req.args).await;
                if let Err(e) = &outcome {
                    error!("{} failed: {}", req.method, e);
                }
                outcome
            }
            Err(e) => {
                error!("invalid CALL payload: {}", e);
                Err(FileError::File(ErrorKind::Syntax))
            }
        };

        let reply = match outcome {
            Ok(value) => protocol::result(request_id, &value),
            Err(e) => protocol::error(request_id, &ErrorReply::from(&e)),
        };
        let reply = match reply {
            Err(ProtocolError::PayloadTooLarge { size }) => {
                warn!(
                    "reply to request {} is {} bytes, over the frame limit",
                    request_id, size
                );
                let quota = FileError::File(ErrorKind::QuotaExceeded);
                protocol::error(request_id, &ErrorReply::from(&quota))
            }
            other => other,
        };

        match reply {
            Ok(reply) => {
                if let Err(e) = handle.send_message(&reply).await {
                    warn!("dropping reply to request {}: {}", request_id, e);
                }
            }
            Err(e) => error!("failed to encode reply to request {}: {}", request_id, e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use crate::roots::tests::table_under;
    use fileshim_native::filesystem::TokioFileSystem;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tempfile::TempDir;

    async fn run_session(bridge: Bridge, frames: Vec<Message>) -> HashMap<u32, Message> {
        let mut input = Vec::new();
        for frame in &frames {
            input.extend_from_slice(&frame.encode());
        }

        let (client, server_side) = tokio::io::duplex(1024 * 1024);
        let (mut client_read, _client_write) = tokio::io::split(client);

        serve(Arc::new(bridge), &input[..], server_side).await.unwrap();

        let mut out = Vec::new();
        client_read.read_to_end(&mut out).await.unwrap();

        let mut replies = HashMap::new();
        let mut offset = 0;
        while let Some((msg, consumed)) = Message::decode(&out[offset..]).unwrap() {
            offset += consumed;
            replies.insert(msg.header.request_id, msg);
        }
        assert_eq!(offset, out.len());
        replies
    }

    fn bridge_in(temp: &TempDir) -> (Bridge, String) {
        let roots = table_under(temp.path());
        let data = roots.path(crate::roots::Root::Data).to_path_buf();
        std::fs::create_dir_all(&data).unwrap();
        (
            Bridge::new(Resolver::new(Arc::new(TokioFileSystem::new()), roots)),
            data.to_string_lossy().to_string(),
        )
    }

    fn call(id: u32, method: &str, args: Vec<Value>) -> Message {
        protocol::call(
            id,
            &CallRequest {
                method: method.to_string(),
                args,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_replies_match_requests() {
        let temp = TempDir::new().unwrap();
        let (bridge, data) = bridge_in(&temp);

        let replies = run_session(
            bridge,
            vec![
                call(1, "requestAllPaths", vec![]),
                call(2, "getFile", vec![json!(data), json!("missing.txt")]),
                call(3, "getParent", vec![]),
            ],
        )
        .await;

        assert_eq!(replies.len(), 3);
        assert_eq!(replies[&1].header.msg_type, protocol::RESULT);

        assert_eq!(replies[&2].header.msg_type, protocol::ERROR);
        let err: ErrorReply = replies[&2].parse_json().unwrap();
        assert_eq!(err.code, Some(ErrorKind::NotFound.code()));

        let err: ErrorReply = replies[&3].parse_json().unwrap();
        assert_eq!(err.kind, "Unsupported");
    }

    #[tokio::test]
    async fn test_oversized_reply_becomes_quota_error() {
        let temp = TempDir::new().unwrap();
        let (bridge, data) = bridge_in(&temp);
        // every 0xff byte serializes as "255," in the JSON array
        let big = std::path::Path::new(&data).join("big.bin");
        std::fs::write(&big, vec![0xffu8; 5 * 1024 * 1024]).unwrap();

        let replies = run_session(
            bridge,
            vec![
                call(
                    1,
                    "readAsArrayBuffer",
                    vec![json!(big.to_string_lossy()), json!(0), json!(5 * 1024 * 1024)],
                ),
                call(2, "readAsArrayBuffer", vec![json!(big.to_string_lossy()), json!(0), json!(4)]),
            ],
        )
        .await;

        assert_eq!(replies[&1].header.msg_type, protocol::ERROR);
        let err: ErrorReply = replies[&1].parse_json().unwrap();
        assert_eq!(err.code, Some(ErrorKind::QuotaExceeded.code()));

        assert_eq!(replies[&2].header.msg_type, protocol::RESULT);
        let bytes: Vec<u8> = replies[&2].parse_json().unwrap();
        assert_eq!(bytes, vec![0xff; 4]);
    }

    #[tokio::test]
    async fn test_malformed_call_gets_syntax_error() {
        let temp = TempDir::new().unwrap();
        let (bridge, _data) = bridge_in(&temp);

        let replies = run_session(
            bridge,
            vec![Message::new(protocol::CALL, 9, b"not json".to_vec())],
        )
        .await;

        let err: ErrorReply = replies[&9].parse_json().unwrap();
        assert_eq!(err.code, Some(ErrorKind::Syntax.code()));
    }
}
