use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::FileError;

/// Header size: 1 (type) + 4 (length) + 4 (request_id) = 9 bytes
pub const HEADER_SIZE: usize = 9;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

// --- Frame Types ---

/// Host -> shim: `{method, args}`
pub const CALL: u8 = 0x01;
/// Shim -> host: the JSON result
pub const RESULT: u8 = 0x02;
/// Shim -> host: an [`ErrorReply`]
pub const ERROR: u8 = 0x03;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("payload too large: {size} bytes (max {MAX_PAYLOAD_SIZE})")]
    PayloadTooLarge { size: usize },
    #[error("invalid message type: 0x{0:02x}")]
    InvalidType(u8),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub msg_type: u8,
    pub length: u32,
    pub request_id: u32,
}

/// A decoded frame
#[derive(Debug, Clone)]
pub struct Message {
    pub header: Header,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(msg_type: u8, request_id: u32, payload: Vec<u8>) -> Self {
        Self {
            header: Header {
                msg_type,
                length: payload.len() as u32,
                request_id,
            },
            payload,
        }
    }

    /// Create a message with JSON payload. Payloads over [`MAX_PAYLOAD_SIZE`]
    /// are refused so the peer never sees a frame it must reject.
    pub fn json<T: Serialize>(msg_type: u8, request_id: u32, data: &T) -> Result<Self, ProtocolError> {
        let payload = serde_json::to_vec(data)?;
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload.len(),
            });
        }
        Ok(Self::new(msg_type, request_id, payload))
    }

    /// Parse the payload as JSON
    pub fn parse_json<'a, T: Deserialize<'a>>(&'a self) -> Result<T, ProtocolError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// Encode this message into bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf);
        buf.to_vec()
    }

    /// Encode into an existing BytesMut buffer
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(HEADER_SIZE + self.payload.len());
        buf.put_u8(self.header.msg_type);
        buf.put_u32_le(self.header.length);
        buf.put_u32_le(self.header.request_id);
        buf.extend_from_slice(&self.payload);
    }

    /// Decode a message from bytes. Returns None if not enough data.
    ///
    /// The declared length is checked against [`MAX_PAYLOAD_SIZE`] as soon as
    /// the header is complete, before waiting for the payload.
    pub fn decode(buf: &[u8]) -> Result<Option<(Message, usize)>, ProtocolError> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }

        let mut cursor = buf;
        let msg_type = cursor.get_u8();
        let length = cursor.get_u32_le();
        let request_id = cursor.get_u32_le();

        if !matches!(msg_type, CALL | RESULT | ERROR) {
            return Err(ProtocolError::InvalidType(msg_type));
        }

        let payload_len = length as usize;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge { size: payload_len });
        }

        let total_len = HEADER_SIZE + payload_len;
        if buf.len() < total_len {
            return Ok(None);
        }

        let msg = Message {
            header: Header {
                msg_type,
                length,
                request_id,
            },
            payload: buf[HEADER_SIZE..total_len].to_vec(),
        };

        Ok(Some((msg, total_len)))
    }
}

// --- JSON payload types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    /// DOM File API code, absent for unsupported and native failures
    pub code: Option<u16>,
    pub kind: String,
    pub message: String,
}

impl From<&FileError> for ErrorReply {
    fn from(err: &FileError) -> Self {
        let (code, kind) = match err {
            FileError::File(kind) => (Some(kind.code()), kind.name()),
            FileError::Unsupported(_) => (None, "Unsupported"),
            FileError::Io(_) => (None, "Io"),
        };

        Self {
            code,
            kind: kind.to_string(),
            message: err.to_string(),
        }
    }
}

// --- Message builders ---

pub fn call(request_id: u32, req: &CallRequest) -> Result<Message, ProtocolError> {
    Message::json(CALL, request_id, req)
}

pub fn result(request_id: u32, value: &Value) -> Result<Message, ProtocolError> {
    Message::json(RESULT, request_id, value)
}

pub fn error(request_id: u32, reply: &ErrorReply) -> Result<Message, ProtocolError> {
    Message::json(ERROR, request_id, reply)
}
