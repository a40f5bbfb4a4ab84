//! Length-prefixed frames exchanged with the external process.
//!
//! Every frame is a big-endian `u32` length followed by exactly that many
//! body bytes. A request body is `opcode (u32 BE) | payload`; a response body
//! is `opcode echo (u32 BE) | status (u8) | payload`.

use std::io;
use byteorder::{BigEndian, ByteOrder};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use crate::error::{ChannelError, Result};

pub const STATUS_SUCCESS: u8 = 0;
pub const STATUS_FAILURE: u8 = 1;

const OPCODE_LEN: usize = 4;
const RESPONSE_HEADER_LEN: usize = OPCODE_LEN + 1;

/// A command on its way to the external process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    opcode: u32,
    payload: Vec<u8>,
}

impl CommandRequest {
    pub fn new(opcode: u32, payload: impl Into<Vec<u8>>) -> Self {
        Self { opcode, payload: payload.into() }
    }

    pub fn opcode(&self) -> u32 {
        self.opcode
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn to_frame(&self) -> Result<Vec<u8>> {
        let body_len = OPCODE_LEN + self.payload.len();
        let mut frame = Vec::with_capacity(4 + body_len);
        frame.extend_from_slice(&length_prefix(body_len)?);
        frame.extend_from_slice(&self.opcode.to_be_bytes());
        frame.extend_from_slice(&self.payload);
        Ok(frame)
    }

    /// Parses a request body. `None` if it is too short to hold an opcode.
    pub fn from_body(body: &[u8]) -> Option<Self> {
        if body.len() < OPCODE_LEN {
            return None;
        }
        Some(Self::new(BigEndian::read_u32(body), &body[OPCODE_LEN..]))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResponseStatus {
    Success,
    Failure,
    /// A complete frame arrived but its body could not be interpreted.
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    opcode: u32,
    status: ResponseStatus,
    payload: Vec<u8>,
}

impl CommandResponse {
    pub fn new(opcode: u32, status: ResponseStatus, payload: impl Into<Vec<u8>>) -> Self {
        Self { opcode, status, payload: payload.into() }
    }

    pub fn opcode(&self) -> u32 {
        self.opcode
    }

    pub fn status(&self) -> ResponseStatus {
        self.status
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Interprets a response body read for a request carrying `expected_opcode`.
    ///
    /// Bodies that are too short, carry an unknown status byte, or echo a
    /// different opcode become `Malformed` responses holding the raw body.
    pub fn from_body(expected_opcode: u32, body: Vec<u8>) -> Self {
        let malformed = |body: Vec<u8>| Self {
            opcode: expected_opcode,
            status: ResponseStatus::Malformed,
            payload: body,
        };

        if body.len() < RESPONSE_HEADER_LEN {
            return malformed(body);
        }
        let opcode = BigEndian::read_u32(&body);
        let status = match body[OPCODE_LEN] {
            STATUS_SUCCESS => ResponseStatus::Success,
            STATUS_FAILURE => ResponseStatus::Failure,
            _ => return malformed(body),
        };
        if opcode != expected_opcode {
            return malformed(body);
        }

        Self {
            opcode,
            status,
            payload: body[RESPONSE_HEADER_LEN..].to_vec(),
        }
    }
}

/// Builds a complete response frame, as the external process sends it.
pub fn response_frame(opcode: u32, status: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let body_len = RESPONSE_HEADER_LEN + payload.len();
    let mut frame = Vec::with_capacity(4 + body_len);
    frame.extend_from_slice(&length_prefix(body_len)?);
    frame.extend_from_slice(&opcode.to_be_bytes());
    frame.push(status);
    frame.extend_from_slice(payload);
    Ok(frame)
}

fn length_prefix(body_len: usize) -> Result<[u8; 4]> {
    let len = u32::try_from(body_len).map_err(|_| ChannelError::PayloadTooLarge(body_len))?;
    Ok(len.to_be_bytes())
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame).await.map_err(ChannelError::ConnectionLost)?;
    writer.flush().await.map_err(ChannelError::ConnectionLost)?;
    Ok(())
}

/// Reads one frame body. End of stream before a complete frame means the
/// peer is gone.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R, max_len: u32) -> Result<Vec<u8>> {
    let len = reader.read_u32().await.map_err(ChannelError::ConnectionLost)?;
    if len > max_len {
        return Err(ChannelError::FrameTooLarge(len));
    }
    let mut body = vec![0; len as usize];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => ChannelError::ConnectionLost(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("peer closed after {len}-byte frame header"),
            )),
            _ => ChannelError::ConnectionLost(err),
        })?;
    Ok(body)
}
