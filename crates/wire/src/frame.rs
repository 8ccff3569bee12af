// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed framing and the multipart payload codec.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use lattice_core::MessagePart;

/// Upper bound on a single frame; larger lengths are treated as corruption.
const MAX_FRAME_LEN: usize = 256 * 1024 * 1024;

/// Errors from framing, encoding or decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("peer closed the connection")]
    ConnectionClosed,
    #[error("corrupted message: {0}")]
    Corrupt(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct ComponentHeader {
    content_type: String,
    length: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct PartsHeader {
    components: Vec<ComponentHeader>,
}

/// Encode message parts into the multipart payload form:
/// `header_len:u32-be ‖ header_json ‖ part_0 ‖ part_1 ‖ …`.
pub fn encode_parts(parts: &[MessagePart]) -> Result<Vec<u8>, ProtocolError> {
    let mut components = Vec::with_capacity(parts.len());
    let mut bodies: Vec<Vec<u8>> = Vec::with_capacity(parts.len());

    for part in parts {
        let (content_type, bytes) = match part {
            MessagePart::Null => ("null", Vec::new()),
            MessagePart::Binary(b) => ("binary", b.clone()),
            MessagePart::Text(s) => ("string", s.as_bytes().to_vec()),
            MessagePart::Json(v) => ("json", serde_json::to_vec(v)?),
        };
        components.push(ComponentHeader {
            content_type: content_type.to_string(),
            length: bytes.len(),
        });
        bodies.push(bytes);
    }

    let header = serde_json::to_vec(&PartsHeader { components })?;
    let mut out = Vec::with_capacity(4 + header.len());
    out.extend_from_slice(&(header.len() as u32).to_be_bytes());
    out.extend_from_slice(&header);
    for body in bodies {
        out.extend_from_slice(&body);
    }
    Ok(out)
}

/// Decode a multipart payload back into message parts.
pub fn decode_parts(encoded: &[u8]) -> Result<Vec<MessagePart>, ProtocolError> {
    if encoded.len() < 4 {
        return Err(ProtocolError::Corrupt("payload shorter than header length".into()));
    }
    let header_len = u32::from_be_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]) as usize;
    let header_end = 4usize
        .checked_add(header_len)
        .filter(|&end| end <= encoded.len())
        .ok_or_else(|| ProtocolError::Corrupt("header length out of range".into()))?;

    let header: PartsHeader = serde_json::from_slice(&encoded[4..header_end])?;

    let mut parts = Vec::with_capacity(header.components.len());
    let mut offset = header_end;
    for component in &header.components {
        let end = offset
            .checked_add(component.length)
            .filter(|&end| end <= encoded.len())
            .ok_or_else(|| ProtocolError::Corrupt("component length out of range".into()))?;
        let body = &encoded[offset..end];
        let part = match component.content_type.as_str() {
            "null" => MessagePart::Null,
            "binary" => MessagePart::Binary(body.to_vec()),
            "string" => MessagePart::Text(
                String::from_utf8(body.to_vec())
                    .map_err(|_| ProtocolError::Corrupt("string part is not UTF-8".into()))?,
            ),
            "json" => MessagePart::Json(serde_json::from_slice(body)?),
            other => {
                return Err(ProtocolError::Corrupt(format!("unknown content type '{}'", other)))
            }
        };
        parts.push(part);
        offset = end;
    }
    Ok(parts)
}

/// Write one frame: `length:u32-be ‖ payload`.
pub async fn write_message<W>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame. Returns `None` on clean EOF at a frame boundary.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Vec<u8>>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::Corrupt(format!("frame length {} exceeds limit", len)));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::ConnectionClosed
        } else {
            ProtocolError::Io(e)
        }
    })?;
    Ok(Some(payload))
}

/// Write a control packet plus trailing message parts as one frame.
pub async fn write_packet<W, T>(
    writer: &mut W,
    control: &T,
    extras: &[MessagePart],
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut parts = Vec::with_capacity(1 + extras.len());
    parts.push(MessagePart::Json(serde_json::to_value(control)?));
    parts.extend_from_slice(extras);
    let payload = encode_parts(&parts)?;
    write_message(writer, &payload).await
}

/// Read one frame and split it into a control packet and trailing parts.
/// Returns `None` on clean EOF.
pub async fn read_packet<R, T>(reader: &mut R) -> Result<Option<(T, Vec<MessagePart>)>, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let Some(payload) = read_message(reader).await? else {
        return Ok(None);
    };
    let mut parts = decode_parts(&payload)?;
    if parts.is_empty() {
        return Err(ProtocolError::Corrupt("message has no control packet".into()));
    }
    let control = match parts.remove(0) {
        MessagePart::Json(v) => serde_json::from_value(v)?,
        _ => return Err(ProtocolError::Corrupt("control packet is not JSON".into())),
    };
    Ok(Some((control, parts)))
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
