//! Length-prefixed framing and the identity handshake.
//!
//! A frame is a 4-byte little-endian length followed by that many payload
//! bytes. Before the first frame the server sends the assigned player id as a
//! single decimal text line.

use crate::ProtocolError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::ErrorKind;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload accepted by [`read_frame`].
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Longest handshake line accepted, newline included.
const MAX_HANDSHAKE_LEN: u64 = 16;

/// Prepend the length header to a payload.
///
/// Payloads over [`MAX_FRAME_LEN`] are refused, since the peer would reject them.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, ProtocolError> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(payload.len()));
    }
    let mut buf = BytesMut::with_capacity(4 + payload.len());
    buf.put_u32_le(payload.len() as u32);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Read exactly one frame and return its payload.
///
/// Waits for the full header and then the full payload, however the bytes
/// are split across reads. A zero-byte read at any point is reported as
/// [`ProtocolError::Disconnected`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Bytes, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await.map_err(read_error)?;
    let len = (&header[..]).get_u32_le() as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut payload = BytesMut::zeroed(len);
    reader.read_exact(&mut payload).await.map_err(read_error)?;
    Ok(payload.freeze())
}

/// Write one framed payload.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode_frame(payload)?).await?;
    Ok(())
}

/// Send the assigned player id as a newline-terminated decimal line.
pub async fn write_handshake<W>(writer: &mut W, player_id: u32) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(format!("{player_id}\n").as_bytes()).await?;
    Ok(())
}

/// Read the handshake line and parse the player id from it.
///
/// The reader must be the same buffered reader used for the frames that
/// follow, otherwise bytes buffered past the newline would be lost.
pub async fn read_handshake<R>(reader: &mut R) -> Result<u32, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = (&mut *reader)
        .take(MAX_HANDSHAKE_LEN)
        .read_line(&mut line)
        .await?;
    if read == 0 {
        return Err(ProtocolError::Disconnected);
    }
    if !line.ends_with('\n') {
        return Err(ProtocolError::InvalidHandshake(line));
    }

    line.trim_end()
        .parse::<u32>()
        .map_err(|_| ProtocolError::InvalidHandshake(line.clone()))
}

fn read_error(err: std::io::Error) -> ProtocolError {
    match err.kind() {
        ErrorKind::UnexpectedEof => ProtocolError::Disconnected,
        _ => ProtocolError::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;
    use tokio_test::io::Builder;

    #[test]
    fn test_encode_frame_header() {
        let frame = encode_frame(b"hello").unwrap();
        assert_eq!(&frame[..4], &[5, 0, 0, 0]);
        assert_eq!(&frame[4..], b"hello");
    }

    #[tokio::test]
    async fn test_read_frame_one_byte_at_a_time() {
        let payload = br#"{"is_jumping":true}"#;
        let frame = encode_frame(payload).unwrap();
        let mut builder = Builder::new();
        for byte in frame.iter() {
            builder.read(std::slice::from_ref(byte));
        }
        let mut mock = builder.build();

        let decoded = read_frame(&mut mock).await.unwrap();
        assert_eq!(&decoded[..], payload);
    }

    #[tokio::test]
    async fn test_read_frame_uneven_chunks() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let frame = encode_frame(&payload).unwrap();
        let mut mock = Builder::new()
            .read(&frame[..3])
            .read(&frame[3..7])
            .read(&frame[7..500])
            .read(&frame[500..])
            .build();

        let decoded = read_frame(&mut mock).await.unwrap();
        assert_eq!(decoded.len(), 1000);
        assert_eq!(&decoded[..], &payload[..]);
    }

    #[tokio::test]
    async fn test_back_to_back_frames() {
        let mut bytes = encode_frame(b"first").unwrap().to_vec();
        bytes.extend_from_slice(&encode_frame(b"").unwrap());
        bytes.extend_from_slice(&encode_frame(b"third").unwrap());
        let mut mock = Builder::new().read(&bytes).build();

        assert_eq!(&read_frame(&mut mock).await.unwrap()[..], b"first");
        assert!(read_frame(&mut mock).await.unwrap().is_empty());
        assert_eq!(&read_frame(&mut mock).await.unwrap()[..], b"third");
    }

    #[tokio::test]
    async fn test_eof_in_header_is_disconnect() {
        let mut mock = Builder::new().read(&[3, 0]).build();
        let err = read_frame(&mut mock).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Disconnected));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_eof_in_payload_is_disconnect() {
        let frame = encode_frame(b"truncated").unwrap();
        let mut mock = Builder::new().read(&frame[..8]).build();
        let err = read_frame(&mut mock).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Disconnected));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let header = ((MAX_FRAME_LEN + 1) as u32).to_le_bytes();
        let mut mock = Builder::new().read(&header).build();
        let err = read_frame(&mut mock).await.unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge(len) if len == MAX_FRAME_LEN + 1));
    }

    #[tokio::test]
    async fn test_oversized_payload_never_written() {
        let payload = vec![b'x'; MAX_FRAME_LEN + 1];
        // An empty mock fails any write with an I/O error.
        let mut mock = Builder::new().build();
        let err = write_frame(&mut mock, &payload).await.unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge(len) if len == MAX_FRAME_LEN + 1));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_encode_frame_accepts_limit() {
        let payload = vec![0u8; MAX_FRAME_LEN];
        let frame = encode_frame(&payload).unwrap();
        assert_eq!(frame.len(), MAX_FRAME_LEN + 4);
    }

    #[tokio::test]
    async fn test_handshake_then_frame_share_reader() {
        let mut bytes = b"42\n".to_vec();
        bytes.extend_from_slice(&encode_frame(b"{}").unwrap());
        let mut reader = BufReader::new(Builder::new().read(&bytes).build());

        assert_eq!(read_handshake(&mut reader).await.unwrap(), 42);
        assert_eq!(&read_frame(&mut reader).await.unwrap()[..], b"{}");
    }

    #[tokio::test]
    async fn test_handshake_rejects_garbage() {
        let mut reader = BufReader::new(Builder::new().read(b"player\n").build());
        let err = read_handshake(&mut reader).await.unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidHandshake(_)));
    }

    #[tokio::test]
    async fn test_write_handshake_line() {
        let mut mock = Builder::new().write(b"7\n").build();
        write_handshake(&mut mock, 7).await.unwrap();
    }
}
