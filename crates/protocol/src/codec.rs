//! Codec Module
//!
//! Payloads are MessagePack (named fields) via `rmp-serde`. Frames travel
//! on a byte stream length-delimited by a 4-byte big-endian prefix.
//!
//! Wire format:
//! ```text
//! [u32 BE: body_len][body: MessagePack-encoded Frame]
//! ```

use crate::message::Frame;
use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use strata_core::Result;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Maximum frame size (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Encode a value to MessagePack
pub fn encode<T: Serialize>(value: &T) -> Result<Bytes> {
    Ok(Bytes::from(rmp_serde::to_vec_named(value)?))
}

/// Decode a value from MessagePack
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Length-delimited [`Frame`] codec for TCP streams
#[derive(Debug)]
pub struct FrameCodec {
    inner: LengthDelimitedCodec,
}

impl FrameCodec {
    /// Create a new frame codec
    pub fn new() -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_SIZE)
                .new_codec(),
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<Frame>> {
        let Some(body) = self.inner.decode(src)? else {
            return Ok(None);
        };
        let frame = rmp_serde::from_slice(&body).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to deserialize frame: {}", e),
            )
        })?;
        Ok(Some(frame))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> io::Result<()> {
        let body = rmp_serde::to_vec_named(&frame).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Failed to serialize frame: {}", e),
            )
        })?;
        self.inner.encode(Bytes::from(body), dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Request, RequestKind, Response};
    use crate::session::KeepAliveRequest;
    use strata_core::{RequestHeader, ResponseHeader, SessionId};

    fn keep_alive_frame(id: u64) -> Frame {
        let request = Request::new(
            RequestKind::KeepAlive,
            RequestHeader {
                partition: 1,
                session_id: SessionId(1),
                sequence_number: 0,
                index: 0,
            },
            None,
            &KeepAliveRequest {
                command_sequence: 9,
            },
        )
        .unwrap();
        Frame::Request {
            id,
            stream: false,
            request,
        }
    }

    #[test]
    fn test_frame_codec_encodes_and_decodes() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(keep_alive_frame(11), &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, keep_alive_frame(11));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame_waits_for_more_bytes() {
        let mut codec = FrameCodec::new();
        let mut full = BytesMut::new();
        codec
            .encode(
                Frame::Response {
                    id: 3,
                    response: Response::stream_open(ResponseHeader::default()),
                },
                &mut full,
            )
            .unwrap();

        let split = full.len() / 2;
        let mut partial = full.split_to(split);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.unsplit(full);
        let frame = codec.decode(&mut partial).unwrap().unwrap();
        assert_eq!(frame.id(), 3);
    }

    #[test]
    fn test_multiple_frames_in_one_buffer() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Frame::StreamEnd { id: 1 }, &mut buf).unwrap();
        codec.encode(Frame::StreamEnd { id: 2 }, &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().id(), 1);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().id(), 2);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    proptest::proptest! {
        #[test]
        fn prop_frames_decode_in_write_order(ids in proptest::collection::vec(proptest::num::u64::ANY, 0..32)) {
            let mut codec = FrameCodec::new();
            let mut buf = BytesMut::new();
            for id in &ids {
                codec.encode(Frame::StreamEnd { id: *id }, &mut buf).unwrap();
            }
            let mut decoded = Vec::new();
            while let Some(frame) = codec.decode(&mut buf).unwrap() {
                decoded.push(frame.id());
            }
            proptest::prop_assert_eq!(decoded, ids);
        }
    }

    #[test]
    fn test_garbage_body_is_invalid_data() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        LengthDelimitedCodec::new()
            .encode(Bytes::from_static(&[0xc1, 0xc1]), &mut buf)
            .unwrap();
        let err = codec.decode(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
