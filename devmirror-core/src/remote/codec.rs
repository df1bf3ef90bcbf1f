//! Length-prefixed bincode framing for the device socket.
//!
//! ```text
//! ┌──────────────┬──────────────────────────┐
//! │ len: u32 LE  │ bincode payload (len B)  │
//! └──────────────┴──────────────────────────┘
//! ```

use std::marker::PhantomData;

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::codec::{Decoder, Encoder};

use crate::control::ControlCommand;
use crate::error::MirrorError;
use crate::remote::DeviceMessage;

/// Largest payload either side will accept (a 4K BGRA frame is ~33 MB).
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

const LEN_PREFIX: usize = 4;

/// Decodes `D` and encodes `E`, both as bincode.
pub struct BincodeCodec<D, E> {
    _marker: PhantomData<fn() -> (D, E)>,
}

/// Client end: reads device messages, writes control commands.
pub type ClientCodec = BincodeCodec<DeviceMessage, ControlCommand>;

/// Device end, used by test harnesses and device-side tooling.
pub type DeviceCodec = BincodeCodec<ControlCommand, DeviceMessage>;

impl<D, E> BincodeCodec<D, E> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<D, E> Default for BincodeCodec<D, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DeserializeOwned, E> Decoder for BincodeCodec<D, E> {
    type Item = D;
    type Error = MirrorError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LEN_PREFIX {
            return Ok(None);
        }

        let mut prefix = [0u8; LEN_PREFIX];
        prefix.copy_from_slice(&src[..LEN_PREFIX]);
        let len = u32::from_le_bytes(prefix) as usize;
        if len > MAX_MESSAGE_SIZE {
            return Err(MirrorError::PayloadTooLarge {
                size: len,
                max: MAX_MESSAGE_SIZE,
            });
        }

        if src.len() < LEN_PREFIX + len {
            src.reserve(LEN_PREFIX + len - src.len());
            return Ok(None);
        }

        src.advance(LEN_PREFIX);
        let payload = src.split_to(len);
        Ok(Some(bincode::deserialize(&payload)?))
    }
}

impl<D, E: Serialize> Encoder<E> for BincodeCodec<D, E> {
    type Error = MirrorError;

    fn encode(&mut self, item: E, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = bincode::serialize(&item)?;
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(MirrorError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        dst.reserve(LEN_PREFIX + payload.len());
        dst.put_u32_le(payload.len() as u32);
        dst.extend_from_slice(&payload);
        Ok(())
    }
}
