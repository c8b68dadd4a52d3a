use super::error::PeerError;
use crate::constants::{HANDSHAKE_LEN, PROTOCOL_NAME};
use crate::metainfo::InfoHash;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Standard peer wire message ids ([BEP-3]).
///
/// Handlers are registered per id; frames with ids outside this set still
/// reach the dispatcher and fall through to its fallback handler.
///
/// [BEP-3]: http://bittorrent.org/beps/bep_0003.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageId {
    Choke = 0,
    Unchoke = 1,
    Interested = 2,
    NotInterested = 3,
    Have = 4,
    Bitfield = 5,
    Request = 6,
    Piece = 7,
    Cancel = 8,
    Port = 9,
}

impl TryFrom<u8> for MessageId {
    type Error = PeerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageId::Choke),
            1 => Ok(MessageId::Unchoke),
            2 => Ok(MessageId::Interested),
            3 => Ok(MessageId::NotInterested),
            4 => Ok(MessageId::Have),
            5 => Ok(MessageId::Bitfield),
            6 => Ok(MessageId::Request),
            7 => Ok(MessageId::Piece),
            8 => Ok(MessageId::Cancel),
            9 => Ok(MessageId::Port),
            _ => Err(PeerError::UnknownMessageId(value)),
        }
    }
}

/// The 68-byte handshake that opens every peer connection.
///
/// Layout: `19`, `"BitTorrent protocol"`, 8 reserved bytes, info hash,
/// peer id. We never set reserved bits: no extensions are negotiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub reserved: [u8; 8],
    pub info_hash: [u8; 20],
    pub peer_id: [u8; 20],
}

impl Handshake {
    pub fn new(info_hash: &InfoHash, peer_id: [u8; 20]) -> Self {
        Self {
            reserved: [0u8; 8],
            info_hash: *info_hash.as_bytes(),
            peer_id,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HANDSHAKE_LEN);
        buf.put_u8(PROTOCOL_NAME.len() as u8);
        buf.put_slice(PROTOCOL_NAME);
        buf.put_slice(&self.reserved);
        buf.put_slice(&self.info_hash);
        buf.put_slice(&self.peer_id);
        buf.freeze()
    }

    /// Parses a handshake, checking only its framing.
    ///
    /// `data` must be exactly 68 bytes with the expected protocol name.
    pub fn decode(data: &[u8]) -> Result<Self, PeerError> {
        if data.len() != HANDSHAKE_LEN {
            return Err(PeerError::InvalidHandshake("length"));
        }

        if data[0] as usize != PROTOCOL_NAME.len() {
            return Err(PeerError::InvalidHandshake("protocol name length"));
        }

        if &data[1..20] != PROTOCOL_NAME {
            return Err(PeerError::InvalidHandshake("protocol name"));
        }

        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&data[20..28]);

        let mut info_hash = [0u8; 20];
        info_hash.copy_from_slice(&data[28..48]);

        let mut peer_id = [0u8; 20];
        peer_id.copy_from_slice(&data[48..68]);

        Ok(Self {
            reserved,
            info_hash,
            peer_id,
        })
    }

    /// Parses a peer's handshake reply and checks that it is for the
    /// torrent we asked about.
    pub fn validate(data: &[u8], expected: &InfoHash) -> Result<Self, PeerError> {
        let handshake = Self::decode(data)?;

        if &handshake.info_hash != expected.as_bytes() {
            return Err(PeerError::InvalidHandshake("info hash"));
        }

        Ok(handshake)
    }
}

/// One length-prefixed unit of post-handshake traffic.
///
/// A zero length prefix is a keep-alive with no id. Otherwise the first byte
/// after the prefix is the message id and the rest is its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    KeepAlive,
    Message { id: u8, payload: Bytes },
}

impl Frame {
    /// Returns the standard id of this frame, if it has a known one.
    pub fn message_id(&self) -> Option<MessageId> {
        match self {
            Frame::KeepAlive => None,
            Frame::Message { id, .. } => MessageId::try_from(*id).ok(),
        }
    }

    /// Encodes the frame with its length prefix.
    ///
    /// Fails if the id and payload together do not fit a 32-bit length.
    pub fn encode(&self) -> Result<Bytes, PeerError> {
        match self {
            Frame::KeepAlive => Ok(Bytes::from_static(&[0, 0, 0, 0])),
            Frame::Message { id, payload } => {
                let length = frame_length(payload.len())?;
                let mut buf = BytesMut::with_capacity(5 + payload.len());
                buf.put_u32(length);
                buf.put_u8(*id);
                buf.put_slice(payload);
                Ok(buf.freeze())
            }
        }
    }

    /// Splits one complete frame off the front of `buf`.
    ///
    /// Returns `Ok(None)` and leaves `buf` untouched while the frame is still
    /// incomplete. A length prefix above `max_len` is a protocol error.
    pub fn parse(buf: &mut BytesMut, max_len: usize) -> Result<Option<Frame>, PeerError> {
        if buf.len() < 4 {
            return Ok(None);
        }

        let length = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

        if length > max_len {
            return Err(PeerError::InvalidMessage(format!(
                "message too large: {}",
                length
            )));
        }

        if buf.len() < 4 + length {
            return Ok(None);
        }

        buf.advance(4);

        if length == 0 {
            return Ok(Some(Frame::KeepAlive));
        }

        let id = buf.get_u8();
        let payload = buf.split_to(length - 1).freeze();
        Ok(Some(Frame::Message { id, payload }))
    }
}

/// Length prefix for a message carrying `payload_len` bytes after its id.
pub(crate) fn frame_length(payload_len: usize) -> Result<u32, PeerError> {
    payload_len
        .checked_add(1)
        .and_then(|len| u32::try_from(len).ok())
        .ok_or_else(|| PeerError::InvalidMessage(format!("payload too large: {}", payload_len)))
}

/// Builds an `interested` message: `00 00 00 01 02`.
pub fn interested() -> Bytes {
    let mut buf = BytesMut::with_capacity(5);
    buf.put_u32(1);
    buf.put_u8(MessageId::Interested as u8);
    buf.freeze()
}

/// Builds a `request` message for `length` bytes at `begin` within piece
/// `index` (17 bytes in total).
pub fn request(index: u32, begin: u32, length: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(17);
    buf.put_u32(13);
    buf.put_u8(MessageId::Request as u8);
    buf.put_u32(index);
    buf.put_u32(begin);
    buf.put_u32(length);
    buf.freeze()
}
