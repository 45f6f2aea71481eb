//! # Frame encoding
//!
//! Messages are framed on the stream as a fixed six byte header followed by
//! exactly `payload_len` payload bytes. Both header fields are network byte
//! order:
//!
//! ```text
//! +----------------------+------------------+----------------------+
//! | payload_len (u32 BE) | type (u16 BE)    | payload bytes        |
//! +----------------------+------------------+----------------------+
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use byteorder::{ByteOrder, NetworkEndian};

use crate::packet::Packet;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Size in bytes of the frame header.
pub const HEADER_SIZE: usize = 6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The fixed header preceding every payload on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Number of payload bytes following this header.
    pub payload_len: u32,

    /// Raw packet type value. Kept raw here so that unrecognised types can
    /// still be framed and skipped by the receiver.
    pub packet_type: u16,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FrameHeader {
    /// Encode this header into its wire form.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        NetworkEndian::write_u32(&mut bytes[0..4], self.payload_len);
        NetworkEndian::write_u16(&mut bytes[4..6], self.packet_type);
        bytes
    }

    /// Decode a header from its wire form.
    ///
    /// Any six bytes parse into a header, plausibility of the length against
    /// the configured maximum is the receiver's job.
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            payload_len: NetworkEndian::read_u32(&bytes[0..4]),
            packet_type: NetworkEndian::read_u16(&bytes[4..6]),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Encode a packet into a complete frame, header and payload in one buffer.
///
/// The caller is responsible for checking the payload length against the
/// configured maximum before sending.
pub fn encode_frame(packet: &Packet) -> Vec<u8> {
    let payload_len = packet.payload_len();

    let header = FrameHeader {
        payload_len: payload_len as u32,
        packet_type: packet.packet_type().as_u16(),
    };

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload_len);
    frame.extend_from_slice(&header.encode());
    packet.append_payload(&mut frame);

    frame
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::packet::PacketType;

    #[test]
    fn test_header_round_trip() {
        let header = FrameHeader {
            payload_len: 1234,
            packet_type: PacketType::Camera.as_u16(),
        };

        let decoded = FrameHeader::decode(&header.encode());

        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_layout() {
        let header = FrameHeader {
            payload_len: 5,
            packet_type: PacketType::Control.as_u16(),
        };

        // Both fields big-endian: length 5, type 5
        assert_eq!(header.encode(), [0x00, 0x00, 0x00, 0x05, 0x00, 0x05]);
    }

    #[test]
    fn test_encode_frame() {
        let packet = Packet::Msg(String::from("ping"));
        let frame = encode_frame(&packet);

        assert_eq!(frame.len(), HEADER_SIZE + 4);
        assert_eq!(&frame[0..4], &[0x00, 0x00, 0x00, 0x04]);
        assert_eq!(&frame[4..6], &[0x00, 0x01]);
        assert_eq!(&frame[6..], b"ping");
    }

    #[test]
    fn test_signal_frame_is_header_only() {
        let frame = encode_frame(&Packet::Disconnect);

        assert_eq!(frame.len(), HEADER_SIZE);
        assert_eq!(
            FrameHeader::decode(&[frame[0], frame[1], frame[2], frame[3], frame[4], frame[5]]),
            FrameHeader {
                payload_len: 0,
                packet_type: PacketType::Disconnect.as_u16()
            }
        );
    }
}
