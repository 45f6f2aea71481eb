//! # Packet module
//!
//! This module defines the message types exchanged between the surface
//! station and the vehicle, and their payload encodings.
//!
//! Every message on the wire is a (type, payload) pair. The numeric type
//! values are fixed for all time, new types may only be appended. Receivers
//! ignore types they do not recognise so that old and new software can share
//! a link.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use byteorder::{ByteOrder, NetworkEndian};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
use crate::eqpt::ControlDems;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Size in bytes of an encoded `ControlDems` payload (nine `f32` values).
pub const CONTROL_PAYLOAD_SIZE: usize = 36;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Packet types.
///
/// The type identifies the purpose of a packet and determines how its
/// payload is decoded. The `u16` values are part of the wire format and
/// must never be renumbered.
#[derive(Debug, Serialize, Deserialize, Hash, Eq, PartialEq, Copy, Clone)]
#[repr(u16)]
pub enum PacketType {
    None = 0,
    Msg = 1,
    Disconnect = 2,
    DisconnectAck = 3,
    Camera = 4,
    Control = 5,
    EnableCorrection = 6,
    DisableCorrection = 7,
    StopServer = 8,
}

/// A decoded packet with its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Empty packet, carries no information.
    None,

    /// A free-text message, used for testing and operator notices.
    Msg(String),

    /// Request an orderly shutdown of the connection.
    Disconnect,

    /// Acknowledge a disconnect request.
    DisconnectAck,

    /// A single encoded camera frame.
    Camera(Vec<u8>),

    /// An actuator demand vector.
    Control(ControlDems),

    /// Enable the vehicle's attitude correction.
    EnableCorrection,

    /// Disable the vehicle's attitude correction.
    DisableCorrection,

    /// Command the vehicle software to stop.
    StopServer,
}

/// Possible packet decoding errors.
#[derive(Debug, Error)]
pub enum PacketError {
    #[error("Unrecognised packet type ({0})")]
    UnknownType(u16),

    #[error("A {packet_type:?} packet requires a {expected} byte payload, got {actual}")]
    InvalidPayloadLength {
        packet_type: PacketType,
        expected: usize,
        actual: usize,
    },

    #[error("MSG packet payload is not valid UTF-8: {0}")]
    InvalidMsgPayload(std::string::FromUtf8Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PacketType {
    /// Parse a raw wire value into a packet type, or `None` if the value is
    /// not recognised.
    pub fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(PacketType::None),
            1 => Some(PacketType::Msg),
            2 => Some(PacketType::Disconnect),
            3 => Some(PacketType::DisconnectAck),
            4 => Some(PacketType::Camera),
            5 => Some(PacketType::Control),
            6 => Some(PacketType::EnableCorrection),
            7 => Some(PacketType::DisableCorrection),
            8 => Some(PacketType::StopServer),
            _ => None,
        }
    }

    /// The raw wire value of this packet type.
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl Packet {
    /// The type of this packet.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::None => PacketType::None,
            Packet::Msg(_) => PacketType::Msg,
            Packet::Disconnect => PacketType::Disconnect,
            Packet::DisconnectAck => PacketType::DisconnectAck,
            Packet::Camera(_) => PacketType::Camera,
            Packet::Control(_) => PacketType::Control,
            Packet::EnableCorrection => PacketType::EnableCorrection,
            Packet::DisableCorrection => PacketType::DisableCorrection,
            Packet::StopServer => PacketType::StopServer,
        }
    }

    /// Number of bytes this packet's payload encodes to.
    pub fn payload_len(&self) -> usize {
        match self {
            Packet::Msg(s) => s.len(),
            Packet::Camera(frame) => frame.len(),
            Packet::Control(_) => CONTROL_PAYLOAD_SIZE,
            _ => 0,
        }
    }

    /// Append this packet's encoded payload to the given buffer.
    pub fn append_payload(&self, buf: &mut Vec<u8>) {
        match self {
            Packet::Msg(s) => buf.extend_from_slice(s.as_bytes()),
            Packet::Camera(frame) => buf.extend_from_slice(frame),
            Packet::Control(dems) => append_control_payload(dems, buf),
            _ => (),
        }
    }

    /// Encode this packet's payload into a new buffer.
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.payload_len());
        self.append_payload(&mut buf);
        buf
    }

    /// Decode a packet from its raw wire type and payload.
    ///
    /// Signal packets (those defined with no payload) accept and discard any
    /// payload bytes they arrive with, so that future revisions are free to
    /// add payload data to them.
    pub fn decode(raw_type: u16, payload: Vec<u8>) -> Result<Self, PacketError> {
        let packet_type = match PacketType::from_u16(raw_type) {
            Some(t) => t,
            None => return Err(PacketError::UnknownType(raw_type)),
        };

        match packet_type {
            PacketType::None => Ok(Packet::None),
            PacketType::Msg => match String::from_utf8(payload) {
                Ok(s) => Ok(Packet::Msg(s)),
                Err(e) => Err(PacketError::InvalidMsgPayload(e)),
            },
            PacketType::Disconnect => Ok(Packet::Disconnect),
            PacketType::DisconnectAck => Ok(Packet::DisconnectAck),
            PacketType::Camera => Ok(Packet::Camera(payload)),
            PacketType::Control => decode_control_payload(&payload),
            PacketType::EnableCorrection => Ok(Packet::EnableCorrection),
            PacketType::DisableCorrection => Ok(Packet::DisableCorrection),
            PacketType::StopServer => Ok(Packet::StopServer),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Append the nine channels of a demand vector to the buffer in wire order.
///
/// The order is the six thrusters as given by `ThrusterId::ALL`, then camera
/// tilt, tool wrist, and tool grip. All values are network byte order `f32`.
fn append_control_payload(dems: &ControlDems, buf: &mut Vec<u8>) {
    let mut scratch = [0u8; 4];

    let channels = [
        dems.thrusters[0],
        dems.thrusters[1],
        dems.thrusters[2],
        dems.thrusters[3],
        dems.thrusters[4],
        dems.thrusters[5],
        dems.camera_tilt,
        dems.tool_wrist,
        dems.tool_grip,
    ];

    for value in channels.iter() {
        NetworkEndian::write_f32(&mut scratch, *value);
        buf.extend_from_slice(&scratch);
    }
}

fn decode_control_payload(payload: &[u8]) -> Result<Packet, PacketError> {
    if payload.len() != CONTROL_PAYLOAD_SIZE {
        return Err(PacketError::InvalidPayloadLength {
            packet_type: PacketType::Control,
            expected: CONTROL_PAYLOAD_SIZE,
            actual: payload.len(),
        });
    }

    let mut channels = [0f32; 9];
    for (i, value) in channels.iter_mut().enumerate() {
        *value = NetworkEndian::read_f32(&payload[i * 4..i * 4 + 4]);
    }

    Ok(Packet::Control(ControlDems {
        thrusters: [
            channels[0],
            channels[1],
            channels[2],
            channels[3],
            channels[4],
            channels[5],
        ],
        camera_tilt: channels[6],
        tool_wrist: channels[7],
        tool_grip: channels[8],
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eqpt::ThrusterId;

    #[test]
    fn test_control_round_trip() {
        let mut dems = ControlDems::neutral();
        dems[ThrusterId::FrontLeft] = 1.0;
        dems[ThrusterId::FrontRight] = -1.0;
        dems[ThrusterId::TopLeft] = 0.25;
        dems.camera_tilt = 0.5;
        dems.tool_grip = -0.75;

        let packet = Packet::Control(dems);
        let payload = packet.encode_payload();

        assert_eq!(payload.len(), CONTROL_PAYLOAD_SIZE);

        let decoded = Packet::decode(PacketType::Control.as_u16(), payload)
            .expect("decode failed");

        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_control_payload_layout() {
        let mut dems = ControlDems::neutral();
        dems[ThrusterId::FrontLeft] = 1.0;

        let payload = Packet::Control(dems).encode_payload();

        // 1.0f32 in network byte order, followed by eight zeroed channels
        assert_eq!(&payload[0..4], &[0x3f, 0x80, 0x00, 0x00]);
        assert!(payload[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_control_truncated_payload() {
        let result = Packet::decode(PacketType::Control.as_u16(), vec![0u8; 12]);

        match result {
            Err(PacketError::InvalidPayloadLength {
                expected, actual, ..
            }) => {
                assert_eq!(expected, CONTROL_PAYLOAD_SIZE);
                assert_eq!(actual, 12);
            }
            other => panic!("Expected InvalidPayloadLength, got {:?}", other),
        }
    }

    #[test]
    fn test_msg_round_trip() {
        let packet = Packet::Msg(String::from("thruster check complete"));
        let payload = packet.encode_payload();

        let decoded = Packet::decode(PacketType::Msg.as_u16(), payload)
            .expect("decode failed");

        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_msg_invalid_utf8() {
        let result = Packet::decode(PacketType::Msg.as_u16(), vec![0xff, 0xfe, 0xfd]);

        assert!(matches!(result, Err(PacketError::InvalidMsgPayload(_))));
    }

    #[test]
    fn test_unknown_type() {
        let result = Packet::decode(999, Vec::new());

        assert!(matches!(result, Err(PacketError::UnknownType(999))));
    }

    #[test]
    fn test_signal_packets_have_empty_payloads() {
        for packet in [
            Packet::None,
            Packet::Disconnect,
            Packet::DisconnectAck,
            Packet::EnableCorrection,
            Packet::DisableCorrection,
            Packet::StopServer,
        ]
        .iter()
        {
            assert_eq!(packet.payload_len(), 0);
            assert!(packet.encode_payload().is_empty());
        }
    }

    #[test]
    fn test_type_values_are_stable() {
        // Wire values are frozen, a renumbering here is a compatibility break
        assert_eq!(PacketType::None.as_u16(), 0);
        assert_eq!(PacketType::Msg.as_u16(), 1);
        assert_eq!(PacketType::Disconnect.as_u16(), 2);
        assert_eq!(PacketType::DisconnectAck.as_u16(), 3);
        assert_eq!(PacketType::Camera.as_u16(), 4);
        assert_eq!(PacketType::Control.as_u16(), 5);
        assert_eq!(PacketType::EnableCorrection.as_u16(), 6);
        assert_eq!(PacketType::DisableCorrection.as_u16(), 7);
        assert_eq!(PacketType::StopServer.as_u16(), 8);

        for raw in 0..9u16 {
            let t = PacketType::from_u16(raw).expect("type should parse");
            assert_eq!(t.as_u16(), raw);
        }

        assert!(PacketType::from_u16(9).is_none());
    }
}
