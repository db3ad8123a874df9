//! Frame serialization and parsing.
//!
//! One frame carries exactly one packet:
//!
//! ```text
//! u32 total_length | u16 version_major | u16 version_minor | u16 packet_id
//!     | u32 idempotency_token (only if the descriptor flags idempotent)
//!     | field_0 .. field_n (schema order)
//! ```
//!
//! All integers are big-endian. `total_length` counts the entire frame,
//! including the length field itself. A frame whose declared length
//! disagrees with the bytes present is rejected outright, never partially
//! processed, and a major-version mismatch is rejected regardless of minor.

use std::sync::Arc;

use crate::error::{ProtocolError, Result};
use crate::field::{self, FieldValue};
use crate::schema::{Direction, PacketDescriptor, SchemaRegistry};

/// Major protocol version. Frames with a different major are rejected.
pub const VERSION_MAJOR: u16 = 1;
/// Minor protocol version. Differences here are tolerated.
pub const VERSION_MINOR: u16 = 0;

/// Fixed header length: total_length + version pair + packet id.
pub const HEADER_LEN: usize = 4 + 2 + 2 + 2;

/// A typed packet value: a descriptor plus one value per declared field.
#[derive(Debug, Clone)]
pub struct Packet {
    descriptor: Arc<PacketDescriptor>,
    token: Option<u32>,
    values: Vec<FieldValue>,
}

impl Packet {
    /// Build a packet from field values given in schema order.
    ///
    /// Fails with [`ProtocolError::MissingField`] when too few values are
    /// supplied and [`ProtocolError::ExtraFields`] when too many are.
    pub fn with_fields(
        descriptor: Arc<PacketDescriptor>,
        values: Vec<FieldValue>,
    ) -> Result<Self> {
        if values.len() < descriptor.fields.len() {
            let (missing, _) = &descriptor.fields[values.len()];
            return Err(ProtocolError::MissingField {
                packet: descriptor.name.clone(),
                field: missing.clone(),
            });
        }
        if values.len() > descriptor.fields.len() {
            return Err(ProtocolError::ExtraFields {
                packet: descriptor.name.clone(),
                extra: values.len() - descriptor.fields.len(),
            });
        }
        Ok(Packet {
            descriptor,
            token: None,
            values,
        })
    }

    /// Set the idempotency token carried after the header.
    ///
    /// Only meaningful for descriptors flagged `idempotent`; ignored on the
    /// wire otherwise.
    pub fn with_token(mut self, token: u32) -> Self {
        self.token = Some(token);
        self
    }

    /// The packet's descriptor.
    pub fn descriptor(&self) -> &Arc<PacketDescriptor> {
        &self.descriptor
    }

    /// The idempotency token, if one was decoded or set.
    pub fn token(&self) -> Option<u32> {
        self.token
    }

    /// Value of the named field.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.descriptor
            .fields
            .iter()
            .position(|(n, _)| n == name)
            .map(|i| &self.values[i])
    }

    /// String value of the named field, if present and a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FieldValue::as_str)
    }

    /// Integer value of the named field, if present and an integer.
    pub fn uint_field(&self, name: &str) -> Option<u32> {
        self.field(name).and_then(FieldValue::as_uint)
    }

    /// Serialize into one complete frame.
    ///
    /// Pure function of the descriptor and field values; the only failure
    /// modes are field-level encode errors (overflow, embedded terminator).
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut body = Vec::with_capacity(HEADER_LEN + 16);
        // Length placeholder, patched below.
        body.extend_from_slice(&[0u8; 4]);
        body.extend_from_slice(&VERSION_MAJOR.to_be_bytes());
        body.extend_from_slice(&VERSION_MINOR.to_be_bytes());
        body.extend_from_slice(&self.descriptor.id.to_be_bytes());

        if self.descriptor.flags.idempotent {
            body.extend_from_slice(&self.token.unwrap_or(0).to_be_bytes());
        }

        for ((name, ty), value) in self.descriptor.fields.iter().zip(&self.values) {
            field::encode(value, *ty, &mut body).map_err(|source| ProtocolError::FieldCodec {
                field: name.clone(),
                source,
            })?;
        }

        let total = body.len() as u32;
        body[..4].copy_from_slice(&total.to_be_bytes());
        Ok(body)
    }
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.id == other.descriptor.id
            && self.descriptor.name == other.descriptor.name
            && self.token == other.token
            && self.values == other.values
    }
}

/// Parse one complete frame received in `direction`.
///
/// The buffer must hold exactly one frame; `total_length` is validated
/// against `buf.len()` before anything else is trusted.
pub fn parse(registry: &SchemaRegistry, direction: Direction, buf: &[u8]) -> Result<Packet> {
    if buf.len() < HEADER_LEN {
        return Err(ProtocolError::TooShort {
            actual: buf.len(),
            header: HEADER_LEN,
        });
    }

    let declared = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if declared != buf.len() {
        return Err(ProtocolError::LengthMismatch {
            declared,
            actual: buf.len(),
        });
    }

    let major = u16::from_be_bytes([buf[4], buf[5]]);
    let minor = u16::from_be_bytes([buf[6], buf[7]]);
    if major != VERSION_MAJOR {
        return Err(ProtocolError::VersionMismatch {
            peer_major: major,
            peer_minor: minor,
            local_major: VERSION_MAJOR,
        });
    }

    let id = u16::from_be_bytes([buf[8], buf[9]]);
    let descriptor = registry
        .by_id(direction, id)
        .ok_or(ProtocolError::UnknownPacketId { id, direction })?;

    let mut offset = HEADER_LEN;
    let token = if descriptor.flags.idempotent {
        if buf.len() < offset + 4 {
            return Err(ProtocolError::FieldCodec {
                field: "idempotency_token".to_string(),
                source: crate::error::FieldError::Truncated {
                    needed: 4,
                    remaining: buf.len() - offset,
                },
            });
        }
        let token = u32::from_be_bytes([
            buf[offset],
            buf[offset + 1],
            buf[offset + 2],
            buf[offset + 3],
        ]);
        offset += 4;
        Some(token)
    } else {
        None
    };

    let mut values = Vec::with_capacity(descriptor.fields.len());
    for (name, ty) in &descriptor.fields {
        let (value, consumed) =
            field::decode(*ty, &buf[offset..]).map_err(|source| ProtocolError::FieldCodec {
                field: name.clone(),
                source,
            })?;
        values.push(value);
        offset += consumed;
    }

    if offset != buf.len() {
        return Err(ProtocolError::TrailingBytes {
            packet: descriptor.name.clone(),
            trailing: buf.len() - offset,
        });
    }

    Ok(Packet {
        descriptor: Arc::clone(descriptor),
        token,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldError;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builtin().expect("builtin schema")
    }

    fn packet(reg: &SchemaRegistry, dir: Direction, name: &str, values: Vec<FieldValue>) -> Packet {
        let desc = reg.by_name(dir, name).expect("descriptor");
        Packet::with_fields(Arc::clone(desc), values).expect("packet")
    }

    #[test]
    fn test_roundtrip_plain_packet() {
        let reg = registry();
        let p = packet(
            &reg,
            Direction::Serverbound,
            "connect",
            vec!["alice".into()],
        );
        let bytes = p.serialize().unwrap();
        let parsed = parse(&reg, Direction::Serverbound, &bytes).unwrap();
        assert_eq!(parsed, p);
        assert_eq!(parsed.str_field("nickname"), Some("alice"));
    }

    #[test]
    fn test_roundtrip_idempotent_packet() {
        let reg = registry();
        let p = packet(
            &reg,
            Direction::Serverbound,
            "send_message",
            vec!["hello there".into()],
        )
        .with_token(0xCAFEF00D);

        let bytes = p.serialize().unwrap();
        // Token sits right after the 10-byte header.
        assert_eq!(&bytes[10..14], &0xCAFEF00Du32.to_be_bytes());

        let parsed = parse(&reg, Direction::Serverbound, &bytes).unwrap();
        assert_eq!(parsed.token(), Some(0xCAFEF00D));
        assert_eq!(parsed, p);
    }

    #[test]
    fn test_total_length_counts_whole_frame() {
        let reg = registry();
        let p = packet(
            &reg,
            Direction::Serverbound,
            "connect",
            vec!["bob".into()],
        );
        let bytes = p.serialize().unwrap();
        let declared = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(declared as usize, bytes.len());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let reg = registry();
        let p = packet(
            &reg,
            Direction::Serverbound,
            "connect",
            vec!["carol".into()],
        );
        let mut bytes = p.serialize().unwrap();
        bytes[3] = bytes[3].wrapping_add(2);

        let err = parse(&reg, Direction::Serverbound, &bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::LengthMismatch { .. }));
    }

    #[test]
    fn test_major_version_mismatch_rejected() {
        let reg = registry();
        let p = packet(
            &reg,
            Direction::Serverbound,
            "connect",
            vec!["dave".into()],
        );
        let mut bytes = p.serialize().unwrap();
        bytes[4] = 0x7F; // bogus major

        let err = parse(&reg, Direction::Serverbound, &bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::VersionMismatch { .. }));
    }

    #[test]
    fn test_minor_version_difference_tolerated() {
        let reg = registry();
        let p = packet(
            &reg,
            Direction::Serverbound,
            "connect",
            vec!["erin".into()],
        );
        let mut bytes = p.serialize().unwrap();
        bytes[6] = 0x01;
        bytes[7] = 0x2A; // minor 298, still fine

        assert!(parse(&reg, Direction::Serverbound, &bytes).is_ok());
    }

    #[test]
    fn test_unknown_packet_id_rejected() {
        let reg = registry();
        let p = packet(
            &reg,
            Direction::Serverbound,
            "connect",
            vec!["frank".into()],
        );
        let mut bytes = p.serialize().unwrap();
        bytes[8] = 0xEE;
        bytes[9] = 0xEE;

        let err = parse(&reg, Direction::Serverbound, &bytes).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnknownPacketId { id: 0xEEEE, .. }
        ));
    }

    #[test]
    fn test_direction_namespaces_are_distinct() {
        let reg = registry();
        // 0x10 is send_message serverbound but recieve_message clientbound.
        let p = packet(
            &reg,
            Direction::Clientbound,
            "recieve_message",
            vec!["alice".into(), "hi".into()],
        );
        let bytes = p.serialize().unwrap();

        let parsed = parse(&reg, Direction::Clientbound, &bytes).unwrap();
        assert_eq!(parsed.descriptor().name, "recieve_message");
        // The same id resolves to a different descriptor serverbound.
        let sb_desc = reg.by_id(Direction::Serverbound, 0x10).unwrap();
        assert_eq!(sb_desc.name, "send_message");
    }

    #[test]
    fn test_field_error_carries_field_name() {
        let reg = registry();
        let p = packet(
            &reg,
            Direction::Clientbound,
            "disconnect",
            vec!["grace".into(), "gone".into()],
        );
        let mut bytes = p.serialize().unwrap();
        // Drop the nts terminator and fix up the length.
        bytes.pop();
        let total = bytes.len() as u32;
        bytes[..4].copy_from_slice(&total.to_be_bytes());

        let err = parse(&reg, Direction::Clientbound, &bytes).unwrap_err();
        match err {
            ProtocolError::FieldCodec { field, source } => {
                assert_eq!(field, "message");
                assert_eq!(source, FieldError::MissingTerminator);
            }
            other => panic!("expected FieldCodec error, got {other:?}"),
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let reg = registry();
        let p = packet(&reg, Direction::Serverbound, "keep_alive", vec![]);
        let mut bytes = p.serialize().unwrap();
        bytes.push(0xAA);
        let total = bytes.len() as u32;
        bytes[..4].copy_from_slice(&total.to_be_bytes());

        let err = parse(&reg, Direction::Serverbound, &bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::TrailingBytes { trailing: 1, .. }));
    }

    #[test]
    fn test_with_fields_arity_checked() {
        let reg = registry();
        let desc = reg
            .by_name(Direction::Clientbound, "direct_message")
            .unwrap();
        let err = Packet::with_fields(Arc::clone(desc), vec!["alice".into()]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MissingField { field, .. } if field == "content"
        ));
    }

    #[test]
    fn test_with_fields_rejects_extra_values() {
        let reg = registry();
        let desc = reg.by_name(Direction::Serverbound, "connect").unwrap();
        let err =
            Packet::with_fields(Arc::clone(desc), vec!["alice".into(), "bob".into()]).unwrap_err();
        match err {
            ProtocolError::ExtraFields { packet, extra } => {
                assert_eq!(packet, "connect");
                assert_eq!(extra, 1);
            }
            other => panic!("expected ExtraFields error, got {other:?}"),
        }
    }
}
