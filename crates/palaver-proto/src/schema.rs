//! Packet schema registry.
//!
//! Packet layouts are data: a declarative TOML document names each packet,
//! its id, direction, flags and ordered field list. The registry is built
//! once at startup and read-only afterwards. Every schema entry must name a
//! member of the closed [`PacketKind`] set, so a typo'd or unknown packet
//! name is a load-time error rather than a runtime dispatch failure.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::field::FieldType;

/// Direction namespace a packet id lives in.
///
/// Ids are unique within a namespace, not across them: serverbound `0x01`
/// and clientbound `0x01` may be different packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Client to server.
    Serverbound,
    /// Server to client.
    Clientbound,
    /// Registered in both namespaces under the same id.
    Bidirectional,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Serverbound => "serverbound",
            Direction::Clientbound => "clientbound",
            Direction::Bidirectional => "bidirectional",
        })
    }
}

/// The closed set of packet kinds the protocol knows how to dispatch.
///
/// Schema entries select a kind by name; handlers match on this enum, never
/// on strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Join handshake (serverbound) / join notification (clientbound).
    Connect,
    /// Leave with optional reason.
    Disconnect,
    /// Serverbound chat message.
    SendMessage,
    /// Clientbound chat fan-out. Spelling is part of the wire schema.
    RecieveMessage,
    /// Nickname-addressed message.
    DirectMessage,
    /// Slash-command carried over the wire.
    Command,
    /// Third-person action message.
    Emote,
    /// Status + message correlated to the preceding request.
    Response,
    /// Liveness probe; resets the idle timer, nothing else.
    KeepAlive,
}

impl PacketKind {
    /// Resolve a schema packet name to its kind.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "connect" => PacketKind::Connect,
            "disconnect" => PacketKind::Disconnect,
            "send_message" => PacketKind::SendMessage,
            "recieve_message" => PacketKind::RecieveMessage,
            "direct_message" => PacketKind::DirectMessage,
            "command" => PacketKind::Command,
            "emote" => PacketKind::Emote,
            "response" => PacketKind::Response,
            "keep_alive" => PacketKind::KeepAlive,
            _ => return None,
        })
    }
}

/// Flag set attached to a packet descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketFlags {
    /// The sender expects a `response` packet for this request.
    pub response_requested: bool,
    /// The frame carries a 4-byte idempotency token after the header.
    pub idempotent: bool,
}

/// Schema entry for one packet: id, direction, flags, ordered fields.
#[derive(Debug)]
pub struct PacketDescriptor {
    /// Packet id, unique within each direction namespace it occupies.
    pub id: u16,
    /// Packet name as written in the schema.
    pub name: String,
    /// Dispatch kind for this packet.
    pub kind: PacketKind,
    /// Declared direction.
    pub direction: Direction,
    /// Flag set.
    pub flags: PacketFlags,
    /// Ordered field list: (name, type).
    pub fields: Vec<(String, FieldType)>,
}

#[derive(Debug, Deserialize)]
struct FieldDef {
    name: String,
    #[serde(rename = "type")]
    ty: FieldType,
}

#[derive(Debug, Deserialize)]
struct PacketDef {
    name: String,
    id: u16,
    direction: Direction,
    #[serde(default)]
    response: bool,
    #[serde(default)]
    idempotent: bool,
    #[serde(default)]
    fields: Vec<FieldDef>,
}

#[derive(Debug, Deserialize)]
struct SchemaDoc {
    #[serde(default, rename = "packet")]
    packets: Vec<PacketDef>,
}

/// Read-only lookup table from (direction, id) or (direction, name) to
/// packet descriptors.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    serverbound: HashMap<u16, Arc<PacketDescriptor>>,
    clientbound: HashMap<u16, Arc<PacketDescriptor>>,
    serverbound_names: HashMap<String, Arc<PacketDescriptor>>,
    clientbound_names: HashMap<String, Arc<PacketDescriptor>>,
}

impl SchemaRegistry {
    /// Build a registry from a TOML schema document.
    pub fn load_toml(input: &str) -> Result<Self, SchemaError> {
        let doc: SchemaDoc = toml::from_str(input)?;
        let mut registry = SchemaRegistry::default();

        for def in doc.packets {
            let kind = PacketKind::from_name(&def.name)
                .ok_or_else(|| SchemaError::UnknownKind(def.name.clone()))?;

            for (i, field) in def.fields.iter().enumerate() {
                if def.fields[..i].iter().any(|f| f.name == field.name) {
                    return Err(SchemaError::DuplicateField {
                        name: def.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }

            let descriptor = Arc::new(PacketDescriptor {
                id: def.id,
                name: def.name,
                kind,
                direction: def.direction,
                flags: PacketFlags {
                    response_requested: def.response,
                    idempotent: def.idempotent,
                },
                fields: def.fields.into_iter().map(|f| (f.name, f.ty)).collect(),
            });

            match def.direction {
                Direction::Serverbound => registry.insert_serverbound(descriptor)?,
                Direction::Clientbound => registry.insert_clientbound(descriptor)?,
                Direction::Bidirectional => {
                    registry.insert_serverbound(Arc::clone(&descriptor))?;
                    registry.insert_clientbound(descriptor)?;
                }
            }
        }

        Ok(registry)
    }

    /// Build the registry from the schema document shipped with this crate.
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::load_toml(include_str!("../schema.toml"))
    }

    fn insert_serverbound(&mut self, desc: Arc<PacketDescriptor>) -> Result<(), SchemaError> {
        if let Some(existing) = self.serverbound.get(&desc.id) {
            return Err(SchemaError::DuplicateId {
                id: desc.id,
                direction: Direction::Serverbound,
                first: existing.name.clone(),
                second: desc.name.clone(),
            });
        }
        if self.serverbound_names.contains_key(&desc.name) {
            return Err(SchemaError::DuplicateName {
                name: desc.name.clone(),
                direction: Direction::Serverbound,
            });
        }
        self.serverbound.insert(desc.id, Arc::clone(&desc));
        self.serverbound_names.insert(desc.name.clone(), desc);
        Ok(())
    }

    fn insert_clientbound(&mut self, desc: Arc<PacketDescriptor>) -> Result<(), SchemaError> {
        if let Some(existing) = self.clientbound.get(&desc.id) {
            return Err(SchemaError::DuplicateId {
                id: desc.id,
                direction: Direction::Clientbound,
                first: existing.name.clone(),
                second: desc.name.clone(),
            });
        }
        if self.clientbound_names.contains_key(&desc.name) {
            return Err(SchemaError::DuplicateName {
                name: desc.name.clone(),
                direction: Direction::Clientbound,
            });
        }
        self.clientbound.insert(desc.id, Arc::clone(&desc));
        self.clientbound_names.insert(desc.name.clone(), desc);
        Ok(())
    }

    /// Look up a descriptor by id in the given wire direction.
    pub fn by_id(&self, direction: Direction, id: u16) -> Option<&Arc<PacketDescriptor>> {
        match direction {
            Direction::Serverbound => self.serverbound.get(&id),
            Direction::Clientbound => self.clientbound.get(&id),
            // Bidirectional is a declaration property, not a wire direction;
            // fall back to either namespace for convenience.
            Direction::Bidirectional => self
                .serverbound
                .get(&id)
                .or_else(|| self.clientbound.get(&id)),
        }
    }

    /// Look up a descriptor by name in the given wire direction.
    pub fn by_name(&self, direction: Direction, name: &str) -> Option<&Arc<PacketDescriptor>> {
        match direction {
            Direction::Serverbound => self.serverbound_names.get(name),
            Direction::Clientbound => self.clientbound_names.get(name),
            Direction::Bidirectional => self
                .serverbound_names
                .get(name)
                .or_else(|| self.clientbound_names.get(name)),
        }
    }
}
