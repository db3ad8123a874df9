//! # palaver-proto
//!
//! A Rust library for the palaver chat wire protocol: a schema-driven,
//! length-prefixed binary packet format.
//!
//! ## Features
//!
//! - Closed-set field codec: fixed-width big-endian unsigned integers,
//!   length-delimited strings, null-terminated strings
//! - Declarative packet schema loaded from TOML into a read-only registry,
//!   with direction-namespaced packet ids
//! - Versioned frame serialization and parsing with strict length and
//!   major-version validation
//! - Optional Tokio integration: a `tokio_util` codec for framing packets
//!   over TCP
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use palaver_proto::{frame, Direction, Packet, SchemaRegistry};
//!
//! let registry = SchemaRegistry::builtin().expect("schema");
//! let desc = registry
//!     .by_name(Direction::Serverbound, "connect")
//!     .expect("connect packet");
//!
//! let packet = Packet::with_fields(Arc::clone(desc), vec!["alice".into()]).unwrap();
//! let bytes = packet.serialize().unwrap();
//!
//! let parsed = frame::parse(&registry, Direction::Serverbound, &bytes).unwrap();
//! assert_eq!(parsed, packet);
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod field;
pub mod frame;
pub mod schema;

#[cfg(feature = "tokio")]
pub mod codec;

pub use self::error::{FieldError, ProtocolError, Result, SchemaError};
pub use self::field::{FieldType, FieldValue};
pub use self::frame::{Packet, HEADER_LEN, VERSION_MAJOR, VERSION_MINOR};
pub use self::schema::{
    Direction, PacketDescriptor, PacketFlags, PacketKind, SchemaRegistry,
};

#[cfg(feature = "tokio")]
pub use self::codec::{FrameCodec, DEFAULT_MAX_FRAME_LEN};
