//! Error types for the palaver protocol library.
//!
//! Three layers of failure are kept distinct: field-level codec errors,
//! frame-level errors, and schema load errors. Frame and field errors are
//! per-frame conditions — a server discards the offending frame and keeps
//! the connection; schema errors only occur at startup and are fatal there.

use thiserror::Error;

use crate::schema::Direction;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors produced while encoding or decoding a single wire field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FieldError {
    /// Fewer bytes were available than the field type requires.
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the field type needs.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// An integer value does not fit the declared bit width.
    #[error("value {value} overflows a {bits}-bit unsigned integer")]
    Overflow {
        /// The offending value.
        value: u32,
        /// Declared width in bits.
        bits: u32,
    },

    /// A length-delimited string declared more bytes than remain.
    #[error("declared length {declared} exceeds {remaining} remaining bytes")]
    LengthMismatch {
        /// Length byte value.
        declared: usize,
        /// Bytes left after the length byte.
        remaining: usize,
    },

    /// A length-delimited string value is longer than 255 bytes.
    #[error("string of {len} bytes too long for length-delimited encoding")]
    StringTooLong {
        /// Byte length of the value.
        len: usize,
    },

    /// No 0x00 terminator found for a null-terminated string.
    #[error("missing terminator in null-terminated string")]
    MissingTerminator,

    /// A null-terminated string value contains an embedded 0x00 byte.
    ///
    /// Encoding such a value would truncate it on the way back in, breaking
    /// round-trip correctness, so it is rejected outright.
    #[error("embedded 0x00 byte at offset {offset} in null-terminated string")]
    EmbeddedTerminator {
        /// Byte offset of the first embedded terminator.
        offset: usize,
    },

    /// The value's variant does not match the field's declared type.
    #[error("value kind {got} does not match field type {expected}")]
    TypeMismatch {
        /// Declared field type name.
        expected: &'static str,
        /// Supplied value kind.
        got: &'static str,
    },

    /// Decoded string bytes were not valid UTF-8.
    #[error("invalid utf-8 in string field: {0}")]
    InvalidUtf8(String),
}

/// Top-level frame codec errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The frame's declared total length disagrees with the bytes present.
    #[error("frame length mismatch: declared {declared}, got {actual} bytes")]
    LengthMismatch {
        /// Value of the total_length header field.
        declared: usize,
        /// Actual byte count of the frame.
        actual: usize,
    },

    /// The frame's major protocol version differs from ours.
    ///
    /// Minor version differences are tolerated; a major mismatch means the
    /// field layouts cannot be trusted.
    #[error("protocol version mismatch: peer {peer_major}.{peer_minor}, local {local_major}.x")]
    VersionMismatch {
        /// Peer's major version.
        peer_major: u16,
        /// Peer's minor version.
        peer_minor: u16,
        /// Our major version.
        local_major: u16,
    },

    /// The packet id is not registered in the direction namespace.
    #[error("unknown packet id {id:#06x} ({direction})")]
    UnknownPacketId {
        /// The unrecognized id.
        id: u16,
        /// Namespace the lookup ran in.
        direction: Direction,
    },

    /// The frame is shorter than the fixed header.
    #[error("frame of {actual} bytes shorter than the {header} byte header")]
    TooShort {
        /// Actual frame length.
        actual: usize,
        /// Required header length.
        header: usize,
    },

    /// Frame exceeded the maximum allowed size.
    #[error("frame too large: {actual} bytes (limit: {limit})")]
    FrameTooLarge {
        /// Declared frame length.
        actual: usize,
        /// Configured limit.
        limit: usize,
    },

    /// A declared field failed to encode or decode.
    #[error("field `{field}` codec error: {source}")]
    FieldCodec {
        /// Name of the field from the packet descriptor.
        field: String,
        /// The underlying field codec error.
        #[source]
        source: FieldError,
    },

    /// The packet value is missing a field its descriptor declares.
    #[error("packet `{packet}` missing declared field `{field}`")]
    MissingField {
        /// Packet name.
        packet: String,
        /// Missing field name.
        field: String,
    },

    /// Trailing bytes were left after all declared fields decoded.
    #[error("{trailing} trailing bytes after last field of `{packet}`")]
    TrailingBytes {
        /// Packet name.
        packet: String,
        /// Count of undecoded bytes.
        trailing: usize,
    },

    /// More field values were supplied than the descriptor declares.
    #[error("packet `{packet}` given {extra} field values beyond its declared fields")]
    ExtraFields {
        /// Packet name.
        packet: String,
        /// Count of surplus values.
        extra: usize,
    },

    /// No packet with this name is registered in the direction namespace.
    #[error("unknown packet name `{name}` ({direction})")]
    UnknownPacketName {
        /// The unrecognized name.
        name: String,
        /// Namespace the lookup ran in.
        direction: Direction,
    },
}

/// Errors raised while loading the packet schema. All are startup-fatal.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// The schema document failed to parse.
    #[error("schema parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Two descriptors share an id within one direction namespace.
    #[error("duplicate packet id {id:#06x} in {direction} namespace ({first} and {second})")]
    DuplicateId {
        /// The colliding id.
        id: u16,
        /// Namespace of the collision.
        direction: Direction,
        /// First descriptor with this id.
        first: String,
        /// Second descriptor with this id.
        second: String,
    },

    /// Two descriptors share a name within one direction namespace.
    #[error("duplicate packet name `{name}` in {direction} namespace")]
    DuplicateName {
        /// The colliding name.
        name: String,
        /// Namespace of the collision.
        direction: Direction,
    },

    /// A descriptor name has no corresponding handler variant.
    ///
    /// The set of packet kinds is closed; schema entries select from it
    /// rather than conjuring new types at load time.
    #[error("schema names unknown packet kind `{0}`")]
    UnknownKind(String),

    /// A descriptor declares the same field name twice.
    #[error("packet `{name}` declares duplicate field `{field}`")]
    DuplicateField {
        /// Packet name.
        name: String,
        /// Repeated field name.
        field: String,
    },
}
