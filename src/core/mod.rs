//! Core wire primitives.
//!
//! Everything here is independent of the recorder state machine and is
//! byte-compatible with the DDNet implementations readers are built against.

pub mod packer;
pub mod name_uuid;
pub mod hash;

// Re-export core types
pub use packer::{Packer, Unpacker};
pub use name_uuid::{calculate_uuid, UuidRegistry};
pub use hash::{sha256_digest, Sha256Digest};
