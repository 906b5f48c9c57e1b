//! # Teehistorian
//!
//! Tick-oriented binary recorder for DDNet-style game servers. Captures
//! everything needed to reconstruct a session: player positions, raw
//! inputs, joins and drops, network messages, console commands and team
//! state, as a compact delta-encoded stream.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       TEEHISTORIAN                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Wire primitives                         │
//! │  ├── packer.rs     - Variable-length integer packing         │
//! │  ├── name_uuid.rs  - Name-based UUIDs and registry           │
//! │  └── hash.rs       - Map digests                             │
//! │                                                              │
//! │  recorder/         - Recording                               │
//! │  ├── teehistorian.rs - Tick state machine                    │
//! │  ├── extra.rs      - Side-channel and extension records      │
//! │  ├── records.rs    - Record tags and encodings               │
//! │  ├── header.rs     - JSON session header                     │
//! │  ├── input.rs      - Positions and player inputs             │
//! │  ├── state.rs      - Phases and per-client history           │
//! │  └── sink.rs       - Output destinations                     │
//! │                                                              │
//! │  config.rs         - Environment configuration               │
//! │  error.rs          - Error types                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stream Layout
//!
//! A 16-byte magic UUID, the NUL-terminated header JSON, then records.
//! A position diff starts with the client id; every other record starts
//! with a negative tag. All integers are DDNet variable-length ints.
//! Nothing is written for a player whose state did not change, and tick
//! boundaries are omitted whenever a reader can infer them.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod error;
pub mod recorder;

// Re-export commonly used types
pub use config::RecorderConfig;
pub use error::RecorderError;
pub use recorder::{
    CharacterCore, ConfigVariable, GameInfo, IoSink, PlayerInput, Protocol, Teehistorian,
    TuningParam, WriteSink,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
