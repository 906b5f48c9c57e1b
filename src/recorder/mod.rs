//! Recorder
//!
//! The tick state machine and everything it writes: record encodings,
//! the JSON header, per-client delta state and the output sink.

pub mod extra;
pub mod header;
pub mod input;
pub mod records;
pub mod sink;
pub mod state;
pub mod teehistorian;

pub use header::{ConfigValue, ConfigVariable, GameInfo, TuningParam};
pub use input::{CharacterCore, PlayerInput};
pub use records::{ExtraChunk, Protocol, RecordTag};
pub use sink::{FnSink, IoSink, WriteSink};
pub use state::{RecorderState, MAX_CLIENTS, MAX_TEAMS};
pub use teehistorian::Teehistorian;
