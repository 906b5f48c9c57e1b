//! Record Encoding
//!
//! Every record starts with one packed integer. Non-negative values are a
//! client id and mark a position diff; control records use the negated
//! [`RecordTag`]. Side-channel events go through the EX record, keyed by a
//! name-derived UUID so readers can skip kinds they do not know.

use uuid::Uuid;

use crate::core::name_uuid::calculate_uuid;
use crate::core::packer::Packer;
use crate::error::RecorderError;
use crate::recorder::input::PlayerInput;

/// Name the stream magic is derived from; also the header `comment`.
pub const TEEHISTORIAN_NAME: &str = "teehistorian@ddnet.tw";

/// Major format version written to the header.
pub const TEEHISTORIAN_VERSION: &str = "2";

/// Minor format version written to the header.
pub const TEEHISTORIAN_VERSION_MINOR: &str = "4";

/// Magic UUID at the very start of every stream.
pub fn teehistorian_uuid() -> Uuid {
    calculate_uuid(TEEHISTORIAN_NAME)
}

/// Control record tags. Written negated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum RecordTag {
    /// End of stream
    Finish = 1,
    /// Explicit tick boundary
    TickSkip = 2,
    /// Character appeared
    PlayerNew = 3,
    /// Character disappeared
    PlayerOld = 4,
    /// Input changed relative to the last one
    InputDiff = 5,
    /// First input of a client
    InputNew = 6,
    /// Raw network message from a client
    Message = 7,
    /// Client joined
    Join = 8,
    /// Client left
    Drop = 9,
    /// Console command executed
    ConsoleCommand = 10,
    /// UUID-tagged extension record
    Ex = 11,
}

impl RecordTag {
    /// Value as it appears on the wire.
    #[inline]
    pub const fn wire(self) -> i32 {
        -(self as i32)
    }

    /// Inverse of [`RecordTag::wire`]; `None` for position diffs and unknown tags.
    pub fn from_wire(tag: i32) -> Option<Self> {
        Some(match tag {
            -1 => Self::Finish,
            -2 => Self::TickSkip,
            -3 => Self::PlayerNew,
            -4 => Self::PlayerOld,
            -5 => Self::InputDiff,
            -6 => Self::InputNew,
            -7 => Self::Message,
            -8 => Self::Join,
            -9 => Self::Drop,
            -10 => Self::ConsoleCommand,
            -11 => Self::Ex,
            _ => return None,
        })
    }
}

/// Kinds of extension record, each with its own versionable name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExtraChunk {
    /// Empty marker used by reader tests
    Test,
    /// Pre-UUID client version announcement
    DdnetVersionOld,
    /// Client version with connection id and version string
    DdnetVersion,
    /// Client authenticated on connect
    AuthInit,
    /// Client logged in to rcon
    AuthLogin,
    /// Client logged out of rcon
    AuthLogout,
    /// Client joined with protocol 0.6
    JoinVer6,
    /// Client joined with protocol 0.7
    JoinVer7,
    /// Team state saved
    SaveSuccess,
    /// Team save failed
    SaveFailure,
    /// Team state loaded
    LoadSuccess,
    /// Team load failed
    LoadFailure,
    /// Player switched team
    PlayerTeam,
    /// Team practice mode toggled
    TeamPractice,
    /// Player finished connecting
    PlayerReady,
}

impl ExtraChunk {
    /// Every extension kind.
    pub const ALL: [ExtraChunk; 15] = [
        Self::Test,
        Self::DdnetVersionOld,
        Self::DdnetVersion,
        Self::AuthInit,
        Self::AuthLogin,
        Self::AuthLogout,
        Self::JoinVer6,
        Self::JoinVer7,
        Self::SaveSuccess,
        Self::SaveFailure,
        Self::LoadSuccess,
        Self::LoadFailure,
        Self::PlayerTeam,
        Self::TeamPractice,
        Self::PlayerReady,
    ];

    /// Name the UUID is derived from.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Test => "teehistorian-test@ddnet.tw",
            Self::DdnetVersionOld => "teehistorian-ddnetver-old@ddnet.tw",
            Self::DdnetVersion => "teehistorian-ddnetver@ddnet.tw",
            Self::AuthInit => "teehistorian-auth-init@ddnet.tw",
            Self::AuthLogin => "teehistorian-auth-login@ddnet.tw",
            Self::AuthLogout => "teehistorian-auth-logout@ddnet.tw",
            Self::JoinVer6 => "teehistorian-joinver6@ddnet.org",
            Self::JoinVer7 => "teehistorian-joinver7@ddnet.org",
            Self::SaveSuccess => "teehistorian-save-success@ddnet.tw",
            Self::SaveFailure => "teehistorian-save-failure@ddnet.tw",
            Self::LoadSuccess => "teehistorian-load-success@ddnet.tw",
            Self::LoadFailure => "teehistorian-load-failure@ddnet.tw",
            Self::PlayerTeam => "teehistorian-player-team@ddnet.tw",
            Self::TeamPractice => "teehistorian-team-practice@ddnet.tw",
            Self::PlayerReady => "teehistorian-player-ready@ddnet.org",
        }
    }

    /// Identifier written into the EX record.
    pub fn uuid(self) -> Uuid {
        calculate_uuid(self.name())
    }
}

/// Network protocol generation a client joined with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    /// Teeworlds 0.6 / DDNet
    V6,
    /// Teeworlds 0.7
    V7,
}

impl Protocol {
    /// Extension kind announcing a join with this protocol.
    pub const fn join_chunk(self) -> ExtraChunk {
        match self {
            Self::V6 => ExtraChunk::JoinVer6,
            Self::V7 => ExtraChunk::JoinVer7,
        }
    }

    /// Short version number for traces.
    pub const fn number(self) -> i32 {
        match self {
            Self::V6 => 6,
            Self::V7 => 7,
        }
    }
}

impl TryFrom<i32> for Protocol {
    type Error = RecorderError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            6 => Ok(Self::V6),
            7 => Ok(Self::V7),
            other => Err(RecorderError::InvalidProtocol(other)),
        }
    }
}

/// A self-describing side-channel record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtensionRecord<'a> {
    /// Record kind
    pub uuid: Uuid,
    /// Packed payload, opaque to readers that do not know `uuid`
    pub payload: &'a [u8],
}

impl<'a> ExtensionRecord<'a> {
    /// Wrap a payload.
    pub fn new(uuid: Uuid, payload: &'a [u8]) -> Self {
        Self { uuid, payload }
    }

    /// Record of a known extension kind.
    pub fn of(chunk: ExtraChunk, payload: &'a [u8]) -> Self {
        Self::new(chunk.uuid(), payload)
    }

    /// `{ -EX, uuid, len, payload }`
    pub fn encode(&self, packer: &mut Packer) {
        packer.add_int(RecordTag::Ex.wire());
        packer.add_raw(self.uuid.as_bytes());
        packer.add_int(self.payload.len() as i32);
        packer.add_raw(self.payload);
    }
}

// =============================================================================
// RECORD BUILDERS
// =============================================================================

/// `{ -TICK_SKIP, dt }`
pub fn encode_tick_skip(packer: &mut Packer, dt: i32) {
    packer.add_int(RecordTag::TickSkip.wire());
    packer.add_int(dt);
}

/// `{ client_id, dx, dy }`
pub fn encode_player_diff(packer: &mut Packer, client_id: i32, dx: i32, dy: i32) {
    packer.add_int(client_id);
    packer.add_int(dx);
    packer.add_int(dy);
}

/// `{ -PLAYER_NEW, client_id, x, y }`
pub fn encode_player_new(packer: &mut Packer, client_id: i32, x: i32, y: i32) {
    packer.add_int(RecordTag::PlayerNew.wire());
    packer.add_int(client_id);
    packer.add_int(x);
    packer.add_int(y);
}

/// `{ -PLAYER_OLD, client_id }`
pub fn encode_player_old(packer: &mut Packer, client_id: i32) {
    packer.add_int(RecordTag::PlayerOld.wire());
    packer.add_int(client_id);
}

/// `{ -INPUT_DIFF|-INPUT_NEW, client_id, fields... }`
pub fn encode_input(
    packer: &mut Packer,
    tag: RecordTag,
    client_id: i32,
    fields: &[i32; PlayerInput::FIELDS],
) {
    debug_assert!(matches!(tag, RecordTag::InputDiff | RecordTag::InputNew));
    packer.add_int(tag.wire());
    packer.add_int(client_id);
    for &field in fields {
        packer.add_int(field);
    }
}

/// `{ -MESSAGE, client_id, len, raw }`
pub fn encode_message(packer: &mut Packer, client_id: i32, msg: &[u8]) {
    packer.add_int(RecordTag::Message.wire());
    packer.add_int(client_id);
    packer.add_int(msg.len() as i32);
    packer.add_raw(msg);
}

/// `{ -JOIN, client_id }`
pub fn encode_join(packer: &mut Packer, client_id: i32) {
    packer.add_int(RecordTag::Join.wire());
    packer.add_int(client_id);
}

/// `{ -DROP, client_id, reason }`
pub fn encode_drop(packer: &mut Packer, client_id: i32, reason: &str) {
    packer.add_int(RecordTag::Drop.wire());
    packer.add_int(client_id);
    packer.add_string(reason);
}

/// `{ -CONSOLE_COMMAND, client_id, flag_mask, cmd, argc, args... }`
pub fn encode_console_command<A: AsRef<str>>(
    packer: &mut Packer,
    client_id: i32,
    flag_mask: i32,
    cmd: &str,
    args: &[A],
) {
    packer.add_int(RecordTag::ConsoleCommand.wire());
    packer.add_int(client_id);
    packer.add_int(flag_mask);
    packer.add_string(cmd);
    packer.add_int(args.len() as i32);
    for arg in args {
        packer.add_string(arg.as_ref());
    }
}

/// `{ -FINISH }`
pub fn encode_finish(packer: &mut Packer) {
    packer.add_int(RecordTag::Finish.wire());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::packer::Unpacker;
    use std::collections::HashSet;

    #[test]
    fn test_tag_wire_values() {
        assert_eq!(RecordTag::Finish.wire(), -1);
        assert_eq!(RecordTag::Ex.wire(), -11);
        for tag in -11..=-1 {
            assert_eq!(RecordTag::from_wire(tag).map(RecordTag::wire), Some(tag));
        }
        assert_eq!(RecordTag::from_wire(0), None);
        assert_eq!(RecordTag::from_wire(-12), None);
    }

    #[test]
    fn test_extra_chunk_uuids_are_distinct() {
        let uuids: HashSet<_> = ExtraChunk::ALL.iter().map(|c| c.uuid()).collect();
        assert_eq!(uuids.len(), ExtraChunk::ALL.len());
        assert!(!uuids.contains(&teehistorian_uuid()));
    }

    #[test]
    fn test_test_chunk_uuid() {
        assert_eq!(
            ExtraChunk::Test.uuid().to_string(),
            "6bb8ba88-0f0b-382e-8dae-dbf4052b8b7d"
        );
    }

    #[test]
    fn test_protocol_conversion() {
        assert_eq!(Protocol::try_from(6).unwrap(), Protocol::V6);
        assert_eq!(Protocol::try_from(7).unwrap().join_chunk(), ExtraChunk::JoinVer7);
        assert!(matches!(
            Protocol::try_from(5),
            Err(RecorderError::InvalidProtocol(5))
        ));
    }

    #[test]
    fn test_extension_framing() {
        let record = ExtensionRecord::of(ExtraChunk::PlayerReady, &[7, 8, 9]);
        let mut packer = Packer::new();
        record.encode(&mut packer);

        let mut unpacker = Unpacker::new(packer.data());
        assert_eq!(unpacker.get_int(), Some(RecordTag::Ex.wire()));
        assert_eq!(unpacker.get_raw(16), Some(&record.uuid.as_bytes()[..]));
        assert_eq!(unpacker.get_int(), Some(3));
        assert_eq!(unpacker.get_raw(3), Some(&[7, 8, 9][..]));
        assert!(unpacker.is_empty());
    }

    #[test]
    fn test_console_command_layout() {
        let mut packer = Packer::new();
        encode_console_command(&mut packer, 2, 4, "tune", &["gravity", "0.5"]);

        let mut unpacker = Unpacker::new(packer.data());
        assert_eq!(unpacker.get_int(), Some(-10));
        assert_eq!(unpacker.get_int(), Some(2));
        assert_eq!(unpacker.get_int(), Some(4));
        assert_eq!(unpacker.get_string().as_deref(), Some("tune"));
        assert_eq!(unpacker.get_int(), Some(2));
        assert_eq!(unpacker.get_string().as_deref(), Some("gravity"));
        assert_eq!(unpacker.get_string().as_deref(), Some("0.5"));
        assert!(unpacker.is_empty());
    }
}
