//! Recorder Phase and Per-Client History
//!
//! Everything the recorder remembers between calls: which phase of the tick
//! it is in and, per client slot and team, the last state it wrote.

use crate::recorder::input::PlayerInput;

/// Number of addressable client slots.
pub const MAX_CLIENTS: usize = 64;

/// Number of addressable team slots.
pub const MAX_TEAMS: usize = MAX_CLIENTS;

/// Phase of the per-tick call sequence.
///
/// ```text
/// Start|BeforeTick ─begin_tick─► BeforePlayers ─begin_players─► Players
///   ▲                                                            │
///   │                                                       end_players
///   │                                                            ▼
/// end_tick ◄─ BeforeEndTick ◄─end_inputs─ Inputs ◄─begin_inputs─ BeforeInputs
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderState {
    /// Fresh or just reset; no tick begun yet.
    Start,
    /// Tick begun, players not yet.
    BeforePlayers,
    /// Inside the players bracket.
    Players,
    /// Players done, inputs not begun.
    BeforeInputs,
    /// Inside the inputs bracket.
    Inputs,
    /// Inputs done, tick not ended.
    BeforeEndTick,
    /// Tick ended; ready for the next.
    BeforeTick,
}

impl RecorderState {
    /// States a new tick may begin from (also the only states `reset` is
    /// legal in).
    #[inline]
    pub fn accepts_tick(self) -> bool {
        matches!(self, Self::Start | Self::BeforeTick)
    }

    /// States `finish` may be called from.
    #[inline]
    pub fn accepts_finish(self) -> bool {
        matches!(
            self,
            Self::Start | Self::Inputs | Self::BeforeEndTick | Self::BeforeTick
        )
    }
}

/// Last written state of one client slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrevPlayer {
    /// Whether the character was alive in the last written tick
    pub alive: bool,
    /// Last written X position
    pub x: i32,
    /// Last written Y position
    pub y: i32,
    /// Last written team
    pub team: i32,
    /// Whether `input` holds a previously written input
    pub input_exists: bool,
    /// Last written input
    pub input: PlayerInput,
}

/// Last written state of one team slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrevTeam {
    /// Whether practice mode was on
    pub practice: bool,
}

/// Validate a client id and turn it into an array index.
///
/// # Panics
/// Panics if `client_id` is outside `0..MAX_CLIENTS`.
#[inline]
pub fn client_slot(client_id: i32) -> usize {
    assert!(
        (0..MAX_CLIENTS as i32).contains(&client_id),
        "invalid client id {}",
        client_id
    );
    client_id as usize
}

/// Validate a team and turn it into an array index.
///
/// # Panics
/// Panics if `team` is outside `0..MAX_TEAMS`.
#[inline]
pub fn team_slot(team: i32) -> usize {
    assert!(
        (0..MAX_TEAMS as i32).contains(&team),
        "invalid team {}",
        team
    );
    team as usize
}
