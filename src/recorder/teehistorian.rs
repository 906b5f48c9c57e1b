//! Tick Recorder State Machine
//!
//! Drives one recording. The host calls, once per simulation tick:
//!
//! ```text
//! begin_tick ─► begin_players ─► record_player* ─► end_players
//!            ─► begin_inputs  ─► record_player_input* ─► end_inputs ─► end_tick
//! ```
//!
//! ## Implicit ticks
//!
//! Tick boundaries cost nothing when they can be inferred. A player record
//! whose client id does not exceed the previous tick's highest written id
//! can only belong to the next tick, so if the tick is the direct successor
//! of the last written one no TICK_SKIP is emitted. Everything else
//! (larger ids, gaps, non-player records) forces an explicit TICK_SKIP
//! carrying the number of silent ticks in between.
//!
//! Misuse of the call order panics: once the sequence is broken the stream
//! can no longer be decoded.

use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::RecorderConfig;
use crate::core::packer::Packer;
use crate::error::RecorderError;
use crate::recorder::header::{header_bytes, GameInfo};
use crate::recorder::input::{CharacterCore, PlayerInput};
use crate::recorder::records::{
    encode_finish, encode_input, encode_player_diff, encode_player_new,
    encode_player_old, encode_tick_skip, ExtensionRecord, RecordTag,
};
use crate::recorder::sink::WriteSink;
use crate::recorder::state::{
    client_slot, PrevPlayer, PrevTeam, RecorderState, MAX_CLIENTS, MAX_TEAMS,
};

const INVALID_STATE: &str = "invalid teehistorian state";

/// Binary history recorder.
pub struct Teehistorian<S: WriteSink> {
    pub(crate) config: RecorderConfig,
    pub(crate) state: RecorderState,
    sink: Option<S>,
    started: bool,

    tick: i32,
    last_written_tick: i32,
    tick_written: bool,
    max_client_id: i32,
    prev_max_client_id: i32,

    pub(crate) prev_players: [PrevPlayer; MAX_CLIENTS],
    pub(crate) prev_teams: [PrevTeam; MAX_TEAMS],
}

impl<S: WriteSink> Default for Teehistorian<S> {
    fn default() -> Self {
        Self::new(RecorderConfig::default())
    }
}

impl<S: WriteSink> Teehistorian<S> {
    /// Create a recorder. Nothing is written until [`Teehistorian::reset`].
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            state: RecorderState::Start,
            sink: None,
            started: false,
            tick: 0,
            last_written_tick: 0,
            tick_written: true,
            max_client_id: MAX_CLIENTS as i32,
            prev_max_client_id: MAX_CLIENTS as i32,
            prev_players: [PrevPlayer::default(); MAX_CLIENTS],
            prev_teams: [PrevTeam::default(); MAX_TEAMS],
        }
    }

    /// Start a new recording into `sink`, writing the header.
    ///
    /// Returns the previous sink, if any.
    ///
    /// # Panics
    /// Panics unless called between ticks.
    pub fn reset(&mut self, game_info: &GameInfo, sink: S) -> Result<Option<S>, RecorderError> {
        assert!(self.state.accepts_tick(), "{}", INVALID_STATE);

        // Serialise before touching state so a failure leaves the recorder as it was
        let header = header_bytes(game_info)?;

        self.tick = 0;
        self.last_written_tick = 0;
        // Tick 0 is implicit at the start, the game starts at tick 1
        self.tick_written = true;
        self.max_client_id = MAX_CLIENTS as i32;
        self.prev_players = [PrevPlayer::default(); MAX_CLIENTS];
        self.prev_teams = [PrevTeam::default(); MAX_TEAMS];

        let previous = self.sink.replace(sink);
        self.started = true;
        self.write(&header);

        self.state = RecorderState::Start;
        Ok(previous)
    }

    /// Current phase.
    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Tick most recently passed to [`Teehistorian::begin_tick`].
    pub fn tick(&self) -> i32 {
        self.tick
    }

    /// Active configuration.
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Borrow the sink.
    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    /// Borrow the sink mutably.
    pub fn sink_mut(&mut self) -> Option<&mut S> {
        self.sink.as_mut()
    }

    /// Detach the sink. Further records are dropped until the next reset.
    pub fn take_sink(&mut self) -> Option<S> {
        self.sink.take()
    }

    // =========================================================================
    // TICK PHASES
    // =========================================================================

    /// Begin simulation tick `tick`.
    pub fn begin_tick(&mut self, tick: i32) {
        assert!(self.state.accepts_tick(), "{}", INVALID_STATE);

        self.tick = tick;
        self.tick_written = false;

        if self.config.traces_ticks() {
            trace!(target: "teehistorian", "tick {}", tick);
        }

        self.state = RecorderState::BeforePlayers;
    }

    /// Open the players bracket.
    pub fn begin_players(&mut self) {
        assert!(self.state == RecorderState::BeforePlayers, "{}", INVALID_STATE);

        self.prev_max_client_id = self.max_client_id;
        // Player records written after a TICK_SKIP must not make the next
        // tick implicit, so the high-water mark restarts for this tick
        self.max_client_id = -1;

        self.state = RecorderState::Players;
    }

    /// Record a living character at its current position.
    ///
    /// Emits PLAYER_NEW if the character was dead, a position diff if it
    /// moved, nothing otherwise.
    pub fn record_player(&mut self, client_id: i32, character: &CharacterCore) {
        assert!(self.state == RecorderState::Players, "{}", INVALID_STATE);

        let slot = client_slot(client_id);
        let prev = self.prev_players[slot];
        if !prev.alive || prev.x != character.x || prev.y != character.y {
            self.ensure_tick_written_player_data(client_id);

            let mut packer = Packer::new();
            if prev.alive {
                let dx = character.x.wrapping_sub(prev.x);
                let dy = character.y.wrapping_sub(prev.y);
                encode_player_diff(&mut packer, client_id, dx, dy);
                if self.config.traces_records() {
                    debug!(target: "teehistorian", "diff cid={} dx={} dy={}", client_id, dx, dy);
                }
            } else {
                encode_player_new(&mut packer, client_id, character.x, character.y);
                if self.config.traces_records() {
                    debug!(
                        target: "teehistorian",
                        "new cid={} x={} y={}", client_id, character.x, character.y
                    );
                }
            }
            self.write(packer.data());
        }

        let prev = &mut self.prev_players[slot];
        prev.x = character.x;
        prev.y = character.y;
        prev.alive = true;
    }

    /// Record a client slot without a living character.
    pub fn record_dead_player(&mut self, client_id: i32) {
        assert!(self.state == RecorderState::Players, "{}", INVALID_STATE);

        let slot = client_slot(client_id);
        if self.prev_players[slot].alive {
            self.ensure_tick_written_player_data(client_id);

            let mut packer = Packer::new();
            encode_player_old(&mut packer, client_id);
            if self.config.traces_records() {
                debug!(target: "teehistorian", "old cid={}", client_id);
            }
            self.write(packer.data());
        }
        self.prev_players[slot].alive = false;
    }

    /// Close the players bracket.
    pub fn end_players(&mut self) {
        assert!(self.state == RecorderState::Players, "{}", INVALID_STATE);

        self.state = RecorderState::BeforeInputs;
    }

    /// Open the inputs bracket.
    pub fn begin_inputs(&mut self) {
        assert!(self.state == RecorderState::BeforeInputs, "{}", INVALID_STATE);

        self.state = RecorderState::Inputs;
    }

    /// Record the input a client sent. Unchanged inputs emit nothing.
    pub fn record_player_input(&mut self, client_id: i32, input: &PlayerInput) {
        let slot = client_slot(client_id);
        let prev = self.prev_players[slot];

        let (tag, fields) = if prev.input_exists {
            if prev.input == *input {
                return;
            }
            (RecordTag::InputDiff, input.diff_from(&prev.input))
        } else {
            (RecordTag::InputNew, input.to_array())
        };

        self.ensure_tick_written();

        if self.config.traces_records() {
            match tag {
                RecordTag::InputDiff => {
                    debug!(target: "teehistorian", "diff_input cid={} {:?}", client_id, fields)
                }
                _ => debug!(target: "teehistorian", "new_input cid={}", client_id),
            }
        }

        let mut packer = Packer::new();
        encode_input(&mut packer, tag, client_id, &fields);

        let prev = &mut self.prev_players[slot];
        prev.input_exists = true;
        prev.input = *input;

        self.write(packer.data());
    }

    /// Close the inputs bracket.
    pub fn end_inputs(&mut self) {
        assert!(self.state == RecorderState::Inputs, "{}", INVALID_STATE);

        self.state = RecorderState::BeforeEndTick;
    }

    /// Finish the tick.
    pub fn end_tick(&mut self) {
        assert!(self.state == RecorderState::BeforeEndTick, "{}", INVALID_STATE);

        self.state = RecorderState::BeforeTick;
    }

    /// Close any open tick and terminate the stream.
    pub fn finish(&mut self) {
        assert!(self.state.accepts_finish(), "{}", INVALID_STATE);

        if self.state == RecorderState::Inputs {
            self.end_inputs();
        }
        if self.state == RecorderState::BeforeEndTick {
            self.end_tick();
        }

        let mut packer = Packer::new();
        encode_finish(&mut packer);
        if self.config.traces_records() {
            debug!(target: "teehistorian", "finish");
        }
        self.write(packer.data());
    }

    // =========================================================================
    // LOW-LEVEL WRITING
    // =========================================================================

    /// Write an extension record, flushing a pending tick first.
    pub fn write_extra(&mut self, uuid: Uuid, payload: &[u8]) {
        self.write_extension(&ExtensionRecord::new(uuid, payload));
    }

    /// Write a prepared extension record, flushing a pending tick first.
    pub fn write_extension(&mut self, record: &ExtensionRecord<'_>) {
        self.ensure_tick_written();

        let mut packer = Packer::new();
        record.encode(&mut packer);
        self.write(packer.data());
    }

    /// Emit a TICK_SKIP if the current tick has not been written yet.
    pub(crate) fn ensure_tick_written(&mut self) {
        if !self.tick_written {
            self.write_tick();
        }
    }

    fn ensure_tick_written_player_data(&mut self, client_id: i32) {
        assert!(client_id > self.max_client_id, "invalid player data order");
        self.max_client_id = client_id;

        if !self.tick_written
            && (client_id > self.prev_max_client_id || self.last_written_tick + 1 != self.tick)
        {
            self.write_tick();
        } else {
            // Tick is implicit
            self.last_written_tick = self.tick;
            self.tick_written = true;
        }
    }

    fn write_tick(&mut self) {
        let dt = self.tick - self.last_written_tick - 1;

        let mut packer = Packer::new();
        encode_tick_skip(&mut packer, dt);
        if self.config.traces_records() {
            debug!(target: "teehistorian", "skip_ticks dt={}", dt);
        }
        self.write(packer.data());

        self.tick_written = true;
        self.last_written_tick = self.tick;
    }

    pub(crate) fn write(&mut self, data: &[u8]) {
        match self.sink.as_mut() {
            Some(sink) => sink.write(data),
            None => assert!(self.started, "teehistorian used before reset"),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
