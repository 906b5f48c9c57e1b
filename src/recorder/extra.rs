//! Side-Channel Records
//!
//! Events that are not part of the player/input phases: joins, drops,
//! chat and network messages, console commands, team state, client
//! versions and authentication. All of them may be recorded at any point
//! of a tick and flush a pending tick boundary first.
//!
//! Most go through the UUID-tagged EX record. Messages, joins, drops and
//! console commands predate extensions and keep their own tags.

use tracing::debug;
use uuid::Uuid;

use crate::core::packer::{Packer, Unpacker};
use crate::recorder::records::{
    encode_console_command, encode_drop, encode_join, encode_message, ExtensionRecord, ExtraChunk,
    Protocol,
};
use crate::recorder::sink::WriteSink;
use crate::recorder::state::{client_slot, team_slot};
use crate::recorder::teehistorian::Teehistorian;

impl<S: WriteSink> Teehistorian<S> {
    fn write_chunk(&mut self, chunk: ExtraChunk, payload: &Packer) {
        self.write_extension(&ExtensionRecord::of(chunk, payload.data()));
    }

    /// Record a team change. Repeating the current team is a no-op.
    pub fn record_player_team(&mut self, client_id: i32, team: i32) {
        let slot = client_slot(client_id);
        if self.prev_players[slot].team == team {
            return;
        }
        self.prev_players[slot].team = team;

        let mut payload = Packer::new();
        payload.add_int(client_id);
        payload.add_int(team);
        if self.config.traces_records() {
            debug!(target: "teehistorian", "player_team cid={} team={}", client_id, team);
        }
        self.write_chunk(ExtraChunk::PlayerTeam, &payload);
    }

    /// Record a practice-mode toggle. Repeating the current mode is a no-op.
    pub fn record_team_practice(&mut self, team: i32, practice: bool) {
        let slot = team_slot(team);
        if self.prev_teams[slot].practice == practice {
            return;
        }
        self.prev_teams[slot].practice = practice;

        let mut payload = Packer::new();
        payload.add_int(team);
        payload.add_int(i32::from(practice));
        if self.config.traces_records() {
            debug!(target: "teehistorian", "team_practice team={} practice={}", team, practice);
        }
        self.write_chunk(ExtraChunk::TeamPractice, &payload);
    }

    /// Record a client joining: the protocol-specific extension record,
    /// followed by the legacy JOIN record.
    pub fn record_player_join(&mut self, client_id: i32, protocol: Protocol) {
        self.ensure_tick_written();

        let mut payload = Packer::new();
        payload.add_int(client_id);
        if self.config.traces_records() {
            debug!(target: "teehistorian", "joinver{} cid={}", protocol.number(), client_id);
        }
        self.write_chunk(protocol.join_chunk(), &payload);

        let mut packer = Packer::new();
        encode_join(&mut packer, client_id);
        if self.config.traces_records() {
            debug!(target: "teehistorian", "join cid={}", client_id);
        }
        self.write(packer.data());
    }

    /// Record a client finishing its connection handshake.
    pub fn record_player_ready(&mut self, client_id: i32) {
        let mut payload = Packer::new();
        payload.add_int(client_id);
        if self.config.traces_records() {
            debug!(target: "teehistorian", "player_ready cid={}", client_id);
        }
        self.write_chunk(ExtraChunk::PlayerReady, &payload);
    }

    /// Record a client leaving.
    pub fn record_player_drop(&mut self, client_id: i32, reason: &str) {
        self.ensure_tick_written();

        let mut packer = Packer::new();
        encode_drop(&mut packer, client_id, reason);
        if self.config.traces_records() {
            debug!(target: "teehistorian", "drop cid={} reason='{}'", client_id, reason);
        }
        self.write(packer.data());
    }

    /// Record an executed console command with its arguments.
    pub fn record_console_command<A: AsRef<str>>(
        &mut self,
        client_id: i32,
        flag_mask: i32,
        cmd: &str,
        args: &[A],
    ) {
        self.ensure_tick_written();

        let mut packer = Packer::new();
        encode_console_command(&mut packer, client_id, flag_mask, cmd, args);
        if self.config.traces_records() {
            debug!(target: "teehistorian", "ccmd cid={} cmd='{}'", client_id, cmd);
        }
        self.write(packer.data());
    }

    /// Record a raw network message received from a client.
    pub fn record_player_message(&mut self, client_id: i32, msg: &[u8]) {
        self.ensure_tick_written();

        let mut packer = Packer::new();
        encode_message(&mut packer, client_id, msg);
        if self.config.traces_records() {
            // First int of a message: id << 1 | system flag
            let raw_id = Unpacker::new(msg).get_int().unwrap_or(0);
            debug!(
                target: "teehistorian",
                "msg cid={} sys={} msgid={}", client_id, raw_id & 1, raw_id >> 1
            );
        }
        self.write(packer.data());
    }

    /// Empty extension record for exercising readers.
    pub fn record_test_extra(&mut self) {
        if self.config.traces_records() {
            debug!(target: "teehistorian", "test");
        }
        self.write_extension(&ExtensionRecord::of(ExtraChunk::Test, &[]));
    }

    /// Record a successful team save.
    pub fn record_team_save_success(&mut self, team: i32, save_id: Uuid, team_save: &str) {
        let mut payload = Packer::new();
        payload.add_int(team);
        payload.add_raw(save_id.as_bytes());
        payload.add_string(team_save);
        if self.config.traces_records() {
            debug!(
                target: "teehistorian",
                "save_success team={} save_id={} team_save='{}'", team, save_id, team_save
            );
        }
        self.write_chunk(ExtraChunk::SaveSuccess, &payload);
    }

    /// Record a failed team save.
    pub fn record_team_save_failure(&mut self, team: i32) {
        self.write_team_only(ExtraChunk::SaveFailure, "save_failure", team);
    }

    /// Record a successful team load.
    pub fn record_team_load_success(&mut self, team: i32, save_id: Uuid, team_save: &str) {
        let mut payload = Packer::new();
        payload.add_int(team);
        payload.add_raw(save_id.as_bytes());
        payload.add_string(team_save);
        if self.config.traces_records() {
            debug!(
                target: "teehistorian",
                "load_success team={} save_id={} team_save='{}'", team, save_id, team_save
            );
        }
        self.write_chunk(ExtraChunk::LoadSuccess, &payload);
    }

    /// Record a failed team load.
    pub fn record_team_load_failure(&mut self, team: i32) {
        self.write_team_only(ExtraChunk::LoadFailure, "load_failure", team);
    }

    fn write_team_only(&mut self, chunk: ExtraChunk, label: &str, team: i32) {
        let mut payload = Packer::new();
        payload.add_int(team);
        if self.config.traces_records() {
            debug!(target: "teehistorian", "{} team={}", label, team);
        }
        self.write_chunk(chunk, &payload);
    }

    /// Record a client version sent in the pre-UUID format.
    pub fn record_ddnet_version_old(&mut self, client_id: i32, ddnet_version: i32) {
        let mut payload = Packer::new();
        payload.add_int(client_id);
        payload.add_int(ddnet_version);
        if self.config.traces_records() {
            debug!(
                target: "teehistorian",
                "ddnetver_old cid={} ddnet_version={}", client_id, ddnet_version
            );
        }
        self.write_chunk(ExtraChunk::DdnetVersionOld, &payload);
    }

    /// Record a client version announcement.
    pub fn record_ddnet_version(
        &mut self,
        client_id: i32,
        connection_id: Uuid,
        ddnet_version: i32,
        ddnet_version_str: &str,
    ) {
        let mut payload = Packer::new();
        payload.add_int(client_id);
        payload.add_raw(connection_id.as_bytes());
        payload.add_int(ddnet_version);
        payload.add_string(ddnet_version_str);
        if self.config.traces_records() {
            debug!(
                target: "teehistorian",
                "ddnetver cid={} connection_id={} ddnet_version={} ddnet_version_str={}",
                client_id, connection_id, ddnet_version, ddnet_version_str
            );
        }
        self.write_chunk(ExtraChunk::DdnetVersion, &payload);
    }

    /// Record a client that was authenticated when recording started.
    pub fn record_auth_initial(&mut self, client_id: i32, level: i32, auth_name: &str) {
        self.write_auth(ExtraChunk::AuthInit, "auth_init", client_id, level, auth_name);
    }

    /// Record an rcon login.
    pub fn record_auth_login(&mut self, client_id: i32, level: i32, auth_name: &str) {
        self.write_auth(ExtraChunk::AuthLogin, "auth_login", client_id, level, auth_name);
    }

    fn write_auth(
        &mut self,
        chunk: ExtraChunk,
        label: &str,
        client_id: i32,
        level: i32,
        name: &str,
    ) {
        let mut payload = Packer::new();
        payload.add_int(client_id);
        payload.add_int(level);
        payload.add_string(name);
        if self.config.traces_records() {
            debug!(
                target: "teehistorian",
                "{} cid={} level={} auth_name={}", label, client_id, level, name
            );
        }
        self.write_chunk(chunk, &payload);
    }

    /// Record an rcon logout.
    pub fn record_auth_logout(&mut self, client_id: i32) {
        let mut payload = Packer::new();
        payload.add_int(client_id);
        if self.config.traces_records() {
            debug!(target: "teehistorian", "auth_logout cid={}", client_id);
        }
        self.write_chunk(ExtraChunk::AuthLogout, &payload);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::core::packer::Unpacker;
    use crate::recorder::input::CharacterCore;
    use crate::recorder::records::{ExtraChunk, Protocol, RecordTag};
    use crate::recorder::teehistorian::tests::{body, ints, recorder};
    use uuid::Uuid;

    /// Decode one EX record, returning its UUID and payload.
    fn read_extra<'a>(unpacker: &mut Unpacker<'a>) -> (Uuid, &'a [u8]) {
        assert_eq!(unpacker.get_int(), Some(RecordTag::Ex.wire()));
        let uuid = Uuid::from_slice(unpacker.get_raw(16).unwrap()).unwrap();
        let len = unpacker.get_int().unwrap() as usize;
        (uuid, unpacker.get_raw(len).unwrap())
    }

    #[test]
    fn test_extra_flushes_pending_tick_first() {
        let (mut th, header_len) = recorder();
        th.begin_tick(3);
        th.record_player_ready(7);

        let data = body(&th, header_len);
        let mut unpacker = Unpacker::new(&data);
        assert_eq!(unpacker.get_int(), Some(RecordTag::TickSkip.wire()));
        assert_eq!(unpacker.get_int(), Some(2));
        let (uuid, payload) = read_extra(&mut unpacker);
        assert_eq!(uuid, ExtraChunk::PlayerReady.uuid());
        assert_eq!(ints(payload), [7]);
        assert!(unpacker.is_empty());
    }

    #[test]
    fn test_extra_outside_tick_needs_no_skip() {
        let (mut th, header_len) = recorder();
        th.record_test_extra();

        let data = body(&th, header_len);
        let mut unpacker = Unpacker::new(&data);
        let (uuid, payload) = read_extra(&mut unpacker);
        assert_eq!(uuid, ExtraChunk::Test.uuid());
        assert!(payload.is_empty());
        assert!(unpacker.is_empty());
    }

    #[test]
    fn test_player_team_only_on_change() {
        let (mut th, header_len) = recorder();
        th.record_player_team(2, 0);
        assert!(body(&th, header_len).is_empty());

        th.record_player_team(2, 5);
        th.record_player_team(2, 5);

        let data = body(&th, header_len);
        let mut unpacker = Unpacker::new(&data);
        let (uuid, payload) = read_extra(&mut unpacker);
        assert_eq!(uuid, ExtraChunk::PlayerTeam.uuid());
        assert_eq!(ints(payload), [2, 5]);
        assert!(unpacker.is_empty());
    }

    #[test]
    fn test_team_practice_only_on_change() {
        let (mut th, header_len) = recorder();
        th.record_team_practice(4, false);
        th.record_team_practice(4, true);
        th.record_team_practice(4, true);
        th.record_team_practice(4, false);

        let data = body(&th, header_len);
        let mut unpacker = Unpacker::new(&data);
        let (_, on) = read_extra(&mut unpacker);
        let (_, off) = read_extra(&mut unpacker);
        assert_eq!(ints(on), [4, 1]);
        assert_eq!(ints(off), [4, 0]);
        assert!(unpacker.is_empty());
    }

    #[test]
    fn test_join_writes_version_then_legacy_join() {
        let (mut th, header_len) = recorder();
        th.record_player_join(1, Protocol::V7);

        let data = body(&th, header_len);
        let mut unpacker = Unpacker::new(&data);
        let (uuid, payload) = read_extra(&mut unpacker);
        assert_eq!(uuid, ExtraChunk::JoinVer7.uuid());
        assert_eq!(ints(payload), [1]);
        assert_eq!(unpacker.get_int(), Some(RecordTag::Join.wire()));
        assert_eq!(unpacker.get_int(), Some(1));
        assert!(unpacker.is_empty());
    }

    #[test]
    fn test_drop_record() {
        let (mut th, header_len) = recorder();
        th.record_player_drop(9, "timeout");

        let data = body(&th, header_len);
        let mut unpacker = Unpacker::new(&data);
        assert_eq!(unpacker.get_int(), Some(-9));
        assert_eq!(unpacker.get_int(), Some(9));
        assert_eq!(unpacker.get_string().as_deref(), Some("timeout"));
        assert!(unpacker.is_empty());
    }

    #[test]
    fn test_console_command_record() {
        let (mut th, header_len) = recorder();
        th.record_console_command(-1, 8, "kick", &["3", "spam"]);

        let data = body(&th, header_len);
        let mut unpacker = Unpacker::new(&data);
        assert_eq!(unpacker.get_int(), Some(-10));
        assert_eq!(unpacker.get_int(), Some(-1));
        assert_eq!(unpacker.get_int(), Some(8));
        assert_eq!(unpacker.get_string().as_deref(), Some("kick"));
        assert_eq!(unpacker.get_int(), Some(2));
        assert_eq!(unpacker.get_string().as_deref(), Some("3"));
        assert_eq!(unpacker.get_string().as_deref(), Some("spam"));
        assert!(unpacker.is_empty());
    }

    #[test]
    fn test_message_is_copied_verbatim() {
        let (mut th, header_len) = recorder();
        let msg = [0x09, 0x00, 0xff, 0x10];
        th.record_player_message(0, &msg);

        let data = body(&th, header_len);
        let mut unpacker = Unpacker::new(&data);
        assert_eq!(unpacker.get_int(), Some(-7));
        assert_eq!(unpacker.get_int(), Some(0));
        assert_eq!(unpacker.get_int(), Some(4));
        assert_eq!(unpacker.get_raw(4), Some(&msg[..]));
        assert!(unpacker.is_empty());
    }

    #[test]
    fn test_save_and_load_payloads() {
        let (mut th, header_len) = recorder();
        let save_id = Uuid::from_bytes([0x42; 16]);
        th.record_team_save_success(3, save_id, "team\tsave");
        th.record_team_save_failure(3);
        th.record_team_load_success(3, save_id, "team\tsave");
        th.record_team_load_failure(3);

        let data = body(&th, header_len);
        let mut unpacker = Unpacker::new(&data);
        let chunks = [
            ExtraChunk::SaveSuccess,
            ExtraChunk::SaveFailure,
            ExtraChunk::LoadSuccess,
            ExtraChunk::LoadFailure,
        ];
        for chunk in chunks {
            let (uuid, payload) = read_extra(&mut unpacker);
            assert_eq!(uuid, chunk.uuid());
            let mut fields = Unpacker::new(payload);
            assert_eq!(fields.get_int(), Some(3));
            if matches!(chunk, ExtraChunk::SaveSuccess | ExtraChunk::LoadSuccess) {
                assert_eq!(fields.get_raw(16), Some(&save_id.as_bytes()[..]));
                assert_eq!(fields.get_string().as_deref(), Some("team\tsave"));
            }
            assert!(fields.is_empty());
        }
        assert!(unpacker.is_empty());
    }

    #[test]
    fn test_ddnet_version_payloads() {
        let (mut th, header_len) = recorder();
        let connection_id = Uuid::from_bytes([0x07; 16]);
        th.record_ddnet_version_old(1, 16040);
        th.record_ddnet_version(1, connection_id, 18000, "DDNet 18.0");

        let data = body(&th, header_len);
        let mut unpacker = Unpacker::new(&data);

        let (uuid, payload) = read_extra(&mut unpacker);
        assert_eq!(uuid, ExtraChunk::DdnetVersionOld.uuid());
        assert_eq!(ints(payload), [1, 16040]);

        let (uuid, payload) = read_extra(&mut unpacker);
        assert_eq!(uuid, ExtraChunk::DdnetVersion.uuid());
        let mut fields = Unpacker::new(payload);
        assert_eq!(fields.get_int(), Some(1));
        assert_eq!(fields.get_raw(16), Some(&connection_id.as_bytes()[..]));
        assert_eq!(fields.get_int(), Some(18000));
        assert_eq!(fields.get_string().as_deref(), Some("DDNet 18.0"));
        assert!(fields.is_empty());
    }

    #[test]
    fn test_auth_payloads() {
        let (mut th, header_len) = recorder();
        th.record_auth_initial(0, 3, "default_admin");
        th.record_auth_login(1, 2, "moderator");
        th.record_auth_logout(1);

        let data = body(&th, header_len);
        let mut unpacker = Unpacker::new(&data);
        for (chunk, cid, level, name) in [
            (ExtraChunk::AuthInit, 0, 3, "default_admin"),
            (ExtraChunk::AuthLogin, 1, 2, "moderator"),
        ] {
            let (uuid, payload) = read_extra(&mut unpacker);
            assert_eq!(uuid, chunk.uuid());
            let mut fields = Unpacker::new(payload);
            assert_eq!(fields.get_int(), Some(cid));
            assert_eq!(fields.get_int(), Some(level));
            assert_eq!(fields.get_string().as_deref(), Some(name));
        }
        let (uuid, payload) = read_extra(&mut unpacker);
        assert_eq!(uuid, ExtraChunk::AuthLogout.uuid());
        assert_eq!(ints(payload), [1]);
        assert!(unpacker.is_empty());
    }

    #[test]
    fn test_side_channel_does_not_break_implicit_ticks() {
        let (mut th, header_len) = recorder();

        th.begin_tick(1);
        th.begin_players();
        th.record_player(0, &CharacterCore::new(1, 1));
        th.end_players();
        th.begin_inputs();
        th.record_player_drop(4, "");
        th.end_inputs();
        th.end_tick();

        // PLAYER_NEW made tick 1 implicit, so the drop needs no skip
        assert_eq!(ints(&body(&th, header_len)[..5]), [-3, 0, 1, 1, -9]);
    }
}
