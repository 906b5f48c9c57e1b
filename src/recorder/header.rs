//! Stream Header
//!
//! Written once per `reset`:
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────┬─────┐
//! │ magic (16 B) │ JSON object (game, config, tuning…)  │ NUL │
//! └──────────────┴──────────────────────────────────────┴─────┘
//! ```
//!
//! Key order in the JSON object is fixed. Only config variables and tuning
//! parameters that differ from their defaults are listed, which keeps the
//! header small on stock servers.

use chrono::{DateTime, FixedOffset};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use uuid::Uuid;

use crate::core::hash::{crc_hex, sha256_digest, sha256_hex, Sha256Digest};
use crate::core::name_uuid::UuidRegistry;
use crate::error::RecorderError;
use crate::recorder::records::{
    teehistorian_uuid, TEEHISTORIAN_NAME, TEEHISTORIAN_VERSION, TEEHISTORIAN_VERSION_MINOR,
};

/// `strftime` pattern of the `start_time` field.
pub const START_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

// =============================================================================
// CONFIG AND TUNING TABLES
// =============================================================================

/// Config variable flags.
pub mod config_flags {
    /// Saved to the config file
    pub const SAVE: u32 = 1 << 0;
    /// Client-side variable
    pub const CLIENT: u32 = 1 << 1;
    /// Server-side variable
    pub const SERVER: u32 = 1 << 2;
    /// Never written to teehistorian headers (passwords, paths, ...)
    pub const NON_TEEHISTORIC: u32 = 1 << 10;
}

/// Value of a config variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigValue {
    /// Integer or colour variable
    Int(i32),
    /// String variable
    Str(String),
}

impl ConfigValue {
    fn to_header_string(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Str(value) => value.clone(),
        }
    }
}

/// One entry of the server's config table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigVariable {
    /// Console name, e.g. `sv_max_clients`
    pub script_name: &'static str,
    /// Compiled-in default
    pub default: ConfigValue,
    /// Current value
    pub value: ConfigValue,
    /// Combination of [`config_flags`]
    pub flags: u32,
}

impl ConfigVariable {
    /// Integer variable currently at `value`.
    pub fn int(script_name: &'static str, default: i32, value: i32, flags: u32) -> Self {
        Self {
            script_name,
            default: ConfigValue::Int(default),
            value: ConfigValue::Int(value),
            flags,
        }
    }

    /// String variable currently at `value`.
    pub fn string(script_name: &'static str, default: &str, value: &str, flags: u32) -> Self {
        Self {
            script_name,
            default: ConfigValue::Str(default.to_string()),
            value: ConfigValue::Str(value.to_string()),
            flags,
        }
    }

    /// Whether this variable belongs in the header.
    pub fn is_recorded(&self) -> bool {
        self.flags & config_flags::SERVER != 0
            && self.flags & config_flags::NON_TEEHISTORIC == 0
            && self.value != self.default
    }
}

/// One tuning parameter. Values are fixed-point with two decimals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TuningParam {
    /// Console name, e.g. `gravity`
    pub script_name: &'static str,
    /// Compiled-in default as a float
    pub default: f32,
    /// Current value ×100
    pub value: i32,
}

impl TuningParam {
    /// Parameter at its default.
    pub fn new(script_name: &'static str, default: f32) -> Self {
        Self {
            script_name,
            default,
            value: Self::to_fixed(default),
        }
    }

    /// Float to the ×100 fixed-point representation, truncating.
    #[inline]
    pub fn to_fixed(value: f32) -> i32 {
        (value * 100.0) as i32
    }

    /// Set the current value from a float.
    pub fn set(&mut self, value: f32) {
        self.value = Self::to_fixed(value);
    }

    /// Whether this parameter belongs in the header.
    pub fn is_recorded(&self) -> bool {
        self.value != Self::to_fixed(self.default)
    }
}

// =============================================================================
// GAME INFO
// =============================================================================

/// Session metadata captured at `reset`.
#[derive(Clone, Debug)]
pub struct GameInfo {
    /// Identifier of this recording
    pub game_uuid: Uuid,
    /// Server build string
    pub server_version: String,
    /// Wall-clock start of the session
    pub start_time: DateTime<FixedOffset>,
    /// Advertised server name
    pub server_name: String,
    /// UDP port
    pub server_port: i32,
    /// Game type, e.g. `DDraceNetwork`
    pub game_type: String,
    /// Map name without extension
    pub map_name: String,
    /// Map file size in bytes
    pub map_size: i32,
    /// Map file SHA-256
    pub map_sha256: Sha256Digest,
    /// Map file CRC32
    pub map_crc: u32,
    /// Description of the game PRNG and its seed
    pub prng_description: String,
    /// Full config table
    pub config: Vec<ConfigVariable>,
    /// Full tuning table
    pub tuning: Vec<TuningParam>,
    /// Dynamically registered UUID names
    pub uuids: UuidRegistry,
}

impl GameInfo {
    /// Session with a fresh random game UUID and empty tables.
    pub fn new(server_version: &str, start_time: DateTime<FixedOffset>) -> Self {
        Self {
            game_uuid: Uuid::new_v4(),
            server_version: server_version.to_string(),
            start_time,
            server_name: String::new(),
            server_port: 0,
            game_type: String::new(),
            map_name: String::new(),
            map_size: 0,
            map_sha256: [0; 32],
            map_crc: 0,
            prng_description: String::new(),
            config: Vec::new(),
            tuning: Vec::new(),
            uuids: UuidRegistry::new(),
        }
    }

    /// Fill the map fields from the map file contents.
    pub fn set_map(&mut self, name: &str, data: &[u8], crc: u32) {
        self.map_name = name.to_string();
        self.map_size = data.len() as i32;
        self.map_sha256 = sha256_digest(data);
        self.map_crc = crc;
    }
}

/// Header JSON. Field order is the on-disk key order.
#[derive(Serialize)]
struct HeaderJson<'a> {
    comment: &'a str,
    version: &'a str,
    version_minor: &'a str,
    game_uuid: String,
    server_version: &'a str,
    start_time: String,
    server_name: &'a str,
    server_port: String,
    game_type: &'a str,
    map_name: &'a str,
    map_size: String,
    map_sha256: String,
    map_crc: String,
    prng_description: &'a str,
    config: ConfigSection<'a>,
    tuning: TuningSection<'a>,
    uuids: Vec<&'a str>,
}

struct ConfigSection<'a>(&'a [ConfigVariable]);

impl Serialize for ConfigSection<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for var in self.0.iter().filter(|var| var.is_recorded()) {
            map.serialize_entry(var.script_name, &var.value.to_header_string())?;
        }
        map.end()
    }
}

struct TuningSection<'a>(&'a [TuningParam]);

impl Serialize for TuningSection<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for param in self.0.iter().filter(|param| param.is_recorded()) {
            map.serialize_entry(param.script_name, &param.value.to_string())?;
        }
        map.end()
    }
}

/// Serialise the header JSON object (without magic or terminator).
pub fn header_json(info: &GameInfo) -> Result<Vec<u8>, RecorderError> {
    let json = HeaderJson {
        comment: TEEHISTORIAN_NAME,
        version: TEEHISTORIAN_VERSION,
        version_minor: TEEHISTORIAN_VERSION_MINOR,
        game_uuid: info.game_uuid.hyphenated().to_string(),
        server_version: &info.server_version,
        start_time: info.start_time.format(START_TIME_FORMAT).to_string(),
        server_name: &info.server_name,
        server_port: info.server_port.to_string(),
        game_type: &info.game_type,
        map_name: &info.map_name,
        map_size: info.map_size.to_string(),
        map_sha256: sha256_hex(&info.map_sha256),
        map_crc: crc_hex(info.map_crc),
        prng_description: &info.prng_description,
        config: ConfigSection(&info.config),
        tuning: TuningSection(&info.tuning),
        uuids: info.uuids.names().collect(),
    };
    Ok(serde_json::to_vec(&json)?)
}

/// Full header: magic, JSON, NUL.
pub fn header_bytes(info: &GameInfo) -> Result<Vec<u8>, RecorderError> {
    let json = header_json(info)?;
    let mut out = Vec::with_capacity(16 + json.len() + 1);
    out.extend_from_slice(teehistorian_uuid().as_bytes());
    out.extend_from_slice(&json);
    out.push(0);
    Ok(out)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use super::config_flags::{CLIENT, NON_TEEHISTORIC, SERVER};

    /// Minimal game info shared by recorder tests.
    pub(crate) fn sample_game_info() -> GameInfo {
        let start_time = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 9, 17, 5, 42)
            .unwrap();
        let mut uuids = UuidRegistry::new();
        uuids.register("what-is@ddnet.tw");
        uuids.register("it-is@ddnet.tw");

        GameInfo {
            game_uuid: Uuid::from_bytes([0x11; 16]),
            server_version: "0.6.4, 16.0".to_string(),
            start_time,
            server_name: "My \"Cool\" Server".to_string(),
            server_port: 8303,
            game_type: "DDraceNetwork".to_string(),
            map_name: "Kobra 4".to_string(),
            map_size: 9024,
            map_sha256: [0xab; 32],
            map_crc: 0x1a2b,
            prng_description: "deterministic seed 42".to_string(),
            config: vec![
                ConfigVariable::int("sv_max_clients", 64, 32, SERVER),
                ConfigVariable::int("sv_spectator_slots", 0, 0, SERVER),
                ConfigVariable::string("sv_rcon_password", "", "hunter2", SERVER | NON_TEEHISTORIC),
                ConfigVariable::string("cl_skin", "default", "santa", CLIENT),
                ConfigVariable::string("sv_motd", "", "line\nbreak", SERVER),
            ],
            tuning: {
                let mut gravity = TuningParam::new("gravity", 0.5);
                gravity.set(0.75);
                vec![gravity, TuningParam::new("ground_friction", 0.5)]
            },
            uuids,
        }
    }

    fn parse(info: &GameInfo) -> serde_json::Value {
        serde_json::from_slice(&header_json(info).unwrap()).unwrap()
    }

    #[test]
    fn test_header_framing() {
        let bytes = header_bytes(&sample_game_info()).unwrap();
        assert_eq!(&bytes[..16], teehistorian_uuid().as_bytes());
        assert_eq!(bytes.last(), Some(&0));
        assert_eq!(bytes.iter().filter(|&&b| b == 0).count(), 1);
        assert_eq!(bytes[16], b'{');
    }

    #[test]
    fn test_header_key_order() {
        let json = String::from_utf8(header_json(&sample_game_info()).unwrap()).unwrap();
        let keys = [
            "\"comment\"", "\"version\"", "\"version_minor\"", "\"game_uuid\"",
            "\"server_version\"", "\"start_time\"", "\"server_name\"", "\"server_port\"",
            "\"game_type\"", "\"map_name\"", "\"map_size\"", "\"map_sha256\"", "\"map_crc\"",
            "\"prng_description\"", "\"config\"", "\"tuning\"", "\"uuids\"",
        ];
        let positions: Vec<_> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", json);
    }

    #[test]
    fn test_header_fields() {
        let value = parse(&sample_game_info());
        assert_eq!(value["comment"], "teehistorian@ddnet.tw");
        assert_eq!(value["version"], "2");
        assert_eq!(value["version_minor"], "4");
        assert_eq!(value["game_uuid"], "11111111-1111-1111-1111-111111111111");
        assert_eq!(value["start_time"], "2024-03-09T17:05:42+0200");
        assert_eq!(value["server_name"], "My \"Cool\" Server");
        assert_eq!(value["server_port"], "8303");
        assert_eq!(value["map_size"], "9024");
        assert_eq!(value["map_sha256"], "ab".repeat(32));
        assert_eq!(value["map_crc"], "00001a2b");
        assert_eq!(value["uuids"], serde_json::json!(["what-is@ddnet.tw", "it-is@ddnet.tw"]));
    }

    #[test]
    fn test_only_changed_server_config_is_listed() {
        let value = parse(&sample_game_info());
        assert_eq!(
            value["config"],
            serde_json::json!({ "sv_max_clients": "32", "sv_motd": "line\nbreak" })
        );
    }

    #[test]
    fn test_only_changed_tuning_is_listed() {
        let value = parse(&sample_game_info());
        assert_eq!(value["tuning"], serde_json::json!({ "gravity": "75" }));
    }

    #[test]
    fn test_strings_are_escaped() {
        let json = String::from_utf8(header_json(&sample_game_info()).unwrap()).unwrap();
        assert!(json.contains(r#""server_name":"My \"Cool\" Server""#));
        assert!(json.contains(r#""sv_motd":"line\nbreak""#));
    }

    #[test]
    fn test_new_game_info_is_empty_but_serializable() {
        let start = sample_game_info().start_time;
        let a = GameInfo::new("0.6.4, 16.0", start);
        let b = GameInfo::new("0.6.4, 16.0", start);
        assert_ne!(a.game_uuid, b.game_uuid);

        let json = parse(&a);
        assert_eq!(json["config"], serde_json::json!({}));
        assert_eq!(json["tuning"], serde_json::json!({}));
        assert_eq!(json["uuids"], serde_json::json!([]));
    }

    #[test]
    fn test_set_map() {
        let mut info = sample_game_info();
        info.set_map("dm1", b"map bytes", 0xdeadbeef);
        assert_eq!(info.map_size, 9);
        assert_eq!(info.map_sha256, sha256_digest(b"map bytes"));
        assert_eq!(parse(&info)["map_crc"], "deadbeef");
    }

    #[test]
    fn test_tuning_truncates_like_fixed_point() {
        assert_eq!(TuningParam::to_fixed(0.5), 50);
        assert_eq!(TuningParam::to_fixed(13.2), 1320);
        assert!(!TuningParam::new("ground_jump_impulse", 13.2).is_recorded());
    }
}
