//! Teehistorian Demo
//!
//! Records a short synthetic session to a file, the way a game server
//! drives the recorder every tick.

use std::env;
use std::fs::File;
use std::io::BufWriter;

use anyhow::Context;
use chrono::Local;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use teehistorian::{
    config::RecorderConfig,
    recorder::header::config_flags,
    CharacterCore, ConfigVariable, GameInfo, IoSink, PlayerInput, Protocol, Teehistorian,
    TuningParam, VERSION,
};

/// Output path override
const OUTPUT_ENV: &str = "TEEHISTORIAN_OUTPUT";
const DEFAULT_OUTPUT: &str = "demo.teehistorian";

/// Ticks per second of the simulated server
const TICK_SPEED: i32 = 50;
const DEMO_TICKS: i32 = 10 * TICK_SPEED;
const PLAYERS: i32 = 4;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Teehistorian v{}", VERSION);

    let config = RecorderConfig::from_env()?;
    let output = env::var(OUTPUT_ENV).unwrap_or_else(|_| DEFAULT_OUTPUT.to_string());
    info!("Debug level: {}", config.debug);
    info!("Output: {}", output);

    let file = File::create(&output).with_context(|| format!("failed to create {}", output))?;

    let mut th = Teehistorian::new(config);
    th.reset(&demo_game_info(), IoSink::new(BufWriter::new(file)))?;

    demo_session(&mut th);

    let sink = th.take_sink().context("recorder lost its sink")?;
    let written = sink.bytes_written();
    if sink.has_failed() {
        warn!("Recording is incomplete");
    }
    sink.finish().with_context(|| format!("failed to write {}", output))?;

    info!("Recorded {} ticks, {} bytes", DEMO_TICKS, written);
    Ok(())
}

/// Session metadata for a local test server.
fn demo_game_info() -> GameInfo {
    let server_version = format!("0.6.4, teehistorian {}", VERSION);
    let mut info = GameInfo::new(&server_version, Local::now().into());
    info.server_name = "Teehistorian Demo".to_string();
    info.server_port = 8303;
    info.game_type = "DDraceNetwork".to_string();
    info.prng_description = "none".to_string();

    let map: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
    info.set_map("demo", &map, 0x5eed_cafe);

    info.config = vec![
        ConfigVariable::int("sv_max_clients", 64, 16, config_flags::SERVER),
        ConfigVariable::string("sv_name", "unnamed server", "Demo", config_flags::SERVER),
        ConfigVariable::string(
            "password",
            "",
            "secret",
            config_flags::SERVER | config_flags::NON_TEEHISTORIC,
        ),
    ];

    let mut gravity = TuningParam::new("gravity", 0.5);
    gravity.set(0.25);
    info.tuning = vec![gravity, TuningParam::new("ground_control_speed", 10.0)];

    info.uuids.register("teehistorian-demo@ddnet.tw");
    info
}

/// Players run in circles; one leaves halfway and rejoins with 0.7.
fn demo_session(th: &mut Teehistorian<IoSink<BufWriter<File>>>) {
    info!("=== Recording Demo Session ===");

    for cid in 0..PLAYERS {
        th.record_player_join(cid, Protocol::V6);
        th.record_player_ready(cid);
    }
    th.record_auth_initial(0, 3, "default_admin");

    let leaver = PLAYERS - 1;
    let mut connected = [true; PLAYERS as usize];

    for tick in 1..=DEMO_TICKS {
        th.begin_tick(tick);

        th.begin_players();
        for cid in 0..PLAYERS {
            if !connected[cid as usize] {
                th.record_dead_player(cid);
                continue;
            }
            // Everyone stands still for a second every five seconds
            if (tick / TICK_SPEED) % 5 == 4 {
                th.record_player(cid, &circle_position(cid, tick - tick % TICK_SPEED));
            } else if tick % (3 * TICK_SPEED) == 0 && cid == 1 {
                th.record_dead_player(cid);
            } else {
                th.record_player(cid, &circle_position(cid, tick));
            }
        }
        th.end_players();

        th.begin_inputs();
        for cid in 0..PLAYERS {
            if connected[cid as usize] {
                th.record_player_input(cid, &demo_input(cid, tick));
            }
        }
        th.end_inputs();

        if tick == DEMO_TICKS / 2 {
            th.record_player_drop(leaver, "timeout");
            connected[leaver as usize] = false;
        }
        if tick == DEMO_TICKS / 2 + TICK_SPEED {
            th.record_player_join(leaver, Protocol::V7);
            connected[leaver as usize] = true;
        }
        if tick % (2 * TICK_SPEED) == 0 {
            th.record_player_message(2, &[0x09, 0x00, b'h', b'i', 0x00]);
            th.record_player_team(2, tick / (2 * TICK_SPEED));
        }
        if tick == 3 * TICK_SPEED {
            th.record_console_command(0, 1, "tune", &["gravity", "0.25"]);
        }

        th.end_tick();

        if tick % TICK_SPEED == 0 {
            info!("Tick {} recorded", tick);
        }
    }

    th.finish();
}

fn circle_position(cid: i32, tick: i32) -> CharacterCore {
    let angle = f64::from(tick * (cid + 1)) / f64::from(TICK_SPEED);
    let radius = 64.0 * f64::from(cid + 1);
    CharacterCore::new(
        1024 + (angle.cos() * radius) as i32,
        512 + (angle.sin() * radius) as i32,
    )
}

fn demo_input(cid: i32, tick: i32) -> PlayerInput {
    PlayerInput {
        direction: if (tick / TICK_SPEED + cid) % 2 == 0 { 1 } else { -1 },
        target_x: 100,
        target_y: (tick % 64) - 32,
        jump: i32::from(tick % 25 == 0),
        fire: tick / 20,
        wanted_weapon: 1,
        ..PlayerInput::default()
    }
}
