use crate::use_cases::{ArenaSettings, WorldSettings};
use std::{
    env,
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(3000)
}

pub fn bind_addr() -> IpAddr {
    env::var("ARENA_BIND_ADDR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

pub fn tick_rate_hz() -> u32 {
    parse_tick_rate(env::var("ARENA_TICK_RATE_HZ").ok().as_deref())
}

pub fn bot_count() -> usize {
    env::var("ARENA_BOT_COUNT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_BOT_COUNT)
}

fn parse_tick_rate(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_TICK_RATE_HZ)
        .clamp(1, MAX_TICK_RATE_HZ)
}

pub fn tick_interval() -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(tick_rate_hz()))
}

pub const DEFAULT_TICK_RATE_HZ: u32 = 30;
pub const MAX_TICK_RATE_HZ: u32 = 240;
pub const DEFAULT_BOT_COUNT: usize = 10;

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;
pub const NOTICE_BROADCAST_CAPACITY: usize = 64;

// Longest step the simulation will take after a stall.
pub const MAX_TICK_DELTA: Duration = Duration::from_millis(100);

pub fn arena_settings() -> ArenaSettings {
    ArenaSettings {
        input_channel_capacity: INPUT_CHANNEL_CAPACITY,
        world_broadcast_capacity: WORLD_BROADCAST_CAPACITY,
        notice_broadcast_capacity: NOTICE_BROADCAST_CAPACITY,
        tick_interval: tick_interval(),
        max_tick_delta: MAX_TICK_DELTA,
        seed: None,
        world: WorldSettings {
            bot_count: bot_count(),
            ..WorldSettings::default()
        },
    }
}
