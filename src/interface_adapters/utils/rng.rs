use std::{
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

/// Returns a process-unique id for a new connection.
///
/// The counter starts at the boot time so ids from a restarted server do not
/// collide with ones a stale client may still remember.
pub fn next_connection_id() -> u64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU64::new(now_micros()));
    counter.fetch_add(1, Ordering::Relaxed)
}
