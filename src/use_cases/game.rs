use super::types::{ArenaNotice, GameEvent, WorldUpdate};
use super::world::World;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Notify, broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Fixed-rate loop that owns the world. Runs until `shutdown` is notified.
pub async fn world_task(
    mut world: World,
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    notice_tx: broadcast::Sender<ArenaNotice>,
    tick_interval: Duration,
    max_tick_delta: Duration,
    shutdown: Arc<Notify>,
) {
    let mut interval = tokio::time::interval(tick_interval);
    // A stalled loop resumes on the next boundary instead of bursting.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_tick = Instant::now();
    info!(tick_ms = tick_interval.as_millis() as u64, "world task started");

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!(tick = world.tick(), "world task stopping");
                break;
            }
            _ = interval.tick() => {}
        }

        // Events are applied before the step so no tick sees a half-applied join.
        while let Ok(event) = input_rx.try_recv() {
            if let Some(notice) = world.apply_event(event) {
                let _ = notice_tx.send(notice);
            }
        }

        let now = Instant::now();
        let dt = clamp_dt(now.duration_since(last_tick), max_tick_delta);
        last_tick = now;

        world.step(dt);

        // No receivers is fine: nobody is connected yet.
        let _ = world_tx.send(world.snapshot());
    }
}

/// Converts the measured time since the last tick into a step, capped at `max`.
fn clamp_dt(elapsed: Duration, max: Duration) -> f32 {
    if elapsed > max {
        warn!(
            elapsed_ms = elapsed.as_millis() as u64,
            max_ms = max.as_millis() as u64,
            "tick delta clamped"
        );
        return max.as_secs_f32();
    }
    elapsed.as_secs_f32()
}
