mod actuator;    // simulated track outputs
mod blackboard;  // shared controller status
mod bus;         // broadcast topics
mod clock;       // wall-clock tick source
mod command;     // operator command set
mod control;     // control loop
mod display;     // LCD emulation
mod settings;    // layered configuration
mod transport;   // TCP / stdio operator link

use std::{sync::Arc, time::Duration};

use blackboard::{Blackboard, snapshot};
use bus::Topic;
use clock::MonotonicTicks;
use control::Robot;
use display::{Frame, LineDisplay};
use settings::Settings;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Mjolnir controller starting.");
    let settings = Settings::load()?;

    let bb: Blackboard = Arc::default();
    let frames: Topic<Frame> = Topic::new(16);
    let frames_rx = frames.subscribe();
    let (transport, link) = transport::channel();

    let display = LineDisplay::new(&settings.display, frames);
    let robot = Robot::new(&settings, transport, display, Arc::clone(&bb), MonotonicTicks::new())?;

    info!("Spawning control thread...");
    let period = settings.control.loop_period();
    std::thread::Builder::new()
        .name("control".into())
        .spawn(move || robot.run(period))?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        tokio::try_join!(
            transport::serve(settings.transport.clone(), link),
            display::display_task(frames_rx),
            monitor(bb, settings.control.monitor_period()),
        )?;
        info!("Async runtime finished.");
        Ok::<(), anyhow::Error>(())
    })
}

/// Periodically logs controller status and newly raised faults.
async fn monitor(bb: Blackboard, period: Duration) -> anyhow::Result<()> {
    info!("Monitor task started.");
    let mut tick = tokio::time::interval(period);
    let mut reported = 0;
    loop {
        tick.tick().await;
        let status = snapshot(&bb);
        debug!(
            mode = ?status.mode,
            connected = status.connected,
            left_speed = status.left_speed,
            right_speed = status.right_speed,
            left = status.left_output,
            left_dir = ?status.left_rotation,
            right = status.right_output,
            right_dir = ?status.right_rotation,
            moving = status.moving,
            history = status.history_len,
            idle = ?status.last_cmd_ts.elapsed(),
            "Status"
        );
        for fault in status.faults.iter().skip(reported) {
            warn!(%fault, "Fault raised");
        }
        reported = status.faults.len();
    }
}
