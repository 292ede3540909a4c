// 50 Hz drive loop over zenoh
// Pad and heading frames are drained between ticks; each tick's actuation and
// health (with the heartbeat count) are published straight after it runs.

use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

// local imports
use crate::config::{
    self, Args, BUTTON_COUNT, HEADING_TIMEOUT, LOOP_HZ, PAD_TIMEOUT, TOPIC_CMD_PAD, TOPIC_HEALTH,
    TOPIC_RT_BASE, TOPIC_STATE_IMU,
};
use crate::control::{ControlLoop, Heartbeat, Peripherals, TracingDiagnostics};
use crate::input::LatchedPad;
use crate::messages::{HealthReport, ImuFrame, PadFrame, RuntimeHealth};
use crate::motor::{DirectionMode, KiwiKinematics, WheelChannel};
use crate::orientation::LatchedHeading;
use crate::safety::SafetyState;

pub async fn run(args: Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let buttons = config::button_map()?;
    let axes = config::axis_map(!args.no_invert_y)?;
    let direction = if args.legacy_direction {
        DirectionMode::SingleQuadrant
    } else {
        DirectionMode::FourQuadrant
    };
    let kinematics = KiwiKinematics::new(direction, args.normalize);
    let (direction, normalize) = (kinematics.direction_mode(), kinematics.normalizes());

    let neutral = args.initial_neutral_modes();
    let mut io = Peripherals {
        pad: LatchedPad::new(BUTTON_COUNT, PAD_TIMEOUT),
        heading: LatchedHeading::new(HEADING_TIMEOUT),
        wheels: [
            WheelChannel::new("a", neutral[0]),
            WheelChannel::new("b", neutral[1]),
            WheelChannel::new("c", neutral[2]),
        ],
        liveness: Heartbeat::default(),
        diagnostics: TracingDiagnostics,
    };
    let mut control = ControlLoop::new(buttons, axes, kinematics, &io.wheels);

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_pad = session.declare_subscriber(TOPIC_CMD_PAD).await?;
    let sub_imu = session.declare_subscriber(TOPIC_STATE_IMU).await?;
    let pub_actuation = session.declare_publisher(TOPIC_RT_BASE).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Runtime started: {}Hz loop, {}ms pad timeout, direction {:?}, normalize {}",
        LOOP_HZ,
        PAD_TIMEOUT.as_millis(),
        direction,
        normalize
    );
    info!("Subscribed to: {}, {}", TOPIC_CMD_PAD, TOPIC_STATE_IMU);
    info!("Publishing to: {}, {}", TOPIC_RT_BASE, TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain pending frames (non-blocking), keep latest
        while let Ok(Some(sample)) = sub_pad.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<PadFrame>(&payload) {
                Ok(frame) => io.pad.on_frame(frame),
                Err(e) => warn!("Failed to parse pad frame: {}", e),
            }
        }
        while let Ok(Some(sample)) = sub_imu.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<ImuFrame>(&payload) {
                Ok(frame) => io.heading.on_frame(frame),
                Err(e) => warn!("Failed to parse heading frame: {}", e),
            }
        }

        // 2. Run the tick (includes the pad watchdog); buttons held across a pad
        // dropout carry no edge when frames resume
        let pad_stale = io.pad.refresh();
        if io.pad.just_recovered() {
            control.resync_inputs(&io.pad);
        }
        let report = control.tick(&mut io);

        // 3. Publish actuation; a failed put is logged and the loop keeps running
        let actuation = WheelChannel::actuation(&io.wheels);
        match serde_json::to_string(&actuation) {
            Ok(json) => {
                if let Err(e) = pub_actuation.put(json).await {
                    warn!("Failed to publish actuation: {}", e);
                }
            }
            Err(e) => warn!("Failed to encode actuation: {}", e),
        }

        // 4. Publish health, even if the actuation put failed
        let health_report = HealthReport {
            beat: io.liveness.beats(),
            health: health_of(report.safety, pad_stale),
            field_oriented: report.field_oriented,
            heading_ok: control.state().heading_ok,
        };
        match serde_json::to_string(&health_report) {
            Ok(json) => {
                if let Err(e) = pub_health.put(json).await {
                    warn!("Failed to publish health: {}", e);
                }
            }
            Err(e) => warn!("Failed to encode health: {}", e),
        }
    }
}

/// Estop outranks a stale pad
fn health_of(safety: SafetyState, pad_stale: bool) -> RuntimeHealth {
    match (safety, pad_stale) {
        (SafetyState::Estopped, _) => RuntimeHealth::Estopped,
        (SafetyState::Normal, true) => RuntimeHealth::PadStale,
        (SafetyState::Normal, false) => RuntimeHealth::Ok,
    }
}
