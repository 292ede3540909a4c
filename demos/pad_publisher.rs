// Keyboard gamepad bridge: WASD move, Z/X twist, R/F stick deflection,
// 0-9 buttons, space holds emergency stop, Q quits
//
// Key repeats extend a button hold instead of re-pressing it, so holding a digit
// key gives one press on the runtime side.
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use kiwi_drive_runtime::config::{
    self, AXIS_COUNT, AXIS_TWIST, AXIS_X, AXIS_Y, BUTTON_COUNT, TOPIC_CMD_PAD,
};
use kiwi_drive_runtime::input::Action;
use kiwi_drive_runtime::messages::PadFrame;
use std::time::{Duration, Instant};
use tracing::info;

const DEFLECTIONS: [f32; 3] = [0.3, 0.6, 1.0];
const INPUT_TIMEOUT_MS: u64 = 100; // Center sticks after this much time with no input
// Longer than the usual terminal delay before auto-repeat starts
const BUTTON_HOLD_MS: u64 = 600;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_PAD).await?;
    let stop_button = config::button_map()?.index(Action::EmergencyStop);

    info!("Controls: WASD=move, Z/X=twist, R/F=deflection, 0-9=buttons, space=estop, Q=quit");
    info!("Deflection: LOW");

    enable_raw_mode()?;
    let result = run_pad(&publisher, stop_button).await;
    disable_raw_mode()?;

    result
}

async fn run_pad(
    publisher: &zenoh::pubsub::Publisher<'_>,
    stop_button: usize,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut level: usize = 0;

    // Persistent stick state; gamepad convention, stick forward is negative Y
    let mut axes = [0.0f32; AXIS_COUNT];
    let mut last_stick_input = Instant::now();

    // Last key event per button; a button reads held while events keep arriving
    let mut button_seen: Vec<Option<Instant>> = vec![None; BUTTON_COUNT];

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                let stick = DEFLECTIONS[level];

                match code {
                    KeyCode::Char('w') if pressed => {
                        axes[AXIS_Y] = -stick;
                        last_stick_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        axes[AXIS_Y] = stick;
                        last_stick_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        axes[AXIS_X] = -stick;
                        last_stick_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        axes[AXIS_X] = stick;
                        last_stick_input = Instant::now();
                    }
                    KeyCode::Char('z') if pressed => {
                        axes[AXIS_TWIST] = -stick;
                        last_stick_input = Instant::now();
                    }
                    KeyCode::Char('x') if pressed => {
                        axes[AXIS_TWIST] = stick;
                        last_stick_input = Instant::now();
                    }

                    // Deflection control
                    KeyCode::Char('r') if pressed => {
                        level = (level + 1).min(2);
                        print_level(level);
                    }
                    KeyCode::Char('f') if pressed => {
                        level = level.saturating_sub(1);
                        print_level(level);
                    }

                    KeyCode::Char(' ') if pressed => button_seen[stop_button] = Some(Instant::now()),
                    KeyCode::Char(c) if pressed && c.is_ascii_digit() => {
                        if let Some(index) = c.to_digit(10) {
                            button_seen[index as usize] = Some(Instant::now());
                        }
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        if last_stick_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            axes = [0.0; AXIS_COUNT];
        }

        let buttons = held_buttons(&button_seen, Instant::now());

        // Always publish at ~50Hz
        let frame = PadFrame {
            buttons,
            axes: axes.to_vec(),
        };
        publisher.put(serde_json::to_string(&frame)?).await?;
    }

    Ok(())
}

/// A button is down while its last key event is younger than the hold window
fn held_buttons(seen: &[Option<Instant>], now: Instant) -> Vec<bool> {
    let hold = Duration::from_millis(BUTTON_HOLD_MS);
    seen.iter()
        .map(|at| at.is_some_and(|at| now.saturating_duration_since(at) < hold))
        .collect()
}

fn print_level(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Deflection: {}", label);
}
