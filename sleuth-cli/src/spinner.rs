//! Indeterminate progress indicator for long model calls.
//!
//! Animates on stderr from a background task and clears its line when
//! stopped, so whatever is printed next starts on a clean line. When stderr
//! is not a terminal nothing is drawn.

use crossterm::{
    cursor::MoveToColumn,
    queue,
    terminal::{Clear, ClearType},
};
use std::io::{IsTerminal, Write};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Spinner frames for animation.
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// A running spinner. Dropping it also ends the animation, but only `stop`
/// waits for the line to be cleared.
pub struct Spinner {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Start animating `label` on stderr.
    pub fn start(label: impl Into<String>) -> Self {
        if !std::io::stderr().is_terminal() {
            return Self {
                stop_tx: None,
                handle: None,
            };
        }

        let label = label.into();
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(FRAME_INTERVAL);
            let mut tick = 0usize;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let frame = SPINNER_FRAMES[tick % SPINNER_FRAMES.len()];
                        let elapsed = format_elapsed(started.elapsed());
                        let mut err = std::io::stderr();
                        let _ = queue!(err, MoveToColumn(0), Clear(ClearType::CurrentLine));
                        let _ = write!(err, "\x1b[36m{frame}\x1b[0m {label} \x1b[90m[{elapsed}]\x1b[0m");
                        let _ = err.flush();
                        tick += 1;
                    }
                }
            }
            let mut err = std::io::stderr();
            let _ = queue!(err, MoveToColumn(0), Clear(ClearType::CurrentLine));
            let _ = err.flush();
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Stop the animation and wait until its line is cleared.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

/// Compact elapsed time: `4.2s` under a minute, `3m07s` after.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        format!("{secs:.1}s")
    } else {
        let whole = elapsed.as_secs();
        format!("{}m{:02}s", whole / 60, whole % 60)
    }
}
