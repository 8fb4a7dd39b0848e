//! Console progress reporting for long runs.
//!
//! Two pieces: a background heartbeat that prints a still-alive line every
//! 30 seconds while the workflow blocks the main thread, and a per-task
//! timer attached as a crew callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;

use crate::task::Task;
use crate::utilities::{Printer, PrinterColor};

/// How often the heartbeat prints while work is in flight.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Poll granularity of the heartbeat thread. Short enough that `stop`
/// takes effect promptly, long enough to cost nothing.
const HEARTBEAT_TICK: Duration = Duration::from_millis(250);

/// Background still-working printer.
///
/// The thread shares only the stop flag and its captured start instant.
/// It is never joined; `stop` (also called on drop) ends the loop within
/// one tick, and process exit ends it regardless.
pub struct Heartbeat {
    stop: Arc<AtomicBool>,
}

impl Heartbeat {
    /// Spawn the heartbeat with the standard interval.
    pub fn start() -> Self {
        Self::with_interval(HEARTBEAT_INTERVAL)
    }

    /// Spawn with a custom interval.
    pub fn with_interval(interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let started = Instant::now();

        let spawn_result = thread::Builder::new()
            .name("progress-heartbeat".to_string())
            .spawn(move || {
                let mut last_beat = Instant::now();
                while !flag.load(Ordering::Relaxed) {
                    thread::sleep(HEARTBEAT_TICK.min(interval));
                    if last_beat.elapsed() >= interval {
                        println!("{}", heartbeat_line(started.elapsed().as_secs()));
                        last_beat = Instant::now();
                    }
                }
            });
        if let Err(e) = spawn_result {
            log::warn!("progress heartbeat not started: {}", e);
        }

        Self { stop }
    }

    /// Ask the heartbeat thread to exit.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

fn heartbeat_line(elapsed_secs: u64) -> String {
    format!(
        "[{}] Still working... (elapsed: {}s)",
        Local::now().format("%H:%M:%S"),
        elapsed_secs
    )
}

/// Preview length for task results in progress output.
const RESULT_PREVIEW_CHARS: usize = 200;

/// Per-task completion printer, attached as a crew task callback.
pub struct ExecutionTimer {
    started: Instant,
    printer: Printer,
}

impl Default for ExecutionTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionTimer {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            printer: Printer::default(),
        }
    }

    /// Print a completion line for a finished task.
    pub fn task_completed(&self, task: &Task) {
        let name = task.name.as_deref().unwrap_or("task");
        let duration = task
            .execution_duration()
            .map(|secs| format!("{:.1}s", secs))
            .unwrap_or_else(|| "?".to_string());
        self.printer.print(
            &format!(
                "[{}] Task completed: {} (duration: {}, total elapsed: {:.0}s)",
                Local::now().format("%H:%M:%S"),
                name,
                duration,
                self.started.elapsed().as_secs_f64()
            ),
            PrinterColor::Cyan,
        );
        if let Some(output) = &task.output {
            self.printer.print(
                &format!("Result preview: {}", preview(&output.raw)),
                PrinterColor::White,
            );
        }
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= RESULT_PREVIEW_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(RESULT_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}
