//! Running pods end to end.
//!
//! The runner owns the loaded pod catalog and the run ceremony: header,
//! missing-input warnings, heartbeat, per-task timing, artifact saving.
//! Execution failures are caught here and folded into the outcome; nothing
//! below the CLI boundary panics or propagates a run error further.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use crate::artifact;
use crate::pod::{PodConfig, PodLoader};
use crate::progress::{ExecutionTimer, Heartbeat};
use crate::utilities::{Printer, PrinterColor};

/// Options for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Write the result artifact when the pod's output section allows it.
    pub save_output: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { save_output: true }
    }
}

/// A finished run.
#[derive(Debug)]
pub struct RunReport {
    pub pod_name: String,
    /// Final result text, the last non-empty task output.
    pub raw: String,
    pub tasks_completed: usize,
    pub duration_secs: f64,
    /// Where the result was written, when saving was on and succeeded.
    pub artifact: Option<PathBuf>,
}

/// Outcome of a run. Failures are reported to the console and carried
/// here as text; they never escape as process errors.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    Failed { pod_name: String, error: String },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Failed { .. } => None,
        }
    }
}

/// Loads the pod catalog once and runs pods on demand.
#[derive(Debug)]
pub struct PodRunner {
    pub loader: PodLoader,
    printer: Printer,
}

impl PodRunner {
    pub fn new(pods_dir: impl Into<PathBuf>, tools_config: impl Into<PathBuf>) -> Self {
        Self {
            loader: PodLoader::new(pods_dir.into(), tools_config.into()),
            printer: Printer::default(),
        }
    }

    /// Run a named pod with the given inputs.
    ///
    /// An unknown pod name reports the available names and fails the run.
    /// Missing declared required inputs are warned about; the run proceeds
    /// and only an actually unbound placeholder fails it. A run whose
    /// artifact cannot be written still completes.
    pub fn run(
        &self,
        pod_key: &str,
        inputs: HashMap<String, String>,
        options: &RunOptions,
    ) -> RunOutcome {
        let Some(pod) = self.loader.get(pod_key) else {
            self.printer
                .print(&format!("Pod '{}' not found.", pod_key), PrinterColor::Red);
            self.print_available_pods();
            return RunOutcome::Failed {
                pod_name: pod_key.to_string(),
                error: format!("pod '{}' not found", pod_key),
            };
        };

        warn_missing_required(pod, &inputs);
        self.print_header(pod_key, pod, &inputs);

        let mut crew = match self.loader.build_crew(pod_key) {
            Ok(crew) => crew,
            Err(e) => {
                self.printer.print(
                    &format!("Pod '{}' could not be assembled: {}", pod_key, e),
                    PrinterColor::Red,
                );
                return RunOutcome::Failed {
                    pod_name: pod_key.to_string(),
                    error: e.to_string(),
                };
            }
        };

        let timer = ExecutionTimer::new();
        crew.set_task_callback(move |task| timer.task_completed(task));

        let heartbeat = Heartbeat::start();
        let started = Instant::now();
        let result = crew.kickoff(Some(inputs.clone()));
        heartbeat.stop();
        let duration_secs = started.elapsed().as_secs_f64();

        match result {
            Ok(output) => {
                self.printer.print(
                    &format!("Pod '{}' completed in {:.1}s", pod_key, duration_secs),
                    PrinterColor::BoldGreen,
                );
                let artifact = if options.save_output && pod.output.save {
                    self.save_artifact(pod_key, pod, &inputs, &output.raw)
                } else {
                    None
                };
                RunOutcome::Completed(RunReport {
                    pod_name: pod_key.to_string(),
                    raw: output.raw,
                    tasks_completed: output.tasks_output.len(),
                    duration_secs,
                    artifact,
                })
            }
            Err(e) => {
                self.printer.print(
                    &format!("Pod '{}' failed after {:.1}s: {}", pod_key, duration_secs, e),
                    PrinterColor::Red,
                );
                RunOutcome::Failed {
                    pod_name: pod_key.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    fn print_header(&self, pod_key: &str, pod: &PodConfig, inputs: &HashMap<String, String>) {
        self.printer.print(
            &format!("Deploying pod: {}", pod.display_name(pod_key)),
            PrinterColor::BoldCyan,
        );
        if let Some(description) = &pod.description {
            self.printer.print(description, PrinterColor::White);
        }
        if !inputs.is_empty() {
            let mut pairs: Vec<String> =
                inputs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            pairs.sort();
            self.printer
                .print(&format!("Inputs: {}", pairs.join(", ")), PrinterColor::White);
        }
    }

    fn print_available_pods(&self) {
        let names = self.loader.pod_names();
        if names.is_empty() {
            self.printer.print("No pods loaded.", PrinterColor::Yellow);
            return;
        }
        self.printer.print("Available pods:", PrinterColor::Yellow);
        for name in &names {
            self.printer.print(&format!("  - {}", name), PrinterColor::White);
        }
    }

    fn save_artifact(
        &self,
        pod_key: &str,
        pod: &PodConfig,
        inputs: &HashMap<String, String>,
        raw: &str,
    ) -> Option<PathBuf> {
        match artifact::save_result(&pod.output, pod_key, inputs, raw) {
            Ok(path) => {
                self.printer.print(
                    &format!("Output saved to {}", path.display()),
                    PrinterColor::Green,
                );
                Some(path)
            }
            Err(e) => {
                log::warn!("output for pod '{}' not saved: {}", pod_key, e);
                None
            }
        }
    }
}

fn warn_missing_required(pod: &PodConfig, inputs: &HashMap<String, String>) {
    for spec in &pod.inputs.required {
        if !inputs.contains_key(&spec.name) {
            log::warn!("required input '{}' not provided", spec.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner_with_pods(files: &[(&str, &str)]) -> (tempfile::TempDir, PodRunner) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        let runner = PodRunner::new(dir.path(), dir.path().join("tools.yaml"));
        (dir, runner)
    }

    #[test]
    fn test_unknown_pod_fails_without_panicking() {
        let (_dir, runner) = runner_with_pods(&[]);
        let outcome = runner.run("ghost", HashMap::new(), &RunOptions::default());
        assert!(!outcome.is_completed());
        assert!(outcome.report().is_none());
        match outcome {
            RunOutcome::Failed { pod_name, error } => {
                assert_eq!(pod_name, "ghost");
                assert!(error.contains("not found"));
            }
            RunOutcome::Completed(_) => panic!("unknown pod must not complete"),
        }
    }

    #[test]
    fn test_unassemblable_pod_fails_cleanly() {
        let yaml = r#"
name: No Tasks
agents:
  solo:
    role: Solo
    goal: g
    backstory: b
"#;
        let (_dir, runner) = runner_with_pods(&[("empty.yaml", yaml)]);
        let outcome = runner.run("empty", HashMap::new(), &RunOptions::default());
        match outcome {
            RunOutcome::Failed { error, .. } => assert!(error.contains("tasks")),
            RunOutcome::Completed(_) => panic!("pod without tasks must not complete"),
        }
    }
}
