//! Pod loading and assembly errors.

use thiserror::Error;

/// Failures raised while loading configuration or assembling a crew.
///
/// Per-file problems during directory scans are logged and skipped rather
/// than raised; these variants cover the cases where a caller asked for a
/// specific pod and cannot be given one.
#[derive(Debug, Error)]
pub enum PodError {
    #[error("pod '{0}' not found")]
    UnknownPod(String),
    #[error("pod '{name}' defines no usable {what}")]
    Empty { name: String, what: &'static str },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
