//! Saving workflow results to disk.
//!
//! Filenames come from the pod's output template. `{pod_name}` and
//! `{timestamp}` are always bound; run inputs are bound by name, so a
//! template like `{pod_name}_{topic}_{timestamp}` picks up the `topic`
//! input. Unknown placeholders survive into the name and are sanitized
//! with everything else.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::pod::OutputConfig;
use crate::utilities::interpolate_lenient;

/// Timestamp layout for output filenames, 14 digits.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Render the output filename for one run.
///
/// `.md` is appended unless the template already carries an extension.
pub fn render_filename(
    template: &str,
    pod_name: &str,
    inputs: &HashMap<String, String>,
    now: DateTime<Local>,
) -> String {
    let mut vars = inputs.clone();
    vars.insert("pod_name".to_string(), pod_name.to_string());
    vars.insert("timestamp".to_string(), now.format(TIMESTAMP_FORMAT).to_string());

    let rendered = sanitize_filename(&interpolate_lenient(template, &vars));
    if Path::new(&rendered).extension().is_some() {
        rendered
    } else {
        format!("{}.md", rendered)
    }
}

/// Replace everything outside `[A-Za-z0-9._-]` with an underscore so input
/// values cannot smuggle path separators into the name. Leading dots are
/// stripped so rendered names never come out hidden or relative.
fn sanitize_filename(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = mapped.trim_start_matches('.');
    if trimmed.is_empty() {
        "output".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Write the result under the pod's output directory.
///
/// Creates the directory if needed and returns the written path.
///
/// # Errors
/// Returns the underlying I/O error when the directory or file cannot be
/// written. Callers treat this as a warning; a finished run is not failed
/// over a save problem.
pub fn save_result(
    config: &OutputConfig,
    pod_name: &str,
    inputs: &HashMap<String, String>,
    result: &str,
) -> io::Result<PathBuf> {
    let dir = PathBuf::from(&config.dir);
    fs::create_dir_all(&dir)?;

    let filename = render_filename(&config.filename, pod_name, inputs, Local::now());
    let path = dir.join(filename);
    fs::write(&path, result)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    use once_cell::sync::Lazy;
    use regex::Regex;
    use tempfile::tempdir;

    static DEFAULT_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^demo_\d{14}\.md$").unwrap());

    #[test]
    fn test_default_template_yields_timestamped_name() {
        let name = render_filename("{pod_name}_{timestamp}", "demo", &HashMap::new(), Local::now());
        assert!(DEFAULT_NAME.is_match(&name), "unexpected filename: {}", name);
    }

    #[test]
    fn test_inputs_are_bound_and_sanitized() {
        let mut inputs = HashMap::new();
        inputs.insert("topic".to_string(), "AI in Healthcare".to_string());
        let name = render_filename("{pod_name}_{topic}", "demo", &inputs, Local::now());
        assert_eq!(name, "demo_AI_in_Healthcare.md");
    }

    #[test]
    fn test_unknown_placeholder_survives_sanitized() {
        let name = render_filename("{pod_name}_{nope}", "demo", &HashMap::new(), Local::now());
        assert_eq!(name, "demo__nope_.md");
    }

    #[test]
    fn test_path_separators_in_inputs_are_neutralized() {
        let mut inputs = HashMap::new();
        inputs.insert("topic".to_string(), "../escape".to_string());
        let name = render_filename("{topic}", "demo", &inputs, Local::now());
        assert!(!name.contains('/'));
        assert_eq!(name, "_escape.md");
    }

    #[test]
    fn test_template_with_extension_keeps_it() {
        let name = render_filename("report.txt", "demo", &HashMap::new(), Local::now());
        assert_eq!(name, "report.txt");
    }

    #[test]
    fn test_save_result_creates_dir_and_file() {
        let dir = tempdir().unwrap();
        let config = OutputConfig {
            save: true,
            dir: dir.path().join("out").to_string_lossy().into_owned(),
            filename: "{pod_name}_{timestamp}".to_string(),
        };
        let path = save_result(&config, "demo", &HashMap::new(), "# Result\n").unwrap();
        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Result\n");
    }
}
