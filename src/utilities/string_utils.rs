//! String helpers: placeholder interpolation and tool-name normalization.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_\-]*)\}").unwrap());
static DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]+").unwrap());
static DUPLICATE_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

const MAX_TOOL_NAME_LENGTH: usize = 64;

/// Normalize a tool name for matching against model output.
///
/// Lowercases, replaces runs of non-alphanumeric characters with a single
/// underscore, strips edge underscores and truncates to `MAX_TOOL_NAME_LENGTH`.
/// `"Limited Search"` and `"limited_search"` normalize to the same key.
pub fn sanitize_tool_name(name: &str) -> String {
    let ascii_name: String = name.chars().filter(|c| c.is_ascii()).collect();
    let lowered = ascii_name.to_lowercase();
    let replaced = DISALLOWED_CHARS.replace_all(&lowered, "_");
    let collapsed = DUPLICATE_UNDERSCORE.replace_all(&replaced, "_");
    let stripped = collapsed.trim_matches('_').to_string();
    if stripped.len() > MAX_TOOL_NAME_LENGTH {
        stripped[..MAX_TOOL_NAME_LENGTH].trim_end_matches('_').to_string()
    } else {
        stripped
    }
}

/// Interpolate `{placeholder}` occurrences, erroring on unbound placeholders.
///
/// Placeholders follow `{variable_name}` where `variable_name` starts with a
/// letter or underscore and contains only alphanumerics, underscores and
/// hyphens. Text without placeholders passes through untouched, so JSON
/// braces in task descriptions are safe.
///
/// # Errors
/// Returns an error naming the first placeholder missing from `inputs`.
pub fn interpolate_only(
    input_string: Option<&str>,
    inputs: &HashMap<String, String>,
) -> Result<String, String> {
    let input = match input_string {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(String::new()),
    };

    let variables: Vec<String> = VARIABLE_PATTERN
        .captures_iter(input)
        .map(|cap| cap[1].to_string())
        .collect();
    if variables.is_empty() {
        return Ok(input.to_string());
    }

    let missing: Vec<&String> = variables.iter().filter(|v| !inputs.contains_key(*v)).collect();
    if !missing.is_empty() {
        return Err(format!(
            "Template variable '{{{}}}' has no value in the provided inputs",
            missing[0]
        ));
    }

    let mut result = input.to_string();
    for var in &variables {
        if let Some(value) = inputs.get(var) {
            let placeholder = format!("{{{}}}", var);
            result = result.replace(&placeholder, value);
        }
    }

    Ok(result)
}

/// Interpolate `{placeholder}` occurrences, leaving unbound placeholders as-is.
///
/// Used for filename templates, where an unknown placeholder should survive
/// into the rendered name (and then be sanitized) rather than kill the run.
pub fn interpolate_lenient(input: &str, inputs: &HashMap<String, String>) -> String {
    VARIABLE_PATTERN
        .replace_all(input, |caps: &regex::Captures<'_>| match inputs.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_tool_name_spaces_and_case() {
        assert_eq!(sanitize_tool_name("Limited Search"), "limited_search");
        assert_eq!(sanitize_tool_name("limited_search"), "limited_search");
    }

    #[test]
    fn test_sanitize_tool_name_special_chars() {
        assert_eq!(sanitize_tool_name("hello world!"), "hello_world");
    }

    #[test]
    fn test_interpolate_only_basic() {
        let mut inputs = HashMap::new();
        inputs.insert("name".to_string(), "Alice".to_string());
        let result = interpolate_only(Some("Hello {name}!"), &inputs).unwrap();
        assert_eq!(result, "Hello Alice!");
    }

    #[test]
    fn test_interpolate_only_missing_var() {
        let inputs = HashMap::new();
        let result = interpolate_only(Some("Hello {name}!"), &inputs);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("{name}"));
    }

    #[test]
    fn test_interpolate_only_no_placeholders() {
        let inputs = HashMap::new();
        let result = interpolate_only(Some(r#"{"key": 1}"#), &inputs).unwrap();
        assert_eq!(result, r#"{"key": 1}"#);
    }

    #[test]
    fn test_interpolate_lenient_keeps_unknown() {
        let mut inputs = HashMap::new();
        inputs.insert("pod_name".to_string(), "demo".to_string());
        let rendered = interpolate_lenient("{pod_name}_{timestamp}", &inputs);
        assert_eq!(rendered, "demo_{timestamp}");
    }
}
