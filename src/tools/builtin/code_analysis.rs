//! Static text analysis of a source listing.
//!
//! Heuristic line and keyword scanning, not a real parser: enough to give an
//! agent structure counts and obvious smells for Rust and Python listings,
//! with a generic keyword table for anything else.

use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::tools::base_tool::{BaseTool, ToolResult};

const LONG_FUNCTION_LINES: usize = 50;
const MAX_REPORTED_ISSUES: usize = 10;

static RUST_FN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bfn\s+(\w+)").unwrap());
static RUST_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:struct|enum|trait)\s+(\w+)").unwrap());
static RUST_PUB_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*pub\s+(?:fn|struct|enum|trait)\s+(\w+)").unwrap());
static PY_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)(?:def|class)\s+(\w+)").unwrap());

/// Code quality and structure analyzer.
#[derive(Debug, Default)]
pub struct CodeAnalysisTool {
    usage_count: u32,
}

impl CodeAnalysisTool {
    pub fn new() -> Self {
        Self::default()
    }

    fn analyze(&self, code: &str, language: &str) -> String {
        match language.to_lowercase().as_str() {
            "rust" | "rs" => analyze_rust(code),
            "python" | "py" => analyze_python(code),
            other => analyze_generic(code, other),
        }
    }
}

#[async_trait]
impl BaseTool for CodeAnalysisTool {
    fn name(&self) -> &str {
        "code_analysis"
    }

    fn description(&self) -> &str {
        "Analyzes code for quality, structure, and potential issues."
    }

    fn args_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": { "type": "string", "description": "Source listing to analyze" },
                "language": { "type": "string", "description": "Language hint (default: rust)" }
            },
            "required": ["code"]
        })
    }

    fn current_usage_count(&self) -> u32 {
        self.usage_count
    }

    fn increment_usage_count(&mut self) {
        self.usage_count += 1;
    }

    fn reset_usage_count(&mut self) {
        self.usage_count = 0;
    }

    fn run(&mut self, args: HashMap<String, Value>) -> ToolResult {
        let code = match args.get("code").and_then(|v| v.as_str()) {
            Some(c) if !c.trim().is_empty() => c.to_string(),
            _ => {
                return Ok(Value::String(
                    "No code provided. Pass the source listing in a 'code' argument.".to_string(),
                ))
            }
        };
        let language = args
            .get("language")
            .and_then(|v| v.as_str())
            .unwrap_or("rust")
            .to_string();
        self.increment_usage_count();
        Ok(Value::String(self.analyze(&code, &language)))
    }
}

// ---------------------------------------------------------------------------
// Language-specific analysis
// ---------------------------------------------------------------------------

fn analyze_rust(code: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let mut report = Vec::new();

    let functions = RUST_FN.captures_iter(code).count();
    let types = RUST_TYPE.captures_iter(code).count();
    let imports = lines
        .iter()
        .filter(|l| l.trim_start().starts_with("use "))
        .count();

    report.push("Code Structure Analysis (rust):".to_string());
    report.push(format!("  - Functions: {}", functions));
    report.push(format!("  - Types (struct/enum/trait): {}", types));
    report.push(format!("  - Use declarations: {}", imports));

    let mut issues = Vec::new();
    for (name, length) in rust_function_lengths(&lines) {
        if length > LONG_FUNCTION_LINES {
            issues.push(format!("Function '{}' is very long ({} lines)", name, length));
        }
    }
    for (idx, line) in lines.iter().enumerate() {
        if let Some(caps) = RUST_PUB_ITEM.captures(line) {
            if !has_rust_doc(&lines, idx) {
                issues.push(format!("Public item '{}' missing doc comment", &caps[1]));
            }
        }
    }
    push_issues(&mut report, &issues);

    let if_count = count_keyword_lines(&lines, &["if "]);
    let loop_count = count_keyword_lines(&lines, &["for ", "while ", "loop "]);
    let match_count = count_keyword_lines(&lines, &["match "]);
    report.push("\nComplexity Indicators:".to_string());
    report.push(format!("  - If statements: {}", if_count));
    report.push(format!("  - Loops: {}", loop_count));
    report.push(format!("  - Match expressions: {}", match_count));

    report.join("\n")
}

fn analyze_python(code: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let mut report = Vec::new();

    let defs = lines
        .iter()
        .filter(|l| l.trim_start().starts_with("def "))
        .count();
    let classes = lines
        .iter()
        .filter(|l| l.trim_start().starts_with("class "))
        .count();
    let imports = lines
        .iter()
        .filter(|l| {
            let t = l.trim_start();
            t.starts_with("import ") || t.starts_with("from ")
        })
        .count();

    report.push("Code Structure Analysis (python):".to_string());
    report.push(format!("  - Functions: {}", defs));
    report.push(format!("  - Classes: {}", classes));
    report.push(format!("  - Import statements: {}", imports));

    let mut issues = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if let Some(caps) = PY_DEF.captures(line) {
            let name = caps[2].to_string();
            if !has_python_docstring(&lines, idx) {
                issues.push(format!("'{}' missing docstring", name));
            }
            let length = python_block_length(&lines, idx, caps[1].len());
            if length > LONG_FUNCTION_LINES {
                issues.push(format!("'{}' is very long ({} lines)", name, length));
            }
        }
    }
    push_issues(&mut report, &issues);

    let if_count = count_keyword_lines(&lines, &["if ", "elif "]);
    let loop_count = count_keyword_lines(&lines, &["for ", "while "]);
    let try_count = count_keyword_lines(&lines, &["try:", "try "]);
    report.push("\nComplexity Indicators:".to_string());
    report.push(format!("  - If statements: {}", if_count));
    report.push(format!("  - Loops: {}", loop_count));
    report.push(format!("  - Try blocks: {}", try_count));

    report.join("\n")
}

fn analyze_generic(code: &str, language: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let mut report = Vec::new();

    let non_empty = lines.iter().filter(|l| !l.trim().is_empty()).count();
    let comments = lines
        .iter()
        .filter(|l| {
            let t = l.trim_start();
            t.starts_with("//") || t.starts_with('#') || t.starts_with("/*") || t.starts_with('*')
        })
        .count();

    report.push(format!("General Code Analysis ({}):", language));
    report.push(format!("  - Total lines: {}", lines.len()));
    report.push(format!("  - Non-empty lines: {}", non_empty));
    report.push(format!("  - Comment lines: {}", comments));

    let patterns: [(&str, &[&str]); 3] = [
        ("Function keywords", &["function", "def", "func", "method", "procedure"]),
        ("Class keywords", &["class", "interface", "struct"]),
        ("Control flow", &["if", "else", "while", "for", "switch", "case"]),
    ];
    report.push("\nPattern Detection:".to_string());
    for (label, keywords) in patterns {
        let count: usize = lines
            .iter()
            .map(|line| {
                let lower = line.to_lowercase();
                keywords.iter().filter(|k| lower.contains(*k)).count()
            })
            .sum();
        report.push(format!("  - {}: {}", label, count));
    }

    report.join("\n")
}

// ---------------------------------------------------------------------------
// Heuristics
// ---------------------------------------------------------------------------

/// Lengths of brace-delimited `fn` bodies, by scanning brace depth from each
/// definition line. String literals can fool it; good enough for a hint.
fn rust_function_lengths(lines: &[&str]) -> Vec<(String, usize)> {
    let mut lengths = Vec::new();
    let mut idx = 0;
    while idx < lines.len() {
        if let Some(caps) = RUST_FN.captures(lines[idx]) {
            let name = caps[1].to_string();
            let mut depth: i32 = 0;
            let mut seen_open = false;
            let mut end = idx;
            for (offset, line) in lines[idx..].iter().enumerate() {
                for ch in line.chars() {
                    match ch {
                        '{' => {
                            depth += 1;
                            seen_open = true;
                        }
                        '}' => depth -= 1,
                        _ => {}
                    }
                }
                end = idx + offset;
                if seen_open && depth <= 0 {
                    break;
                }
            }
            if seen_open {
                lengths.push((name, end - idx + 1));
                idx = end + 1;
                continue;
            }
        }
        idx += 1;
    }
    lengths
}

/// Whether the pub item at `idx` has a `///` line above it, skipping
/// attribute lines.
fn has_rust_doc(lines: &[&str], idx: usize) -> bool {
    let mut cursor = idx;
    while cursor > 0 {
        cursor -= 1;
        let trimmed = lines[cursor].trim_start();
        if trimmed.starts_with("#[") || trimmed.starts_with("#!") {
            continue;
        }
        return trimmed.starts_with("///") || trimmed.starts_with("/**");
    }
    false
}

/// Whether the `def`/`class` at `idx` is followed by a docstring line.
fn has_python_docstring(lines: &[&str], idx: usize) -> bool {
    for line in lines.iter().skip(idx + 1) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        return trimmed.starts_with("\"\"\"") || trimmed.starts_with("'''");
    }
    false
}

/// Length of the indented block starting at `idx` with the given indent.
fn python_block_length(lines: &[&str], idx: usize, indent: usize) -> usize {
    let mut length = 1;
    for line in lines.iter().skip(idx + 1) {
        if line.trim().is_empty() {
            length += 1;
            continue;
        }
        let line_indent = line.len() - line.trim_start().len();
        if line_indent <= indent {
            break;
        }
        length += 1;
    }
    length
}

fn count_keyword_lines(lines: &[&str], keywords: &[&str]) -> usize {
    lines
        .iter()
        .map(|line| {
            let t = line.trim_start();
            keywords.iter().filter(|k| t.starts_with(*k) || t.contains(&format!(" {}", k))).count()
        })
        .sum()
}

fn push_issues(report: &mut Vec<String>, issues: &[String]) {
    if !issues.is_empty() {
        report.push("\nPotential Issues:".to_string());
        for issue in issues.iter().take(MAX_REPORTED_ISSUES) {
            report.push(format!("  - {}", issue));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with(code: &str, language: &str) -> String {
        let mut tool = CodeAnalysisTool::new();
        let mut args = HashMap::new();
        args.insert("code".to_string(), Value::String(code.to_string()));
        args.insert("language".to_string(), Value::String(language.to_string()));
        match tool.run(args).unwrap() {
            Value::String(s) => s,
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_rust_structure_counts() {
        let code = r#"
use std::fmt;

/// Documented.
pub struct Point { x: i32 }

fn helper() {
    if true {
        println!("hi");
    }
}
"#;
        let report = run_with(code, "rust");
        assert!(report.contains("Functions: 1"));
        assert!(report.contains("Types (struct/enum/trait): 1"));
        assert!(report.contains("Use declarations: 1"));
        assert!(report.contains("If statements: 1"));
    }

    #[test]
    fn test_rust_missing_doc_reported() {
        let code = "pub fn undocumented() {}\n";
        let report = run_with(code, "rust");
        assert!(report.contains("Public item 'undocumented' missing doc comment"));
    }

    #[test]
    fn test_python_docstring_check() {
        let code = "def documented():\n    \"\"\"Doc.\"\"\"\n    pass\n\ndef bare():\n    pass\n";
        let report = run_with(code, "python");
        assert!(!report.contains("'documented' missing docstring"));
        assert!(report.contains("'bare' missing docstring"));
    }

    #[test]
    fn test_generic_analysis_counts_lines() {
        let code = "// comment\nfunction f() {}\n\nif (x) {}\n";
        let report = run_with(code, "javascript");
        assert!(report.contains("General Code Analysis (javascript):"));
        assert!(report.contains("Total lines: 4"));
        assert!(report.contains("Comment lines: 1"));
    }

    #[test]
    fn test_missing_code_is_reported_as_text() {
        let mut tool = CodeAnalysisTool::new();
        let out = match tool.run(HashMap::new()).unwrap() {
            Value::String(s) => s,
            other => panic!("expected string, got {:?}", other),
        };
        assert!(out.contains("No code provided"));
        assert_eq!(tool.current_usage_count(), 0);
    }
}
