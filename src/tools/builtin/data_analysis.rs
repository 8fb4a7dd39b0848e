//! Data-analysis planning checklists.
//!
//! Produces a fixed recommendation list per analysis type, framed around the
//! caller's data description. No computation happens here; the value is in
//! steering an agent toward a sensible analysis plan.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::base_tool::{BaseTool, ToolResult};

/// Dataset analysis recommendation tool.
#[derive(Debug, Default)]
pub struct DataAnalysisTool {
    usage_count: u32,
}

impl DataAnalysisTool {
    pub fn new() -> Self {
        Self::default()
    }

    fn report(&self, data_description: &str, analysis_type: &str) -> String {
        let mut lines = vec![
            "Data Analysis Report".to_string(),
            format!("Data: {}", data_description),
            format!("Analysis Type: {}", analysis_type),
            "=".repeat(50),
        ];

        match analysis_type.to_lowercase().as_str() {
            "descriptive" => lines.extend(descriptive_recommendations()),
            "statistical" => lines.extend(statistical_recommendations()),
            "trend" => lines.extend(trend_recommendations()),
            _ => {
                lines.push("Unknown analysis type. Performing basic analysis.".to_string());
                lines.extend(basic_recommendations());
            }
        }

        lines.join("\n")
    }
}

#[async_trait]
impl BaseTool for DataAnalysisTool {
    fn name(&self) -> &str {
        "data_analysis"
    }

    fn description(&self) -> &str {
        "Recommends analysis steps and statistical techniques for a described dataset."
    }

    fn args_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "data_description": { "type": "string", "description": "What the dataset contains" },
                "analysis_type": {
                    "type": "string",
                    "description": "descriptive, statistical, or trend (default: descriptive)"
                }
            },
            "required": ["data_description"]
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
        let data_description = match args.get("data_description").and_then(|v| v.as_str()) {
            Some(d) if !d.trim().is_empty() => d.to_string(),
            _ => {
                return Ok(Value::String(
                    "No dataset described. Pass a 'data_description' argument.".to_string(),
                ))
            }
        };
        let analysis_type = args
            .get("analysis_type")
            .and_then(|v| v.as_str())
            .unwrap_or("descriptive")
            .to_string();
        self.increment_usage_count();
        Ok(Value::String(self.report(&data_description, &analysis_type)))
    }
}

fn descriptive_recommendations() -> Vec<String> {
    to_lines(
        "Descriptive Analysis Recommendations:",
        &[
            "Calculate central tendency measures (mean, median, mode)",
            "Determine variability measures (standard deviation, range)",
            "Identify outliers and anomalies",
            "Generate frequency distributions",
            "Create summary statistics tables",
        ],
        Some((
            "Insights to look for:",
            &[
                "Data distribution patterns",
                "Missing or inconsistent values",
                "Unusual patterns or anomalies",
                "Key performance indicators",
            ],
        )),
    )
}

fn statistical_recommendations() -> Vec<String> {
    to_lines(
        "Statistical Analysis Recommendations:",
        &[
            "Perform hypothesis testing",
            "Calculate correlation coefficients",
            "Conduct regression analysis",
            "Apply significance testing",
            "Generate confidence intervals",
        ],
        Some((
            "Advanced techniques to consider:",
            &[
                "ANOVA for group comparisons",
                "Chi-square tests for categorical data",
                "Time series analysis for temporal data",
                "Multivariate analysis for complex relationships",
            ],
        )),
    )
}

fn trend_recommendations() -> Vec<String> {
    to_lines(
        "Trend Analysis Recommendations:",
        &[
            "Identify seasonal patterns",
            "Calculate growth rates and trends",
            "Detect cyclical behaviors",
            "Forecast future values",
            "Analyze trend significance",
        ],
        Some((
            "Forecasting considerations:",
            &[
                "Moving averages for smoothing",
                "Exponential smoothing techniques",
                "ARIMA models for complex patterns",
                "Confidence intervals for predictions",
            ],
        )),
    )
}

fn basic_recommendations() -> Vec<String> {
    to_lines(
        "Basic Analysis Recommendations:",
        &[
            "Review data quality and completeness",
            "Understand data structure and format",
            "Identify key variables and relationships",
            "Create initial visualizations",
            "Document findings and observations",
        ],
        None,
    )
}

fn to_lines(header: &str, items: &[&str], extra: Option<(&str, &[&str])>) -> Vec<String> {
    let mut lines = vec![format!("\n{}", header)];
    lines.extend(items.iter().map(|i| format!("  - {}", i)));
    if let Some((extra_header, extra_items)) = extra {
        lines.push(format!("\n{}", extra_header));
        lines.extend(extra_items.iter().map(|i| format!("  - {}", i)));
    }
    lines
}
