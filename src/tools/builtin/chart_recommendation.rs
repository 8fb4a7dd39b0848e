//! Chart and visualization recommendations.
//!
//! Keyword-matches the described data type and analysis goal against a fixed
//! table of chart suggestions, capped at six, with general tips appended.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::base_tool::{BaseTool, ToolResult};

const MAX_CHART_SUGGESTIONS: usize = 6;

/// Visualization recommendation tool.
#[derive(Debug, Default)]
pub struct ChartRecommendationTool {
    usage_count: u32,
}

impl ChartRecommendationTool {
    pub fn new() -> Self {
        Self::default()
    }

    fn report(&self, data_type: &str, analysis_goal: &str) -> String {
        let mut lines = vec![
            "Chart Recommendations".to_string(),
            format!("Data Type: {}", data_type),
            format!("Analysis Goal: {}", analysis_goal),
            "=".repeat(50),
        ];

        let charts = chart_suggestions(data_type, analysis_goal);
        if !charts.is_empty() {
            lines.push("\nRecommended Chart Types:".to_string());
            lines.extend(charts.iter().map(|c| format!("  - {}", c)));
        }

        lines.push("\nVisualization Tips:".to_string());
        for tip in VISUALIZATION_TIPS {
            lines.push(format!("  - {}", tip));
        }

        lines.push("\nRecommended Tools:".to_string());
        for tool in TOOL_SUGGESTIONS {
            lines.push(format!("  - {}", tool));
        }

        lines.join("\n")
    }
}

#[async_trait]
impl BaseTool for ChartRecommendationTool {
    fn name(&self) -> &str {
        "chart_recommendation"
    }

    fn description(&self) -> &str {
        "Suggests chart types and visualization practices for a data type and analysis goal."
    }

    fn args_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "data_type": { "type": "string", "description": "e.g. time series, categorical, numerical" },
                "analysis_goal": { "type": "string", "description": "e.g. comparison, correlation, distribution" }
            },
            "required": ["data_type", "analysis_goal"]
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
        let data_type = match args.get("data_type").and_then(|v| v.as_str()) {
            Some(d) if !d.trim().is_empty() => d.to_string(),
            _ => {
                return Ok(Value::String(
                    "No data type given. Pass 'data_type' and 'analysis_goal' arguments."
                        .to_string(),
                ))
            }
        };
        let analysis_goal = args
            .get("analysis_goal")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        self.increment_usage_count();
        Ok(Value::String(self.report(&data_type, &analysis_goal)))
    }
}

fn chart_suggestions(data_type: &str, analysis_goal: &str) -> Vec<&'static str> {
    let data_type = data_type.to_lowercase();
    let analysis_goal = analysis_goal.to_lowercase();
    let mut charts = Vec::new();

    if data_type.contains("time") || data_type.contains("temporal") {
        charts.extend([
            "Line Chart - Show trends over time",
            "Area Chart - Show cumulative changes",
            "Candlestick Chart - For financial data",
        ]);
    }
    if data_type.contains("categor") {
        charts.extend([
            "Bar Chart - Compare categories",
            "Pie Chart - Show proportions (max 5-7 categories)",
            "Donut Chart - Alternative to pie chart",
        ]);
    }
    if data_type.contains("numerical") || data_type.contains("continuous") {
        charts.extend([
            "Histogram - Show distribution",
            "Box Plot - Show quartiles and outliers",
            "Scatter Plot - Show relationships",
        ]);
    }
    if analysis_goal.contains("comparison") {
        charts.extend([
            "Bar Chart - Direct comparison",
            "Radar Chart - Multi-dimensional comparison",
            "Parallel Coordinates - Complex comparisons",
        ]);
    }
    if analysis_goal.contains("correlation") || analysis_goal.contains("relationship") {
        charts.extend([
            "Scatter Plot - Show correlation",
            "Correlation Matrix Heatmap - Multiple relationships",
            "Bubble Chart - Three-dimensional relationships",
        ]);
    }
    if analysis_goal.contains("distribution") {
        charts.extend([
            "Histogram - Frequency distribution",
            "Violin Plot - Distribution shape",
            "Q-Q Plot - Compare with theoretical distribution",
        ]);
    }

    charts.truncate(MAX_CHART_SUGGESTIONS);
    charts
}

const VISUALIZATION_TIPS: &[&str] = &[
    "Use color meaningfully and consistently",
    "Keep titles and labels clear and descriptive",
    "Choose appropriate scales and ranges",
    "Avoid chart junk and unnecessary decorations",
    "Consider your audience when choosing complexity",
    "Use consistent styling across related charts",
    "Ensure accessibility with color-blind friendly palettes",
];

const TOOL_SUGGESTIONS: &[&str] = &[
    "Rust: plotters, charming",
    "Python: matplotlib, seaborn, plotly, altair",
    "R: ggplot2, plotly, lattice",
    "JavaScript: D3.js, Chart.js, Highcharts",
    "Online: Tableau Public, Google Charts",
];
