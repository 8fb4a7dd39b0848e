//! Builtin tools available to pods.

pub mod chart_recommendation;
pub mod code_analysis;
pub mod data_analysis;
pub mod limited_search;

pub use chart_recommendation::ChartRecommendationTool;
pub use code_analysis::CodeAnalysisTool;
pub use data_analysis::DataAnalysisTool;
pub use limited_search::{LimitedSearchTool, SearchBackend, SerperClient};
