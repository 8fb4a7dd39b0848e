//! Tool registry: declarative descriptors to live tool instances.
//!
//! Descriptors come from `tools.yaml`. Each one names a locator that selects
//! a constructor from a table compiled into the binary, plus construction
//! parameters; a string parameter value ending in `_env` refers to an
//! environment variable instead of a literal. Every failure during
//! registration (unknown locator, unset variable, bad parameter) is isolated
//! to that entry: the name maps to [`ToolEntry::Unavailable`] with a reason,
//! and the other descriptors register normally. Consumers resolve names
//! through [`ToolRegistry::resolve`], which silently skips the gaps.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::tools::base_tool::{shared, SharedTool};
use crate::tools::builtin::{
    ChartRecommendationTool, CodeAnalysisTool, DataAnalysisTool, LimitedSearchTool, SerperClient,
};
use crate::tools::builtin::limited_search::{
    DEFAULT_MAX_LENGTH, DEFAULT_MAX_RESULTS, DEFAULT_MAX_SEARCHES,
};

/// Suffix marking a string parameter value as an environment-variable
/// reference: `serper_api_key_env` reads `SERPER_API_KEY`.
pub const ENV_SUFFIX: &str = "_env";

// ---------------------------------------------------------------------------
// Descriptor and entry types
// ---------------------------------------------------------------------------

/// Declarative tool record parsed from `tools.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolDescriptor {
    /// Key into the constructor table. Defaults to the descriptor's name.
    #[serde(default)]
    pub locator: Option<String>,
    /// Construction parameters; `_env`-suffixed string values are
    /// environment references.
    #[serde(default, alias = "config", alias = "parameters")]
    pub params: BTreeMap<String, Value>,
}

/// Per-name registration outcome. A registered name is always one of these,
/// never a partially-constructed tool.
#[derive(Debug)]
pub enum ToolEntry {
    Available(SharedTool),
    Unavailable { reason: String },
}

impl ToolEntry {
    pub fn is_available(&self) -> bool {
        matches!(self, ToolEntry::Available(_))
    }
}

/// Constructor from resolved parameters, one per builtin tool.
pub type ToolBuilder = fn(&BTreeMap<String, Value>) -> Result<SharedTool, String>;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Process-lifetime mapping from tool name to constructed instance or
/// unavailability marker.
#[derive(Debug)]
pub struct ToolRegistry {
    entries: HashMap<String, ToolEntry>,
    builders: HashMap<&'static str, ToolBuilder>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a registry with the builtin constructor table.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            builders: builtin_builders(),
        }
    }

    /// Create a registry with an explicit constructor table.
    pub fn with_builders(builders: HashMap<&'static str, ToolBuilder>) -> Self {
        Self {
            entries: HashMap::new(),
            builders,
        }
    }

    /// Register one descriptor. Failures mark the name unavailable and never
    /// propagate; a later descriptor under the same name replaces the entry.
    pub fn register(&mut self, name: &str, descriptor: &ToolDescriptor) {
        let entry = self.build_entry(name, descriptor);
        match &entry {
            ToolEntry::Available(_) => log::info!("Registered tool: {}", name),
            ToolEntry::Unavailable { reason } => {
                log::warn!("Tool '{}' unavailable: {}", name, reason)
            }
        }
        self.entries.insert(name.to_string(), entry);
    }

    /// Register every descriptor in the map, isolating failures per entry.
    pub fn register_all(&mut self, descriptors: &BTreeMap<String, ToolDescriptor>) {
        for (name, descriptor) in descriptors {
            self.register(name, descriptor);
        }
    }

    fn build_entry(&self, name: &str, descriptor: &ToolDescriptor) -> ToolEntry {
        let locator = descriptor.locator.as_deref().unwrap_or(name);
        let builder = match self.builders.get(locator) {
            Some(builder) => builder,
            None => {
                return ToolEntry::Unavailable {
                    reason: format!("no constructor for locator '{}'", locator),
                }
            }
        };

        let params = match resolve_env_params(&descriptor.params) {
            Ok(params) => params,
            Err(reason) => return ToolEntry::Unavailable { reason },
        };

        match builder(&params) {
            Ok(tool) => ToolEntry::Available(tool),
            Err(reason) => ToolEntry::Unavailable { reason },
        }
    }

    /// Ordered instances for the requested names, silently omitting names
    /// that are unavailable or unknown. A consumer asking for five tools and
    /// getting three proceeds with three.
    pub fn resolve(&self, names: &[String]) -> Vec<SharedTool> {
        let mut resolved = Vec::new();
        for name in names {
            match self.entries.get(name) {
                Some(ToolEntry::Available(tool)) => resolved.push(Arc::clone(tool)),
                Some(ToolEntry::Unavailable { reason }) => {
                    log::warn!("Skipping unavailable tool '{}': {}", name, reason);
                }
                None => {
                    log::warn!("Skipping unknown tool '{}'", name);
                }
            }
        }
        resolved
    }

    /// Registration outcome for one name.
    pub fn entry(&self, name: &str) -> Option<&ToolEntry> {
        self.entries.get(name)
    }

    pub fn is_available(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(ToolEntry::Available(_)))
    }

    /// Sorted names of every registered entry, available or not.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Environment-reference resolution
// ---------------------------------------------------------------------------

/// Resolve `_env`-suffixed string values against the process environment.
///
/// An unset variable fails the whole parameter set; the caller marks the
/// descriptor unavailable rather than constructing with missing parameters.
fn resolve_env_params(
    params: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Value>, String> {
    let mut resolved = BTreeMap::new();
    for (key, value) in params {
        let env_name = value
            .as_str()
            .and_then(|s| s.strip_suffix(ENV_SUFFIX))
            .filter(|stripped| !stripped.is_empty())
            .map(|stripped| stripped.to_uppercase());
        match env_name {
            Some(var_name) => match std::env::var(&var_name) {
                Ok(env_value) => {
                    resolved.insert(key.clone(), Value::String(env_value));
                }
                Err(_) => {
                    return Err(format!(
                        "environment variable {} not set (parameter '{}')",
                        var_name, key
                    ));
                }
            },
            None => {
                resolved.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(resolved)
}

// ---------------------------------------------------------------------------
// Builtin constructor table
// ---------------------------------------------------------------------------

/// The locator table compiled into the binary. Configuration selects
/// behavior by naming one of these keys.
fn builtin_builders() -> HashMap<&'static str, ToolBuilder> {
    let mut builders: HashMap<&'static str, ToolBuilder> = HashMap::new();
    builders.insert("limited_search", build_limited_search);
    builders.insert("code_analysis", build_code_analysis);
    builders.insert("data_analysis", build_data_analysis);
    builders.insert("chart_recommendation", build_chart_recommendation);
    builders
}

fn build_limited_search(params: &BTreeMap<String, Value>) -> Result<SharedTool, String> {
    let max_results = param_u32(params, "max_results", DEFAULT_MAX_RESULTS)?;
    let max_length = param_usize(params, "max_length", DEFAULT_MAX_LENGTH)?;
    let max_searches = param_u32(params, "max_searches", DEFAULT_MAX_SEARCHES)?;

    let backend = match params.get("api_key") {
        Some(Value::String(key)) => SerperClient::new(key.clone()),
        Some(other) => return Err(format!("parameter 'api_key' must be a string, got {}", other)),
        None => SerperClient::from_env(),
    };

    Ok(shared(LimitedSearchTool::with_backend(
        max_results,
        max_length,
        max_searches,
        Arc::new(backend),
    )))
}

fn build_code_analysis(params: &BTreeMap<String, Value>) -> Result<SharedTool, String> {
    reject_params(params, "code_analysis")?;
    Ok(shared(CodeAnalysisTool::new()))
}

fn build_data_analysis(params: &BTreeMap<String, Value>) -> Result<SharedTool, String> {
    reject_params(params, "data_analysis")?;
    Ok(shared(DataAnalysisTool::new()))
}

fn build_chart_recommendation(params: &BTreeMap<String, Value>) -> Result<SharedTool, String> {
    reject_params(params, "chart_recommendation")?;
    Ok(shared(ChartRecommendationTool::new()))
}

fn param_u32(params: &BTreeMap<String, Value>, key: &str, default: u32) -> Result<u32, String> {
    match params.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| format!("parameter '{}' must be a non-negative integer", key)),
    }
}

fn param_usize(
    params: &BTreeMap<String, Value>,
    key: &str,
    default: usize,
) -> Result<usize, String> {
    match params.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| format!("parameter '{}' must be a non-negative integer", key)),
    }
}

fn reject_params(params: &BTreeMap<String, Value>, locator: &str) -> Result<(), String> {
    match params.keys().next() {
        None => Ok(()),
        Some(key) => Err(format!(
            "tool '{}' takes no parameters, got '{}'",
            locator, key
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::base_tool::lock_tool;

    fn descriptor(locator: &str, params: &[(&str, Value)]) -> ToolDescriptor {
        ToolDescriptor {
            locator: Some(locator.to_string()),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_register_and_resolve_builtin() {
        let mut registry = ToolRegistry::new();
        registry.register("code_analysis", &descriptor("code_analysis", &[]));

        assert!(registry.is_available("code_analysis"));
        let resolved = registry.resolve(&["code_analysis".to_string()]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(lock_tool(&resolved[0]).name(), "code_analysis");
    }

    #[test]
    fn test_unknown_locator_marks_unavailable() {
        let mut registry = ToolRegistry::new();
        registry.register("mystery", &descriptor("does.not.Exist", &[]));

        assert!(!registry.is_available("mystery"));
        match registry.entry("mystery") {
            Some(ToolEntry::Unavailable { reason }) => {
                assert!(reason.contains("does.not.Exist"));
            }
            other => panic!("expected unavailable entry, got {:?}", other),
        }
    }

    #[test]
    fn test_unset_env_reference_marks_only_that_entry() {
        let mut registry = ToolRegistry::new();
        registry.register(
            "search",
            &descriptor(
                "limited_search",
                &[("api_key", Value::String("orcapod_test_missing_key_env".to_string()))],
            ),
        );
        registry.register("analysis", &descriptor("data_analysis", &[]));

        // The unresolved reference poisons only its own descriptor.
        assert!(!registry.is_available("search"));
        assert!(registry.is_available("analysis"));
        match registry.entry("search") {
            Some(ToolEntry::Unavailable { reason }) => {
                assert!(reason.contains("ORCAPOD_TEST_MISSING_KEY"));
            }
            other => panic!("expected unavailable entry, got {:?}", other),
        }
    }

    #[test]
    fn test_set_env_reference_binds_parameter() {
        std::env::set_var("ORCAPOD_TEST_PRESENT_KEY", "secret");
        let mut registry = ToolRegistry::new();
        registry.register(
            "search",
            &descriptor(
                "limited_search",
                &[
                    ("api_key", Value::String("orcapod_test_present_key_env".to_string())),
                    ("max_searches", Value::from(2u32)),
                ],
            ),
        );
        assert!(registry.is_available("search"));
        std::env::remove_var("ORCAPOD_TEST_PRESENT_KEY");
    }

    #[test]
    fn test_bad_parameter_type_marks_unavailable() {
        let mut registry = ToolRegistry::new();
        registry.register(
            "search",
            &descriptor(
                "limited_search",
                &[("max_searches", Value::String("two".to_string()))],
            ),
        );
        assert!(!registry.is_available("search"));
    }

    #[test]
    fn test_resolve_skips_unavailable_preserving_order() {
        let mut registry = ToolRegistry::new();
        registry.register("a", &descriptor("code_analysis", &[]));
        registry.register("b", &descriptor("no.such.locator", &[]));
        registry.register("c", &descriptor("data_analysis", &[]));

        let resolved = registry.resolve(&[
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
        ]);
        assert_eq!(resolved.len(), 2);
        assert_eq!(lock_tool(&resolved[0]).name(), "code_analysis");
        assert_eq!(lock_tool(&resolved[1]).name(), "data_analysis");
    }

    #[test]
    fn test_resolve_skips_unknown_names() {
        let registry = ToolRegistry::new();
        let resolved = registry.resolve(&["never_registered".to_string()]);
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_locator_defaults_to_name() {
        let mut registry = ToolRegistry::new();
        registry.register("chart_recommendation", &ToolDescriptor::default());
        assert!(registry.is_available("chart_recommendation"));
    }

    #[test]
    fn test_descriptor_accepts_original_config_alias() {
        let yaml = r#"
locator: limited_search
config:
  max_searches: 4
"#;
        let descriptor: ToolDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(descriptor.params.get("max_searches"), Some(&Value::from(4)));
    }
}
