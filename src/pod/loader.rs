//! Loads tool and pod configuration and assembles runnable crews.
//!
//! Loading is forgiving by design: a malformed pod file or a missing tools
//! file costs only that file, never the process. Assembly resolves agent
//! keys to roles and tool names to registry entries, warning about anything
//! it has to skip.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::agent::Agent;
use crate::crew::Crew;
use crate::llm::{CONNECT_TIMEOUT_ENV, LLM, REQUEST_TIMEOUT_ENV};
use crate::pod::config::PodConfig;
use crate::pod::error::PodError;
use crate::task::Task;
use crate::tools::registry::ToolDescriptor;
use crate::tools::ToolRegistry;

/// Top-level shape of the tools configuration file.
#[derive(Debug, Default, Deserialize)]
struct ToolsFile {
    #[serde(default)]
    tools: BTreeMap<String, ToolDescriptor>,
}

/// Loaded pods plus the shared tool registry.
#[derive(Debug)]
pub struct PodLoader {
    pub pods_dir: PathBuf,
    pub tools_config: PathBuf,
    /// Pods keyed by file stem.
    pub pods: BTreeMap<String, PodConfig>,
    pub registry: ToolRegistry,
}

impl PodLoader {
    /// Load the tools file and every pod file under `pods_dir`.
    pub fn new(pods_dir: impl Into<PathBuf>, tools_config: impl Into<PathBuf>) -> Self {
        let pods_dir = pods_dir.into();
        let tools_config = tools_config.into();
        let registry = load_tools(&tools_config);
        let pods = load_pods(&pods_dir);
        Self {
            pods_dir,
            tools_config,
            pods,
            registry,
        }
    }

    /// Pod lookup keys, sorted.
    pub fn pod_names(&self) -> Vec<String> {
        self.pods.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&PodConfig> {
        self.pods.get(name)
    }

    /// Assemble a runnable crew for the named pod.
    ///
    /// Tasks referencing unknown agents and workflow entries referencing
    /// unknown tasks are skipped with a warning, matching the per-entry
    /// isolation of tool registration.
    ///
    /// # Errors
    /// Returns [`PodError::UnknownPod`] for an unknown name and
    /// [`PodError::Empty`] when nothing usable remains after skipping.
    pub fn build_crew(&self, pod_key: &str) -> Result<Crew, PodError> {
        let pod = self
            .pods
            .get(pod_key)
            .ok_or_else(|| PodError::UnknownPod(pod_key.to_string()))?;

        export_timeout_defaults();

        let llm = Arc::new(build_llm(pod));
        log::info!("LLM: {}", pod.llm.model);

        let mut agents = Vec::new();
        let mut role_by_key: BTreeMap<&str, String> = BTreeMap::new();
        for (key, config) in &pod.agents {
            if config.allow_delegation {
                log::warn!("agent '{}': delegation is not supported, ignoring", key);
            }
            let mut agent = Agent::new(&config.role, &config.goal, &config.backstory);
            agent.llm = llm.clone();
            agent.tools = self.registry.resolve(&config.tools);
            agent.verbose = config.verbose;
            if let Some(max_iterations) = config.max_iterations {
                agent.max_iterations = max_iterations;
            }
            log::info!("Created agent: {} with {} tools", key, agent.tools.len());
            role_by_key.insert(key.as_str(), agent.role.clone());
            agents.push(agent);
        }
        if agents.is_empty() {
            return Err(PodError::Empty {
                name: pod_key.to_string(),
                what: "agents",
            });
        }

        let mut tasks = Vec::new();
        for task_name in pod.task_order() {
            let Some(config) = pod.tasks.get(&task_name) else {
                log::warn!("task '{}' not found in configuration", task_name);
                continue;
            };
            let Some(role) = role_by_key.get(config.agent.as_str()) else {
                log::warn!(
                    "agent '{}' not found for task '{}'",
                    config.agent,
                    task_name
                );
                continue;
            };
            let mut task = Task::new(&config.description, &config.expected_output);
            task.name = Some(task_name.clone());
            task.agent = Some(role.clone());
            log::info!("Created task: {} -> {}", task_name, config.agent);
            tasks.push(task);
        }
        if tasks.is_empty() {
            return Err(PodError::Empty {
                name: pod_key.to_string(),
                what: "tasks",
            });
        }

        let mut crew = Crew::new(agents, tasks);
        crew.name = Some(pod.display_name(pod_key).to_string());
        crew.set_verbose(pod.workflow.verbose);
        Ok(crew)
    }
}

/// Build the shared model client from the pod's LLM section.
fn build_llm(pod: &PodConfig) -> LLM {
    let mut llm = LLM::new(pod.llm.model.clone(), pod.llm.base_url.clone());
    llm.temperature = Some(pod.llm.temperature);
    llm.max_tokens = Some(pod.llm.max_tokens);
    llm.timeout = pod.llm.timeout;
    llm
}

/// Export request/connect timeout fallbacks unless the caller already set
/// them, so model clients constructed anywhere in the process agree.
fn export_timeout_defaults() {
    if std::env::var(REQUEST_TIMEOUT_ENV).is_err() {
        std::env::set_var(REQUEST_TIMEOUT_ENV, "600");
    }
    if std::env::var(CONNECT_TIMEOUT_ENV).is_err() {
        std::env::set_var(CONNECT_TIMEOUT_ENV, "30");
    }
}

/// Parse the tools file into a populated registry.
///
/// A missing or unreadable file logs a warning and yields an empty
/// registry; pods still load, their agents just bind no tools.
fn load_tools(path: &Path) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("tools configuration {} not read: {}", path.display(), e);
            return registry;
        }
    };
    let file: ToolsFile = match serde_yaml::from_str(&content) {
        Ok(file) => file,
        Err(e) => {
            log::warn!("tools configuration {} not parsed: {}", path.display(), e);
            return registry;
        }
    };
    registry.register_all(&file.tools);
    log::info!(
        "Loaded tools configuration from {} ({} entries)",
        path.display(),
        registry.len()
    );
    registry
}

/// Scan `pods_dir` for `*.yaml`/`*.yml` files, keyed by file stem.
///
/// Malformed files are skipped with a warning; the scan continues.
fn load_pods(pods_dir: &Path) -> BTreeMap<String, PodConfig> {
    let mut pods = BTreeMap::new();
    let entries = match std::fs::read_dir(pods_dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("pods directory {} not read: {}", pods_dir.display(), e);
            return pods;
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .collect();
    paths.sort();

    for path in paths {
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("error reading pod {}: {}", path.display(), e);
                continue;
            }
        };
        match serde_yaml::from_str::<PodConfig>(&content) {
            Ok(pod) => {
                log::info!("Loaded pod: {} ({})", stem, pod.display_name(&stem));
                pods.insert(stem, pod);
            }
            Err(e) => {
                log::warn!("error loading pod {}: {}", path.display(), e);
            }
        }
    }

    log::info!("Total pods loaded: {}", pods.len());
    pods
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_POD: &str = r#"
name: Demo Pod
agents:
  analyst:
    role: Analyst
    goal: Analyze things
    backstory: Numbers person.
    tools:
      - code_analysis
  writer:
    role: Writer
    goal: Write things
    backstory: Words person.
tasks:
  analyze:
    description: Analyze the input
    expected_output: Analysis notes
    agent: analyst
  write:
    description: Write it up
    expected_output: Prose
    agent: writer
workflow:
  tasks:
    - write
    - analyze
  verbose: false
"#;

    const TOOLS_YAML: &str = r#"
tools:
  code_analysis:
    locator: code_analysis
"#;

    fn write_file(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_malformed_pod_skipped_wellformed_loads() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "good.yaml", GOOD_POD);
        write_file(dir.path(), "bad.yaml", "agents: [not, a, map");
        write_file(dir.path(), "notes.txt", "ignored");

        let loader = PodLoader::new(dir.path(), dir.path().join("tools.yaml"));
        assert_eq!(loader.pod_names(), vec!["good"]);
        assert!(loader.get("good").is_some());
        assert!(loader.get("bad").is_none());
    }

    #[test]
    fn test_missing_tools_file_gives_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "good.yaml", GOOD_POD);

        let loader = PodLoader::new(dir.path(), dir.path().join("no_such_tools.yaml"));
        assert!(loader.registry.is_empty());
        assert_eq!(loader.pod_names(), vec!["good"]);
    }

    #[test]
    fn test_build_crew_honors_workflow_order_and_roles() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "demo.yaml", GOOD_POD);
        write_file(dir.path(), "tools.yaml", TOOLS_YAML);

        let loader = PodLoader::new(dir.path(), dir.path().join("tools.yaml"));
        let crew = loader.build_crew("demo").unwrap();

        assert_eq!(crew.name.as_deref(), Some("Demo Pod"));
        assert_eq!(crew.agents.len(), 2);
        assert_eq!(crew.tasks.len(), 2);
        // workflow order, not task-map order
        assert_eq!(crew.tasks[0].name.as_deref(), Some("write"));
        assert_eq!(crew.tasks[0].agent.as_deref(), Some("Writer"));
        assert_eq!(crew.tasks[1].name.as_deref(), Some("analyze"));
        assert_eq!(crew.tasks[1].agent.as_deref(), Some("Analyst"));

        let analyst = crew.agents.iter().find(|a| a.role == "Analyst").unwrap();
        assert_eq!(analyst.tools.len(), 1);
    }

    #[test]
    fn test_build_crew_skips_unknown_references() {
        let yaml = r#"
agents:
  solo:
    role: Solo
    goal: g
    backstory: b
tasks:
  real:
    description: d
    expected_output: e
    agent: solo
  orphan:
    description: d
    expected_output: e
    agent: nobody
workflow:
  tasks:
    - ghost
    - real
    - orphan
"#;
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "demo.yaml", yaml);

        let loader = PodLoader::new(dir.path(), dir.path().join("tools.yaml"));
        let crew = loader.build_crew("demo").unwrap();
        assert_eq!(crew.tasks.len(), 1);
        assert_eq!(crew.tasks[0].name.as_deref(), Some("real"));
    }

    #[test]
    fn test_build_crew_unknown_pod_errors() {
        let dir = tempfile::tempdir().unwrap();
        let loader = PodLoader::new(dir.path(), dir.path().join("tools.yaml"));
        assert!(matches!(
            loader.build_crew("nope"),
            Err(PodError::UnknownPod(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_build_crew_exports_timeout_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "demo.yaml", GOOD_POD);

        let loader = PodLoader::new(dir.path(), dir.path().join("tools.yaml"));
        loader.build_crew("demo").unwrap();
        assert!(std::env::var(REQUEST_TIMEOUT_ENV).is_ok());
        assert!(std::env::var(CONNECT_TIMEOUT_ENV).is_ok());
    }
}
