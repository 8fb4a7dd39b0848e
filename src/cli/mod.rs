//! Command-line surface for pod management.
//!
//! Four subcommands: `list` the loaded pods, `info` on one pod, `run` a pod
//! with inputs from flags, and `interactive` for the menu-driven mode. A
//! failed run is reported and still exits 0; only an error escaping `main`
//! changes the exit code.

pub mod interactive;

use std::collections::HashMap;

use clap::{CommandFactory, Parser, Subcommand};

use crate::pod::{InputSpec, PodLoader};
use crate::runner::{PodRunner, RunOptions};
use crate::utilities::{Printer, PrinterColor};

const CLI_EXAMPLES: &str = "Examples:\n\
  orcapod list\n\
  orcapod info content_creation\n\
  orcapod run content_creation --topic \"AI in Healthcare\"\n\
  orcapod run code_development --project \"E-commerce API\"\n\
  orcapod run research_analysis --topic \"Market trends\" --input industry Software\n\
  orcapod interactive";

#[derive(Debug, Parser)]
#[command(name = "orcapod")]
#[command(about = "Run YAML-configured pods of AI agents")]
#[command(after_long_help = CLI_EXAMPLES)]
pub struct Cli {
    /// Directory containing pod YAML files.
    #[arg(long, global = true, env = "ORCAPOD_PODS_DIR", default_value = "pods")]
    pub pods_dir: String,

    /// Tools configuration file.
    #[arg(long, global = true, env = "ORCAPOD_TOOLS_CONFIG", default_value = "tools.yaml")]
    pub tools_config: String,

    /// Raise log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "List all available pods")]
    List,
    #[command(about = "Show detailed information about a pod")]
    Info { pod_name: String },
    #[command(about = "Run a pod with the given inputs")]
    Run {
        pod_name: String,
        /// Topic input shorthand for content and research pods.
        #[arg(long)]
        topic: Option<String>,
        /// Project input shorthand for development pods.
        #[arg(long)]
        project: Option<String>,
        /// Additional input pair; repeatable.
        #[arg(long = "input", num_args = 2, value_names = ["KEY", "VALUE"], action = clap::ArgAction::Append)]
        input: Vec<String>,
        /// Skip writing the output artifact.
        #[arg(long)]
        no_save: bool,
    },
    #[command(about = "Menu-driven interactive mode")]
    Interactive,
}

/// Dispatch a parsed command line.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let runner = PodRunner::new(&cli.pods_dir, &cli.tools_config);

    match command {
        Commands::List => print_pod_list(&runner.loader),
        Commands::Info { pod_name } => print_pod_info(&runner.loader, &pod_name),
        Commands::Run {
            pod_name,
            topic,
            project,
            input,
            no_save,
        } => {
            let inputs = collect_inputs(topic, project, &input);
            let options = RunOptions {
                save_output: !no_save,
            };
            let outcome = runner.run(&pod_name, inputs, &options);
            if let Some(report) = outcome.report() {
                println!("\nResults:");
                println!("{}", "=".repeat(70));
                println!("{}", report.raw);
            }
        }
        Commands::Interactive => interactive::run(&runner),
    }

    Ok(())
}

/// Merge the `--topic`/`--project` shorthands with repeated `--input` pairs.
/// Explicit pairs win over the shorthands.
pub fn collect_inputs(
    topic: Option<String>,
    project: Option<String>,
    pairs: &[String],
) -> HashMap<String, String> {
    let mut inputs = HashMap::new();
    if let Some(topic) = topic {
        inputs.insert("topic".to_string(), topic);
    }
    if let Some(project) = project {
        inputs.insert("project".to_string(), project);
    }
    for pair in pairs.chunks(2) {
        if let [key, value] = pair {
            inputs.insert(key.clone(), value.clone());
        }
    }
    inputs
}

/// One line per pod: key, display name, agent and task counts.
pub fn print_pod_list(loader: &PodLoader) {
    let printer = Printer::default();
    if loader.pods.is_empty() {
        printer.print("No pods available.", PrinterColor::Yellow);
        return;
    }
    printer.print("Available pods:", PrinterColor::BoldCyan);
    for (key, pod) in &loader.pods {
        println!(
            "  {:<24} {:<32} {} agents, {} tasks",
            key,
            pod.display_name(key),
            pod.agents.len(),
            pod.tasks.len()
        );
    }
}

/// Full description of one pod: agents, tasks, tools, declared inputs.
pub fn print_pod_info(loader: &PodLoader, pod_key: &str) {
    let printer = Printer::default();
    let Some(pod) = loader.get(pod_key) else {
        printer.print(&format!("Pod '{}' not found.", pod_key), PrinterColor::Red);
        return;
    };

    printer.print(
        &format!("Pod: {}", pod.display_name(pod_key)),
        PrinterColor::BoldCyan,
    );
    println!("{}", "=".repeat(60));
    if let Some(description) = &pod.description {
        println!("{}", description);
    }

    println!("\nAgents ({}):", pod.agents.len());
    for (key, agent) in &pod.agents {
        println!("  - {}: {}", key, agent.role);
    }

    println!("\nTasks ({}):", pod.tasks.len());
    for name in pod.task_order() {
        println!("  - {}", name);
    }

    if !pod.tools.enabled.is_empty() {
        println!("\nEnabled tools ({}):", pod.tools.enabled.len());
        for tool in &pod.tools.enabled {
            println!("  - {}", tool);
        }
    }
    if !pod.tools.disabled.is_empty() {
        println!("\nDisabled tools ({}):", pod.tools.disabled.len());
        for tool in &pod.tools.disabled {
            println!("  - {}", tool);
        }
    }

    if !pod.inputs.required.is_empty() {
        println!("\nRequired inputs:");
        for spec in &pod.inputs.required {
            println!("  - {}", describe_input(spec));
        }
    }
    if !pod.inputs.optional.is_empty() {
        println!("\nOptional inputs:");
        for spec in &pod.inputs.optional {
            println!("  - {}", describe_input(spec));
        }
    }
}

fn describe_input(spec: &InputSpec) -> String {
    let mut line = spec.name.clone();
    if !spec.description.is_empty() {
        line.push_str(": ");
        line.push_str(&spec.description);
    }
    if let Some(example) = &spec.example {
        line.push_str(&format!(" (e.g. {})", example));
    }
    line
}
