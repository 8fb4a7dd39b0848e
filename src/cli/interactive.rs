//! Menu-driven interactive mode.
//!
//! Reads commands from any `BufRead`, so tests drive the loop through a
//! cursor. Invalid menu input prints an error and re-prompts; EOF exits
//! the loop at any prompt.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use crate::cli::{print_pod_info, print_pod_list};
use crate::pod::{InputSpec, PodConfig};
use crate::runner::{PodRunner, RunOptions};
use crate::utilities::{Printer, PrinterColor};

/// Run the interactive loop on stdin.
pub fn run(runner: &PodRunner) {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    run_loop(runner, &mut input);
}

fn run_loop(runner: &PodRunner, input: &mut impl BufRead) {
    let printer = Printer::default();
    printer.print("Pod Commander - Interactive Mode", PrinterColor::BoldCyan);
    println!("{}", "=".repeat(50));

    loop {
        println!("\nCommands:");
        println!("  1. List available pods");
        println!("  2. Show pod information");
        println!("  3. Run a pod");
        println!("  4. Exit");

        let Some(choice) = read_prompted(input, "\nEnter your command (1-4): ") else {
            break;
        };

        match choice.trim() {
            "1" => print_pod_list(&runner.loader),
            "2" => {
                if let Some(pod_key) = select_pod(runner, input, &printer) {
                    print_pod_info(&runner.loader, &pod_key);
                }
            }
            "3" => {
                if let Some(pod_key) = select_pod(runner, input, &printer) {
                    let inputs = match runner.loader.get(&pod_key) {
                        Some(pod) => collect_pod_inputs(pod, input, &printer),
                        None => HashMap::new(),
                    };
                    runner.run(&pod_key, inputs, &RunOptions::default());
                }
            }
            "4" => {
                printer.print("Goodbye.", PrinterColor::Cyan);
                break;
            }
            _ => printer.print(
                "Invalid command. Please enter 1-4.",
                PrinterColor::Red,
            ),
        }
    }
}

/// Show the numbered pod list and read a selection. Any invalid entry
/// reports and returns to the main menu.
fn select_pod(runner: &PodRunner, input: &mut impl BufRead, printer: &Printer) -> Option<String> {
    let names = runner.loader.pod_names();
    if names.is_empty() {
        printer.print("No pods loaded.", PrinterColor::Yellow);
        return None;
    }

    println!("\nAvailable pods:");
    for (index, name) in names.iter().enumerate() {
        println!("  {}. {}", index + 1, name);
    }

    let line = read_prompted(input, &format!("Select pod (1-{}): ", names.len()))?;
    match line.trim().parse::<usize>() {
        Ok(n) if (1..=names.len()).contains(&n) => Some(names[n - 1].clone()),
        Ok(_) => {
            printer.print(
                &format!("Invalid choice. Please enter 1-{}.", names.len()),
                PrinterColor::Red,
            );
            None
        }
        Err(_) => {
            printer.print("Invalid input. Please enter a number.", PrinterColor::Red);
            None
        }
    }
}

/// Collect inputs for a run: declared required inputs re-prompt while
/// empty, optional inputs skip on blank, then free-form pairs until `done`.
fn collect_pod_inputs(
    pod: &PodConfig,
    input: &mut impl BufRead,
    printer: &Printer,
) -> HashMap<String, String> {
    let mut inputs = HashMap::new();

    if !pod.inputs.required.is_empty() {
        printer.print("\nRequired parameters:", PrinterColor::BoldWhite);
        for spec in &pod.inputs.required {
            loop {
                let Some(line) = read_prompted(input, &input_prompt(spec, false)) else {
                    log::warn!("required input '{}' not provided", spec.name);
                    return inputs;
                };
                let value = line.trim();
                if value.is_empty() {
                    printer.print(
                        &format!("'{}' is required.", spec.name),
                        PrinterColor::Yellow,
                    );
                    continue;
                }
                inputs.insert(spec.name.clone(), value.to_string());
                break;
            }
        }
    }

    if !pod.inputs.optional.is_empty() {
        printer.print(
            "\nOptional parameters (press Enter to skip):",
            PrinterColor::BoldWhite,
        );
        for spec in &pod.inputs.optional {
            let Some(line) = read_prompted(input, &input_prompt(spec, true)) else {
                return inputs;
            };
            let value = line.trim();
            if !value.is_empty() {
                inputs.insert(spec.name.clone(), value.to_string());
            }
        }
    }

    printer.print(
        "\nAdditional parameters (type 'done' to finish):",
        PrinterColor::BoldWhite,
    );
    loop {
        let Some(key) = read_prompted(input, "Parameter name (or 'done'): ") else {
            break;
        };
        let key = key.trim().to_string();
        if key.eq_ignore_ascii_case("done") {
            break;
        }
        if key.is_empty() {
            continue;
        }
        let Some(value) = read_prompted(input, &format!("Value for '{}': ", key)) else {
            break;
        };
        let value = value.trim();
        if !value.is_empty() {
            inputs.insert(key, value.to_string());
        }
    }

    inputs
}

fn input_prompt(spec: &InputSpec, optional: bool) -> String {
    let description = if spec.description.is_empty() {
        format!("{} parameter", spec.name)
    } else {
        spec.description.clone()
    };
    let mut prompt = format!("Enter {} ({}", spec.name, description);
    if optional {
        prompt.push_str(", optional");
    }
    prompt.push(')');
    if let Some(example) = &spec.example {
        prompt.push_str(&format!("\n  Example: {}", example));
    }
    prompt.push_str(": ");
    prompt
}

fn read_prompted(input: &mut impl BufRead, prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();

    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(e) => {
            log::warn!("reading input failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use super::*;

    fn empty_runner() -> (tempfile::TempDir, PodRunner) {
        let dir = tempfile::tempdir().unwrap();
        let runner = PodRunner::new(dir.path(), dir.path().join("tools.yaml"));
        (dir, runner)
    }

    fn pod_from_yaml(yaml: &str) -> PodConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_invalid_menu_input_reprompts_until_exit() {
        let (_dir, runner) = empty_runner();
        // the loop must survive the junk lines and still consume the "4"
        let mut input = Cursor::new("abc\n99\n\n4\n");
        run_loop(&runner, &mut input);
        let mut rest = String::new();
        input.read_to_string(&mut rest).unwrap();
        assert!(rest.is_empty(), "loop exited before consuming: {:?}", rest);
    }

    #[test]
    fn test_menu_exits_on_eof() {
        let (_dir, runner) = empty_runner();
        let mut input = Cursor::new("abc\n");
        run_loop(&runner, &mut input);
    }

    #[test]
    fn test_select_pod_accepts_valid_number() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["alpha.yaml", "beta.yaml"] {
            std::fs::write(
                dir.path().join(name),
                "agents: {}\ntasks: {}\n",
            )
            .unwrap();
        }
        let runner = PodRunner::new(dir.path(), dir.path().join("tools.yaml"));
        let printer = Printer::default();

        let mut input = Cursor::new("2\n");
        assert_eq!(
            select_pod(&runner, &mut input, &printer).as_deref(),
            Some("beta")
        );

        let mut bad = Cursor::new("x\n");
        assert_eq!(select_pod(&runner, &mut bad, &printer), None);

        let mut out_of_range = Cursor::new("9\n");
        assert_eq!(select_pod(&runner, &mut out_of_range, &printer), None);
    }

    #[test]
    fn test_required_input_reprompts_while_empty() {
        let pod = pod_from_yaml(
            r#"
inputs:
  required:
    - name: topic
      description: Subject to research
  optional:
    - name: audience
"#,
        );
        let printer = Printer::default();
        // two blank answers, then a value; optional skipped; extras done
        let mut input = Cursor::new("\n\nrust async\n\ndone\n");
        let inputs = collect_pod_inputs(&pod, &mut input, &printer);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs["topic"], "rust async");
    }

    #[test]
    fn test_free_form_pairs_until_done() {
        let pod = pod_from_yaml("{}");
        let printer = Printer::default();
        let mut input = Cursor::new("industry\nSoftware\nregion\nEU\ndone\n");
        let inputs = collect_pod_inputs(&pod, &mut input, &printer);
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs["industry"], "Software");
        assert_eq!(inputs["region"], "EU");
    }

    #[test]
    fn test_eof_during_required_returns_collected() {
        let pod = pod_from_yaml(
            r#"
inputs:
  required:
    - name: topic
"#,
        );
        let printer = Printer::default();
        let mut input = Cursor::new("");
        let inputs = collect_pod_inputs(&pod, &mut input, &printer);
        assert!(inputs.is_empty());
    }
}
