//! Subcommand handlers.

use crate::{Cli, Commands, ConfigAction};
use anyhow::Context;
use ragops_core::config::{RagOpsConfig, load_config};
use ragops_core::eval::providers::{create_generator, create_judge};
use ragops_core::eval::{EvaluationRunner, load_golden_dataset};
use ragops_core::{EvalError, GateError, ReportError, baseline, compare_reports};
use std::path::{Path, PathBuf};

/// Run a subcommand and return its process exit code.
pub(crate) async fn handle_command(cli: Cli) -> anyhow::Result<u8> {
    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let mut config = load_config(Some(&workspace), cli.config.as_deref())?;

    match cli.command {
        Commands::Compare {
            baseline,
            current,
            tolerance,
            floors,
            json,
        } => {
            if let Some(tolerance) = tolerance {
                config.gate.tolerance = tolerance;
            }
            config.apply_floor_overrides(&floors)?;
            let baseline = baseline.unwrap_or_else(|| config.gate.baseline_path.clone());
            let current = current.unwrap_or_else(|| config.gate.current_path.clone());
            handle_compare(&config, &baseline, &current, json)
        }
        Commands::Promote { current, baseline } => {
            let current = current.unwrap_or_else(|| config.gate.current_path.clone());
            let baseline = baseline.unwrap_or_else(|| config.gate.baseline_path.clone());
            handle_promote(&config, &current, &baseline)
        }
        Commands::Evaluate {
            dataset,
            output,
            judge_model,
            generator_url,
            answers,
        } => {
            if let Some(dataset) = dataset {
                config.evaluation.dataset_path = dataset;
            }
            if let Some(output) = output {
                config.evaluation.output_path = output;
            }
            if let Some(model) = judge_model {
                config.evaluation.judge_model = model;
            }
            if generator_url.is_some() || answers.is_some() {
                config.generator.url = generator_url;
                config.generator.answers_path = answers;
            }
            handle_evaluate(&config).await
        }
        Commands::Config {
            action: ConfigAction::Show,
        } => {
            let rendered = toml::to_string_pretty(&config).context("rendering configuration")?;
            println!("{rendered}");
            Ok(0)
        }
    }
}

fn handle_compare(
    config: &RagOpsConfig,
    baseline: &Path,
    current: &Path,
    json: bool,
) -> anyhow::Result<u8> {
    let gate = config.regression_gate()?;
    let outcome = compare_reports(&gate, baseline, current)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("Comparing evaluation metrics");
        println!("  baseline: {}", baseline.display());
        println!("  current:  {}\n", current.display());
        print!("{}", outcome.render());
    }
    Ok(exit_code(outcome.exit_code()))
}

fn handle_promote(config: &RagOpsConfig, current: &Path, baseline: &Path) -> anyhow::Result<u8> {
    let tracked = config.tracked_metrics()?;
    let report = baseline::promote(current, baseline, &tracked)?;
    println!(
        "✅ Promoted {} ({} metrics) to baseline {}",
        current.display(),
        report.len(),
        baseline.display()
    );
    Ok(0)
}

async fn handle_evaluate(config: &RagOpsConfig) -> anyhow::Result<u8> {
    let examples = load_golden_dataset(&config.evaluation.dataset_path)?;
    let generator = create_generator(config)?;
    let judge = create_judge(config)?;

    println!(
        "Evaluating {} test cases with judge {}",
        examples.len(),
        config.evaluation.judge_model
    );
    let runner = EvaluationRunner::new(generator, judge)
        .with_targets(config.targets()?)
        .with_min_pass_rate(config.evaluation.min_pass_rate);
    let outcome = runner.run(&examples).await?;

    outcome.save(&config.evaluation.output_path)?;
    print!("{}", outcome.render());
    println!(
        "Report saved to {}",
        config.evaluation.output_path.display()
    );
    Ok(exit_code(outcome.exit_code()))
}

fn exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

/// Heading printed for a failed command, so a broken config reads differently
/// from an unreachable judge or an unwritable report.
pub(crate) fn failure_heading(err: &anyhow::Error) -> &'static str {
    if let Some(gate_err) = err.downcast_ref::<GateError>() {
        return match gate_err {
            GateError::Evaluation(_) => "Evaluation error",
            GateError::Report(ReportError::Write { .. }) => "Write error",
            _ => "Configuration error",
        };
    }
    if err.downcast_ref::<EvalError>().is_some() {
        return "Evaluation error";
    }
    if let Some(ReportError::Write { .. }) = err.downcast_ref::<ReportError>() {
        return "Write error";
    }
    "Configuration error"
}
