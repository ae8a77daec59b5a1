//! Command execution for the `optimus` binary.

use std::time::Duration;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::info;

use crate::cli::args::{PrepareReviewArgs, RunArgs, ValidateConfigArgs};
use crate::cli::config_layer::load_run_config;
use crate::cli::output::{display_config_summary, display_depths};
use optimus_rs::core::config::OptimusConfig;
use optimus_rs::{OptimusEngine, ReviewTable, RunOptions};

/// Cluster and label a CSV of descriptions.
pub fn run_command(args: RunArgs) -> anyhow::Result<()> {
    let config = load_run_config(&args)?;
    let Some(data) = config.data.clone() else {
        bail!("No input data: pass --data or set `data` in the config file");
    };
    let out = config.out.clone();
    let knn_out = config.knn_out.clone();
    let min_cluster = config.min_cluster;

    let mut engine = OptimusEngine::new(config)?;
    let options = RunOptions {
        run_knn: args.knn,
        keep_model: false,
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.blue} {msg}")?);
    pb.set_message(format!("Clustering {}...", data.display()));
    pb.enable_steady_tick(Duration::from_millis(100));
    let result = engine.run_csv(&data, options);
    pb.finish_and_clear();
    let output = result.with_context(|| format!("Run over {} failed", data.display()))?;

    display_depths(&output.depths);

    output.write_table(&out)?;
    println!(
        "{} {}",
        "✅ Results saved to:".bright_green().bold(),
        out.display().to_string().cyan()
    );

    if args.knn {
        output.write_knn(&knn_out)?;
        println!(
            "{} {} ({} rows)",
            "✅ Nearest-neighbour predictions saved to:".bright_green().bold(),
            knn_out.display().to_string().cyan(),
            output.knn.len()
        );
    }

    if let Some(review_path) = &args.review {
        let mut review = ReviewTable::from_tiered(&output.table)?;
        let kept = review.prepare(min_cluster);
        review.write_csv(review_path)?;
        println!(
            "{} {} ({} clusters to review)",
            "✅ Review table saved to:".bright_green().bold(),
            review_path.display().to_string().cyan(),
            kept.len()
        );
    }

    info!("Run finished with {} iterations", output.depths.len());
    Ok(())
}

/// Print default configuration in YAML format.
pub fn print_default_config() -> anyhow::Result<()> {
    println!("{}", "# Default optimus configuration".dimmed());
    println!("{}", "# Save this to a file and customize as needed".dimmed());
    println!("{}", "# Usage: optimus run --config your-config.yml".dimmed());
    println!();

    let yaml_output = serde_yaml::to_string(&OptimusConfig::default())?;
    println!("{}", yaml_output);
    Ok(())
}

/// Validate a configuration file.
pub fn validate_config(args: ValidateConfigArgs) -> anyhow::Result<()> {
    println!(
        "{} {}",
        "🔍 Validating configuration:".bright_blue().bold(),
        args.config.display().to_string().cyan()
    );
    println!();

    let config = match OptimusConfig::from_file(&args.config) {
        Ok(config) => {
            println!("{}", "✅ Configuration file is valid!".bright_green().bold());
            println!();
            config
        }
        Err(e) => {
            eprintln!("{} {}", "❌ Configuration validation failed:".red(), e);
            println!();
            println!("{}", "🔧 Common issues:".bright_blue().bold());
            println!("   • Check YAML syntax (indentation, colons, quotes)");
            println!("   • Ensure cutoff is not below distance and stepsize is positive");
            println!("   • Check that every regex and trouble key is a valid pattern");
            println!();
            println!(
                "{}",
                "💡 Tip: Use 'optimus print-default-config' to see valid format".dimmed()
            );
            std::process::exit(1);
        }
    };

    display_config_summary(&config, args.detailed);
    Ok(())
}

/// Add `new_labels` to a results table.
pub fn prepare_review(args: PrepareReviewArgs) -> anyhow::Result<()> {
    let mut review = ReviewTable::read_csv(&args.results)
        .with_context(|| format!("Reading results from {}", args.results.display()))?;
    let kept = review.prepare(args.min_cluster);
    review.write_csv(&args.out)?;

    println!(
        "{} {} clusters of at least {} rows",
        "📋 Review covers".bright_blue().bold(),
        kept.len(),
        args.min_cluster
    );
    let surfaced = review.surfaced_tiers(args.tiers);
    if !surfaced.is_empty() {
        println!("   Surfaced tiers: {}", surfaced.join(", "));
    }
    println!(
        "{} {}",
        "✅ Review table saved to:".bright_green().bold(),
        args.out.display().to_string().cyan()
    );
    Ok(())
}
