//! Console output: per-depth summaries and config tables.

use owo_colors::OwoColorize;
use tabled::{settings::Style as TableStyle, Table, Tabled};

use optimus_rs::core::config::OptimusConfig;
use optimus_rs::labelling::StrategyKind;
use optimus_rs::DepthSummary;

#[derive(Tabled)]
struct DepthRow {
    tier: u32,
    distance: String,
    clusters: usize,
    edit_distance: usize,
    word_gram: usize,
    char_gram: usize,
    hypernyms: usize,
    non_selected: usize,
}

fn accepted_by(depth: &DepthSummary, kind: StrategyKind) -> usize {
    depth
        .accepted
        .iter()
        .filter(|(k, _)| *k == kind)
        .map(|(_, n)| *n)
        .sum()
}

/// Print one row per iteration.
pub fn display_depths(depths: &[DepthSummary]) {
    if depths.is_empty() {
        println!("{}", "No iterations ran: fewer than two distinct words.".yellow());
        return;
    }

    let rows: Vec<DepthRow> = depths
        .iter()
        .map(|depth| DepthRow {
            tier: depth.tier,
            distance: format!("{:.2}", depth.distance),
            clusters: depth.clusters,
            edit_distance: accepted_by(depth, StrategyKind::EditDistance),
            word_gram: accepted_by(depth, StrategyKind::WordGram),
            char_gram: accepted_by(depth, StrategyKind::CharGram),
            hypernyms: accepted_by(depth, StrategyKind::Hypernyms),
            non_selected: depth.non_selected,
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{}", table);
}

/// Print a short summary of a configuration.
pub fn display_config_summary(config: &OptimusConfig, detailed: bool) {
    #[derive(Tabled)]
    struct ConfigRow {
        setting: String,
        value: String,
    }

    let mut rows = vec![
        ConfigRow {
            setting: "Distance".to_string(),
            value: format!("{} → {} (step {})", config.distance, config.cutoff, config.stepsize),
        },
        ConfigRow {
            setting: "Model".to_string(),
            value: config.model.clone(),
        },
        ConfigRow {
            setting: "Thresholds (lev / wg / ng)".to_string(),
            value: format!(
                "{} / {} / {}",
                config.lev_threshold, config.wg_threshold, config.ng_threshold
            ),
        },
        ConfigRow {
            setting: "WordNet".to_string(),
            value: config
                .wordnet
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "disabled".to_string()),
        },
    ];

    if detailed {
        rows.extend([
            ConfigRow {
                setting: "Minimum cluster".to_string(),
                value: config.min_cluster.to_string(),
            },
            ConfigRow {
                setting: "Stoppers".to_string(),
                value: config.stoppers.join(", "),
            },
            ConfigRow {
                setting: "Cleaning rules".to_string(),
                value: format!("{} regex, {} trouble", config.regex.len(), config.trouble.len()),
            },
            ConfigRow {
                setting: "Regroup labels".to_string(),
                value: config.regroup_labels.to_string(),
            },
            ConfigRow {
                setting: "KNN neighbours".to_string(),
                value: config.knn_neighbours.to_string(),
            },
            ConfigRow {
                setting: "Output".to_string(),
                value: config.out.display().to_string(),
            },
        ]);
    }

    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{}", table);
}
