use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use docstrength_core::{DocumentStrengthType, ImportanceValuesSign, ModelSnapshot, UpdateMethod};
use docstrength_io::{ExperimentName, PoolReader, ResultWriter, RunSettings};

#[derive(Parser)]
#[command(name = "docstrength")]
#[command(about = "Training-document importances for oblivious gradient-boosted tree ensembles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of worker threads (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the importance of every training document for every pool document
    Evaluate {
        /// Path to the model snapshot binary
        #[arg(long)]
        snapshot: PathBuf,

        /// Path to the pool CSV (doc_id,target[,weight],features...)
        #[arg(long)]
        pool: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Leaf update policy: "AllPoints", "SinglePoint" or "TopKLeaves:top=K"
        #[arg(long, default_value = "AllPoints")]
        update_method: String,

        /// Ranking of the results: "PerObject", "PerPool" or "Raw"
        #[arg(long, default_value = "PerObject")]
        strength_type: String,

        /// Importances to keep: "Positive", "Negative" or "All"
        #[arg(long, default_value = "All")]
        values_sign: String,

        /// Keep at most this many training documents per ranked list
        #[arg(long)]
        top_size: Option<usize>,
    },

    /// Print a summary of a model snapshot
    Inspect {
        /// Path to the model snapshot binary
        #[arg(long)]
        snapshot: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct EvaluateOutput {
    experiment: String,
    n_train_docs: usize,
    n_scored_docs: usize,
    update_method: String,
    strength_type: String,
    values_sign: String,
    threads: usize,
    non_finite: usize,
    output: PathBuf,
}

#[derive(Serialize)]
struct InspectOutput {
    n_trees: usize,
    depths: Vec<usize>,
    max_leaf_count: usize,
    n_features: usize,
    n_used_features: usize,
    n_train_docs: usize,
    learning_rate: f64,
    leaves_estimation_iterations: usize,
    loss_function: String,
    leaf_estimation_method: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let threads = cli.threads.unwrap_or_else(rayon::current_num_threads);

    match cli.command {
        Command::Evaluate {
            snapshot,
            pool,
            experiment,
            output_dir,
            update_method,
            strength_type,
            values_sign,
            top_size,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let update_method: UpdateMethod = update_method.parse()?;
            let strength_type: DocumentStrengthType = strength_type.parse()?;
            let values_sign: ImportanceValuesSign = values_sign.parse()?;

            // 1. Load model
            let model = ModelSnapshot::load(&snapshot).context("failed to load snapshot")?;
            info!(
                n_trees = model.ensemble().n_trees(),
                n_train_docs = model.n_train_docs(),
                "snapshot loaded"
            );

            // 2. Read and binarize the pool
            let dataset = PoolReader::new(&pool)
                .read()
                .context("failed to read pool CSV")?;
            let scored = dataset
                .to_pool(model.borders())
                .context("pool does not match the snapshot's features")?;

            // 3. Evaluate
            let config = model
                .importance_config()?
                .with_update_method(update_method)
                .with_thread_count(threads);
            let importances = config
                .evaluate(model.ensemble(), model.statistics(), &scored)
                .context("importance evaluation failed")?;
            let non_finite = importances.as_slice().iter().filter(|v| !v.is_finite()).count();
            if non_finite > 0 {
                warn!(non_finite, "non-finite importances written as null");
            }

            // 4. Rank and write JSON artifact
            let settings = RunSettings {
                update_method,
                strength_type,
                values_sign,
                top_size,
            };
            let strength = importances.strength(strength_type, values_sign, top_size);
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let output_path =
                writer.write_importances(dataset.doc_ids(), &importances, &strength, &settings)?;

            // 5. Print summary
            let output = EvaluateOutput {
                experiment,
                n_train_docs: importances.n_train_docs(),
                n_scored_docs: importances.n_scored_docs(),
                update_method: update_method.to_string(),
                strength_type: strength_type.to_string(),
                values_sign: values_sign.to_string(),
                threads,
                non_finite,
                output: output_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Inspect { snapshot } => {
            let model = ModelSnapshot::load(&snapshot).context("failed to load snapshot")?;
            let ensemble = model.ensemble();
            let training = model.training();

            let output = InspectOutput {
                n_trees: ensemble.n_trees(),
                depths: ensemble.trees().iter().map(|t| t.depth()).collect(),
                max_leaf_count: ensemble.max_leaf_count(),
                n_features: model.borders().n_features(),
                n_used_features: ensemble.n_used_features(),
                n_train_docs: model.n_train_docs(),
                learning_rate: training.learning_rate,
                leaves_estimation_iterations: training.leaves_estimation_iterations,
                loss_function: training.loss_function.to_string(),
                leaf_estimation_method: training.leaf_estimation_method.to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
