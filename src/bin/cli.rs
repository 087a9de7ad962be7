//! CLI for building feature stores, evaluating and classifying mudras.
//!
//! Usage:
//!   mudra-match normalize raw.bin -o features.bin     # Raw landmarks -> normalized features
//!   mudra-match evaluate features.bin                 # Held-out accuracy report
//!   mudra-match classify features.bin hand.json       # Classify one skeleton
//!   mudra-match init-config -o mudra.yaml             # Write an example config

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use mudra_match::config::{Config, EXAMPLE_CONFIG};
use mudra_match::pipeline::normalize_store;
use mudra_match::{
    evaluate_split, ArrayStore, Evaluation, HandDetection, InferenceOutcome, LandmarkNormalizer,
    LandmarkSet, LandmarkSource, MudraService, Point3,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "mudra-match")]
#[command(author, version, about = "Hand pose recognition from 3D landmarks", long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize a raw landmark store into a feature store
    Normalize {
        /// Raw landmark store (default: from config)
        raw: Option<PathBuf>,

        /// Output feature store (default: from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate 1-NN accuracy on a stratified held-out split
    Evaluate {
        /// Feature store (default: from config)
        features: Option<PathBuf>,

        /// Share of each class held out for testing
        #[arg(long)]
        test_fraction: Option<f64>,

        /// Split seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Classify one skeleton given as a JSON array of 21 [x, y, z] points
    Classify {
        /// Feature store to match against
        features: PathBuf,

        /// Landmark file; an empty array means no hand was detected
        landmarks: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Write an example configuration file
    InitConfig {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Landmark "detector" that reads a skeleton precomputed by an external tool.
struct LandmarkFile;

impl LandmarkSource<Path> for LandmarkFile {
    fn detect(&self, path: &Path) -> mudra_match::Result<HandDetection> {
        let content = std::fs::read_to_string(path)?;
        let triples: Vec<[f32; 3]> = serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{}: {}", path.display(), e),
            )
        })?;
        if triples.is_empty() {
            return Ok(HandDetection::NoHand);
        }
        let points = triples
            .into_iter()
            .map(|[x, y, z]| Point3::new(x, y, z))
            .collect();
        Ok(HandDetection::Found(LandmarkSet::from_points(points)?))
    }
}

/// Output structure for JSON serialization of a classification
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ClassifyOutput {
    Recognized {
        label: String,
        distance: f64,
        description: Option<String>,
    },
    NoHandDetected,
    ModelNotReady,
    Rejected {
        reason: String,
    },
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(level));

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            let config = Config::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            config.validate()?;
            config
        }
        None => Config::default(),
    };

    match args.command {
        Command::Normalize { raw, output } => {
            let raw = raw.unwrap_or_else(|| config.store.raw_landmarks.clone());
            let output = output.unwrap_or_else(|| config.store.features.clone());

            let store = ArrayStore::load(&raw)?;
            let report = normalize_store(&LandmarkNormalizer::new(), &store)?;
            report.dataset.save(&output)?;

            println!(
                "Saved {} normalized samples to {} (dropped: {} without landmarks, {} degenerate)",
                report.dataset.len(),
                output.display(),
                report.missing,
                report.degenerate
            );
        }

        Command::Evaluate {
            features,
            test_fraction,
            seed,
            json,
        } => {
            let features = features.unwrap_or_else(|| config.store.features.clone());
            let test_fraction = test_fraction.unwrap_or(config.evaluation.test_fraction);
            let seed = seed.unwrap_or(config.evaluation.seed);

            let dataset = mudra_match::FeatureDataset::load(&features)?;
            let evaluation = evaluate_split(&dataset, test_fraction, seed)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&evaluation_json(&evaluation))?);
            } else {
                print!("{}", format_evaluation(&evaluation));
            }
        }

        Command::Classify {
            features,
            landmarks,
            json,
        } => {
            let service =
                MudraService::new(LandmarkFile).with_descriptions(config.description_lookup());
            if let Err(e) = service.reload(&features) {
                log::warn!("Classifier not loaded: {}", e);
            }

            let output = match service.infer(landmarks.as_path()) {
                InferenceOutcome::Recognized(r) => ClassifyOutput::Recognized {
                    label: r.label,
                    distance: r.distance,
                    description: r.description,
                },
                InferenceOutcome::NoHandDetected => ClassifyOutput::NoHandDetected,
                InferenceOutcome::ModelNotReady => ClassifyOutput::ModelNotReady,
                InferenceOutcome::Rejected(e) => ClassifyOutput::Rejected {
                    reason: e.to_string(),
                },
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", format_classification(&output));
            }
        }

        Command::InitConfig { output } => match output {
            Some(path) => {
                std::fs::write(&path, EXAMPLE_CONFIG)?;
                info!("Example configuration written to {}", path.display());
            }
            None => print!("{}", EXAMPLE_CONFIG),
        },
    }

    Ok(())
}

fn evaluation_json(evaluation: &Evaluation) -> serde_json::Value {
    serde_json::json!({
        "accuracy": evaluation.accuracy(),
        "macro_f1": evaluation.macro_f1(),
        "train_size": evaluation.train_size,
        "test_size": evaluation.test_size,
        "labels": evaluation.labels,
        "confusion_matrix": evaluation.confusion_matrix(),
        "classes": evaluation.class_reports(),
    })
}

fn format_evaluation(evaluation: &Evaluation) -> String {
    let mut s = String::new();

    s.push_str(&format!(
        "Train/test: {}/{}\n",
        evaluation.train_size, evaluation.test_size
    ));
    s.push_str(&format!("Accuracy: {:.4}\n", evaluation.accuracy()));
    s.push_str(&format!("Labels order: {:?}\n", evaluation.labels));

    s.push_str("\nConfusion matrix:\n");
    for row in evaluation.confusion_matrix() {
        let cells: Vec<String> = row.iter().map(|c| format!("{:>4}", c)).collect();
        s.push_str(&format!("  {}\n", cells.join("")));
    }

    s.push_str(&format!(
        "\n{:<16} {:>9} {:>9} {:>9} {:>8}\n",
        "", "precision", "recall", "f1-score", "support"
    ));
    for r in evaluation.class_reports() {
        s.push_str(&format!(
            "{:<16} {:>9.2} {:>9.2} {:>9.2} {:>8}\n",
            r.label, r.precision, r.recall, r.f1, r.support
        ));
    }
    s.push_str(&format!("\nMacro F1: {:.4}\n", evaluation.macro_f1()));

    s
}

fn format_classification(output: &ClassifyOutput) -> String {
    match output {
        ClassifyOutput::Recognized {
            label,
            distance,
            description,
        } => {
            let mut s = format!("Prediction: {}\nDistance: {:.6}", label, distance);
            if let Some(text) = description {
                s.push_str(&format!("\n\n{}", text));
            }
            s
        }
        ClassifyOutput::NoHandDetected => "No hand detected".to_string(),
        ClassifyOutput::ModelNotReady => "Model not loaded".to_string(),
        ClassifyOutput::Rejected { reason } => format!("Rejected: {}", reason),
    }
}
