//! WasteGen CLI - Bridge interface for the serverless handlers
//!
//! Commands: layers, generate, check
//! Outputs JSON to stdout (logs go to stderr)
//! Returns non-zero on caller error

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use wastegen_core::{
    conflicts, AssetId, FsAssetStore, GenerationPipeline, GenerationRequest, LayerAssignment,
    Manifest, ManifestStore,
};

#[derive(Parser)]
#[command(name = "wastegen-cli")]
#[command(about = "WasteGen CLI - Procedural Character Appearance Engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the layer manifest
    #[arg(short, long, default_value = "manifest.json")]
    manifest: PathBuf,

    /// Root directory of the layer image assets
    #[arg(short, long, default_value = "assets")]
    assets_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured layer order and policies
    Layers,

    /// Generate a character
    Generate {
        /// JSON payload (GenerationRequest)
        #[arg(short, long)]
        payload: String,
    },

    /// Check an explicit assignment against the manifest's rules
    Check {
        /// JSON payload (layer -> asset id map)
        #[arg(short, long)]
        payload: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let pipeline = GenerationPipeline::new(
        ManifestStore::new(&cli.manifest),
        FsAssetStore::new(&cli.assets_dir),
    );

    match cli.command {
        Commands::Layers => {
            let layers = serde_json::to_string_pretty(&pipeline.config().layers)
                .unwrap_or_else(|e| format!(r#"{{"error": "{e}"}}"#));
            println!("{layers}");
            ExitCode::SUCCESS
        }

        Commands::Generate { payload } => {
            let request: GenerationRequest = match serde_json::from_str(&payload) {
                Ok(r) => r,
                Err(e) => {
                    println!(r#"{{"success": false, "error": "Invalid payload: {e}"}}"#);
                    return ExitCode::FAILURE;
                }
            };

            match pipeline.generate(&request) {
                Ok(result) => {
                    let mut response = serde_json::json!({
                        "success": true,
                        "image": result.image_data_uri(),
                        "selectedLayers": result.assignment.to_external(),
                        "gender": result.gender,
                        "generationId": result.id,
                        "generationHash": result.generation_hash,
                    });
                    if let Some(warning) = &result.warning {
                        response["warning"] = serde_json::Value::String(warning.clone());
                    }
                    println!("{response}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let response = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{response}");
                    ExitCode::from(2) // Caller contract violation
                }
            }
        }

        Commands::Check { payload } => {
            let raw: BTreeMap<String, Option<AssetId>> = match serde_json::from_str(&payload) {
                Ok(r) => r,
                Err(e) => {
                    println!(r#"{{"valid": false, "error": "Invalid payload: {e}"}}"#);
                    return ExitCode::FAILURE;
                }
            };

            let assignment = match LayerAssignment::from_explicit(&raw, pipeline.config()) {
                Ok(a) => a,
                Err(e) => {
                    println!(r#"{{"valid": false, "error": "{e}"}}"#);
                    return ExitCode::FAILURE;
                }
            };

            let manifest = match Manifest::from_path(&cli.manifest) {
                Ok(m) => m,
                Err(e) => {
                    println!(r#"{{"valid": false, "error": "{e}"}}"#);
                    return ExitCode::FAILURE;
                }
            };

            let found = conflicts(&manifest, &assignment);
            let response = serde_json::json!({
                "valid": found.is_empty(),
                "conflicts": found,
            });
            println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
            if found.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2) // Conflicts found
            }
        }
    }
}
