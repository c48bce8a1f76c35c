//! The `iris models` command for managing the CLIP model files.

use clap::{Args, Subcommand};
use iris_core::Config;
use std::path::Path;

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download required model files (CLIP visual + text encoder + tokenizer)
    Download,

    /// List installed model files
    List,

    /// Show model directory path
    Path,
}

/// Hugging Face repository with the ONNX export of CLIP ViT-B/32.
const MODEL_REPO: &str = "Xenova/clip-vit-base-patch32";

/// One file of the CLIP export.
struct ModelFile {
    remote_path: &'static str,
    local_name: &'static str,
    label: &'static str,
}

const MODEL_FILES: &[ModelFile] = &[
    ModelFile {
        remote_path: "onnx/vision_model.onnx",
        local_name: "visual.onnx",
        label: "Visual encoder",
    },
    ModelFile {
        remote_path: "onnx/text_model.onnx",
        local_name: "text_model.onnx",
        label: "Text encoder",
    },
    ModelFile {
        remote_path: "tokenizer.json",
        local_name: "tokenizer.json",
        label: "Tokenizer",
    },
];

/// Execute the models command.
pub async fn execute(args: ModelsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;

    match args.command {
        ModelsCommand::Download => {
            let model_dir = config.model_files_dir();
            std::fs::create_dir_all(&model_dir)?;

            let client = reqwest::Client::new();
            let missing = missing_files(&model_dir);

            if missing.is_empty() {
                tracing::info!("All model files already present in {:?}", model_dir);
                return Ok(());
            }

            for file in missing {
                let dest = model_dir.join(file.local_name);
                let url = format!(
                    "https://huggingface.co/{}/resolve/main/{}",
                    MODEL_REPO, file.remote_path
                );

                tracing::info!("Downloading {}...", file.label);
                tracing::info!("  Source: {}", url);
                tracing::info!("  Destination: {:?}", dest);

                download_file(&client, &url, &dest).await?;

                let file_size = std::fs::metadata(&dest)?.len();
                tracing::info!(
                    "  {} complete ({:.1} MB)",
                    file.label,
                    file_size as f64 / (1024.0 * 1024.0)
                );
            }

            tracing::info!("All downloads complete.");
        }

        ModelsCommand::List => {
            let model_dir = config.model_files_dir();

            if !model_dir.exists() {
                println!("No model files installed.");
                println!("Run `iris models download` to fetch them.");
                return Ok(());
            }

            println!("Model: {} ({})", config.model.name, MODEL_REPO);
            println!("  Directory: {}\n", model_dir.display());

            for file in MODEL_FILES {
                let status = if model_dir.join(file.local_name).exists() {
                    "ready"
                } else {
                    "not installed"
                };
                println!("    - {:20} {}", file.local_name, status);
            }
        }

        ModelsCommand::Path => {
            println!("{}", config.model_files_dir().display());
        }
    }

    Ok(())
}

/// Returns the model files not yet present in `model_dir`.
fn missing_files(model_dir: &Path) -> Vec<&'static ModelFile> {
    MODEL_FILES
        .iter()
        .filter(|f| !model_dir.join(f.local_name).exists())
        .collect()
}

/// Download a file from a URL, streaming to disk.
///
/// Streams into `<dest>.partial` and renames on completion, so an
/// interrupted download never leaves a file that looks installed.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let total_size = response.content_length();
    if let Some(size) = total_size {
        tracing::info!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
    }

    let mut partial = dest.as_os_str().to_owned();
    partial.push(".partial");
    let partial = std::path::PathBuf::from(partial);
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total_size {
            if downloaded % (50 * 1024 * 1024) < chunk.len() as u64 {
                tracing::info!(
                    "  Progress: {:.0}%",
                    downloaded as f64 / total as f64 * 100.0
                );
            }
        }
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&partial, dest).await?;

    Ok(())
}
