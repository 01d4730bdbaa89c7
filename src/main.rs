use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use ytup::config::{DEFAULT_CATEGORY_ID, DEFAULT_CHUNK_SIZE};
use ytup::{
    ensure_credential, parse_tags, upload_video, ChunkSize, HttpTransport, OAuthClient,
    PrivacyStatus, TokenStore, UploadConfig, UploadRequest,
};

/// ytup: authenticate with YouTube and upload videos over the resumable protocol.
#[derive(Parser)]
#[command(name = "ytup", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate with the YouTube API and save a reusable token
    Auth {
        /// Path to the token file to create or refresh
        #[arg(long)]
        token: PathBuf,

        /// Path to the OAuth client_secrets.json file
        #[arg(long)]
        secrets: PathBuf,

        /// Only print the consent URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Upload a video to YouTube
    Upload {
        /// Path to video file
        #[arg(long)]
        file: PathBuf,

        /// Video title
        #[arg(long)]
        title: String,

        /// Video description
        #[arg(long, default_value = "")]
        description: String,

        /// Comma-separated list of tags
        #[arg(long, default_value = "")]
        tags: String,

        /// Privacy status
        #[arg(long, value_enum, default_value_t = PrivacyStatus::Public)]
        privacy: PrivacyStatus,

        /// YouTube category ID (default is 22 - People & Blogs)
        #[arg(long, default_value = DEFAULT_CATEGORY_ID)]
        category: String,

        /// Mark as made for kids
        #[arg(long)]
        kids: bool,

        /// Path to the token file written by `ytup auth`
        #[arg(long)]
        token: PathBuf,

        /// Bytes per request, a multiple of 262144 (default: 0 = whole file)
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: u64,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Auth {
            token,
            secrets,
            no_browser,
        } => {
            let store = TokenStore::new(token);
            let flow = OAuthClient::new()?.open_browser(!no_browser);

            let (_, outcome) = ensure_credential(&store, &secrets, &flow)
                .with_context(|| format!("failed to provision {}", store.path().display()))?;
            log::debug!("credential {:?}", outcome);

            println!("Token saved successfully to {}", store.path().display());
        }

        Commands::Upload {
            file,
            title,
            description,
            tags,
            privacy,
            category,
            kids,
            token,
            chunk_size,
        } => {
            let cfg = UploadConfig {
                chunk_size: ChunkSize::from_bytes(chunk_size)?,
                ..Default::default()
            };

            let request = UploadRequest {
                file,
                title,
                description,
                tags: parse_tags(&tags),
                category_id: category,
                privacy,
                made_for_kids: kids,
            };

            let store = TokenStore::new(token);
            let endpoint = OAuthClient::new()?;
            let transport = HttpTransport::new()?;

            let progress = ProgressBar::new(100);
            progress.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}% ({eta})")
                    .context("invalid progress template")?
                    .progress_chars("##-"),
            );

            println!("Uploading video...");
            let video_id = upload_video(&request, &store, &endpoint, &transport, &cfg, &progress)
                .with_context(|| format!("failed to upload {}", request.file.display()))?;

            println!("Upload complete! Video ID: {video_id}");
        }
    }

    Ok(())
}
