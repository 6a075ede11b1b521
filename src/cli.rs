//! Command-line arguments.
//!
//! Every option overrides the matching `VOCAL_*` environment variable read
//! by [`ServiceConfig::from_env`]; unset options leave it untouched.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{JobIdentity, ServiceConfig};

/// Default tracing filter when neither `RUST_LOG` nor `--log` is set.
pub const DEFAULT_LOG_FILTER: &str = "vocal_split=info,tower_http=info";

/// Job identifier policies selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdentityArg {
    /// Base name of the uploaded file (`song.mp3` -> `song`)
    Filename,
    /// Base name plus a content hash prefix (`song-3fa2...`)
    ContentHash,
}

impl From<IdentityArg> for JobIdentity {
    fn from(arg: IdentityArg) -> Self {
        match arg {
            IdentityArg::Filename => JobIdentity::Filename,
            IdentityArg::ContentHash => JobIdentity::ContentHash,
        }
    }
}

/// vocal-split: media ingestion and stem separation service
#[derive(Parser, Debug)]
#[command(name = "vocal-split")]
#[command(about = "Upload media, convert it with ffmpeg and split it into stems with spleeter")]
#[command(version)]
pub struct Cli {
    /// Listen address (host:port)
    #[arg(short, long)]
    pub address: Option<String>,

    /// Base URL used in track links (defaults to http://<address>)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Root directory for uploads, canonical audio and stems
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Directory containing installed separation models
    #[arg(short, long)]
    pub model_dir: Option<PathBuf>,

    /// Directory of static assets served under /static
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe executable
    #[arg(long)]
    pub ffprobe: Option<PathBuf>,

    /// Separation engine executable (spleeter)
    #[arg(long)]
    pub separator: Option<PathBuf>,

    /// How job identifiers are derived from uploads
    #[arg(long, value_enum)]
    pub job_identity: Option<IdentityArg>,

    /// Maximum request body in megabytes
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=4096))]
    pub max_upload_mb: Option<u64>,

    /// Release descriptor URL checked once at startup
    #[arg(long)]
    pub update_url: Option<String>,

    /// Skip the startup update check
    #[arg(long)]
    pub no_update_check: bool,

    /// Open the web page in the default browser after startup
    #[arg(long)]
    pub open_browser: bool,

    /// Tracing filter, used when RUST_LOG is unset
    #[arg(long, env = "VOCAL_LOG", default_value = DEFAULT_LOG_FILTER)]
    pub log: String,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Applies the given options on top of `config`.
    pub fn apply_to(&self, config: &mut ServiceConfig) {
        if let Some(ref address) = self.address {
            config.address = address.clone();
        }
        if let Some(ref url) = self.public_url {
            config.public_url = Some(url.clone());
        }
        if let Some(ref root) = self.root {
            config.root_dir = Some(root.clone());
        }
        if let Some(ref dir) = self.model_dir {
            config.model_dir = Some(dir.clone());
        }
        if let Some(ref dir) = self.static_dir {
            config.static_dir = Some(dir.clone());
        }
        if let Some(ref path) = self.ffmpeg {
            config.tools.ffmpeg = path.clone();
        }
        if let Some(ref path) = self.ffprobe {
            config.tools.ffprobe = path.clone();
        }
        if let Some(ref path) = self.separator {
            config.tools.separator = path.clone();
        }
        if let Some(identity) = self.job_identity {
            config.job_identity = identity.into();
        }
        if let Some(limit) = self.max_upload_mb {
            config.max_upload_mb = limit;
        }
        if let Some(ref url) = self.update_url {
            config.update_url = Some(url.clone());
        }
        if self.no_update_check {
            config.update_url = None;
        }
        if self.open_browser {
            config.open_browser = true;
        }
    }
}
