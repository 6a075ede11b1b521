//! Service configuration module.
//!
//! Contains the runtime configuration for the separation service: listen
//! address, artifact directories, external tool locations and job identity
//! policy. The configuration is built once at startup and handed to each
//! component; nothing reads the environment after that.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use url::Url;

/// Default listen address, also used to derive the public URL.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:9999";

/// Default maximum upload size in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 512;

/// How job identifiers are derived from a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobIdentity {
    /// Use the base name of the uploaded file (`song.mp3` -> `song`).
    /// Two different files with the same name share a job.
    #[default]
    Filename,

    /// Append a SHA-256 prefix of the uploaded bytes (`song-3fa2...`).
    /// Distinct contents never share a job.
    ContentHash,
}

impl JobIdentity {
    /// Returns the string representation of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobIdentity::Filename => "filename",
            JobIdentity::ContentHash => "content_hash",
        }
    }

    /// Parses a policy from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "filename" | "name" => Some(JobIdentity::Filename),
            "content_hash" | "content" | "hash" => Some(JobIdentity::ContentHash),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Locations of the external programs the pipeline drives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Media transcoder (ffmpeg).
    pub ffmpeg: PathBuf,
    /// Duration prober (ffprobe).
    pub ffprobe: PathBuf,
    /// Separation engine CLI (spleeter).
    pub separator: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            separator: PathBuf::from("spleeter"),
        }
    }
}

/// Runtime configuration for the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to (`host:port`).
    pub address: String,

    /// Base URL used when building track URLs.
    /// If None, derived from `address` as `http://{address}`.
    pub public_url: Option<String>,

    /// Root directory for all artifacts.
    /// If None, uses the platform-specific data location.
    pub root_dir: Option<PathBuf>,

    /// Directory for raw uploads and canonical WAV files.
    pub tmp_dir: Option<PathBuf>,

    /// Directory holding one sub-directory of stems per job.
    pub files_dir: Option<PathBuf>,

    /// Directory containing one sub-directory per installed model.
    pub model_dir: Option<PathBuf>,

    /// Optional directory of static assets served under `/static`.
    pub static_dir: Option<PathBuf>,

    /// External tool locations.
    pub tools: ToolConfig,

    /// Job identifier derivation policy.
    pub job_identity: JobIdentity,

    /// Maximum accepted request body in megabytes.
    pub max_upload_mb: u64,

    /// Release descriptor URL polled once at startup. None disables the check.
    pub update_url: Option<String>,

    /// Open the web page in the default browser after startup.
    pub open_browser: bool,
}

impl ServiceConfig {
    /// Creates a new ServiceConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ServiceConfig rooted at `root`, with every other directory
    /// derived from it.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: Some(root.into()),
            ..Self::default()
        }
    }

    /// Creates a ServiceConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `VOCAL_ADDRESS` - Listen address (`host:port`)
    /// - `VOCAL_PUBLIC_URL` - Base URL for track links
    /// - `VOCAL_ROOT` - Artifact root directory
    /// - `VOCAL_TMP_DIR` - Upload and canonical audio directory
    /// - `VOCAL_FILES_DIR` - Separated stems directory
    /// - `VOCAL_MODEL_DIR` - Installed models directory
    /// - `VOCAL_STATIC_DIR` - Static assets directory
    /// - `VOCAL_FFMPEG`, `VOCAL_FFPROBE`, `VOCAL_SEPARATOR` - Tool paths
    /// - `VOCAL_JOB_IDENTITY` - `filename` or `content_hash`
    /// - `VOCAL_MAX_UPLOAD_MB` - Request body limit
    /// - `VOCAL_UPDATE_URL` - Release descriptor URL
    /// - `VOCAL_OPEN_BROWSER` - `1`/`true` to open a browser at startup
    ///
    /// Falls back to defaults for unset or unparsable variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(address) = std::env::var("VOCAL_ADDRESS") {
            config.address = address;
        }

        if let Ok(url) = std::env::var("VOCAL_PUBLIC_URL") {
            config.public_url = Some(url);
        }

        if let Ok(path) = std::env::var("VOCAL_ROOT") {
            config.root_dir = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("VOCAL_TMP_DIR") {
            config.tmp_dir = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("VOCAL_FILES_DIR") {
            config.files_dir = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("VOCAL_MODEL_DIR") {
            config.model_dir = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("VOCAL_STATIC_DIR") {
            config.static_dir = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("VOCAL_FFMPEG") {
            config.tools.ffmpeg = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("VOCAL_FFPROBE") {
            config.tools.ffprobe = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("VOCAL_SEPARATOR") {
            config.tools.separator = PathBuf::from(path);
        }

        if let Ok(identity) = std::env::var("VOCAL_JOB_IDENTITY") {
            if let Some(identity) = JobIdentity::parse(&identity) {
                config.job_identity = identity;
            }
        }

        if let Ok(limit) = std::env::var("VOCAL_MAX_UPLOAD_MB") {
            if let Ok(limit) = limit.parse::<u64>() {
                if limit > 0 {
                    config.max_upload_mb = limit;
                }
            }
        }

        if let Ok(url) = std::env::var("VOCAL_UPDATE_URL") {
            config.update_url = if url.trim().is_empty() { None } else { Some(url) };
        }

        if let Ok(flag) = std::env::var("VOCAL_OPEN_BROWSER") {
            config.open_browser = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        config
    }

    /// Returns the effective artifact root, using platform defaults if not specified.
    pub fn effective_root(&self) -> PathBuf {
        if let Some(ref path) = self.root_dir {
            path.clone()
        } else {
            default_root_path()
        }
    }

    /// Returns the directory for uploads and canonical WAV files.
    pub fn effective_tmp_dir(&self) -> PathBuf {
        self.tmp_dir
            .clone()
            .unwrap_or_else(|| self.effective_root().join("tmp"))
    }

    /// Returns the directory holding per-job stem directories.
    pub fn effective_files_dir(&self) -> PathBuf {
        self.files_dir
            .clone()
            .unwrap_or_else(|| self.effective_root().join("files"))
    }

    /// Returns the directory of installed separation models.
    pub fn effective_model_dir(&self) -> PathBuf {
        self.model_dir
            .clone()
            .unwrap_or_else(|| self.effective_root().join("pretrained_models"))
    }

    /// Returns the base URL for track links, without a trailing slash.
    pub fn effective_public_url(&self) -> String {
        let url = match self.public_url {
            Some(ref url) => url.clone(),
            None => format!("http://{}", self.address),
        };
        url.trim_end_matches('/').to_string()
    }

    /// Parses the public URL that track links are built from.
    pub fn public_base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.effective_public_url())
    }

    /// Returns the request body limit in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.address.parse::<SocketAddr>().is_err() {
            return Some(format!(
                "address must be host:port with a numeric host, got {:?}",
                self.address
            ));
        }

        let public_url = self.effective_public_url();
        match self.public_base_url() {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(_) => {
                return Some(format!(
                    "public URL must start with http:// or https://, got {:?}",
                    public_url
                ))
            }
            Err(e) => return Some(format!("public URL {:?} is invalid: {}", public_url, e)),
        }

        if self.max_upload_mb == 0 {
            return Some("max_upload_mb must be > 0".to_string());
        }
        if self.max_upload_mb > 4096 {
            return Some(format!(
                "max_upload_mb too high: {} (max 4096)",
                self.max_upload_mb
            ));
        }

        for (name, path) in [
            ("ffmpeg", &self.tools.ffmpeg),
            ("ffprobe", &self.tools.ffprobe),
            ("separator", &self.tools.separator),
        ] {
            if path.as_os_str().is_empty() {
                return Some(format!("{} path must not be empty", name));
            }
        }

        if self.effective_tmp_dir() == self.effective_files_dir() {
            return Some("tmp and files directories must differ".to_string());
        }

        None
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            public_url: None,
            root_dir: None,
            tmp_dir: None,
            files_dir: None,
            model_dir: None,
            static_dir: None,
            tools: ToolConfig::default(),
            job_identity: JobIdentity::default(),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            update_url: None,
            open_browser: false,
        }
    }
}

/// Returns the platform-specific default artifact root.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Application Support/vocal-split
/// - Linux: ~/.local/share/vocal-split
/// - Windows: C:\Users\<user>\AppData\Roaming\vocal-split\data
fn default_root_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "vocal-split") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        // Fallback to current directory
        PathBuf::from("./vocal-split")
    }
}
