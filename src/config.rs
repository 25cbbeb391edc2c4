use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_PAGE_SIZE: u32 = 30;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_WEB_VARIANT_WIDTH: u32 = 640;

/// Settings consumed by the library components themselves.
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Upload ceiling in bytes, checked before anything is written.
    pub max_upload_bytes: u64,
    /// MIME prefixes accepted by ingestion, e.g. `image/`.
    pub allowed_mime_prefixes: Vec<String>,
    pub default_page_size: u32,
    /// Worker pool width for batch operations and multi-file uploads.
    pub batch_concurrency: usize,
    /// Bound on a single batch item or ingestion.
    pub item_timeout: Duration,
    pub web_variant_width: u32,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_mime_prefixes: vec!["image/".into()],
            default_page_size: DEFAULT_PAGE_SIZE,
            batch_concurrency: 4,
            item_timeout: Duration::from_secs(30),
            web_variant_width: DEFAULT_WEB_VARIANT_WIDTH,
        }
    }
}

impl LibraryConfig {
    /// Whether `mime` starts with one of the allowed prefixes.
    pub fn allows_mime(&self, mime: &str) -> bool {
        self.allowed_mime_prefixes
            .iter()
            .any(|prefix| mime.starts_with(prefix.as_str()))
    }

    /// Clamp a requested page size, falling back to the configured default.
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub library: LibraryConfig,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Media asset library API")]
pub struct Args {
    /// Host to bind to (overrides MEDIA_LIBRARY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides MEDIA_LIBRARY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where originals and variants are stored (overrides MEDIA_LIBRARY_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides MEDIA_LIBRARY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Upload size ceiling in bytes (overrides MEDIA_LIBRARY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<u64>,

    /// Comma separated MIME allow-list such as `image/*,video/*` (overrides MEDIA_LIBRARY_ALLOWED_MIME)
    #[arg(long)]
    pub allowed_mime: Option<String>,

    /// Default list page size (overrides MEDIA_LIBRARY_PAGE_SIZE)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Parallel workers per batch (overrides MEDIA_LIBRARY_BATCH_CONCURRENCY)
    #[arg(long)]
    pub batch_concurrency: Option<usize>,

    /// Per-item timeout in seconds (overrides MEDIA_LIBRARY_ITEM_TIMEOUT_SECS)
    #[arg(long)]
    pub item_timeout_secs: Option<u64>,

    /// Target width of generated web variants (overrides MEDIA_LIBRARY_WEB_VARIANT_WIDTH)
    #[arg(long)]
    pub web_variant_width: Option<u32>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::resolve(args, |key| env::var(key).ok())?;
        Ok((cfg, migrate))
    }

    /// Merge CLI args over values provided by `lookup` (normally the process
    /// environment), over built-in defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = LibraryConfig::default();

        let env_host = lookup("MEDIA_LIBRARY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_env(&lookup, "MEDIA_LIBRARY_PORT")?.unwrap_or(3000);
        let env_storage =
            lookup("MEDIA_LIBRARY_STORAGE_DIR").unwrap_or_else(|| "./data/media".into());
        let env_db = lookup("MEDIA_LIBRARY_DATABASE_URL")
            .unwrap_or_else(|| "sqlite://./data/meta/media_library.db".into());

        let max_upload_bytes = match args.max_upload_bytes {
            Some(v) => v,
            None => parse_env(&lookup, "MEDIA_LIBRARY_MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
        };
        let allowed_mime_prefixes = args
            .allowed_mime
            .or_else(|| lookup("MEDIA_LIBRARY_ALLOWED_MIME"))
            .map(|raw| parse_mime_prefixes(&raw))
            .unwrap_or(defaults.allowed_mime_prefixes);
        let default_page_size = match args.page_size {
            Some(v) => v,
            None => parse_env(&lookup, "MEDIA_LIBRARY_PAGE_SIZE")?
                .unwrap_or(defaults.default_page_size),
        };
        let batch_concurrency = match args.batch_concurrency {
            Some(v) => v,
            None => parse_env(&lookup, "MEDIA_LIBRARY_BATCH_CONCURRENCY")?
                .unwrap_or(defaults.batch_concurrency),
        };
        let item_timeout = match args.item_timeout_secs {
            Some(v) => Duration::from_secs(v),
            None => parse_env(&lookup, "MEDIA_LIBRARY_ITEM_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.item_timeout),
        };
        let web_variant_width = match args.web_variant_width {
            Some(v) => v,
            None => parse_env(&lookup, "MEDIA_LIBRARY_WEB_VARIANT_WIDTH")?
                .unwrap_or(defaults.web_variant_width),
        };

        if batch_concurrency == 0 {
            anyhow::bail!("batch concurrency must be at least 1");
        }
        if web_variant_width == 0 {
            anyhow::bail!("web variant width must be at least 1");
        }

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            library: LibraryConfig {
                max_upload_bytes,
                allowed_mime_prefixes,
                default_page_size: default_page_size.clamp(1, MAX_PAGE_SIZE),
                batch_concurrency,
                item_timeout,
                web_variant_width,
            },
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        None => Ok(None),
    }
}

/// Turn `image/*, video/mp4` into `["image/", "video/mp4"]`.
pub fn parse_mime_prefixes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|entry| entry.trim().to_ascii_lowercase())
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.strip_suffix('*') {
            Some(prefix) => prefix.to_string(),
            None => entry,
        })
        .collect()
}
