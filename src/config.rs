use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, ValueEnum};

const COLORIZE_VERSION: &str = "ca494ba129e44e45f661d6ece83c4c98a9a7c774309beca01429b58fce8aa695";
const RESTORE_VERSION: &str = "0fbacf7afc6c144e5be9767cff80f25aff23e52b0708f17e20f9879b2f21516c";

/// ddcolor, fed through its `image` input. Must stay equal to `ModelRef::colorizer()`.
pub const DEFAULT_COLORIZE_MODEL: &str =
    "piddnad/ddcolor:ca494ba129e44e45f661d6ece83c4c98a9a7c774309beca01429b58fce8aa695";

/// GFPGAN, fed through its `img` input. Must stay equal to `ModelRef::restorer()`.
pub const DEFAULT_RESTORE_MODEL: &str =
    "tencentarc/gfpgan:0fbacf7afc6c144e5be9767cff80f25aff23e52b0708f17e20f9879b2f21516c";

pub const DEFAULT_API_BASE: &str = "https://api.replicate.com/v1";

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Directory holding `photos/`, `colorized/` and `gfpgan/`
    #[arg(default_value = ".")]
    pub base_dir: PathBuf,

    /// Bearer token for the inference API
    #[arg(long, env = "REPLICATE_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    #[arg(long, default_value = DEFAULT_COLORIZE_MODEL, value_parser = parse_model_ref)]
    pub colorize_model: ModelRef,

    #[arg(long, default_value = DEFAULT_RESTORE_MODEL, value_parser = parse_model_ref)]
    pub restore_model: ModelRef,

    /// What a failed remote call or write does to the colorization stage
    #[arg(long, value_enum, default_value_t = FailurePolicy::Abort)]
    pub colorize_policy: FailurePolicy,

    /// What a failed remote call or write does to the restoration stage
    #[arg(long, value_enum, default_value_t = FailurePolicy::Continue)]
    pub restore_policy: FailurePolicy,

    /// Skip images whose outputs already exist instead of regenerating them
    #[arg(long, default_value_t = false)]
    pub skip_existing: bool,

    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    #[arg(long, default_value_t = 300)]
    pub request_timeout_secs: u64,

    /// Print plain lines instead of drawing progress bars
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

impl Config {
    /// Defaults for every option, rooted at `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            api_token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            colorize_model: ModelRef::colorizer(),
            restore_model: ModelRef::restorer(),
            colorize_policy: FailurePolicy::Abort,
            restore_policy: FailurePolicy::Continue,
            skip_existing: false,
            poll_interval_ms: 1000,
            request_timeout_secs: 300,
            no_progress: false,
        }
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Whether a per-file error stops the stage or is reported and skipped.
///
/// A non-200 download is always reported and skipped; the policy governs
/// everything else (remote call failures, decoding, writes).
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    Abort,
    Continue,
}

/// A versioned model identifier of the form `owner/name:version`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelRef {
    pub owner: String,
    pub name: String,
    pub version: String,
}

impl ModelRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn colorizer() -> Self {
        Self::new("piddnad", "ddcolor", COLORIZE_VERSION)
    }

    pub fn restorer() -> Self {
        Self::new("tencentarc", "gfpgan", RESTORE_VERSION)
    }
}

impl FromStr for ModelRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (model, version) = s
            .split_once(':')
            .ok_or_else(|| format!("`{s}` is missing a `:version` suffix"))?;
        let (owner, name) = model
            .split_once('/')
            .ok_or_else(|| format!("`{s}` is not of the form `owner/name:version`"))?;

        if owner.is_empty() || name.is_empty() || version.is_empty() || name.contains('/') {
            return Err(format!("`{s}` is not of the form `owner/name:version`"));
        }

        Ok(Self::new(owner, name, version))
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.owner, self.name, self.version)
    }
}

fn parse_model_ref(s: &str) -> Result<ModelRef, String> {
    s.parse()
}
