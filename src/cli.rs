//! Command-line interface and startup configuration for Market Monitor.
//!
//! Every option can be given as a flag or through the environment (a `.env`
//! file in the working directory is loaded first). Sampling parameters may
//! also come from an optional YAML file.

use crate::api::{SUPPORTED_MODELS, SamplingParams};
use crate::error::ConfigError;
use clap::Parser;
use std::fs;

/// Command-line arguments for the Market Monitor application.
///
/// # Examples
///
/// ```sh
/// # Keys from the environment
/// SERPAPI_API_KEY=... OPENAI_API_KEY=sk-... market_monitor
///
/// # Another model and a report directory
/// market_monitor --model gpt-4o --report-dir ./relatorios
///
/// # Sampling parameters from a file
/// market_monitor --config ./sampling.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// SerpApi key used for the Google News search
    #[arg(long, env = "SERPAPI_API_KEY", hide_env_values = true)]
    pub serpapi_key: Option<String>,

    /// OpenAI API key (must start with "sk-")
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Model used for the analysis
    #[arg(long, env = "MARKET_MONITOR_MODEL")]
    pub model: Option<String>,

    /// Chat completions endpoint
    #[arg(long, env = "OPENAI_API_URL", default_value = "https://api.openai.com/v1/chat/completions")]
    pub api_url: String,

    /// News search endpoint
    #[arg(long, env = "SERPAPI_URL", default_value = "https://serpapi.com/search.json")]
    pub search_url: String,

    /// Directory where PDF reports are written
    #[arg(short, long, env = "MARKET_MONITOR_REPORT_DIR", default_value = ".")]
    pub report_dir: String,

    /// Optional path to a YAML file with sampling parameters
    #[arg(short, long)]
    pub config: Option<String>,
}

/// Validated configuration of one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub serpapi_key: String,
    pub openai_api_key: String,
    pub api_url: String,
    pub search_url: String,
    pub report_dir: String,
    pub sampling: SamplingParams,
}

impl Settings {
    /// Validate the parsed arguments.
    ///
    /// Missing credentials, a key without the `sk-` prefix, an unknown
    /// model or an unreadable config file are all fatal.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let serpapi_key = non_empty(cli.serpapi_key).ok_or(ConfigError::MissingCredential("SERPAPI_API_KEY"))?;
        let openai_api_key =
            non_empty(cli.openai_api_key).ok_or(ConfigError::MissingCredential("OPENAI_API_KEY"))?;
        if !openai_api_key.starts_with("sk-") {
            return Err(ConfigError::MalformedApiKey);
        }

        let mut sampling = match &cli.config {
            Some(path) => load_sampling(path)?,
            None => SamplingParams::default(),
        };
        if let Some(model) = cli.model {
            sampling.model = model;
        }
        if !SUPPORTED_MODELS.iter().any(|(name, _)| *name == sampling.model) {
            return Err(ConfigError::UnsupportedModel(sampling.model));
        }

        Ok(Self {
            serpapi_key,
            openai_api_key,
            api_url: cli.api_url,
            search_url: cli.search_url,
            report_dir: cli.report_dir,
            sampling,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn load_sampling(path: &str) -> Result<SamplingParams, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::ConfigFile {
        path: path.to_string(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::ConfigSyntax {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["market_monitor"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_cli_parsing() {
        let cli = parse(&[
            "--serpapi-key",
            "serp",
            "--openai-api-key",
            "sk-abc",
            "--model",
            "gpt-4o",
            "-r",
            "/tmp/relatorios",
        ]);

        assert_eq!(cli.serpapi_key.as_deref(), Some("serp"));
        assert_eq!(cli.openai_api_key.as_deref(), Some("sk-abc"));
        assert_eq!(cli.model.as_deref(), Some("gpt-4o"));
        assert_eq!(cli.report_dir, "/tmp/relatorios");
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_cli(parse(&[
            "--serpapi-key",
            "serp",
            "--openai-api-key",
            "sk-abc",
            "--model",
            "gpt-4o-mini",
        ]))
        .unwrap();
        assert_eq!(settings.sampling, SamplingParams::default());
        assert_eq!(settings.serpapi_key, "serp");
    }

    #[test]
    fn test_missing_credentials_are_fatal() {
        let mut cli = parse(&["--openai-api-key", "sk-abc"]);
        cli.serpapi_key = None;
        assert!(matches!(
            Settings::from_cli(cli),
            Err(ConfigError::MissingCredential("SERPAPI_API_KEY"))
        ));

        let mut cli = parse(&["--serpapi-key", "serp"]);
        cli.openai_api_key = Some("   ".to_string());
        assert!(matches!(
            Settings::from_cli(cli),
            Err(ConfigError::MissingCredential("OPENAI_API_KEY"))
        ));
    }

    #[test]
    fn test_api_key_prefix_check() {
        let cli = parse(&["--serpapi-key", "serp", "--openai-api-key", "pk-wrong"]);
        assert!(matches!(Settings::from_cli(cli), Err(ConfigError::MalformedApiKey)));
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let cli = parse(&[
            "--serpapi-key",
            "serp",
            "--openai-api-key",
            "sk-abc",
            "--model",
            "gpt-2",
        ]);
        assert!(matches!(
            Settings::from_cli(cli),
            Err(ConfigError::UnsupportedModel(m)) if m == "gpt-2"
        ));
    }

    #[test]
    fn test_sampling_from_yaml_file() {
        let path = std::env::temp_dir().join(format!("market_monitor_sampling_{}.yaml", std::process::id()));
        fs::write(&path, "model: gpt-4.1-nano\ntemperature: 0.5\npresence_penalty: 0.1\n").unwrap();

        let cli = parse(&[
            "--serpapi-key",
            "serp",
            "--openai-api-key",
            "sk-abc",
            "--config",
            path.to_str().unwrap(),
        ]);
        let mut cli = cli;
        cli.model = None;
        let settings = Settings::from_cli(cli).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(settings.sampling.model, "gpt-4.1-nano");
        assert!((settings.sampling.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(settings.sampling.max_tokens, 4000);
        assert_eq!(settings.sampling.presence_penalty, Some(0.1));
    }

    #[test]
    fn test_missing_config_file() {
        let cli = parse(&[
            "--serpapi-key",
            "serp",
            "--openai-api-key",
            "sk-abc",
            "--config",
            "/nonexistent/sampling.yaml",
        ]);
        assert!(matches!(Settings::from_cli(cli), Err(ConfigError::ConfigFile { .. })));
    }
}
