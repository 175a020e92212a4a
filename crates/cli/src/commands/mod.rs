//! Subcommand implementations.

pub mod config_cmd;
pub mod policy;
pub mod repair;

use clap::Args;
use mender_config::AppConfig;

/// The request a transcript is being prepared for. Unset fields fall back to
/// the configured defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct TargetArgs {
    /// Model API family (e.g. "openai-completions", "google-generative-ai")
    #[arg(long)]
    pub api: Option<String>,

    /// Provider id (e.g. "google", "github-copilot", "openrouter")
    #[arg(long)]
    pub provider: Option<String>,

    /// Model id (e.g. "gemini-2.5-pro")
    #[arg(long)]
    pub model: Option<String>,
}

/// A fully resolved target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub api: String,
    pub provider: String,
    pub model: String,
}

impl TargetArgs {
    pub fn resolve(&self, config: &AppConfig) -> Target {
        Target {
            api: self.api.clone().unwrap_or_else(|| config.default_model_api.clone()),
            provider: self
                .provider
                .clone()
                .unwrap_or_else(|| config.default_provider.clone()),
            model: self.model.clone().unwrap_or_else(|| config.default_model.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_falls_back_to_config() {
        let config = AppConfig::default();
        let args = TargetArgs {
            provider: Some("google".into()),
            ..TargetArgs::default()
        };
        let target = args.resolve(&config);
        assert_eq!(target.provider, "google");
        assert_eq!(target.api, config.default_model_api);
        assert_eq!(target.model, config.default_model);
    }
}
