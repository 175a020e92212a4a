//! `mender policy` — Show the repair policy for a target.

use mender_config::AppConfig;
use mender_core::Result;
use mender_repair::{ProviderFamily, TranscriptPreparer};

use super::TargetArgs;

pub fn run(args: &TargetArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let target = args.resolve(&config);
    let preparer = TranscriptPreparer::new(config.transcript.overrides);
    let policy = preparer.policy_for(&target.api, &target.provider, &target.model);

    tracing::debug!(
        api = %target.api,
        provider = %target.provider,
        model = %target.model,
        family = ?ProviderFamily::classify(&target.provider),
        active = policy.is_active(),
        "Resolved transcript policy"
    );
    if !preparer.overrides().is_empty() {
        tracing::info!(overrides = ?preparer.overrides(), "Config overrides applied");
    }

    println!("{}", serde_json::to_string_pretty(&policy)?);
    Ok(())
}
