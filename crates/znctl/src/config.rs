//! CLI-side configuration: flag overrides on top of `zn_config` profiles,
//! and construction of the API client.

use std::time::Duration;

use secrecy::SecretString;

use zn_api::{RetryPolicy, ZnClient};
use zn_config::{Config, Profile};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a command needs to talk to one tenant.
#[derive(Debug)]
pub struct Session {
    pub client: ZnClient,
    pub profile: Profile,
}

/// Look up the active profile. A missing profile is only an error when it
/// was asked for explicitly and others exist; otherwise defaults apply.
pub fn active_profile(global: &GlobalOpts, cfg: &Config) -> Result<(String, Profile), CliError> {
    let name = cfg.active_profile_name(global.profile.as_deref());
    if let Some(profile) = cfg.profiles.get(&name) {
        return Ok((name, profile.clone()));
    }
    if global.profile.is_some() && !cfg.profiles.is_empty() {
        let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
        available.sort();
        return Err(CliError::ProfileNotFound {
            name,
            available: available.join(", "),
        });
    }
    Ok((name, Profile::default()))
}

/// Resolve the API key: `--api-key` / `ZN_API_KEY`, then the profile chain.
pub fn resolve_api_key(
    global: &GlobalOpts,
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, CliError> {
    if let Some(ref key) = global.api_key {
        if !key.trim().is_empty() {
            return Ok(SecretString::from(key.clone()));
        }
    }
    Ok(zn_config::resolve_api_key(profile, profile_name)?)
}

/// Build a client from the config file, profile, and CLI overrides.
pub fn build_session(global: &GlobalOpts) -> Result<Session, CliError> {
    let cfg = zn_config::load_config_or_default();
    let (profile_name, profile) = active_profile(global, &cfg)?;
    let api_key = resolve_api_key(global, &profile, &profile_name)?;

    let mut transport = profile.transport(&cfg.defaults);
    if let Some(secs) = global.timeout {
        transport = transport.with_timeout(Duration::from_secs(secs));
    }
    let base_url = global.base_url.as_deref().or(profile.base_url.as_deref());
    let client = ZnClient::from_api_key(&api_key, base_url, &transport)?;
    tracing::debug!(profile = %profile_name, base_url = %client.base_url(), "session ready");

    Ok(Session { client, profile })
}

impl Session {
    /// Retry policy for batch chunks: the profile's attempt count.
    pub fn batch_retry(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.profile.retries, Duration::ZERO)
    }
}
