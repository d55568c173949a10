//! Token command handlers.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{Map, Value};

use zn_api::client::resolve_base_url;
use zn_api::token;

use crate::cli::{GlobalOpts, TokenArgs, TokenCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

/// What the token says about itself. The token itself is never printed.
#[derive(Debug, Serialize)]
struct TokenInfo {
    audience: Option<String>,
    /// Host requests are sent to, after `--base-url` / profile overrides.
    routes_to: String,
    expires_at: Option<DateTime<Utc>>,
    expired: bool,
    claims: Map<String, Value>,
}

pub fn handle(args: TokenArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        TokenCommand::Decode { token: explicit } => {
            let cfg = zn_config::load_config_or_default();
            let (profile_name, profile) = config::active_profile(global, &cfg)?;
            let secret = match explicit {
                Some(raw) => SecretString::from(raw),
                None => config::resolve_api_key(global, &profile, &profile_name)?,
            };
            let raw = secret.expose_secret();

            let claims = token::decode_claims(raw)?;
            let expires_at = token::expires_at(&claims);
            let base_override = global.base_url.as_deref().or(profile.base_url.as_deref());
            let info = TokenInfo {
                audience: token::audience(&claims),
                routes_to: resolve_base_url(base_override, raw),
                expired: expires_at.is_some_and(|at| at <= Utc::now()),
                expires_at,
                claims,
            };

            let out = output::render_single(&global.output, &info, detail, |i| i.routes_to.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

fn detail(info: &TokenInfo) -> String {
    let mut pairs = vec![
        ("Audience", output::or_dash(info.audience.as_deref())),
        ("Routes to", info.routes_to.clone()),
        (
            "Expires",
            output::or_dash(info.expires_at.map(|at| at.to_rfc3339())),
        ),
    ];
    if info.expired {
        pairs.push(("Status", "EXPIRED".into()));
    }
    let mut keys: Vec<&String> = info.claims.keys().collect();
    keys.sort();
    let claims = keys
        .into_iter()
        .map(|k| format!("{k}={}", info.claims[k]))
        .collect::<Vec<_>>()
        .join(", ");
    pairs.push(("Claims", claims));
    output::detail_lines(&pairs)
}
