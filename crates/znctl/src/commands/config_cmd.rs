//! Config subcommand handlers.

use dialoguer::{Input, Select};
use secrecy::SecretString;

use zn_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of `cfg` with plaintext secrets masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some(REDACTED.into());
        }
    }
    cfg
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    names.sort();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

/// Where the wizard puts the API key.
enum KeyStorage {
    Keyring,
    Plaintext,
    EnvVar(String),
}

fn prompt_key_storage() -> Result<KeyStorage, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Read from an environment variable",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the API key?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    Ok(match selection {
        0 => KeyStorage::Keyring,
        1 => {
            let var: String = Input::new()
                .with_prompt("Environment variable")
                .default("ZN_API_KEY".into())
                .interact_text()
                .map_err(prompt_err)?;
            KeyStorage::EnvVar(var.trim().to_owned())
        }
        _ => KeyStorage::Plaintext,
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = redacted(&zn_config::load_config_or_default());
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)?,
                _ => output::render_single(&global.output, &cfg, |_| String::new(), |_| {
                    String::new()
                })?,
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", zn_config::config_path().display());
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = zn_config::load_config_or_default();
            let default = cfg.active_profile_name(None);
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: znctl config init");
                return Ok(());
            }
            let mut names: Vec<_> = cfg.profiles.keys().collect();
            names.sort();
            for name in names {
                let marker = if *name == default { " *" } else { "" };
                println!("{name}{marker}");
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = zn_config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            zn_config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }
    }
}

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = zn_config::config_path();
    eprintln!("znctl configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // 1. Profile name
    let default_name = global
        .profile
        .clone()
        .unwrap_or_else(|| zn_config::DEFAULT_PROFILE.into());
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(default_name)
        .interact_text()
        .map_err(prompt_err)?;

    // 2. API key, checked locally before anything is stored
    let key = rpassword::prompt_password("API key: ").map_err(prompt_err)?;
    let key = key.trim().to_owned();
    if key.is_empty() {
        return Err(CliError::Validation {
            field: "api_key".into(),
            reason: "API key cannot be empty".into(),
        });
    }
    let claims = zn_api::token::decode_claims(&key)?;
    let token_host = zn_api::token::base_url_from_token(&key)?;
    if let Some(aud) = zn_api::token::audience(&claims) {
        eprintln!("   Token audience: {aud}");
    }

    // 3. Portal host, blank keeps the one derived from the token
    let base_url: String = Input::new()
        .with_prompt(format!("Portal URL (blank for {token_host})"))
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    let base_url = Some(base_url.trim().to_owned()).filter(|u| !u.is_empty());

    // 4. Key storage
    let mut profile = Profile {
        base_url,
        ..Profile::default()
    };
    match prompt_key_storage()? {
        KeyStorage::Keyring => {
            zn_config::store_api_key(&profile_name, &SecretString::from(key))?;
            eprintln!("   ✓ API key stored in system keyring");
        }
        KeyStorage::EnvVar(var) => {
            if std::env::var(&var).ok().as_deref().map(str::trim) != Some(key.as_str()) {
                eprintln!("   Remember to export {var} before running znctl");
            }
            profile.api_key_env = Some(var);
        }
        KeyStorage::Plaintext => profile.api_key = Some(key),
    }

    // 5. Merge into the existing file
    let mut cfg = zn_config::load_config_or_default();
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    let written = zn_config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", written.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: znctl assets list --page-size 10");
    Ok(())
}
