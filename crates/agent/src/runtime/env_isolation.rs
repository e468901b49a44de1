// SPDX-License-Identifier: MIT

//! Environment isolation (§4.7.5): a deterministic per-thread isolated home
//! directory, plus runner-specific credential/model env overlays.

use crate::runtime::config::{AgentConfig, RunnerKind};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use xpod_core::ThreadId;

/// Wire protocol selected for the `codex` config file, per the provider
/// capability table in §6: only `api.openai.com` natively supports
/// `"responses"`, everything else (including OpenRouter) uses `"chat"`.
fn codex_wire_protocol(api_base_host: &str) -> &'static str {
    if api_base_host == "api.openai.com" {
        "responses"
    } else {
        "chat"
    }
}

/// Derives a stable directory name under the OS temp root from
/// `(runnerType, threadId, workdir)`, so restarting the same thread against
/// the same working directory reuses the same isolated home.
pub fn isolated_home_dir(runner: RunnerKind, thread_id: &ThreadId, workdir: &Path) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(format!("{runner:?}").as_bytes());
    hasher.update(b"\0");
    hasher.update(thread_id.as_str().as_bytes());
    hasher.update(b"\0");
    hasher.update(workdir.to_string_lossy().as_bytes());
    let digest = hex::encode(hasher.finalize());
    std::env::temp_dir()
        .join("xpod-agent-homes")
        .join(&digest[..24])
}

fn base_xdg_env(home: &Path) -> HashMap<String, Option<String>> {
    let mut env = HashMap::new();
    env.insert("HOME".to_string(), Some(home.to_string_lossy().into_owned()));
    env.insert(
        "XDG_CONFIG_HOME".to_string(),
        Some(home.join(".config").to_string_lossy().into_owned()),
    );
    env.insert(
        "XDG_STATE_HOME".to_string(),
        Some(home.join(".local/state").to_string_lossy().into_owned()),
    );
    env.insert(
        "XDG_DATA_HOME".to_string(),
        Some(home.join(".local/share").to_string_lossy().into_owned()),
    );
    env.insert(
        "XDG_CACHE_HOME".to_string(),
        Some(home.join(".cache").to_string_lossy().into_owned()),
    );
    env
}

fn host_of(url: &str) -> String {
    url.parse::<http_uri_lite::Uri>()
        .map(|uri| uri.host)
        .unwrap_or_default()
}

/// Minimal URL host parser: this crate deliberately avoids pulling in a
/// full URL crate for the one thing it needs — the authority's host.
mod http_uri_lite {
    pub struct Uri {
        pub host: String,
    }

    impl std::str::FromStr for Uri {
        type Err = ();

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let without_scheme = s.split_once("://").map(|(_, rest)| rest).unwrap_or(s);
            let authority = without_scheme
                .split(['/', '?', '#'])
                .next()
                .unwrap_or(without_scheme);
            let host = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
            let host = host.split(':').next().unwrap_or(host);
            Ok(Uri { host: host.to_string() })
        }
    }
}

/// Builds the isolated-home directory tree plus any files the runner needs
/// (codex's config/auth files), and returns the environment overlay to
/// apply on top of the child's base environment.
pub fn build_env_overlay(
    runner: RunnerKind,
    home: &Path,
    agent_config: Option<&AgentConfig>,
) -> std::io::Result<HashMap<String, Option<String>>> {
    if matches!(runner, RunnerKind::Codebuddy) {
        // Relies on its own local auth state; no overlay.
        return Ok(HashMap::new());
    }

    std::fs::create_dir_all(home)?;
    let mut env = base_xdg_env(home);

    let api_key = agent_config
        .and_then(|c| c.api_key.clone())
        .or_else(|| std::env::var("DEFAULT_API_KEY").ok());
    let api_base = agent_config
        .and_then(|c| c.api_base.clone())
        .or_else(|| std::env::var("DEFAULT_API_BASE").ok());
    let model = agent_config
        .and_then(|c| c.model.clone())
        .or_else(|| std::env::var("DEFAULT_MODEL").ok());

    match runner {
        RunnerKind::Codex => {
            let codex_home = home.join(".codex");
            std::fs::create_dir_all(&codex_home)?;
            let host = api_base.as_deref().map(host_of).unwrap_or_default();
            let wire_protocol = codex_wire_protocol(&host);
            let base_url = api_base.clone().unwrap_or_default();
            let model = model.clone().unwrap_or_default();
            let config_toml = format!(
                "[model_providers.xpod]\nname = \"xpod\"\nbase_url = \"{base_url}\"\nwire_api = \"{wire_protocol}\"\n\nmodel_provider = \"xpod\"\nmodel = \"{model}\"\n"
            );
            std::fs::write(codex_home.join("config.toml"), config_toml)?;
            if let Some(key) = &api_key {
                let auth_json = serde_json::json!({ "OPENAI_API_KEY": key }).to_string();
                std::fs::write(codex_home.join("auth.json"), auth_json)?;
            }
            env.insert(
                "CODEX_HOME".to_string(),
                Some(codex_home.to_string_lossy().into_owned()),
            );
        }
        RunnerKind::Claude => {
            let normalized_base = api_base
                .as_deref()
                .map(|url| url.trim_end_matches('/').trim_end_matches("/v1").to_string());
            if let Some(base) = &normalized_base {
                env.insert("ANTHROPIC_BASE_URL".to_string(), Some(base.clone()));
                let host = host_of(base);
                // OpenRouter-like hosts use a bearer auth-token form instead
                // of the native API-key header.
                if host.contains("openrouter") {
                    env.insert("ANTHROPIC_AUTH_TOKEN".to_string(), api_key.clone());
                } else {
                    env.insert("ANTHROPIC_API_KEY".to_string(), api_key.clone());
                }
            } else if let Some(key) = &api_key {
                env.insert("ANTHROPIC_API_KEY".to_string(), Some(key.clone()));
            }
            if let Some(model) = &model {
                env.insert("ANTHROPIC_DEFAULT_SONNET_MODEL".to_string(), Some(model.clone()));
                env.insert("ANTHROPIC_DEFAULT_HAIKU_MODEL".to_string(), Some(model.clone()));
                env.insert("ANTHROPIC_DEFAULT_OPUS_MODEL".to_string(), Some(model.clone()));
            }
        }
        RunnerKind::Codebuddy => unreachable!("handled above"),
    }

    Ok(env)
}
