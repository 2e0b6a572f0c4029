use std::{
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::ChatgateConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] =
    &["chatgate.toml", "chatgate.yaml", "chatgate.yml", "chatgate.json"];

fn config_dir_override() -> &'static Mutex<Option<PathBuf>> {
    static OVERRIDE: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();
    OVERRIDE.get_or_init(|| Mutex::new(None))
}

fn data_dir_override() -> &'static Mutex<Option<PathBuf>> {
    static OVERRIDE: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();
    OVERRIDE.get_or_init(|| Mutex::new(None))
}

/// Override the user-global config directory (e.g. `--config-dir` CLI flag).
pub fn set_config_dir(path: PathBuf) {
    *config_dir_override().lock().unwrap_or_else(|e| e.into_inner()) = Some(path);
}

/// Override the user-global data directory (e.g. `--data-dir` CLI flag).
pub fn set_data_dir(path: PathBuf) {
    *data_dir_override().lock().unwrap_or_else(|e| e.into_inner()) = Some(path);
}

/// Returns the user-global config directory (`~/.config/chatgate/`), or the
/// override set via [`set_config_dir`].
pub fn config_dir() -> Option<PathBuf> {
    if let Some(p) = config_dir_override().lock().unwrap_or_else(|e| e.into_inner()).clone() {
        return Some(p);
    }
    directories::ProjectDirs::from("", "", "chatgate").map(|d| d.config_dir().to_path_buf())
}

/// Returns the user-global data directory (`~/.local/share/chatgate/`), or
/// the override set via [`set_data_dir`].
pub fn data_dir() -> Option<PathBuf> {
    if let Some(p) = data_dir_override().lock().unwrap_or_else(|e| e.into_inner()).clone() {
        return Some(p);
    }
    directories::ProjectDirs::from("", "", "chatgate").map(|d| d.data_dir().to_path_buf())
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<ChatgateConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./chatgate.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/chatgate/chatgate.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ChatgateConfig::default()` if no config file is found.
pub fn discover_and_load() -> ChatgateConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    ChatgateConfig::default()
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("chatgate.toml")
}

/// Serialize `config` to TOML and write it to the user-global config path.
///
/// Creates parent directories if needed. Returns the path written to.
pub fn save_config(config: &ChatgateConfig) -> anyhow::Result<PathBuf> {
    let path = find_or_default_config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))?;
    std::fs::write(&path, toml_str)?;
    debug!(path = %path.display(), "saved config");
    Ok(path)
}

/// Load the current config (or defaults), apply `mutate`, and save it back.
pub fn update_config(
    mutate: impl FnOnce(&mut ChatgateConfig),
) -> anyhow::Result<PathBuf> {
    let mut cfg = if let Some(path) = find_config_file() {
        load_config(&path)?
    } else {
        ChatgateConfig::default()
    };
    mutate(&mut cfg);
    save_config(&cfg)
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ChatgateConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_config_round_trips_through_override_dir() {
        let tmp = tempfile::tempdir().unwrap();
        set_config_dir(tmp.path().to_path_buf());

        let path = update_config(|cfg| {
            cfg.server.port = 9999;
        })
        .unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.server.port, 9999);
    }

    #[test]
    fn discover_and_load_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        set_config_dir(tmp.path().to_path_buf());
        let cfg = discover_and_load();
        assert_eq!(cfg.server.port, ChatgateConfig::default().server.port);
    }
}
