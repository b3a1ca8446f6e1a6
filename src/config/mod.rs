use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use toml::map::Entry;
use tracing::warn;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub menu: MenuConfig,
    pub submenu: SubMenuConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuConfig {
    /// Hide the menu when the pointer leaves its box.
    #[serde(default)]
    pub hide_on_leave: bool,
    /// Hide the menu when the document scrolls.
    #[serde(default = "default_hide_on_scroll")]
    pub hide_on_scroll: bool,
    /// Sub-menu open/close debounce in milliseconds.
    #[serde(default = "default_hover_delay_ms")]
    pub hover_delay_ms: u64,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            hide_on_leave: false,
            hide_on_scroll: default_hide_on_scroll(),
            hover_delay_ms: default_hover_delay_ms(),
        }
    }
}

fn default_hide_on_scroll() -> bool {
    true
}

fn default_hover_delay_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubMenuConfig {
    /// Lay sub-menus out right-to-left.
    #[serde(default)]
    pub rtl: bool,
}

/// Runtime options of a mounted menu.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuOptions {
    pub hide_on_leave: bool,
    pub hide_on_scroll: bool,
    pub hover_delay: Duration,
    pub rtl: bool,
}

impl Default for MenuOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for MenuOptions {
    fn from(config: &Config) -> Self {
        Self {
            hide_on_leave: config.menu.hide_on_leave,
            hide_on_scroll: config.menu.hide_on_scroll,
            hover_delay: Duration::from_millis(config.menu.hover_delay_ms),
            rtl: config.submenu.rtl,
        }
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

const LOCAL_CONFIG: &str = "popmenu.toml";

impl Config {
    pub fn with<R>(f: impl FnOnce(&Config) -> R) -> R {
        let config = CONFIG.get_or_init(Config::init);
        f(config)
    }

    fn init() -> Self {
        let mut candidates = Vec::new();
        // lowest priority first
        candidates.extend(get_system_config_path());
        candidates.extend(get_user_config_path());
        candidates.push(PathBuf::from(LOCAL_CONFIG));

        let config = Self::layered(&candidates);
        tracing::info!("Config initialized: {:?}", config.menu);
        config
    }

    /// Merge every readable file in `paths` over the defaults, later files
    /// winning key by key. Unparsable files are skipped.
    pub fn layered(paths: &[PathBuf]) -> Self {
        let mut merged = match toml::Value::try_from(Self::default()) {
            Ok(value) => value,
            Err(err) => {
                warn!("Failed to serialize default config: {err}");
                return Self::default();
            }
        };

        let mut found_any_config = false;
        for path in paths {
            let Ok(content) = std::fs::read_to_string(path) else {
                continue;
            };
            match content.parse::<toml::Value>() {
                Ok(value) => {
                    merge_value(&mut merged, value);
                    found_any_config = true;
                    tracing::info!("Loaded config from {}", path.display());
                }
                Err(err) => warn!("Failed to parse {}: {err}", path.display()),
            }
        }

        if !found_any_config {
            tracing::debug!("No configuration file found, using default config");
        }

        merged.try_into().unwrap_or_else(|err| {
            warn!("Falling back to default config due to invalid overrides: {err}");
            Self::default()
        })
    }

    /// Load a single file, failing loudly.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn options(&self) -> MenuOptions {
        MenuOptions::from(self)
    }
}

fn merge_value(base: &mut toml::Value, overrides: toml::Value) {
    match (base, overrides) {
        (toml::Value::Table(base_map), toml::Value::Table(override_map)) => {
            for (key, override_value) in override_map {
                match base_map.entry(key) {
                    Entry::Occupied(mut entry) => merge_value(entry.get_mut(), override_value),
                    Entry::Vacant(entry) => {
                        entry.insert(override_value);
                    }
                }
            }
        }
        (base_value, override_value) => {
            *base_value = override_value;
        }
    }
}

fn get_system_config_path() -> Option<PathBuf> {
    let path = PathBuf::from("/etc/popmenu/config.toml");
    if path.exists() {
        Some(path)
    } else {
        None
    }
}

fn get_user_config_path() -> Option<PathBuf> {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".config"))
        })?;

    let path = config_dir.join("popmenu").join("config.toml");
    if path.exists() {
        Some(path)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;

    #[test]
    fn defaults_match_documented_options() {
        let options = MenuOptions::default();
        assert!(!options.hide_on_leave);
        assert!(options.hide_on_scroll);
        assert_eq!(options.hover_delay, Duration::from_millis(500));
        assert!(!options.rtl);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [menu]
            hide_on_leave = true
        "#,
        )
        .expect("Config should deserialize");
        assert!(config.menu.hide_on_leave);
        assert!(config.menu.hide_on_scroll);
        assert_eq!(config.menu.hover_delay_ms, 500);
    }

    #[test]
    fn test_config_merge_priority() {
        let mut base =
            toml::Value::try_from(Config::default()).expect("default config is valid toml");

        let override_value: toml::Value = r#"
            [menu]
            hover_delay_ms = 150
            [submenu]
            rtl = true
        "#
        .parse()
        .unwrap();

        merge_value(&mut base, override_value);

        let config: Config = base.try_into().unwrap();
        assert_eq!(config.menu.hover_delay_ms, 150);
        assert!(config.submenu.rtl);
        assert!(config.menu.hide_on_scroll);
    }

    #[test]
    fn layered_files_override_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let low = dir.path().join("low.toml");
        let high = dir.path().join("high.toml");
        let broken = dir.path().join("broken.toml");
        fs::write(&low, "[menu]\nhover_delay_ms = 100\nhide_on_leave = true\n").unwrap();
        fs::write(&high, "[menu]\nhover_delay_ms = 200\n").unwrap();
        fs::write(&broken, "[menu\n").unwrap();

        let config = Config::layered(&[low, broken, high, dir.path().join("missing.toml")]);
        assert_eq!(config.menu.hover_delay_ms, 200);
        assert!(config.menu.hide_on_leave);
    }

    #[test]
    fn invalid_types_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[menu]\nhover_delay_ms = \"slow\"\n").unwrap();

        assert_eq!(Config::layered(&[path.clone()]), Config::default());
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn load_from_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    #[serial]
    fn test_get_user_config_path_with_xdg_config_home() {
        let temp_dir = tempfile::tempdir().unwrap();

        let old_xdg = env::var("XDG_CONFIG_HOME").ok();
        env::set_var("XDG_CONFIG_HOME", temp_dir.path());

        let config_dir = temp_dir.path().join("popmenu");
        fs::create_dir_all(&config_dir).unwrap();
        let config_file = config_dir.join("config.toml");
        fs::write(&config_file, "# test config").unwrap();

        let path = get_user_config_path();
        assert_eq!(path, Some(config_file));

        if let Some(old) = old_xdg {
            env::set_var("XDG_CONFIG_HOME", old);
        } else {
            env::remove_var("XDG_CONFIG_HOME");
        }
    }

    #[test]
    #[serial]
    fn test_get_user_config_path_without_file() {
        let temp_dir = tempfile::tempdir().unwrap();

        let old_xdg = env::var("XDG_CONFIG_HOME").ok();
        env::set_var("XDG_CONFIG_HOME", temp_dir.path());

        assert!(get_user_config_path().is_none());

        if let Some(old) = old_xdg {
            env::set_var("XDG_CONFIG_HOME", old);
        } else {
            env::remove_var("XDG_CONFIG_HOME");
        }
    }
}
