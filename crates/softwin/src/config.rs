//! Configuration system
//!
//! Window hints and presentation defaults for a [`Context`](crate::Context),
//! loadable from TOML or RON files.

use std::path::{Path, PathBuf};

pub use serde::{Deserialize, Serialize};

/// On-disk encoding of a configuration file, picked from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.ron`
    Ron,
}

impl ConfigFormat {
    /// Format for `path`, `None` for any other extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "ron" => Some(Self::Ron),
            _ => None,
        }
    }
}

/// Settings that can be read from and written to TOML or RON files
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Read settings; fields missing from the file keep their defaults
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
        let contents = std::fs::read_to_string(path)?;

        let parsed = match format {
            ConfigFormat::Toml => toml::from_str(&contents).map_err(|e| e.to_string()),
            ConfigFormat::Ron => ron::from_str(&contents).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Write settings in the format matching the extension
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;

        let contents = match format {
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| e.to_string()),
            ConfigFormat::Ron => {
                ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                    .map_err(|e| e.to_string())
            }
        }
        .map_err(ConfigError::Serialize)?;

        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Failure to read or write a configuration file
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The file contents do not describe a valid configuration
    #[error("invalid config in {}: {message}", .path.display())]
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// Parser diagnostic
        message: String,
    },

    /// The settings could not be encoded
    #[error("failed to encode config: {0}")]
    Serialize(String),

    /// The extension is neither `.toml` nor `.ron`
    #[error("unsupported config format for {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// A single window creation hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowHint {
    /// New windows get a resizable frame
    Resizable,
    /// New windows are shown immediately
    Visible,
    /// Visible new windows are raised and given input focus
    Focused,
}

/// Defaults applied to windows at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowHints {
    /// New windows get a resizable frame
    pub resizable: bool,
    /// New windows are shown immediately
    pub visible: bool,
    /// Visible new windows are raised and given input focus
    pub focused: bool,
}

impl WindowHints {
    /// All hints cleared, the state of an uninitialized context
    pub const NONE: Self = Self {
        resizable: false,
        visible: false,
        focused: false,
    };

    /// Read a single hint
    pub const fn get(&self, hint: WindowHint) -> bool {
        match hint {
            WindowHint::Resizable => self.resizable,
            WindowHint::Visible => self.visible,
            WindowHint::Focused => self.focused,
        }
    }

    /// Set a single hint
    pub fn set(&mut self, hint: WindowHint, value: bool) {
        match hint {
            WindowHint::Resizable => self.resizable = value,
            WindowHint::Visible => self.visible = value,
            WindowHint::Focused => self.focused = value,
        }
    }
}

impl Default for WindowHints {
    fn default() -> Self {
        Self {
            resizable: true,
            visible: true,
            focused: true,
        }
    }
}

/// Context-wide configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Hints installed by `init`
    pub hints: WindowHints,
    /// Background painted on resize and around the viewport, as `0x00RRGGBB`
    pub clear_color: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            hints: WindowHints::default(),
            clear_color: 0x0000_0000,
        }
    }
}

impl Config for ContextConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hints_are_all_set() {
        let config = ContextConfig::default();
        assert!(config.hints.resizable);
        assert!(config.hints.visible);
        assert!(config.hints.focused);
        assert_eq!(config.clear_color, 0);
    }

    #[test]
    fn test_hint_accessors() {
        let mut hints = WindowHints::NONE;
        hints.set(WindowHint::Visible, true);
        assert!(hints.get(WindowHint::Visible));
        assert!(!hints.get(WindowHint::Resizable));
        assert!(!hints.get(WindowHint::Focused));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ContextConfig = toml::from_str(
            "clear_color = 3355443\n[hints]\nresizable = false\n",
        )
        .unwrap();
        assert_eq!(config.clear_color, 0x33_3333);
        assert!(!config.hints.resizable);
        assert!(config.hints.visible);
    }

    #[test]
    fn test_ron_config() {
        let config: ContextConfig =
            ron::from_str("(hints: (visible: false, focused: false))").unwrap();
        assert!(config.hints.resizable);
        assert!(!config.hints.visible);
        assert!(!config.hints.focused);
    }

    #[test]
    fn test_file_round_trip_and_unsupported_format() {
        let path = std::env::temp_dir().join(format!("softwin_config_{}.toml", std::process::id()));

        let mut config = ContextConfig::default();
        config.hints.focused = false;
        config.save_to_file(&path).unwrap();
        let loaded = ContextConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);

        assert!(matches!(
            ContextConfig::default().save_to_file("softwin.json"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a/softwin.toml")), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_path(Path::new("softwin.ron")), Some(ConfigFormat::Ron));
        assert_eq!(ConfigFormat::from_path(Path::new("softwin.json")), None);
        assert_eq!(ConfigFormat::from_path(Path::new("softwin")), None);
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let path = std::env::temp_dir().join(format!("softwin_bad_{}.ron", std::process::id()));
        std::fs::write(&path, "(hints: 12)").unwrap();
        let result = ContextConfig::load_from_file(&path);
        std::fs::remove_file(&path).ok();

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("softwin_bad_"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ContextConfig::load_from_file("definitely/not/here/softwin.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
