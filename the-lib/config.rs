//! Frontend configuration.
//!
//! Parsed from TOML; reading the file is left to the caller. Every section and key is optional; unknown keys are
//! rejected so typos surface instead of silently falling back to defaults.
//!
//! ```toml
//! [layout]
//! width = 120
//! height = 40
//! min-extent = 4
//!
//! [scroll]
//! margin = 3
//! ```

use serde::Deserialize;
use thiserror::Error;

use crate::graphics::Rect;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
  #[error("failed to parse config: {0}")]
  BadConfig(#[from] toml::de::Error),
  #[error("invalid config: {0}")]
  Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
  pub layout: LayoutConfig,
  pub scroll: ScrollConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct LayoutConfig {
  /// Initial outer area, in cells.
  pub width:      u16,
  pub height:     u16,
  /// Smallest extent a manual resize may shrink a frame to.
  pub min_extent: u16,
}

impl Default for LayoutConfig {
  fn default() -> Self {
    Self {
      width:      80,
      height:     24,
      min_extent: 1,
    }
  }
}

impl LayoutConfig {
  pub fn area(&self) -> Rect {
    Rect::new(0, 0, self.width, self.height)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ScrollConfig {
  /// Rows kept visible above and below the cursor.
  pub margin: usize,
}

impl Config {
  pub fn from_toml(source: &str) -> Result<Self> {
    let config: Config = toml::from_str(source)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    if self.layout.min_extent == 0 {
      return Err(ConfigError::Invalid(
        "layout.min-extent must be at least 1".into(),
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_source_gives_defaults() {
    let config = Config::from_toml("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.layout.area(), Rect::new(0, 0, 80, 24));
    assert_eq!(config.layout.min_extent, 1);
  }

  #[test]
  fn partial_sections_keep_defaults() {
    let config = Config::from_toml("[layout]\nmin-extent = 4\n\n[scroll]\nmargin = 3\n").unwrap();
    assert_eq!(config.layout.min_extent, 4);
    assert_eq!(config.layout.width, 80);
    assert_eq!(config.scroll.margin, 3);
  }

  #[test]
  fn unknown_keys_are_rejected() {
    let err = Config::from_toml("[layout]\nmin_extent = 4\n").unwrap_err();
    assert!(matches!(err, ConfigError::BadConfig(_)));
  }

  #[test]
  fn zero_min_extent_is_invalid() {
    let err = Config::from_toml("[layout]\nmin-extent = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
  }
}
