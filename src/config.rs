//! Settings read from the configuration file and the command line

use crate::external::display::{Brightness, Output};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Which [crate::external::display::DisplayBackend] drives the displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ArgEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The xrandr utility
    Xrandr,
    /// Simulated outputs, nothing is changed
    Mock,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub backend: BackendKind,
    pub xrandr_path: PathBuf,
    /// How far a single nudge moves the slider
    pub nudge_step: f64,
    /// Assumed when the current brightness can't be read
    pub fallback_brightness: f64,
    pub mock: MockConfig,
}

/// Outputs simulated by the mock backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MockConfig {
    pub outputs: Vec<Output>,
    pub brightness: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: BackendKind::Xrandr,
            xrandr_path: PathBuf::from("xrandr"),
            nudge_step: 0.05,
            fallback_brightness: Brightness::DEFAULT.value(),
            mock: MockConfig::default(),
        }
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        MockConfig {
            outputs: vec!["eDP-1".to_owned(), "HDMI-1".to_owned()],
            brightness: Brightness::DEFAULT.value(),
        }
    }
}

impl Config {
    /// Parse and validate the contents of a configuration file
    pub fn parse(contents: &str) -> Result<Config> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration from `path`, or from the default location when
    /// no path is given.
    ///
    /// An explicitly given file has to exist, a missing file in the default
    /// location just means default settings.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = match path {
            Some(path) => path.to_owned(),
            None => match default_path().filter(|p| p.exists()) {
                Some(path) => path,
                None => {
                    log::debug!("No configuration file found, using defaults");
                    return Ok(Config::default());
                }
            },
        };
        log::debug!("Loading configuration from {}", path.display());
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Couldn't read configuration file {}", path.display()))?;
        Config::parse(&contents)
            .with_context(|| format!("Invalid configuration file {}", path.display()))
    }

    pub fn fallback_brightness(&self) -> Brightness {
        // Validated to be finite, so this can only clamp
        Brightness::from_control(self.fallback_brightness).unwrap_or(Brightness::DEFAULT)
    }

    pub fn mock_brightness(&self) -> Brightness {
        Brightness::from_control(self.mock.brightness).unwrap_or(Brightness::DEFAULT)
    }

    fn validate(&self) -> Result<()> {
        if !self.nudge_step.is_finite() || self.nudge_step <= 0.0 || self.nudge_step > 1.0 {
            bail!(
                "nudge_step has to be within (0, 1], got {}",
                self.nudge_step
            );
        }
        Brightness::from_control(self.fallback_brightness).context("fallback_brightness")?;
        Brightness::new(self.mock.brightness).context("mock.brightness")?;
        Ok(())
    }
}

/// `$XDG_CONFIG_HOME/dimmer/config.toml`, falling back to `~/.config`
pub fn default_path() -> Option<PathBuf> {
    let base = env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("dimmer").join("config.toml"))
}
