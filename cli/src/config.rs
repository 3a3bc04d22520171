use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;
use thiserror::Error;

/// Looked up next to the input file when no `--config` is given.
pub const CONFIG_FILE: &str = "refdoc.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Html,
    Text,
}

impl From<OutputFormat> for render::Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Markdown => render::Format::Markdown,
            OutputFormat::Html => render::Format::Html,
            OutputFormat::Text => render::Format::Text,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub render: RenderConfig,
}

/// `[render]` table. Unset keys fall back to command-line defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    #[serde(default)]
    pub format: Option<OutputFormat>,

    /// Include the table of contents in rendered output.
    #[serde(default)]
    pub toc: Option<bool>,

    /// Section nesting depth listed in the table of contents.
    #[serde(default)]
    pub toc_depth: Option<usize>,

    /// Wrap HTML output in a full page.
    #[serde(default)]
    pub standalone: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Use `explicit` when given, else `refdoc.toml` beside `input` if it
    /// exists, else defaults.
    pub fn discover(explicit: Option<&Path>, input: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = input
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(CONFIG_FILE);
        if candidate.is_file() {
            info!("using config {}", candidate.display());
            Self::load(&candidate)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_render_table() {
        let config: Config =
            toml::from_str("[render]\nformat = \"html\"\ntoc = true\ntoc_depth = 2\n").unwrap();
        assert_eq!(config.render.format, Some(OutputFormat::Html));
        assert_eq!(config.render.toc, Some(true));
        assert_eq!(config.render.toc_depth, Some(2));
        assert_eq!(config.render.standalone, None);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(toml::from_str::<Config>("[render]\ncolour = \"red\"\n").is_err());
    }

    #[test]
    fn discovers_file_beside_input() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[render]\nformat = \"text\"\n").unwrap();
        let input = dir.path().join("doc.md");

        let config = Config::discover(None, &input).unwrap();
        assert_eq!(config.render.format, Some(OutputFormat::Text));
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::discover(None, &dir.path().join("doc.md")).unwrap();
        assert_eq!(config.render.format, None);
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::discover(Some(&dir.path().join("nope.toml")), Path::new("doc.md"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
