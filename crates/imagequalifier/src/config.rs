use camino::{Utf8Path, Utf8PathBuf};
use image_qualify::{LoadError, Rule, RuleDefinition, RuleError, RuleSet, load_definitions};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("configuration error in {path}")]
pub(crate) struct ConfigError {
    /// The path to the rules file that caused this error.
    path: Utf8PathBuf,
    /// The source of this error.
    #[source]
    pub(crate) source: ConfigErrorInner,
}

#[derive(Error, Debug)]
pub(crate) enum ConfigErrorInner {
    /// An I/O error occurred while loading the input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML rules file is syntactically invalid.
    #[error("invalid configuration syntax")]
    Syntax(#[source] serde_yaml::Error),

    /// A rule in the YAML rules file is semantically invalid.
    #[error("invalid rule at index {index}")]
    Rule {
        index: usize,
        #[source]
        source: RuleError,
    },

    /// The line-oriented rules file couldn't be loaded.
    #[error("invalid rule definitions")]
    Definitions(#[source] LoadError),
}

/// The structured (YAML) form of a rules file.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    rules: Option<Vec<RuleDefinition>>,
}

impl RawConfig {
    fn load(contents: &str) -> Result<Self, ConfigErrorInner> {
        // An empty document is an empty configuration.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(contents).map_err(ConfigErrorInner::Syntax)
    }
}

/// How a rules file is laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    /// `<pattern> <domain>` per line.
    Lines,
    /// A YAML document with a `rules` list.
    Yaml,
}

impl Format {
    fn for_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some("yml" | "yaml") => Format::Yaml,
            _ => Format::Lines,
        }
    }
}

/// The loaded, prioritized rules.
#[derive(Clone, Debug, Default)]
pub(crate) struct Config {
    pub(crate) rules: RuleSet,
}

impl Config {
    /// Loads a [`Config`] from the given YAML contents.
    fn load_yaml(contents: &str) -> Result<Self, ConfigErrorInner> {
        let raw = RawConfig::load(contents)?;

        let rules = raw
            .rules
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, definition)| {
                Rule::try_from(definition).map_err(|source| ConfigErrorInner::Rule { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules: image_qualify::prioritize(rules),
        })
    }

    /// Loads a [`Config`] from the rules file at `path`, picking the
    /// format from the file's extension.
    pub(crate) fn from_path(path: &Utf8Path) -> Result<Self, ConfigError> {
        let format = Format::for_path(path);
        tracing::debug!("loading {format:?} rules from {path}");

        let config = match format {
            Format::Yaml => std::fs::read_to_string(path)
                .map_err(ConfigErrorInner::from)
                .and_then(|contents| Self::load_yaml(&contents)),
            Format::Lines => load_definitions(path)
                .map(|rules| Self {
                    rules: image_qualify::prioritize(rules),
                })
                .map_err(ConfigErrorInner::Definitions),
        };

        config.map_err(|source| ConfigError {
            path: path.into(),
            source,
        })
    }
}
