use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use admin_tagger::enrich::{EnrichOptions, DEFAULT_GENERATOR};
use admin_tagger::LevelMapping;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub generator: String,
    pub stops_only: bool,
    pub levels: LevelMapping,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generator: DEFAULT_GENERATOR.to_string(),
            stops_only: false,
            levels: LevelMapping::default(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        Ok(config)
    }

    pub fn enrich_options(&self) -> EnrichOptions {
        EnrichOptions {
            generator: self.generator.clone(),
            stops_only: self.stops_only,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_levels() {
        let config = Config::parse(
            r#"
generator = "balsa"
stops_only = true

[levels]
municipality = 7
"#,
        )
        .unwrap();

        assert_eq!(config.generator, "balsa");
        assert!(config.stops_only);
        assert_eq!(config.levels.country, 2);
        assert_eq!(config.levels.region, 4);
        assert_eq!(config.levels.municipality, 7);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::parse("colour = \"red\"").is_err());
    }
}
