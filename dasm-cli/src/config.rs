//! Optional TOML config for `run`'s resource limits and sandbox paths.
//! Explicit CLI flags always override a value the config file sets.

use std::path::Path;

use serde::Deserialize;

use crate::error::CliError;

#[derive(Debug, Default, Deserialize)]
pub struct RunConfig {
    pub max_steps: Option<u64>,
    pub memory_limit: Option<u64>,
    #[serde(default)]
    pub sandbox: Vec<String>,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<RunConfig, CliError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn merge_with_flags(
        mut self,
        max_steps: Option<u64>,
        memory_limit: Option<u64>,
        sandbox: Vec<String>,
    ) -> RunConfig {
        if let Some(n) = max_steps {
            self.max_steps = Some(n);
        }
        if let Some(n) = memory_limit {
            self.memory_limit = Some(n);
        }
        if !sandbox.is_empty() {
            self.sandbox = sandbox;
        }
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flags_override_config_values() {
        let config = RunConfig { max_steps: Some(10), memory_limit: Some(1000), sandbox: vec![] };
        let merged = config.merge_with_flags(Some(20), None, vec!["/data".into()]);
        assert_eq!(merged.max_steps, Some(20));
        assert_eq!(merged.memory_limit, Some(1000));
        assert_eq!(merged.sandbox, vec!["/data".to_string()]);
    }

    #[test]
    fn parses_a_minimal_toml_file() {
        let toml_text = "max_steps = 500\nmemory_limit = 1048576\nsandbox = [\"/data\"]\n";
        let config: RunConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.max_steps, Some(500));
        assert_eq!(config.sandbox, vec!["/data".to_string()]);
    }
}
