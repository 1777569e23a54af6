//! Host-supplied check settings.
//!
//! The language-server host hands these over as JSON; the maps extend the
//! built-in catalogues. Unknown action strings are skipped so an old client
//! talking to a newer server never aborts a check.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_language() -> String {
    "en-US".to_string()
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckSettings {
    /// BCP-47-like tag used by the dummy generator (e.g. `en-US`, `fr`).
    pub language_short_code: String,
    /// Command prototype → action (`default`, `ignore`, `dummy`,
    /// `pluralDummy`).
    pub latex_commands: BTreeMap<String, String>,
    /// Environment name → action (`default`, `ignore`).
    pub latex_environments: BTreeMap<String, String>,
    /// Markdown node kind → action (`default`, `ignore`, `dummy`,
    /// `pluralDummy`).
    pub markdown_nodes: BTreeMap<String, String>,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            language_short_code: default_language(),
            latex_commands: BTreeMap::new(),
            latex_environments: BTreeMap::new(),
            markdown_nodes: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_language() {
        let settings = CheckSettings::default();
        assert_eq!(settings.language_short_code, "en-US");
        assert!(settings.latex_commands.is_empty());
    }

    #[test]
    fn test_deserialize_from_json() {
        let settings: CheckSettings = serde_json::from_str(
            r#"{
                "languageShortCode": "de-DE",
                "latexCommands": {"\\todoinline{}": "ignore"},
                "latexEnvironments": {"minted": "ignore"}
            }"#,
        )
        .expect("valid settings JSON");
        assert_eq!(settings.language_short_code, "de-DE");
        assert_eq!(
            settings.latex_commands.get("\\todoinline{}").map(String::as_str),
            Some("ignore")
        );
        assert!(settings.markdown_nodes.is_empty());
    }
}
