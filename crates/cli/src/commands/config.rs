use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use finmate_core::config::{AppConfig, ConfigSummary, LoadOptions};
use serde::Serialize;
use toml::Value;

use crate::commands::CommandResult;

/// Config keys with the environment variables that can set them, first match wins.
const FIELDS: [(&str, &[&str]); 4] = [
    ("advisor.max_slot_asks", &["FINMATE_ADVISOR_MAX_SLOT_ASKS"]),
    ("advisor.candidate_count", &["FINMATE_ADVISOR_CANDIDATE_COUNT"]),
    ("logging.level", &["FINMATE_LOGGING_LEVEL", "FINMATE_LOG_LEVEL"]),
    ("logging.format", &["FINMATE_LOGGING_FORMAT", "FINMATE_LOG_FORMAT"]),
];

#[derive(Debug, Serialize)]
struct EffectiveConfig {
    precedence: &'static str,
    config_file: Option<String>,
    effective: ConfigSummary,
    sources: BTreeMap<&'static str, String>,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let sources = FIELDS
        .iter()
        .map(|(key_path, env_keys)| {
            let source = field_source(
                key_path,
                env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            );
            (*key_path, source)
        })
        .collect();

    CommandResult::document(
        "config",
        &EffectiveConfig {
            precedence: "env > file > default",
            config_file: config_file_path.map(|path| path.display().to_string()),
            effective: config.summary(),
            sources,
        },
    )
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("finmate.toml"), PathBuf::from("config/finmate.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
