//! 🔧 App Configuration: env vars and an optional TOML file, folded into one struct.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." (every developer at 3am) 🦆
//!
//! Layering, lowest to highest:
//! 1. `OPENSEARCH_URL` / `OPENSEARCH_USERNAME` / `OPENSEARCH_PASSWORD`, the three
//!    variables every deployment of this thing has always been given. Taken
//!    verbatim: a password of `0123` stays `0123`, not the number 123.
//! 2. `AVL_*`, with `__` for nesting (`AVL_PIPELINE__INDEX=products`)
//! 3. the TOML file, if one was passed. TOML wins on conflicts.

use std::path::Path;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::backends::{LocalBucketConfig, OpenSearchSinkConfig};
use crate::supervisors::config::PipelineConfig;

/// 🔑 The classic trio and where each lands. `Env` would parse these into numbers
/// and booleans when they look like one, so they're read as plain strings.
const OPENSEARCH_ENV: [(&str, &str); 3] = [
    ("OPENSEARCH_URL", "opensearch.url"),
    ("OPENSEARCH_USERNAME", "opensearch.username"),
    ("OPENSEARCH_PASSWORD", "opensearch.password"),
];

/// 📦 One struct to rule them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 📡 Optional at parse time so a dry run needs no cluster. A real run checks the url.
    #[serde(default)]
    pub opensearch: OpenSearchSinkConfig,
    #[serde(default)]
    pub source: LocalBucketConfig,
    pub pipeline: PipelineConfig,
}

/// 🚀 Load the config from the environment, plus a TOML file when one is given.
///
/// 💀 Fails when the result doesn't deserialize or the pipeline knobs are nonsense
/// (upsert with no id field, a zero batch size, an empty index name).
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = OPENSEARCH_ENV
        .iter()
        .filter_map(|(var, key)| Some((*key, std::env::var(var).ok()?)))
        .fold(Figment::new(), |config, (key, value)| {
            config.merge(Serialized::default(key, value))
        })
        .merge(Env::prefixed("AVL_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables \
             (OPENSEARCH_*, AVL_*). The file exists in our hearts, but apparently not on disk.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (OPENSEARCH_*, AVL_*). \
                 No file was provided, this one's all on the environment. Classic."
            .to_string(),
    };

    let app_config: AppConfig = config.extract().context(context_msg)?;
    app_config
        .pipeline
        .validate()
        .context("💀 The configuration parsed, but the pipeline it describes cannot exist")?;
    Ok(app_config)
}
