//! Command-line driver for the skill tree runtime.
//!
//! Loads a YAML tree definition, creates a manager from
//! `skilltree-config.yaml`, replays a YAML script against one owner and
//! prints the resulting node states as JSON on stdout.
//!
//! ```text
//! skilltree-runner <definition.yaml> <script.yaml>
//! ```
//!
//! `SKILLTREE_CONFIG` points at a config file other than
//! `skilltree-config.yaml`. Saves go to `save.directory` (or
//! `SKILLTREE_SAVE_DIR`) when set, and stay in memory otherwise.

mod definition;
mod error;
mod host;
mod script;

use std::path::PathBuf;

use skilltree_core::{FileSaveStore, MemorySaveStore, SaveStore, SkillTreeConfig, SkillTreeManager};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::definition::TreeDefinition;
use crate::error::RunnerError;
use crate::script::{Script, ScriptRunner};

/// Environment variable naming the config file.
const CONFIG_ENV: &str = "SKILLTREE_CONFIG";

/// Config file used when `SKILLTREE_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "skilltree-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the config, definition or script cannot be loaded,
/// or if a step fails structurally.
fn main() -> Result<(), RunnerError> {
    let (definition_path, script_path) = parse_args(std::env::args().skip(1))?;

    let config_path = std::env::var(CONFIG_ENV)
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = SkillTreeConfig::load_or_default(&config_path)?;
    init_logging(&config);

    info!(
        config = %config_path.display(),
        refund_percent = config.activation.refund_percent,
        require_unlocked_parent = config.activation.require_unlocked_parent,
        slot = config.save.slot_name,
        "skilltree-runner starting"
    );

    let definition = TreeDefinition::from_file(&definition_path)?;
    let script = Script::from_file(&script_path)?;
    let graph = definition.build_graph()?;
    info!(
        tree = definition.id,
        version = definition.version,
        nodes = graph.len(),
        steps = script.steps.len(),
        "Definition and script loaded"
    );

    let manager = SkillTreeManager::from_config(graph, definition.starting_pools(), &config)?;
    let mut runner = ScriptRunner::new(&definition, manager, open_store(&config), &script.owner);
    runner.run(&script.steps)?;

    let report = runner.report()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<(PathBuf, PathBuf), RunnerError> {
    match (args.next(), args.next(), args.next()) {
        (Some(definition), Some(script), None) => {
            Ok((PathBuf::from(definition), PathBuf::from(script)))
        }
        _ => Err(RunnerError::Usage(
            "skilltree-runner <definition.yaml> <script.yaml>".to_owned(),
        )),
    }
}

/// `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &SkillTreeConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_store(config: &SkillTreeConfig) -> Box<dyn SaveStore> {
    match config.save.directory.as_deref() {
        Some(dir) => {
            info!(directory = %dir.display(), "Using file save store");
            Box::new(FileSaveStore::new(dir))
        }
        None => Box::new(MemorySaveStore::new()),
    }
}
