//! Per-owner skill tree management for the skill tree runtime.
//!
//! This crate is what gameplay and UI code talk to. It wraps the engine in a
//! [`SkillTreeManager`] that keeps one tree instance per owner and adds the
//! pieces that touch the outside world: YAML configuration, the save blob
//! codec and save storage.
//!
//! # Modules
//!
//! - [`manager`] -- [`SkillTreeManager`], the per-owner entry point
//! - [`instance`] -- [`TreeInstance`], one owner's live tree
//! - [`config`] -- [`SkillTreeConfig`] loaded from `skilltree-config.yaml`
//! - [`codec`] -- Save blob [`encode`] and [`decode`]
//! - [`storage`] -- [`SaveStore`] with memory and file backends
//! - [`error`] -- [`CoreError`]

pub mod codec;
pub mod config;
pub mod error;
pub mod instance;
pub mod manager;
pub mod storage;

pub use codec::{CodecError, decode, encode};
pub use config::{ActivationConfig, ConfigError, LoggingConfig, SaveConfig, SkillTreeConfig};
pub use error::CoreError;
pub use instance::TreeInstance;
pub use manager::{DEFAULT_SLOT_NAME, SkillTreeManager};
pub use storage::{FileSaveStore, MemorySaveStore, SaveStore, StorageError};
