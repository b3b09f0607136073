//! tfstate-resource - Terraform state pipeline resource
//!
//! Fetches a Terraform state file from an object store, reports its version and
//! flattens its outputs into metadata files for later pipeline steps.

pub mod action;
pub mod check;
pub mod error;
pub mod fetch;
pub mod metadata;
pub mod request;
pub mod storage;
pub mod terraform;
pub mod version;

pub use check::run_check;
pub use error::ResourceError;
pub use fetch::{FetchOrchestrator, Stage, run_in};
pub use request::{Action, CheckRequest, InRequest, InResponse, MetadataField, OutputLayout};
pub use storage::{MemoryStorage, S3Storage, StateStorage, StorageError, open_storage};
pub use version::Version;
