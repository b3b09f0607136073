//! Terraform state documents.

pub mod state;

pub use state::{LIST_SEPARATOR, Output, OutputValue, TerraformState};

/// File name the fetched state is stored under in the destination directory.
pub const STATE_FILE_NAME: &str = "terraform.tfstate";
