mod args;

pub use args::{Cli, Command};

use std::io::Read;
use std::path::Path;

/// Reads the request document from `path`, or from stdin when absent.
pub fn read_request(path: Option<&Path>) -> std::io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}
