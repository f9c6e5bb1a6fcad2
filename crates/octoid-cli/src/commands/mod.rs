pub mod clients;
pub mod connectors;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
}
