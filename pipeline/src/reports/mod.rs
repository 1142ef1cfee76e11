//! JSON reports holding the numbers behind each figure of the write-up.

pub mod figures;

use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Writes `report` as pretty JSON to `dir/name`, creating `dir` if needed.
pub fn write_report<T: Serialize>(dir: &Path, name: &str, report: &T) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating report dir {}", dir.display()))?;
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(report).context("serializing report")?;
    fs::write(&path, json).with_context(|| format!("writing report {}", path.display()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}
