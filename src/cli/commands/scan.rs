//! Scan command: report complete pairs without processing them.

use std::path::PathBuf;

use anyhow::{Result, bail};

use crate::config::Settings;
use crate::pairing::PathFilter;
use crate::watcher::find_pairs;

use super::watch::build_collaborators;

pub fn run(config: &Settings, root: Option<PathBuf>) -> Result<()> {
    let root = root.unwrap_or_else(|| config.watch.root.clone());
    if !root.is_dir() {
        bail!("Watch root is not a directory: {}", root.display());
    }

    let extensions = config.extension_pair();
    let filter = PathFilter::new(&root).with(build_collaborators(config)?.exclusions());
    let pairs = find_pairs(&root, &extensions, &filter);

    if pairs.is_empty() {
        println!(
            "No complete .{}/.{} pairs under {}",
            extensions.drawing,
            extensions.document,
            root.display()
        );
        return Ok(());
    }

    for pair in &pairs {
        println!("{}", pair.stem);
        println!("  {}", pair.drawing.display());
        println!("  {}", pair.document.display());
    }
    println!("{} pairs", pairs.len());
    Ok(())
}
