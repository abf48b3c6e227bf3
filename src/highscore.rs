//! High-score persistence: a small JSON file in the user's config directory.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const FILENAME: &str = "high_score.json";

/// On-disk shape: `{"high_score": <integer>}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct HighScoreFile {
    high_score: u32,
}

/// Default path: config dir / tetratui / high_score.json (XDG, then ~/.config).
fn default_path() -> PathBuf {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    base.join("tetratui").join(FILENAME)
}

fn resolve(path: Option<&Path>) -> PathBuf {
    path.map_or_else(default_path, Path::to_path_buf)
}

/// Load the stored high score. Missing or malformed file yields 0, never an error.
pub fn load(path: Option<&Path>) -> u32 {
    let content = match fs::read_to_string(resolve(path)) {
        Ok(c) => c,
        Err(_) => return 0,
    };
    serde_json::from_str::<HighScoreFile>(&content)
        .map(|f| f.high_score)
        .unwrap_or(0)
}

/// Write a new high score, creating the config directory if needed.
pub fn save(path: Option<&Path>, score: u32) -> Result<()> {
    let path = resolve(path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string(&HighScoreFile { high_score: score })?;
    fs::write(path, body)?;
    Ok(())
}

/// Persist `current` only when it strictly beats `stored`; returns the new
/// record. Nothing is written on a tie or regression.
pub fn record(path: Option<&Path>, stored: u32, current: u32) -> Result<u32> {
    if current > stored {
        save(path, current)?;
        Ok(current)
    } else {
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_defaults_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert_eq!(load(Some(&path)), 0);
    }

    #[test]
    fn malformed_file_defaults_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILENAME);
        fs::write(&path, "{not json").unwrap();
        assert_eq!(load(Some(&path)), 0);
        fs::write(&path, r#"{"high_score": "twelve"}"#).unwrap();
        assert_eq!(load(Some(&path)), 0);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores").join(FILENAME);
        save(Some(&path), 4200).unwrap();
        assert_eq!(load(Some(&path)), 4200);
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"high_score\""));
    }

    #[test]
    fn record_only_writes_on_strict_improvement() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILENAME);
        save(Some(&path), 300).unwrap();

        assert_eq!(record(Some(&path), 300, 300).unwrap(), 300);
        assert_eq!(load(Some(&path)), 300);

        assert_eq!(record(Some(&path), 300, 250).unwrap(), 300);
        assert_eq!(load(Some(&path)), 300);

        assert_eq!(record(Some(&path), 300, 301).unwrap(), 301);
        assert_eq!(load(Some(&path)), 301);
    }
}
