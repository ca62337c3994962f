// Export format plus save/load of it. The snapshot only carries what a
// pattern needs to be rebuilt: ids and pitch anchors stay in the session.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::WaveShape;
use crate::config::taploop_path;

const PATTERN_FILE: &str = "pattern.json";
const EXPORT_FILE: &str = "export.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternSnapshot {
    pub tempo: u32,
    pub steps: usize,
    pub events: Vec<EventSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub step: usize,
    pub freq: f32,
    pub gain: f32,
    pub duration: f32,
    pub color: String,
    #[serde(rename = "type")]
    pub wave_shape: WaveShape,
}

pub fn load_snapshot(project_dir: &Path) -> Option<PatternSnapshot> {
    let path = taploop_path(project_dir, PATTERN_FILE);
    let data = match read_if_present(&path) {
        Ok(data) => data?,
        Err(e) => {
            log::warn!("can't read pattern {}: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&data) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            log::warn!("ignoring unreadable pattern {}: {e}", path.display());
            None
        }
    }
}

// Ok(None) only when there's no file; anything else is the caller's to report
fn read_if_present(path: &Path) -> std::io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

// Save the snapshot, making .taploop/ if it doesn't exist already
pub fn save_snapshot(project_dir: &Path, snapshot: &PatternSnapshot) -> anyhow::Result<()> {
    let path = write_snapshot(project_dir, PATTERN_FILE, snapshot)?;
    log::info!("saved {} events to {}", snapshot.events.len(), path.display());
    Ok(())
}

// Same format, separate file, so an export never clobbers the working pattern
pub fn export_snapshot(project_dir: &Path, snapshot: &PatternSnapshot) -> anyhow::Result<PathBuf> {
    write_snapshot(project_dir, EXPORT_FILE, snapshot)
}

fn write_snapshot(project_dir: &Path, file: &str, snapshot: &PatternSnapshot) -> anyhow::Result<PathBuf> {
    let path = taploop_path(project_dir, file);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> PatternSnapshot {
        PatternSnapshot {
            tempo: 100,
            steps: 16,
            events: vec![EventSnapshot {
                step: 4,
                freq: 330.0,
                gain: 0.6,
                duration: 0.4,
                color: "#ff5e5b".into(),
                wave_shape: WaveShape::Square,
            }],
        }
    }

    #[test]
    fn json_uses_export_field_names() {
        let value = serde_json::to_value(snapshot()).unwrap();
        assert_eq!(value["tempo"], 100);
        assert_eq!(value["steps"], 16);
        let event = &value["events"][0];
        assert_eq!(event["type"], "square");
        assert_eq!(event["freq"], 330.0);
        let keys: Vec<&String> = event.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 6);
        assert!(event.get("id").is_none());
        assert!(event.get("base_frequency").is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("taploop-pattern-{}", fastrand::u64(..)));
        save_snapshot(&dir, &snapshot()).unwrap();
        assert_eq!(load_snapshot(&dir), Some(snapshot()));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn export_leaves_working_pattern_alone() {
        let dir = std::env::temp_dir().join(format!("taploop-pattern-{}", fastrand::u64(..)));
        let path = export_snapshot(&dir, &snapshot()).unwrap();
        assert!(path.ends_with("export.json"));
        assert_eq!(load_snapshot(&dir), None);
        let data = std::fs::read_to_string(&path).unwrap();
        let back: PatternSnapshot = serde_json::from_str(&data).unwrap();
        assert_eq!(back, snapshot());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_path_loads_nothing() {
        // a directory where the file should be: not NotFound, still None
        let dir = std::env::temp_dir().join(format!("taploop-pattern-{}", fastrand::u64(..)));
        let path = taploop_path(&dir, PATTERN_FILE);
        assert!(read_if_present(&path).unwrap().is_none());
        std::fs::create_dir_all(&path).unwrap();
        assert!(read_if_present(&path).is_err());
        assert_eq!(load_snapshot(&dir), None);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_or_corrupt_file_loads_nothing() {
        let dir = std::env::temp_dir().join(format!("taploop-pattern-{}", fastrand::u64(..)));
        assert_eq!(load_snapshot(&dir), None);
        let path = taploop_path(&dir, PATTERN_FILE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_snapshot(&dir), None);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
