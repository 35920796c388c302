use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use super::yaml::load_yaml;

/// Optional settings from `win-wallpaper.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolConfig {
    pub debug: bool,
    pub log_file: Option<PathBuf>,
    /// Worker-pool size, `None` for one worker per CPU.
    pub workers: Option<usize>,
}

impl ToolConfig {
    /// Falls back to defaults when the file is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        load_yaml(path)
            .and_then(|value| Self::from_yaml(&value))
            .unwrap_or_default()
    }

    pub fn from_yaml(root: &Value) -> Option<Self> {
        let map = root.as_mapping()?;
        let logging = mapping_at(map, "logging");

        let debug = bool_at(map, "debug")
            .or_else(|| logging.and_then(|m| bool_at(m, "debug")))
            .unwrap_or(false);

        let log_file = str_any(map, &["log_file", "log_path"])
            .or_else(|| logging.and_then(|m| str_any(m, &["file", "path"])))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let workers = u64_any(map, &["workers", "threads"])
            .filter(|&n| n > 0)
            .map(|n| n as usize);

        Some(Self {
            debug,
            log_file,
            workers,
        })
    }
}

fn bool_at(map: &Mapping, key: &str) -> Option<bool> {
    map.get(Value::String(key.to_string()))?.as_bool()
}

fn str_at<'a>(map: &'a Mapping, key: &str) -> Option<&'a str> {
    map.get(Value::String(key.to_string()))?.as_str()
}

fn str_any<'a>(map: &'a Mapping, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| str_at(map, k))
}

fn mapping_at<'a>(map: &'a Mapping, key: &str) -> Option<&'a Mapping> {
    map.get(Value::String(key.to_string()))?.as_mapping()
}

fn u64_at(map: &Mapping, key: &str) -> Option<u64> {
    map.get(Value::String(key.to_string()))?
        .as_i64()
        .and_then(|v| if v >= 0 { Some(v as u64) } else { None })
}

fn u64_any(map: &Mapping, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| u64_at(map, k))
}
