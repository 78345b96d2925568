use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize, Clone)]
pub struct IngestConfig {
    pub database_path: Option<PathBuf>,
    pub format: Option<String>,
    pub domain: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct ScanConfig {
    pub format: Option<String>,
    pub top: Option<usize>,
    pub content_type: Option<String>,
    pub domain: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct QueryConfig {
    pub database_path: Option<PathBuf>,
    pub top: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    /// Own domain, shared fallback for the per-command settings.
    pub domain: Option<String>,
    pub ingest: Option<IngestConfig>,
    pub scan: Option<ScanConfig>,
    pub query: Option<QueryConfig>,
}

pub fn load_config(path: Option<&Path>) -> Option<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new("sitestats.yaml");
            if p.exists() { p.to_path_buf() } else { return None; }
        }
    };
    let s = fs::read_to_string(path).ok()?;
    serde_yaml::from_str(&s).ok()
}
