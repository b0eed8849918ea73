pub mod migrate;
pub mod reset;
pub mod simulate;

use agora_engine::EngineConfig;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Resolve the engine configuration from an optional file and overrides
pub fn load_config(path: Option<&Path>, db: Option<PathBuf>) -> anyhow::Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(db) = db {
        config.db_path = db;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_db_flag_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "db_path = \"from-file.db\"\n[pool]\nworker_count = 2").unwrap();

        let config = load_config(Some(file.path()), Some(PathBuf::from("override.db"))).unwrap();

        assert_eq!(config.db_path, PathBuf::from("override.db"));
        assert_eq!(config.pool.worker_count, 2);
    }

    #[test]
    fn test_defaults_without_file() {
        let config = load_config(None, None).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_bad_file_carries_context() {
        let err = load_config(Some(Path::new("/nonexistent/agora.toml")), None).unwrap_err();
        assert!(format!("{:#}", err).contains("loading config"));
    }
}
