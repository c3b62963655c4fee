use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use switchblade_common::config::AppConfig;

/// Project-local configuration, used when present.
pub const LOCAL_CONFIG_PATH: &str = "config/switchblade.yaml";

/// Resolve which configuration file to load.
///
/// Priority: `--config` > `SWITCHBLADE_CONFIG` > `./config/switchblade.yaml`
/// > `~/.switchblade/config.yaml`. The chosen file may not exist; environment
/// variables and defaults still apply.
pub fn resolve_config_path(arg: Option<&str>) -> PathBuf {
    if let Some(path) = arg {
        return PathBuf::from(path);
    }
    if let Ok(path) = env::var("SWITCHBLADE_CONFIG") {
        return PathBuf::from(path);
    }
    if Path::new(LOCAL_CONFIG_PATH).exists() {
        return PathBuf::from(LOCAL_CONFIG_PATH);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".switchblade").join("config.yaml"),
        None => PathBuf::from(LOCAL_CONFIG_PATH),
    }
}

pub fn load(path: &Path) -> Result<AppConfig> {
    AppConfig::from_file(&path.to_string_lossy())
        .with_context(|| format!("Failed to load config from {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_path_wins() {
        assert_eq!(
            resolve_config_path(Some("/etc/switchblade.yaml")),
            PathBuf::from("/etc/switchblade.yaml")
        );
    }

    #[test]
    fn test_load_reads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switchblade.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "engine:\n  workgroup: analysts\nhistory:\n  default_list_limit: 7"
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.engine.workgroup, "analysts");
        assert_eq!(config.history.default_list_limit, 7);
    }

    #[test]
    fn test_invalid_config_mentions_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switchblade.yaml");
        std::fs::write(&path, "engine:\n  max_poll_attempts: 0\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(err.to_string().to_lowercase().contains("config"));
    }
}
