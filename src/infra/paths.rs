// src/infra/paths.rs — Config and data locations
//
// INSTRUCT_EVOLVE_HOME overrides everything. Otherwise the platform config and
// data directories from `directories` are used.

use directories::ProjectDirs;
use std::path::PathBuf;

const HOME_ENV: &str = "INSTRUCT_EVOLVE_HOME";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "instruct-evolve")
}

fn home_override() -> Option<PathBuf> {
    std::env::var_os(HOME_ENV).map(PathBuf::from)
}

/// Configuration directory: $INSTRUCT_EVOLVE_HOME/ or the platform config dir.
pub fn config_dir() -> PathBuf {
    if let Some(home) = home_override() {
        return home;
    }
    project_dirs()
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".instruct-evolve"))
}

/// Data directory: $INSTRUCT_EVOLVE_HOME/runs/ or the platform data dir.
pub fn runs_dir() -> PathBuf {
    if let Some(home) = home_override() {
        return home.join("runs");
    }
    project_dirs()
        .map(|d| d.data_local_dir().join("runs"))
        .unwrap_or_else(|| PathBuf::from(".instruct-evolve").join("runs"))
}

pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_is_inside_config_dir() {
        let path = config_file_path();
        assert!(path.starts_with(config_dir()));
        assert_eq!(path.file_name().unwrap(), "config.toml");
    }

    #[test]
    fn test_runs_dir_named_runs() {
        assert_eq!(runs_dir().file_name().unwrap(), "runs");
    }
}
