//! `cadence config`: print the effective configuration.

use std::path::Path;

use clap::Args;

use cadence::config::EngineConfig;

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Read this file instead of the global configuration
    #[arg(long, value_name = "FILE")]
    pub path: Option<std::path::PathBuf>,
}

/// Print the configuration loaded from `path` (defaults when absent).
pub fn run(path: Option<&Path>) -> Result<(), CliError> {
    print!("{}", render(path)?);
    Ok(())
}

fn render(path: Option<&Path>) -> Result<String, CliError> {
    let (config, source) = match path {
        Some(path) if path.exists() => (EngineConfig::load(path)?, path.display().to_string()),
        Some(path) => (
            EngineConfig::default(),
            format!("defaults ({} not found)", path.display()),
        ),
        None => (EngineConfig::default(), "defaults".to_string()),
    };
    Ok(format!("; source: {}\n{}", source, config.to_ini_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_defaults() {
        let text = render(None).unwrap();
        assert!(text.starts_with("; source: defaults\n"));
        assert!(text.contains("ttl_ms=300000"));
        assert!(text.contains("easing=easeInOutCubic"));
    }

    #[test]
    fn test_render_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[scroll]\nduration_ms = 250\n").unwrap();

        let text = render(Some(&path)).unwrap();
        assert!(text.contains("duration_ms=250"));
        assert!(text.contains(&path.display().to_string()));
    }

    #[test]
    fn test_render_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.ini");

        let text = render(Some(&path)).unwrap();
        assert!(text.contains("not found"));
    }
}
