pub mod ask;
pub mod chat;
pub mod doctor;
pub mod ingest;
pub mod memory;
pub mod onboard;
pub mod serve;
pub mod status;

use std::path::{Path, PathBuf};

use hybridrag_config::AppConfig;
use hybridrag_core::source::SessionContext;

/// The config file in effect.
pub fn config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load the config file with environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load_with_env(&config_path(path))
        .map_err(|e| format!("Failed to load config: {e}").into())
}

/// Parse a `NAME=PATH` context argument.
pub fn parse_context_arg(arg: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{arg}'"))?;
    let name = name.trim();
    if name.is_empty() || path.trim().is_empty() {
        return Err(format!("expected NAME=PATH, got '{arg}'"));
    }
    Ok((name.to_string(), PathBuf::from(path.trim())))
}

/// Read each context file into a named block.
pub fn read_context(blocks: &[(String, PathBuf)]) -> Result<SessionContext, Box<dyn std::error::Error>> {
    let mut context = SessionContext::new();
    for (name, path) in blocks {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read context '{name}' from {}: {e}", path.display()))?;
        context.insert(name, text);
    }
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_arg_splits_on_first_equals() {
        assert_eq!(
            parse_context_arg("faq=a=b.md").unwrap(),
            ("faq".to_string(), PathBuf::from("a=b.md"))
        );
        assert!(parse_context_arg("faq").is_err());
        assert!(parse_context_arg("=faq.md").is_err());
        assert!(parse_context_arg("faq=").is_err());
    }

    #[test]
    fn context_files_become_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faq.md");
        std::fs::write(&path, "Shipping time is five business days.").unwrap();

        let context = read_context(&[("faq".to_string(), path)]).unwrap();
        let blocks: Vec<_> = context.blocks().collect();
        assert_eq!(blocks, vec![("faq", "Shipping time is five business days.")]);
    }

    #[test]
    fn missing_context_file_is_an_error() {
        let err = read_context(&[("faq".to_string(), PathBuf::from("/nonexistent/faq.md"))]).unwrap_err();
        assert!(err.to_string().contains("faq"));
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("none.toml"))).unwrap();
        assert_eq!(config.default_model, "gpt-4o-mini");
    }
}
