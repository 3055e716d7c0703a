//! Config file and environment resolution

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use voxweave_core::TtsConfig;

/// Load the TTS configuration.
///
/// Order: explicit `--config` path, else the user config directory,
/// else built-in defaults. Credentials missing from the file are
/// filled from provider-specific environment variables so keys never
/// have to live on disk.
pub fn load(path: Option<&PathBuf>, provider: &str) -> Result<TtsConfig> {
    let config_path = path.cloned().unwrap_or_else(default_config_path);

    let mut config = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config in {}", config_path.display()))?
    } else {
        debug!("No config file at {:?}; using defaults", config_path);
        TtsConfig::default()
    };

    apply_env(&mut config, provider);
    Ok(config)
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("voxweave").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

fn apply_env(config: &mut TtsConfig, provider: &str) {
    if config.api_key.is_none() {
        let var = match provider {
            "elevenlabs" => "ELEVENLABS_API_KEY",
            "openai" => "OPENAI_API_KEY",
            "azureopenai" => "AZURE_OPENAI_API_KEY",
            "google" | "googlemulti" => "GOOGLE_API_KEY",
            _ => return,
        };
        config.api_key = std::env::var(var).ok();
    }

    if provider == "azureopenai" {
        if config.api_base.is_none() {
            config.api_base = std::env::var("AZURE_OPENAI_ENDPOINT").ok();
        }
        if config.deployment.is_none() {
            config.deployment = std::env::var("AZURE_OPENAI_DEPLOYMENT").ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load(Some(&PathBuf::from("/nonexistent/voxweave.toml")), "none").unwrap();
        assert_eq!(config.language, "en");
    }

    #[test]
    fn toml_fields_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "audio_format = \"wav\"\nspeed = 1.2\nmodel = \"tts-1\"\n",
        )
        .unwrap();

        let config = load(Some(&path), "none").unwrap();
        assert_eq!(config.speed, 1.2);
        assert_eq!(config.model.as_deref(), Some("tts-1"));
    }
}
