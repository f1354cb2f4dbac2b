use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "reading-import";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_import_function")]
    pub import_function: String,
    #[serde(default = "default_upload_url_function")]
    pub upload_url_function: String,
    #[serde(default = "default_audio_folder")]
    pub audio_folder: String,
    #[serde(default)]
    pub recent_files: Vec<String>,
    #[serde(default = "default_max_recent")]
    pub max_recent_files: usize,
}

fn default_import_function() -> String {
    "admin:bulkImportReading".to_string()
}

fn default_upload_url_function() -> String {
    "storage:getUploadUrl".to_string()
}

fn default_audio_folder() -> String {
    "reading-audio".to_string()
}

fn default_max_recent() -> usize {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: None,
            auth_token: None,
            import_function: default_import_function(),
            upload_url_function: default_upload_url_function(),
            audio_folder: default_audio_folder(),
            recent_files: Vec::new(),
            max_recent_files: default_max_recent(),
        }
    }
}

impl Settings {
    /// Keys accepted by [`Settings::set`].
    pub fn keys() -> &'static [&'static str] {
        &[
            "backend_url",
            "auth_token",
            "import_function",
            "upload_url_function",
            "audio_folder",
            "max_recent_files",
        ]
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Settings from the platform config dir, or defaults when the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from))
        {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring unreadable config: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().context("no config directory on this platform")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory {:?}", dir))?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }

    pub fn reset() -> Result<()> {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
            }
        }
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());
        match key {
            "backend_url" => self.backend_url = optional(value),
            "auth_token" => self.auth_token = optional(value),
            "import_function" => self.import_function = value.to_string(),
            "upload_url_function" => self.upload_url_function = value.to_string(),
            "audio_folder" => self.audio_folder = value.to_string(),
            "max_recent_files" => {
                self.max_recent_files = value
                    .parse()
                    .with_context(|| format!("max_recent_files must be a number, got {value:?}"))?;
                self.recent_files.truncate(self.max_recent_files);
            }
            _ => bail!("unknown setting {key:?}; expected one of {:?}", Self::keys()),
        }
        Ok(())
    }

    pub fn add_recent_file(&mut self, path: &str) {
        self.recent_files.retain(|p| p != path);
        self.recent_files.insert(0, path.to_string());
        self.recent_files.truncate(self.max_recent_files);
    }

    /// Record `file` in the saved config, leaving every other saved value as
    /// it is on disk.
    pub fn remember_recent_file(file: &str) -> Result<()> {
        let path = Self::config_path().context("no config directory on this platform")?;
        Self::remember_recent_file_at(&path, file)
    }

    pub fn remember_recent_file_at(path: &Path, file: &str) -> Result<()> {
        let mut saved = Self::load_from(path);
        saved.add_recent_file(file);
        saved.save_to(path)
    }

    /// Copy with command-line or environment values layered on top. The
    /// result is for this run only and is never saved.
    pub fn with_overrides(&self, backend_url: Option<String>, auth_token: Option<String>) -> Self {
        let mut effective = self.clone();
        if backend_url.is_some() {
            effective.backend_url = backend_url;
        }
        if auth_token.is_some() {
            effective.auth_token = auth_token;
        }
        effective
    }

    /// Copy for display with the token masked.
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        if shown.auth_token.is_some() {
            shown.auth_token = Some("********".to_string());
        }
        shown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_through_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("config.json");

        let mut settings = Settings::default();
        settings.set("backend_url", "https://example.convex.cloud")?;
        settings.set("audio_folder", "audio/reading")?;
        settings.save_to(&path)?;

        assert_eq!(Settings::load_from(&path), settings);
        Ok(())
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "backend_url": "https://x" }"#)?;

        let settings = Settings::load_from(&path);
        assert_eq!(settings.backend_url.as_deref(), Some("https://x"));
        assert_eq!(settings.import_function, default_import_function());
        assert_eq!(settings.max_recent_files, 10);
        Ok(())
    }

    #[test]
    fn test_corrupt_file_gives_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json")?;
        assert_eq!(Settings::load_from(&path), Settings::default());
        Ok(())
    }

    #[test]
    fn test_recent_files_are_deduplicated_and_capped() {
        let mut settings = Settings::default();
        settings.max_recent_files = 2;
        settings.add_recent_file("a.csv");
        settings.add_recent_file("b.csv");
        settings.add_recent_file("a.csv");
        settings.add_recent_file("c.xlsx");
        assert_eq!(settings.recent_files, vec!["c.xlsx", "a.csv"]);
    }

    #[test]
    fn test_set_rejects_unknown_key_and_bad_number() {
        let mut settings = Settings::default();
        assert!(settings.set("colour", "red").is_err());
        assert!(settings.set("max_recent_files", "many").is_err());
        settings.set("auth_token", "").unwrap();
        assert_eq!(settings.auth_token, None);
    }

    #[test]
    fn test_overrides_apply_to_the_run_only() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");

        let mut saved = Settings::default();
        saved.set("backend_url", "https://saved.example")?;
        saved.save_to(&path)?;

        let effective = Settings::load_from(&path).with_overrides(
            Some("https://override.example".into()),
            Some("secret-token".into()),
        );
        assert_eq!(effective.backend_url.as_deref(), Some("https://override.example"));
        assert_eq!(effective.auth_token.as_deref(), Some("secret-token"));

        Settings::remember_recent_file_at(&path, "articles.csv")?;

        let reloaded = Settings::load_from(&path);
        assert_eq!(reloaded.backend_url.as_deref(), Some("https://saved.example"));
        assert_eq!(reloaded.auth_token, None);
        assert_eq!(reloaded.recent_files, vec!["articles.csv"]);
        assert!(!fs::read_to_string(&path)?.contains("secret-token"));
        Ok(())
    }

    #[test]
    fn test_missing_override_keeps_saved_value() {
        let mut saved = Settings::default();
        saved.auth_token = Some("saved".into());
        let effective = saved.with_overrides(None, None);
        assert_eq!(effective, saved);
    }
}
