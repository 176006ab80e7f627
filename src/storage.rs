use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const THEME_KEY: &str = "theme";
const PREFS_FILE: &str = "prefs.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggle(self) -> Theme {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug)]
#[error("unknown theme: {0} (expected dark or light)")]
pub struct UnknownTheme(String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

/// Key-value preferences persisted as a small YAML map. Keys this crate
/// does not know are carried through writes untouched.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        PreferenceStore { path: path.into() }
    }

    pub fn locate() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "noteline").context("locating config directory")?;
        Ok(PreferenceStore::at(dirs.config_dir().join(PREFS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored theme, falling back to dark on any problem.
    pub fn get(&self) -> Theme {
        match self.read_map() {
            Ok(map) => map
                .get(THEME_KEY)
                .and_then(Value::as_str)
                .and_then(|raw| raw.parse().ok())
                .unwrap_or_default(),
            Err(err) => {
                tracing::debug!(error = %err, path = %self.path.display(), "no stored theme");
                Theme::default()
            }
        }
    }

    /// Persists the theme. Failures are logged and otherwise ignored.
    pub fn set(&self, theme: Theme) {
        if let Err(err) = self.write_key(THEME_KEY, theme.as_str()) {
            tracing::warn!(error = %err, path = %self.path.display(), "could not persist theme");
        }
    }

    fn read_map(&self) -> Result<Mapping> {
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {:?}", self.path))?;
        let map = serde_yaml::from_str(&data).context("parsing preferences")?;
        Ok(map)
    }

    fn write_key(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.read_map().unwrap_or_default();
        map.insert(Value::from(key), Value::from(value));
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
        }
        let serialized = serde_yaml::to_string(&map).context("serializing preferences")?;
        fs::write(&self.path, serialized).with_context(|| format!("writing {:?}", self.path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_defaults_to_dark() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::at(dir.path().join("prefs.yml"));
        assert_eq!(store.get(), Theme::Dark);
    }

    #[test]
    fn set_then_get_survives_a_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.yml");
        PreferenceStore::at(&path).set(Theme::Light);
        assert_eq!(PreferenceStore::at(&path).get(), Theme::Light);
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("theme: light"));
    }

    #[test]
    fn garbage_or_unknown_value_defaults_to_dark() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.yml");
        fs::write(&path, "theme: [not, a, string]").unwrap();
        assert_eq!(PreferenceStore::at(&path).get(), Theme::Dark);
        fs::write(&path, "theme: solarized\n").unwrap();
        assert_eq!(PreferenceStore::at(&path).get(), Theme::Dark);
    }

    #[test]
    fn set_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.yml");
        fs::write(&path, "font: mono\n").unwrap();
        PreferenceStore::at(&path).set(Theme::Light);
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("font: mono"));
        assert!(raw.contains("theme: light"));
    }

    #[test]
    fn set_keeps_non_string_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.yml");
        fs::write(&path, "font_size: 12\nrecent: [a, b]\ntheme: dark\n").unwrap();
        PreferenceStore::at(&path).set(Theme::Light);
        let raw = fs::read_to_string(&path).unwrap();
        let map: Mapping = serde_yaml::from_str(&raw).unwrap();
        assert_eq!(map.get("font_size"), Some(&Value::from(12)));
        assert_eq!(
            map.get("recent"),
            Some(&Value::Sequence(vec![Value::from("a"), Value::from("b")]))
        );
        assert_eq!(PreferenceStore::at(&path).get(), Theme::Light);
    }

    #[test]
    fn unwritable_location_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let store = PreferenceStore::at(blocker.join("prefs.yml"));
        store.set(Theme::Light);
        assert_eq!(store.get(), Theme::Dark);
    }

    #[test]
    fn theme_parsing_and_toggle() {
        assert_eq!("Light".parse::<Theme>().unwrap(), Theme::Light);
        assert!("blue".parse::<Theme>().is_err());
        assert_eq!(Theme::Dark.toggle(), Theme::Light);
        assert_eq!(Theme::Light.toggle().to_string(), "dark");
    }
}
