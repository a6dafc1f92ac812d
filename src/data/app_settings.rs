use crate::data::persistence::Persistable;
use anyhow::{bail, Result};
use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW_SIZE: usize = 10;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// Base URL of the planning API. When unset the local `otb_rows.json` store is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    /// Years fetched and concatenated into one rolling view.
    /// Left out of the file, it becomes the anchor year and the next.
    #[serde(default)]
    pub years: Vec<i32>,
    pub season: u8,
    /// Week 0 starts on January 1st of this year.
    pub anchor_year: i32,
    pub window_size: usize,
    pub log_file: String,
}

/// The anchor year and the one after it.
pub fn default_years(anchor_year: i32) -> Vec<i32> {
    vec![anchor_year, anchor_year + 1]
}

impl Default for AppSettings {
    fn default() -> Self {
        let anchor_year = Local::now().year();
        AppSettings {
            api_base_url: None,
            years: default_years(anchor_year),
            season: 1,
            anchor_year,
            window_size: DEFAULT_WINDOW_SIZE,
            log_file: "wssi.log".to_string(),
        }
    }
}

/// Wrapper that reads the `settings` key from config.yaml.
#[derive(Serialize, Deserialize, Default, Debug)]
pub(crate) struct SettingsWrapper {
    #[serde(default)]
    pub(crate) settings: AppSettings,
}

impl Persistable for SettingsWrapper {
    fn filename() -> &'static str {
        "config.yaml"
    }
    fn is_json() -> bool {
        false
    }
}

impl AppSettings {
    pub fn load() -> Result<Self> {
        let mut settings = SettingsWrapper::load()?.settings;
        settings.fill_years();
        settings.validate()?;
        Ok(settings)
    }

    /// Derives `years` from `anchor_year` when the file did not list any.
    pub fn fill_years(&mut self) {
        if self.years.is_empty() {
            self.years = default_years(self.anchor_year);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.season, 1 | 2) {
            bail!("season must be 1 or 2, got {}", self.season);
        }
        if self.window_size == 0 {
            bail!("window_size must be at least 1");
        }
        if self.years.is_empty() {
            bail!("at least one year must be configured");
        }
        Ok(())
    }

    /// The other season of the pair (1 <-> 2).
    pub fn toggled_season(&self) -> u8 {
        if self.season == 1 { 2 } else { 1 }
    }

    pub fn scope_label(&self) -> String {
        let years: Vec<String> = self.years.iter().map(|y| y.to_string()).collect();
        format!("Season {} · {}", self.season, years.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_settings_default_values() {
        let settings = AppSettings::default();
        assert_eq!(settings.api_base_url, None);
        assert_eq!(settings.season, 1);
        assert_eq!(settings.window_size, 10);
        assert_eq!(settings.log_file, "wssi.log");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_wrapper_yaml_roundtrip() {
        let wrapper = SettingsWrapper {
            settings: AppSettings {
                api_base_url: Some("http://localhost:3000/api".to_string()),
                years: vec![2026],
                season: 2,
                anchor_year: 2026,
                window_size: 8,
                log_file: "plan.log".to_string(),
            },
        };
        let yaml = serde_norway::to_string(&wrapper).unwrap();
        let parsed: SettingsWrapper = serde_norway::from_str(&yaml).unwrap();
        assert_eq!(parsed.settings, wrapper.settings);
    }

    #[test]
    fn test_settings_wrapper_missing_key_uses_default() {
        let yaml = "other: 1";
        let wrapper: SettingsWrapper = serde_norway::from_str(yaml).unwrap();
        assert_eq!(wrapper.settings, AppSettings::default());
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let yaml = "settings:\n  season: 2\n";
        let wrapper: SettingsWrapper = serde_norway::from_str(yaml).unwrap();
        assert_eq!(wrapper.settings.season, 2);
        assert_eq!(wrapper.settings.window_size, DEFAULT_WINDOW_SIZE);
    }

    #[test]
    fn test_validate_rejects_bad_season() {
        let settings = AppSettings { season: 3, ..Default::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let settings = AppSettings { window_size: 0, ..Default::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_toggled_season() {
        let mut settings = AppSettings::default();
        assert_eq!(settings.toggled_season(), 2);
        settings.season = 2;
        assert_eq!(settings.toggled_season(), 1);
    }

    #[test]
    fn test_scope_label() {
        let settings = AppSettings { years: vec![2025, 2026], ..Default::default() };
        assert_eq!(settings.scope_label(), "Season 1 · 2025+2026");
    }

    #[test]
    fn test_default_years_follow_anchor() {
        let settings = AppSettings::default();
        assert_eq!(settings.anchor_year, Local::now().year());
        assert_eq!(settings.years, default_years(settings.anchor_year));
        assert_eq!(default_years(2031), vec![2031, 2032]);
    }

    #[test]
    fn test_missing_years_derive_from_file_anchor() {
        let yaml = "settings:\n  anchor_year: 2030\n";
        let mut settings = serde_norway::from_str::<SettingsWrapper>(yaml).unwrap().settings;
        assert!(settings.years.is_empty());
        settings.fill_years();
        assert_eq!(settings.years, vec![2030, 2031]);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_listed_years_are_kept() {
        let mut settings = AppSettings { years: vec![2024], anchor_year: 2030, ..Default::default() };
        settings.fill_years();
        assert_eq!(settings.years, vec![2024]);
    }
}
