//! Application configuration read from environment variables and an optional
//! YAML settings file.

use std::path::Path;

use reqwest::Url;
use serde::Deserialize;
use storyteller_pages::style_choose::StoryStyle;
use storyteller_sequencer::application::settings::TransitionSettings;

use crate::error::AppError;

/// Variable holding the story service base URL.
pub const STORY_API_URL: &str = "STORY_API_URL";
/// Variable holding the chat service base URL.
pub const CHAT_API_URL: &str = "CHAT_API_URL";
/// Variable holding the user id sent with story requests.
pub const USER_ID: &str = "STORYTELLER_USER_ID";
/// Variable holding the narration voice.
pub const VOICE: &str = "STORYTELLER_VOICE";
/// Variable naming the style picked in story mode.
pub const STYLE: &str = "STORYTELLER_STYLE";
/// Variable selecting `story` or `chatbot` mode.
pub const MODE: &str = "STORYTELLER_MODE";
/// Variable holding the path of the optional YAML settings file.
pub const SETTINGS: &str = "STORYTELLER_SETTINGS";

const DEFAULT_STORY_API_URL: &str = "http://localhost:8000";
const DEFAULT_CHAT_API_URL: &str = "http://localhost:5000";

/// Which front end to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Landing, style choice and voice chat pages.
    Story,
    /// Text chatbot with narration and illustrations.
    Chatbot,
}

impl Mode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "story" => Some(Self::Story),
            "chatbot" => Some(Self::Chatbot),
            _ => None,
        }
    }
}

/// Contents of the optional settings file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    #[serde(default)]
    transitions: TransitionSettings,
}

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Story service base URL.
    pub story_api_url: Url,
    /// Chat service base URL.
    pub chat_api_url: Url,
    /// Identity sent with story requests.
    pub user_id: String,
    /// Narration voice and recognition language.
    pub voice: String,
    /// Style picked automatically on the style-choose page.
    pub style: StoryStyle,
    /// Front end to run.
    pub mode: Mode,
    /// Press, navigation and fade timings.
    pub transitions: TransitionSettings,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if a value is invalid or the settings file cannot
    /// be read.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Unset variables fall back to
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for invalid values, `AppError::Io` if the
    /// settings file cannot be read and `AppError::Settings` if it cannot be
    /// parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let story_api_url = parse_url(STORY_API_URL, get(STORY_API_URL), DEFAULT_STORY_API_URL)?;
        let chat_api_url = parse_url(CHAT_API_URL, get(CHAT_API_URL), DEFAULT_CHAT_API_URL)?;
        let user_id = get(USER_ID).unwrap_or_else(|| "user123".to_owned());
        let voice = get(VOICE).unwrap_or_else(|| "en-US".to_owned());

        let style = match get(STYLE) {
            Some(raw) => StoryStyle::from_label(&raw)
                .ok_or_else(|| AppError::Config(format!("{STYLE} is not a known style: {raw}")))?,
            None => StoryStyle::PawPatrol,
        };
        let mode = match get(MODE) {
            Some(raw) => Mode::parse(&raw).ok_or_else(|| {
                AppError::Config(format!("{MODE} must be `story` or `chatbot`, got {raw}"))
            })?,
            None => Mode::Story,
        };
        let transitions = match get(SETTINGS) {
            Some(path) => load_settings(Path::new(&path))?,
            None => TransitionSettings::default(),
        };

        Ok(Self {
            story_api_url,
            chat_api_url,
            user_id: user_id.trim().to_owned(),
            voice: voice.trim().to_owned(),
            style,
            mode,
            transitions,
        })
    }
}

fn parse_url(key: &str, raw: Option<String>, default: &str) -> Result<Url, AppError> {
    let raw = raw.unwrap_or_else(|| default.to_owned());
    let url = Url::parse(raw.trim())
        .map_err(|e| AppError::Config(format!("{key} must be a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Config(format!(
            "{key} must use http or https, got {}",
            url.scheme()
        )));
    }
    Ok(url)
}

/// Parses transition settings from YAML. Missing keys keep their defaults.
///
/// # Errors
///
/// Returns `AppError::Settings` for malformed YAML and `AppError::Config`
/// for a fade that would never finish.
pub fn settings_from_yaml(yaml: &str) -> Result<TransitionSettings, AppError> {
    let file: SettingsFile = if yaml.trim().is_empty() {
        SettingsFile::default()
    } else {
        serde_yaml::from_str(yaml)?
    };
    let fade = file.transitions.fade;
    if fade.step <= 0.0 || fade.period.is_zero() {
        return Err(AppError::Config(
            "fade step and period must be positive".to_owned(),
        ));
    }
    Ok(file.transitions)
}

fn load_settings(path: &Path) -> Result<TransitionSettings, AppError> {
    let yaml = std::fs::read_to_string(path)?;
    settings_from_yaml(&yaml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_yaml_overrides_only_given_keys() {
        let yaml = "transitions:\n  navigate_after_ms: 500\n  fade:\n    step: 0.1\n";

        let settings = settings_from_yaml(yaml).unwrap();

        assert_eq!(settings.pressed, Duration::from_millis(150));
        assert_eq!(settings.navigate_after, Duration::from_millis(500));
        assert!((settings.fade.step - 0.1).abs() < f32::EPSILON);
        assert_eq!(settings.fade.period, Duration::from_millis(100));
    }

    #[test]
    fn test_empty_yaml_yields_defaults() {
        assert_eq!(settings_from_yaml("").unwrap(), TransitionSettings::default());
    }

    #[test]
    fn test_zero_fade_step_is_rejected() {
        let result = settings_from_yaml("transitions:\n  fade:\n    step: 0.0\n");

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = settings_from_yaml("transitoins: {}\n");

        assert!(matches!(result, Err(AppError::Settings(_))));
    }

    #[test]
    fn test_misspelled_transition_key_is_rejected() {
        let result = settings_from_yaml("transitions:\n  pressed: 200\n");

        assert!(matches!(result, Err(AppError::Settings(_))));
    }

    #[test]
    fn test_misspelled_fade_key_is_rejected() {
        let result = settings_from_yaml("transitions:\n  fade:\n    period: 50\n");

        assert!(matches!(result, Err(AppError::Settings(_))));
    }
}
