//! Transition timing settings.

use std::time::Duration;

use serde::Deserialize;

/// Volume fade parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "FadeSettingsMs")]
pub struct FadeSettings {
    /// Volume removed per tick.
    pub step: f32,
    /// Interval between ticks.
    pub period: Duration,
    /// The fade ends once the volume is at or below this level.
    pub floor: f32,
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            step: 0.05,
            period: Duration::from_millis(100),
            floor: 0.05,
        }
    }
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FadeSettingsMs {
    step: f32,
    period_ms: u64,
    floor: f32,
}

impl Default for FadeSettingsMs {
    fn default() -> Self {
        let defaults = FadeSettings::default();
        Self {
            step: defaults.step,
            period_ms: 100,
            floor: defaults.floor,
        }
    }
}

impl From<FadeSettingsMs> for FadeSettings {
    fn from(raw: FadeSettingsMs) -> Self {
        Self {
            step: raw.step,
            period: Duration::from_millis(raw.period_ms),
            floor: raw.floor,
        }
    }
}

/// Press feedback and navigation delays.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "TransitionSettingsMs")]
pub struct TransitionSettings {
    /// How long the pressed visual state lasts.
    pub pressed: Duration,
    /// Delay between the press and navigation.
    pub navigate_after: Duration,
    /// Fade used by the fade-out variant.
    pub fade: FadeSettings,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self {
            pressed: Duration::from_millis(150),
            navigate_after: Duration::from_millis(300),
            fade: FadeSettings::default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TransitionSettingsMs {
    pressed_ms: u64,
    navigate_after_ms: u64,
    fade: FadeSettings,
}

impl Default for TransitionSettingsMs {
    fn default() -> Self {
        Self {
            pressed_ms: 150,
            navigate_after_ms: 300,
            fade: FadeSettings::default(),
        }
    }
}

impl From<TransitionSettingsMs> for TransitionSettings {
    fn from(raw: TransitionSettingsMs) -> Self {
        Self {
            pressed: Duration::from_millis(raw.pressed_ms),
            navigate_after: Duration::from_millis(raw.navigate_after_ms),
            fade: raw.fade,
        }
    }
}
