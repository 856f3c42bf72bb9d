//! User-adjustable settings: theme, audio, financial profile, model mode.

use serde::{Deserialize, Serialize};

/// UI color theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Prebuilt synthesis voices offered by the settings UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrebuiltVoice {
    #[default]
    Kore,
    Puck,
    Zephyr,
    Fenrir,
    Charon,
}

/// Audio playback preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub voice: PrebuiltVoice,
    /// Playback rate multiplier.
    pub speed: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            voice: PrebuiltVoice::Kore,
            speed: 1.0,
        }
    }
}

/// Age bracket used to tailor advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "under_30")]
    Under30,
    #[serde(rename = "30_45")]
    Between30And45,
    #[serde(rename = "46_60")]
    Between46And60,
    #[serde(rename = "over_60")]
    Over60,
}

impl AgeGroup {
    /// Human-readable form used in the system instruction.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Under30 => "under 30",
            Self::Between30And45 => "30 to 45",
            Self::Between46And60 => "46 to 60",
            Self::Over60 => "over 60",
        }
    }
}

/// Self-reported appetite for investment risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl RiskTolerance {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Primary financial goals selectable in the profile form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialGoal {
    Retirement,
    WealthCreation,
    TaxSaving,
    MajorPurchase,
}

impl FinancialGoal {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Retirement => "retirement",
            Self::WealthCreation => "wealth creation",
            Self::TaxSaving => "tax saving",
            Self::MajorPurchase => "major purchase",
        }
    }
}

/// The user's financial situation, merged into the system instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialProfile {
    pub age_group: AgeGroup,
    pub risk_tolerance: RiskTolerance,
    pub financial_goals: Vec<FinancialGoal>,
}

/// All user settings.
///
/// Every field carries a serde default so that settings stored by an older
/// build merge over current defaults instead of failing to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub theme: Theme,
    pub audio: AudioSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_profile: Option<FinancialProfile>,
    /// Selects the higher-reasoning model tier for streamed replies.
    pub pro_mode: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            audio: AudioSettings::default(),
            financial_profile: None,
            pro_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn age_group_wire_values() {
        assert_eq!(
            serde_json::to_string(&AgeGroup::Between30And45).unwrap(),
            "\"30_45\""
        );
        let back: AgeGroup = serde_json::from_str("\"under_30\"").unwrap();
        assert_eq!(back, AgeGroup::Under30);
    }

    #[test]
    fn goals_use_snake_case() {
        assert_eq!(
            serde_json::to_string(&FinancialGoal::WealthCreation).unwrap(),
            "\"wealth_creation\""
        );
    }

    #[test]
    fn settings_round_trip() {
        let settings = UserSettings {
            theme: Theme::Light,
            audio: AudioSettings {
                voice: PrebuiltVoice::Puck,
                speed: 1.25,
            },
            financial_profile: Some(FinancialProfile {
                age_group: AgeGroup::Between30And45,
                risk_tolerance: RiskTolerance::Medium,
                financial_goals: vec![FinancialGoal::Retirement, FinancialGoal::WealthCreation],
            }),
            pro_mode: true,
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"proMode\":true"));
        assert!(json.contains("\"financialProfile\""));
        assert!(json.contains("\"riskTolerance\":\"medium\""));
        let back: UserSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn partial_stored_settings_merge_over_defaults() {
        // A record written before proMode existed still loads.
        let back: UserSettings = serde_json::from_str(r#"{"theme":"light"}"#).unwrap();
        assert_eq!(back.theme, Theme::Light);
        assert!(!back.pro_mode);
        assert_eq!(back.audio, AudioSettings::default());
        assert!(back.financial_profile.is_none());
    }

    #[test]
    fn labels_are_presentable() {
        assert_eq!(AgeGroup::Over60.label(), "over 60");
        assert_eq!(FinancialGoal::TaxSaving.label(), "tax saving");
        assert_eq!(RiskTolerance::High.label(), "high");
    }
}
