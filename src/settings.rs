use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::db::models::{subscription::validation::validate_currency, DEFAULT_CURRENCY};
use crate::error::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub notifications_enabled: bool,
    pub monthly_budget_limit: f64,
    pub currency: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            monthly_budget_limit: 100.0,
            currency: DEFAULT_CURRENCY.into(),
        }
    }
}

impl Preferences {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.monthly_budget_limit.is_finite() || self.monthly_budget_limit < 0.0 {
            return Err(ValidationError::InvalidBudget(self.monthly_budget_limit));
        }
        validate_currency(&self.currency)
    }

    /// Budget used for the over-budget insight; zero means no budget is set.
    pub fn budget(&self) -> Option<f64> {
        if self.monthly_budget_limit > 0.0 {
            Some(self.monthly_budget_limit)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    preferences: Preferences,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring unreadable settings at {}: {err}; using defaults",
                    path.display()
                );
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn preferences(&self) -> Preferences {
        self.read().preferences.clone()
    }

    pub fn update_preferences(&self, preferences: Preferences) -> Result<()> {
        preferences.validate()?;
        let mut guard = self.write();
        let previous = std::mem::replace(&mut guard.preferences, preferences);
        if let Err(err) = self.persist(&guard) {
            guard.preferences = previous;
            return Err(err);
        }
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: UserSettings = serde_json::from_str(&contents)?;
        *self.write() = data;
        Ok(())
    }
}
