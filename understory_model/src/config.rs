// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared model switches.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::ConfigError;

const LEAN_AND_MEAN: &str = "UNDERSTORY_MODEL_LEAN_AND_MEAN";
const SUSPEND_VALIDATION: &str = "UNDERSTORY_MODEL_SUSPEND_VALIDATION";
const DISABLE_NOTIFICATIONS: &str = "UNDERSTORY_MODEL_DISABLE_NOTIFICATIONS";
const AUTO_VALIDATE: &str = "UNDERSTORY_MODEL_AUTO_VALIDATE";

/// Switches shared by every model constructed with the same
/// [`ModelServices`](crate::ModelServices).
///
/// The first three switches are read on every operation and can be flipped at
/// any time. The last two only seed the per-instance switches of models
/// constructed afterwards.
///
/// # Example
///
/// ```rust
/// use understory_model::ModelConfig;
///
/// let config = ModelConfig::default();
/// assert!(config.auto_validate());
/// config.set_suspend_validation(true);
/// assert!(config.suspend_validation());
/// ```
#[derive(Debug)]
pub struct ModelConfig {
    lean_and_mean: AtomicBool,
    suspend_validation: AtomicBool,
    disable_property_change_notifications: AtomicBool,
    auto_validate: AtomicBool,
    always_invoke_notify_changed: AtomicBool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            lean_and_mean: AtomicBool::new(false),
            suspend_validation: AtomicBool::new(false),
            disable_property_change_notifications: AtomicBool::new(false),
            auto_validate: AtomicBool::new(true),
            always_invoke_notify_changed: AtomicBool::new(false),
        }
    }
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(var, raw.into())),
    }
}

impl ModelConfig {
    /// Loads configuration from environment variables.
    ///
    /// Unset variables keep their defaults. Recognised values are
    /// `1/0`, `true/false`, `yes/no` and `on/off`, case-insensitively.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if a variable is set to anything else.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if a variable holds a non-boolean value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::default();
        let flags: [(&'static str, &AtomicBool); 4] = [
            (LEAN_AND_MEAN, &config.lean_and_mean),
            (SUSPEND_VALIDATION, &config.suspend_validation),
            (DISABLE_NOTIFICATIONS, &config.disable_property_change_notifications),
            (AUTO_VALIDATE, &config.auto_validate),
        ];
        for (var, flag) in flags {
            if let Some(raw) = lookup(var) {
                flag.store(parse_flag(var, &raw)?, Ordering::Relaxed);
            }
        }
        Ok(config)
    }

    /// Returns whether type checks, notifications and validation are all off.
    #[must_use]
    pub fn lean_and_mean(&self) -> bool {
        self.lean_and_mean.load(Ordering::Relaxed)
    }

    /// Turns lean-and-mean mode on or off for every model.
    pub fn set_lean_and_mean(&self, on: bool) {
        self.lean_and_mean.store(on, Ordering::Relaxed);
    }

    /// Returns whether validation is suspended for every model.
    #[must_use]
    pub fn suspend_validation(&self) -> bool {
        self.suspend_validation.load(Ordering::Relaxed)
    }

    /// Suspends or resumes validation for every model.
    ///
    /// Models catch up on their next validation pass.
    pub fn set_suspend_validation(&self, on: bool) {
        self.suspend_validation.store(on, Ordering::Relaxed);
    }

    /// Returns whether property change notifications are off for every model.
    #[must_use]
    pub fn disable_property_change_notifications(&self) -> bool {
        self.disable_property_change_notifications
            .load(Ordering::Relaxed)
    }

    /// Turns property change notifications off or on for every model.
    pub fn set_disable_property_change_notifications(&self, on: bool) {
        self.disable_property_change_notifications
            .store(on, Ordering::Relaxed);
    }

    /// Returns the auto-validate default for new models.
    #[must_use]
    pub fn auto_validate(&self) -> bool {
        self.auto_validate.load(Ordering::Relaxed)
    }

    /// Sets the auto-validate default for new models.
    pub fn set_auto_validate(&self, on: bool) {
        self.auto_validate.store(on, Ordering::Relaxed);
    }

    /// Returns the always-notify default for new models.
    #[must_use]
    pub fn always_invoke_notify_changed(&self) -> bool {
        self.always_invoke_notify_changed.load(Ordering::Relaxed)
    }

    /// Sets the always-notify default for new models.
    pub fn set_always_invoke_notify_changed(&self, on: bool) {
        self.always_invoke_notify_changed
            .store(on, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(var, _)| *var == name)
                .map(|(_, value)| (*value).to_owned())
        }
    }

    #[test]
    fn defaults() {
        let config = ModelConfig::from_lookup(|_| None).unwrap();
        assert!(!config.lean_and_mean());
        assert!(!config.suspend_validation());
        assert!(!config.disable_property_change_notifications());
        assert!(config.auto_validate());
        assert!(!config.always_invoke_notify_changed());
    }

    #[test]
    fn reads_every_boolean_spelling() {
        let config = ModelConfig::from_lookup(lookup(&[
            (LEAN_AND_MEAN, "Yes"),
            (SUSPEND_VALIDATION, "1"),
            (DISABLE_NOTIFICATIONS, " on "),
            (AUTO_VALIDATE, "FALSE"),
        ]))
        .unwrap();
        assert!(config.lean_and_mean());
        assert!(config.suspend_validation());
        assert!(config.disable_property_change_notifications());
        assert!(!config.auto_validate());
    }

    #[test]
    fn rejects_garbage() {
        let err = ModelConfig::from_lookup(lookup(&[(AUTO_VALIDATE, "maybe")])).unwrap_err();
        assert_eq!(err, ConfigError::Invalid(AUTO_VALIDATE, "maybe".into()));
    }
}
