// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Strategy objects injected into models.

use std::sync::Arc;

use crate::config::ModelConfig;
use crate::equality::{DefaultEqualityComparer, ModelEqualityComparer};
use crate::serialize::{JsonSerializer, ModelSerializer};
use crate::validation::ValidatorProvider;

/// The collaborators a model consults: configuration, validator provider,
/// equality comparer and serializer.
///
/// Cloning is cheap and shares every collaborator. A model resolves its
/// validator once, on first validation, and keeps it.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use understory_model::{ModelConfig, ModelServices};
///
/// let config = Arc::new(ModelConfig::default());
/// let services = ModelServices::new().with_config(config.clone());
/// config.set_lean_and_mean(true);
/// assert!(services.config().lean_and_mean());
/// ```
#[derive(Clone, Debug)]
pub struct ModelServices {
    config: Arc<ModelConfig>,
    validator_provider: Option<Arc<dyn ValidatorProvider>>,
    comparer: Arc<dyn ModelEqualityComparer>,
    serializer: Arc<dyn ModelSerializer>,
}

impl Default for ModelServices {
    fn default() -> Self {
        Self {
            config: Arc::new(ModelConfig::default()),
            validator_provider: None,
            comparer: Arc::new(DefaultEqualityComparer),
            serializer: Arc::new(JsonSerializer::default()),
        }
    }
}

impl ModelServices {
    /// Creates services with default collaborators and no validator provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: Arc<ModelConfig>) -> Self {
        self.config = config;
        self
    }

    /// Sets the validator provider.
    #[must_use]
    pub fn with_validator_provider(mut self, provider: Arc<dyn ValidatorProvider>) -> Self {
        self.validator_provider = Some(provider);
        self
    }

    /// Replaces the equality comparer.
    #[must_use]
    pub fn with_comparer(mut self, comparer: Arc<dyn ModelEqualityComparer>) -> Self {
        self.comparer = comparer;
        self
    }

    /// Replaces the serializer.
    #[must_use]
    pub fn with_serializer(mut self, serializer: Arc<dyn ModelSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Arc<ModelConfig> {
        &self.config
    }

    /// Returns the validator provider, if any.
    #[must_use]
    pub fn validator_provider(&self) -> Option<&Arc<dyn ValidatorProvider>> {
        self.validator_provider.as_ref()
    }

    /// Returns the equality comparer.
    #[must_use]
    pub fn comparer(&self) -> &Arc<dyn ModelEqualityComparer> {
        &self.comparer
    }

    /// Returns the serializer.
    #[must_use]
    pub fn serializer(&self) -> &Arc<dyn ModelSerializer> {
        &self.serializer
    }
}
