// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backups and edit sessions.

use understory_property::PropertyDescriptor;

use crate::model::{Model, SetOptions, lock};

/// A snapshot of the backed-up properties of one model and its dirty flag.
///
/// Values are held in the serialized form of the model's serializer. A backup
/// whose values could not be serialized only restores the dirty flag.
#[derive(Clone, Debug)]
pub struct ModelBackup {
    data: Option<Vec<u8>>,
    is_dirty: bool,
}

impl ModelBackup {
    /// Returns `true` if the property values were captured.
    #[must_use]
    pub fn has_values(&self) -> bool {
        self.data.is_some()
    }

    /// Returns the dirty flag at the time of the backup.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }
}

fn is_backed_up(descriptor: &PropertyDescriptor) -> bool {
    descriptor.include_in_backup() && !descriptor.is_engine_owned() && !descriptor.is_calculated()
}

impl Model {
    /// Captures the values of every property included in backups.
    ///
    /// Serialization failures are logged and leave the backup without values.
    #[must_use]
    pub fn create_backup(&self) -> ModelBackup {
        let members: Vec<&'static str> = self
            .registry()
            .iter()
            .filter(|d| is_backed_up(d))
            .map(|d| d.name())
            .collect();
        let data = match self.services().serializer().serialize_members(self, &members) {
            Ok(data) => Some(data),
            Err(err) => {
                tracing::warn!(model = self.type_name(), %err, "backup captured no values");
                None
            }
        };
        ModelBackup {
            data,
            is_dirty: self.is_dirty(),
        }
    }

    /// Puts back the values and dirty flag captured in `backup`.
    ///
    /// Values are re-applied without notifications, then their value rules run
    /// again. Failures are logged and skip the affected values.
    pub fn restore_backup(&self, backup: &ModelBackup) {
        if let Some(data) = &backup.data {
            match self.services().serializer().deserialize_members(self, data) {
                Ok(values) => {
                    let mut restored = Vec::with_capacity(values.len());
                    for (name, value) in values {
                        match self.set_value_with(name, value, SetOptions::QUIET) {
                            Ok(()) => restored.push(name),
                            Err(err) => tracing::warn!(
                                model = self.type_name(),
                                property = name,
                                %err,
                                "cannot restore backed-up value"
                            ),
                        }
                    }
                    self.recheck_attributes(&restored);
                }
                Err(err) => {
                    tracing::warn!(model = self.type_name(), %err, "cannot read backup");
                }
            }
        }
        self.mark_dirty(backup.is_dirty);
    }

    /// Returns `true` between [`begin_edit`](Self::begin_edit) and
    /// [`end_edit`](Self::end_edit) or [`cancel_edit`](Self::cancel_edit).
    #[must_use]
    pub fn is_in_edit_session(&self) -> bool {
        lock(&self.inner.backup).is_some()
    }

    /// Starts an edit session by taking a backup.
    ///
    /// Sessions do not nest: calling this during a session keeps the first
    /// backup.
    pub fn begin_edit(&self) {
        if self.is_in_edit_session() {
            tracing::debug!(model = self.type_name(), "edit session already open");
            return;
        }
        let backup = self.create_backup();
        let mut slot = lock(&self.inner.backup);
        if slot.is_none() {
            *slot = Some(backup);
        }
    }

    /// Ends the edit session and restores its backup.
    pub fn cancel_edit(&self) {
        let backup = lock(&self.inner.backup).take();
        match backup {
            Some(backup) => self.restore_backup(&backup),
            None => tracing::debug!(model = self.type_name(), "no edit session to cancel"),
        }
    }

    /// Ends the edit session and keeps the current values.
    pub fn end_edit(&self) {
        if lock(&self.inner.backup).take().is_none() {
            tracing::debug!(model = self.type_name(), "no edit session to end");
        }
    }
}
