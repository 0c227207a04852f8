//! Common types used across the platform

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A denormalized point-in-time copy of a value owned by another document.
///
/// Movements, recipe lines, and order items deliberately cache the name,
/// unit, or cost of the entity they reference as it was when the document
/// was written. A `Snapshot<T>` field is never refreshed when the source
/// changes; code that needs the current value must go back to the live
/// document. Distinct from a plain field so the two cannot be confused.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot<T>(T);

impl<T> Snapshot<T> {
    /// Capture a value as it is right now.
    pub fn capture(value: T) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Snapshot<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Clone> Snapshot<T> {
    pub fn cloned(&self) -> T {
        self.0.clone()
    }
}

impl<T> From<T> for Snapshot<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

/// The identity performing a mutation, supplied by the external auth layer.
///
/// Opaque to the core: it is recorded on movements for audit attribution and
/// on orders as the creator, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub display_name: String,
}

impl Actor {
    pub fn new(id: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}
