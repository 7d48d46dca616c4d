mod error;
mod memory;
mod repository;

pub use error::*;
pub use memory::*;
pub use repository::*;

/// SQL migration for the slots table
pub const MIGRATION_001_SLOTS: &str = include_str!("migrations/001_slots.sql");

/// A named, wholesale-overwritten storage location for serialized state.
///
/// Implementations must make `write` all-or-nothing: either the new value
/// replaces the old one, or the old one is left untouched and an error is
/// returned.
#[allow(async_fn_in_trait)]
pub trait SlotStore {
    /// Read the value stored under `key`, if any.
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite the value stored under `key`.
    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Fails with `QuotaExceeded` when storing `value` under `key` would push the
/// total stored bytes past `quota`.
pub(crate) fn check_quota(
    key: &str,
    value: &str,
    others: usize,
    quota: Option<usize>,
) -> Result<(), StorageError> {
    let Some(limit) = quota else {
        return Ok(());
    };
    let required = others + key.len() + value.len();
    if required > limit {
        return Err(StorageError::QuotaExceeded {
            key: key.to_string(),
            required,
            limit,
        });
    }
    Ok(())
}
