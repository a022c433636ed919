use std::path::PathBuf;

use sitecopy_storage::{ItemId, StoreError, TenantId};

/// Why a single item could not be cloned.
///
/// Only failures that stop the item are reported here. Attachment and
/// metadata failures are skipped and logged instead.
#[derive(Debug, thiserror::Error)]
pub enum CloneError {
    /// The source item cannot be read in the source tenant.
    #[error("source item {item_id} not found in tenant {tenant_id}")]
    SourceNotFound {
        tenant_id: TenantId,
        item_id: ItemId,
        #[source]
        source: StoreError,
    },

    /// Source terms, metadata, attachments or layout could not be read.
    #[error("reading {what} of item {item_id}: {source}")]
    Read {
        item_id: ItemId,
        what: &'static str,
        #[source]
        source: StoreError,
    },

    /// The destination tenant could not be made current.
    #[error("cannot switch to tenant {tenant_id}: {source}")]
    Switch {
        tenant_id: TenantId,
        #[source]
        source: StoreError,
    },

    /// The destination store rejected the new item.
    #[error("insert into tenant {tenant_id} failed: {source}")]
    Insert {
        tenant_id: TenantId,
        #[source]
        source: StoreError,
    },

    /// Persisting the cloned layout failed.
    #[error("layout of item {item_id} could not be written: {source}")]
    Layout {
        item_id: ItemId,
        #[source]
        source: StoreError,
    },
}

impl CloneError {
    pub(crate) fn read(item_id: ItemId, what: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| CloneError::Read {
            item_id,
            what,
            source,
        }
    }
}

/// Errors from loading or writing [`Settings`](crate::Settings).
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot encode settings: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}
