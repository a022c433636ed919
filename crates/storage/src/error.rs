use crate::record::{ItemId, TenantId};

/// All errors that can be returned by a platform backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No content item with this id exists in the current tenant.
    #[error("item {item_id} not found in tenant {tenant_id}")]
    ItemNotFound { tenant_id: TenantId, item_id: ItemId },

    /// The tenant id does not name a site of this installation.
    #[error("tenant {tenant_id} not found")]
    TenantNotFound { tenant_id: TenantId },

    /// The content store refused to create the item.
    #[error("insert rejected in tenant {tenant_id}: {reason}")]
    InsertRejected { tenant_id: TenantId, reason: String },

    /// The attachment subsystem refused to register a file.
    #[error("attachment rejected for {file}: {reason}")]
    AttachmentRejected { file: String, reason: String },

    /// `pop_tenant` was called with no matching `push_tenant`.
    #[error("no tenant context to restore")]
    NoTenantToRestore,

    /// The upload directory for the current tenant cannot be resolved.
    #[error("upload directory unavailable: {0}")]
    UploadDir(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A backend-specific error (serialization, lock poisoning, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
