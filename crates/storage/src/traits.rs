//! Capabilities the cloning engine consumes from the host platform.
//!
//! Every call operates on the *current tenant* of the backend. Callers
//! change tenant only through [`TenantScope`], which restores the previous
//! tenant when dropped.
//!
//! All methods take `&self`; backends that mutate state use interior
//! mutability. Execution is synchronous and single-threaded per request.

use std::collections::BTreeMap;
use std::path::Path;

use sitecopy_value::Value;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::files;
use crate::record::{
    AttachmentRecord, ContentItem, ItemId, LayoutVariant, MetaMap, NewAttachment, RenditionMeta,
    Site, TenantId, UploadDir,
};

// ── Tenant context ──────────────────────────────────────────────────────────

/// The ambient "which site is active" pointer.
pub trait TenantContext {
    fn current_tenant(&self) -> TenantId;

    /// Make `tenant` current, remembering the previous one.
    ///
    /// Returns `Err(StoreError::TenantNotFound)` for an unknown tenant, in
    /// which case the current tenant is unchanged.
    fn push_tenant(&self, tenant: TenantId) -> Result<(), StoreError>;

    /// Return to the tenant that was current before the matching push.
    /// Returns the tenant now current.
    fn pop_tenant(&self) -> Result<TenantId, StoreError>;
}

/// Scoped tenant switch. Captures the current tenant on [`enter`](Self::enter)
/// and restores it on drop, on every exit path.
pub struct TenantScope<'a, T: TenantContext + ?Sized> {
    ctx: &'a T,
    tenant: TenantId,
    previous: TenantId,
}

impl<'a, T: TenantContext + ?Sized> TenantScope<'a, T> {
    pub fn enter(ctx: &'a T, tenant: TenantId) -> Result<Self, StoreError> {
        let previous = ctx.current_tenant();
        ctx.push_tenant(tenant)?;
        debug!(from = previous, to = tenant, "switched tenant context");
        Ok(Self {
            ctx,
            tenant,
            previous,
        })
    }

    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    pub fn previous(&self) -> TenantId {
        self.previous
    }
}

impl<T: TenantContext + ?Sized> Drop for TenantScope<'_, T> {
    fn drop(&mut self) {
        match self.ctx.pop_tenant() {
            Ok(restored) => debug!(from = self.tenant, to = restored, "restored tenant context"),
            Err(e) => warn!(
                tenant = self.tenant,
                expected = self.previous,
                error = %e,
                "failed to restore tenant context"
            ),
        }
    }
}

/// Lists the sites of the installation.
pub trait SiteDirectory {
    fn sites(&self) -> Result<Vec<Site>, StoreError>;
}

// ── Content, taxonomy, metadata ──────────────────────────────────────────────

pub trait ContentStore {
    /// Returns `Err(StoreError::ItemNotFound)` if no such item exists.
    fn get_item(&self, id: ItemId) -> Result<ContentItem, StoreError>;

    /// Insert `item` as a new record, ignoring its `id`, and return the id
    /// the store assigned. Rejection is reported as an error, never as a
    /// sentinel id.
    fn insert_item(&self, item: &ContentItem) -> Result<ItemId, StoreError>;

    /// Overwrite the given fields of an existing item.
    fn update_item_fields(
        &self,
        id: ItemId,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), StoreError>;
}

pub trait TaxonomyStore {
    fn term_slugs(&self, item: ItemId, taxonomy: &str) -> Result<Vec<String>, StoreError>;

    /// Replace the item's assignment in `taxonomy` with exactly `slugs`.
    fn set_term_slugs(
        &self,
        item: ItemId,
        taxonomy: &str,
        slugs: &[String],
    ) -> Result<(), StoreError>;
}

pub trait MetadataStore {
    fn all_meta(&self, item: ItemId) -> Result<MetaMap, StoreError>;

    /// Append a value; existing values under `key` are kept.
    fn add_meta(&self, item: ItemId, key: &str, value: &str) -> Result<(), StoreError>;

    /// Replace every value under `key` with `value`.
    fn update_meta(&self, item: ItemId, key: &str, value: &str) -> Result<(), StoreError>;

    /// First value stored under `key`.
    fn get_meta(&self, item: ItemId, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.all_meta(item)?.first(key).map(str::to_string))
    }
}

/// The capabilities every clone needs.
pub trait ContentPlatform: TenantContext + ContentStore + TaxonomyStore + MetadataStore {}

impl<T: TenantContext + ContentStore + TaxonomyStore + MetadataStore + ?Sized> ContentPlatform
    for T
{
}

// ── Media ────────────────────────────────────────────────────────────────────

/// File operations on the current tenant's upload area.
///
/// Only [`upload_dir`](Self::upload_dir) is tenant-specific; the rest have
/// local-filesystem defaults.
pub trait FileStorage {
    fn upload_dir(&self) -> Result<UploadDir, StoreError>;

    fn create_dir_all(&self, path: &Path) -> Result<(), StoreError> {
        std::fs::create_dir_all(path).map_err(|e| StoreError::io(path, e))
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// A file name not yet taken in `dir`, derived from `name`.
    fn unique_filename(&self, dir: &Path, name: &str) -> String {
        files::unique_filename(dir, name)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<(), StoreError> {
        std::fs::copy(from, to)
            .map(|_| ())
            .map_err(|e| StoreError::io(from, e))
    }

    fn remove_file(&self, path: &Path) -> Result<(), StoreError> {
        std::fs::remove_file(path).map_err(|e| StoreError::io(path, e))
    }

    /// MIME type implied by the file name, if recognised.
    fn detect_mime(&self, name: &str) -> Option<String> {
        files::mime_for(name).map(str::to_string)
    }
}

/// The attachment (media library) subsystem of the current tenant.
pub trait AttachmentStore {
    /// Image attachments parented to `parent`, by ascending menu order.
    fn image_attachments(&self, parent: ItemId) -> Result<Vec<AttachmentRecord>, StoreError>;

    /// Absolute path of the original uploaded file, if recorded.
    fn original_file_path(&self, id: ItemId) -> Result<Option<std::path::PathBuf>, StoreError>;

    /// Canonical public URL of the attachment, if resolvable.
    fn attachment_url(&self, id: ItemId) -> Result<Option<String>, StoreError>;

    fn attachment_metadata(&self, id: ItemId) -> Result<Option<RenditionMeta>, StoreError>;

    fn alt_text(&self, id: ItemId) -> Result<Option<String>, StoreError>;

    fn set_alt_text(&self, id: ItemId, alt: &str) -> Result<(), StoreError>;

    /// Register `file` as a new attachment of `parent`.
    fn create_attachment(
        &self,
        attachment: &NewAttachment,
        file: &Path,
        parent: ItemId,
    ) -> Result<ItemId, StoreError>;

    /// Produce derived renditions for `file` and describe them.
    fn generate_renditions(&self, id: ItemId, file: &Path) -> Result<RenditionMeta, StoreError>;

    fn update_attachment_metadata(
        &self,
        id: ItemId,
        metadata: &RenditionMeta,
    ) -> Result<(), StoreError>;
}

/// Optional media capability: files plus attachment records.
pub trait MediaLibrary: FileStorage + AttachmentStore {}

impl<T: FileStorage + AttachmentStore + ?Sized> MediaLibrary for T {}

// ── Page builder ─────────────────────────────────────────────────────────────

/// Optional page-builder capability.
pub trait PageBuilder {
    /// The node graph of `variant`, or `Value::Null` when none is stored.
    fn layout_data(&self, variant: LayoutVariant, item: ItemId) -> Result<Value, StoreError>;

    fn set_layout_data(
        &self,
        variant: LayoutVariant,
        item: ItemId,
        data: &Value,
    ) -> Result<(), StoreError>;

    fn layout_settings(
        &self,
        variant: LayoutVariant,
        item: ItemId,
    ) -> Result<Option<Value>, StoreError>;

    fn set_layout_settings(
        &self,
        variant: LayoutVariant,
        item: ItemId,
        settings: &Value,
    ) -> Result<(), StoreError>;

    /// A fresh node identifier, unique within the installation.
    fn generate_node_id(&self) -> String;

    /// Drop cached CSS/JS derived from the layout of `item`.
    fn flush_asset_cache(&self, item: ItemId) -> Result<(), StoreError>;

    /// Template binding id stored on `item`, if any.
    fn template_id(&self, item: ItemId) -> Result<Option<String>, StoreError>;

    /// Whether `item` is a global (shared) node template.
    fn is_global_template(&self, item: ItemId) -> Result<bool, StoreError>;
}
