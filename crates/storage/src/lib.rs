pub mod conformance;
mod error;
pub mod files;
pub mod keys;
pub mod memory;
mod record;
mod traits;

pub use error::StoreError;
pub use memory::MemoryInstallation;
pub use record::{
    fields, AttachmentRecord, ContentItem, ItemId, LayoutVariant, MetaMap, NewAttachment,
    Rendition, RenditionMeta, Site, TenantId, UploadDir,
};
pub use traits::{
    AttachmentStore, ContentPlatform, ContentStore, FileStorage, MediaLibrary, MetadataStore,
    PageBuilder, SiteDirectory, TaxonomyStore, TenantContext, TenantScope,
};
