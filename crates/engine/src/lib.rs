//! Cross-tenant content cloning.
//!
//! [`Cloner::clone_item`] copies one content item from the current tenant
//! of a multi-site installation into another tenant: fields, category
//! terms, metadata, image attachments and page-builder layout. Attachment
//! ids and URLs inside the body, metadata and layout are rewritten so they
//! resolve in the destination.
//!
//! The platform is reached only through the `sitecopy-storage` traits.
//! Media and page-builder support are optional [`Capabilities`].
//!
//! [`BulkActionHandler`] wraps the cloner for the admin bulk-action menu.

mod bulk;
mod clone;
mod error;
pub mod layout;
pub mod media;
pub mod metadata;
mod settings;

pub use bulk::{
    bulk_action_entries, BulkActionHandler, BulkNotice, BulkReport, NoticeToken, MOVED_ARG,
    NONCE_ARG, NOTICE_ACTION, TENANT_ARG,
};
pub use clone::{Capabilities, CloneOutcome, Cloner, CATEGORY_TAXONOMY};
pub use error::{CloneError, SettingsError};
pub use layout::{LayoutCloner, LayoutOutcome, LayoutSnapshot};
pub use media::{collect_descriptors, AttachmentDescriptor, MediaMigrator};
pub use metadata::{MetadataTransformer, Transformed};
pub use settings::Settings;
