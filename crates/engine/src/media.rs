//! Attachment snapshot and migration.
//!
//! Descriptors are captured in the source tenant, where file paths and
//! URLs still resolve. After the switch, [`MediaMigrator`] copies each file
//! into the destination upload directory, registers it as an attachment of
//! the new item, and records which source ids and URLs now point where.

use std::path::{Path, PathBuf};

use sitecopy_storage::files::{basename, split_ext};
use sitecopy_storage::{
    ItemId, MediaLibrary, NewAttachment, RenditionMeta, StoreError, UploadDir,
};
use sitecopy_value::ReferenceMaps;
use tracing::{debug, warn};
use url::Url;

/// Source-tenant snapshot of one image attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDescriptor {
    pub id: ItemId,
    /// Original upload on disk. `None` when it cannot be located; the URL
    /// is still mapped so references keep resolving.
    pub file: Option<PathBuf>,
    pub url: String,
    pub metadata: Option<RenditionMeta>,
    pub alt: Option<String>,
    pub title: String,
    pub mime_type: String,
}

/// Describe every image attachment of `parent` in the current tenant, by
/// ascending menu order.
///
/// Only listing the attachments can fail. A field that cannot be read for
/// one attachment is left empty and logged.
pub fn collect_descriptors<M: MediaLibrary + ?Sized>(
    media: &M,
    parent: ItemId,
) -> Result<Vec<AttachmentDescriptor>, StoreError> {
    let records = media.image_attachments(parent)?;
    let mut descriptors = Vec::with_capacity(records.len());
    for record in records {
        let file = logged(media.original_file_path(record.id), record.id, "file path")
            .filter(|path| {
                let found = media.file_exists(path);
                if !found {
                    debug!(attachment = record.id, path = %path.display(), "attachment file missing");
                }
                found
            });
        descriptors.push(AttachmentDescriptor {
            id: record.id,
            file,
            url: logged(media.attachment_url(record.id), record.id, "url").unwrap_or_default(),
            metadata: logged(media.attachment_metadata(record.id), record.id, "metadata"),
            alt: logged(media.alt_text(record.id), record.id, "alt text"),
            title: record.title,
            mime_type: record.mime_type,
        });
    }
    debug!(parent, count = descriptors.len(), "collected attachment descriptors");
    Ok(descriptors)
}

fn logged<T>(result: Result<Option<T>, StoreError>, attachment: ItemId, what: &str) -> Option<T> {
    result.unwrap_or_else(|e| {
        warn!(attachment, error = %e, "cannot read attachment {}", what);
        None
    })
}

/// A successfully copied attachment.
struct Migrated {
    id: ItemId,
    url: Option<String>,
    metadata: Option<RenditionMeta>,
}

/// Copies attachments into the current (destination) tenant.
pub struct MediaMigrator<'a, M: MediaLibrary + ?Sized> {
    media: &'a M,
}

impl<'a, M: MediaLibrary + ?Sized> MediaMigrator<'a, M> {
    pub fn new(media: &'a M) -> Self {
        Self { media }
    }

    /// Migrate `descriptors` in order, attaching the copies to
    /// `destination_item`, and return the id and URL correspondences.
    ///
    /// Failures never abort the batch. A descriptor hosted on another
    /// domain, or whose file is missing, gets an identity URL mapping. One
    /// whose copy or registration fails gets no mapping at all. If the
    /// upload directory cannot be resolved nothing is processed.
    pub fn migrate(
        &self,
        descriptors: &[AttachmentDescriptor],
        destination_item: ItemId,
    ) -> ReferenceMaps {
        let mut maps = ReferenceMaps::new();
        if descriptors.is_empty() {
            return maps;
        }

        let uploads = match self.media.upload_dir() {
            Ok(dir) if !dir.url.is_empty() => dir,
            Ok(_) => {
                warn!("upload directory has no public url, skipping attachments");
                return maps;
            }
            Err(e) => {
                warn!(error = %e, "upload directory unavailable, skipping attachments");
                return maps;
            }
        };
        if let Err(e) = self.media.create_dir_all(&uploads.path) {
            warn!(error = %e, "cannot create upload directory, skipping attachments");
            return maps;
        }
        let upload_host = host_of(&uploads.url);

        for descriptor in descriptors {
            if is_foreign(&descriptor.url, upload_host.as_deref()) {
                debug!(attachment = descriptor.id, url = %descriptor.url, "cross-domain attachment kept as is");
                maps.insert_url(&descriptor.url, &descriptor.url);
                continue;
            }

            let file = descriptor
                .file
                .as_deref()
                .filter(|path| self.media.file_exists(path));
            let Some(file) = file else {
                debug!(attachment = descriptor.id, "no source file, keeping original url");
                if !descriptor.url.is_empty() {
                    maps.insert_url(&descriptor.url, &descriptor.url);
                }
                continue;
            };

            match self.copy_attachment(descriptor, file, &uploads, destination_item) {
                Ok(migrated) => record(&mut maps, descriptor, migrated),
                Err(e) => warn!(attachment = descriptor.id, error = %e, "attachment skipped"),
            }
        }

        debug!(
            ids = maps.ids().len(),
            urls = maps.urls().len(),
            "attachment migration finished"
        );
        maps
    }

    fn copy_attachment(
        &self,
        descriptor: &AttachmentDescriptor,
        file: &Path,
        uploads: &UploadDir,
        parent: ItemId,
    ) -> Result<Migrated, StoreError> {
        let original_name = basename(&file.to_string_lossy()).to_string();
        let name = self.media.unique_filename(&uploads.path, &original_name);
        let destination = uploads.path.join(&name);
        let destination_url = format!("{}/{}", uploads.url.trim_end_matches('/'), name);

        self.media.copy_file(file, &destination)?;

        let mime_type = self
            .media
            .detect_mime(&name)
            .unwrap_or_else(|| descriptor.mime_type.clone());
        let title = if descriptor.title.is_empty() {
            split_ext(&name).0.to_string()
        } else {
            descriptor.title.clone()
        };
        let created = self.media.create_attachment(
            &NewAttachment {
                guid: destination_url,
                mime_type,
                title,
                content: String::new(),
                status: "inherit".to_string(),
            },
            &destination,
            parent,
        );
        let id = match created {
            Ok(id) => id,
            Err(e) => {
                // Nothing references the copy without its attachment record.
                if let Err(cleanup) = self.media.remove_file(&destination) {
                    warn!(path = %destination.display(), error = %cleanup, "orphaned copy not removed");
                }
                return Err(e);
            }
        };

        if let Some(alt) = descriptor.alt.as_deref().filter(|a| !a.is_empty()) {
            if let Err(e) = self.media.set_alt_text(id, alt) {
                warn!(attachment = id, error = %e, "alt text not copied");
            }
        }

        let metadata = match self.media.generate_renditions(id, &destination) {
            Ok(meta) => {
                if let Err(e) = self.media.update_attachment_metadata(id, &meta) {
                    warn!(attachment = id, error = %e, "rendition metadata not stored");
                }
                Some(meta)
            }
            Err(e) => {
                warn!(attachment = id, error = %e, "renditions not generated");
                None
            }
        };

        let url = logged(self.media.attachment_url(id), id, "url");
        debug!(from = descriptor.id, to = id, file = %name, "copied attachment");
        Ok(Migrated { id, url, metadata })
    }
}

fn record(maps: &mut ReferenceMaps, descriptor: &AttachmentDescriptor, migrated: Migrated) {
    maps.insert_id(descriptor.id, migrated.id);

    let Some(new_url) = migrated.url.filter(|u| !u.is_empty()) else {
        return;
    };
    if descriptor.url.is_empty() {
        return;
    }
    maps.insert_url(&descriptor.url, &new_url);

    let (Some(old_meta), Some(new_meta)) = (&descriptor.metadata, &migrated.metadata) else {
        return;
    };
    let old_base = base_url(&descriptor.url);
    let new_base = base_url(&new_url);
    for (size, old) in &old_meta.sizes {
        if old.file.is_empty() {
            continue;
        }
        if let Some(new) = new_meta.sizes.get(size).filter(|r| !r.file.is_empty()) {
            maps.insert_url(
                format!("{}{}", old_base, old.file),
                format!("{}{}", new_base, new.file),
            );
        }
    }
}

/// `url` without its last path segment, ending in `/`.
fn base_url(url: &str) -> String {
    match url.rfind('/') {
        Some(i) => url[..=i].to_string(),
        None => String::new(),
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_ascii_lowercase)
}

/// True when `url` names a host other than the upload host. URLs without
/// a parseable host are treated as local.
fn is_foreign(url: &str, upload_host: Option<&str>) -> bool {
    match (host_of(url), upload_host) {
        (Some(host), Some(upload)) => host != upload,
        _ => false,
    }
}
