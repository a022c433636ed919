use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::files::{self, split_ext};
use crate::keys;
use crate::record::{
    fields, AttachmentRecord, ContentItem, ItemId, NewAttachment, Rendition, RenditionMeta,
    UploadDir,
};
use crate::traits::{AttachmentStore, ContentStore, FileStorage};

use super::{MemoryInstallation, StoredAttachment};

/// Renditions produced for every image: name, width, height.
const RENDITION_SIZES: [(&str, u32, u32); 2] = [("thumbnail", 150, 150), ("medium", 300, 300)];

impl FileStorage for MemoryInstallation {
    fn upload_dir(&self) -> Result<UploadDir, StoreError> {
        let inner = self.lock()?;
        if inner.faults.upload_dir_unavailable {
            return Err(StoreError::UploadDir("uploads disabled".to_string()));
        }
        inner.upload_dir_for(inner.current)
    }
}

impl AttachmentStore for MemoryInstallation {
    fn image_attachments(&self, parent: ItemId) -> Result<Vec<AttachmentRecord>, StoreError> {
        let inner = self.lock()?;
        let site = inner.site()?;
        let mut found: Vec<AttachmentRecord> = site
            .items
            .values()
            .filter(|item| item.post_type() == "attachment")
            .filter(|item| item.field(fields::PARENT) == Some(parent.to_string().as_str()))
            .filter(|item| {
                item.field(fields::MIME_TYPE)
                    .is_some_and(|m| m.starts_with("image/"))
            })
            .filter_map(|item| {
                Some(AttachmentRecord {
                    id: item.id?,
                    parent,
                    menu_order: item
                        .field(fields::MENU_ORDER)
                        .and_then(|o| o.parse().ok())
                        .unwrap_or(0),
                    mime_type: item.field(fields::MIME_TYPE).unwrap_or("").to_string(),
                    title: item.field(fields::TITLE).unwrap_or("").to_string(),
                })
            })
            .collect();
        found.sort_by_key(|a| (a.menu_order, a.id));
        Ok(found)
    }

    fn original_file_path(&self, id: ItemId) -> Result<Option<PathBuf>, StoreError> {
        let inner = self.lock()?;
        let dir = inner.upload_dir_for(inner.current)?;
        Ok(inner
            .site()?
            .attachments
            .get(&id)
            .filter(|a| !a.file.is_empty())
            .map(|a| dir.path.join(&a.file)))
    }

    fn attachment_url(&self, id: ItemId) -> Result<Option<String>, StoreError> {
        let inner = self.lock()?;
        let dir = inner.upload_dir_for(inner.current)?;
        Ok(inner
            .site()?
            .attachments
            .get(&id)
            .filter(|a| !a.file.is_empty())
            .map(|a| format!("{}/{}", dir.url, a.file)))
    }

    fn attachment_metadata(&self, id: ItemId) -> Result<Option<RenditionMeta>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .site()?
            .attachments
            .get(&id)
            .and_then(|a| a.metadata.clone()))
    }

    fn alt_text(&self, id: ItemId) -> Result<Option<String>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .site()?
            .meta
            .get(&id)
            .and_then(|m| m.first(keys::ATTACHMENT_ALT))
            .map(str::to_string))
    }

    fn set_alt_text(&self, id: ItemId, alt: &str) -> Result<(), StoreError> {
        self.lock()?.write_meta(id, keys::ATTACHMENT_ALT, alt, true)
    }

    fn create_attachment(
        &self,
        attachment: &NewAttachment,
        file: &Path,
        parent: ItemId,
    ) -> Result<ItemId, StoreError> {
        let mut inner = self.lock()?;
        if inner.faults.reject_attachments {
            return Err(StoreError::AttachmentRejected {
                file: file.display().to_string(),
                reason: "attachments disabled".to_string(),
            });
        }
        let dir = inner.upload_dir_for(inner.current)?;
        let relative = match file.strip_prefix(&dir.path) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => {
                return Err(StoreError::AttachmentRejected {
                    file: file.display().to_string(),
                    reason: format!("outside upload directory {}", dir.path.display()),
                })
            }
        };

        let id = inner.allocate_id()?;
        let item = ContentItem {
            id: Some(id),
            ..ContentItem::default()
        }
        .with_field(fields::TYPE, "attachment")
        .with_field(fields::PARENT, parent.to_string())
        .with_field(fields::MIME_TYPE, attachment.mime_type.clone())
        .with_field(fields::TITLE, attachment.title.clone())
        .with_field(fields::CONTENT, attachment.content.clone())
        .with_field(fields::STATUS, attachment.status.clone())
        .with_field(fields::GUID, attachment.guid.clone())
        .with_field(fields::MENU_ORDER, "0");

        let site = inner.site_mut()?;
        site.items.insert(id, item);
        site.attachments.insert(
            id,
            StoredAttachment {
                file: relative,
                metadata: None,
            },
        );
        inner.journal.attachments_created += 1;
        Ok(id)
    }

    fn generate_renditions(&self, id: ItemId, file: &Path) -> Result<RenditionMeta, StoreError> {
        let (relative, mime) = {
            let inner = self.lock()?;
            let stored = inner
                .site()?
                .attachments
                .get(&id)
                .ok_or(StoreError::ItemNotFound {
                    tenant_id: inner.current,
                    item_id: id,
                })?;
            let mime = inner
                .item(id)?
                .field(fields::MIME_TYPE)
                .unwrap_or("")
                .to_string();
            (stored.file.clone(), mime)
        };

        let mut meta = RenditionMeta {
            file: relative,
            ..RenditionMeta::default()
        };
        if !mime.starts_with("image/") {
            return Ok(meta);
        }

        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let (stem, ext) = split_ext(&name);
        let dir = file.parent().unwrap_or_else(|| Path::new("."));
        for (size, width, height) in RENDITION_SIZES {
            let derived = match ext {
                Some(ext) => format!("{}-{}x{}.{}", stem, width, height, ext),
                None => format!("{}-{}x{}", stem, width, height),
            };
            let target = dir.join(&derived);
            std::fs::copy(file, &target).map_err(|e| StoreError::io(&target, e))?;
            meta.sizes.insert(
                size.to_string(),
                Rendition {
                    file: derived,
                    width,
                    height,
                    mime_type: mime.clone(),
                },
            );
        }
        Ok(meta)
    }

    fn update_attachment_metadata(
        &self,
        id: ItemId,
        metadata: &RenditionMeta,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let current = inner.current;
        let stored = inner
            .site_mut()?
            .attachments
            .get_mut(&id)
            .ok_or(StoreError::ItemNotFound {
                tenant_id: current,
                item_id: id,
            })?;
        stored.metadata = Some(metadata.clone());
        Ok(())
    }
}

impl MemoryInstallation {
    /// Upload `source` into the current site's media library as an
    /// attachment of `parent`, with renditions. Fixture helper.
    pub fn upload_attachment(
        &self,
        parent: ItemId,
        source: &Path,
        title: &str,
        alt: Option<&str>,
        menu_order: i64,
    ) -> Result<ItemId, StoreError> {
        let dir = self.upload_dir()?;
        self.create_dir_all(&dir.path)?;
        let original = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let name = self.unique_filename(&dir.path, &original);
        let target = dir.path.join(&name);
        self.copy_file(source, &target)?;

        let mime = files::mime_for(&name).unwrap_or("application/octet-stream");
        let id = self.create_attachment(
            &NewAttachment {
                guid: format!("{}/{}", dir.url, name),
                mime_type: mime.to_string(),
                title: title.to_string(),
                content: String::new(),
                status: "inherit".to_string(),
            },
            &target,
            parent,
        )?;
        self.update_item_fields(
            id,
            &[(fields::MENU_ORDER.to_string(), menu_order.to_string())]
                .into_iter()
                .collect(),
        )?;
        if let Some(alt) = alt {
            self.set_alt_text(id, alt)?;
        }
        let meta = self.generate_renditions(id, &target)?;
        self.update_attachment_metadata(id, &meta)?;
        Ok(id)
    }
}
