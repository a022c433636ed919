//! The clone orchestrator.

use std::collections::BTreeMap;

use sitecopy_storage::{
    fields, keys, ContentPlatform, ItemId, MediaLibrary, PageBuilder, TenantId, TenantScope,
};
use sitecopy_value::{Codec, PhpCodec, ReferenceMaps};
use tracing::{debug, info, instrument, warn};

use crate::error::CloneError;
use crate::layout::{LayoutCloner, LayoutSnapshot};
use crate::media::{collect_descriptors, MediaMigrator};
use crate::metadata::{MetadataTransformer, Transformed};

/// Taxonomy whose term assignment is carried over.
pub const CATEGORY_TAXONOMY: &str = "category";

/// Optional subsystems of the platform, decided once per [`Cloner`].
#[derive(Clone, Copy, Default)]
pub struct Capabilities<'a> {
    pub media: Option<&'a dyn MediaLibrary>,
    pub builder: Option<&'a dyn PageBuilder>,
}

/// Result of cloning one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOutcome {
    pub source_id: ItemId,
    pub new_id: ItemId,
    pub destination: TenantId,
    pub attachments_migrated: usize,
    pub meta_written: usize,
    pub meta_suppressed: usize,
    pub layout_cloned: bool,
}

/// Copies content items from the current tenant to other tenants.
pub struct Cloner<'a, P: ContentPlatform + ?Sized> {
    platform: &'a P,
    capabilities: Capabilities<'a>,
    codec: &'a dyn Codec,
}

impl<'a, P: ContentPlatform + ?Sized> Cloner<'a, P> {
    /// A cloner with no optional capabilities, decoding metadata with
    /// [`PhpCodec`].
    pub fn new(platform: &'a P) -> Self {
        Self {
            platform,
            capabilities: Capabilities::default(),
            codec: &PhpCodec,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities<'a>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_media(mut self, media: &'a dyn MediaLibrary) -> Self {
        self.capabilities.media = Some(media);
        self
    }

    pub fn with_builder(mut self, builder: &'a dyn PageBuilder) -> Self {
        self.capabilities.builder = Some(builder);
        self
    }

    pub fn with_codec(mut self, codec: &'a dyn Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn capabilities(&self) -> Capabilities<'a> {
        self.capabilities
    }

    /// Clone `source_id` from the current tenant into `destination`.
    ///
    /// Everything the destination needs from the source is read before the
    /// switch. The current tenant is restored on every return path. Only a
    /// failed read, switch, insert or layout write is an error; attachment
    /// and metadata failures are logged and skipped. Calling twice creates
    /// two copies.
    #[instrument(skip(self), fields(source_tenant = self.platform.current_tenant()))]
    pub fn clone_item(
        &self,
        source_id: ItemId,
        destination: TenantId,
    ) -> Result<CloneOutcome, CloneError> {
        let source_tenant = self.platform.current_tenant();
        let read_error = |what| CloneError::read(source_id, what);

        let mut item = self
            .platform
            .get_item(source_id)
            .map_err(|source| CloneError::SourceNotFound {
                tenant_id: source_tenant,
                item_id: source_id,
                source,
            })?;
        let terms = self
            .platform
            .term_slugs(source_id, CATEGORY_TAXONOMY)
            .map_err(read_error("terms"))?;
        let meta = self
            .platform
            .all_meta(source_id)
            .map_err(read_error("metadata"))?;
        item.id = None;

        let descriptors = match self.capabilities.media {
            Some(media) => collect_descriptors(media, source_id).map_err(read_error("attachments"))?,
            None => Vec::new(),
        };
        let layout = match self.capabilities.builder {
            Some(builder) => Some(
                LayoutSnapshot::capture(builder, source_id).map_err(read_error("layout"))?,
            ),
            None => None,
        };

        let scope = TenantScope::enter(self.platform, destination).map_err(|source| {
            CloneError::Switch {
                tenant_id: destination,
                source,
            }
        })?;

        let new_id = self
            .platform
            .insert_item(&item)
            .map_err(|source| CloneError::Insert {
                tenant_id: destination,
                source,
            })?;
        debug!(new_id, "inserted destination item");

        let maps = match self.capabilities.media {
            Some(media) if !descriptors.is_empty() => {
                MediaMigrator::new(media).migrate(&descriptors, new_id)
            }
            _ => ReferenceMaps::new(),
        };

        if maps.has_urls() {
            let body = item.content();
            let rewritten = maps.replace_urls(body);
            if rewritten != body {
                let update = BTreeMap::from([(fields::CONTENT.to_string(), rewritten)]);
                if let Err(e) = self.platform.update_item_fields(new_id, &update) {
                    warn!(new_id, error = %e, "body urls not rewritten");
                }
            }
        }

        if let Err(e) = self.platform.set_term_slugs(new_id, CATEGORY_TAXONOMY, &terms) {
            warn!(new_id, error = %e, "terms not assigned");
        }

        let mut outcome = CloneOutcome {
            source_id,
            new_id,
            destination,
            attachments_migrated: maps.ids().len(),
            meta_written: 0,
            meta_suppressed: 0,
            layout_cloned: false,
        };

        let transformer = MetadataTransformer::new(&maps, self.codec, self.capabilities.builder);
        for (key, value) in meta.pairs() {
            if key == keys::OLD_SLUG {
                continue;
            }
            match transformer.transform(key, value) {
                Transformed::Suppressed => outcome.meta_suppressed += 1,
                Transformed::Value(v) => match self.platform.add_meta(new_id, key, &v) {
                    Ok(()) => outcome.meta_written += 1,
                    Err(e) => warn!(new_id, key, error = %e, "metadata entry skipped"),
                },
            }
        }

        if let (Some(builder), Some(layout)) = (self.capabilities.builder, layout) {
            if layout.is_empty() {
                debug!("source has no layout");
            } else {
                LayoutCloner::new(builder).clone_layout(layout, &maps, new_id, source_id)?;
                outcome.layout_cloned = true;
            }
        }

        drop(scope);
        info!(
            new_id,
            attachments = outcome.attachments_migrated,
            meta = outcome.meta_written,
            layout = outcome.layout_cloned,
            "cloned item"
        );
        Ok(outcome)
    }
}
