//! In-memory installation backend.
//!
//! Holds every site's items, terms and metadata in memory, while uploaded
//! files live on the real filesystem below `uploads_root`. The main site
//! uploads to `uploads_root` itself, every other site to
//! `uploads_root/sites/<id>`, mirroring the URL layout
//! `<home>/wp-content/uploads[/sites/<id>]/<file>`.
//!
//! The whole state is serde-serializable so the CLI can keep an
//! installation in a JSON file between runs.

mod builder;
mod media;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::record::{
    fields, ContentItem, ItemId, MetaMap, RenditionMeta, Site, TenantId, UploadDir,
};
use crate::traits::{ContentStore, MetadataStore, SiteDirectory, TaxonomyStore, TenantContext};

/// Serializable contents of an installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationState {
    pub uploads_root: PathBuf,
    #[serde(default = "default_main_site")]
    pub main_site: TenantId,
    #[serde(default)]
    pub sites: BTreeMap<TenantId, SiteState>,
}

fn default_main_site() -> TenantId {
    1
}

/// One site's records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteState {
    pub name: String,
    pub home_url: String,
    #[serde(default)]
    pub next_id: ItemId,
    #[serde(default)]
    pub items: BTreeMap<ItemId, ContentItem>,
    #[serde(default)]
    pub terms: BTreeMap<ItemId, BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    pub meta: BTreeMap<ItemId, MetaMap>,
    #[serde(default)]
    pub attachments: BTreeMap<ItemId, StoredAttachment>,
}

/// File location (relative to the site's upload directory) and metadata
/// of an attachment item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredAttachment {
    pub file: String,
    #[serde(default)]
    pub metadata: Option<RenditionMeta>,
}

/// Failures the backend can be told to produce.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub reject_inserts: bool,
    pub reject_attachments: bool,
    pub upload_dir_unavailable: bool,
}

/// Counts of mutating calls, for asserting what a clone did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Journal {
    pub inserts: usize,
    pub meta_writes: usize,
    pub attachments_created: usize,
    pub layout_writes: usize,
    pub cache_flushes: Vec<(TenantId, ItemId)>,
}

pub(crate) struct Inner {
    pub(crate) state: InstallationState,
    pub(crate) current: TenantId,
    pub(crate) stack: Vec<TenantId>,
    pub(crate) faults: Faults,
    pub(crate) journal: Journal,
}

impl Inner {
    pub(crate) fn site(&self) -> Result<&SiteState, StoreError> {
        self.state
            .sites
            .get(&self.current)
            .ok_or(StoreError::TenantNotFound {
                tenant_id: self.current,
            })
    }

    pub(crate) fn site_mut(&mut self) -> Result<&mut SiteState, StoreError> {
        let current = self.current;
        self.state
            .sites
            .get_mut(&current)
            .ok_or(StoreError::TenantNotFound { tenant_id: current })
    }

    pub(crate) fn item(&self, id: ItemId) -> Result<&ContentItem, StoreError> {
        self.site()?
            .items
            .get(&id)
            .ok_or(StoreError::ItemNotFound {
                tenant_id: self.current,
                item_id: id,
            })
    }

    pub(crate) fn require_item(&self, id: ItemId) -> Result<(), StoreError> {
        self.item(id).map(|_| ())
    }

    pub(crate) fn upload_dir_for(&self, tenant: TenantId) -> Result<UploadDir, StoreError> {
        let site = self
            .state
            .sites
            .get(&tenant)
            .ok_or(StoreError::TenantNotFound { tenant_id: tenant })?;
        let base_url = format!("{}/wp-content/uploads", site.home_url.trim_end_matches('/'));
        if tenant == self.state.main_site {
            Ok(UploadDir {
                path: self.state.uploads_root.clone(),
                url: base_url,
            })
        } else {
            Ok(UploadDir {
                path: self
                    .state
                    .uploads_root
                    .join("sites")
                    .join(tenant.to_string()),
                url: format!("{}/sites/{}", base_url, tenant),
            })
        }
    }

    /// Allocate the next item id of the current site.
    pub(crate) fn allocate_id(&mut self) -> Result<ItemId, StoreError> {
        let site = self.site_mut()?;
        let floor = site.items.keys().next_back().copied().unwrap_or(0);
        let id = site.next_id.max(floor) + 1;
        site.next_id = id;
        Ok(id)
    }

    pub(crate) fn write_meta(
        &mut self,
        item: ItemId,
        key: &str,
        value: &str,
        replace: bool,
    ) -> Result<(), StoreError> {
        self.require_item(item)?;
        let meta = self.site_mut()?.meta.entry(item).or_default();
        if replace {
            meta.set(key, value);
        } else {
            meta.push(key, value);
        }
        Ok(())
    }
}

/// A whole multi-site installation held in memory.
pub struct MemoryInstallation {
    inner: Mutex<Inner>,
}

impl MemoryInstallation {
    /// An installation with no sites, uploading below `uploads_root`.
    pub fn new(uploads_root: impl Into<PathBuf>) -> Self {
        Self::from_state(InstallationState {
            uploads_root: uploads_root.into(),
            main_site: default_main_site(),
            sites: BTreeMap::new(),
        })
    }

    pub fn from_state(state: InstallationState) -> Self {
        let current = state.main_site;
        Self {
            inner: Mutex::new(Inner {
                state,
                current,
                stack: Vec::new(),
                faults: Faults::default(),
                journal: Journal::default(),
            }),
        }
    }

    /// Builder-style site registration.
    pub fn with_site(self, id: TenantId, name: &str, home_url: &str) -> Self {
        if let Ok(mut inner) = self.lock() {
            inner.state.sites.insert(
                id,
                SiteState {
                    name: name.to_string(),
                    home_url: home_url.to_string(),
                    ..SiteState::default()
                },
            );
        }
        self
    }

    /// Read an installation snapshot. A relative `uploads_root` is resolved
    /// against the snapshot's directory.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        let mut state: InstallationState = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Backend(format!("{}: {}", path.display(), e)))?;
        if state.uploads_root.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            state.uploads_root = base.join(&state.uploads_root);
        }
        Ok(Self::from_state(state))
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let state = self.state()?;
        let json = serde_json::to_string_pretty(&state)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| StoreError::io(path, e))
    }

    pub fn state(&self) -> Result<InstallationState, StoreError> {
        Ok(self.lock()?.state.clone())
    }

    pub fn set_faults(&self, faults: Faults) -> Result<(), StoreError> {
        self.lock()?.faults = faults;
        Ok(())
    }

    pub fn journal(&self) -> Result<Journal, StoreError> {
        Ok(self.lock()?.journal.clone())
    }

    /// Make `tenant` current without remembering the previous one.
    pub fn set_current_tenant(&self, tenant: TenantId) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if !inner.state.sites.contains_key(&tenant) {
            return Err(StoreError::TenantNotFound { tenant_id: tenant });
        }
        inner.current = tenant;
        Ok(())
    }

    /// Items of `tenant`, in id order.
    pub fn items_of(&self, tenant: TenantId) -> Result<Vec<ContentItem>, StoreError> {
        let inner = self.lock()?;
        let site = inner
            .state
            .sites
            .get(&tenant)
            .ok_or(StoreError::TenantNotFound { tenant_id: tenant })?;
        Ok(site.items.values().cloned().collect())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("installation lock poisoned".to_string()))
    }

    /// Run `f` with `tenant` temporarily current. Seeding helper for tests
    /// and fixtures; does not touch the push/pop stack.
    pub fn within<R>(
        &self,
        tenant: TenantId,
        f: impl FnOnce(&Self) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let previous = self.current_tenant();
        self.set_current_tenant(tenant)?;
        let result = f(self);
        self.set_current_tenant(previous)?;
        result
    }
}

impl TenantContext for MemoryInstallation {
    fn current_tenant(&self) -> TenantId {
        match self.inner.lock() {
            Ok(inner) => inner.current,
            Err(poisoned) => poisoned.into_inner().current,
        }
    }

    fn push_tenant(&self, tenant: TenantId) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if !inner.state.sites.contains_key(&tenant) {
            return Err(StoreError::TenantNotFound { tenant_id: tenant });
        }
        let previous = inner.current;
        inner.stack.push(previous);
        inner.current = tenant;
        Ok(())
    }

    fn pop_tenant(&self) -> Result<TenantId, StoreError> {
        let mut inner = self.lock()?;
        let previous = inner.stack.pop().ok_or(StoreError::NoTenantToRestore)?;
        inner.current = previous;
        Ok(previous)
    }
}

impl SiteDirectory for MemoryInstallation {
    fn sites(&self) -> Result<Vec<Site>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .state
            .sites
            .iter()
            .map(|(id, site)| Site {
                id: *id,
                name: site.name.clone(),
                home_url: site.home_url.clone(),
            })
            .collect())
    }
}

impl ContentStore for MemoryInstallation {
    fn get_item(&self, id: ItemId) -> Result<ContentItem, StoreError> {
        self.lock()?.item(id).cloned()
    }

    fn insert_item(&self, item: &ContentItem) -> Result<ItemId, StoreError> {
        let mut inner = self.lock()?;
        if inner.faults.reject_inserts {
            return Err(StoreError::InsertRejected {
                tenant_id: inner.current,
                reason: "inserts disabled".to_string(),
            });
        }
        let id = inner.allocate_id()?;
        let mut stored = item.clone();
        stored.id = Some(id);
        if stored.field(fields::TYPE).is_none() {
            stored.set_field(fields::TYPE, "post");
        }
        inner.site_mut()?.items.insert(id, stored);
        inner.journal.inserts += 1;
        Ok(id)
    }

    fn update_item_fields(
        &self,
        id: ItemId,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let current = inner.current;
        let item = inner
            .site_mut()?
            .items
            .get_mut(&id)
            .ok_or(StoreError::ItemNotFound {
                tenant_id: current,
                item_id: id,
            })?;
        for (name, value) in fields {
            item.fields.insert(name.clone(), value.clone());
        }
        Ok(())
    }
}

impl TaxonomyStore for MemoryInstallation {
    fn term_slugs(&self, item: ItemId, taxonomy: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.lock()?;
        inner.require_item(item)?;
        Ok(inner
            .site()?
            .terms
            .get(&item)
            .and_then(|t| t.get(taxonomy))
            .cloned()
            .unwrap_or_default())
    }

    fn set_term_slugs(
        &self,
        item: ItemId,
        taxonomy: &str,
        slugs: &[String],
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.require_item(item)?;
        let mut deduped: Vec<String> = Vec::with_capacity(slugs.len());
        for slug in slugs {
            if !deduped.contains(slug) {
                deduped.push(slug.clone());
            }
        }
        inner
            .site_mut()?
            .terms
            .entry(item)
            .or_default()
            .insert(taxonomy.to_string(), deduped);
        Ok(())
    }
}

impl MetadataStore for MemoryInstallation {
    fn all_meta(&self, item: ItemId) -> Result<MetaMap, StoreError> {
        let inner = self.lock()?;
        inner.require_item(item)?;
        Ok(inner.site()?.meta.get(&item).cloned().unwrap_or_default())
    }

    fn add_meta(&self, item: ItemId, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.write_meta(item, key, value, false)?;
        inner.journal.meta_writes += 1;
        Ok(())
    }

    fn update_meta(&self, item: ItemId, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.write_meta(item, key, value, true)?;
        inner.journal.meta_writes += 1;
        Ok(())
    }
}
