use rand::Rng;
use sitecopy_value::{Codec, PhpCodec, Value};

use crate::error::StoreError;
use crate::keys;
use crate::record::{ItemId, LayoutVariant};
use crate::traits::PageBuilder;

use super::{Inner, MemoryInstallation};

/// Length of a generated node id, in hex characters.
const NODE_ID_LEN: usize = 13;

impl MemoryInstallation {
    fn read_encoded(&self, item: ItemId, key: &str) -> Result<Option<Value>, StoreError> {
        let inner = self.lock()?;
        inner.require_item(item)?;
        Ok(first_meta(&inner, item, key).and_then(|raw| PhpCodec.maybe_decode(&raw)))
    }

    fn write_encoded(&self, item: ItemId, key: &str, value: &Value) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.write_meta(item, key, &PhpCodec.encode(value), true)?;
        inner.journal.layout_writes += 1;
        Ok(())
    }
}

fn first_meta(inner: &Inner, item: ItemId, key: &str) -> Option<String> {
    inner
        .site()
        .ok()?
        .meta
        .get(&item)?
        .first(key)
        .map(str::to_string)
}

impl PageBuilder for MemoryInstallation {
    fn layout_data(&self, variant: LayoutVariant, item: ItemId) -> Result<Value, StoreError> {
        Ok(self
            .read_encoded(item, variant.data_key())?
            .unwrap_or(Value::Null))
    }

    fn set_layout_data(
        &self,
        variant: LayoutVariant,
        item: ItemId,
        data: &Value,
    ) -> Result<(), StoreError> {
        self.write_encoded(item, variant.data_key(), data)
    }

    fn layout_settings(
        &self,
        variant: LayoutVariant,
        item: ItemId,
    ) -> Result<Option<Value>, StoreError> {
        self.read_encoded(item, variant.settings_key())
    }

    fn set_layout_settings(
        &self,
        variant: LayoutVariant,
        item: ItemId,
        settings: &Value,
    ) -> Result<(), StoreError> {
        self.write_encoded(item, variant.settings_key(), settings)
    }

    fn generate_node_id(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..NODE_ID_LEN)
            .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
            .collect()
    }

    fn flush_asset_cache(&self, item: ItemId) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let current = inner.current;
        inner.journal.cache_flushes.push((current, item));
        Ok(())
    }

    fn template_id(&self, item: ItemId) -> Result<Option<String>, StoreError> {
        let inner = self.lock()?;
        inner.require_item(item)?;
        Ok(first_meta(&inner, item, keys::BUILDER_TEMPLATE_ID).filter(|id| !id.is_empty()))
    }

    fn is_global_template(&self, item: ItemId) -> Result<bool, StoreError> {
        let inner = self.lock()?;
        inner.require_item(item)?;
        Ok(first_meta(&inner, item, keys::BUILDER_TEMPLATE_GLOBAL)
            .map(|flag| Value::Str(flag).is_truthy())
            .unwrap_or(false))
    }
}
