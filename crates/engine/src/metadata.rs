use sitecopy_storage::keys;
use sitecopy_storage::PageBuilder;
use sitecopy_value::{Codec, ReferenceMaps, Value};
use tracing::debug;

/// What to write for one source metadata value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed {
    Value(String),
    /// Write nothing for this pair.
    Suppressed,
}

/// Decides how each metadata value is carried into the destination tenant.
pub struct MetadataTransformer<'a> {
    maps: &'a ReferenceMaps,
    codec: &'a dyn Codec,
    builder: Option<&'a dyn PageBuilder>,
}

impl<'a> MetadataTransformer<'a> {
    /// `builder` is the page-builder capability, present when the layout
    /// is regenerated by the layout cloner.
    pub fn new(
        maps: &'a ReferenceMaps,
        codec: &'a dyn Codec,
        builder: Option<&'a dyn PageBuilder>,
    ) -> Self {
        Self {
            maps,
            codec,
            builder,
        }
    }

    /// Transform one `(key, value)` pair. First matching rule wins:
    ///
    /// 1. template binding id: fresh node id (builder present)
    /// 2. layout data keys: suppressed (builder present)
    /// 3. no mappings: unchanged
    /// 4. featured image id: remapped when known
    /// 5. encoded value: decoded, rewritten, re-encoded; encoded numbers
    ///    and flags are kept, encoded strings get URL substitution only
    /// 6. encoded-looking value that fails to decode: unchanged
    /// 7. plain string: URL substitution
    pub fn transform(&self, key: &str, value: &str) -> Transformed {
        if let Some(builder) = self.builder {
            if key == keys::BUILDER_TEMPLATE_ID {
                return Transformed::Value(builder.generate_node_id());
            }
            if keys::is_builder_data_key(key) {
                return Transformed::Suppressed;
            }
        }

        if self.maps.is_empty() {
            return Transformed::Value(value.to_string());
        }

        if key == keys::THUMBNAIL_ID {
            return Transformed::Value(self.thumbnail(value));
        }

        if let Some(decoded) = self.codec.maybe_decode(value) {
            let rewritten = match &decoded {
                v if v.is_structured() => self.maps.rewrite(v),
                Value::Str(s) => Value::Str(self.maps.replace_urls(s)),
                _ => return Transformed::Value(value.to_string()),
            };
            if rewritten == decoded {
                return Transformed::Value(value.to_string());
            }
            return Transformed::Value(self.codec.encode(&rewritten));
        }

        if self.codec.looks_encoded(value) {
            debug!(key, codec = self.codec.name(), "undecodable encoded value copied verbatim");
            return Transformed::Value(value.to_string());
        }

        if self.maps.has_urls() {
            return Transformed::Value(self.maps.replace_urls(value));
        }
        Transformed::Value(value.to_string())
    }

    fn thumbnail(&self, value: &str) -> String {
        let decoded = self
            .codec
            .maybe_decode(value)
            .unwrap_or_else(|| Value::Str(value.to_string()));
        match decoded.as_i64().and_then(|old| self.maps.id(old)) {
            Some(new) => new.to_string(),
            None => value.to_string(),
        }
    }
}
