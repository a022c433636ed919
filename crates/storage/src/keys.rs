//! Reserved metadata keys.

/// Previous slugs kept for redirects; meaningless on another site.
pub const OLD_SLUG: &str = "_wp_old_slug";

/// Featured image attachment id.
pub const THUMBNAIL_ID: &str = "_thumbnail_id";

/// Alternative text of an image attachment.
pub const ATTACHMENT_ALT: &str = "_wp_attachment_image_alt";

/// Page-builder template binding id.
pub const BUILDER_TEMPLATE_ID: &str = "_fl_builder_template_id";

/// Marks an item as a global page-builder template.
pub const BUILDER_TEMPLATE_GLOBAL: &str = "_fl_builder_template_global";

/// Page-builder layout keys. The layout is regenerated on clone rather
/// than copied.
pub const BUILDER_DATA_KEYS: [&str; 4] = [
    "_fl_builder_data",
    "_fl_builder_draft",
    "_fl_builder_data_settings",
    "_fl_builder_draft_settings",
];

/// Suffix of the compressed variants of [`BUILDER_DATA_KEYS`].
pub const COMPRESSED_SUFFIX: &str = "_compressed";

/// True for a layout key or its compressed variant.
pub fn is_builder_data_key(key: &str) -> bool {
    let base = key.strip_suffix(COMPRESSED_SUFFIX).unwrap_or(key);
    BUILDER_DATA_KEYS.contains(&base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_data_keys() {
        assert!(is_builder_data_key("_fl_builder_data"));
        assert!(is_builder_data_key("_fl_builder_draft_settings"));
        assert!(is_builder_data_key("_fl_builder_data_settings_compressed"));
        assert!(!is_builder_data_key("_fl_builder_enabled"));
        assert!(!is_builder_data_key(BUILDER_TEMPLATE_ID));
    }
}
