//! The bulk-action entry point and the redirect notice it produces.
//!
//! The admin list offers one `clone_to_<tenant>` action per destination
//! site. Running it clones every selected item and returns the redirect URL
//! with three query arguments added:
//!
//! - `mpcl_posts_moved`: number of items selected
//! - `mpcl_blogid`: destination tenant
//! - `mpcl_nonce`: a token that lets the notice page trust the other two

use sha2::{Digest, Sha256};
use sitecopy_storage::{ContentPlatform, ItemId, Site, TenantId};
use tracing::{info, warn};
use url::form_urlencoded;

use crate::clone::{CloneOutcome, Cloner};
use crate::settings::Settings;

pub const MOVED_ARG: &str = "mpcl_posts_moved";
pub const TENANT_ARG: &str = "mpcl_blogid";
pub const NONCE_ARG: &str = "mpcl_nonce";

/// Action name the notice token is bound to.
pub const NOTICE_ACTION: &str = "mpcl_bulk_action_nonce";

/// Token validity window, in seconds. A token stays valid for one to two
/// windows.
const TICK_SECONDS: i64 = 43_200;
const TOKEN_LEN: usize = 10;

// ── Bulk action ──────────────────────────────────────────────────────────────

/// Per-item results of one bulk action.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    pub redirect: String,
    pub destination: Option<TenantId>,
    pub cloned: Vec<CloneOutcome>,
    pub failed: Vec<(ItemId, String)>,
}

pub struct BulkActionHandler<'a, P: ContentPlatform + ?Sized> {
    cloner: Cloner<'a, P>,
    settings: &'a Settings,
}

impl<'a, P: ContentPlatform + ?Sized> BulkActionHandler<'a, P> {
    pub fn new(cloner: Cloner<'a, P>, settings: &'a Settings) -> Self {
        Self { cloner, settings }
    }

    /// Run `action` over `item_ids` and return the URL to redirect to.
    pub fn handle(&self, redirect: &str, action: &str, item_ids: &[ItemId]) -> String {
        self.run(redirect, action, item_ids).redirect
    }

    /// As [`handle`](Self::handle), keeping the per-item results.
    ///
    /// Actions that are not clone actions only strip stale notice
    /// arguments from `redirect`. A failed item is logged and the batch
    /// continues. The reported count is the number of items selected.
    pub fn run(&self, redirect: &str, action: &str, item_ids: &[ItemId]) -> BulkReport {
        let stripped = edit_query(redirect, &[MOVED_ARG, TENANT_ARG], &[]);
        let mut report = BulkReport {
            redirect: stripped,
            ..BulkReport::default()
        };

        let Some(suffix) = action.strip_prefix(self.settings.action_prefix.as_str()) else {
            return report;
        };
        let destination: TenantId = match suffix.parse() {
            Ok(id) => id,
            Err(_) => {
                warn!(action, "bulk action names no tenant");
                return report;
            }
        };
        report.destination = Some(destination);

        for &item in item_ids {
            match self.cloner.clone_item(item, destination) {
                Ok(outcome) => report.cloned.push(outcome),
                Err(e) => {
                    warn!(item, destination, error = %e, "item not cloned");
                    report.failed.push((item, e.to_string()));
                }
            }
        }
        info!(
            destination,
            selected = item_ids.len(),
            cloned = report.cloned.len(),
            failed = report.failed.len(),
            "bulk clone finished"
        );

        let token = NoticeToken::new(&self.settings.nonce_secret).create(NOTICE_ACTION);
        report.redirect = edit_query(
            &report.redirect,
            &[],
            &[
                (MOVED_ARG, item_ids.len().to_string()),
                (TENANT_ARG, destination.to_string()),
                (NONCE_ARG, token),
            ],
        );
        report
    }
}

/// Bulk-action menu entries for the current site: one
/// `clone_to_<id>` → `Clone to "<name>"` pair per other site, in site
/// order, at most `settings.max_sites`.
pub fn bulk_action_entries(
    sites: &[Site],
    current: TenantId,
    settings: &Settings,
) -> Vec<(String, String)> {
    sites
        .iter()
        .filter(|site| site.id != current)
        .take(settings.max_sites)
        .map(|site| {
            (
                format!("{}{}", settings.action_prefix, site.id),
                format!("Clone to \"{}\"", site.name),
            )
        })
        .collect()
}

// ── Notice ───────────────────────────────────────────────────────────────────

/// Short-lived token binding a redirect notice to a secret.
pub struct NoticeToken<'a> {
    secret: &'a str,
}

impl<'a> NoticeToken<'a> {
    pub fn new(secret: &'a str) -> Self {
        Self { secret }
    }

    pub fn create(&self, action: &str) -> String {
        self.create_at(action, now())
    }

    pub fn create_at(&self, action: &str, unix_time: i64) -> String {
        self.digest(action, unix_time.div_euclid(TICK_SECONDS))
    }

    pub fn verify(&self, action: &str, token: &str) -> bool {
        self.verify_at(action, token, now())
    }

    /// Accepts tokens from the current and the previous window.
    pub fn verify_at(&self, action: &str, token: &str, unix_time: i64) -> bool {
        let tick = unix_time.div_euclid(TICK_SECONDS);
        !token.is_empty() && [tick, tick - 1].iter().any(|t| self.digest(action, *t) == token)
    }

    fn digest(&self, action: &str, tick: i64) -> String {
        let hash = Sha256::digest(format!("{}:{}:{}", self.secret, action, tick).as_bytes());
        let mut hex = format!("{:x}", hash);
        hex.truncate(TOKEN_LEN);
        hex
    }
}

fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// The "items cloned" notice carried by a redirect URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkNotice {
    pub count: usize,
    pub tenant: TenantId,
}

impl BulkNotice {
    /// Read the notice from a redirect URL (or bare query string). Returns
    /// `None` when the arguments are missing, malformed or not signed by
    /// `token`.
    pub fn from_url(url: &str, token: &NoticeToken<'_>) -> Option<Self> {
        let query = split_url(url).1;
        let mut count = None;
        let mut tenant = None;
        let mut nonce = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                MOVED_ARG => count = value.parse().ok(),
                TENANT_ARG => tenant = value.parse().ok(),
                NONCE_ARG => nonce = Some(value.into_owned()),
                _ => {}
            }
        }
        if !token.verify(NOTICE_ACTION, nonce.as_deref()?) {
            warn!("bulk notice token rejected");
            return None;
        }
        Some(Self {
            count: count?,
            tenant: tenant?,
        })
    }

    pub fn message(&self, site_name: &str) -> String {
        if self.count == 1 {
            format!("{} post has been cloned into \"{}\".", self.count, site_name)
        } else {
            format!("{} posts have been cloned into \"{}\".", self.count, site_name)
        }
    }
}

// ── Query editing ────────────────────────────────────────────────────────────

/// Split into (path, query, fragment). Works for absolute and relative
/// URLs; a string without `?` is taken as a bare query only if it has `=`.
fn split_url(url: &str) -> (&str, &str, &str) {
    let (rest, fragment) = match url.find('#') {
        Some(i) => url.split_at(i),
        None => (url, ""),
    };
    match rest.find('?') {
        Some(i) => (&rest[..i], &rest[i + 1..], fragment),
        None if rest.contains('=') && !rest.contains('/') => ("", rest, fragment),
        None => (rest, "", fragment),
    }
}

/// Remove `remove` and set `add` in the query of `url`, keeping the other
/// arguments in order.
fn edit_query(url: &str, remove: &[&str], add: &[(&str, String)]) -> String {
    let (path, query, fragment) = split_url(url);
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let key = key.as_ref();
        if remove.contains(&key) || add.iter().any(|(k, _)| *k == key) {
            continue;
        }
        serializer.append_pair(key, &value);
    }
    for (key, value) in add {
        serializer.append_pair(key, value);
    }
    let query = serializer.finish();
    if query.is_empty() {
        format!("{}{}", path, fragment)
    } else {
        format!("{}?{}{}", path, query, fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sites() -> Vec<Site> {
        (1..=4)
            .map(|id| Site {
                id,
                name: format!("Site {}", id),
                home_url: format!("https://example.test/s{}", id),
            })
            .collect()
    }

    #[test]
    fn test_entries_exclude_current_site() {
        let entries = bulk_action_entries(&sites(), 2, &Settings::default());
        assert_eq!(
            entries,
            vec![
                ("clone_to_1".to_string(), "Clone to \"Site 1\"".to_string()),
                ("clone_to_3".to_string(), "Clone to \"Site 3\"".to_string()),
                ("clone_to_4".to_string(), "Clone to \"Site 4\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_entries_are_capped() {
        let settings = Settings {
            max_sites: 2,
            ..Settings::default()
        };
        assert_eq!(bulk_action_entries(&sites(), 1, &settings).len(), 2);
    }

    #[test]
    fn test_edit_query_strips_and_appends() {
        let url = "https://example.test/wp-admin/edit.php?post_type=page&mpcl_blogid=3&paged=2#top";
        assert_eq!(
            edit_query(url, &[TENANT_ARG], &[(MOVED_ARG, "2".to_string())]),
            "https://example.test/wp-admin/edit.php?post_type=page&paged=2&mpcl_posts_moved=2#top"
        );
        assert_eq!(
            edit_query("edit.php?mpcl_posts_moved=1", &[MOVED_ARG], &[]),
            "edit.php"
        );
    }

    #[test]
    fn test_token_verifies_within_two_windows() {
        let token = NoticeToken::new("secret");
        let t0 = 1_700_000_000;
        let issued = token.create_at(NOTICE_ACTION, t0);
        assert_eq!(issued.len(), TOKEN_LEN);
        assert!(issued.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(token.verify_at(NOTICE_ACTION, &issued, t0));
        assert!(token.verify_at(NOTICE_ACTION, &issued, t0 + TICK_SECONDS));
        assert!(!token.verify_at(NOTICE_ACTION, &issued, t0 + 3 * TICK_SECONDS));
        assert!(!token.verify_at("other_action", &issued, t0));
        assert!(!NoticeToken::new("other").verify_at(NOTICE_ACTION, &issued, t0));
        assert!(!token.verify_at(NOTICE_ACTION, "", t0));
    }

    #[test]
    fn test_notice_round_trips_through_redirect() {
        let token = NoticeToken::new("secret");
        let nonce = token.create(NOTICE_ACTION);
        let url = format!(
            "https://example.test/wp-admin/edit.php?mpcl_posts_moved=3&mpcl_blogid=2&mpcl_nonce={}",
            nonce
        );
        let notice = BulkNotice::from_url(&url, &token).unwrap();
        assert_eq!(notice, BulkNotice { count: 3, tenant: 2 });
        assert_eq!(notice.message("Shop"), "3 posts have been cloned into \"Shop\".");
        assert_eq!(
            BulkNotice { count: 1, tenant: 2 }.message("Shop"),
            "1 post has been cloned into \"Shop\"."
        );
    }

    #[test]
    fn test_notice_without_valid_token_is_ignored() {
        let token = NoticeToken::new("secret");
        assert_eq!(
            BulkNotice::from_url("edit.php?mpcl_posts_moved=3&mpcl_blogid=2", &token),
            None
        );
        assert_eq!(
            BulkNotice::from_url(
                "edit.php?mpcl_posts_moved=3&mpcl_blogid=2&mpcl_nonce=0000000000",
                &token
            ),
            None
        );
    }
}
