//! Subcommand implementations.
//!
//! Every command reads the installation snapshot and the settings file
//! named on the command line; `clone` writes the snapshot back.

use std::collections::BTreeMap;
use std::path::Path;
use std::process;
use std::str::FromStr;

use serde_json::json;
use sitecopy_engine::{
    bulk_action_entries, BulkActionHandler, BulkNotice, Cloner, NoticeToken, Settings,
};
use sitecopy_storage::memory::{InstallationState, SiteState};
use sitecopy_storage::{ItemId, MemoryInstallation, SiteDirectory, TenantId};

use crate::{or_exit, report_error, OutputFormat};

/// Paths and output options shared by every command.
pub(crate) struct Context<'a> {
    pub state: &'a Path,
    pub settings: &'a Path,
    pub output: OutputFormat,
    pub quiet: bool,
}

impl Context<'_> {
    fn check<T, E: std::fmt::Display>(&self, result: Result<T, E>) -> T {
        or_exit(result, self.output, self.quiet)
    }

    fn fail(&self, msg: &str) -> ! {
        report_error(msg, self.output, self.quiet);
        process::exit(1);
    }

    fn load(&self) -> (MemoryInstallation, Settings) {
        let installation = self.check(MemoryInstallation::load(self.state));
        let settings = self.check(Settings::load(self.settings));
        (installation, settings)
    }
}

/// `--site <id>,<name>,<home url>`.
#[derive(Debug, Clone)]
pub(crate) struct SiteArg {
    pub id: TenantId,
    pub name: String,
    pub home_url: String,
}

impl FromStr for SiteArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ',');
        let (Some(id), Some(name), Some(home_url)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("expected <id>,<name>,<home url>, got '{}'", s));
        };
        let id = id
            .trim()
            .parse()
            .map_err(|_| format!("invalid site id '{}'", id))?;
        let home_url = home_url.trim();
        if !home_url.starts_with("http://") && !home_url.starts_with("https://") {
            return Err(format!("home url must be http(s), got '{}'", home_url));
        }
        Ok(Self {
            id,
            name: name.trim().to_string(),
            home_url: home_url.trim_end_matches('/').to_string(),
        })
    }
}

// ── init ─────────────────────────────────────────────────────────────────────

pub(crate) fn cmd_init(ctx: &Context<'_>, uploads: &Path, sites: &[SiteArg], force: bool) {
    if ctx.state.exists() && !force {
        ctx.fail(&format!(
            "error: {} already exists (use --force to overwrite)",
            ctx.state.display()
        ));
    }

    let mut by_id = BTreeMap::new();
    for site in sites {
        let state = SiteState {
            name: site.name.clone(),
            home_url: site.home_url.clone(),
            ..SiteState::default()
        };
        if by_id.insert(site.id, state).is_some() {
            ctx.fail(&format!("error: site {} given twice", site.id));
        }
    }
    let Some(&main_site) = by_id.keys().next() else {
        ctx.fail("error: at least one --site is required");
    };

    let installation = MemoryInstallation::from_state(InstallationState {
        uploads_root: uploads.to_path_buf(),
        main_site,
        sites: by_id,
    });
    ctx.check(installation.save(ctx.state));
    let settings = ctx.check(Settings::activate(ctx.settings));

    if ctx.quiet {
        return;
    }
    match ctx.output {
        OutputFormat::Text => println!(
            "initialized {} with {} site(s); bulk cloning enabled for {}",
            ctx.state.display(),
            sites.len(),
            settings.post_types.join(", ")
        ),
        OutputFormat::Json => println!(
            "{}",
            json!({
                "state": ctx.state.display().to_string(),
                "sites": sites.len(),
                "main_site": main_site,
                "post_types": settings.post_types,
            })
        ),
    }
}

// ── actions ──────────────────────────────────────────────────────────────────

pub(crate) fn cmd_actions(ctx: &Context<'_>, site: TenantId, post_type: &str) {
    let (installation, settings) = ctx.load();
    let sites = ctx.check(installation.sites());
    if !sites.iter().any(|s| s.id == site) {
        ctx.fail(&format!("error: tenant {} not found", site));
    }

    let entries = if settings.participates(post_type) {
        bulk_action_entries(&sites, site, &settings)
    } else {
        Vec::new()
    };

    match ctx.output {
        OutputFormat::Text => {
            for (action, label) in &entries {
                println!("{}\t{}", action, label);
            }
        }
        OutputFormat::Json => {
            let list: Vec<_> = entries
                .iter()
                .map(|(action, label)| json!({ "action": action, "label": label }))
                .collect();
            println!("{}", serde_json::Value::Array(list));
        }
    }
}

// ── clone ────────────────────────────────────────────────────────────────────

pub(crate) fn cmd_clone(
    ctx: &Context<'_>,
    from: TenantId,
    to: TenantId,
    redirect: &str,
    items: &[ItemId],
) {
    let (installation, settings) = ctx.load();
    ctx.check(installation.set_current_tenant(from));

    let cloner = Cloner::new(&installation)
        .with_media(&installation)
        .with_builder(&installation);
    let action = format!("{}{}", settings.action_prefix, to);
    let report = BulkActionHandler::new(cloner, &settings).run(redirect, &action, items);

    ctx.check(installation.save(ctx.state));

    match ctx.output {
        OutputFormat::Text => {
            if !ctx.quiet {
                for outcome in &report.cloned {
                    println!(
                        "cloned {} -> {} in site {} ({} attachment(s), {} meta, layout: {})",
                        outcome.source_id,
                        outcome.new_id,
                        outcome.destination,
                        outcome.attachments_migrated,
                        outcome.meta_written,
                        if outcome.layout_cloned { "yes" } else { "no" }
                    );
                }
                println!("{}", report.redirect);
            }
            for (item, error) in &report.failed {
                report_error(
                    &format!("error: item {}: {}", item, error),
                    ctx.output,
                    ctx.quiet,
                );
            }
        }
        OutputFormat::Json => {
            let cloned: Vec<_> = report
                .cloned
                .iter()
                .map(|o| {
                    json!({
                        "source_id": o.source_id,
                        "new_id": o.new_id,
                        "attachments_migrated": o.attachments_migrated,
                        "meta_written": o.meta_written,
                        "meta_suppressed": o.meta_suppressed,
                        "layout_cloned": o.layout_cloned,
                    })
                })
                .collect();
            let failed: Vec<_> = report
                .failed
                .iter()
                .map(|(item, error)| json!({ "item": item, "error": error }))
                .collect();
            println!(
                "{}",
                json!({
                    "destination": report.destination,
                    "cloned": cloned,
                    "failed": failed,
                    "redirect": report.redirect,
                })
            );
        }
    }

    if report.destination.is_none() || !report.failed.is_empty() {
        process::exit(1);
    }
}

// ── verify ───────────────────────────────────────────────────────────────────

pub(crate) fn cmd_verify(ctx: &Context<'_>, url: &str) {
    let (installation, settings) = ctx.load();
    let token = NoticeToken::new(&settings.nonce_secret);
    let Some(notice) = BulkNotice::from_url(url, &token) else {
        ctx.fail("error: no valid clone notice in url");
    };

    let sites = ctx.check(installation.sites());
    let name = sites
        .iter()
        .find(|s| s.id == notice.tenant)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| format!("site {}", notice.tenant));
    let message = notice.message(&name);

    if ctx.quiet {
        return;
    }
    match ctx.output {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => println!(
            "{}",
            json!({
                "count": notice.count,
                "tenant": notice.tenant,
                "message": message,
            })
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_arg_parses_three_parts() {
        let site: SiteArg = "2, Shop ,https://example.test/shop/".parse().unwrap();
        assert_eq!(site.id, 2);
        assert_eq!(site.name, "Shop");
        assert_eq!(site.home_url, "https://example.test/shop");
    }

    #[test]
    fn test_site_arg_rejects_malformed_values() {
        assert!("2,Shop".parse::<SiteArg>().is_err());
        assert!("x,Shop,https://example.test".parse::<SiteArg>().is_err());
        assert!("2,Shop,example.test".parse::<SiteArg>().is_err());
    }
}
