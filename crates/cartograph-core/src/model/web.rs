//! Web applications and the pages crawled beneath them.

use serde::{Deserialize, Serialize};
use url::Url;

use super::{
  EntityKind, Model, lifecycle_labels, set_lifecycle_status, take_seed_label,
};
use crate::{
  Error, Result,
  hook::{Hook, Hooked},
  key,
  lifecycle::{Lifecycle, backfill, backfill_list, overwrite, union},
  ttl::DEFAULT_TTL_HOURS,
};

// ─── URL normalisation ───────────────────────────────────────────────────────

/// Canonical form of an http(s) URL.
///
/// Scheme and host are lowercased, default ports dropped, dot segments
/// resolved, an empty path becomes `/`, and the fragment is removed.
pub fn normalize_url(raw: &str) -> Result<String> {
  let trimmed = raw.trim();
  let mut url = Url::parse(trimmed).map_err(|e| Error::InvalidUrl {
    url:    raw.to_owned(),
    reason: e.to_string(),
  })?;
  if !matches!(url.scheme(), "http" | "https") {
    return Err(Error::InvalidUrl {
      url:    raw.to_owned(),
      reason: format!("unsupported scheme {:?}", url.scheme()),
    });
  }
  if url.host_str().is_none_or(str::is_empty) {
    return Err(Error::InvalidUrl {
      url:    raw.to_owned(),
      reason: "missing host".to_owned(),
    });
  }
  url.set_fragment(None);
  Ok(url.into())
}

/// `scheme://host[:port]/` of a normalised URL.
fn origin_of(url: &str) -> Option<String> {
  let parsed = Url::parse(url).ok()?;
  let origin = parsed.origin();
  origin.is_tuple().then(|| format!("{}/", origin.ascii_serialization()))
}

/// Normalise `field` in place; a no-op when it is already canonical.
fn normalize_in_place(field: &mut String) -> Result<()> {
  let normalized = normalize_url(field)?;
  if *field != normalized {
    *field = normalized;
  }
  Ok(())
}

// ─── WebApplication ──────────────────────────────────────────────────────────

/// A web application rooted at `primary_url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebApplication {
  #[serde(flatten)]
  pub lifecycle:        Lifecycle,
  #[serde(default)]
  pub primary_url:      String,
  /// Every known entry point, primary first, without duplicates.
  #[serde(default)]
  pub urls:             Vec<String>,
  #[serde(default)]
  pub name:             String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub burp_site_id:     String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub burp_folder_id:   String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub burp_schedule_id: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tags:             Vec<String>,
}

impl WebApplication {
  pub fn new(primary_url: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      primary_url: primary_url.into(),
      name: name.into(),
      ..Default::default()
    }
  }
}

fn normalize_urls(app: &mut WebApplication) -> Result<()> {
  normalize_in_place(&mut app.primary_url)?;

  let mut urls = Vec::with_capacity(app.urls.len() + 1);
  urls.push(app.primary_url.clone());
  for raw in &app.urls {
    let url = normalize_url(raw)?;
    if !urls.contains(&url) {
      urls.push(url);
    }
  }
  if urls != app.urls {
    app.urls = urls;
  }
  Ok(())
}

fn validate_app(app: &mut WebApplication) -> Result<()> {
  if app.primary_url.is_empty() {
    return Err(Error::MissingField {
      kind:  "webapplication",
      field: "primary_url",
    });
  }
  Ok(())
}

fn derive_app_key(app: &mut WebApplication) -> Result<()> {
  app.lifecycle.key =
    key::compose(EntityKind::WebApplication, &[&app.primary_url]);
  Ok(())
}

/// Name an unnamed application after its host.
fn default_app_name(app: &mut WebApplication) -> Result<()> {
  if !app.name.is_empty() {
    return Ok(());
  }
  if let Ok(url) = Url::parse(&app.primary_url)
    && let Some(host) = url.host_str()
  {
    app.name = host.to_owned();
  }
  Ok(())
}

impl Hooked for WebApplication {
  fn defaulted(&mut self) {
    self.lifecycle.defaulted(Some(DEFAULT_TTL_HOURS));
  }

  fn hooks() -> &'static [Hook<Self>] {
    const HOOKS: &[Hook<WebApplication>] = &[
      Hook::new("validate", validate_app),
      Hook::new("normalize-urls", normalize_urls),
      Hook::new("derive-key", derive_app_key),
      Hook::new("default-name", default_app_name),
    ];
    HOOKS
  }
}

impl Model for WebApplication {
  const KIND: EntityKind = EntityKind::WebApplication;

  fn key(&self) -> &str { &self.lifecycle.key }

  fn labels(&self) -> Vec<&'static str> {
    lifecycle_labels(Self::KIND, &self.lifecycle, true)
  }

  fn status(&self) -> String { self.lifecycle.status.to_string() }

  fn set_status(&mut self, status: &str) -> Result<()> {
    set_lifecycle_status(&mut self.lifecycle, status)
  }

  fn merge(&mut self, other: &Self) {
    self.lifecycle.merge(&other.lifecycle);
    overwrite(&mut self.name, &other.name);
    union(&mut self.urls, &other.urls);
    overwrite(&mut self.burp_site_id, &other.burp_site_id);
    overwrite(&mut self.burp_folder_id, &other.burp_folder_id);
    overwrite(&mut self.burp_schedule_id, &other.burp_schedule_id);
    union(&mut self.tags, &other.tags);
  }

  fn visit(&mut self, other: &Self) {
    self.lifecycle.visit(&other.lifecycle);
    backfill(&mut self.primary_url, &other.primary_url);
    backfill(&mut self.name, &other.name);
    backfill_list(&mut self.urls, &other.urls);
    backfill(&mut self.burp_site_id, &other.burp_site_id);
    backfill(&mut self.burp_folder_id, &other.burp_folder_id);
    backfill(&mut self.burp_schedule_id, &other.burp_schedule_id);
    backfill_list(&mut self.tags, &other.tags);
  }

  fn take_pending_labels(&mut self) -> Vec<&'static str> {
    take_seed_label(&mut self.lifecycle)
  }
}

// ─── Webpage ─────────────────────────────────────────────────────────────────

/// A single crawled page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webpage {
  #[serde(flatten)]
  pub lifecycle:   Lifecycle,
  #[serde(default)]
  pub url:         String,
  /// Key of the owning web application.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub parent:      String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub title:       String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status_code: Option<u16>,
}

impl Webpage {
  pub fn new(url: impl Into<String>) -> Self {
    Self { url: url.into(), ..Default::default() }
  }
}

fn validate_page(page: &mut Webpage) -> Result<()> {
  if page.url.trim().is_empty() {
    return Err(Error::MissingField { kind: "webpage", field: "url" });
  }
  Ok(())
}

fn normalize_page(page: &mut Webpage) -> Result<()> {
  normalize_in_place(&mut page.url)
}

fn derive_page_key(page: &mut Webpage) -> Result<()> {
  page.lifecycle.key = key::compose(EntityKind::Webpage, &[&page.url]);
  Ok(())
}

/// Attach an orphan page to the application at its origin.
fn default_parent(page: &mut Webpage) -> Result<()> {
  if page.parent.is_empty()
    && let Some(origin) = origin_of(&page.url)
  {
    page.parent = key::compose(EntityKind::WebApplication, &[&origin]);
  }
  Ok(())
}

impl Hooked for Webpage {
  fn defaulted(&mut self) {
    self.lifecycle.defaulted(Some(DEFAULT_TTL_HOURS));
  }

  fn hooks() -> &'static [Hook<Self>] {
    const HOOKS: &[Hook<Webpage>] = &[
      Hook::new("validate", validate_page),
      Hook::new("normalize-url", normalize_page),
      Hook::new("derive-key", derive_page_key),
      Hook::new("default-parent", default_parent),
    ];
    HOOKS
  }
}

impl Model for Webpage {
  const KIND: EntityKind = EntityKind::Webpage;

  fn key(&self) -> &str { &self.lifecycle.key }

  fn labels(&self) -> Vec<&'static str> {
    lifecycle_labels(Self::KIND, &self.lifecycle, true)
  }

  fn status(&self) -> String { self.lifecycle.status.to_string() }

  fn set_status(&mut self, status: &str) -> Result<()> {
    set_lifecycle_status(&mut self.lifecycle, status)
  }

  fn merge(&mut self, other: &Self) {
    self.lifecycle.merge(&other.lifecycle);
    overwrite(&mut self.parent, &other.parent);
    overwrite(&mut self.title, &other.title);
    if other.status_code.is_some() {
      self.status_code = other.status_code;
    }
  }

  fn visit(&mut self, other: &Self) {
    self.lifecycle.visit(&other.lifecycle);
    backfill(&mut self.url, &other.url);
    backfill(&mut self.parent, &other.parent);
    backfill(&mut self.title, &other.title);
    if self.status_code.is_none() {
      self.status_code = other.status_code;
    }
  }

  fn take_pending_labels(&mut self) -> Vec<&'static str> {
    take_seed_label(&mut self.lifecycle)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{hook::prepare, source::Source};

  #[test]
  fn url_normalization() {
    assert_eq!(
      normalize_url("HTTPS://Example.COM:443").unwrap(),
      "https://example.com/"
    );
    assert_eq!(
      normalize_url("http://example.com:80/a/./b/../c#frag").unwrap(),
      "http://example.com/a/c"
    );
    assert_eq!(
      normalize_url("https://example.com:8443/").unwrap(),
      "https://example.com:8443/"
    );
    assert!(matches!(
      normalize_url("ftp://example.com/"),
      Err(Error::InvalidUrl { .. })
    ));
    assert!(normalize_url("not a url").is_err());
  }

  #[test]
  fn application_key_uses_normalized_primary_url() {
    let app =
      prepare(WebApplication::new("HTTPS://Example.com:443", "")).unwrap();
    assert_eq!(app.key(), "#webapplication#https://example.com/");
    assert_eq!(app.name, "example.com");
    assert_eq!(app.urls, ["https://example.com/"]);
    assert!(app.valid());
  }

  #[test]
  fn application_hooks_are_idempotent() {
    let mut app = WebApplication::new("https://example.com", "shop");
    app.urls = vec!["https://EXAMPLE.com/".into(), "https://example.com/login".into()];
    let once = prepare(app).unwrap();
    let mut twice = once.clone();
    crate::hook::run(&mut twice).unwrap();
    assert_eq!(once, twice);
    assert_eq!(twice.urls, ["https://example.com/", "https://example.com/login"]);
  }

  #[test]
  fn blank_primary_url_is_rejected() {
    let err = prepare(WebApplication::new("   ", "x")).unwrap_err();
    assert!(matches!(err.root(), Error::InvalidUrl { .. }));
    let err = prepare(WebApplication::new("", "x")).unwrap_err();
    assert!(matches!(err.root(), Error::MissingField { .. }));
  }

  #[test]
  fn merge_unions_urls_and_burp_ids_need_a_value() {
    let mut existing = prepare(WebApplication::new("https://example.com", "")).unwrap();
    existing.burp_site_id = "site-1".into();

    let mut incoming = existing.clone();
    incoming.urls = vec!["https://example.com/".into(), "https://example.com/api".into()];
    incoming.burp_site_id = String::new();
    incoming.burp_folder_id = "folder-9".into();

    existing.merge(&incoming);

    assert_eq!(existing.urls, ["https://example.com/", "https://example.com/api"]);
    assert_eq!(existing.burp_site_id, "site-1");
    assert_eq!(existing.burp_folder_id, "folder-9");
  }

  #[test]
  fn seed_promotion_sets_pending_label() {
    let mut existing = prepare(WebApplication::new("https://example.com", "")).unwrap();
    let mut incoming = existing.clone();
    incoming.lifecycle.source = Source::Seed;

    existing.merge(&incoming);

    assert_eq!(existing.take_pending_labels(), ["Seed"]);
    assert!(existing.take_pending_labels().is_empty());
    assert!(existing.labels().contains(&"Seed"));
  }

  #[test]
  fn page_defaults_parent_to_its_origin() {
    let page = prepare(Webpage::new("https://Example.com:443/login?next=/")).unwrap();
    assert_eq!(page.key(), "#webpage#https://example.com/login?next=/");
    assert_eq!(page.parent, "#webapplication#https://example.com/");
    assert!(page.valid());
  }

  #[test]
  fn page_visit_keeps_title() {
    let mut existing = prepare(Webpage::new("https://example.com/")).unwrap();
    existing.title = "Home".into();
    let mut incoming = existing.clone();
    incoming.title = "Other".into();
    incoming.status_code = Some(200);

    existing.visit(&incoming);

    assert_eq!(existing.title, "Home");
    assert_eq!(existing.status_code, Some(200));
  }
}
