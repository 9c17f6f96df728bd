use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, USER_AGENT};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const REQUEST_TIMEOUT_SECS: u64 = 30;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMeta {
    url: String,
    etag: Option<String>,
    last_modified: Option<String>,
}

/// Fetch `url` as text through an on-disk cache. A cached body is
/// revalidated with `If-None-Match`/`If-Modified-Since`; a 304 serves
/// the copy on disk. Bodies live one file per URL (keyed by URL hash)
/// with a JSON sidecar holding the validators.
pub fn fetch_text_cached(client: &Client, cache_dir: &Path, url: &str) -> Result<String> {
    let key = cache_key(url);
    let body_path = cache_dir.join(format!("{key}.body"));
    let meta_path = cache_dir.join(format!("{key}.meta.json"));

    let meta = read_meta(&meta_path).filter(|meta| meta.url == url);
    let cached_body = meta
        .as_ref()
        .and_then(|_| fs::read_to_string(&body_path).ok());

    let mut req = client.get(url).header(USER_AGENT, "Mozilla/5.0");
    if cached_body.is_some()
        && let Some(meta) = meta.as_ref()
    {
        if let Some(etag) = meta.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = meta.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send().with_context(|| format!("request {url}"))?;
    let status = resp.status();
    if status == StatusCode::NOT_MODIFIED {
        if let Some(body) = cached_body {
            return Ok(body);
        }
        return Err(anyhow!("{url}: 304 without a cached body"));
    }

    let headers = resp.headers().clone();
    let body = resp
        .text()
        .with_context(|| format!("read body of {url}"))?;
    if !status.is_success() {
        return Err(anyhow!("{url}: http {status}"));
    }

    let meta = CacheMeta {
        url: url.to_string(),
        etag: header_string(&headers, ETAG),
        last_modified: header_string(&headers, LAST_MODIFIED),
    };
    // A failed cache write is not an error; the next run refetches.
    let _ = store(cache_dir, &body_path, &meta_path, &body, &meta);
    Ok(body)
}

fn header_string(headers: &reqwest::header::HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

fn store(
    cache_dir: &Path,
    body_path: &Path,
    meta_path: &Path,
    body: &str,
    meta: &CacheMeta,
) -> Result<()> {
    fs::create_dir_all(cache_dir)?;
    write_atomic(body_path, body.as_bytes())?;
    let json = serde_json::to_string(meta).context("serialize cache meta")?;
    write_atomic(meta_path, json.as_bytes())?;
    Ok(())
}

fn read_meta(path: &Path) -> Option<CacheMeta> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

fn cache_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

pub fn default_cache_dir() -> Option<PathBuf> {
    // Prefer XDG cache, fall back to ~/.cache.
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join("atp_dashboard"));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join("atp_dashboard"))
}
