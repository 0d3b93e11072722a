//! Resolution of an extension identifier against the Chromium update service.

use anyhow::{Context, Result};
use bytes::Bytes;
use regex::Regex;
use reqwest::{Client, Url};
use std::sync::LazyLock;

use super::PAYLOAD_EXT;

/// Query template of the update service. The service answers with a redirect
/// chain ending either at the packaged extension or at an HTML error page.
const UPDATE_URL: &str = "https://clients2.google.com/service/update2/crx?response=redirect&prodversion=48.0&x=id%3D{id}%26installsource%3Dondemand%26uc";

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d_]+").expect("version pattern"));

/// Everything the update service knows about one extension, derived from the
/// final URL of the redirect chain. Built fresh per resolution, never cached.
#[derive(Debug, Clone)]
pub struct RemoteExtension {
    pub id: String,
    /// False when the final URL does not carry the payload extension, i.e.
    /// the service redirected to an error page instead of a package.
    pub exists: bool,
    pub url: String,
    pub filename: String,
    pub version: Option<String>,
    /// Fetched package bytes; empty when the extension does not exist.
    pub payload: Bytes,
}

pub fn client() -> Result<Client> {
    Client::builder()
        .user_agent(format!("crxsync/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building http client")
}

/// Extract the version encoded in a payload filename: the first run of digits
/// and underscores, separators normalized to dots (`extension_4_1_2_0.crx`
/// yields `4.1.2.0`).
pub fn parse_version(filename: &str) -> Option<String> {
    VERSION_RE
        .find(filename)
        .map(|m| m.as_str().replace('_', "."))
}

/// Decide filename and existence from the final, post-redirect URL.
fn classify(url: &Url) -> (String, bool) {
    let filename = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default()
        .to_string();
    let exists = filename
        .rsplit('.')
        .next()
        .is_some_and(|ext| ext == PAYLOAD_EXT);
    (filename, exists)
}

/// Resolve `id` against the update service. One network round trip following
/// redirects, no retries: a transport failure is a hard error, an unknown
/// identifier is a normal descriptor with `exists == false`.
pub async fn resolve(client: &Client, id: &str) -> Result<RemoteExtension> {
    let query = UPDATE_URL.replace("{id}", id);
    let response = client
        .get(&query)
        .send()
        .await
        .with_context(|| format!("querying update service for {id}"))?;

    let (filename, exists) = classify(response.url());
    let url = response.url().to_string();
    let version = parse_version(&filename);
    let payload = if exists {
        response
            .bytes()
            .await
            .with_context(|| format!("downloading payload for {id}"))?
    } else {
        Bytes::new()
    };

    Ok(RemoteExtension {
        id: id.to_string(),
        exists,
        url,
        filename,
        version,
        payload,
    })
}
