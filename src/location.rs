//! Caller IP and city: the on-disk cache, the geolocation lookups behind it,
//! and the animated IP readout.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::Utc;
use reqwest::Client;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    animate::{ip_reveal_frames, play},
    backend::BackendClient,
    error::ClientError,
    model::IpInfo,
    ui::AppState,
};

/// JSON file holding the last resolved [`IpInfo`].
#[derive(Clone, Debug)]
pub struct IpCache {
    path: PathBuf,
}

impl IpCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty cache. A file that no longer parses is an
    /// error.
    pub async fn read(&self) -> Result<Option<IpInfo>, ClientError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Like [`IpCache::read`], but a file that no longer parses counts as
    /// empty. It is overwritten by the next successful lookup.
    pub async fn load(&self) -> Result<Option<IpInfo>, ClientError> {
        match self.read().await {
            Err(ClientError::Json(e)) => {
                warn!("Ignoring unreadable IP cache {}: {e}", self.path.display());
                Ok(None)
            }
            other => other,
        }
    }

    pub async fn store(&self, info: &IpInfo) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(info)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    /// The cached IP, if any. An unreadable cache is an error.
    pub async fn ip(&self) -> Result<Option<String>, ClientError> {
        Ok(self
            .read()
            .await?
            .and_then(|info| info.ip().map(str::to_string)))
    }
}

/// Resolves the caller's location, preferring the cache.
#[derive(Clone, Debug)]
pub struct LocationResolver {
    cache: IpCache,
    http: Client,
    ipinfo_url: String,
    ipinfo_token: Option<String>,
    backend: BackendClient,
    ttl: Duration,
}

impl LocationResolver {
    pub fn new(
        cache: IpCache,
        http: Client,
        ipinfo_url: impl Into<String>,
        ipinfo_token: Option<String>,
        backend: BackendClient,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            http,
            ipinfo_url: ipinfo_url.into().trim_end_matches('/').to_string(),
            ipinfo_token,
            backend,
            ttl,
        }
    }

    pub fn cache(&self) -> &IpCache {
        &self.cache
    }

    /// Cached info younger than the TTL, else a fresh geolocation lookup that
    /// replaces the cache. Failures are logged and give `None`.
    pub async fn resolve_fresh(&self) -> Option<IpInfo> {
        match self.try_resolve_fresh().await {
            Ok(info) => Some(info),
            Err(e) => {
                error!("Error fetching IP info: {e}");
                None
            }
        }
    }

    async fn try_resolve_fresh(&self) -> Result<IpInfo, ClientError> {
        if let Some(info) = self.cache.load().await? {
            if self.is_fresh(&info) {
                debug!("Using cached IP info");
                return Ok(info);
            }
        }

        let mut info = self.lookup().await?;
        info.timestamp = Some(Utc::now());
        self.cache.store(&info).await?;
        info!(city = ?info.city, "Resolved caller location");
        Ok(info)
    }

    fn is_fresh(&self, info: &IpInfo) -> bool {
        let Some(stamp) = info.timestamp else {
            return false;
        };
        match (Utc::now() - stamp).to_std() {
            Ok(age) => age < self.ttl,
            // Stamped in the future
            Err(_) => false,
        }
    }

    #[instrument(skip(self))]
    async fn lookup(&self) -> Result<IpInfo, ClientError> {
        let mut request = self.http.get(format!("{}/json", self.ipinfo_url));
        if let Some(token) = &self.ipinfo_token {
            request = request.query(&[("token", token)]);
        }
        let info: IpInfo = request.send().await?.error_for_status()?.json().await?;
        if info.ip().is_none() {
            return Err(ClientError::MissingIp);
        }
        Ok(info)
    }

    /// Any cached info with an IP regardless of age, else the backend's view
    /// of the caller, which is then cached. Failures are logged and give `None`.
    pub async fn resolve_any(&self) -> Option<IpInfo> {
        match self.try_resolve_any().await {
            Ok(info) => Some(info),
            Err(e) => {
                error!("Error fetching IP: {e}");
                None
            }
        }
    }

    async fn try_resolve_any(&self) -> Result<IpInfo, ClientError> {
        if let Some(info) = self.cache.load().await? {
            if info.ip().is_some() {
                return Ok(info);
            }
        }
        let info = self.backend.client_ip().await?;
        self.cache.store(&info).await?;
        Ok(info)
    }

    /// Remembers a city picked by hand when it differs from the detected one.
    /// Picking the detected city again forgets the earlier choice.
    pub async fn record_city_choice(&self, city: &str) -> Result<(), ClientError> {
        let Some(mut info) = self.cache.load().await? else {
            return Ok(());
        };
        let choice = match info.city.as_deref() {
            Some(detected) if detected.eq_ignore_ascii_case(city) => None,
            Some(_) => Some(city.to_string()),
            None => return Ok(()),
        };
        if info.user_selected_city == choice {
            return Ok(());
        }
        info.user_selected_city = choice;
        self.cache.store(&info).await
    }
}

/// Reveals the cached IP in a text element, one frame per `tick`.
pub async fn show_ip(state: &AppState, id: &str, cache: &IpCache, tick: Duration) {
    match cache.ip().await {
        Ok(Some(ip)) => {
            let frames = ip_reveal_frames(&ip).into_iter().map(|frame| format!("IP: {frame}"));
            play(state, id, frames, tick).await;
        }
        Ok(None) => state.set_text(id, "IP: Not found"),
        Err(e) => {
            error!("Error updating user IP: {e}");
            state.set_text(id, "IP: Error");
        }
    }
}
