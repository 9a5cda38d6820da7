//! Page controllers. Each page owns its elements and runs its own load hook;
//! pages share nothing at runtime except the services handed to them.

pub mod feedback;
pub mod history;
pub mod home;

use std::time::Duration;

use reqwest::Client;

use crate::{
    backend::BackendClient,
    config::Config,
    counter::update_hit_count,
    error::ClientError,
    location::{IpCache, LocationResolver, show_ip},
    ui::{AppState, RouterConfig, UiElement},
};

pub const HIT_COUNT: &str = "hit-count";
pub const USER_IP: &str = "user-ip";
pub const LOADING: &str = "loading";

/// Collaborators every page talks to.
#[derive(Clone, Debug)]
pub struct Services {
    pub backend: BackendClient,
    pub resolver: LocationResolver,
    /// Delay between animation frames.
    pub tick: Duration,
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let backend = BackendClient::new(http.clone(), config.backend_url.as_str());
        let resolver = LocationResolver::new(
            IpCache::new(config.cache_path.clone()),
            http,
            config.ipinfo_url.as_str(),
            config.ipinfo_token.clone(),
            backend.clone(),
            config.ip_cache_ttl,
        );
        Ok(Self {
            backend,
            resolver,
            tick: config.animation_tick,
        })
    }
}

/// Hit counter and IP readout shown at the top of every page.
pub(crate) fn add_header(state: &AppState) {
    state.add_element(UiElement::text(HIT_COUNT, "0"));
    state.add_element(UiElement::text(USER_IP, "IP: "));
}

pub(crate) async fn update_header(state: &AppState, services: &Services) {
    tokio::join!(
        update_hit_count(state, HIT_COUNT, &services.backend, services.tick),
        show_ip(state, USER_IP, services.resolver.cache(), services.tick),
    );
}

/// All three pages, ready to be served.
pub fn router_config(services: &Services, static_dir: &str) -> RouterConfig {
    RouterConfig::new()
        .page(home::HomePage::new(services.clone()).into_page())
        .page(history::HistoryPage::new(services.clone()).into_page())
        .page(feedback::FeedbackPage::new(services.clone()).into_page())
        .static_dir(static_dir)
}
