//! "My recipes": everything generated from this IP, grouped by mood.

use tracing::error;

use super::{HIT_COUNT, LOADING, Services, USER_IP, add_header};
use crate::{
    counter::update_hit_count,
    error::ClientError,
    format::ip_key,
    location::show_ip,
    model::RecipeHistory,
    render,
    ui::{AppState, Page, UiElement},
};

const RECIPES: &str = "recipes";
const RECIPES_CONTAINER: &str = "recipes-container";

#[derive(Clone)]
pub struct HistoryPage {
    state: AppState,
    services: Services,
}

impl HistoryPage {
    pub fn new(services: Services) -> Self {
        let page = Self {
            state: AppState::new(),
            services,
        };
        page.build();
        page
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn into_page(self) -> Page {
        Page::new(
            "/my-recipes",
            "My Recipes",
            include_str!("my_recipes.html"),
            self.state.clone(),
        )
    }

    fn build(&self) {
        add_header(&self.state);
        self.state.add_element(UiElement::panel(LOADING, false));
        self.state.add_element(UiElement::panel(RECIPES, true));
        self.state.add_element(UiElement::markup(RECIPES_CONTAINER, ""));

        let page = self.clone();
        self.state.on_load(move || {
            let page = page.clone();
            tokio::spawn(async move { page.load().await });
        });
    }

    /// The IP readout waits for the recipes so it can show an IP resolved
    /// during the fetch.
    pub async fn load(&self) {
        let recipes = async {
            self.fetch_my_recipes().await;
            show_ip(
                &self.state,
                USER_IP,
                self.services.resolver.cache(),
                self.services.tick,
            )
            .await;
        };
        let hits = update_hit_count(
            &self.state,
            HIT_COUNT,
            &self.services.backend,
            self.services.tick,
        );
        tokio::join!(recipes, hits);
    }

    pub async fn fetch_my_recipes(&self) {
        self.state.set_visible(LOADING, true);
        self.state.set_visible(RECIPES, false);

        let html = match self.load_history().await {
            Ok(history) => render::history(&history),
            Err(e) => {
                error!("Error: {e}");
                render::history_error(&e.to_string())
            }
        };
        self.state.set_markup(RECIPES_CONTAINER, html);

        self.state.set_visible(LOADING, false);
        self.state.set_visible(RECIPES, true);
    }

    async fn load_history(&self) -> Result<RecipeHistory, ClientError> {
        let info = self
            .services
            .resolver
            .resolve_any()
            .await
            .ok_or(ClientError::MissingIp)?;
        let ip = info.ip().ok_or(ClientError::MissingIp)?;
        self.services.backend.my_recipes(&ip_key(ip)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::tests::{cache_ip, offline_services, test_services};
    use tempfile::TempDir;

    async fn history_for(ip: Option<&str>) -> (HistoryPage, TempDir) {
        let dir = TempDir::new().unwrap();
        let (services, _) = test_services(&dir).await;
        if let Some(ip) = ip {
            cache_ip(&services, ip).await;
        }
        (HistoryPage::new(services), dir)
    }

    fn container(page: &HistoryPage) -> String {
        match page.state().get_element(RECIPES_CONTAINER) {
            Some(UiElement::Markup { html, .. }) => html,
            other => panic!("unexpected container {other:?}"),
        }
    }

    #[tokio::test]
    async fn cards_are_grouped_by_mood() {
        let (page, _dir) = history_for(Some("203.0.113.7")).await;

        page.fetch_my_recipes().await;

        let html = container(&page);
        let happy = html.find("Happy Mood").unwrap();
        let sad = html.find("Sad Mood").unwrap();
        assert!(happy < sad);
        assert!(html.contains("Mango Lassi"));
        assert!(html.contains("Rajma &lt;Chawal&gt;"));
        assert!(html.contains("2. Serve chilled"));
        assert!(page.state().is_visible(RECIPES));
        assert!(!page.state().is_visible(LOADING));
    }

    #[tokio::test]
    async fn ip_comes_from_backend_when_not_cached() {
        let (page, _dir) = history_for(None).await;

        page.load().await;

        assert!(container(&page).contains("Mango Lassi"));
        assert_eq!(page.state().value_of(USER_IP).as_deref(), Some("IP: 203.0.113.7"));
        assert_eq!(page.state().value_of(HIT_COUNT).as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn nothing_stored_yet() {
        let (page, _dir) = history_for(Some("192.0.2.1")).await;

        page.fetch_my_recipes().await;

        assert!(container(&page).contains("No recipes found for your IP address"));
    }

    #[tokio::test]
    async fn backend_failure_is_shown_inline() {
        let (page, _dir) = history_for(Some("198.51.100.9")).await;

        page.fetch_my_recipes().await;

        let html = container(&page);
        assert!(html.contains("Error: Backend error: database offline"));
        assert!(html.contains("Return Home"));
    }

    #[tokio::test]
    async fn unknown_ip_is_shown_inline() {
        let dir = TempDir::new().unwrap();
        let page = HistoryPage::new(offline_services(&dir));

        page.load().await;

        let html = container(&page);
        assert!(html.contains("Error: Could not determine IP address"));
        assert!(html.contains("Return Home"));
        assert_eq!(page.state().value_of(USER_IP).as_deref(), Some("IP: Not found"));
        assert_eq!(page.state().value_of(HIT_COUNT).as_deref(), Some("0"));
        assert!(!page.state().is_visible(LOADING));
    }
}
