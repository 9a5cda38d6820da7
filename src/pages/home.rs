//! Recipe form: detects the caller's city, posts mood, age and city with the
//! cached IP, and renders the generated recipe.

use std::sync::Arc;

use tracing::{error, warn};

use super::{HIT_COUNT, LOADING, Services, USER_IP, add_header};
use crate::{
    counter::update_hit_count,
    error::ClientError,
    format::mood_label,
    location::show_ip,
    model::{IpInfo, Recipe, RecipeRequest},
    render,
    ui::{AppState, NoticeLevel, Page, SelectOption, UiElement},
};

pub const MOODS: [&str; 5] = ["happy", "sad", "stressed", "energetic", "tired"];
pub const CITIES: [&str; 8] = [
    "Mumbai",
    "Delhi",
    "Bangalore",
    "Chennai",
    "Kolkata",
    "Hyderabad",
    "Pune",
    "Jaipur",
];

const MOOD: &str = "mood";
const AGE: &str = "age";
const CITY: &str = "city";
const FORM_ERROR: &str = "form-error";
const RECIPE_CARD: &str = "recipe-card";
const RECIPE_NAME: &str = "recipe-name";
const PREP_TIME: &str = "prep-time";
const INGREDIENTS: &str = "ingredients";
const INSTRUCTIONS: &str = "instructions";

/// Validated form input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeForm {
    pub mood: String,
    pub age: u32,
    pub city: String,
}

#[derive(Clone)]
pub struct HomePage {
    state: AppState,
    services: Services,
}

impl HomePage {
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
            "/",
            "Mood Recipes",
            include_str!("home.html"),
            self.state.clone(),
        )
    }

    fn build(&self) {
        let state = &self.state;
        add_header(state);

        state.add_element(UiElement::Select {
            id: MOOD.to_string(),
            value: String::new(),
            placeholder: Some("How are you feeling?".to_string()),
            options: MOODS
                .iter()
                .map(|mood| SelectOption::new(*mood, mood_label(mood)))
                .collect(),
            on_change: None,
        });
        state.add_element(UiElement::NumberInput {
            id: AGE.to_string(),
            value: None,
            min: Some(1.0),
            max: Some(120.0),
            step: Some(1.0),
            on_change: None,
        });

        let page = self.clone();
        state.add_element(UiElement::Select {
            id: CITY.to_string(),
            value: String::new(),
            placeholder: Some("Select your city".to_string()),
            options: CITIES.iter().map(|city| SelectOption::plain(*city)).collect(),
            on_change: Some(Arc::new(Box::new(move |city| {
                let page = page.clone();
                let city = city.to_string();
                tokio::spawn(async move { page.city_changed(&city).await });
            }))),
        });

        for (id, text) in [("get-recipe", "Get Recipe"), ("new-recipe", "Try Another")] {
            let page = self.clone();
            state.add_element(UiElement::Button {
                id: id.to_string(),
                text: text.to_string(),
                on_click: Some(Arc::new(Box::new(move || {
                    let page = page.clone();
                    tokio::spawn(async move { page.submit().await });
                }))),
            });
        }

        state.add_element(UiElement::text(FORM_ERROR, ""));
        state.add_element(UiElement::panel(LOADING, false));
        state.add_element(UiElement::panel(RECIPE_CARD, false));
        state.add_element(UiElement::text(RECIPE_NAME, ""));
        state.add_element(UiElement::text(PREP_TIME, ""));
        state.add_element(UiElement::markup(INGREDIENTS, ""));
        state.add_element(UiElement::markup(INSTRUCTIONS, ""));

        let page = self.clone();
        state.on_load(move || {
            let page = page.clone();
            tokio::spawn(async move { page.load().await });
        });
    }

    /// Page load: detect the city, then reveal the IP; bump the hit counter
    /// alongside.
    pub async fn load(&self) {
        let location = async {
            self.initialize_location().await;
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
        tokio::join!(location, hits);
    }

    /// Resolves the caller's location and preselects their city. A city the
    /// user picked by hand earlier wins over the detected one.
    pub async fn initialize_location(&self) -> Option<IpInfo> {
        let info = self.services.resolver.resolve_fresh().await?;
        if let Some(city) = info.user_selected_city.as_deref().or(info.city.as_deref()) {
            self.set_user_city(city);
        }
        Some(info)
    }

    /// Adds `city` to the dropdown right after the placeholder when no option
    /// matches it (ignoring case), then selects it.
    pub fn set_user_city(&self, city: &str) {
        let city = city.trim();
        if city.is_empty() {
            return;
        }
        self.state.modify(CITY, |element| {
            if let UiElement::Select { options, value, .. } = element {
                let existing = options
                    .iter()
                    .position(|option| option.value.eq_ignore_ascii_case(city));
                let index = existing.unwrap_or_else(|| {
                    options.insert(0, SelectOption::plain(city));
                    0
                });
                *value = options[index].value.clone();
            }
        });
    }

    async fn city_changed(&self, city: &str) {
        if let Err(e) = self.services.resolver.record_city_choice(city).await {
            warn!("Could not remember city choice: {e}");
        }
    }

    /// Reads and validates the form. The error lists what is missing.
    pub fn read_form(&self) -> Result<RecipeForm, String> {
        let mood = self.state.value_of(MOOD);
        let age = self
            .state
            .value_of(AGE)
            .and_then(|age| age.parse::<f64>().ok())
            .filter(|age| age.fract() == 0.0 && (1.0..=120.0).contains(age))
            .map(|age| age as u32);
        let city = self.state.value_of(CITY);

        match (mood, age, city) {
            (Some(mood), Some(age), Some(city)) => Ok(RecipeForm { mood, age, city }),
            (mood, age, city) => {
                let missing: Vec<&str> = [
                    mood.is_none().then_some("your mood"),
                    age.is_none().then_some("a valid age"),
                    city.is_none().then_some("your city"),
                ]
                .into_iter()
                .flatten()
                .collect();
                Err(format!("Please select {}.", missing.join(", ")))
            }
        }
    }

    /// Validates the form and, when it is complete, requests a recipe.
    pub async fn submit(&self) {
        match self.read_form() {
            Ok(form) => {
                self.state.set_text(FORM_ERROR, "");
                self.fetch_recipe(form).await;
            }
            Err(message) => self.state.set_text(FORM_ERROR, message),
        }
    }

    pub async fn fetch_recipe(&self, form: RecipeForm) {
        self.state.set_visible(LOADING, true);
        self.state.set_visible(RECIPE_CARD, false);

        let result = self.request(form).await;
        self.state.set_visible(LOADING, false);

        match result {
            Ok(recipe) => self.display_recipe(&recipe),
            Err(ClientError::Backend(message)) => {
                warn!("Backend refused recipe: {message}");
                self.state
                    .notify(NoticeLevel::Alert, "No recipe found for this mood");
            }
            Err(e) => {
                error!("Error: {e}");
                self.state.notify(NoticeLevel::Alert, "Error fetching recipe");
            }
        }
    }

    async fn request(&self, form: RecipeForm) -> Result<Recipe, ClientError> {
        let ip = self
            .services
            .resolver
            .cache()
            .ip()
            .await?
            .ok_or(ClientError::MissingIp)?;
        let request = RecipeRequest {
            mood: form.mood,
            age: form.age,
            city: form.city,
            ip,
        };
        self.services.backend.request_recipe(&request).await
    }

    pub fn display_recipe(&self, recipe: &Recipe) {
        self.state.set_text(RECIPE_NAME, recipe.name.as_str());
        self.state.set_text(PREP_TIME, recipe.prep_time.as_str());
        self.state
            .set_markup(INGREDIENTS, render::ingredients(&recipe.ingredients));
        self.state
            .set_markup(INSTRUCTIONS, render::instructions(&recipe.instructions));
        self.state.set_visible(RECIPE_CARD, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::tests::Seen, pages::tests::{cache_ip, notices, test_services}};
    use tempfile::TempDir;

    async fn home() -> (HomePage, Seen, TempDir) {
        let dir = TempDir::new().unwrap();
        let (services, seen) = test_services(&dir).await;
        (HomePage::new(services), seen, dir)
    }

    fn fill_form(page: &HomePage, mood: &str, age: &str, city: &str) {
        page.state().set_value(MOOD, mood);
        page.state().set_value(AGE, age);
        page.state().set_value(CITY, city);
    }

    fn city_options(page: &HomePage) -> Vec<String> {
        match page.state().get_element(CITY) {
            Some(UiElement::Select { options, .. }) => {
                options.into_iter().map(|option| option.value).collect()
            }
            other => panic!("unexpected city element {other:?}"),
        }
    }

    #[tokio::test]
    async fn load_detects_city_and_fills_header() {
        let (page, _, _dir) = home().await;

        page.load().await;

        assert_eq!(city_options(&page)[0], "Nagpur");
        assert_eq!(page.state().value_of(CITY).as_deref(), Some("Nagpur"));
        assert_eq!(page.state().value_of(USER_IP).as_deref(), Some("IP: 203.0.113.7"));
        assert_eq!(page.state().value_of(HIT_COUNT).as_deref(), Some("42"));
    }

    #[test]
    fn known_city_is_selected_without_duplicating() {
        let page = HomePage::new(Services::from_config(&Default::default()).unwrap());

        page.set_user_city("pune");

        assert_eq!(page.state().value_of(CITY).as_deref(), Some("Pune"));
        assert_eq!(city_options(&page).len(), CITIES.len());
    }

    #[tokio::test]
    async fn incomplete_form_is_not_sent() {
        let (page, seen, _dir) = home().await;
        page.state().set_value(MOOD, "happy");
        page.state().set_value(AGE, "0");

        page.submit().await;

        assert_eq!(
            page.state().value_of(FORM_ERROR).as_deref(),
            Some("Please select a valid age, your city.")
        );
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn recipe_is_rendered() {
        let (page, seen, _dir) = home().await;
        cache_ip(&page.services, "203.0.113.7").await;
        fill_form(&page, "happy", "29", "Pune");

        page.submit().await;

        let state = page.state();
        assert_eq!(state.value_of(RECIPE_NAME).as_deref(), Some("Masala Khichdi"));
        assert_eq!(state.value_of(PREP_TIME).as_deref(), Some("25 minutes"));
        assert!(state.is_visible(RECIPE_CARD));
        assert!(!state.is_visible(LOADING));
        match state.get_element(INSTRUCTIONS) {
            Some(UiElement::Markup { html, .. }) => {
                assert!(html.contains("2. Pressure cook with spices."))
            }
            other => panic!("unexpected instructions {other:?}"),
        }
        let body = seen.lock().unwrap().last().cloned().unwrap();
        assert_eq!(body["ip"], "203.0.113.7");
        assert_eq!(body["age"], 29);
    }

    #[tokio::test]
    async fn backend_error_reports_no_recipe() {
        let (page, _, _dir) = home().await;
        cache_ip(&page.services, "203.0.113.7").await;
        fill_form(&page, "angry", "40", "Delhi");
        let mut rx = page.state().subscribe();

        page.submit().await;

        assert_eq!(
            notices(&mut rx),
            vec![(NoticeLevel::Alert, "No recipe found for this mood".to_string())]
        );
        assert!(!page.state().is_visible(LOADING));
        assert!(!page.state().is_visible(RECIPE_CARD));
    }

    #[tokio::test]
    async fn missing_ip_reports_fetch_error() {
        let (page, seen, _dir) = home().await;
        fill_form(&page, "sad", "35", "Chennai");
        let mut rx = page.state().subscribe();

        page.submit().await;

        assert_eq!(
            notices(&mut rx),
            vec![(NoticeLevel::Alert, "Error fetching recipe".to_string())]
        );
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn manual_city_choice_is_remembered() {
        let (page, _, _dir) = home().await;
        page.initialize_location().await.unwrap();

        page.city_changed("Jaipur").await;

        let info = page.services.resolver.cache().load().await.unwrap().unwrap();
        assert_eq!(info.user_selected_city.as_deref(), Some("Jaipur"));
        assert_eq!(info.city.as_deref(), Some("Nagpur"));

        let reloaded = HomePage::new(page.services.clone());
        reloaded.initialize_location().await.unwrap();
        assert_eq!(reloaded.state().value_of(CITY).as_deref(), Some("Jaipur"));
    }

    #[tokio::test]
    async fn returning_to_detected_city_forgets_manual_choice() {
        let (page, _, _dir) = home().await;
        page.initialize_location().await.unwrap();
        page.city_changed("Jaipur").await;
        page.city_changed("Nagpur").await;

        let reloaded = HomePage::new(page.services.clone());
        reloaded.initialize_location().await.unwrap();

        assert_eq!(reloaded.state().value_of(CITY).as_deref(), Some("Nagpur"));
        let info = page.services.resolver.cache().load().await.unwrap().unwrap();
        assert_eq!(info.user_selected_city, None);
    }
}
