//! Star rating and comment, sent with the cached IP.

use std::sync::Arc;

use tracing::error;

use super::{Services, add_header, update_header};
use crate::{
    model::FeedbackRequest,
    ui::{AppState, NoticeLevel, Page, UiElement},
};

const RATING: &str = "rating";
const COMMENT: &str = "comment";

#[derive(Clone)]
pub struct FeedbackPage {
    state: AppState,
    services: Services,
}

impl FeedbackPage {
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
            "/feedback",
            "Feedback",
            include_str!("feedback.html"),
            self.state.clone(),
        )
    }

    fn build(&self) {
        let state = &self.state;
        add_header(state);

        for stars in (1..=5).rev() {
            state.add_element(UiElement::Radio {
                id: format!("{RATING}-{stars}"),
                name: RATING.to_string(),
                value: stars.to_string(),
                label: "★".repeat(stars),
                checked: false,
                on_change: None,
            });
        }
        state.add_element(UiElement::Input {
            id: COMMENT.to_string(),
            value: String::new(),
            multiline: true,
            on_input: None,
        });

        let page = self.clone();
        state.add_element(UiElement::Button {
            id: "submit-feedback".to_string(),
            text: "Submit Feedback".to_string(),
            on_click: Some(Arc::new(Box::new(move || {
                let page = page.clone();
                tokio::spawn(async move { page.submit().await });
            }))),
        });

        let page = self.clone();
        state.on_load(move || {
            let page = page.clone();
            tokio::spawn(async move { update_header(&page.state, &page.services).await });
        });
    }

    pub async fn submit(&self) {
        let Some(rating) = self.state.checked_in_group(RATING) else {
            self.state
                .notify(NoticeLevel::Alert, "Please select a rating.");
            return;
        };

        let cached = self.services.resolver.cache().ip().await.unwrap_or_else(|e| {
            error!("Error reading cached IP: {e}");
            None
        });
        let client_ip = match cached {
            Some(ip) => ip,
            None => {
                self.state.notify(
                    NoticeLevel::Alert,
                    "Could not get your IP address. Please make sure to visit the home page first.",
                );
                return;
            }
        };

        let feedback = FeedbackRequest {
            rating,
            comment: self.state.value_of(COMMENT).unwrap_or_default(),
            client_ip,
        };
        match self.services.backend.save_feedback(&feedback).await {
            Ok(true) => {
                self.state
                    .notify(NoticeLevel::Success, "Thank you for your feedback!");
                self.reset();
            }
            Ok(false) => self.state.notify(
                NoticeLevel::Error,
                "Failed to submit feedback. Please try again.",
            ),
            Err(e) => {
                error!("Error: {e}");
                self.state
                    .notify(NoticeLevel::Error, "An error occurred. Please try again.");
            }
        }
    }

    fn reset(&self) {
        self.state.clear_group(RATING);
        self.state.set_value(COMMENT, "");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::tests::Seen,
        pages::tests::{cache_ip, notices, offline_services, test_services},
    };
    use tempfile::TempDir;

    async fn feedback() -> (FeedbackPage, Seen, TempDir) {
        let dir = TempDir::new().unwrap();
        let (services, seen) = test_services(&dir).await;
        (FeedbackPage::new(services), seen, dir)
    }

    fn rate(page: &FeedbackPage, stars: u8, comment: &str) {
        page.state()
            .handle_change(&format!("rating-{stars}"), serde_json::json!(true));
        page.state().handle_input(COMMENT, comment);
    }

    #[tokio::test]
    async fn rating_is_required() {
        let (page, seen, _dir) = feedback().await;
        cache_ip(&page.services, "203.0.113.7").await;
        let mut rx = page.state().subscribe();

        page.submit().await;

        assert_eq!(
            notices(&mut rx),
            vec![(NoticeLevel::Alert, "Please select a rating.".to_string())]
        );
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ip_is_required() {
        let (page, seen, _dir) = feedback().await;
        rate(&page, 3, "ok");
        let mut rx = page.state().subscribe();

        page.submit().await;

        let notices = notices(&mut rx);
        assert_eq!(notices.len(), 1);
        assert!(notices[0].1.starts_with("Could not get your IP address"));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn accepted_feedback_resets_the_form() {
        let (page, seen, _dir) = feedback().await;
        cache_ip(&page.services, "203.0.113.7").await;
        rate(&page, 5, "Loved the khichdi");
        let mut rx = page.state().subscribe();

        page.submit().await;

        assert_eq!(
            notices(&mut rx),
            vec![(NoticeLevel::Success, "Thank you for your feedback!".to_string())]
        );
        let body = seen.lock().unwrap().last().cloned().unwrap();
        assert_eq!(body["rating"], "5");
        assert_eq!(body["comment"], "Loved the khichdi");
        assert_eq!(body["clientIP"], "203.0.113.7");
        assert_eq!(page.state().checked_in_group(RATING), None);
        assert_eq!(page.state().value_of(COMMENT), None);
    }

    #[tokio::test]
    async fn rejected_feedback_keeps_the_form() {
        let (page, _, _dir) = feedback().await;
        cache_ip(&page.services, "203.0.113.7").await;
        rate(&page, 2, "fail");
        let mut rx = page.state().subscribe();

        page.submit().await;

        assert_eq!(
            notices(&mut rx),
            vec![(
                NoticeLevel::Error,
                "Failed to submit feedback. Please try again.".to_string()
            )]
        );
        assert_eq!(page.state().checked_in_group(RATING).as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn unreachable_backend_reports_an_error() {
        let dir = TempDir::new().unwrap();
        let services = offline_services(&dir);
        cache_ip(&services, "203.0.113.7").await;
        let page = FeedbackPage::new(services);
        rate(&page, 4, "Nice");
        let mut rx = page.state().subscribe();

        page.submit().await;

        assert_eq!(
            notices(&mut rx),
            vec![(
                NoticeLevel::Error,
                "An error occurred. Please try again.".to_string()
            )]
        );
        assert_eq!(page.state().checked_in_group(RATING).as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn corrupt_cache_counts_as_missing_ip() {
        let (page, seen, _dir) = feedback().await;
        let cache = page.services.resolver.cache();
        tokio::fs::write(cache.path(), "{not json").await.unwrap();
        rate(&page, 5, "");
        let mut rx = page.state().subscribe();

        page.submit().await;

        let notices = notices(&mut rx);
        assert_eq!(notices.len(), 1);
        assert!(notices[0].1.starts_with("Could not get your IP address"));
        assert!(seen.lock().unwrap().is_empty());
    }
}
