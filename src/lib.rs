//! moodchef - mood-based recipe generator client
//!
//! A local web app that asks for your mood, age and city, requests a generated
//! recipe from the recipe backend and renders it. It also lists the recipes
//! generated from your IP, grouped by mood, and takes star-rating feedback.
//!
//! # Architecture
//!
//! - **Pages** ([`pages`]): one controller per page (home, my recipes,
//!   feedback). Each owns an [`AppState`] and runs its own load hook when a
//!   browser opens the page.
//! - **UI layer** ([`ui`]): elements live in Rust and are mirrored into
//!   `<ui-*>` tags by `static/webui.js` over a JSON WebSocket protocol.
//! - **Collaborators**: the recipe backend ([`backend`]) and the geolocation
//!   provider ([`location`]). The resolved location is cached in a JSON file.
//!
//! # Example
//!
//! ```no_run
//! use moodchef::{Config, Services, pages, start_server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let services = Services::from_config(&config)?;
//!     start_server(pages::router_config(&services, &config.static_dir), &config.bind_addr).await?;
//!     Ok(())
//! }
//! ```

pub mod animate;
pub mod backend;
pub mod config;
pub mod counter;
pub mod error;
pub mod format;
pub mod location;
pub mod model;
pub mod pages;
pub mod render;
pub mod ui;

pub use backend::BackendClient;
pub use config::Config;
pub use error::{ClientError, ConfigError};
pub use location::{IpCache, LocationResolver};
pub use model::{FeedbackRequest, IpInfo, Recipe, RecipeHistory, RecipeRequest};
pub use pages::Services;
pub use ui::{AppState, NoticeLevel, Page, RouterConfig, UiElement, create_router, start_server};
