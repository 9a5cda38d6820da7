//! Rust-side UI state mirrored into the browser over a JSON WebSocket protocol.
//!
//! Elements hold an `id` and their content but no geometry or styling; the page
//! HTML places them with custom tags (`<ui-button>`, `<ui-text>`, `<ui-select>`,
//! ...) and `static/webui.js` keeps them in sync.
//!
//! # Protocol
//!
//! - Client to server: `click { id }`, `input { id, value }`, `change { id, value }`.
//! - Server to client: `init { elements }` on connect, `update { id, element }`
//!   on every change, and `notify { level, message }` for alerts.
//!
//! Every WebSocket connection counts as a page load and runs the page's load
//! hook after the initial state has been sent.

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{Html, IntoResponse},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::broadcast;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, info, warn};

/// JSON Protocol: Messages from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    #[serde(rename = "click")]
    Click { id: String },
    #[serde(rename = "input")]
    Input { id: String, value: String },
    #[serde(rename = "change")]
    Change { id: String, value: serde_json::Value },
}

/// JSON Protocol: Messages from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "init")]
    Init { elements: Vec<UiElement> },
    #[serde(rename = "update")]
    Update { id: String, element: UiElement },
    #[serde(rename = "notify")]
    Notify { level: NoticeLevel, message: String },
}

/// Severity of a user-facing notice. The browser shows `alert` notices as a
/// blocking dialog and the others as a toast.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Alert,
    Success,
    Error,
}

type ClickCallback = Option<Arc<Box<dyn Fn() + Send + Sync + 'static>>>;
type InputCallback = Option<Arc<Box<dyn Fn(&str) + Send + Sync + 'static>>>;
type BoolCallback = Option<Arc<Box<dyn Fn(bool) + Send + Sync + 'static>>>;
type NumberCallback = Option<Arc<Box<dyn Fn(f64) + Send + Sync + 'static>>>;
type LoadCallback = Option<Arc<Box<dyn Fn() + Send + Sync + 'static>>>;

/// One entry of a [`UiElement::Select`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// An option whose label is its value.
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// UI Element types that can be created in Rust and rendered in HTML.
#[derive(Clone, Serialize)]
#[serde(tag = "kind")]
pub enum UiElement {
    /// A clickable button. Renders as `<ui-button id="...">`.
    #[serde(rename = "button")]
    Button {
        id: String,
        text: String,
        #[serde(skip)]
        on_click: ClickCallback,
    },

    /// Read-only text. Renders as `<ui-text id="...">`.
    #[serde(rename = "text")]
    Text { id: String, text: String },

    /// Free text field. `multiline` renders a textarea.
    #[serde(rename = "input")]
    Input {
        id: String,
        value: String,
        multiline: bool,
        #[serde(skip)]
        on_input: InputCallback,
    },

    /// Number field. `value` is `None` while the field is empty.
    #[serde(rename = "number")]
    NumberInput {
        id: String,
        value: Option<f64>,
        min: Option<f64>,
        max: Option<f64>,
        step: Option<f64>,
        #[serde(skip)]
        on_change: NumberCallback,
    },

    /// Dropdown. The placeholder is rendered as a disabled first option and
    /// an empty `value` means it is still selected.
    #[serde(rename = "select")]
    Select {
        id: String,
        value: String,
        placeholder: Option<String>,
        options: Vec<SelectOption>,
        #[serde(skip)]
        on_change: InputCallback,
    },

    /// Radio button. Radios sharing `name` are mutually exclusive.
    #[serde(rename = "radio")]
    Radio {
        id: String,
        name: String,
        value: String,
        label: String,
        checked: bool,
        #[serde(skip)]
        on_change: BoolCallback,
    },

    /// Show/hide container around static HTML.
    #[serde(rename = "panel")]
    Panel { id: String, visible: bool },

    /// HTML fragment rendered by Rust. Callers escape any user or backend text.
    #[serde(rename = "markup")]
    Markup { id: String, html: String },
}

impl UiElement {
    pub fn id(&self) -> &str {
        match self {
            UiElement::Button { id, .. }
            | UiElement::Text { id, .. }
            | UiElement::Input { id, .. }
            | UiElement::NumberInput { id, .. }
            | UiElement::Select { id, .. }
            | UiElement::Radio { id, .. }
            | UiElement::Panel { id, .. }
            | UiElement::Markup { id, .. } => id,
        }
    }

    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        UiElement::Text {
            id: id.into(),
            text: text.into(),
        }
    }

    pub fn panel(id: impl Into<String>, visible: bool) -> Self {
        UiElement::Panel {
            id: id.into(),
            visible,
        }
    }

    pub fn markup(id: impl Into<String>, html: impl Into<String>) -> Self {
        UiElement::Markup {
            id: id.into(),
            html: html.into(),
        }
    }
}

impl std::fmt::Debug for UiElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UiElement::Button { id, text, .. } => f
                .debug_struct("Button")
                .field("id", id)
                .field("text", text)
                .field("on_click", &"<handler>")
                .finish(),
            UiElement::Text { id, text } => f
                .debug_struct("Text")
                .field("id", id)
                .field("text", text)
                .finish(),
            UiElement::Input {
                id,
                value,
                multiline,
                ..
            } => f
                .debug_struct("Input")
                .field("id", id)
                .field("value", value)
                .field("multiline", multiline)
                .field("on_input", &"<handler>")
                .finish(),
            UiElement::NumberInput {
                id,
                value,
                min,
                max,
                step,
                ..
            } => f
                .debug_struct("NumberInput")
                .field("id", id)
                .field("value", value)
                .field("min", min)
                .field("max", max)
                .field("step", step)
                .field("on_change", &"<handler>")
                .finish(),
            UiElement::Select {
                id,
                value,
                placeholder,
                options,
                ..
            } => f
                .debug_struct("Select")
                .field("id", id)
                .field("value", value)
                .field("placeholder", placeholder)
                .field("options", options)
                .field("on_change", &"<handler>")
                .finish(),
            UiElement::Radio {
                id,
                name,
                value,
                checked,
                ..
            } => f
                .debug_struct("Radio")
                .field("id", id)
                .field("name", name)
                .field("value", value)
                .field("checked", checked)
                .field("on_change", &"<handler>")
                .finish(),
            UiElement::Panel { id, visible } => f
                .debug_struct("Panel")
                .field("id", id)
                .field("visible", visible)
                .finish(),
            UiElement::Markup { id, html } => f
                .debug_struct("Markup")
                .field("id", id)
                .field("html", &format_args!("<{} bytes>", html.len()))
                .finish(),
        }
    }
}

/// Element store and update channel for one page.
///
/// Cloning is cheap and every clone shares the same elements, so handlers
/// capture a clone and write back through it.
#[derive(Clone)]
pub struct AppState {
    elements: Arc<Mutex<HashMap<String, UiElement>>>,
    update_tx: broadcast::Sender<ServerMessage>,
    on_load: Arc<Mutex<LoadCallback>>,
}

impl AppState {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            elements: Arc::new(Mutex::new(HashMap::new())),
            update_tx: tx,
            on_load: Arc::new(Mutex::new(None)),
        }
    }

    fn elements(&self) -> MutexGuard<'_, HashMap<String, UiElement>> {
        self.elements.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a UI element, replacing any element with the same ID.
    pub fn add_element(&self, element: UiElement) {
        let id = element.id().to_string();
        self.elements().insert(id, element);
    }

    /// Replaces an element and broadcasts the change to all connected clients.
    pub fn update_element(&self, id: &str, element: UiElement) {
        self.elements().insert(id.to_string(), element.clone());
        let _ = self.update_tx.send(ServerMessage::Update {
            id: id.to_string(),
            element,
        });
    }

    /// Edits an element in place and broadcasts the result. Returns `false`
    /// when no element has this ID.
    pub fn modify(&self, id: &str, edit: impl FnOnce(&mut UiElement)) -> bool {
        let updated = {
            let mut elements = self.elements();
            match elements.get_mut(id) {
                Some(element) => {
                    edit(element);
                    element.clone()
                }
                None => return false,
            }
        };
        let _ = self.update_tx.send(ServerMessage::Update {
            id: id.to_string(),
            element: updated,
        });
        true
    }

    pub fn get_element(&self, id: &str) -> Option<UiElement> {
        self.elements().get(id).cloned()
    }

    /// Gets all UI elements. Used when initializing new clients.
    pub fn get_all_elements(&self) -> Vec<UiElement> {
        self.elements().values().cloned().collect()
    }

    /// Current value of a form element or the content of a text element.
    /// Empty values and unset numbers are `None`.
    pub fn value_of(&self, id: &str) -> Option<String> {
        let value = match self.elements().get(id)? {
            UiElement::Text { text, .. } => text.clone(),
            UiElement::Input { value, .. } | UiElement::Select { value, .. } => value.clone(),
            UiElement::NumberInput { value, .. } => value.map(|v| v.to_string())?,
            UiElement::Radio { value, checked, .. } if *checked => value.clone(),
            _ => return None,
        };
        (!value.is_empty()).then_some(value)
    }

    /// Value of the checked radio in a group.
    pub fn checked_in_group(&self, name: &str) -> Option<String> {
        self.elements().values().find_map(|element| match element {
            UiElement::Radio {
                name: group,
                value,
                checked: true,
                ..
            } if group == name => Some(value.clone()),
            _ => None,
        })
    }

    pub fn set_text(&self, id: &str, text: impl Into<String>) {
        self.update_element(id, UiElement::text(id, text));
    }

    pub fn set_markup(&self, id: &str, html: impl Into<String>) {
        self.update_element(id, UiElement::markup(id, html));
    }

    pub fn set_visible(&self, id: &str, visible: bool) {
        self.update_element(id, UiElement::panel(id, visible));
    }

    pub fn is_visible(&self, id: &str) -> bool {
        matches!(
            self.elements().get(id),
            Some(UiElement::Panel { visible: true, .. })
        )
    }

    /// Sets the value of an input, number field or select and broadcasts it.
    /// Numbers that fail to parse clear the field.
    pub fn set_value(&self, id: &str, new_value: &str) -> bool {
        self.modify(id, |element| match element {
            UiElement::Input { value, .. } | UiElement::Select { value, .. } => {
                *value = new_value.to_string();
            }
            UiElement::NumberInput { value, .. } => *value = new_value.parse().ok(),
            UiElement::Text { text, .. } => *text = new_value.to_string(),
            _ => {}
        })
    }

    /// Unchecks every radio in a group.
    pub fn clear_group(&self, name: &str) {
        let ids: Vec<String> = self
            .elements()
            .values()
            .filter(|element| matches!(element, UiElement::Radio { name: group, .. } if group == name))
            .map(|element| element.id().to_string())
            .collect();
        for id in ids {
            self.modify(&id, |element| {
                if let UiElement::Radio { checked, .. } = element {
                    *checked = false;
                }
            });
        }
    }

    /// Broadcasts a notice to every connected client.
    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        debug!(?level, %message, "notice");
        let _ = self.update_tx.send(ServerMessage::Notify { level, message });
    }

    /// Receives every message broadcast from this state.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.update_tx.subscribe()
    }

    /// Registers the hook run whenever a browser loads the page.
    pub fn on_load(&self, handler: impl Fn() + Send + Sync + 'static) {
        *self.on_load.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::new(Box::new(handler)));
    }

    pub(crate) fn fire_load(&self) {
        let handler = self
            .on_load
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler();
        }
    }

    pub(crate) fn handle_click(&self, id: &str) {
        let handler = {
            let elements = self.elements();
            if let Some(UiElement::Button {
                on_click: Some(handler),
                ..
            }) = elements.get(id)
            {
                Some(handler.clone())
            } else {
                None
            }
        };
        if let Some(handler) = handler {
            handler();
        }
    }

    pub(crate) fn handle_input(&self, id: &str, new_value: &str) {
        let handler = {
            let mut elements = self.elements();
            if let Some(UiElement::Input {
                value, on_input, ..
            }) = elements.get_mut(id)
            {
                *value = new_value.to_string();
                on_input.clone()
            } else {
                None
            }
        };
        if let Some(handler) = handler {
            handler(new_value);
        }
    }

    pub(crate) fn handle_change(&self, id: &str, new_value: serde_json::Value) {
        enum HandlerCall {
            Bool(Arc<Box<dyn Fn(bool) + Send + Sync + 'static>>, bool),
            Number(Arc<Box<dyn Fn(f64) + Send + Sync + 'static>>, f64),
            Text(Arc<Box<dyn Fn(&str) + Send + Sync + 'static>>, String),
        }

        let handler_call = {
            let mut elements = self.elements();
            let group = match elements.get(id) {
                Some(UiElement::Radio { name, .. }) if new_value.as_bool() == Some(true) => {
                    Some(name.clone())
                }
                _ => None,
            };
            if let Some(group) = group {
                for element in elements.values_mut() {
                    if let UiElement::Radio { name, checked, .. } = element {
                        if *name == group {
                            *checked = false;
                        }
                    }
                }
            }

            match elements.get_mut(id) {
                Some(UiElement::Radio {
                    checked, on_change, ..
                }) => new_value.as_bool().and_then(|is_checked| {
                    *checked = is_checked;
                    on_change
                        .clone()
                        .map(|handler| HandlerCall::Bool(handler, is_checked))
                }),
                Some(UiElement::NumberInput {
                    value, on_change, ..
                }) => {
                    *value = new_value.as_f64();
                    value.and_then(|num| {
                        on_change
                            .clone()
                            .map(|handler| HandlerCall::Number(handler, num))
                    })
                }
                Some(UiElement::Select {
                    value, on_change, ..
                }) => new_value.as_str().and_then(|selected| {
                    *value = selected.to_string();
                    on_change
                        .clone()
                        .map(|handler| HandlerCall::Text(handler, selected.to_string()))
                }),
                _ => None,
            }
        };

        if let Some(handler_call) = handler_call {
            match handler_call {
                HandlerCall::Bool(handler, value) => handler(value),
                HandlerCall::Number(handler, value) => handler(value),
                HandlerCall::Text(handler, value) => handler(&value),
            }
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| websocket(socket, state))
}

async fn websocket(stream: WebSocket, state: AppState) {
    use futures_util::sink::SinkExt;
    use futures_util::stream::StreamExt;

    let (mut sender, mut receiver) = stream.split();

    // Subscribe before sending init so no update falls between the two
    let mut update_rx = state.update_tx.subscribe();

    let init_msg = ServerMessage::Init {
        elements: state.get_all_elements(),
    };
    let json = match serde_json::to_string(&init_msg) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to encode init message: {e}");
            return;
        }
    };
    if sender.send(Message::Text(json.into())).await.is_err() {
        return;
    }

    state.fire_load();

    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = match update_rx.recv().await {
                Ok(msg) => msg,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Client lagged behind by {skipped} updates");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let Ok(json) = serde_json::to_string(&msg) else {
                continue;
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let Message::Text(text) = msg else {
                continue;
            };
            match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(ClientMessage::Click { id }) => state_clone.handle_click(&id),
                Ok(ClientMessage::Input { id, value }) => state_clone.handle_input(&id, &value),
                Ok(ClientMessage::Change { id, value }) => state_clone.handle_change(&id, value),
                Err(e) => debug!("Ignoring malformed client message: {e}"),
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }
}

// Default HTML template - wraps page content
fn generate_html(title: &str, ws_path: &str, body_content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="/static/webui.css">
</head>
<body data-ws="{ws_path}">
{body_content}
    <div id="ui-toasts"></div>
    <script src="/static/webui.js"></script>
</body>
</html>"#
    )
}

/// A page served at `path` with its own element state.
pub struct Page {
    pub path: String,
    pub title: String,
    pub body_html: String,
    pub state: AppState,
}

impl Page {
    pub fn new(
        path: impl Into<String>,
        title: impl Into<String>,
        body_html: impl Into<String>,
        state: AppState,
    ) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            body_html: body_html.into(),
            state,
        }
    }

    /// WebSocket endpoint of the page: `/ws` for `/`, `<path>/ws` otherwise.
    pub fn ws_path(&self) -> String {
        format!("{}/ws", self.path.trim_end_matches('/'))
    }
}

/// Configuration for creating the router
pub struct RouterConfig {
    pub pages: Vec<Page>,
    /// Path to static files directory
    pub static_dir: String,
}

impl RouterConfig {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            static_dir: "static".to_string(),
        }
    }

    pub fn page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }

    /// Sets the static files directory
    pub fn static_dir(mut self, dir: impl Into<String>) -> Self {
        self.static_dir = dir.into();
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates the router: every page at its path with its WebSocket next to it,
/// and `/static` for `webui.js` and `webui.css`.
pub fn create_router(config: RouterConfig) -> Router {
    let mut router = Router::new();

    for page in config.pages {
        let html_content = generate_html(&page.title, &page.ws_path(), &page.body_html);
        let page_router = Router::new()
            .route(
                &page.path,
                get(move || async move { Html(html_content) }),
            )
            .route(&page.ws_path(), get(websocket_handler))
            .with_state(page.state);
        router = router.merge(page_router);
    }

    router
        .nest_service("/static", ServeDir::new(config.static_dir))
        .layer(TraceLayer::new_for_http())
}

/// Binds `addr` and serves the router until the process stops.
pub async fn start_server(config: RouterConfig, addr: &str) -> Result<(), std::io::Error> {
    let app = create_router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}
