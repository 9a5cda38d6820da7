use std::time::Duration;

use tracing::error;

use crate::{
    animate::{count_up_frames, play},
    backend::BackendClient,
    ui::AppState,
};

/// Registers a visit and counts the text element up to the new total.
/// Starts from whatever number is on display; failures only get logged.
pub async fn update_hit_count(state: &AppState, id: &str, backend: &BackendClient, tick: Duration) {
    let total = match backend.hit_count().await {
        Ok(total) => total,
        Err(e) => {
            error!("Error updating hit count: {e}");
            return;
        }
    };

    let shown = state
        .value_of(id)
        .and_then(|text| text.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let frames = count_up_frames(shown, total).into_iter().map(|n| n.to_string());
    play(state, id, frames, tick).await;
}
