//! Frame sequences for the IP reveal and hit-count animations.

use std::{net::Ipv4Addr, time::Duration};

use crate::ui::AppState;

/// Longest count-up before the counter starts skipping numbers.
pub const MAX_COUNT_FRAMES: u64 = 300;

/// Every octet climbs from 0 by one per frame until it reaches its target.
/// The last frame is always `target` verbatim. Anything that is not a dotted
/// IPv4 address is shown straight away.
pub fn ip_reveal_frames(target: &str) -> Vec<String> {
    let Ok(addr) = target.parse::<Ipv4Addr>() else {
        return vec![target.to_string()];
    };
    let goal = addr.octets();
    let mut current = [0u8; 4];
    let mut frames = Vec::with_capacity(usize::from(*goal.iter().max().unwrap_or(&0)) + 1);

    while current != goal {
        frames.push(Ipv4Addr::from(current).to_string());
        for (octet, &want) in current.iter_mut().zip(goal.iter()) {
            if *octet < want {
                *octet += 1;
            }
        }
    }
    frames.push(target.to_string());
    frames
}

/// Values shown while counting from `from` up to `to`. Counting down is not
/// animated, the final value is shown directly.
pub fn count_up_frames(from: u64, to: u64) -> Vec<u64> {
    if from >= to {
        return vec![to];
    }
    let step = (to - from).div_ceil(MAX_COUNT_FRAMES);
    let mut frames: Vec<u64> = (1..)
        .map(|i: u64| from.saturating_add(i.saturating_mul(step)))
        .take_while(|&value| value < to)
        .collect();
    frames.push(to);
    frames
}

/// Writes each frame into a text element, pausing `tick` between frames.
pub async fn play(state: &AppState, id: &str, frames: impl IntoIterator<Item = String>, tick: Duration) {
    let mut frames = frames.into_iter().peekable();
    while let Some(frame) = frames.next() {
        state.set_text(id, frame);
        if frames.peek().is_some() && !tick.is_zero() {
            tokio::time::sleep(tick).await;
        }
    }
}
