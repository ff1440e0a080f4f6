// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pre-capture countdown.

use std::time::Duration;

pub const COUNTDOWN_STEPS: u32 = 3;
pub const COUNTDOWN_TOTAL: Duration = Duration::from_millis(1500);

/// One countdown step: the number shown and how much of the ring is filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub value: u32,
    /// 0.0 at the first tick, approaching 1.0.
    pub progress: f32,
}

/// Report 3, 2, 1 at even intervals, returning once the full duration has
/// elapsed.
pub async fn run_countdown(mut on_tick: impl FnMut(Tick)) {
    let step = COUNTDOWN_TOTAL / COUNTDOWN_STEPS;
    for value in (1..=COUNTDOWN_STEPS).rev() {
        on_tick(Tick {
            value,
            progress: (COUNTDOWN_STEPS - value) as f32 / COUNTDOWN_STEPS as f32,
        });
        tokio::time::sleep(step).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn three_ticks_over_one_and_a_half_seconds() {
        let started = Instant::now();
        let mut ticks = Vec::new();
        run_countdown(|t| ticks.push((t, started.elapsed()))).await;

        let values: Vec<u32> = ticks.iter().map(|(t, _)| t.value).collect();
        assert_eq!(values, vec![3, 2, 1]);
        assert_eq!(ticks[1].1, Duration::from_millis(500));
        assert!((ticks[2].0.progress - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(started.elapsed(), COUNTDOWN_TOTAL);
    }
}
