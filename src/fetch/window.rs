use std::fmt;

use serde::{Deserialize, Serialize};

/// Longest span a single results query may cover: 32 days, in seconds.
pub const WINDOW_SPAN: i64 = 32 * 24 * 60 * 60;

/// A bounded time range `[from, to]` in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub from: i64,
    pub to: i64,
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// Iterator over the contiguous windows covering `[start, now]`.
///
/// The first window always starts at `start`. Each following window starts
/// where the previous one ended, and iteration stops once a window would
/// start at or after `now`. The last window's `to` may lie past `now`.
#[derive(Debug, Clone)]
pub struct WindowPlan {
    next_from: i64,
    now: i64,
    span: i64,
    started: bool,
}

impl WindowPlan {
    /// Plan windows of `span` seconds from `start` up to `now`.
    ///
    /// A non-positive `span` is treated as one second so the plan always
    /// terminates.
    pub fn new(start: i64, now: i64, span: i64) -> Self {
        Self {
            next_from: start,
            now,
            span: span.max(1),
            started: false,
        }
    }
}

impl Iterator for WindowPlan {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.started && self.next_from >= self.now {
            return None;
        }
        self.started = true;

        let from = self.next_from;
        let to = from.saturating_add(self.span);
        self.next_from = to;
        Some(Window { from, to })
    }
}
