//! Windowed retrieval of a monitor's result history.
//!
//! The service refuses queries spanning more than [`WINDOW_SPAN`] seconds,
//! so a monitor's history is walked from its creation time to "now" in
//! fixed-size [`Window`]s, one request per window.

mod fetcher;
mod window;

pub use fetcher::{FetchOutcome, WindowFailure, WindowFetcher};
pub use window::{Window, WindowPlan, WINDOW_SPAN};
