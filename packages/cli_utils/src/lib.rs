#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for envwatch binaries.
//!
//! Provides an `indicatif`-backed attempt bar behind the
//! [`ProgressCallback`] trait, plus [`init_logger`] which sets up
//! `indicatif-log-bridge` so that `log::info!` and friends are suspended
//! while the bar redraws.

use std::sync::Arc;
use std::time::Duration;

use envwatch_source::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] that implements [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style to switch to once `set_total()` provides a known length.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Creates a bar for fetch attempts. Nothing is drawn until the
    /// fetcher has planned its traversal and calls `set_total()`.
    #[must_use]
    pub fn attempts_bar(multi: &MultiProgress) -> Arc<dyn ProgressCallback> {
        let bar_style = ProgressStyle::with_template(
            "{spinner:.cyan} {wide_msg} {bar:20.cyan/dim} {pos}/{len} [{elapsed}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        let bar = multi.add(ProgressBar::new(0));
        bar.set_style(bar_style.clone());

        Arc::new(Self { bar, bar_style })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        // A bar can serve several lookups in interactive mode.
        self.bar.reset();
        self.bar.set_length(total);
        self.bar.set_style(self.bar_style.clone());
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.disable_steady_tick();
        self.bar.finish_with_message(msg);
    }

    fn finish_and_clear(&self) {
        self.bar.disable_steady_tick();
        self.bar.finish_and_clear();
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    // Build the pretty-env-logger logger manually so we can wrap it.
    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Ignore error if logger was already set (e.g., in tests)

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use indicatif::ProgressDrawTarget;

    use super::*;

    #[test]
    fn attempts_bar_tracks_position_across_lookups() {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let bar = ProgressBar::new_spinner();
        let progress = IndicatifProgress {
            bar: multi.add(bar.clone()),
            bar_style: ProgressStyle::default_bar(),
        };

        progress.set_total(4);
        progress.inc(1);
        progress.inc(1);
        assert_eq!(bar.position(), 2);
        assert_eq!(bar.length(), Some(4));
        progress.finish_and_clear();

        progress.set_total(8);
        assert_eq!(bar.position(), 0);
        assert_eq!(bar.length(), Some(8));
    }
}
