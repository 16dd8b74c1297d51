use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use starsift_core::triage::Progress;
use std::path::Path;

/// Progress bar on stderr for the copy loop.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(visible: bool) -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        if !visible {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) = ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {wide_msg}",
        ) {
            bar.set_style(style);
        }
        Self { bar }
    }
}

impl Progress for BarProgress {
    fn begin(&self, total: u64) {
        self.bar.set_length(total);
    }

    fn advance(&self, path: &Path) {
        self.bar.set_message(format!("Checking {}", path.display()));
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
