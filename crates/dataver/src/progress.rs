use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Builds the progress bars shown on stderr. A quiet builder yields a
/// hidden bar.
pub(crate) struct ProgressBarBuilder {
    template: &'static str,
    quiet: bool,
    len: Option<u64>,
}

impl ProgressBarBuilder {
    pub(crate) fn new(template: &'static str, quiet: bool) -> Self {
        Self {
            template,
            quiet,
            len: None,
        }
    }

    /// Sets the expected number of steps. Without a length the bar is
    /// rendered as a spinner.
    pub(crate) fn len(mut self, len: u64) -> Self {
        self.len = Some(len);
        self
    }

    pub(crate) fn build(self) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }

        let pbar = match self.len {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };

        let style = ProgressStyle::with_template(self.template)
            .unwrap_or_else(|_| ProgressStyle::default_bar());

        pbar.set_draw_target(ProgressDrawTarget::stderr());
        pbar.set_style(style);
        pbar.enable_steady_tick(Duration::from_millis(200));
        pbar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_bar_is_hidden() {
        let pbar = ProgressBarBuilder::new("{pos}", true).len(10).build();
        assert!(pbar.is_hidden());
    }

    #[test]
    fn length_is_applied() {
        let pbar = ProgressBarBuilder::new("{pos}", false).len(42).build();
        assert_eq!(pbar.length(), Some(42));
        pbar.finish_and_clear();
    }
}
