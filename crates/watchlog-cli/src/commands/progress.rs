use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use watchlog_core::BatchProgress;

/// Batch progress for long provider passes
///
/// Draws a bar on a terminal; otherwise reports each batch through structured logging.
pub struct BatchProgressUI {
    bar: Option<ProgressBar>,
    label: &'static str,
}

impl BatchProgressUI {
    pub fn new(label: &'static str, total: usize, quiet: bool) -> Self {
        let bar = (is_interactive() && !quiet && total > 0).then(|| {
            let bar = ProgressBar::new(total as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
            }
            bar.set_message(label);
            bar
        });

        if bar.is_none() {
            tracing::info!(operation = label, total = total, "Starting batch pass");
        }

        Self { bar, label }
    }

    pub fn update(&self, progress: BatchProgress) {
        match &self.bar {
            Some(bar) => {
                bar.set_position(progress.processed as u64);
                bar.set_message(format!(
                    "{} (batch {}/{})",
                    self.label, progress.batch, progress.total_batches
                ));
            }
            None => tracing::info!(
                operation = self.label,
                batch = progress.batch,
                total_batches = progress.total_batches,
                processed = progress.processed,
                total = progress.total,
                "Batch finished"
            ),
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}
