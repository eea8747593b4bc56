use indicatif::{ProgressBar, ProgressStyle};

/// A bar in the house style, or a hidden one when progress output is off.
pub fn bar(len: u64, label: &str, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    let template = format!("[{label:<10}] {{pos}}/{{len}} {{elapsed_precise}} {{wide_msg}}");
    pb.set_style(
        ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    pb
}
