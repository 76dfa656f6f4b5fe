use crate::ui::icons::{CHECK, CLOCK, CROSS, SKIP, SPARKLE, SPEECH, STOP, WARN};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use remarker_common::{Notification, RunState};
use std::time::Duration;

/// Terminal renderer for a run, driven by the orchestrator's notification stream.
///
/// Two bars are stacked vertically:
/// - Targets bar: processed / total with running counts
/// - Status spinner: what the loop is waiting on
pub struct RunUI {
    multi: MultiProgress,
    targets_bar: ProgressBar,
    status_bar: ProgressBar,
    verbose: bool,
}

impl RunUI {
    pub fn new(total_targets: u64, verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let targets_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let targets_bar = multi.add(ProgressBar::new(total_targets));
        targets_bar.set_style(targets_style);
        targets_bar.set_prefix("Posts");

        let status_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .expect("progress bar template is a valid static string");

        let status_bar = multi.add(ProgressBar::new_spinner());
        status_bar.set_style(status_style);
        status_bar.set_prefix("  Now");
        status_bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            multi,
            targets_bar,
            status_bar,
            verbose,
        }
    }

    /// Print a line via `MultiProgress`, falling back to plain output when the bars
    /// are hidden (not a terminal) or the rich UI fails.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.is_hidden() {
            println!("{}", msg.as_ref());
        } else if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    pub fn print_header(&self, state: &RunState) {
        let mode = if state.multi_comment_mode {
            format!("{} comments", state.comment_pool.len())
        } else {
            "single comment".to_string()
        };
        self.print_line("");
        self.print_line(format!("{}", style("═".repeat(70)).cyan()));
        self.print_line(format!(
            "{} Commenting on {} posts ({}{})",
            style("▶").green().bold(),
            style(state.total()).yellow().bold(),
            mode,
            if state.randomize { ", randomized" } else { "" }
        ));
        self.print_line(format!("{}", style("═".repeat(70)).cyan()));
        self.print_line(format!(
            "{}  {}s between posts",
            style("Delay:").dim(),
            state.delay_seconds
        ));
        self.print_line("");
        self.targets_bar.set_position(state.cursor as u64);
        self.waiting_for(state.cursor + 1, state.total());
    }

    fn waiting_for(&self, index: usize, total: usize) {
        if index <= total {
            self.status_bar.set_message(format!(
                "{}Working on post {}/{}",
                CLOCK,
                style(index).cyan(),
                total
            ));
        }
    }

    fn counts(&self, success: u32, skipped: u32, failed: u32) {
        self.targets_bar.set_message(format!(
            "{} {} {}",
            style(format!("{success} ok")).green(),
            style(format!("{skipped} skipped")).yellow(),
            style(format!("{failed} failed")).red()
        ));
    }

    /// Render one notification.
    pub fn handle(&self, notification: &Notification) {
        match notification {
            Notification::CommentProgress {
                current_index,
                total_posts,
                url,
                warning,
                used_comment,
                success_count,
                skipped_count,
                failed_count,
                ..
            } => {
                self.targets_bar.inc(1);
                self.counts(*success_count, *skipped_count, *failed_count);
                self.print_line(format!(
                    "  {}[{}/{}] {}",
                    CHECK,
                    current_index,
                    total_posts,
                    style(url).green()
                ));
                if let Some(warning) = warning {
                    self.print_line(format!("      {}{}", WARN, style(warning).yellow()));
                }
                if self.verbose {
                    self.print_line(format!("      {}{}", SPEECH, style(used_comment).dim()));
                }
                self.waiting_for(current_index + 1, *total_posts);
            }
            Notification::CommentSkipped {
                current_index,
                total_posts,
                url,
                message,
                ..
            } => {
                self.targets_bar.inc(1);
                self.print_line(format!(
                    "  {}[{}/{}] {} {}",
                    SKIP,
                    current_index,
                    total_posts,
                    style(url).yellow(),
                    style(format!("({message})")).dim()
                ));
                self.waiting_for(current_index + 1, *total_posts);
            }
            Notification::CommentError {
                current_index,
                error,
                fatal,
                ..
            } => {
                if *fatal {
                    self.print_line(format!("\n{}{}\n", CROSS, style(error).red().bold()));
                    self.status_bar.finish_and_clear();
                    self.targets_bar.abandon();
                    return;
                }
                self.targets_bar.inc(1);
                self.print_line(format!("  {}{}", CROSS, style(error).red()));
                if let Some(index) = current_index {
                    let total = self.targets_bar.length().unwrap_or(0) as usize;
                    self.waiting_for(index + 1, total);
                }
            }
            Notification::CommentingComplete {
                message,
                success_count,
                skipped_count,
                failed_count,
                stopped,
            } => {
                self.counts(*success_count, *skipped_count, *failed_count);
                let icon = if *stopped { &STOP } else { &SPARKLE };
                self.print_line(format!("\n{}{}", icon, style(message).bold()));
                self.print_line(format!(
                    "   {} commented, {} skipped, {} failed\n",
                    style(success_count).green(),
                    style(skipped_count).yellow(),
                    style(failed_count).red()
                ));
                self.status_bar.finish_and_clear();
                self.targets_bar.abandon();
            }
        }
    }
}
