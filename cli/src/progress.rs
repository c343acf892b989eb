use covpilot_core::progress::Progress;
use covpilot_core::progress::Step;
use covpilot_core::progress::StepRecord;
use covpilot_core::progress::StepStatus;
use owo_colors::OwoColorize;

/// Prints one line as each step starts and finishes.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn step_started(&self, step: Step, detail: &str) {
        println!("{} {:<10} {}", "▶".bright_blue(), step.label().bold(), detail.dimmed());
    }

    fn step_finished(&self, record: &StepRecord) {
        let seconds = format!("({:.1}s)", record.duration.as_secs_f64());
        let label = format!("{:<10}", record.step.label());
        match record.status {
            StepStatus::Ok => println!(
                "{} {} {} {}",
                "✓".bright_green(),
                label,
                record.detail,
                seconds.bright_black()
            ),
            StepStatus::Skipped => println!(
                "{} {} {}",
                "-".bright_black(),
                label,
                record.detail.bright_black()
            ),
            StepStatus::Warning => println!(
                "{} {} {} {}",
                "!".bright_yellow(),
                label,
                record.detail.yellow(),
                seconds.bright_black()
            ),
            StepStatus::Failed => println!(
                "{} {} {} {}",
                "✗".bright_red(),
                label,
                record.detail.red(),
                seconds.bright_black()
            ),
        }
    }

    fn message(&self, _step: Step, text: &str) {
        for line in text.lines() {
            println!("    {}", line.dimmed());
        }
    }
}
