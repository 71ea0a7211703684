use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use mdflow::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Terminal view of an MD run.
///
/// Setup phases are shown by name and echoed once finished. The step bar
/// follows `StepCompleted` events and carries the latest temperature and
/// total energy.
#[derive(Clone)]
pub struct CliProgressHandler {
    bar: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr())
            .with_style(style("{msg}"));
        Self {
            bar: Arc::new(Mutex::new(bar)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let bar = self.bar.clone();
        Box::new(move |event: Progress| {
            let Ok(bar) = bar.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };
            match event {
                Progress::PhaseStart { name } => bar.set_message(name),
                Progress::PhaseFinish => bar.println(format!("✓ {}", bar.message())),
                Progress::RunStart { total_steps } => {
                    bar.set_style(style("[{bar:40.cyan/blue}] {pos}/{len} {msg}"));
                    bar.set_length(total_steps);
                    bar.set_position(0);
                    bar.set_message("");
                }
                Progress::StepCompleted {
                    step,
                    temperature,
                    total_energy,
                } => {
                    bar.set_position(step);
                    bar.set_message(format!("T={temperature:.1} K  E={total_energy:.4}"));
                }
                Progress::RunFinish => {
                    if let Some(len) = bar.length() {
                        bar.set_position(len);
                    }
                    bar.finish();
                }
            }
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn phases_are_named_until_the_run_starts() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart {
            name: "Building engine",
        });
        callback(Progress::PhaseFinish);

        let bar = handler.bar.lock().unwrap();
        assert_eq!(bar.message(), "Building engine");
        assert_eq!(bar.length(), Some(0));
        assert!(!bar.is_finished());
    }

    #[test]
    fn step_bar_follows_the_run() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::RunStart { total_steps: 100 });
        {
            let bar = handler.bar.lock().unwrap();
            assert_eq!(bar.length(), Some(100));
            assert_eq!(bar.position(), 0);
        }

        callback(Progress::StepCompleted {
            step: 40,
            temperature: 299.96,
            total_energy: -12.5,
        });
        {
            let bar = handler.bar.lock().unwrap();
            assert_eq!(bar.position(), 40);
            assert_eq!(bar.message(), "T=300.0 K  E=-12.5000");
        }

        callback(Progress::RunFinish);
        let bar = handler.bar.lock().unwrap();
        assert!(bar.is_finished());
        assert_eq!(bar.position(), 100);
    }

    #[test]
    fn callback_can_be_driven_from_another_thread() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::RunStart { total_steps: 5 });
            callback(Progress::RunFinish);
        })
        .join()
        .unwrap();

        let bar = handler.bar.lock().unwrap();
        assert!(bar.is_finished());
        assert_eq!(bar.position(), 5);
    }
}
