// Application state module
// Drives the sync script against the simulated host and reports caption changes

use crate::host::FrontendEvent;
use crate::script::{Phase, Script, SyncConfig, Trigger};
use crate::sim::SimHost;
use log::{debug, info, warn};
use std::time::Duration;

/// Names of the sources the simulation creates
pub const SLIDESHOW_NAME: &str = "Slideshow";
pub const TEXT_NAME: &str = "Caption";

/// Granularity of the simulated clock between callback pumps
const PUMP_STEP: Duration = Duration::from_millis(10);

/// One observed change of the caption text
#[derive(Debug, Clone, PartialEq)]
pub struct TextChange {
    pub at: Duration,
    /// Live slideshow index when the change was seen
    pub index: usize,
    pub count: usize,
    pub text: String,
}

/// Main application state
pub struct AppState {
    host: SimHost,
    script: Script<SimHost>,
    slide_duration: Duration,
    last_text: String,
}

impl AppState {
    /// Create the simulated host with a slideshow of `files` and load the script
    pub fn new(
        files: &[String],
        trigger: Trigger,
        poll_interval: Duration,
        slide_duration: Duration,
    ) -> Self {
        let host = SimHost::new();
        host.add_slideshow(SLIDESHOW_NAME, files.iter().cloned());
        host.add_text(TEXT_NAME, "text_ft2_source", "");

        let mut script = Script::new();
        debug!("Script: {}", Script::<SimHost>::description());

        // Nothing is selected yet when the script first loads
        let mut config = SyncConfig {
            trigger,
            poll_interval,
            ..SyncConfig::default()
        };
        let mut settings = config.to_settings();
        Script::<SimHost>::defaults(&mut settings);
        script.load(&host, &settings);

        let props = script.properties(&host);
        for prop in props.iter() {
            debug!("Property {}", prop);
        }
        debug!(
            "Selectable slideshows: {:?}, text sources: {:?}",
            props.list_values("slideshow_src"),
            props.list_values("text_src")
        );

        // The user picks the pair the way they would in the properties form
        config.slideshow_source = SLIDESHOW_NAME.to_string();
        config.text_source = TEXT_NAME.to_string();
        script.update(&host, Some(&config.to_settings()));
        if script.phase() != Phase::Configured {
            warn!("Script did not bind '{}' to '{}'", SLIDESHOW_NAME, TEXT_NAME);
        }

        Self {
            host,
            script,
            slide_duration,
            last_text: String::new(),
        }
    }

    /// Deliver queued host callbacks and report a caption change, if any
    fn pump(&mut self, report: &mut impl FnMut(&TextChange)) {
        for callback in self.host.drain() {
            self.script.on_callback(&self.host, &callback);
        }

        let text = self.host.text_of(TEXT_NAME).unwrap_or_default();
        if text != self.last_text {
            let change = TextChange {
                at: self.host.now(),
                index: self
                    .host
                    .current_index_of(SLIDESHOW_NAME)
                    .and_then(|index| usize::try_from(index).ok())
                    .unwrap_or(0),
                count: self.host.file_count_of(SLIDESHOW_NAME),
                text: text.clone(),
            };
            report(&change);
            self.last_text = text;
        }
    }

    /// Let the clock run for `duration`, pumping callbacks as timers fire
    fn wait(&mut self, duration: Duration, report: &mut impl FnMut(&TextChange)) {
        let mut elapsed = Duration::ZERO;
        while elapsed < duration {
            let step = PUMP_STEP.min(duration - elapsed);
            self.host.advance(step);
            elapsed += step;
            self.pump(report);
        }
    }

    /// Finish host loading, then advance the slideshow `steps` times
    pub fn run(&mut self, steps: usize, mut report: impl FnMut(&TextChange)) {
        info!("Sources loaded, starting playback");
        self.host.frontend_event(FrontendEvent::FinishedLoading);
        self.pump(&mut report);
        self.wait(self.slide_duration, &mut report);

        for _ in 0..steps {
            self.host.next(SLIDESHOW_NAME);
            self.pump(&mut report);
            self.wait(self.slide_duration, &mut report);
        }

        self.host.frontend_event(FrontendEvent::Exit);
        self.pump(&mut report);
        self.script.unload(&self.host);
        info!("Playback finished at {} ms", self.host.now().as_millis());
    }
}
