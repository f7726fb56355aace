// Script module
// Binding lifecycle and the host-facing script hooks of the slideshow text sync

use crate::host::{Callback, FrontendEvent, FrontendId, Host, SignalId, Source, TimerId};
use crate::properties::Properties;
use crate::settings::Settings;
use crate::sources::{is_slideshow_source, is_text_source, is_unselected, source_lists};
use crate::sync::{sync_text, BoundPair};
use log::{debug, info, warn};
use std::time::Duration;

/// Slideshow signals that can mean a different slide is on screen
///
/// `save` only matters for older hosts running a newer slideshow plugin,
/// where it is the one signal fired on slide changes.
pub const SLIDESHOW_UPDATE_SIGNALS: [&str; 5] = [
    "media_next",
    "media_previous",
    "media_restart",
    "save",
    "update",
];

/// Default and bounds of the poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: i64 = 200;
pub const MIN_POLL_INTERVAL_MS: i64 = 50;
pub const MAX_POLL_INTERVAL_MS: i64 = 5000;

// Settings keys
const KEY_SLIDESHOW: &str = "slideshow_src";
const KEY_TEXT: &str = "text_src";
const KEY_TRIGGER: &str = "trigger";
const KEY_POLL_INTERVAL: &str = "poll_interval_ms";
const KEY_REFRESH: &str = "refresh_list";

/// What drives a resync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trigger {
    /// React to the slideshow's own slide-change signals
    #[default]
    Signals,
    /// Resync on a fixed interval whether or not the slide changed
    Poll,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Signals => "signals",
            Trigger::Poll => "poll",
        }
    }

    /// Unknown values fall back to signals
    pub fn from_setting(value: &str) -> Self {
        match value {
            "poll" => Trigger::Poll,
            _ => Trigger::Signals,
        }
    }
}

/// The script's persisted settings, decoded
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub slideshow_source: String,
    pub text_source: String,
    pub trigger: Trigger,
    pub poll_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            slideshow_source: String::new(),
            text_source: String::new(),
            trigger: Trigger::Signals,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS as u64),
        }
    }
}

impl SyncConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let interval_ms = match settings.get_int(KEY_POLL_INTERVAL) {
            0 => DEFAULT_POLL_INTERVAL_MS,
            ms => ms.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS),
        };

        Self {
            slideshow_source: settings.get_string(KEY_SLIDESHOW).to_string(),
            text_source: settings.get_string(KEY_TEXT).to_string(),
            trigger: Trigger::from_setting(settings.get_string(KEY_TRIGGER)),
            poll_interval: Duration::from_millis(interval_ms as u64),
        }
    }

    /// Write the config back in settings form
    pub fn to_settings(&self) -> Settings {
        let mut settings = Settings::new();
        settings.set_string(KEY_SLIDESHOW, self.slideshow_source.as_str());
        settings.set_string(KEY_TEXT, self.text_source.as_str());
        settings.set_string(KEY_TRIGGER, self.trigger.as_str());
        settings.set_int(KEY_POLL_INTERVAL, self.poll_interval.as_millis() as i64);
        settings
    }

    /// True when either side is left empty or on the sentinel
    pub fn is_unselected(&self) -> bool {
        is_unselected(&self.slideshow_source) || is_unselected(&self.text_source)
    }
}

/// Lifecycle of the script's binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unconfigured,
    Configured,
    TornDown,
}

/// What the script holds on to between callbacks
pub struct Binding<H: Host> {
    pair: BoundPair<H::Weak>,
    connections: Vec<SignalId>,
    timer: Option<TimerId>,
}

impl<H: Host> Default for Binding<H> {
    fn default() -> Self {
        Self {
            pair: BoundPair::default(),
            connections: Vec::new(),
            timer: None,
        }
    }
}

impl<H: Host> Binding<H> {
    /// Release every subscription and handle; safe to repeat
    fn detach(&mut self, host: &H) {
        for id in self.connections.drain(..) {
            host.disconnect(id);
        }
        if let Some(id) = self.timer.take() {
            host.remove_timer(id);
        }
        self.pair.clear();
    }
}

/// The slideshow text sync script
pub struct Script<H: Host> {
    config: SyncConfig,
    binding: Binding<H>,
    frontend: Option<FrontendId>,
    phase: Phase,
}

impl<H: Host> Default for Script<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Host> Script<H> {
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
            binding: Binding::default(),
            frontend: None,
            phase: Phase::Unconfigured,
        }
    }

    pub fn description() -> &'static str {
        "Updates the selected text source with the file name of the currently shown image \
         in the selected image slide show source.\
         <br>Due to scripting limitations, if you rename the sources that are selected, \
         you have to reselect them."
    }

    pub fn defaults(settings: &mut Settings) {
        settings.set_default_string(KEY_TRIGGER, Trigger::Signals.as_str());
        settings.set_default_int(KEY_POLL_INTERVAL, DEFAULT_POLL_INTERVAL_MS);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Build the script's settings form with freshly populated source lists
    pub fn properties(&self, host: &H) -> Properties {
        let mut props = Properties::new();
        props.add_list(KEY_SLIDESHOW, "Image Slideshow Source");
        props.add_list(KEY_TEXT, "Text Source");
        props.add_button(KEY_REFRESH, "Refresh Source Lists");

        props.add_list(KEY_TRIGGER, "Update Trigger");
        props.list_add_string(KEY_TRIGGER, "On slide change", Trigger::Signals.as_str());
        props.list_add_string(KEY_TRIGGER, "Poll on interval", Trigger::Poll.as_str());
        props.add_int(
            KEY_POLL_INTERVAL,
            "Poll Interval (ms)",
            MIN_POLL_INTERVAL_MS,
            MAX_POLL_INTERVAL_MS,
            50,
        );

        Self::refresh_lists(host, &mut props);
        props
    }

    /// Repopulate both source lists; returns true so the host redraws the form
    pub fn refresh_lists(host: &H, props: &mut Properties) -> bool {
        let lists = source_lists(host);

        props.list_clear(KEY_SLIDESHOW);
        props.list_clear(KEY_TEXT);
        for name in &lists.slideshows {
            props.list_add_string(KEY_SLIDESHOW, name, name);
        }
        for name in &lists.texts {
            props.list_add_string(KEY_TEXT, name, name);
        }

        debug!(
            "Source lists refreshed: {} slideshow(s), {} text source(s)",
            lists.slideshows.len() - 1,
            lists.texts.len() - 1
        );
        true
    }

    /// Scripts load before the host's sources do, so binding waits for the
    /// frontend to report that loading finished
    pub fn load(&mut self, host: &H, settings: &Settings) {
        self.config = SyncConfig::from_settings(settings);
        if self.phase == Phase::TornDown {
            self.phase = Phase::Unconfigured;
        }
        if self.frontend.is_none() {
            self.frontend = Some(host.add_frontend_callback());
        }
        info!(
            "Script loaded (slideshow: '{}', text: '{}', trigger: {})",
            self.config.slideshow_source,
            self.config.text_source,
            self.config.trigger.as_str()
        );
    }

    /// Rebind from new settings, or from the stored config when `settings` is None
    ///
    /// Returns the text written by the immediate resync, if any.
    pub fn update(&mut self, host: &H, settings: Option<&Settings>) -> Option<String> {
        if self.phase == Phase::TornDown {
            debug!("Ignoring update after unload");
            return None;
        }
        if let Some(settings) = settings {
            self.config = SyncConfig::from_settings(settings);
        }

        self.binding.detach(host);
        self.phase = Phase::Unconfigured;

        if self.config.is_unselected() {
            debug!("No slideshow/text pair selected");
            return None;
        }

        let slideshow = host.source_by_name(&self.config.slideshow_source);
        let text = host.source_by_name(&self.config.text_source);

        let (Some(slideshow), Some(text)) = (slideshow, text) else {
            warn!(
                "Selected sources '{}' / '{}' not found",
                self.config.slideshow_source, self.config.text_source
            );
            return None;
        };
        if !is_slideshow_source(Some(&slideshow)) || !is_text_source(Some(&text)) {
            warn!(
                "Selected sources '{}' / '{}' are not a slideshow and a text source",
                self.config.slideshow_source, self.config.text_source
            );
            return None;
        }

        self.attach(host, &slideshow, &text);
        drop(slideshow);
        drop(text);

        self.resync(host)
    }

    fn attach(&mut self, host: &H, slideshow: &H::Source, text: &H::Source) {
        match self.config.trigger {
            Trigger::Signals => {
                for signal in SLIDESHOW_UPDATE_SIGNALS {
                    self.binding
                        .connections
                        .push(host.connect(slideshow, signal));
                }
            }
            Trigger::Poll => {
                self.binding.timer = Some(host.add_timer(self.config.poll_interval));
            }
        }

        self.binding.pair = BoundPair {
            slideshow: Some(host.downgrade(slideshow)),
            text: Some(host.downgrade(text)),
        };
        self.phase = Phase::Configured;

        info!(
            "Bound '{}' to '{}' ({})",
            slideshow.name(),
            text.name(),
            match self.config.trigger {
                Trigger::Signals => "on slide change".to_string(),
                Trigger::Poll => format!("every {} ms", self.config.poll_interval.as_millis()),
            }
        );
    }

    /// Run one resync against the current binding
    pub fn resync(&self, host: &H) -> Option<String> {
        match sync_text(host, &self.binding.pair) {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("Sync skipped: {}", e);
                None
            }
        }
    }

    /// Dispatch a host callback; returns the text written, if any
    pub fn on_callback(&mut self, host: &H, callback: &Callback) -> Option<String> {
        if self.phase == Phase::TornDown {
            debug!("Ignoring {:?} after unload", callback);
            return None;
        }

        match callback {
            Callback::Signal { id, signal } => {
                if !self.binding.connections.contains(id) {
                    debug!("Ignoring stale '{}' signal", signal);
                    return None;
                }
                self.resync(host)
            }
            Callback::Timer(id) => {
                if self.binding.timer != Some(*id) {
                    debug!("Ignoring stale timer {:?}", id);
                    return None;
                }
                self.resync(host)
            }
            Callback::Frontend(
                event @ (FrontendEvent::FinishedLoading | FrontendEvent::SceneCollectionChanged),
            ) => {
                info!("Rebinding after {:?}", event);
                self.update(host, None)
            }
            Callback::Frontend(_) => None,
        }
    }

    /// Release every signal, timer and frontend subscription
    pub fn unload(&mut self, host: &H) {
        self.binding.detach(host);
        if let Some(id) = self.frontend.take() {
            host.remove_frontend_callback(id);
        }
        self.phase = Phase::TornDown;
        info!("Script unloaded");
    }
}
