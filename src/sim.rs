// Simulated host module
// In-memory, single-threaded stand-in for the host's sources, signals and timers

use crate::host::{CallData, Callback, FrontendEvent, FrontendId, Host, SignalId, Source, TimerId};
use crate::settings::Settings;
use log::debug;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Shortest interval a timer fires at, so a zero interval cannot stall the clock
const MIN_TIMER_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug)]
enum SourceKind {
    /// Live playback position, independent of the persisted `cur_index`
    Slideshow { index: i64 },
    Text,
    Other,
}

#[derive(Debug)]
struct SourceData {
    name: String,
    id: String,
    unversioned_id: String,
    settings: Settings,
    kind: SourceKind,
}

struct Connection {
    source: Weak<RefCell<SourceData>>,
    signal: String,
}

struct Timer {
    interval: Duration,
    next_due: Duration,
}

#[derive(Default)]
struct Registry {
    sources: Vec<Rc<RefCell<SourceData>>>,
    connections: BTreeMap<u64, Connection>,
    timers: BTreeMap<u64, Timer>,
    frontend: HashSet<u64>,
    queue: VecDeque<Callback>,
    clock: Duration,
    next_id: u64,
}

impl Registry {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn find(&self, name: &str) -> Option<Rc<RefCell<SourceData>>> {
        self.sources
            .iter()
            .find(|source| source.borrow().name == name)
            .cloned()
    }

    /// Queue one callback per live connection for `signal` on `source`
    fn emit(&mut self, source: &Rc<RefCell<SourceData>>, signal: &str) {
        let targets: Vec<u64> = self
            .connections
            .iter()
            .filter(|(_, conn)| {
                conn.signal == signal
                    && conn
                        .source
                        .upgrade()
                        .is_some_and(|connected| Rc::ptr_eq(&connected, source))
            })
            .map(|(id, _)| *id)
            .collect();

        debug!(
            "Signal '{}' on '{}' reaches {} handler(s)",
            signal,
            source.borrow().name,
            targets.len()
        );
        for id in targets {
            self.queue.push_back(Callback::Signal {
                id: SignalId(id),
                signal: signal.to_string(),
            });
        }
    }
}

/// Strong handle to a simulated source; releases its reference on drop
pub struct SimSource {
    data: Rc<RefCell<SourceData>>,
    live: Rc<Cell<usize>>,
}

impl SimSource {
    fn acquire(data: Rc<RefCell<SourceData>>, live: &Rc<Cell<usize>>) -> Self {
        live.set(live.get() + 1);
        Self {
            data,
            live: Rc::clone(live),
        }
    }
}

impl Drop for SimSource {
    fn drop(&mut self) {
        self.live.set(self.live.get().saturating_sub(1));
    }
}

impl Source for SimSource {
    fn name(&self) -> String {
        self.data.borrow().name.clone()
    }

    fn id(&self) -> String {
        self.data.borrow().id.clone()
    }

    fn unversioned_id(&self) -> String {
        self.data.borrow().unversioned_id.clone()
    }

    fn settings(&self) -> Settings {
        self.data.borrow().settings.clone()
    }

    fn update(&self, settings: &Settings) {
        self.data.borrow_mut().settings.apply(settings);
    }

    fn call(&self, procedure: &str, data: &mut CallData) -> bool {
        match (&self.data.borrow().kind, procedure) {
            (SourceKind::Slideshow { index }, "current_index") => {
                data.set_int("current_index", *index);
                true
            }
            _ => false,
        }
    }
}

/// Non-owning handle to a simulated source
#[derive(Clone)]
pub struct SimWeak(Weak<RefCell<SourceData>>);

/// The simulated host application
#[derive(Default)]
pub struct SimHost {
    registry: RefCell<Registry>,
    live: Rc<Cell<usize>>,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(
        &self,
        name: &str,
        id: &str,
        unversioned_id: &str,
        settings: Settings,
        kind: SourceKind,
    ) {
        debug!("Creating source '{}' ({})", name, id);
        self.registry
            .borrow_mut()
            .sources
            .push(Rc::new(RefCell::new(SourceData {
                name: name.to_string(),
                id: id.to_string(),
                unversioned_id: unversioned_id.to_string(),
                settings,
                kind,
            })));
    }

    /// Add an image slideshow source showing the first of `files`
    pub fn add_slideshow<I, S>(&self, name: &str, files: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut settings = Settings::new();
        settings.set_array("files", Settings::file_list(files));
        settings.set_int("cur_index", 0);
        self.insert(name, "slideshow", "slideshow", settings, SourceKind::Slideshow { index: 0 });
    }

    /// Add a text source of the given unversioned type (e.g. `text_ft2_source`)
    pub fn add_text(&self, name: &str, unversioned_id: &str, text: &str) {
        let mut settings = Settings::new();
        settings.set_string("text", text);
        let id = format!("{}_v2", unversioned_id);
        self.insert(name, &id, unversioned_id, settings, SourceKind::Text);
    }

    /// Add a source of any other type
    #[allow(dead_code)]
    pub fn add_source(&self, name: &str, id: &str) {
        self.insert(name, id, id, Settings::new(), SourceKind::Other);
    }

    #[allow(dead_code)]
    pub fn rename_source(&self, name: &str, new_name: &str) -> bool {
        match self.registry.borrow().find(name) {
            Some(source) => {
                source.borrow_mut().name = new_name.to_string();
                true
            }
            None => false,
        }
    }

    /// Drop the host's own reference; the source dies once no strong handle is held
    #[allow(dead_code)]
    pub fn remove_source(&self, name: &str) -> bool {
        let mut registry = self.registry.borrow_mut();
        let before = registry.sources.len();
        registry.sources.retain(|source| source.borrow().name != name);
        registry.sources.len() != before
    }

    fn step_slideshow(&self, name: &str, signal: &str, step: impl Fn(i64, i64) -> i64) -> bool {
        let mut registry = self.registry.borrow_mut();
        let Some(source) = registry.find(name) else {
            return false;
        };
        {
            let mut data = source.borrow_mut();
            let len = data.settings.get_array("files").len() as i64;
            let SourceKind::Slideshow { index } = &mut data.kind else {
                return false;
            };
            if len == 0 {
                return false;
            }
            *index = step(*index, len);
        }
        registry.emit(&source, signal);
        true
    }

    /// Advance to the next slide, wrapping at the end
    pub fn next(&self, name: &str) -> bool {
        self.step_slideshow(name, "media_next", |index, len| (index + 1).rem_euclid(len))
    }

    #[allow(dead_code)]
    pub fn previous(&self, name: &str) -> bool {
        self.step_slideshow(name, "media_previous", |index, len| (index - 1).rem_euclid(len))
    }

    #[allow(dead_code)]
    pub fn restart(&self, name: &str) -> bool {
        self.step_slideshow(name, "media_restart", |_, _| 0)
    }

    /// Move the live index without emitting any signal
    #[allow(dead_code)]
    pub fn set_index(&self, name: &str, new_index: i64) -> bool {
        let Some(source) = self.registry.borrow().find(name) else {
            return false;
        };
        let mut data = source.borrow_mut();
        match &mut data.kind {
            SourceKind::Slideshow { index } => {
                *index = new_index;
                true
            }
            _ => false,
        }
    }

    /// Persist the live index into `cur_index` and emit `save`
    #[allow(dead_code)]
    pub fn save_source(&self, name: &str) -> bool {
        let mut registry = self.registry.borrow_mut();
        let Some(source) = registry.find(name) else {
            return false;
        };
        {
            let mut data = source.borrow_mut();
            let live_index = match data.kind {
                SourceKind::Slideshow { index } => Some(index),
                _ => None,
            };
            if let Some(index) = live_index {
                data.settings.set_int("cur_index", index);
            }
        }
        registry.emit(&source, "save");
        true
    }

    /// Apply settings from the host side (user edit) and emit `update`
    #[allow(dead_code)]
    pub fn update_source(&self, name: &str, settings: &Settings) -> bool {
        let mut registry = self.registry.borrow_mut();
        let Some(source) = registry.find(name) else {
            return false;
        };
        source.borrow_mut().settings.apply(settings);
        registry.emit(&source, "update");
        true
    }

    /// Replace a slideshow's file list without touching its live index
    #[allow(dead_code)]
    pub fn truncate_files<I, S>(&self, name: &str, files: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let Some(source) = self.registry.borrow().find(name) else {
            return false;
        };
        source
            .borrow_mut()
            .settings
            .set_array("files", Settings::file_list(files));
        true
    }

    /// Emit an arbitrary signal on a source
    #[allow(dead_code)]
    pub fn emit_signal(&self, name: &str, signal: &str) -> bool {
        let mut registry = self.registry.borrow_mut();
        let Some(source) = registry.find(name) else {
            return false;
        };
        registry.emit(&source, signal);
        true
    }

    /// Broadcast a frontend event to every subscriber
    pub fn frontend_event(&self, event: FrontendEvent) {
        let mut registry = self.registry.borrow_mut();
        for _ in 0..registry.frontend.len() {
            registry.queue.push_back(Callback::Frontend(event));
        }
    }

    /// Move the virtual clock forward, queueing every timer tick that falls due
    pub fn advance(&self, by: Duration) {
        let mut registry = self.registry.borrow_mut();
        let target = registry.clock + by;
        loop {
            let due = registry
                .timers
                .iter()
                .filter(|(_, timer)| timer.next_due <= target)
                .min_by_key(|(_, timer)| timer.next_due)
                .map(|(id, timer)| (*id, timer.next_due));
            let Some((id, next_due)) = due else {
                break;
            };
            registry.clock = next_due;
            if let Some(timer) = registry.timers.get_mut(&id) {
                timer.next_due += timer.interval;
            }
            registry.queue.push_back(Callback::Timer(TimerId(id)));
        }
        registry.clock = target;
    }

    /// Take every callback queued since the last drain
    pub fn drain(&self) -> Vec<Callback> {
        self.registry.borrow_mut().queue.drain(..).collect()
    }

    pub fn now(&self) -> Duration {
        self.registry.borrow().clock
    }

    /// Strong handles currently held outside the host
    #[allow(dead_code)]
    pub fn live_handles(&self) -> usize {
        self.live.get()
    }

    #[allow(dead_code)]
    pub fn connection_count(&self) -> usize {
        self.registry.borrow().connections.len()
    }

    #[allow(dead_code)]
    pub fn timer_count(&self) -> usize {
        self.registry.borrow().timers.len()
    }

    #[allow(dead_code)]
    pub fn frontend_subscribers(&self) -> usize {
        self.registry.borrow().frontend.len()
    }

    pub fn text_of(&self, name: &str) -> Option<String> {
        self.settings_of(name)
            .map(|settings| settings.get_string("text").to_string())
    }

    pub fn settings_of(&self, name: &str) -> Option<Settings> {
        self.registry
            .borrow()
            .find(name)
            .map(|source| source.borrow().settings.clone())
    }

    pub fn current_index_of(&self, name: &str) -> Option<i64> {
        let source = self.registry.borrow().find(name)?;
        let data = source.borrow();
        match data.kind {
            SourceKind::Slideshow { index } => Some(index),
            _ => None,
        }
    }

    pub fn file_count_of(&self, name: &str) -> usize {
        self.settings_of(name)
            .map(|settings| settings.get_array("files").len())
            .unwrap_or(0)
    }
}

impl Host for SimHost {
    type Source = SimSource;
    type Weak = SimWeak;

    fn enum_sources(&self) -> Vec<SimSource> {
        self.registry
            .borrow()
            .sources
            .iter()
            .map(|data| SimSource::acquire(Rc::clone(data), &self.live))
            .collect()
    }

    fn source_by_name(&self, name: &str) -> Option<SimSource> {
        let data = self.registry.borrow().find(name)?;
        Some(SimSource::acquire(data, &self.live))
    }

    fn downgrade(&self, source: &SimSource) -> SimWeak {
        SimWeak(Rc::downgrade(&source.data))
    }

    fn upgrade(&self, weak: &SimWeak) -> Option<SimSource> {
        weak.0
            .upgrade()
            .map(|data| SimSource::acquire(data, &self.live))
    }

    fn connect(&self, source: &SimSource, signal: &str) -> SignalId {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id();
        registry.connections.insert(
            id,
            Connection {
                source: Rc::downgrade(&source.data),
                signal: signal.to_string(),
            },
        );
        SignalId(id)
    }

    fn disconnect(&self, id: SignalId) {
        self.registry.borrow_mut().connections.remove(&id.0);
    }

    fn add_timer(&self, interval: Duration) -> TimerId {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id();
        let interval = interval.max(MIN_TIMER_INTERVAL);
        let next_due = registry.clock + interval;
        registry.timers.insert(id, Timer { interval, next_due });
        TimerId(id)
    }

    fn remove_timer(&self, id: TimerId) {
        self.registry.borrow_mut().timers.remove(&id.0);
    }

    fn add_frontend_callback(&self) -> FrontendId {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id();
        registry.frontend.insert(id);
        FrontendId(id)
    }

    fn remove_frontend_callback(&self, id: FrontendId) {
        self.registry.borrow_mut().frontend.remove(&id.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> SimHost {
        let host = SimHost::new();
        host.add_slideshow("Show", ["/p/a.png", "/p/b.png", "/p/c.png"]);
        host.add_text("Caption", "text_ft2_source", "");
        host
    }

    #[test]
    fn test_handles_are_counted_and_released() {
        let host = host();
        {
            let all = host.enum_sources();
            assert_eq!(all.len(), 2);
            assert_eq!(host.live_handles(), 2);
            let _one = host.source_by_name("Show");
            assert_eq!(host.live_handles(), 3);
        }
        assert_eq!(host.live_handles(), 0);
    }

    #[test]
    fn test_weak_dies_with_removed_source() {
        let host = host();
        let weak = {
            let source = host.source_by_name("Caption").unwrap();
            host.downgrade(&source)
        };
        assert!(host.upgrade(&weak).is_some());
        assert!(host.remove_source("Caption"));
        assert!(host.upgrade(&weak).is_none());
        assert_eq!(host.live_handles(), 0);
    }

    #[test]
    fn test_weak_survives_rename() {
        let host = host();
        let weak = host.downgrade(&host.source_by_name("Show").unwrap());
        assert!(host.rename_source("Show", "Renamed"));
        let source = host.upgrade(&weak).unwrap();
        assert_eq!(source.name(), "Renamed");
    }

    #[test]
    fn test_playback_wraps_and_emits() {
        let host = host();
        let source = host.source_by_name("Show").unwrap();
        let id = host.connect(&source, "media_previous");

        assert!(host.previous("Show"));
        assert_eq!(host.current_index_of("Show"), Some(2));
        assert!(host.next("Show"));
        assert_eq!(host.current_index_of("Show"), Some(0));

        let callbacks = host.drain();
        assert_eq!(
            callbacks,
            vec![Callback::Signal {
                id,
                signal: "media_previous".to_string()
            }]
        );
    }

    #[test]
    fn test_disconnect_stops_delivery_and_is_idempotent() {
        let host = host();
        let source = host.source_by_name("Show").unwrap();
        let id = host.connect(&source, "media_next");
        host.disconnect(id);
        host.disconnect(id);
        host.next("Show");
        assert!(host.drain().is_empty());
        assert_eq!(host.connection_count(), 0);
    }

    #[test]
    fn test_current_index_procedure_is_live() {
        let host = host();
        host.next("Show");
        let source = host.source_by_name("Show").unwrap();
        let mut data = CallData::new();
        assert!(source.call("current_index", &mut data));
        assert_eq!(data.int("current_index"), 1);
        // Persisted field lags until the source is saved
        assert_eq!(source.settings().get_int("cur_index"), 0);
        host.save_source("Show");
        assert_eq!(source.settings().get_int("cur_index"), 1);

        let text = host.source_by_name("Caption").unwrap();
        assert!(!text.call("current_index", &mut CallData::new()));
    }

    #[test]
    fn test_timers_fire_on_virtual_clock() {
        let host = host();
        let id = host.add_timer(Duration::from_millis(200));
        host.advance(Duration::from_millis(199));
        assert!(host.drain().is_empty());
        host.advance(Duration::from_millis(401));
        assert_eq!(host.drain(), vec![Callback::Timer(id); 3]);
        assert_eq!(host.now(), Duration::from_millis(600));

        host.remove_timer(id);
        host.remove_timer(id);
        host.advance(Duration::from_secs(1));
        assert!(host.drain().is_empty());
    }

    #[test]
    fn test_frontend_events_need_a_subscriber() {
        let host = host();
        host.frontend_event(FrontendEvent::FinishedLoading);
        assert!(host.drain().is_empty());
        let id = host.add_frontend_callback();
        host.frontend_event(FrontendEvent::FinishedLoading);
        assert_eq!(
            host.drain(),
            vec![Callback::Frontend(FrontendEvent::FinishedLoading)]
        );
        host.remove_frontend_callback(id);
        assert_eq!(host.frontend_subscribers(), 0);
    }

    #[test]
    fn test_text_source_ids() {
        let host = host();
        let text = host.source_by_name("Caption").unwrap();
        assert_eq!(text.id(), "text_ft2_source_v2");
        assert_eq!(text.unversioned_id(), "text_ft2_source");
    }
}
