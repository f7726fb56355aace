// Host interface module
// The scripting surface the host application exposes to the sync script

use crate::settings::Settings;
use std::collections::HashMap;
use std::time::Duration;

/// Id of an attached signal connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalId(pub u64);

/// Id of a scheduled interval timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Id of a frontend event subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrontendId(pub u64);

/// Frontend (application-level) events the host broadcasts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendEvent {
    /// All sources of the startup scene collection have been loaded
    FinishedLoading,
    /// A different scene collection became active
    #[allow(dead_code)]
    SceneCollectionChanged,
    /// The host is shutting down; scripts are unloaded right after
    Exit,
}

/// A callback the host delivers to the script on its main thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Signal { id: SignalId, signal: String },
    Timer(TimerId),
    Frontend(FrontendEvent),
}

/// Argument/result container for source procedure calls
#[derive(Debug, Clone, Default)]
pub struct CallData {
    ints: HashMap<String, i64>,
}

impl CallData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an integer slot, `0` when the procedure did not set it
    pub fn int(&self, name: &str) -> i64 {
        self.ints.get(name).copied().unwrap_or(0)
    }

    pub fn set_int(&mut self, name: &str, value: i64) {
        self.ints.insert(name.to_string(), value);
    }
}

/// A strong, reference-counted source handle
///
/// Dropping the handle releases the reference, so every exit path of a
/// scope that acquired one releases it exactly once.
pub trait Source {
    fn name(&self) -> String;

    /// Versioned type id (e.g. `slideshow`)
    fn id(&self) -> String;

    /// Type id without the host's version suffix (e.g. `text_ft2_source`)
    fn unversioned_id(&self) -> String;

    /// Snapshot of the source's current settings
    fn settings(&self) -> Settings;

    /// Apply settings to the source, merging with what it already has
    fn update(&self, settings: &Settings);

    /// Invoke a procedure on the source; false if it has no such procedure
    fn call(&self, procedure: &str, data: &mut CallData) -> bool;
}

/// Source registry, signals, timers and frontend events of the host
pub trait Host {
    type Source: Source;

    /// Non-owning handle; resolves to nothing once the source is destroyed
    type Weak: Clone;

    fn enum_sources(&self) -> Vec<Self::Source>;

    fn source_by_name(&self, name: &str) -> Option<Self::Source>;

    fn downgrade(&self, source: &Self::Source) -> Self::Weak;

    fn upgrade(&self, weak: &Self::Weak) -> Option<Self::Source>;

    fn connect(&self, source: &Self::Source, signal: &str) -> SignalId;

    /// Detach a signal connection; unknown ids are ignored
    fn disconnect(&self, id: SignalId);

    fn add_timer(&self, interval: Duration) -> TimerId;

    /// Cancel a timer; unknown ids are ignored
    fn remove_timer(&self, id: TimerId);

    fn add_frontend_callback(&self) -> FrontendId;

    fn remove_frontend_callback(&self, id: FrontendId);
}
