//! Setup Plugins
//!
//! A plugin is a named, one-shot setup callback with mutable access to the
//! [`Scheduler`]: it can add sensors, register rules or adjust the registry
//! before the loop starts. Plugins run in registration order on the first
//! `start()`, and never again on a restart.
//!
//! Names are unique; registering a name a second time is ignored until
//! [`PluginSet::reset`] clears the set.

use log::debug;

use crate::errors::RuntimeError;
use crate::scheduler::Scheduler;

/// One-shot setup callback
pub type PluginSetup = Box<dyn FnOnce(&mut Scheduler) -> Result<(), RuntimeError> + Send>;

pub struct Plugin {
    name: String,
    setup: PluginSetup,
}

impl Plugin {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn run(self, scheduler: &mut Scheduler) -> Result<(), RuntimeError> {
        (self.setup)(scheduler)
    }
}

/// Ordered, deduplicated plugin list
#[derive(Default)]
pub struct PluginSet {
    names: Vec<String>,
    pending: Vec<Plugin>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a plugin; returns `false` if the name was already registered
    pub fn register(&mut self, name: impl Into<String>, setup: PluginSetup) -> bool {
        let name = name.into();
        if self.names.contains(&name) {
            debug!("plugin {name:?} already registered, ignoring");
            return false;
        }
        self.names.push(name.clone());
        self.pending.push(Plugin { name, setup });
        true
    }

    /// Forgets every registered name and drops plugins that have not run
    pub fn reset(&mut self) {
        self.names.clear();
        self.pending.clear();
    }

    /// Every name registered since the last reset, in order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn take_pending(&mut self) -> Vec<Plugin> {
        std::mem::take(&mut self.pending)
    }

    /// Puts back plugins that did not get to run, ahead of newer ones
    pub(crate) fn restore(&mut self, plugins: Vec<Plugin>) {
        let newer = std::mem::replace(&mut self.pending, plugins);
        self.pending.extend(newer);
    }
}
