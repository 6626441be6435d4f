//! The plugin bus: an ordered list of observers invoked at pipeline
//! lifecycle points.
//!
//! A handler returning `false` short-circuits the remaining plugins for
//! that event. A handler that panics is logged with the plugin name and
//! event, and the bus continues — plugins may never interrupt the
//! pipeline.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{trace, warn};

/// The lifecycle points, fired in pipeline order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginEvent<'a> {
    BeforeProgramValidate,
    AfterProgramValidate,
    AfterScopeCreate { scope_name: &'a str },
    BeforeScopeValidate { scope_name: &'a str },
    AfterScopeValidate { scope_name: &'a str },
    BeforeFileParse { pkg_path: &'a str },
    AfterFileParse { pkg_path: &'a str },
    AfterFileValidate { pkg_path: &'a str },
}

impl PluginEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            PluginEvent::BeforeProgramValidate => "beforeProgramValidate",
            PluginEvent::AfterProgramValidate => "afterProgramValidate",
            PluginEvent::AfterScopeCreate { .. } => "afterScopeCreate",
            PluginEvent::BeforeScopeValidate { .. } => "beforeScopeValidate",
            PluginEvent::AfterScopeValidate { .. } => "afterScopeValidate",
            PluginEvent::BeforeFileParse { .. } => "beforeFileParse",
            PluginEvent::AfterFileParse { .. } => "afterFileParse",
            PluginEvent::AfterFileValidate { .. } => "afterFileValidate",
        }
    }
}

pub trait Plugin {
    fn name(&self) -> &str;

    /// Handle one lifecycle event. Returning `false` stops the remaining
    /// plugins from seeing this event.
    fn on_event(&mut self, event: &PluginEvent<'_>) -> bool;
}

#[derive(Default)]
pub struct PluginBus {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plugins run in registration order
    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn emit(&mut self, event: PluginEvent<'_>) {
        for plugin in &mut self.plugins {
            let outcome = catch_unwind(AssertUnwindSafe(|| plugin.on_event(&event)));
            match outcome {
                Ok(true) => {}
                Ok(false) => {
                    trace!(
                        plugin = plugin.name(),
                        event = event.name(),
                        "plugin short-circuited event"
                    );
                    break;
                }
                Err(_) => {
                    warn!(
                        plugin = plugin.name(),
                        event = event.name(),
                        "plugin handler failed; continuing"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        name: String,
        log: Rc<RefCell<Vec<String>>>,
        stop_on: Option<&'static str>,
        panic_on: Option<&'static str>,
    }

    impl Plugin for Recorder {
        fn name(&self) -> &str {
            &self.name
        }
        fn on_event(&mut self, event: &PluginEvent<'_>) -> bool {
            if self.panic_on == Some(event.name()) {
                panic!("plugin blew up");
            }
            self.log
                .borrow_mut()
                .push(format!("{}:{}", self.name, event.name()));
            self.stop_on != Some(event.name())
        }
    }

    fn recorder(
        name: &str,
        log: &Rc<RefCell<Vec<String>>>,
        stop_on: Option<&'static str>,
        panic_on: Option<&'static str>,
    ) -> Box<Recorder> {
        Box::new(Recorder {
            name: name.to_string(),
            log: Rc::clone(log),
            stop_on,
            panic_on,
        })
    }

    #[test]
    fn plugins_fire_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = PluginBus::new();
        bus.add(recorder("first", &log, None, None));
        bus.add(recorder("second", &log, None, None));
        bus.emit(PluginEvent::BeforeProgramValidate);
        assert_eq!(
            *log.borrow(),
            vec!["first:beforeProgramValidate", "second:beforeProgramValidate"]
        );
    }

    #[test]
    fn false_return_short_circuits() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = PluginBus::new();
        bus.add(recorder("first", &log, Some("beforeProgramValidate"), None));
        bus.add(recorder("second", &log, None, None));
        bus.emit(PluginEvent::BeforeProgramValidate);
        bus.emit(PluginEvent::AfterProgramValidate);
        assert_eq!(
            *log.borrow(),
            vec![
                "first:beforeProgramValidate",
                "first:afterProgramValidate",
                "second:afterProgramValidate"
            ]
        );
    }

    #[test]
    fn panicking_plugin_does_not_stop_the_bus() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = PluginBus::new();
        bus.add(recorder("flaky", &log, None, Some("beforeProgramValidate")));
        bus.add(recorder("steady", &log, None, None));
        bus.emit(PluginEvent::BeforeProgramValidate);
        assert_eq!(*log.borrow(), vec!["steady:beforeProgramValidate"]);
    }
}
