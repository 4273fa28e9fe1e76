use crate::context::EventContext;
use crate::error::HookError;
use std::collections::BTreeMap;

/// The behavior of one kind of event.
///
/// Every world change a hook makes goes through the [`EventContext`] so the
/// engine can revert it. Hooks returning `Err` (or panicking) cancel the
/// session.
pub trait EventLifecycle {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Called once, after participant inventories were stripped.
    fn start(&mut self, cx: &mut EventContext<'_>) -> Result<(), HookError>;

    /// Called every `tick_interval` external ticks while running.
    fn tick(&mut self, cx: &mut EventContext<'_>) -> Result<(), HookError>;

    /// Called once when the session ends or is terminated, before its claims
    /// are released.
    fn end(&mut self, cx: &mut EventContext<'_>) -> Result<(), HookError>;
}

type Factory = Box<dyn Fn() -> Box<dyn EventLifecycle>>;

/// Named factories for event lifecycles. Each session gets a fresh instance.
#[derive(Default)]
pub struct EventCatalog {
    factories: BTreeMap<String, Factory>,
}

impl std::fmt::Debug for EventCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCatalog")
            .field("events", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EventCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous registration.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn EventLifecycle> + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
            tracing::warn!(event = %name, "event registration replaced");
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn instantiate(&self, name: &str) -> Option<Box<dyn EventLifecycle>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// `(name, description)` for every registered event.
    pub fn describe(&self) -> Vec<(String, String)> {
        self.factories
            .iter()
            .map(|(name, factory)| (name.clone(), factory().description().to_owned()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Idle;

    impl EventLifecycle for Idle {
        fn name(&self) -> &str {
            "idle"
        }
        fn description(&self) -> &str {
            "does nothing"
        }
        fn start(&mut self, _: &mut EventContext<'_>) -> Result<(), HookError> {
            Ok(())
        }
        fn tick(&mut self, _: &mut EventContext<'_>) -> Result<(), HookError> {
            Ok(())
        }
        fn end(&mut self, _: &mut EventContext<'_>) -> Result<(), HookError> {
            Ok(())
        }
    }

    #[test]
    fn register_and_instantiate() {
        let mut catalog = EventCatalog::new();
        catalog.register("idle", || Box::new(Idle));
        assert!(catalog.contains("idle"));
        assert_eq!(catalog.instantiate("idle").unwrap().name(), "idle");
        assert!(catalog.instantiate("missing").is_none());
        assert_eq!(
            catalog.describe(),
            vec![("idle".to_string(), "does nothing".to_string())]
        );
    }
}
