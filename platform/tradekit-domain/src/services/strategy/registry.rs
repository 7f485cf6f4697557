use super::moving_average::{self, MovingAverageCross};
use super::params::StrategyParams;
use super::rsi::{self, RsiStrategy};
use super::Strategy;
use std::collections::HashMap;
use tracing::{error, info, warn};

pub type StrategyConstructor = fn(&StrategyParams) -> Result<Box<dyn Strategy>, String>;

/// Maps strategy kinds to constructors. Built explicitly and passed to whoever assembles runs.
#[derive(Default)]
pub struct StrategyRegistry {
    constructors: HashMap<String, StrategyConstructor>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(moving_average::KIND, |params| {
            MovingAverageCross::from_params(params).map(|s| Box::new(s) as Box<dyn Strategy>)
        });
        registry.register(rsi::KIND, |params| {
            RsiStrategy::from_params(params).map(|s| Box::new(s) as Box<dyn Strategy>)
        });
        registry
    }

    pub fn register(&mut self, kind: &str, constructor: StrategyConstructor) {
        if self
            .constructors
            .insert(kind.to_string(), constructor)
            .is_some()
        {
            warn!(kind, "strategy kind already registered, overwriting");
        }
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    pub fn create(&self, kind: &str, params: &StrategyParams) -> Option<Box<dyn Strategy>> {
        let Some(constructor) = self.constructors.get(kind) else {
            error!(kind, available = ?self.available(), "unknown strategy kind");
            return None;
        };
        match constructor(params) {
            Ok(strategy) => {
                info!(kind, params = ?strategy.params(), "strategy created");
                Some(strategy)
            }
            Err(err) => {
                error!(kind, error = %err, "failed to create strategy");
                None
            }
        }
    }

    pub fn available(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.constructors.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}
