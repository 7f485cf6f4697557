use crate::shared::load_replay_bars;
use tracing::info_span;
use tradekit_domain::repositories::storage::DataStorage;
use tradekit_domain::services::strategy::params::StrategyParams;
use tradekit_domain::services::strategy::{Strategy, StrategyRegistry};
use tradekit_domain::value_objects::signal::Signal;

#[derive(Debug, Clone)]
pub struct SignalRequest {
    pub kind: String,
    pub params: StrategyParams,
    pub data_name: String,
    pub days: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct SignalInspection {
    pub strategy_name: String,
    pub params: StrategyParams,
    pub data_name: String,
    pub first_timestamp: i64,
    pub last_timestamp: i64,
    pub rows: usize,
    pub signals: Vec<Signal>,
}

impl SignalInspection {
    pub fn preview(&self, limit: usize) -> &[Signal] {
        &self.signals[..self.signals.len().min(limit)]
    }
}

pub fn inspect_signals(
    request: &SignalRequest,
    registry: &StrategyRegistry,
    storage: &dyn DataStorage,
) -> Result<SignalInspection, String> {
    let _span = info_span!("inspect_signals", strategy = %request.kind, data = %request.data_name)
        .entered();

    let strategy = registry.create(&request.kind, &request.params).ok_or_else(|| {
        format!(
            "could not create strategy '{}' (available: {})",
            request.kind,
            registry.available().join(", ")
        )
    })?;
    let (bars, _) = load_replay_bars(storage, &request.data_name, request.days, None)?;

    let signals = strategy.generate_signals(&bars);
    metrics::counter!("tradekit.signals.generated").increment(signals.len() as u64);

    Ok(SignalInspection {
        strategy_name: strategy.name().to_string(),
        params: strategy.params(),
        data_name: request.data_name.clone(),
        first_timestamp: bars.first().map(|bar| bar.timestamp).unwrap_or_default(),
        last_timestamp: bars.last().map(|bar| bar.timestamp).unwrap_or_default(),
        rows: bars.len(),
        signals,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyDescription {
    pub kind: String,
    pub defaults: StrategyParams,
}

pub fn describe_strategies(registry: &StrategyRegistry) -> Vec<StrategyDescription> {
    registry
        .available()
        .into_iter()
        .map(|kind| {
            let defaults = registry
                .create(&kind, &StrategyParams::new())
                .map(|strategy| strategy.params())
                .unwrap_or_default();
            StrategyDescription { kind, defaults }
        })
        .collect()
}
