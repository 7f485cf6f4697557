pub mod moving_average;
pub mod params;
pub mod registry;
pub mod rsi;

use crate::value_objects::bar::Bar;
use crate::value_objects::signal::Signal;
use params::StrategyParams;

pub use moving_average::MovingAverageCross;
pub use registry::StrategyRegistry;
pub use rsi::RsiStrategy;

/// Turns a price series into a list of signals. Must be deterministic for a given
/// series and parameter set.
pub trait Strategy {
    fn name(&self) -> &str;

    fn params(&self) -> StrategyParams;

    fn validate_parameters(&self) -> Result<(), String> {
        Ok(())
    }

    /// Merges `params` into the current set. Invalid updates leave the strategy unchanged.
    fn update_parameters(&mut self, _params: StrategyParams) -> bool {
        false
    }

    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal>;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn params(&self) -> StrategyParams {
        (**self).params()
    }

    fn validate_parameters(&self) -> Result<(), String> {
        (**self).validate_parameters()
    }

    fn update_parameters(&mut self, params: StrategyParams) -> bool {
        (**self).update_parameters(params)
    }

    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal> {
        (**self).generate_signals(bars)
    }
}

/// Never trades.
pub struct HoldStrategy;

impl Strategy for HoldStrategy {
    fn name(&self) -> &str {
        "hold"
    }

    fn params(&self) -> StrategyParams {
        StrategyParams::new()
    }

    fn generate_signals(&self, _bars: &[Bar]) -> Vec<Signal> {
        Vec::new()
    }
}
