use tradekit_application::signals::describe_strategies;
use tradekit_domain::services::strategy::params::format_params;
use tradekit_domain::services::strategy::StrategyRegistry;

pub(super) fn run_strategies() -> Result<(), String> {
    for description in describe_strategies(&StrategyRegistry::with_builtin()) {
        println!("{}  defaults: {}", description.kind, format_params(&description.defaults));
    }
    Ok(())
}
