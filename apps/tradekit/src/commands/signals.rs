use super::SignalsArgs;
use tradekit_application::config::Config;
use tradekit_application::signals::{inspect_signals, SignalRequest};
use tradekit_domain::services::strategy::params::format_params;
use tradekit_domain::services::strategy::StrategyRegistry;
use tradekit_domain::value_objects::time::format_timestamp;

pub(super) fn run_signals(args: SignalsArgs, config: &Config) -> Result<(), String> {
    let storage = crate::infra::build_storage(config)?;
    let request = SignalRequest {
        kind: args.strategy.unwrap_or_else(|| config.strategy.kind.clone()),
        params: super::common::resolve_params(args.params.as_deref(), &config.strategy.params),
        data_name: match args.data_name {
            Some(name) => name,
            None => config.dataset_name()?,
        },
        days: args.days.or(config.run.days),
    };

    let inspection =
        inspect_signals(&request, &StrategyRegistry::with_builtin(), storage.as_ref())?;

    println!("strategy: {}", inspection.strategy_name);
    println!("parameters: {}", format_params(&inspection.params));
    println!(
        "data: {} ({} rows, {} .. {})",
        inspection.data_name,
        inspection.rows,
        format_timestamp(inspection.first_timestamp),
        format_timestamp(inspection.last_timestamp)
    );
    println!("signals: {}", inspection.signals.len());
    for signal in inspection.preview(args.limit) {
        println!("  {signal}");
    }
    if inspection.signals.len() > args.limit {
        println!("  ... {} more", inspection.signals.len() - args.limit);
    }
    Ok(())
}
