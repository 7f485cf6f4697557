use super::ProcessArgs;
use tradekit_application::config::Config;
use tradekit_application::processing::{process_dataset, ProcessRequest};
use tradekit_domain::services::ohlcv::FillMethod;
use tradekit_domain::value_objects::timeframe::Timeframe;

pub(super) fn run_process(args: ProcessArgs, config: &Config) -> Result<(), String> {
    let storage = crate::infra::build_storage(config)?;
    let request = ProcessRequest {
        source: match args.data_name {
            Some(name) => name,
            None => config.dataset_name()?,
        },
        target: args.save_as,
        fill: FillMethod::parse(&args.fill)?,
        resample: args.resample.as_deref().map(Timeframe::parse).transpose()?,
    };

    let outcome = process_dataset(storage.as_ref(), &request)?;
    println!(
        "processed {} -> {}: {} rows in, {} rows out",
        request.source, outcome.dataset, outcome.input_rows, outcome.rows
    );
    println!(
        "cleaning: filled={}, outliers={}, dropped={}",
        outcome.cleaning.filled, outcome.cleaning.outliers, outcome.cleaning.dropped
    );
    super::common::print_quality(&outcome.quality);
    Ok(())
}
