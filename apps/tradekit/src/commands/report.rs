use std::path::PathBuf;

pub(super) fn run_report(input: PathBuf) -> Result<(), String> {
    let deps = crate::infra::build_reporting_deps();
    let result = tradekit_application::reporting::regenerate_report(
        input.as_path(),
        deps.reader.as_ref(),
        deps.writer.as_ref(),
    )?;
    println!("{}", result.report);
    println!(
        "tradekit: report regenerated (strategy={}, symbol={}, trades={}) in {}",
        result.meta.strategy,
        result.meta.symbol,
        result.metrics.total_trades,
        result.input_dir.display()
    );
    Ok(())
}
