use super::FeaturesArgs;
use tracing::warn;
use tradekit_application::config::Config;
use tradekit_application::processing::compute_features;
use tradekit_domain::services::features::{FeatureConfig, FeatureKind};
use tradekit_domain::value_objects::time::format_timestamp;
use tradekit_infrastructure::artifacts::FilesystemArtifactWriter;

/// Unknown names are skipped with a warning; an empty list selects every indicator.
fn parse_indicators(names: &[String]) -> Vec<FeatureKind> {
    if names.is_empty() {
        return FeatureKind::ALL.to_vec();
    }
    names
        .iter()
        .filter_map(|name| match FeatureKind::parse(name) {
            Ok(kind) => Some(kind),
            Err(err) => {
                warn!(indicator = %name, "{err}, skipping");
                None
            }
        })
        .collect()
}

fn fmt_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

pub(super) fn run_features(args: FeaturesArgs, config: &Config) -> Result<(), String> {
    let kinds = parse_indicators(&args.indicators);
    if kinds.is_empty() {
        return Err("no known indicators selected".to_string());
    }
    let storage = crate::infra::build_storage(config)?;
    let data_name = match args.data_name {
        Some(name) => name,
        None => config.dataset_name()?,
    };

    let table = compute_features(
        storage.as_ref(),
        &data_name,
        &FeatureConfig::with_kinds(kinds),
        args.days.or(config.run.days),
    )?;
    println!(
        "features: {} ({} rows, {} columns)",
        data_name,
        table.rows.len(),
        table.columns.len()
    );
    if let Some(last) = table.rows.last() {
        println!("latest bar {}:", format_timestamp(last.timestamp));
        for (column, value) in table.columns.iter().zip(&last.values) {
            println!("  {column:<12} {}", fmt_value(*value));
        }
    }
    if let Some(path) = args.out {
        FilesystemArtifactWriter::new().write_features_csv(&path, &table)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_indicators;
    use tradekit_domain::services::features::FeatureKind;

    #[test]
    fn unknown_indicators_are_skipped() {
        let names = vec!["rsi".to_string(), "adx".to_string(), "MACD".to_string()];
        assert_eq!(
            parse_indicators(&names),
            vec![FeatureKind::Rsi, FeatureKind::Macd]
        );
        assert_eq!(parse_indicators(&[]).len(), FeatureKind::ALL.len());
    }
}
