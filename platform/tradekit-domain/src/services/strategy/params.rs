use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(value) => Some(*value as f64),
            ParamValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ParamValue::Int(value) => usize::try_from(*value).ok(),
            ParamValue::Float(value) if value.fract() == 0.0 && *value >= 0.0 => {
                Some(*value as usize)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(value) => write!(f, "{value}"),
            ParamValue::Int(value) => write!(f, "{value}"),
            ParamValue::Float(value) => write!(f, "{value}"),
            ParamValue::Text(value) => f.write_str(value),
        }
    }
}

pub type StrategyParams = BTreeMap<String, ParamValue>;

/// Parses `key=value,key2=value2`. Pairs without `=` are skipped.
pub fn parse_strategy_params(raw: &str) -> StrategyParams {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), infer_value(value.trim())))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn infer_value(value: &str) -> ParamValue {
    let is_digits = !value.is_empty() && value.chars().all(|c| c.is_ascii_digit());
    if is_digits {
        if let Ok(parsed) = value.parse::<i64>() {
            return ParamValue::Int(parsed);
        }
    }
    let is_decimal = value.contains('.') && value.chars().all(|c| c.is_ascii_digit() || c == '.');
    if is_decimal {
        if let Ok(parsed) = value.parse::<f64>() {
            return ParamValue::Float(parsed);
        }
    }
    match value.to_lowercase().as_str() {
        "true" => ParamValue::Bool(true),
        "false" => ParamValue::Bool(false),
        _ => ParamValue::Text(value.to_string()),
    }
}

pub fn format_params(params: &StrategyParams) -> String {
    if params.is_empty() {
        return "{}".to_string();
    }
    let pairs: Vec<String> = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    pairs.join(", ")
}

pub(crate) fn usize_param(params: &StrategyParams, key: &str) -> Result<Option<usize>, String> {
    params
        .get(key)
        .map(|value| {
            value
                .as_usize()
                .ok_or_else(|| format!("{key} must be a non-negative integer, got {value}"))
        })
        .transpose()
}

pub(crate) fn f64_param(params: &StrategyParams, key: &str) -> Result<Option<f64>, String> {
    params
        .get(key)
        .map(|value| {
            value
                .as_f64()
                .ok_or_else(|| format!("{key} must be numeric, got {value}"))
        })
        .transpose()
}

pub(crate) fn reject_unknown(params: &StrategyParams, known: &[&str]) -> Result<(), String> {
    match params.keys().find(|key| !known.contains(&key.as_str())) {
        Some(key) => Err(format!("unknown parameter: {key}")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{format_params, parse_strategy_params, ParamValue};

    #[test]
    fn infers_types_like_the_cli() {
        let params =
            parse_strategy_params("short_window=5, ratio=0.5,flag=True,name=fast,broken,neg=-3");
        assert_eq!(params["short_window"], ParamValue::Int(5));
        assert_eq!(params["ratio"], ParamValue::Float(0.5));
        assert_eq!(params["flag"], ParamValue::Bool(true));
        assert_eq!(params["name"], ParamValue::Text("fast".to_string()));
        assert_eq!(params["neg"], ParamValue::Text("-3".to_string()));
        assert!(!params.contains_key("broken"));
    }

    #[test]
    fn empty_input_gives_no_params() {
        assert!(parse_strategy_params("").is_empty());
        assert_eq!(format_params(&parse_strategy_params("")), "{}");
    }

    #[test]
    fn numeric_accessors() {
        assert_eq!(ParamValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(ParamValue::Float(4.0).as_usize(), Some(4));
        assert_eq!(ParamValue::Float(4.5).as_usize(), None);
        assert_eq!(ParamValue::Int(-1).as_usize(), None);
    }
}
