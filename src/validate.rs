//! Module argument validation
//!
//! Each checker takes the raw document value and either returns the parsed,
//! order-preserving form or a `ValidationError` naming the offending key.
//! Strings are never coerced from numbers or booleans.

use crate::error::ValidationError;
use crate::types::{DeclaredChannelSet, DeclaredPackageSet, DEFAULT_CONFIG_OVERRIDE};
use serde_json::{Map, Value};

type Checked<T> = std::result::Result<T, ValidationError>;

/// Key carrying the caller's check-mode request, consumed before validation
pub const CHECK_MODE_KEY: &str = "_check_mode";

/// Validated arguments for the channel reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelArgs {
    pub channels: DeclaredChannelSet,
}

/// Validated arguments for the environment installer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvArgs {
    pub config: String,
    pub packages: DeclaredPackageSet,
}

impl ChannelArgs {
    pub fn from_value(value: &Value) -> Checked<Self> {
        let params = check_params(value, &["channels"])?;
        let channels = params
            .get("channels")
            .ok_or_else(|| ValidationError::Missing("channels".into()))?;

        Ok(Self {
            channels: check_type_dict_str("channels", channels)?,
        })
    }
}

impl EnvArgs {
    pub fn from_value(value: &Value) -> Checked<Self> {
        let params = check_params(value, &["config", "packages", "derivations"])?;

        let packages = match (params.get("packages"), params.get("derivations")) {
            (Some(_), Some(_)) => return Err(ValidationError::Exclusive("packages", "derivations")),
            (Some(v), None) => check_type_dict_list_str("packages", v)?,
            (None, Some(v)) => check_type_dict_list_str("derivations", v)?,
            (None, None) => return Err(ValidationError::Missing("packages".into())),
        };

        let config = match params.get("config") {
            None | Some(Value::Null) => DEFAULT_CONFIG_OVERRIDE.to_string(),
            Some(v) => check_type_str("config", v)?,
        };

        Ok(Self { config, packages })
    }
}

/// Split the check-mode flag off a raw argument document
pub fn take_check_mode(value: &mut Value) -> Checked<bool> {
    let Some(map) = value.as_object_mut() else {
        return Ok(false);
    };

    match map.shift_remove(CHECK_MODE_KEY) {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(b),
        Some(other) => Err(ValidationError::wrong_type(
            CHECK_MODE_KEY,
            "bool",
            type_name(&other),
        )),
    }
}

/// The document must be a mapping with no options outside `allowed`
fn check_params<'a>(value: &'a Value, allowed: &[&str]) -> Checked<&'a Map<String, Value>> {
    let params = value
        .as_object()
        .ok_or_else(|| ValidationError::wrong_type("<arguments>", "dict", type_name(value)))?;

    let unknown: Vec<String> = params
        .keys()
        .filter(|k| !allowed.contains(&k.as_str()))
        .cloned()
        .collect();

    if unknown.is_empty() {
        Ok(params)
    } else {
        Err(ValidationError::Unsupported(unknown))
    }
}

pub fn check_type_str(path: &str, value: &Value) -> Checked<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(ValidationError::wrong_type(path, "str", type_name(other))),
    }
}

pub fn check_type_list_str(path: &str, value: &Value) -> Checked<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| ValidationError::wrong_type(path, "list[str]", type_name(value)))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| check_type_str(&format!("{}[{}]", path, i), item))
        .collect()
}

pub fn check_type_dict_str(path: &str, value: &Value) -> Checked<DeclaredChannelSet> {
    let map = check_dict(path, value, "dict[str,str]")?;

    let mut result = DeclaredChannelSet::with_capacity(map.len());
    for (name, url) in map {
        let key = check_key(path, name)?;
        let url = check_type_str(&key, url)?;
        result.insert(name.clone(), url);
    }
    Ok(result)
}

pub fn check_type_dict_list_str(path: &str, value: &Value) -> Checked<DeclaredPackageSet> {
    let map = check_dict(path, value, "dict[str,list[str]]")?;

    let mut result = DeclaredPackageSet::with_capacity(map.len());
    for (channel, names) in map {
        let key = check_key(path, channel)?;
        let names = check_type_list_str(&key, names)?;
        result.insert(channel.clone(), names);
    }
    Ok(result)
}

fn check_dict<'a>(
    path: &str,
    value: &'a Value,
    expected: &'static str,
) -> Checked<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::wrong_type(path, expected, type_name(value)))
}

/// Mapping keys are channel names and must not be blank
fn check_key(path: &str, key: &str) -> Checked<String> {
    let full = format!("{}.{}", path, key);
    if key.trim().is_empty() {
        return Err(ValidationError::Empty(full));
    }
    Ok(full)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
