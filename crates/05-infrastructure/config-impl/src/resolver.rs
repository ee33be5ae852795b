//! 配置值验证与合并实现

use config_abstractions::{Contract, DataResolver, FieldContract, FieldType, ResolveOptions};
use infrastructure_common::value::type_name;
use infrastructure_common::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// 基于契约的配置数据解析器
#[derive(Debug, Default, Clone)]
pub struct DataResolverImpl;

impl DataResolverImpl {
    /// 创建解析器
    pub fn new() -> Self {
        Self
    }

    fn resolve_embedded(
        &self,
        value: &Value,
        contract: &Contract,
        name: &str,
        options: &ResolveOptions,
    ) -> ConfigResult<Value> {
        let Value::Object(map) = value else {
            return Err(type_mismatch(name, "object", value));
        };

        let mut resolved = Map::new();
        for (key, entry) in map {
            let field_name = child_name(name, key);
            let Some(field) = contract.get(key) else {
                return Err(ConfigError::validation(format!(
                    "The field \"{field_name}\" is not defined."
                )));
            };

            let entry = if entry.is_null() {
                Value::Null
            } else {
                self.resolve(entry, field, &field_name, options)?
            };
            resolved.insert(key.clone(), entry);
        }

        if !options.disable_default {
            for (key, field) in contract.fields() {
                if resolved.get(key).is_some_and(|value| !value.is_null()) {
                    continue;
                }
                match &field.default {
                    Some(default) => {
                        resolved.insert(key.to_string(), default.clone());
                    }
                    None if field.required => {
                        return Err(ConfigError::validation(format!(
                            "The field \"{}\" is required.",
                            child_name(name, key)
                        )));
                    }
                    None => {}
                }
            }
        }

        Ok(Value::Object(resolved))
    }

    fn merge_values(
        &self,
        value1: &Value,
        value2: &Value,
        field: &FieldContract,
        erase: bool,
        name: &str,
        options: &ResolveOptions,
    ) -> ConfigResult<Value> {
        match (value1, value2) {
            (Value::Null, other) | (other, Value::Null) => Ok(other.clone()),
            (Value::Object(first), Value::Object(second)) => {
                let mut merged = first.clone();
                for (key, value) in second {
                    let next = match first.get(key) {
                        Some(existing) => self.merge_values(
                            existing,
                            value,
                            &entry_field(field, key),
                            erase,
                            &child_name(name, key),
                            options,
                        )?,
                        None => value.clone(),
                    };
                    merged.insert(key.clone(), next);
                }
                Ok(Value::Object(merged))
            }
            (Value::Array(first), Value::Array(second)) if !erase => {
                let mut merged = first.clone();
                for item in second {
                    if !merged.contains(item) {
                        merged.push(item.clone());
                    }
                }
                Ok(Value::Array(merged))
            }
            (_, second) if erase => Ok(second.clone()),
            (first, second) if first == second => Ok(first.clone()),
            _ => Err(ConfigError::MergeConflict {
                field: name.to_string(),
                module: options
                    .module
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            }),
        }
    }
}

impl DataResolver for DataResolverImpl {
    fn resolve(
        &self,
        value: &Value,
        field: &FieldContract,
        name: &str,
        options: &ResolveOptions,
    ) -> ConfigResult<Value> {
        match &field.field_type {
            FieldType::Mixed => Ok(value.clone()),
            FieldType::String { pattern } => match value {
                Value::String(text) => match pattern {
                    Some(pattern) if !pattern.is_match(text) => {
                        Err(ConfigError::validation(format!(
                            "The expected value for \"{name}\" is a \"string\" matching \"{}\"; \"{text}\" given instead.",
                            pattern.as_str()
                        )))
                    }
                    _ => Ok(value.clone()),
                },
                other => Err(type_mismatch(name, "string", other)),
            },
            FieldType::Number if value.is_number() => Ok(value.clone()),
            FieldType::Boolean if value.is_boolean() => Ok(value.clone()),
            FieldType::Object if value.is_object() => Ok(value.clone()),
            FieldType::Array if value.is_array() => Ok(value.clone()),
            FieldType::Number | FieldType::Boolean | FieldType::Object | FieldType::Array => {
                Err(type_mismatch(name, field.field_type.name(), value))
            }
            FieldType::Embedded(contract) => self.resolve_embedded(value, contract, name, options),
            FieldType::EmbeddedMap(contract) => {
                let Value::Object(map) = value else {
                    return Err(type_mismatch(name, "object", value));
                };

                map.iter()
                    .map(|(key, entry)| {
                        let entry =
                            self.resolve_embedded(entry, contract, &child_name(name, key), options)?;
                        Ok((key.clone(), entry))
                    })
                    .collect::<ConfigResult<Map<_, _>>>()
                    .map(Value::Object)
            }
        }
    }

    fn merge(
        &self,
        value1: &Value,
        value2: &Value,
        field: &FieldContract,
        erase: bool,
        name: &str,
        options: &ResolveOptions,
    ) -> ConfigResult<Value> {
        let merged = self.merge_values(value1, value2, field, erase, name, options)?;

        if options.disable_default {
            Ok(merged)
        } else {
            self.resolve(&merged, field, name, options)
        }
    }
}

/// 对象字段中某个键对应的契约，未声明的键按任意值处理
fn entry_field<'a>(field: &'a FieldContract, key: &str) -> Cow<'a, FieldContract> {
    match &field.field_type {
        FieldType::Embedded(contract) => contract
            .get(key)
            .map_or_else(|| Cow::Owned(FieldContract::mixed()), Cow::Borrowed),
        FieldType::EmbeddedMap(contract) => Cow::Owned(FieldContract::embedded(contract.clone())),
        _ => Cow::Owned(FieldContract::mixed()),
    }
}

fn child_name(name: &str, key: &str) -> String {
    if name.is_empty() {
        key.to_string()
    } else {
        format!("{name}.{key}")
    }
}

fn type_mismatch(name: &str, expected: &str, value: &Value) -> ConfigError {
    ConfigError::validation(format!(
        "The expected value for \"{name}\" is a \"{expected}\"; \"{}\" given instead.",
        type_name(value)
    ))
}
