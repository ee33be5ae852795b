//! 配置契约定义
//!
//! 契约描述一个配置节中每个字段的类型、是否必填以及默认值。
//! 契约可以直接用构建器方法创建，也可以从 JSON 描述中解析。

use indexmap::IndexMap;
use infrastructure_common::{ConfigError, ConfigResult};
use regex::Regex;
use serde_json::Value;

/// 字段类型
#[derive(Debug, Clone)]
pub enum FieldType {
    /// 任意值
    Mixed,
    /// 字符串，可选的正则约束
    String { pattern: Option<Regex> },
    /// 数字
    Number,
    /// 布尔值
    Boolean,
    /// 任意对象
    Object,
    /// 任意数组
    Array,
    /// 满足内嵌契约的对象
    Embedded(Contract),
    /// 值为内嵌契约对象的映射
    EmbeddedMap(Contract),
}

impl FieldType {
    /// 类型名称，用于错误信息
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mixed => "mixed",
            Self::String { .. } => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Embedded(_) => "embedded",
            Self::EmbeddedMap(_) => "embedded_map",
        }
    }
}

/// 单个字段的契约
#[derive(Debug, Clone)]
pub struct FieldContract {
    pub field_type: FieldType,
    pub required: bool,
    pub default: Option<Value>,
}

impl FieldContract {
    /// 创建可选字段契约
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
        }
    }

    /// 任意类型
    pub fn mixed() -> Self {
        Self::new(FieldType::Mixed)
    }

    /// 字符串
    pub fn string() -> Self {
        Self::new(FieldType::String { pattern: None })
    }

    /// 数字
    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    /// 布尔值
    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    /// 任意对象
    pub fn object() -> Self {
        Self::new(FieldType::Object)
    }

    /// 数组
    pub fn array() -> Self {
        Self::new(FieldType::Array)
    }

    /// 按内嵌契约验证的对象
    pub fn embedded(contract: Contract) -> Self {
        Self::new(FieldType::Embedded(contract))
    }

    /// 每个值都按内嵌契约验证的对象
    pub fn embedded_map(contract: Contract) -> Self {
        Self::new(FieldType::EmbeddedMap(contract))
    }

    /// 标记为必填
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// 设置默认值
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// 为字符串字段设置正则约束
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        if let FieldType::String { pattern: slot } = &mut self.field_type {
            *slot = Some(pattern);
        }
        self
    }

    /// 从 JSON 描述解析字段契约
    ///
    /// 描述形如 `{"type": "string", "required": true, "default": "x", "pattern": "^a"}`，
    /// 内嵌类型通过 `embed` 给出内嵌契约的描述。
    pub fn from_value(name: &str, description: &Value) -> ConfigResult<Self> {
        let invalid = |message: &str| {
            ConfigError::validation(format!(
                "The contract of the field \"{name}\" is invalid: {message}."
            ))
        };

        let Value::Object(map) = description else {
            return Err(invalid("an object is expected"));
        };

        let type_name = match map.get("type") {
            Some(Value::String(type_name)) => type_name.as_str(),
            None => "mixed",
            Some(_) => return Err(invalid("the type must be a string")),
        };

        let embed = || -> ConfigResult<Contract> {
            map.get("embed")
                .map(Contract::from_value)
                .unwrap_or_else(|| Err(invalid("an embedded type needs an \"embed\" contract")))
        };

        let field_type = match type_name {
            "mixed" => FieldType::Mixed,
            "string" => {
                let pattern = match map.get("pattern") {
                    Some(Value::String(pattern)) => Some(
                        Regex::new(pattern).map_err(|error| invalid(&error.to_string()))?,
                    ),
                    Some(_) => return Err(invalid("the pattern must be a string")),
                    None => None,
                };
                FieldType::String { pattern }
            }
            "number" => FieldType::Number,
            "boolean" => FieldType::Boolean,
            "object" => FieldType::Object,
            "array" => FieldType::Array,
            "embedded" => FieldType::Embedded(embed()?),
            "embedded_map" | "embedded_object" => FieldType::EmbeddedMap(embed()?),
            other => return Err(invalid(&format!("the type \"{other}\" is unknown"))),
        };

        Ok(Self {
            field_type,
            required: map.get("required").and_then(Value::as_bool).unwrap_or(false),
            default: map.get("default").cloned(),
        })
    }
}

/// 配置节契约
///
/// 字段按声明顺序保存。
#[derive(Debug, Clone, Default)]
pub struct Contract {
    fields: IndexMap<String, FieldContract>,
}

impl Contract {
    /// 创建空契约
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加字段契约
    pub fn field(mut self, name: impl Into<String>, contract: FieldContract) -> Self {
        self.fields.insert(name.into(), contract);
        self
    }

    /// 按名称获取字段契约
    pub fn get(&self, name: &str) -> Option<&FieldContract> {
        self.fields.get(name)
    }

    /// 按声明顺序遍历字段
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldContract)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// 是否没有声明任何字段
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 从 JSON 描述解析契约
    pub fn from_value(description: &Value) -> ConfigResult<Self> {
        let Value::Object(map) = description else {
            return Err(ConfigError::validation(
                "A contract description must be an object.",
            ));
        };

        map.iter()
            .try_fold(Self::new(), |contract, (name, field)| {
                Ok(contract.field(name.clone(), FieldContract::from_value(name, field)?))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_contract() {
        let contract = Contract::new()
            .field("class", FieldContract::string().required())
            .field("tags", FieldContract::array().with_default(json!([])));

        let class = contract.get("class").unwrap();
        assert!(class.required);
        assert_eq!(class.field_type.name(), "string");
        assert_eq!(contract.get("tags").unwrap().default, Some(json!([])));
        assert_eq!(
            contract.fields().map(|(name, _)| name).collect::<Vec<_>>(),
            vec!["class", "tags"]
        );
    }

    #[test]
    fn test_contract_from_value() {
        let contract = Contract::from_value(&json!({
            "name": {"type": "string", "pattern": "^[a-z]+$", "required": true},
            "timeout": {"type": "number", "default": 2000},
            "storages": {
                "type": "embedded_map",
                "embed": {"path": {"type": "string"}}
            }
        }))
        .unwrap();

        match &contract.get("name").unwrap().field_type {
            FieldType::String { pattern: Some(pattern) } => assert!(pattern.is_match("abc")),
            other => panic!("unexpected type {other:?}"),
        }
        assert_eq!(contract.get("timeout").unwrap().default, Some(json!(2000)));
        match &contract.get("storages").unwrap().field_type {
            FieldType::EmbeddedMap(embedded) => assert!(embedded.get("path").is_some()),
            other => panic!("unexpected type {other:?}"),
        }
    }

    #[test]
    fn test_invalid_contract_description() {
        let error = Contract::from_value(&json!({"a": {"type": "date"}})).unwrap_err();

        assert_eq!(
            error.to_string(),
            "The contract of the field \"a\" is invalid: the type \"date\" is unknown."
        );
        assert!(Contract::from_value(&json!({"a": {"type": "embedded"}})).is_err());
    }
}
