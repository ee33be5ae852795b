//! 服务定义
//!
//! 服务定义由声明式配置解析而来，经过构建阶段展开后再被容器实例化。

use indexmap::IndexMap;
use infrastructure_common::DependencyError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// 定义声明时所在的配置上下文
///
/// `%` 引用在 `parameters` 中查找，`$` 引用在整个配置中查找。
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigContext {
    /// 完整配置
    pub config: Value,
    /// 参数配置
    pub parameters: Value,
}

impl ConfigContext {
    /// 从完整配置创建上下文，参数取自 `parameters` 字段
    pub fn new(config: Value) -> Self {
        let parameters = config
            .get("parameters")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        Self { config, parameters }
    }
}

impl Default for ConfigContext {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

/// 工厂定义
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactoryDefinition {
    /// 通过该工厂构建时追加的属性
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// 服务定义
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceDefinition {
    /// 服务标识
    #[serde(skip)]
    pub id: String,
    /// 类名或解析为类名的引用
    #[serde(default)]
    pub class: Option<String>,
    /// 是否为抽象服务
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// 父服务标识
    #[serde(default)]
    pub parent: Option<String>,
    /// 子服务的部分定义
    #[serde(default)]
    pub children: IndexMap<String, Value>,
    /// 属性
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// 按调用方区分的工厂
    #[serde(default)]
    pub factories: IndexMap<String, FactoryDefinition>,
    /// 衍生数据（引用字符串或内联映射）
    #[serde(default)]
    pub declinations: Option<Value>,
    /// 标签
    #[serde(default)]
    pub tags: Vec<String>,
    /// 别名目标
    #[serde(default)]
    pub alias: Option<String>,

    /// 是否为模板（声明了子服务或衍生的定义）
    #[serde(skip)]
    pub template: bool,
    /// 衍生实例的上下文（`@` 引用）
    #[serde(skip)]
    pub context: Option<Value>,
    /// 声明时的配置上下文
    #[serde(skip)]
    pub origin: Arc<ConfigContext>,
    /// 属性阶段解析出的注入计划
    #[serde(skip)]
    pub injections: IndexMap<String, Injection>,
}

impl ServiceDefinition {
    /// 从原始配置解析服务定义
    pub fn from_value(
        id: impl Into<String>,
        value: &Value,
        origin: Arc<ConfigContext>,
    ) -> Result<Self, DependencyError> {
        let id = id.into();

        if !value.is_object() {
            return Err(DependencyError::invalid_definition(
                &id,
                format!(
                    "expected an object, got {}",
                    infrastructure_common::value::type_name(value)
                ),
            ));
        }

        let mut definition: Self = serde_json::from_value(value.clone())
            .map_err(|e| DependencyError::invalid_definition(&id, e.to_string()))?;
        definition.id = id;
        definition.origin = origin;

        Ok(definition)
    }

    /// 是否可以直接实例化
    pub fn is_instantiable(&self) -> bool {
        !self.is_abstract && !self.template && self.alias.is_none()
    }

    /// 用于错误信息的定义描述
    pub fn label(&self) -> String {
        format!("the definition of the service \"{}\"", self.id)
    }

    /// `@` 引用上下文，没有衍生上下文时为空对象
    pub fn context_value(&self) -> Value {
        self.context
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

/// 工厂调用计划
#[derive(Debug, Clone, PartialEq)]
pub struct FactoryCall {
    /// 目标服务标识
    pub target: String,
    /// 调用方名称
    pub caller: String,
    /// 调用方提供的上下文
    pub context: Value,
    /// 工厂阶段展开后的属性，未展开时为 `None`
    pub properties: Option<IndexMap<String, Injection>>,
}

/// 属性注入计划
///
/// 服务引用和标签引用在这里只记录标识，实例化时才转换为实时代理。
#[derive(Debug, Clone, PartialEq)]
pub enum Injection {
    /// 普通数据
    Data(Value),
    /// 服务引用 `#id#`
    Service(String),
    /// 标签引用 `&tag&`
    Tag(String),
    /// 工厂引用 `>target>caller>context>`
    Factory(FactoryCall),
    /// 列表
    List(Vec<Injection>),
    /// 映射
    Map(IndexMap<String, Injection>),
}

impl Injection {
    /// 收集引用的服务标识（包括工厂属性中的引用）
    pub fn services(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.walk(&mut |injection| {
            if let Self::Service(id) = injection {
                ids.push(id.as_str());
            }
        });
        ids
    }

    /// 收集引用的标签（包括工厂属性中的引用）
    pub fn tags(&self) -> Vec<&str> {
        let mut tags = Vec::new();
        self.walk(&mut |injection| {
            if let Self::Tag(tag) = injection {
                tags.push(tag.as_str());
            }
        });
        tags
    }

    /// 收集工厂调用的目标服务标识
    pub fn factory_targets(&self) -> Vec<&str> {
        let mut targets = Vec::new();
        self.walk(&mut |injection| {
            if let Self::Factory(call) = injection {
                targets.push(call.target.as_str());
            }
        });
        targets
    }

    fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Self)) {
        visit(self);
        match self {
            Self::List(items) => items.iter().for_each(|item| item.walk(visit)),
            Self::Map(entries) => entries.values().for_each(|item| item.walk(visit)),
            Self::Factory(FactoryCall {
                properties: Some(properties),
                ..
            }) => properties.values().for_each(|item| item.walk(visit)),
            _ => {}
        }
    }
}
