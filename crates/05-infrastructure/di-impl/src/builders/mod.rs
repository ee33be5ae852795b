//! 内置构建阶段
//!
//! 每个构建器负责一个 [`BuildStage`]，容器按阶段顺序依次执行。

mod abstract_builder;
mod alias;
mod children;
mod class;
mod declinations;
mod factories;
mod parent;
mod properties;
mod tags;

pub use abstract_builder::AbstractBuilder;
pub use alias::AliasBuilder;
pub use children::ChildrenBuilder;
pub use class::ClassBuilder;
pub use declinations::DeclinationsBuilder;
pub use factories::FactoriesBuilder;
pub use parent::ParentBuilder;
pub use properties::PropertiesBuilder;
pub use tags::TagsBuilder;

use di_abstractions::{
    FactoryCall, Injection, ReferenceResolver, ServiceBuilder, ServiceDefinition,
    CONFIG_REFERENCE, CONTEXT_REFERENCE, FACTORY_REFERENCE, PARAMETER_REFERENCE,
    SERVICE_REFERENCE, TAG_REFERENCE,
};
use indexmap::IndexMap;
use infrastructure_common::value::{deep_merge_maps, type_name};
use infrastructure_common::{DependencyError, ReferenceError};
use serde_json::{Map, Value};

/// 全部内置构建器
pub fn default_builders() -> Vec<Box<dyn ServiceBuilder>> {
    vec![
        Box::new(AbstractBuilder),
        Box::new(ParentBuilder),
        Box::new(ChildrenBuilder),
        Box::new(DeclinationsBuilder),
        Box::new(ClassBuilder),
        Box::new(PropertiesBuilder),
        Box::new(FactoriesBuilder),
        Box::new(TagsBuilder),
        Box::new(AliasBuilder),
    ]
}

/// 可在解析阶段查找的上下文
pub(crate) struct Lookup<'a> {
    pub parameters: &'a Value,
    pub context: &'a Value,
    pub config: &'a Value,
}

impl<'a> Lookup<'a> {
    /// 引用类型对应的查找上下文
    pub fn for_type(&self, name: &str) -> Option<&'a Value> {
        match name {
            PARAMETER_REFERENCE => Some(self.parameters),
            CONTEXT_REFERENCE => Some(self.context),
            CONFIG_REFERENCE => Some(self.config),
            _ => None,
        }
    }
}

/// 按注册顺序解析可查找的引用类型
///
/// 对象和数组递归处理；多重化产生的字符串数组在后续类型中逐个元素解析。
pub(crate) fn resolve_lookups(
    value: &Value,
    resolver: &dyn ReferenceResolver,
    lookup: &Lookup<'_>,
    label: &str,
) -> Result<Value, ReferenceError> {
    match value {
        Value::String(source) => {
            let mut current = Value::String(source.clone());
            for reference_type in resolver.reference_types() {
                let Some(context) = lookup.for_type(reference_type.name()) else {
                    continue;
                };
                current = resolve_strings(&current, |s| {
                    resolver.resolve(s, reference_type.name(), context, label)
                })?;
            }
            Ok(current)
        }
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_lookups(item, resolver, lookup, label))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(key, item)| Ok((key.clone(), resolve_lookups(item, resolver, lookup, label)?)))
            .collect::<Result<Map<_, _>, ReferenceError>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

fn resolve_strings<F>(value: &Value, resolve: F) -> Result<Value, ReferenceError>
where
    F: Fn(&str) -> Result<Value, ReferenceError>,
{
    match value {
        Value::String(source) => resolve(source),
        Value::Array(items) if items.iter().all(Value::is_string) => items
            .iter()
            .map(|item| match item {
                Value::String(source) => resolve(source),
                other => Ok(other.clone()),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

/// 将已解析的值转换为注入计划
///
/// 只包含数据的列表和映射折叠为 [`Injection::Data`]。
pub(crate) fn to_injection(
    value: &Value,
    resolver: &dyn ReferenceResolver,
    lookup: &Lookup<'_>,
    label: &str,
) -> Result<Injection, ReferenceError> {
    match value {
        Value::String(source) => string_injection(source, resolver, lookup, label),
        Value::Array(items) => {
            let injections = items
                .iter()
                .map(|item| to_injection(item, resolver, lookup, label))
                .collect::<Result<Vec<_>, _>>()?;

            if injections.iter().all(|i| matches!(i, Injection::Data(_))) {
                Ok(Injection::Data(value.clone()))
            } else {
                Ok(Injection::List(injections))
            }
        }
        Value::Object(map) => {
            let injections = map
                .iter()
                .map(|(key, item)| Ok((key.clone(), to_injection(item, resolver, lookup, label)?)))
                .collect::<Result<IndexMap<_, _>, ReferenceError>>()?;

            if injections.values().all(|i| matches!(i, Injection::Data(_))) {
                Ok(Injection::Data(value.clone()))
            } else {
                Ok(Injection::Map(injections))
            }
        }
        other => Ok(Injection::Data(other.clone())),
    }
}

fn string_injection(
    source: &str,
    resolver: &dyn ReferenceResolver,
    lookup: &Lookup<'_>,
    label: &str,
) -> Result<Injection, ReferenceError> {
    for reference_type in resolver.reference_types() {
        if lookup.for_type(reference_type.name()).is_some() {
            continue;
        }
        let Some(mut parts) = resolver.extract(source, reference_type.name(), label)? else {
            continue;
        };

        match reference_type.name() {
            SERVICE_REFERENCE => return Ok(Injection::Service(parts.remove(0))),
            TAG_REFERENCE => return Ok(Injection::Tag(parts.remove(0))),
            FACTORY_REFERENCE if parts.len() == 3 => {
                let context_source = parts.pop().unwrap_or_default();
                let caller = parts.pop().unwrap_or_default();
                let target = parts.pop().unwrap_or_default();

                let context = if context_source.trim().is_empty() {
                    Value::Object(Map::new())
                } else {
                    resolve_lookups(&Value::String(context_source), resolver, lookup, label)?
                };

                return Ok(Injection::Factory(FactoryCall {
                    target,
                    caller,
                    context,
                    properties: None,
                }));
            }
            _ => {}
        }
    }

    Ok(Injection::Data(Value::String(source.to_string())))
}

/// 解析属性值：先查找引用，再转换为注入计划
pub(crate) fn resolve_property(
    value: &Value,
    resolver: &dyn ReferenceResolver,
    lookup: &Lookup<'_>,
    label: &str,
) -> Result<Injection, ReferenceError> {
    let resolved = resolve_lookups(value, resolver, lookup, label)?;
    to_injection(&resolved, resolver, lookup, label)
}

/// 解析必须得到字符串的字段（类名、别名）
pub(crate) fn resolve_string(
    definition: &ServiceDefinition,
    field: &str,
    source: &str,
    resolver: &dyn ReferenceResolver,
) -> Result<String, DependencyError> {
    let context = definition.context_value();
    let lookup = Lookup {
        parameters: &definition.origin.parameters,
        context: &context,
        config: &definition.origin.config,
    };

    match resolve_lookups(&Value::String(source.to_string()), resolver, &lookup, &definition.label())? {
        Value::String(resolved) => Ok(resolved),
        other => Err(DependencyError::invalid_definition(
            &definition.id,
            format!("the field \"{field}\" must resolve to a string, got {}", type_name(&other)),
        )),
    }
}

/// 继承方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Inherit {
    /// 通过 `parent` 声明的父定义
    Parent,
    /// 声明子定义的容器定义
    Container,
}

/// 将父定义合并到子定义，子定义的值优先
///
/// 属性和工厂深度合并，标签取并集（父定义在前），类和衍生数据仅在子定义
/// 未声明时继承。子定义、抽象标记和别名不继承。
pub(crate) fn inherit(child: &mut ServiceDefinition, parent: &ServiceDefinition, mode: Inherit) {
    if child.class.is_none() {
        child.class = parent.class.clone();
    }

    child.properties = deep_merge_maps(&parent.properties, &child.properties);

    let mut factories = parent.factories.clone();
    for (caller, factory) in &child.factories {
        let merged = match factories.get(caller) {
            Some(inherited) => deep_merge_maps(&inherited.properties, &factory.properties),
            None => factory.properties.clone(),
        };
        factories.entry(caller.clone()).or_default().properties = merged;
    }
    child.factories = factories;

    let mut tags = parent.tags.clone();
    for tag in &child.tags {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    child.tags = tags;

    if mode == Inherit::Parent && child.declinations.is_none() {
        child.declinations = parent.declinations.clone();
    }
}
