//! 构造阶段的属性值
//!
//! 服务引用以 [`ServiceProxy`] 的形式注入：代理只保存服务标识，每次访问时
//! 通过容器查找当前实例，因此容器中被替换的服务对已经构建的持有者立即可见。

use crate::class::Instance;
use indexmap::IndexMap;
use infrastructure_common::DependencyError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// 实例提供者
///
/// 由容器实现，代理通过它按标识取得当前实例。
pub trait InstanceProvider: Send + Sync {
    /// 获取服务实例
    fn provide(&self, id: &str) -> Result<Instance, DependencyError>;
}

/// 服务代理
#[derive(Clone)]
pub struct ServiceProxy {
    id: String,
    provider: Weak<dyn InstanceProvider>,
}

impl fmt::Debug for ServiceProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProxy").field("id", &self.id).finish()
    }
}

impl PartialEq for ServiceProxy {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.provider, &other.provider)
    }
}

impl ServiceProxy {
    /// 创建服务代理
    pub fn new(id: impl Into<String>, provider: Weak<dyn InstanceProvider>) -> Self {
        Self {
            id: id.into(),
            provider,
        }
    }

    /// 被代理的服务标识
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 获取当前实例
    pub fn get(&self) -> Result<Instance, DependencyError> {
        self.provider
            .upgrade()
            .ok_or(DependencyError::ContainerDropped)?
            .provide(&self.id)
    }

    /// 获取当前实例并转换为具体类型
    pub fn get_as<T: Any + Send + Sync>(&self) -> Result<Arc<T>, DependencyError> {
        self.get()?
            .downcast::<T>()
            .map_err(|_| DependencyError::TypeMismatch {
                id: self.id.clone(),
                expected: std::any::type_name::<T>().to_string(),
            })
    }
}

/// 属性值
#[derive(Debug, Clone)]
pub enum PropertyValue {
    /// 普通数据
    Data(Value),
    /// 服务代理
    Service(ServiceProxy),
    /// 工厂创建的实例
    Instance(Instance),
    /// 列表
    List(Vec<PropertyValue>),
    /// 映射
    Map(IndexMap<String, PropertyValue>),
}

impl PropertyValue {
    /// 普通数据
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data(value) => Some(value),
            _ => None,
        }
    }

    /// 收集所有服务代理（深度优先）
    pub fn services(&self) -> Vec<ServiceProxy> {
        match self {
            Self::Service(proxy) => vec![proxy.clone()],
            Self::List(items) => items.iter().flat_map(Self::services).collect(),
            Self::Map(entries) => entries.values().flat_map(Self::services).collect(),
            Self::Data(_) | Self::Instance(_) => Vec::new(),
        }
    }

    /// 收集所有工厂实例（深度优先）
    pub fn instances(&self) -> Vec<Instance> {
        match self {
            Self::Instance(instance) => vec![instance.clone()],
            Self::List(items) => items.iter().flat_map(Self::instances).collect(),
            Self::Map(entries) => entries.values().flat_map(Self::instances).collect(),
            Self::Data(_) | Self::Service(_) => Vec::new(),
        }
    }
}

/// 服务构造时可用的属性集合
#[derive(Debug, Clone, Default)]
pub struct Properties {
    id: String,
    values: IndexMap<String, PropertyValue>,
}

impl Properties {
    /// 创建属性集合
    pub fn new(id: impl Into<String>, values: IndexMap<String, PropertyValue>) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }

    /// 正在构建的服务标识
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 获取属性值
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// 是否包含属性
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// 属性名称
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// 普通数据属性
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(PropertyValue::as_data)
    }

    /// 字符串属性
    pub fn str(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }

    /// 反序列化数据属性
    pub fn deserialize<T: DeserializeOwned>(&self, name: &str) -> Result<T, DependencyError> {
        let value = self.value(name).cloned().unwrap_or(Value::Null);

        serde_json::from_value(value).map_err(|e| DependencyError::TypeMismatch {
            id: format!("{}.{}", self.id, name),
            expected: format!("{} ({e})", std::any::type_name::<T>()),
        })
    }

    /// 单个服务代理属性
    pub fn service(&self, name: &str) -> Option<&ServiceProxy> {
        match self.get(name) {
            Some(PropertyValue::Service(proxy)) => Some(proxy),
            _ => None,
        }
    }

    /// 属性中的全部服务代理
    pub fn services(&self, name: &str) -> Vec<ServiceProxy> {
        self.get(name).map(PropertyValue::services).unwrap_or_default()
    }

    /// 属性中的全部工厂实例
    pub fn instances(&self, name: &str) -> Vec<Instance> {
        self.get(name).map(PropertyValue::instances).unwrap_or_default()
    }

    /// 单个工厂实例属性并转换为具体类型
    pub fn instance_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        match self.get(name) {
            Some(PropertyValue::Instance(instance)) => instance.clone().downcast::<T>().ok(),
            _ => None,
        }
    }
}
