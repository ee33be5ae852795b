//! 接口注册表
//!
//! 接口是一组能力的命名描述。类通过声明实现的接口参与注入时的能力检查，
//! 与具体类型无关。

use crate::class::ServiceClass;
use indexmap::IndexMap;
use infrastructure_common::DependencyError;
use std::collections::HashSet;

/// 接口描述
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interface {
    /// 接口名称
    pub name: String,
    /// 方法名称
    pub methods: Vec<String>,
    /// 父接口
    pub extends: Option<String>,
}

impl Interface {
    /// 创建接口描述
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
            extends: None,
        }
    }

    /// 添加方法
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.methods.push(method.into());
        self
    }

    /// 设置父接口
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }
}

/// 接口注册表
#[derive(Debug, Clone, Default)]
pub struct InterfacesRegistry {
    interfaces: IndexMap<String, Interface>,
}

impl InterfacesRegistry {
    /// 创建空的接口注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 索引接口，同名接口会被替换
    pub fn index(&mut self, interface: Interface) -> &mut Self {
        tracing::debug!("索引接口: {}", interface.name);
        self.interfaces.insert(interface.name.clone(), interface);
        self
    }

    /// 以链式方式索引接口
    pub fn with(mut self, interface: Interface) -> Self {
        self.index(interface);
        self
    }

    /// 查找接口
    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.interfaces.get(name)
    }

    /// 是否已索引
    pub fn has(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    /// 校验类声明的接口都已索引
    pub fn validate_class(&self, class: &ServiceClass) -> Result<(), DependencyError> {
        class
            .implemented_interfaces()
            .iter()
            .chain(class.dependencies().values())
            .find(|interface| !self.has(interface))
            .map_or(Ok(()), |interface| {
                Err(DependencyError::InterfaceNotRegistered {
                    class: class.name().to_string(),
                    interface: interface.clone(),
                })
            })
    }

    /// 判断类是否实现接口（包括通过父接口继承的实现）
    pub fn class_implements(&self, class: &ServiceClass, interface: &str) -> bool {
        class
            .implemented_interfaces()
            .iter()
            .any(|implemented| self.extends(implemented, interface))
    }

    /// 判断接口 `name` 是否等于或继承自 `ancestor`
    fn extends(&self, name: &str, ancestor: &str) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(name);

        while let Some(interface) = current {
            if interface == ancestor {
                return true;
            }
            if !visited.insert(interface) {
                return false;
            }
            current = self
                .interfaces
                .get(interface)
                .and_then(|i| i.extends.as_deref());
        }

        false
    }
}
