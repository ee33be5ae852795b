//! 服务类与类注册表
//!
//! 服务定义中的 `class` 字段通过 [`ClassesRegistry`] 查找到具体的构造函数。
//! 注册表作为显式对象传入容器，不使用全局单例。

use crate::property::Properties;
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 服务实例
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 服务构造函数
///
/// 属性在构造之前全部解析完成，构造函数只负责组装实例。
pub type Constructor = Arc<dyn Fn(&Properties) -> anyhow::Result<Instance> + Send + Sync>;

/// 服务类
#[derive(Clone)]
pub struct ServiceClass {
    name: String,
    is_abstract: bool,
    implements: Vec<String>,
    dependencies: IndexMap<String, String>,
    constructor: Option<Constructor>,
}

impl fmt::Debug for ServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClass")
            .field("name", &self.name)
            .field("is_abstract", &self.is_abstract)
            .field("implements", &self.implements)
            .field("dependencies", &self.dependencies)
            .field("constructor", &"<function>")
            .finish()
    }
}

impl ServiceClass {
    /// 创建具体类
    pub fn new<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&Properties) -> anyhow::Result<Instance> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            is_abstract: false,
            implements: Vec::new(),
            dependencies: IndexMap::new(),
            constructor: Some(Arc::new(constructor)),
        }
    }

    /// 创建抽象类，抽象类不能被实例化
    pub fn abstract_class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_abstract: true,
            implements: Vec::new(),
            dependencies: IndexMap::new(),
            constructor: None,
        }
    }

    /// 声明实现的接口
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.implements.push(interface.into());
        self
    }

    /// 声明属性依赖的接口，注入的每个服务都必须实现该接口
    pub fn depends_on(mut self, property: impl Into<String>, interface: impl Into<String>) -> Self {
        self.dependencies.insert(property.into(), interface.into());
        self
    }

    /// 类名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 是否为抽象类
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// 实现的接口
    pub fn implemented_interfaces(&self) -> &[String] {
        &self.implements
    }

    /// 属性依赖的接口
    pub fn dependencies(&self) -> &IndexMap<String, String> {
        &self.dependencies
    }

    /// 构造函数，抽象类没有构造函数
    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }
}

/// 类注册表
#[derive(Debug, Clone, Default)]
pub struct ClassesRegistry {
    classes: IndexMap<String, ServiceClass>,
}

impl ClassesRegistry {
    /// 创建空的类注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册类，同名类会被替换
    pub fn register(&mut self, class: ServiceClass) -> &mut Self {
        tracing::debug!("注册服务类: {}", class.name());
        self.classes.insert(class.name().to_string(), class);
        self
    }

    /// 以链式方式注册类
    pub fn with(mut self, class: ServiceClass) -> Self {
        self.register(class);
        self
    }

    /// 查找类
    pub fn get(&self, name: &str) -> Option<&ServiceClass> {
        self.classes.get(name)
    }

    /// 是否已注册
    pub fn has(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// 已注册类的数量
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// 清空注册表
    pub fn clear(&mut self) {
        self.classes.clear();
    }
}
