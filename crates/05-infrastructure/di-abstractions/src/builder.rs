//! 服务构建阶段抽象接口
//!
//! 容器在处理配置时按固定顺序执行各个构建阶段，每个阶段处理完全部定义后
//! 下一个阶段才开始。

use crate::class::ClassesRegistry;
use crate::definition::ServiceDefinition;
use crate::interface::InterfacesRegistry;
use crate::reference::ReferenceResolver;
use indexmap::IndexMap;
use infrastructure_common::DependencyError;

/// 构建阶段，声明顺序即执行顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildStage {
    /// 标记抽象与模板定义
    Abstract,
    /// 合并父定义
    Parent,
    /// 展开子定义
    Children,
    /// 展开衍生定义
    Declinations,
    /// 解析类
    Class,
    /// 解析属性
    Properties,
    /// 展开工厂调用
    Factories,
    /// 建立标签索引
    Tags,
    /// 解析别名
    Alias,
}

/// 构建上下文
pub struct BuildContext<'a> {
    /// 引用解析器
    pub resolver: &'a dyn ReferenceResolver,
    /// 类注册表
    pub classes: &'a ClassesRegistry,
    /// 接口注册表
    pub interfaces: &'a InterfacesRegistry,
    /// 是否为最终处理（执行跨定义校验）
    pub is_final: bool,
}

/// 定义集合
///
/// 保持注册顺序，标签索引也按注册顺序排列。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionSet {
    definitions: IndexMap<String, ServiceDefinition>,
    tags: IndexMap<String, Vec<String>>,
}

impl DefinitionSet {
    /// 创建空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入定义，已存在的同名定义会被替换
    pub fn insert(&mut self, definition: ServiceDefinition) {
        self.definitions.insert(definition.id.clone(), definition);
    }

    /// 获取定义
    pub fn get(&self, id: &str) -> Option<&ServiceDefinition> {
        self.definitions.get(id)
    }

    /// 获取可变定义
    pub fn get_mut(&mut self, id: &str) -> Option<&mut ServiceDefinition> {
        self.definitions.get_mut(id)
    }

    /// 是否包含定义
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// 按注册顺序列出标识
    pub fn ids(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }

    /// 按注册顺序遍历定义
    pub fn iter(&self) -> impl Iterator<Item = &ServiceDefinition> {
        self.definitions.values()
    }

    /// 按注册顺序遍历可变定义
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ServiceDefinition> {
        self.definitions.values_mut()
    }

    /// 定义数量
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// 替换标签索引
    pub fn set_tags(&mut self, tags: IndexMap<String, Vec<String>>) {
        self.tags = tags;
    }

    /// 标签索引
    pub fn tags(&self) -> &IndexMap<String, Vec<String>> {
        &self.tags
    }

    /// 带有指定标签的服务标识，没有成员时为空
    pub fn tagged(&self, tag: &str) -> &[String] {
        self.tags.get(tag).map_or(&[], Vec::as_slice)
    }

    /// 从标签索引中移除服务
    pub fn remove_from_tags(&mut self, id: &str) {
        for members in self.tags.values_mut() {
            members.retain(|member| member != id);
        }
    }
}

/// 服务构建器 trait
pub trait ServiceBuilder: Send + Sync {
    /// 构建器名称
    fn name(&self) -> &'static str;

    /// 所属构建阶段
    fn stage(&self) -> BuildStage;

    /// 处理全部定义
    fn process(
        &self,
        definitions: &mut DefinitionSet,
        context: &BuildContext<'_>,
    ) -> Result<(), DependencyError>;
}
