//! 服务容器抽象接口
//!
//! 提供服务容器的核心抽象

use crate::builder::ServiceBuilder;
use crate::class::Instance;
use crate::definition::ServiceDefinition;
use infrastructure_common::DependencyError;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// 服务容器 trait
///
/// 构建过程是同步的深度优先遍历，`get` 返回前依赖已全部构建完成。
pub trait ServicesContainer: Send + Sync {
    /// 添加服务构建器
    fn add_service_builder(&self, builder: Box<dyn ServiceBuilder>);

    /// 处理服务配置
    ///
    /// `services` 为服务标识到定义的映射，`config` 为引用解析使用的完整配置。
    /// `is_final` 为真时执行跨定义校验（未定义引用、循环依赖）。
    fn process_configuration(
        &self,
        services: &Value,
        config: &Value,
        is_final: bool,
    ) -> Result<(), DependencyError>;

    /// 是否存在定义
    fn has_definition(&self, id: &str) -> bool;

    /// 按注册顺序列出全部定义标识
    fn definition_ids(&self) -> Vec<String>;

    /// 获取展开后的定义
    fn definition(&self, id: &str) -> Option<ServiceDefinition>;

    /// 是否已有实例（别名按目标判断）
    fn has(&self, id: &str) -> bool;

    /// 获取服务实例，必要时构建
    fn get(&self, id: &str) -> Result<Instance, DependencyError>;

    /// 直接设置服务实例
    fn set(&self, id: &str, instance: Instance);

    /// 移除服务实例
    fn unset(&self, id: &str) -> Result<(), DependencyError>;

    /// 带有指定标签的服务标识
    fn tagged(&self, tag: &str) -> Vec<String>;

    /// 容器统计信息
    fn stats(&self) -> ContainerStats;

    /// 获取服务实例并转换为具体类型
    fn get_as<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>, DependencyError>
    where
        Self: Sized,
    {
        self.get(id)?
            .downcast::<T>()
            .map_err(|_| DependencyError::TypeMismatch {
                id: id.to_string(),
                expected: std::any::type_name::<T>().to_string(),
            })
    }
}

/// 容器配置
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// 最终处理配置时是否执行静态循环依赖检测
    pub enable_circular_dependency_detection: bool,
    /// 最大解析深度
    pub max_resolution_depth: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            enable_circular_dependency_detection: true,
            max_resolution_depth: 100,
        }
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default)]
pub struct ContainerStats {
    /// 定义数量
    pub definitions: usize,
    /// 已缓存实例数量
    pub instances: usize,
    /// 标签数量
    pub tags: usize,
    /// 最近一次成功处理配置的时间
    pub last_processed_at: Option<chrono::DateTime<chrono::Utc>>,
}
