//! 基础设施主入口

use crate::builder::ContainerBootstrapper;
use config_abstractions::ModulesTree;
use di_abstractions::{ContainerStats, Instance, ServicesContainer};
use di_impl::ServicesContainerImpl;
use infrastructure_common::value::lookup_path;
use infrastructure_common::DependencyError;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// 服务基础设施
///
/// 持有填充完毕的服务容器和合并后的完整配置
#[derive(Debug, Clone)]
pub struct ServiceInfrastructure {
    /// 服务容器
    container: Arc<ServicesContainerImpl>,
    /// 合并后的完整配置
    configuration: Value,
    /// 加载的模块
    modules: ModulesTree,
    /// 当前环境
    environment: String,
}

impl ServiceInfrastructure {
    /// 创建启动构建器
    pub fn builder() -> ContainerBootstrapper {
        ContainerBootstrapper::new()
    }

    pub(crate) fn new(
        container: Arc<ServicesContainerImpl>,
        configuration: Value,
        modules: ModulesTree,
        environment: String,
    ) -> Self {
        Self {
            container,
            configuration,
            modules,
            environment,
        }
    }

    /// 服务容器
    pub fn container(&self) -> &Arc<ServicesContainerImpl> {
        &self.container
    }

    /// 获取服务实例
    pub fn get(&self, id: &str) -> Result<Instance, DependencyError> {
        self.container.get(id)
    }

    /// 获取服务实例并转换为具体类型
    pub fn get_as<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>, DependencyError> {
        self.container.get_as(id)
    }

    /// 合并后的完整配置
    pub fn configuration(&self) -> &Value {
        &self.configuration
    }

    /// 按点分路径读取参数
    pub fn parameter(&self, path: &str) -> Option<Value> {
        self.configuration
            .get(crate::sections::PARAMETERS_SECTION)
            .and_then(|parameters| lookup_path(parameters, path))
    }

    /// 加载的模块
    pub fn modules(&self) -> &ModulesTree {
        &self.modules
    }

    /// 当前环境
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// 容器统计信息
    pub fn stats(&self) -> ContainerStats {
        self.container.stats()
    }
}
