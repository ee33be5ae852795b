//! 模块配置来源接口

use crate::Module;
use async_trait::async_trait;
use infrastructure_common::ConfigResult;

/// 模块配置来源 trait
///
/// 定义从文件或内存加载模块配置的统一接口
#[async_trait]
pub trait ModuleSource: Send + Sync {
    /// 加载模块
    async fn load(&self) -> ConfigResult<Module>;

    /// 来源名称
    fn name(&self) -> &str;

    /// 模块所在层级
    fn level(&self) -> usize {
        crate::APPLICATION_LEVEL
    }
}
