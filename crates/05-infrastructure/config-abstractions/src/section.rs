//! 配置节处理接口

use crate::{FieldContract, ModulesTree};
use infrastructure_common::ConfigResult;
use serde_json::Value;

/// 配置节处理器 trait
///
/// 将模块树中同名配置节按层级和环境合并成一份配置。
pub trait SectionProcessor: Send + Sync {
    /// 配置节名称
    fn name(&self) -> &str;

    /// 配置节契约
    fn contract(&self) -> Option<&FieldContract>;

    /// 处理模块树中的配置节
    fn process(&self, modules: &ModulesTree, environment: &str) -> ConfigResult<Value>;
}
