//! 配置值解析接口

use crate::FieldContract;
use infrastructure_common::ConfigResult;
use serde_json::Value;

/// 解析与合并时的附加选项
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// 正在处理的模块，用于错误信息
    pub module: Option<String>,
    /// 是否跳过默认值填充
    pub disable_default: bool,
}

impl ResolveOptions {
    /// 处理单个模块时的选项，不填充默认值
    pub fn for_module(module: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            disable_default: true,
        }
    }

    /// 启用默认值填充
    pub fn with_defaults(mut self) -> Self {
        self.disable_default = false;
        self
    }
}

/// 配置数据解析器 trait
///
/// 按契约验证配置值，并负责两份配置的合并。
pub trait DataResolver: Send + Sync {
    /// 按字段契约验证并规范化配置值
    ///
    /// `name` 为当前字段的完整路径，用于错误信息。
    fn resolve(
        &self,
        value: &Value,
        field: &FieldContract,
        name: &str,
        options: &ResolveOptions,
    ) -> ConfigResult<Value>;

    /// 合并两份配置
    ///
    /// `erase` 为真时冲突由第二份配置覆盖，否则冲突的标量值报错。
    fn merge(
        &self,
        value1: &Value,
        value2: &Value,
        field: &FieldContract,
        erase: bool,
        name: &str,
        options: &ResolveOptions,
    ) -> ConfigResult<Value>;
}
