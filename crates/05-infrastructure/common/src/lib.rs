//! # Infrastructure Common
//!
//! 这个 crate 提供了服务容器基础设施层的公共错误类型和工具。
//!
//! ## 核心内容
//!
//! - [`ReferenceError`] - 引用解析错误
//! - [`DependencyError`] - 依赖注入错误
//! - [`ConfigError`] - 配置处理错误
//! - [`value`] - 配置值路径查找与合并工具
//!
//! ## 设计原则
//!
//! - 错误信息中包含服务标识和定义位置
//! - 所有错误都向调用方传播，不在内部吞掉

pub mod errors;
pub mod value;

pub use errors::*;
