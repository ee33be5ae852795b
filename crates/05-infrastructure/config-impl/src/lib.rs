//! # Configuration Implementation
//!
//! 配置处理的具体实现，负责模块配置的加载、验证与按层级合并。
//!
//! ## 主要组件
//!
//! - [`DataResolverImpl`] - 按契约验证与合并配置值
//! - [`SectionProcessorImpl`] - 按层级和环境合并配置节
//! - [`FileModuleSource`] - 从 JSON、TOML、YAML 文件加载模块
//! - [`InlineModuleSource`] - 内存中的模块配置

pub mod resolver;
pub mod section;
pub mod sources;

pub use resolver::*;
pub use section::*;
pub use sources::*;
