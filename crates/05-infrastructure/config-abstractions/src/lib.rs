//! # Configuration Abstractions
//!
//! 配置处理抽象层，定义模块配置的契约、模块树和配置节处理接口。
//!
//! ## 核心接口
//!
//! - [`Contract`] - 配置字段契约
//! - [`ModulesTree`] - 按层级组织的模块配置
//! - [`DataResolver`] - 配置值验证与合并接口
//! - [`SectionProcessor`] - 配置节处理接口
//! - [`ModuleSource`] - 模块配置来源接口

pub mod contract;
pub mod modules;
pub mod resolver;
pub mod section;
pub mod source;

pub use contract::*;
pub use modules::*;
pub use resolver::*;
pub use section::*;
pub use source::*;
