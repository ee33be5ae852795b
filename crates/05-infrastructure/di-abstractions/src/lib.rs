//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义服务定义、引用解析和构建阶段的核心接口。
//!
//! ## 核心接口
//!
//! - [`ReferenceResolver`] - 引用解析器接口
//! - [`ServiceBuilder`] - 构建阶段接口
//! - [`ServicesContainer`] - 服务容器接口
//! - [`CircularDependencyDetector`] - 循环依赖检测器
//! - [`ClassesRegistry`] / [`InterfacesRegistry`] - 显式传入容器的注册表

pub mod builder;
pub mod class;
pub mod container;
pub mod definition;
pub mod graph;
pub mod interface;
pub mod property;
pub mod reference;

pub use builder::*;
pub use class::*;
pub use container::*;
pub use definition::*;
pub use graph::*;
pub use interface::*;
pub use property::*;
pub use reference::*;
