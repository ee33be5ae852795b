//! # 依赖注入具体实现
//!
//! 提供引用解析器、内置构建阶段和服务容器的具体实现。
//!
//! ```no_run
//! use di_abstractions::{ClassesRegistry, InterfacesRegistry, ServicesContainer};
//! use di_impl::{ReferenceResolverImpl, ServicesContainerImpl};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let container = ServicesContainerImpl::new(
//!     Arc::new(ReferenceResolverImpl::with_default_types()),
//!     Arc::new(ClassesRegistry::new()),
//!     Arc::new(InterfacesRegistry::new()),
//! )
//! .with_default_builders();
//!
//! container
//!     .process_configuration(&json!({}), &json!({}), true)
//!     .unwrap();
//! ```

pub mod builders;
pub mod container;
pub mod resolver;

pub use builders::default_builders;
pub use container::ServicesContainerImpl;
pub use resolver::ReferenceResolverImpl;
