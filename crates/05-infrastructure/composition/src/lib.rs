//! # 基础设施组合层
//!
//! 负责将模块配置加载、配置节合并与服务容器组合成一个可以直接使用的整体。
//!
//! ## 主要功能
//!
//! - **启动构建器**: 使用构建者模式收集模块来源、类和接口
//! - **配置节合并**: 按层级和环境合并 `services`、`parameters` 及自定义配置节
//! - **容器填充**: 以合并后的完整配置作为引用上下文处理服务定义
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use di_abstractions::{ClassesRegistry, InterfacesRegistry};
//! use infrastructure_composition::{ContainerBootstrapper, LoggingConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let infrastructure = ContainerBootstrapper::new()
//!         .with_logging(LoggingConfig::development())
//!         .with_environment("prod")
//!         .add_module_file("./config/app.json")?
//!         .with_classes(ClassesRegistry::new())
//!         .with_interfaces(InterfacesRegistry::new())
//!         .build()
//!         .await?;
//!
//!     let manager = infrastructure.get("manager")?;
//!     println!("定义数量: {}", infrastructure.stats().definitions);
//!     drop(manager);
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod infrastructure;
pub mod sections;

#[cfg(test)]
mod tests;

// 重新导出主要类型
pub use builder::{ContainerBootstrapper, LoggingConfig};
pub use infrastructure::ServiceInfrastructure;
pub use sections::{definition_contract, parameters_contract, services_contract};

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;
