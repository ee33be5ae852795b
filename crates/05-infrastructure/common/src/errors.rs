//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("不支持的配置文件格式: {path}")]
    UnsupportedFormat { path: String },

    #[error("{message}")]
    ValidationError { message: String },

    #[error("The field \"{field}\" has conflicting values in the configuration of the module \"{module}\".")]
    MergeConflict { field: String, module: String },

    #[error("There is no defined contract for the field \"{section}\".")]
    MissingContract { section: String },

    #[error("配置键不存在: {key}")]
    KeyNotFound { key: String },

    #[error("{message} in the configuration of the module \"{module}\".")]
    InModule { message: String, module: String },
}

impl ConfigError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// 附加出错模块信息
    ///
    /// 已经带有模块信息的错误保持不变。
    pub fn in_module(self, module: impl Into<String>) -> Self {
        match self {
            Self::ValidationError { message } => Self::InModule {
                message: message.trim_end_matches('.').to_string(),
                module: module.into(),
            },
            other => other,
        }
    }
}

/// 引用解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("{}", unresolved_message(.references, .expression, .label))]
    Unresolved {
        /// 源字符串中出现的所有引用
        references: Vec<String>,
        /// 无法解析的引用
        unresolved: Vec<String>,
        /// 被解析的源字符串
        expression: String,
        label: String,
    },

    #[error("The reference \"{reference}\" in source \"{expression}\" declared in {label} cannot be concatenated with other text.")]
    Concatenation {
        reference: String,
        expression: String,
        label: String,
    },

    #[error("The reference \"{reference}\" declared in {label} targets the undefined service \"{id}\".")]
    UndefinedService {
        reference: String,
        id: String,
        label: String,
    },

    #[error("The reference type \"{name}\" is not registered.")]
    UndefinedType { name: String },

    #[error("The reference type \"{name}\" conflicts with the already registered type \"{existing}\".")]
    DuplicateType { name: String, existing: String },

    #[error("The reference type \"{name}\" is invalid: {message}")]
    InvalidType { name: String, message: String },
}

fn unresolved_message(references: &[String], expression: &str, label: &str) -> String {
    let quoted = references
        .iter()
        .map(|r| format!("\"{r}\""))
        .collect::<Vec<_>>()
        .join(", ");

    if references.len() == 1 {
        format!("The reference {quoted} in source \"{expression}\" declared in {label} cannot be resolved.")
    } else {
        format!(
            "One of the references {quoted} in source \"{expression}\" declared in {label} cannot be resolved."
        )
    }
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("The service \"{id}\" is not defined.")]
    ServiceNotFound { id: String },

    #[error("The circular dependency [{}] prevent to build the service \"{}\".", format_chain(.cycle), .cycle.first().map_or("", String::as_str))]
    CircularDependency { cycle: Vec<String> },

    #[error("The service of id \"{id}\" is an abstract service and cannot be instantiated.")]
    AbstractService { id: String },

    #[error("The service \"{id}\" could not be instantiated because its class \"{class}\" is an abstract class.")]
    AbstractClass { id: String, class: String },

    #[error("The service \"{id}\" could not be instantiated because it has no class.")]
    MissingClass { id: String },

    #[error("The class \"{class}\" of the service \"{id}\" is not registered.")]
    ClassNotRegistered { id: String, class: String },

    #[error("The interface \"{interface}\" used by the class \"{class}\" is not registered.")]
    InterfaceNotRegistered { class: String, interface: String },

    #[error("The service \"{target}\" injected in the property \"{property}\" of the service \"{id}\" does not implement the interface \"{interface}\".")]
    InterfaceNotImplemented {
        id: String,
        property: String,
        target: String,
        interface: String,
    },

    #[error("The service \"{target}\" defines no factory for \"{caller}\" (requested in {label}).")]
    FactoryNotDefined {
        target: String,
        caller: String,
        label: String,
    },

    #[error("The definition of the service \"{id}\" is invalid: {message}")]
    InvalidDefinition { id: String, message: String },

    #[error("The parent chain [{}] of the service \"{}\" is circular.", format_chain(.chain), .chain.first().map_or("", String::as_str))]
    ParentCycle { chain: Vec<String> },

    #[error("The instance of the service \"{id}\" is not a \"{expected}\".")]
    TypeMismatch { id: String, expected: String },

    #[error("The service \"{id}\" could not be instantiated: {source}")]
    ComponentCreationFailed {
        id: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("The resolution of the service \"{id}\" exceeds the maximum depth of {max_depth}.")]
    ResolutionDepthExceeded { id: String, max_depth: usize },

    #[error("The services container is no longer available.")]
    ContainerDropped,

    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

fn format_chain(chain: &[String]) -> String {
    chain
        .iter()
        .map(|id| format!("\"{id}\""))
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl DependencyError {
    /// 创建定义无效错误
    pub fn invalid_definition(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 配置处理结果
pub type ConfigResult<T> = Result<T, ConfigError>;
/// 引用解析结果
pub type ReferenceResult<T> = Result<T, ReferenceError>;
/// 依赖注入结果
pub type DependencyResult<T> = Result<T, DependencyError>;
/// 基础设施启动结果
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
