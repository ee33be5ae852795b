//! 服务容器启动构建器

use crate::infrastructure::ServiceInfrastructure;
use crate::sections::{parameters_contract, services_contract, PARAMETERS_SECTION, SERVICES_SECTION};
use config_abstractions::{DataResolver, FieldContract, ModuleSource, ModulesTree, SectionProcessor};
use config_impl::{load_modules, DataResolverImpl, FileModuleSource, InlineModuleSource, SectionProcessorImpl};
use di_abstractions::{ClassesRegistry, ContainerConfig, InterfacesRegistry, ServicesContainer};
use di_impl::{ReferenceResolverImpl, ServicesContainerImpl};
use infrastructure_common::InfrastructureError;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 服务容器启动构建器
///
/// 使用建造者模式收集模块来源、类与接口，构建填充完毕的服务容器
pub struct ContainerBootstrapper {
    /// 模块来源列表
    sources: Vec<Box<dyn ModuleSource>>,
    /// 当前环境，用于读取 `name/environment` 配置节
    environment: String,
    /// 额外处理的配置节
    sections: Vec<(String, FieldContract)>,
    /// 可实例化的类
    classes: ClassesRegistry,
    /// 接口定义
    interfaces: InterfacesRegistry,
    /// 容器配置
    container_config: ContainerConfig,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
}

impl ContainerBootstrapper {
    /// 创建新的启动构建器
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            environment: String::new(),
            sections: Vec::new(),
            classes: ClassesRegistry::new(),
            interfaces: InterfacesRegistry::new(),
            container_config: ContainerConfig::default(),
            logging_enabled: false, // 默认不启用日志初始化
            logging_config: LoggingConfig::default(),
        }
    }

    /// 添加应用层级的模块配置文件
    pub fn add_module_file<P: AsRef<Path>>(self, path: P) -> Result<Self, InfrastructureError> {
        self.add_module_file_at(path, config_abstractions::APPLICATION_LEVEL)
    }

    /// 添加指定层级的模块配置文件
    pub fn add_module_file_at<P: AsRef<Path>>(
        mut self,
        path: P,
        level: usize,
    ) -> Result<Self, InfrastructureError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InfrastructureError::BootstrapFailed {
                message: format!("配置文件不存在: {}", path.display()),
            });
        }

        info!("添加模块配置文件: {}，层级: {}", path.display(), level);
        self.sources
            .push(Box::new(FileModuleSource::new(path).with_level(level)));
        Ok(self)
    }

    /// 添加内存中的模块配置
    pub fn add_inline_module(mut self, id: impl Into<String>, config: Value, level: usize) -> Self {
        let source = InlineModuleSource::new(id, config).with_level(level);
        debug!("添加内存模块: {}", source.name());
        self.sources.push(Box::new(source));
        self
    }

    /// 添加自定义模块来源
    pub fn add_module_source<T: ModuleSource + 'static>(mut self, source: T) -> Self {
        info!("添加自定义模块来源: {}", source.name());
        self.sources.push(Box::new(source));
        self
    }

    /// 设置环境
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// 额外处理一个配置节，结果放入引用上下文 `$name$`
    pub fn add_section(mut self, name: impl Into<String>, contract: FieldContract) -> Self {
        self.sections.push((name.into(), contract));
        self
    }

    /// 设置可实例化的类
    pub fn with_classes(mut self, classes: ClassesRegistry) -> Self {
        self.classes = classes;
        self
    }

    /// 设置接口定义
    pub fn with_interfaces(mut self, interfaces: InterfacesRegistry) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// 设置容器配置
    pub fn with_container_config(mut self, config: ContainerConfig) -> Self {
        self.container_config = config;
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true;
        self
    }

    /// 构建基础设施实例
    pub async fn build(self) -> Result<ServiceInfrastructure, InfrastructureError> {
        // 只有在明确配置了日志时才初始化日志
        if self.logging_enabled {
            self.logging_config.init();
        }

        info!("开始构建服务容器，环境: {:?}", self.environment);

        let modules = load_modules(&self.sources).await?;
        let configuration = self.process_sections(&modules)?;

        let container = ServicesContainerImpl::with_config(
            self.container_config,
            Arc::new(ReferenceResolverImpl::with_default_types()),
            Arc::new(self.classes),
            Arc::new(self.interfaces),
        )
        .with_default_builders();

        let services = configuration
            .get(SERVICES_SECTION)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        container.process_configuration(&services, &configuration, true)?;

        let stats = container.stats();
        info!(
            "服务容器构建完成，定义: {}，标签: {}",
            stats.definitions, stats.tags
        );

        Ok(ServiceInfrastructure::new(
            Arc::new(container),
            configuration,
            modules,
            self.environment,
        ))
    }

    /// 合并所有配置节，生成完整的引用上下文
    fn process_sections(&self, modules: &ModulesTree) -> Result<Value, InfrastructureError> {
        let resolver: Arc<dyn DataResolver> = Arc::new(DataResolverImpl::new());
        let builtin = [
            (SERVICES_SECTION.to_string(), services_contract()),
            (PARAMETERS_SECTION.to_string(), parameters_contract()),
        ];

        let mut configuration = Map::new();
        for (name, contract) in builtin.iter().chain(self.sections.iter()) {
            let processor = SectionProcessorImpl::new(name.clone(), contract.clone(), resolver.clone());
            let section = processor.process(modules, &self.environment)?;
            debug!("配置节 {} 合并完成", processor.name());
            configuration.insert(name.clone(), section);
        }

        Ok(Value::Object(configuration))
    }
}

impl Default for ContainerBootstrapper {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContainerBootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBootstrapper")
            .field("sources", &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("environment", &self.environment)
            .field("classes", &self.classes.len())
            .field("container_config", &self.container_config)
            .finish_non_exhaustive()
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 初始化全局日志订阅者
    ///
    /// 已经存在全局订阅者时只记录一条调试日志。
    pub fn init(&self) {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(self.level)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_file(self.show_file)
            .with_line_number(self.show_line_number);

        let result = if self.json_format {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        };

        match result {
            Ok(()) => info!("日志系统初始化完成"),
            Err(e) => debug!("日志系统已初始化: {}", e),
        }
    }
}
