//! 模块配置来源实现

use async_trait::async_trait;
use config_abstractions::{Module, ModuleSource, ModulesTree, APPLICATION_LEVEL};
use infrastructure_common::{ConfigError, ConfigResult};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Yaml,
}

impl FileFormat {
    /// 根据扩展名识别格式
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }

    /// 解析文件内容
    pub fn parse(self, content: &str) -> ConfigResult<Value> {
        match self {
            Self::Json => serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
                source: Box::new(e),
            }),
            Self::Toml => toml::from_str::<toml::Value>(content)
                .map(|value| toml_to_json(&value))
                .map_err(|e| ConfigError::ParseError {
                    source: Box::new(e),
                }),
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
                source: Box::new(e),
            }),
        }
    }
}

/// 文件模块来源
///
/// 模块标识默认取文件名（不含扩展名）。
#[derive(Debug, Clone)]
pub struct FileModuleSource {
    path: PathBuf,
    id: String,
    level: usize,
}

impl FileModuleSource {
    /// 以文件名（不含扩展名）作为模块标识创建来源
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_string();

        Self {
            path,
            id,
            level: APPLICATION_LEVEL,
        }
    }

    /// 设置模块标识
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// 设置模块层级
    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    /// 配置文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ModuleSource for FileModuleSource {
    async fn load(&self) -> ConfigResult<Module> {
        debug!("加载模块配置文件: {}", self.path.display());

        let format = FileFormat::from_path(&self.path)?;
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                    path: self.path.display().to_string(),
                },
                _ => ConfigError::FileReadError { source: e },
            })?;

        let config = format.parse(&content)?;
        if !config.is_object() && !config.is_null() {
            return Err(ConfigError::validation(format!(
                "The configuration of the module \"{}\" must be an object.",
                self.id
            )));
        }

        Ok(Module::from_value(self.id.clone(), config))
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn level(&self) -> usize {
        self.level
    }
}

/// 内存模块来源
#[derive(Debug, Clone)]
pub struct InlineModuleSource {
    module: Module,
    level: usize,
}

impl InlineModuleSource {
    /// 创建应用层级的内存模块来源
    pub fn new(id: impl Into<String>, config: Value) -> Self {
        Self {
            module: Module::from_value(id, config),
            level: APPLICATION_LEVEL,
        }
    }

    /// 设置模块层级
    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }
}

#[async_trait]
impl ModuleSource for InlineModuleSource {
    async fn load(&self) -> ConfigResult<Module> {
        Ok(self.module.clone())
    }

    fn name(&self) -> &str {
        &self.module.id
    }

    fn level(&self) -> usize {
        self.level
    }
}

/// 依次加载所有来源，组成模块树
pub async fn load_modules(sources: &[Box<dyn ModuleSource>]) -> ConfigResult<ModulesTree> {
    let mut tree = ModulesTree::new();

    for source in sources {
        let module = source.load().await?;
        debug!("模块 {} 加载完成，层级: {}", module.id, source.level());
        tree.add(source.level(), module);
    }

    info!("共加载 {} 个配置模块", tree.len());
    Ok(tree)
}

/// 将 TOML 值转换为 JSON 值
fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Number(serde_json::Number::from(*i)),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
    }
}
