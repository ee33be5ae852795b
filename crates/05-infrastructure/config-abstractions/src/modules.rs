//! 模块与模块树

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// 应用模块所在的层级
pub const APPLICATION_LEVEL: usize = 0;

/// 一个提供配置的模块
///
/// `config` 的顶层键为配置节名称，环境专属的配置节以 `name/environment` 命名。
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// 模块标识
    pub id: String,
    /// 配置节名称到配置值的映射
    pub config: Map<String, Value>,
    /// 别名模块指向的模块标识，别名模块不提供配置
    pub alias: Option<String>,
}

impl Module {
    /// 创建模块
    pub fn new(id: impl Into<String>, config: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            config,
            alias: None,
        }
    }

    /// 创建指向另一个模块的别名模块
    pub fn alias(id: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            config: Map::new(),
            alias: Some(target.into()),
        }
    }

    /// 从 JSON 值创建模块，非对象值视为空配置
    pub fn from_value(id: impl Into<String>, config: Value) -> Self {
        match config {
            Value::Object(config) => Self::new(id, config),
            _ => Self::new(id, Map::new()),
        }
    }

    /// 读取配置节
    ///
    /// 依次查找：
    /// - 节名的首段等于模块标识时，模块自身的 `this` 或 `this/environment`
    /// - 去掉模块标识前缀后的相对节名
    /// - 完整节名
    ///
    /// 别名模块始终返回 `None`。
    pub fn section(&self, name: &str) -> Option<&Value> {
        if self.alias.is_some() {
            return None;
        }
        let mut parts = name.split('/');
        let head = parts.next().unwrap_or_default();
        let this_name = match parts.next() {
            Some(environment) => format!("this/{environment}"),
            None => "this".to_string(),
        };
        if head == self.id {
            if let Some(value) = self.present(&this_name) {
                return Some(value);
            }
        }

        let relative = name.strip_prefix(self.id.as_str()).map(|rest| {
            let mut chars = rest.chars();
            chars.next();
            chars.as_str()
        });
        if let Some(value) = relative.filter(|r| !r.is_empty()).and_then(|r| self.present(r)) {
            return Some(value);
        }

        self.present(name)
    }

    fn present(&self, key: &str) -> Option<&Value> {
        self.config.get(key).filter(|value| !value.is_null())
    }
}

/// 按层级组织的模块集合
///
/// 层级 0 为应用本身，层级越大依赖越深。数值较小的层级覆盖较大的层级。
#[derive(Debug, Clone, Default)]
pub struct ModulesTree {
    levels: BTreeMap<usize, Vec<Module>>,
}

impl ModulesTree {
    /// 创建空的模块树
    pub fn new() -> Self {
        Self::default()
    }

    /// 向指定层级添加模块
    pub fn add(&mut self, level: usize, module: Module) {
        self.levels.entry(level).or_default().push(module);
    }

    /// 链式添加模块
    pub fn with(mut self, level: usize, module: Module) -> Self {
        self.add(level, module);
        self
    }

    /// 获取某一层级的模块，层级不存在时返回空切片
    pub fn level(&self, level: usize) -> &[Module] {
        self.levels.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 按层级从小到大遍历
    pub fn levels(&self) -> impl Iterator<Item = (usize, &[Module])> {
        self.levels
            .iter()
            .map(|(level, modules)| (*level, modules.as_slice()))
    }

    /// 按标识查找模块
    pub fn module(&self, id: &str) -> Option<&Module> {
        self.levels
            .values()
            .flat_map(|modules| modules.iter())
            .find(|module| module.id == id)
    }

    /// 模块总数
    pub fn len(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }

    /// 是否没有任何模块
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
