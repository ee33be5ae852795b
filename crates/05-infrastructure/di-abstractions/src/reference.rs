//! 引用类型与引用解析器抽象接口
//!
//! 引用是嵌入在配置字符串中的分隔符标记，例如 `%path%`、`#id#`、
//! `>target>caller>context>`。

use infrastructure_common::ReferenceError;
use serde_json::Value;

/// 参数引用 `%path%`
pub const PARAMETER_REFERENCE: &str = "%";
/// 上下文引用 `@path@`
pub const CONTEXT_REFERENCE: &str = "@";
/// 配置引用 `$path$`
pub const CONFIG_REFERENCE: &str = "$";
/// 服务引用 `#id#`
pub const SERVICE_REFERENCE: &str = "#";
/// 服务标签引用 `&tag&`
pub const TAG_REFERENCE: &str = "&";
/// 服务工厂引用 `>target>caller>context>`
pub const FACTORY_REFERENCE: &str = ">";

/// 引用类型描述
///
/// 描述一种引用语法：名称、分隔符、组成部分数量以及是否允许与其他文本拼接。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceType {
    name: String,
    delimiter: char,
    size: usize,
    allows_concatenation: bool,
}

impl ReferenceType {
    /// 创建单部分、允许拼接的引用类型
    pub fn new(name: impl Into<String>, delimiter: char) -> Self {
        Self {
            name: name.into(),
            delimiter,
            size: 1,
            allows_concatenation: true,
        }
    }

    /// 设置引用的组成部分数量
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// 禁止与其他文本拼接
    pub fn without_concatenation(mut self) -> Self {
        self.allows_concatenation = false;
        self
    }

    /// 类型名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 分隔符
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// 组成部分数量
    pub fn size(&self) -> usize {
        self.size
    }

    /// 是否允许拼接
    pub fn allows_concatenation(&self) -> bool {
        self.allows_concatenation
    }

    /// 校验类型描述本身
    pub fn validate(&self) -> Result<(), ReferenceError> {
        if self.name.is_empty() {
            return Err(ReferenceError::InvalidType {
                name: self.name.clone(),
                message: "the name cannot be empty".to_string(),
            });
        }
        if self.size == 0 {
            return Err(ReferenceError::InvalidType {
                name: self.name.clone(),
                message: "the size must be at least 1".to_string(),
            });
        }
        if self.delimiter.is_alphanumeric() || self.delimiter == '.' || self.delimiter.is_whitespace() {
            return Err(ReferenceError::InvalidType {
                name: self.name.clone(),
                message: format!("\"{}\" cannot be used as a delimiter", self.delimiter),
            });
        }
        Ok(())
    }

    /// 默认引用类型集合，按扫描优先级排序
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(PARAMETER_REFERENCE, '%'),
            Self::new(CONTEXT_REFERENCE, '@'),
            Self::new(CONFIG_REFERENCE, '$'),
            Self::new(SERVICE_REFERENCE, '#').without_concatenation(),
            Self::new(TAG_REFERENCE, '&').without_concatenation(),
            Self::new(FACTORY_REFERENCE, '>')
                .with_size(3)
                .without_concatenation(),
        ]
    }
}

/// 引用解析器 trait
///
/// 负责扫描字符串中的引用标记并从给定上下文中替换取值
pub trait ReferenceResolver: Send + Sync {
    /// 注册引用类型，注册顺序即扫描顺序
    fn add_reference_type(&mut self, reference_type: ReferenceType) -> Result<(), ReferenceError>;

    /// 获取引用类型
    fn reference_type(&self, name: &str) -> Option<&ReferenceType>;

    /// 按注册顺序列出所有引用类型
    fn reference_types(&self) -> Vec<&ReferenceType>;

    /// 解析字符串中指定类型的引用
    ///
    /// 整串为单个引用时保留取值类型；嵌入文本中的集合取值会使源字符串
    /// 按元素展开，结果为字符串数组。
    fn resolve(
        &self,
        source: &str,
        type_name: &str,
        context: &Value,
        label: &str,
    ) -> Result<Value, ReferenceError>;

    /// 提取整串引用的组成部分
    ///
    /// 源字符串不含该类型引用时返回 `None`。
    fn extract(
        &self,
        source: &str,
        type_name: &str,
        label: &str,
    ) -> Result<Option<Vec<String>>, ReferenceError>;

    /// 列出字符串中指定类型的全部引用标记
    fn markers(&self, source: &str, type_name: &str) -> Result<Vec<String>, ReferenceError>;
}
