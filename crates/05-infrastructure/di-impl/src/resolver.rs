//! 引用解析器实现
//!
//! 扫描规则：
//!
//! - 引用形如 `D part D`，多部分引用的各部分之间用单个 `D` 分隔
//! - 连续 `2k` 个分隔符表示 `k` 个字面分隔符，连续 `2k+1` 个分隔符在字面
//!   分隔符之外还带有一个结构分隔符（开始时取最后一个，结束时取第一个）
//! - 未闭合的引用按普通文本处理

use di_abstractions::{ReferenceResolver, ReferenceType};
use infrastructure_common::value::{is_scalar, lookup_path, scalar_to_string};
use infrastructure_common::ReferenceError;
use serde_json::Value;
use tracing::debug;

/// 扫描得到的片段
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Marker(Marker),
}

/// 引用标记
#[derive(Debug, Clone, PartialEq, Eq)]
struct Marker {
    raw: String,
    parts: Vec<String>,
}

/// 单个引用取值在拼接时的贡献
enum Piece {
    Text(String),
    Choices(Vec<String>),
}

/// 引用解析器实现
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolverImpl {
    types: Vec<ReferenceType>,
}

impl ReferenceResolverImpl {
    /// 创建不含任何引用类型的解析器
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建注册了默认引用类型的解析器
    pub fn with_default_types() -> Self {
        Self {
            types: ReferenceType::defaults(),
        }
    }

    fn find_type(&self, name: &str) -> Result<&ReferenceType, ReferenceError> {
        self.types
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ReferenceError::UndefinedType {
                name: name.to_string(),
            })
    }

    fn lookup_pieces<'a>(
        segments: &'a [Segment],
        source: &str,
        context: &Value,
        label: &str,
    ) -> Result<Vec<(Option<Value>, &'a Segment)>, ReferenceError> {
        let mut resolved = Vec::with_capacity(segments.len());
        let mut unresolved = Vec::new();

        for segment in segments {
            match segment {
                Segment::Marker(marker) => {
                    let value = lookup_path(context, &marker.parts[0]);
                    if value.is_none() {
                        unresolved.push(marker.raw.clone());
                    }
                    resolved.push((value, segment));
                }
                Segment::Text(_) => resolved.push((None, segment)),
            }
        }

        if unresolved.is_empty() {
            Ok(resolved)
        } else {
            Err(ReferenceError::Unresolved {
                references: marker_raws(segments),
                unresolved,
                expression: source.to_string(),
                label: label.to_string(),
            })
        }
    }
}

impl ReferenceResolver for ReferenceResolverImpl {
    fn add_reference_type(&mut self, reference_type: ReferenceType) -> Result<(), ReferenceError> {
        reference_type.validate()?;

        if let Some(existing) = self.types.iter().find(|t| {
            t.name() == reference_type.name() || t.delimiter() == reference_type.delimiter()
        }) {
            return Err(ReferenceError::DuplicateType {
                name: reference_type.name().to_string(),
                existing: existing.name().to_string(),
            });
        }

        debug!(
            "注册引用类型: {} (分隔符 {}, 部分数 {})",
            reference_type.name(),
            reference_type.delimiter(),
            reference_type.size()
        );
        self.types.push(reference_type);
        Ok(())
    }

    fn reference_type(&self, name: &str) -> Option<&ReferenceType> {
        self.types.iter().find(|t| t.name() == name)
    }

    fn reference_types(&self) -> Vec<&ReferenceType> {
        self.types.iter().collect()
    }

    fn resolve(
        &self,
        source: &str,
        type_name: &str,
        context: &Value,
        label: &str,
    ) -> Result<Value, ReferenceError> {
        let reference_type = self.find_type(type_name)?;
        let segments = scan(source, reference_type.delimiter(), reference_type.size());

        if !segments.iter().any(|s| matches!(s, Segment::Marker(_))) {
            return Ok(Value::String(plain_text(&segments)));
        }

        if reference_type.size() != 1 {
            return Err(ReferenceError::InvalidType {
                name: type_name.to_string(),
                message: "multi-part references cannot be looked up in a context".to_string(),
            });
        }

        let resolved = Self::lookup_pieces(&segments, source, context, label)?;

        // 整串引用保留取值类型
        if let [(Some(value), Segment::Marker(_))] = resolved.as_slice() {
            return Ok(value.clone());
        }

        if !reference_type.allows_concatenation() {
            return Err(ReferenceError::Concatenation {
                reference: marker_raws(&segments).remove(0),
                expression: source.to_string(),
                label: label.to_string(),
            });
        }

        let pieces: Vec<Piece> = resolved
            .into_iter()
            .map(|(value, segment)| match (value, segment) {
                (_, Segment::Text(text)) => Piece::Text(text.clone()),
                (Some(value), Segment::Marker(_)) => to_piece(&value),
                (None, Segment::Marker(marker)) => Piece::Text(marker.raw.clone()),
            })
            .collect();

        Ok(combine(&pieces))
    }

    fn extract(
        &self,
        source: &str,
        type_name: &str,
        label: &str,
    ) -> Result<Option<Vec<String>>, ReferenceError> {
        let reference_type = self.find_type(type_name)?;
        let segments = scan(source, reference_type.delimiter(), reference_type.size());

        match segments.as_slice() {
            [Segment::Marker(marker)] => Ok(Some(marker.parts.clone())),
            _ if !segments.iter().any(|s| matches!(s, Segment::Marker(_))) => Ok(None),
            _ if !reference_type.allows_concatenation() => Err(ReferenceError::Concatenation {
                reference: marker_raws(&segments).remove(0),
                expression: source.to_string(),
                label: label.to_string(),
            }),
            _ => Ok(None),
        }
    }

    fn markers(&self, source: &str, type_name: &str) -> Result<Vec<String>, ReferenceError> {
        let reference_type = self.find_type(type_name)?;
        Ok(marker_raws(&scan(
            source,
            reference_type.delimiter(),
            reference_type.size(),
        )))
    }
}

/// 扫描源字符串
fn scan(source: &str, delimiter: char, size: usize) -> Vec<Segment> {
    let chars: Vec<char> = source.chars().collect();
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut raw = String::new();
    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut inside = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != delimiter {
            if inside {
                current.push(c);
                raw.push(c);
            } else {
                text.push(c);
            }
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i] == delimiter {
            i += 1;
        }
        let run = i - start;
        let literal: String = std::iter::repeat(delimiter).take(run / 2).collect();

        if !inside {
            text.push_str(&literal);
            if run % 2 == 1 {
                inside = true;
                parts.clear();
                current.clear();
                raw = delimiter.to_string();
            }
            continue;
        }

        raw.extend(std::iter::repeat(delimiter).take(run));
        if run % 2 == 0 {
            current.push_str(&literal);
            continue;
        }

        parts.push(std::mem::take(&mut current));
        if parts.len() < size {
            current.push_str(&literal);
            continue;
        }

        let separator = delimiter.to_string();
        if !text.is_empty() {
            segments.push(Segment::Text(std::mem::take(&mut text)));
        }
        segments.push(Segment::Marker(Marker {
            raw: format!("{delimiter}{}{delimiter}", parts.join(&separator)),
            parts: std::mem::take(&mut parts),
        }));
        inside = false;
        text.push_str(&literal);
    }

    if inside {
        text.push_str(&raw);
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }

    segments
}

fn marker_raws(segments: &[Segment]) -> Vec<String> {
    segments
        .iter()
        .filter_map(|segment| match segment {
            Segment::Marker(marker) => Some(marker.raw.clone()),
            Segment::Text(_) => None,
        })
        .collect()
}

fn plain_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Text(text) => text.as_str(),
            Segment::Marker(marker) => marker.raw.as_str(),
        })
        .collect()
}

/// 将引用取值转换为拼接片段
///
/// 对象贡献键，标量数组贡献元素，包含复合元素的数组贡献下标。
fn to_piece(value: &Value) -> Piece {
    match value {
        Value::Object(map) => Piece::Choices(map.keys().cloned().collect()),
        Value::Array(items) if items.iter().all(is_scalar) => {
            Piece::Choices(items.iter().filter_map(scalar_to_string).collect())
        }
        Value::Array(items) => Piece::Choices((0..items.len()).map(|i| i.to_string()).collect()),
        other => Piece::Text(scalar_to_string(other).unwrap_or_default()),
    }
}

/// 组合拼接片段
///
/// 没有集合取值时结果为字符串；多个集合取值长度相同时按下标配对，
/// 否则取笛卡尔积。
fn combine(pieces: &[Piece]) -> Value {
    let lengths: Vec<usize> = pieces
        .iter()
        .filter_map(|piece| match piece {
            Piece::Choices(choices) => Some(choices.len()),
            Piece::Text(_) => None,
        })
        .collect();

    if lengths.is_empty() {
        return Value::String(
            pieces
                .iter()
                .map(|piece| match piece {
                    Piece::Text(text) => text.as_str(),
                    Piece::Choices(_) => "",
                })
                .collect(),
        );
    }

    let zipped = lengths.windows(2).all(|w| w[0] == w[1]);
    let results = if zipped {
        (0..lengths[0])
            .map(|index| {
                pieces
                    .iter()
                    .map(|piece| match piece {
                        Piece::Text(text) => text.as_str(),
                        Piece::Choices(choices) => choices[index].as_str(),
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
    } else {
        pieces.iter().fold(vec![String::new()], |acc, piece| match piece {
            Piece::Text(text) => acc.into_iter().map(|prefix| prefix + text).collect(),
            Piece::Choices(choices) => acc
                .iter()
                .flat_map(|prefix| choices.iter().map(move |choice| format!("{prefix}{choice}")))
                .collect(),
        })
    };

    Value::Array(results.into_iter().map(Value::String).collect())
}
