//! 配置值工具
//!
//! 基于 `serde_json::Value` 的路径查找和合并工具，供引用解析和配置合并共用。

use serde_json::{Map, Value};

/// 按点分路径查找值
///
/// - 对象按键查找
/// - 数组的数字段按下标查找
/// - 数组的非数字段会作用于每个元素，结果为映射后的数组
///
/// `null` 与缺失的值都视为无法解析。
pub fn lookup_path(context: &Value, path: &str) -> Option<Value> {
    if path.is_empty() {
        return None;
    }

    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }

    lookup_segments(context, &segments)
}

fn lookup_segments(current: &Value, segments: &[&str]) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return match current {
            Value::Null => None,
            other => Some(other.clone()),
        };
    };

    match current {
        Value::Object(map) => lookup_segments(map.get(*head)?, rest),
        Value::Array(items) => {
            if let Ok(index) = head.parse::<usize>() {
                lookup_segments(items.get(index)?, rest)
            } else {
                // 非下标路径映射到每个元素
                items
                    .iter()
                    .map(|item| lookup_segments(item, segments))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::Array)
            }
        }
        _ => None,
    }
}

/// 深度合并两个值，`overlay` 在冲突时优先
///
/// 两边都是对象时逐键递归合并，其余情况直接取 `overlay`。
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                let next = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// 深度合并两个对象映射，`overlay` 在冲突时优先
pub fn deep_merge_maps(base: &Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    match deep_merge(&Value::Object(base.clone()), &Value::Object(overlay.clone())) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// 判断值是否为标量（字符串、数字、布尔）
pub fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// 将标量值转换为文本
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 返回值的类型名称，用于错误信息
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested_object() {
        let context = json!({"providers": {"bigImages": {"adapter": "adapter.image"}}});

        assert_eq!(
            lookup_path(&context, "providers.bigImages.adapter"),
            Some(json!("adapter.image"))
        );
        assert_eq!(lookup_path(&context, "providers.missing"), None);
        assert_eq!(lookup_path(&context, ""), None);
        assert_eq!(lookup_path(&context, "providers..bigImages"), None);
    }

    #[test]
    fn test_lookup_array_index_and_mapping() {
        let context = json!({
            "parameters": [
                {"type": "size", "value": 2},
                {"type": "unit", "value": "m"}
            ]
        });

        assert_eq!(
            lookup_path(&context, "parameters.1"),
            Some(json!({"type": "unit", "value": "m"}))
        );
        assert_eq!(
            lookup_path(&context, "parameters.type"),
            Some(json!(["size", "unit"]))
        );
        assert_eq!(lookup_path(&context, "parameters.missing"), None);
    }

    #[test]
    fn test_lookup_null_is_unresolved() {
        let context = json!({"a": null});

        assert_eq!(lookup_path(&context, "a"), None);
    }

    #[test]
    fn test_deep_merge_overlay_wins() {
        let base = json!({"size": "2GB", "type": "SD", "nested": {"a": 1, "b": 2}});
        let overlay = json!({"type": "HD", "nested": {"b": 3}});

        assert_eq!(
            deep_merge(&base, &overlay),
            json!({"size": "2GB", "type": "HD", "nested": {"a": 1, "b": 3}})
        );
    }
}
