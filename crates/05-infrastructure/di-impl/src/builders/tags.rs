use super::{resolve_lookups, Lookup};
use di_abstractions::{BuildContext, BuildStage, DefinitionSet, ServiceBuilder};
use indexmap::IndexMap;
use infrastructure_common::value::type_name;
use infrastructure_common::DependencyError;
use serde_json::Value;
use tracing::debug;

/// 解析标签并建立标签索引
///
/// 索引按定义注册顺序排列，只包含可实例化的定义。
pub struct TagsBuilder;

impl ServiceBuilder for TagsBuilder {
    fn name(&self) -> &'static str {
        "tags"
    }

    fn stage(&self) -> BuildStage {
        BuildStage::Tags
    }

    fn process(
        &self,
        definitions: &mut DefinitionSet,
        context: &BuildContext<'_>,
    ) -> Result<(), DependencyError> {
        let mut index: IndexMap<String, Vec<String>> = IndexMap::new();

        for definition in definitions.iter_mut() {
            if !definition.is_instantiable() || definition.tags.is_empty() {
                continue;
            }

            let variant_context = definition.context_value();
            let lookup = Lookup {
                parameters: &definition.origin.parameters,
                context: &variant_context,
                config: &definition.origin.config,
            };
            let label = definition.label();

            let mut resolved = Vec::with_capacity(definition.tags.len());
            for source in &definition.tags {
                match resolve_lookups(&Value::String(source.clone()), context.resolver, &lookup, &label)? {
                    Value::String(tag) => resolved.push(tag),
                    Value::Array(items) => {
                        resolved.extend(items.into_iter().filter_map(|item| match item {
                            Value::String(tag) => Some(tag),
                            _ => None,
                        }))
                    }
                    other => {
                        return Err(DependencyError::invalid_definition(
                            &definition.id,
                            format!("the tag \"{source}\" must resolve to a string, got {}", type_name(&other)),
                        ))
                    }
                }
            }

            let mut tags: Vec<String> = Vec::with_capacity(resolved.len());
            for tag in resolved {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }

            for tag in &tags {
                let members = index.entry(tag.clone()).or_default();
                if !members.contains(&definition.id) {
                    members.push(definition.id.clone());
                }
            }
            definition.tags = tags;
        }

        debug!("标签索引: {} 个标签", index.len());
        definitions.set_tags(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::testing::run;
    use crate::builders::{AbstractBuilder, ChildrenBuilder, DeclinationsBuilder, ParentBuilder};
    use di_abstractions::ClassesRegistry;
    use serde_json::json;

    #[test]
    fn test_tag_index_in_registration_order() {
        let set = run(
            &[
                &AbstractBuilder,
                &ParentBuilder,
                &ChildrenBuilder,
                &DeclinationsBuilder,
                &TagsBuilder,
            ],
            json!({
                "abstractStorage": {"abstract": true, "tags": ["storage"]},
                "storage": {
                    "parent": "abstractStorage",
                    "children": {"local": {}, "remote": {}}
                },
                "provider": {"declinations": "$providers$", "tags": ["provider", "@kind@"]}
            }),
            json!({"providers": {
                "smallImages": {"kind": "images"},
                "bigImages": {"kind": "images"}
            }}),
            &ClassesRegistry::new(),
        )
        .unwrap();

        assert_eq!(set.tagged("storage"), &["storage.local", "storage.remote"]);
        assert_eq!(
            set.tagged("provider"),
            &["provider.smallImages", "provider.bigImages"]
        );
        assert_eq!(
            set.tagged("images"),
            &["provider.smallImages", "provider.bigImages"]
        );
        assert!(set.tagged("missing").is_empty());
    }
}
