use super::{resolve_lookups, Lookup};
use di_abstractions::{BuildContext, BuildStage, DefinitionSet, ServiceBuilder};
use infrastructure_common::value::type_name;
use infrastructure_common::DependencyError;
use serde_json::{Map, Value};
use tracing::debug;

/// 衍生实例上下文中保存衍生键的字段
pub const DECLINATION_KEY: &str = "_";

/// 展开衍生定义
///
/// 衍生数据的每个条目生成一个 `id.key` 定义，条目的值作为 `@` 引用上下文。
pub struct DeclinationsBuilder;

impl ServiceBuilder for DeclinationsBuilder {
    fn name(&self) -> &'static str {
        "declinations"
    }

    fn stage(&self) -> BuildStage {
        BuildStage::Declinations
    }

    fn process(
        &self,
        definitions: &mut DefinitionSet,
        context: &BuildContext<'_>,
    ) -> Result<(), DependencyError> {
        for id in definitions.ids() {
            let Some(base) = definitions.get(&id).cloned() else {
                continue;
            };
            let Some(declinations) = &base.declinations else {
                continue;
            };

            let base_context = base.context_value();
            let lookup = Lookup {
                parameters: &base.origin.parameters,
                context: &base_context,
                config: &base.origin.config,
            };
            let resolved = resolve_lookups(declinations, context.resolver, &lookup, &base.label())?;

            let variants: Vec<(String, Value)> = match resolved {
                Value::Object(map) => map.into_iter().collect(),
                Value::Array(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| (index.to_string(), item))
                    .collect(),
                other => {
                    return Err(DependencyError::invalid_definition(
                        &id,
                        format!("the declinations must resolve to an object, got {}", type_name(&other)),
                    ))
                }
            };

            for (key, variant) in variants {
                let declined_id = format!("{id}.{key}");
                if definitions.contains(&declined_id) {
                    return Err(DependencyError::invalid_definition(
                        &declined_id,
                        format!("the declination \"{key}\" of the service \"{id}\" is already defined"),
                    ));
                }

                let mut variant_context = match variant {
                    Value::Object(map) => map,
                    other => Map::from_iter([("value".to_string(), other)]),
                };
                variant_context.insert(DECLINATION_KEY.to_string(), Value::String(key));

                let mut declined = base.clone();
                declined.id = declined_id;
                declined.template = false;
                declined.declinations = None;
                declined.children.clear();
                declined.context = Some(Value::Object(variant_context));

                debug!("展开衍生定义: {}", declined.id);
                definitions.insert(declined);
            }
        }

        Ok(())
    }
}
