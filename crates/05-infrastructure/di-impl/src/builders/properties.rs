use super::{resolve_property, Lookup};
use di_abstractions::{BuildContext, BuildStage, DefinitionSet, ServiceBuilder};
use indexmap::IndexMap;
use infrastructure_common::DependencyError;
use tracing::trace;

/// 解析可实例化定义的属性，生成注入计划
///
/// 工厂调用只记录目标和上下文，由工厂阶段展开。
pub struct PropertiesBuilder;

impl ServiceBuilder for PropertiesBuilder {
    fn name(&self) -> &'static str {
        "properties"
    }

    fn stage(&self) -> BuildStage {
        BuildStage::Properties
    }

    fn process(
        &self,
        definitions: &mut DefinitionSet,
        context: &BuildContext<'_>,
    ) -> Result<(), DependencyError> {
        for definition in definitions.iter_mut() {
            if !definition.is_instantiable() {
                continue;
            }

            let variant_context = definition.context_value();
            let lookup = Lookup {
                parameters: &definition.origin.parameters,
                context: &variant_context,
                config: &definition.origin.config,
            };
            let label = definition.label();

            let mut injections = IndexMap::with_capacity(definition.properties.len());
            for (name, value) in &definition.properties {
                injections.insert(
                    name.clone(),
                    resolve_property(value, context.resolver, &lookup, &label)?,
                );
            }

            trace!("服务 {} 解析了 {} 个属性", definition.id, injections.len());
            definition.injections = injections;
        }

        Ok(())
    }
}
