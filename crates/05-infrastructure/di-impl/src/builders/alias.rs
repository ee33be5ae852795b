use super::resolve_string;
use di_abstractions::{BuildContext, BuildStage, DefinitionSet, ServiceBuilder};
use infrastructure_common::{DependencyError, ReferenceError};

/// 解析别名目标
///
/// 最终处理时校验别名目标已定义，且别名链不成环。
pub struct AliasBuilder;

impl AliasBuilder {
    fn validate(&self, id: &str, definitions: &DefinitionSet) -> Result<(), DependencyError> {
        let mut chain = vec![id.to_string()];
        let mut current = id.to_string();

        while let Some(target) = definitions.get(&current).and_then(|d| d.alias.clone()) {
            let Some(definition) = definitions.get(&target) else {
                return Err(ReferenceError::UndefinedService {
                    reference: target.clone(),
                    id: target,
                    label: format!("the alias of the service \"{current}\""),
                }
                .into());
            };

            if chain.contains(&target) {
                chain.push(target);
                return Err(DependencyError::CircularDependency { cycle: chain });
            }

            chain.push(target.clone());
            if definition.alias.is_none() {
                break;
            }
            current = target;
        }

        Ok(())
    }
}

impl ServiceBuilder for AliasBuilder {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn stage(&self) -> BuildStage {
        BuildStage::Alias
    }

    fn process(
        &self,
        definitions: &mut DefinitionSet,
        context: &BuildContext<'_>,
    ) -> Result<(), DependencyError> {
        for definition in definitions.iter_mut() {
            let Some(source) = definition.alias.clone() else {
                continue;
            };
            if definition.class.is_some() || !definition.properties.is_empty() {
                return Err(DependencyError::invalid_definition(
                    &definition.id,
                    "an alias cannot declare a class or properties",
                ));
            }
            definition.alias = Some(resolve_string(definition, "alias", &source, context.resolver)?);
        }

        if context.is_final {
            for id in definitions.ids() {
                if definitions.get(&id).is_some_and(|d| d.alias.is_some()) {
                    self.validate(&id, definitions)?;
                }
            }
        }

        Ok(())
    }
}
