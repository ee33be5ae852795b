use super::resolve_string;
use di_abstractions::{BuildContext, BuildStage, DefinitionSet, ServiceBuilder};
use infrastructure_common::DependencyError;
use tracing::trace;

/// 解析类名并校验类及其接口已注册
///
/// 模板定义的类可能引用衍生上下文，只在衍生出的定义上解析。
pub struct ClassBuilder;

impl ServiceBuilder for ClassBuilder {
    fn name(&self) -> &'static str {
        "class"
    }

    fn stage(&self) -> BuildStage {
        BuildStage::Class
    }

    fn process(
        &self,
        definitions: &mut DefinitionSet,
        context: &BuildContext<'_>,
    ) -> Result<(), DependencyError> {
        for definition in definitions.iter_mut() {
            if definition.template || definition.alias.is_some() {
                continue;
            }
            let Some(source) = definition.class.clone() else {
                continue;
            };

            let name = resolve_string(definition, "class", &source, context.resolver)?;
            let class = context
                .classes
                .get(&name)
                .ok_or_else(|| DependencyError::ClassNotRegistered {
                    id: definition.id.clone(),
                    class: name.clone(),
                })?;
            context.interfaces.validate_class(class)?;

            trace!("服务 {} 的类: {}", definition.id, name);
            definition.class = Some(name);
        }

        Ok(())
    }
}
