use di_abstractions::{BuildContext, BuildStage, DefinitionSet, ServiceBuilder};
use infrastructure_common::DependencyError;
use tracing::trace;

/// 标记模板定义并校验抽象服务的用法
///
/// 声明了子定义或衍生数据的定义是模板，自身不能实例化。
pub struct AbstractBuilder;

impl ServiceBuilder for AbstractBuilder {
    fn name(&self) -> &'static str {
        "abstract"
    }

    fn stage(&self) -> BuildStage {
        BuildStage::Abstract
    }

    fn process(
        &self,
        definitions: &mut DefinitionSet,
        context: &BuildContext<'_>,
    ) -> Result<(), DependencyError> {
        for definition in definitions.iter_mut() {
            if !definition.children.is_empty() || definition.declinations.is_some() {
                trace!("标记模板定义: {}", definition.id);
                definition.template = true;
            }
        }

        for definition in definitions.iter() {
            let Some(class) = definition.class.as_deref() else {
                continue;
            };
            if context.classes.has(class) {
                continue;
            }
            if definitions.get(class).is_some_and(|target| target.is_abstract) {
                return Err(DependencyError::invalid_definition(
                    &definition.id,
                    format!(
                        "the abstract service \"{class}\" is used as a class, declare it as \"parent\" instead"
                    ),
                ));
            }
        }

        Ok(())
    }
}
