use super::{inherit, Inherit};
use di_abstractions::{BuildContext, BuildStage, DefinitionSet, ServiceBuilder, ServiceDefinition};
use infrastructure_common::DependencyError;
use std::collections::VecDeque;
use tracing::trace;

/// 展开子定义
///
/// 子定义 `name` 生成标识为 `id.name` 的定义，并以声明它的定义为隐式父定义。
pub struct ChildrenBuilder;

impl ServiceBuilder for ChildrenBuilder {
    fn name(&self) -> &'static str {
        "children"
    }

    fn stage(&self) -> BuildStage {
        BuildStage::Children
    }

    fn process(
        &self,
        definitions: &mut DefinitionSet,
        _context: &BuildContext<'_>,
    ) -> Result<(), DependencyError> {
        let mut queue: VecDeque<String> = definitions.ids().into();

        while let Some(id) = queue.pop_front() {
            let Some(container) = definitions.get(&id).cloned() else {
                continue;
            };

            for (name, partial) in &container.children {
                let child_id = format!("{id}.{name}");
                if definitions.contains(&child_id) {
                    return Err(DependencyError::invalid_definition(
                        &child_id,
                        format!("the child \"{name}\" of the service \"{id}\" is already defined"),
                    ));
                }

                let mut child =
                    ServiceDefinition::from_value(&child_id, partial, container.origin.clone())?;

                if let Some(parent_id) = child.parent.clone() {
                    let parent = definitions.get(&parent_id).ok_or_else(|| {
                        DependencyError::invalid_definition(
                            &child_id,
                            format!("the parent service \"{parent_id}\" is not defined"),
                        )
                    })?;
                    inherit(&mut child, parent, Inherit::Parent);
                }
                inherit(&mut child, &container, Inherit::Container);

                if !child.children.is_empty() || child.declinations.is_some() {
                    child.template = true;
                    queue.push_back(child_id.clone());
                }

                trace!("展开子定义: {}", child_id);
                definitions.insert(child);
            }
        }

        Ok(())
    }
}
