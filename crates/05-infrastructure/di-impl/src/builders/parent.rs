use super::{inherit, Inherit};
use di_abstractions::{BuildContext, BuildStage, DefinitionSet, ServiceBuilder, ServiceDefinition};
use infrastructure_common::DependencyError;
use std::collections::HashMap;
use tracing::trace;

/// 合并 `parent` 声明的父定义
///
/// 多级父链自顶向下合并，每个定义只合并一次。
pub struct ParentBuilder;

impl ParentBuilder {
    fn merge(
        &self,
        id: &str,
        definitions: &DefinitionSet,
        merged: &mut HashMap<String, ServiceDefinition>,
        chain: &mut Vec<String>,
    ) -> Result<ServiceDefinition, DependencyError> {
        if let Some(definition) = merged.get(id) {
            return Ok(definition.clone());
        }

        if let Some(position) = chain.iter().position(|c| c == id) {
            let mut cycle = chain[position..].to_vec();
            cycle.push(id.to_string());
            return Err(DependencyError::ParentCycle { chain: cycle });
        }

        let mut definition = definitions
            .get(id)
            .cloned()
            .ok_or_else(|| DependencyError::ServiceNotFound { id: id.to_string() })?;

        if let Some(parent_id) = definition.parent.clone() {
            if !definitions.contains(&parent_id) {
                return Err(DependencyError::invalid_definition(
                    id,
                    format!("the parent service \"{parent_id}\" is not defined"),
                ));
            }

            chain.push(id.to_string());
            let parent = self.merge(&parent_id, definitions, merged, chain)?;
            chain.pop();

            trace!("合并父定义: {} <- {}", id, parent_id);
            inherit(&mut definition, &parent, Inherit::Parent);
        }

        merged.insert(id.to_string(), definition.clone());
        Ok(definition)
    }
}

impl ServiceBuilder for ParentBuilder {
    fn name(&self) -> &'static str {
        "parent"
    }

    fn stage(&self) -> BuildStage {
        BuildStage::Parent
    }

    fn process(
        &self,
        definitions: &mut DefinitionSet,
        _context: &BuildContext<'_>,
    ) -> Result<(), DependencyError> {
        let mut merged = HashMap::new();

        for id in definitions.ids() {
            let mut chain = Vec::new();
            self.merge(&id, definitions, &mut merged, &mut chain)?;
        }

        for definition in definitions.iter_mut() {
            if let Some(resolved) = merged.remove(&definition.id) {
                *definition = resolved;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::testing::run;
    use di_abstractions::ClassesRegistry;
    use serde_json::json;

    fn process(services: serde_json::Value) -> Result<DefinitionSet, DependencyError> {
        run(&[&ParentBuilder], services, json!({}), &ClassesRegistry::new())
    }

    #[test]
    fn test_multi_level_parent_chain() {
        let set = process(json!({
            "hd": {"parent": "storage", "properties": {"type": "HD"}},
            "storage": {"parent": "base", "class": "Storage", "properties": {"size": "2GB"}},
            "base": {"abstract": true, "properties": {"size": "1GB", "type": "SD", "vendor": "x"}, "tags": ["storage"]}
        }))
        .unwrap();

        let hd = set.get("hd").unwrap();
        assert_eq!(hd.class.as_deref(), Some("Storage"));
        assert_eq!(
            serde_json::Value::Object(hd.properties.clone()),
            json!({"size": "2GB", "type": "HD", "vendor": "x"})
        );
        assert_eq!(hd.tags, vec!["storage"]);
        assert!(!hd.is_abstract);
    }

    #[test]
    fn test_parent_cycle() {
        let error = process(json!({
            "a": {"parent": "b"},
            "b": {"parent": "a"}
        }))
        .unwrap_err();

        match error {
            DependencyError::ParentCycle { chain } => assert_eq!(chain, vec!["a", "b", "a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_undefined_parent() {
        let error = process(json!({"a": {"parent": "missing"}})).unwrap_err();

        assert!(error.to_string().contains("\"missing\""));
    }
}
