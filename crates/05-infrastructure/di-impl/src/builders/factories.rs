use super::{resolve_property, Lookup};
use di_abstractions::{BuildContext, BuildStage, DefinitionSet, Injection, ServiceBuilder};
use indexmap::IndexMap;
use infrastructure_common::value::deep_merge_maps;
use infrastructure_common::{DependencyError, ReferenceError};
use std::mem;
use tracing::{trace, warn};

/// 展开工厂调用
///
/// 工厂调用的属性为目标定义的属性叠加 `factories[caller].properties`，
/// 在调用方提供的上下文中解析。嵌套的工厂调用递归展开。
pub struct FactoriesBuilder;

impl FactoriesBuilder {
    fn expand(
        &self,
        injection: &mut Injection,
        definitions: &DefinitionSet,
        context: &BuildContext<'_>,
        stack: &mut Vec<String>,
        label: &str,
    ) -> Result<(), DependencyError> {
        match injection {
            Injection::Factory(call) if call.properties.is_none() => {
                let Some(target) = definitions.get(&call.target) else {
                    if context.is_final {
                        return Err(ReferenceError::UndefinedService {
                            reference: format!(">{}>{}>", call.target, call.caller),
                            id: call.target.clone(),
                            label: label.to_string(),
                        }
                        .into());
                    }
                    warn!("工厂目标 {} 尚未定义，等待后续配置", call.target);
                    return Ok(());
                };

                let factory = target.factories.get(&call.caller).ok_or_else(|| {
                    DependencyError::FactoryNotDefined {
                        target: call.target.clone(),
                        caller: call.caller.clone(),
                        label: label.to_string(),
                    }
                })?;

                let key = format!("{}>{}", call.target, call.caller);
                if let Some(position) = stack.iter().position(|k| *k == key) {
                    let mut cycle: Vec<String> = stack[position..]
                        .iter()
                        .filter_map(|k| k.split('>').next().map(str::to_string))
                        .collect();
                    cycle.push(call.target.clone());
                    return Err(DependencyError::CircularDependency { cycle });
                }

                let properties = deep_merge_maps(&target.properties, &factory.properties);
                let lookup = Lookup {
                    parameters: &target.origin.parameters,
                    context: &call.context,
                    config: &target.origin.config,
                };
                let factory_label = format!(
                    "the factory \"{}\" of the service \"{}\"",
                    call.caller, call.target
                );

                let mut resolved = IndexMap::with_capacity(properties.len());
                for (name, value) in &properties {
                    resolved.insert(
                        name.clone(),
                        resolve_property(value, context.resolver, &lookup, &factory_label)?,
                    );
                }

                stack.push(key);
                for nested in resolved.values_mut() {
                    self.expand(nested, definitions, context, stack, &factory_label)?;
                }
                stack.pop();

                trace!("展开工厂调用: {} 由 {}", call.target, call.caller);
                call.properties = Some(resolved);
            }
            Injection::List(items) => {
                for item in items {
                    self.expand(item, definitions, context, stack, label)?;
                }
            }
            Injection::Map(entries) => {
                for item in entries.values_mut() {
                    self.expand(item, definitions, context, stack, label)?;
                }
            }
            _ => {}
        }

        Ok(())
    }
}

impl ServiceBuilder for FactoriesBuilder {
    fn name(&self) -> &'static str {
        "factories"
    }

    fn stage(&self) -> BuildStage {
        BuildStage::Factories
    }

    fn process(
        &self,
        definitions: &mut DefinitionSet,
        context: &BuildContext<'_>,
    ) -> Result<(), DependencyError> {
        for id in definitions.ids() {
            let Some(definition) = definitions.get_mut(&id) else {
                continue;
            };
            if definition.injections.is_empty() {
                continue;
            }
            let label = definition.label();
            let mut injections = mem::take(&mut definition.injections);

            let mut stack = Vec::new();
            for injection in injections.values_mut() {
                self.expand(injection, definitions, context, &mut stack, &label)?;
            }

            if let Some(definition) = definitions.get_mut(&id) {
                definition.injections = injections;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::testing::run;
    use crate::builders::{
        AbstractBuilder, ChildrenBuilder, ClassBuilder, DeclinationsBuilder, ParentBuilder,
        PropertiesBuilder,
    };
    use di_abstractions::{ClassesRegistry, FactoryCall, Instance, ServiceClass};
    use serde_json::json;
    use std::sync::Arc;

    fn process(
        services: serde_json::Value,
        config: serde_json::Value,
    ) -> Result<DefinitionSet, DependencyError> {
        let classes = ["Provider", "Rule", "Parameter"]
            .into_iter()
            .fold(ClassesRegistry::new(), |registry, name| {
                registry.with(ServiceClass::new(name, |_| Ok(Arc::new(()) as Instance)))
            });

        run(
            &[
                &AbstractBuilder,
                &ParentBuilder,
                &ChildrenBuilder,
                &DeclinationsBuilder,
                &ClassBuilder,
                &PropertiesBuilder,
                &FactoriesBuilder,
            ],
            services,
            config,
            &classes,
        )
    }

    fn services() -> serde_json::Value {
        json!({
            "provider": {
                "class": "Provider",
                "declinations": "$providers$",
                "properties": {"rules": ">rule.@rules@>provider>@@rules.@rules@@@>"}
            },
            "rule": {
                "factories": {"provider": {"properties": {
                    "parameters": ">parameter.@parameters.type@>rule>@@parameters.@parameters@@@>"
                }}},
                "children": {
                    "minSize": {"abstract": true, "class": "Rule"}
                }
            },
            "parameter": {
                "children": {
                    "size": {"abstract": true, "class": "Parameter", "factories": {"rule": {"properties": {"value": "@value@"}}}},
                    "unit": {"abstract": true, "class": "Parameter", "factories": {"rule": {"properties": {"value": "@value@"}}}}
                }
            }
        })
    }

    #[test]
    fn test_nested_factory_calls_are_expanded() {
        let set = process(
            services(),
            json!({"providers": {"bigImages": {"rules": {"minSize": {"parameters": [
                {"type": "size", "value": 2},
                {"type": "unit", "value": "m"}
            ]}}}}}),
        )
        .unwrap();

        let rules = &set.get("provider.bigImages").unwrap().injections["rules"];
        let Injection::List(rules) = rules else {
            panic!("unexpected rules: {rules:?}");
        };
        let Injection::Factory(FactoryCall {
            target,
            properties: Some(properties),
            ..
        }) = &rules[0]
        else {
            panic!("factory call was not expanded");
        };
        assert_eq!(target, "rule.minSize");

        let Injection::List(parameters) = &properties["parameters"] else {
            panic!("unexpected parameters");
        };
        match &parameters[1] {
            Injection::Factory(FactoryCall {
                target,
                properties: Some(properties),
                ..
            }) => {
                assert_eq!(target, "parameter.unit");
                assert_eq!(properties["value"], Injection::Data(json!("m")));
            }
            other => panic!("unexpected parameter: {other:?}"),
        }
    }

    #[test]
    fn test_missing_factory() {
        let error = process(
            json!({
                "rule": {"abstract": true, "class": "Rule"},
                "provider": {"class": "Provider", "properties": {"rule": ">rule>provider>default>"}}
            }),
            json!({}),
        )
        .unwrap_err();

        assert!(matches!(
            error,
            DependencyError::FactoryNotDefined { target, caller, .. } if target == "rule" && caller == "provider"
        ));
    }

    #[test]
    fn test_undefined_factory_target() {
        let error = process(
            json!({"provider": {"class": "Provider", "properties": {"rule": ">missing>provider>default>"}}}),
            json!({}),
        )
        .unwrap_err();

        assert!(matches!(
            error,
            DependencyError::Reference(ReferenceError::UndefinedService { id, .. }) if id == "missing"
        ));
    }
}
