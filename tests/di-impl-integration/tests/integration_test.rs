//! 服务容器的集中集成测试
//!
//! 覆盖衍生定义、子定义、父定义、工厂调用、标签、代理和错误信息的完整场景。

use di_abstractions::{
    ClassesRegistry, Instance, Interface, InterfacesRegistry, Properties, ServiceClass,
    ServiceProxy, ServicesContainer,
};
use di_impl::{ReferenceResolverImpl, ServicesContainerImpl};
use infrastructure_common::DependencyError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// 提供者
#[derive(Debug)]
struct Provider {
    id: String,
    name: String,
    rules: Vec<Arc<Rule>>,
    storages: Vec<ServiceProxy>,
    adapter: ServiceProxy,
}

impl Provider {
    fn provide(&self) -> &str {
        &self.name
    }
}

/// 管理器，按提供者的 `id` 索引提供者
#[derive(Debug)]
struct Manager {
    providers: HashMap<String, ServiceProxy>,
    storages: Vec<ServiceProxy>,
    time_out: u64,
}

#[derive(Debug)]
struct Rule {
    name: String,
    parameters: Vec<Arc<Parameter>>,
}

#[derive(Debug)]
struct Parameter {
    name: String,
    value: Value,
}

#[derive(Debug)]
struct Storage {
    name: String,
    size: String,
    kind: String,
}

#[derive(Debug)]
struct Adapter {
    name: String,
}

fn downcast_all<T: Send + Sync + 'static>(instances: Vec<Instance>) -> anyhow::Result<Vec<Arc<T>>> {
    instances
        .into_iter()
        .map(|instance| {
            instance
                .downcast::<T>()
                .map_err(|_| anyhow::anyhow!("unexpected instance type"))
        })
        .collect()
}

fn rule_class(class: &'static str, name: &'static str) -> ServiceClass {
    ServiceClass::new(class, move |properties: &Properties| {
        Ok(Arc::new(Rule {
            name: name.to_string(),
            parameters: downcast_all(properties.instances("parameters"))?,
        }) as Instance)
    })
}

fn parameter_class(class: &'static str, name: &'static str) -> ServiceClass {
    ServiceClass::new(class, move |properties: &Properties| {
        Ok(Arc::new(Parameter {
            name: name.to_string(),
            value: properties.value("value").cloned().unwrap_or(Value::Null),
        }) as Instance)
    })
}

fn storage_class(class: &'static str, name: &'static str) -> ServiceClass {
    ServiceClass::new(class, move |properties: &Properties| {
        Ok(Arc::new(Storage {
            name: name.to_string(),
            size: properties.deserialize("size")?,
            kind: properties.deserialize("type")?,
        }) as Instance)
    })
}

fn classes() -> ClassesRegistry {
    ClassesRegistry::new()
        .with(
            ServiceClass::new("Provider", |properties| {
                let adapter = properties
                    .service("adapter")
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("missing adapter"))?;

                Ok(Arc::new(Provider {
                    id: properties.deserialize("id")?,
                    name: "provider".to_string(),
                    rules: downcast_all(properties.instances("rules"))?,
                    storages: properties.services("storages"),
                    adapter,
                }) as Instance)
            })
            .implements("provider"),
        )
        .with(
            ServiceClass::new("Manager", |properties| {
                let mut providers = HashMap::new();
                for proxy in properties.services("providers") {
                    let provider = proxy.get_as::<Provider>()?;
                    providers.insert(provider.id.clone(), proxy);
                }

                Ok(Arc::new(Manager {
                    providers,
                    storages: properties.services("storages"),
                    time_out: properties.deserialize("timeOut")?,
                }) as Instance)
            })
            .depends_on("providers", "provider"),
        )
        .with(rule_class("RuleMinSize", "rule minSize"))
        .with(rule_class("RuleMaxSize", "rule maxSize"))
        .with(parameter_class("ParameterSize", "parameter size"))
        .with(parameter_class("ParameterUnit", "parameter unit"))
        .with(storage_class("LocalStorage", "local storage"))
        .with(storage_class("RemoteStorage", "remote storage"))
        .with(ServiceClass::new("ImageAdapter", |_| {
            Ok(Arc::new(Adapter {
                name: "adapter image".to_string(),
            }) as Instance)
        }))
        .with(ServiceClass::new("Empty", |_| Ok(Arc::new(()) as Instance)))
        .with(ServiceClass::abstract_class("A"))
}

fn interfaces() -> InterfacesRegistry {
    InterfacesRegistry::new().with(Interface::new("provider").method("provide"))
}

fn config() -> Value {
    json!({
        "services": {
            "manager": {
                "class": "Manager",
                "properties": {
                    "providers": "&provider&",
                    "storages": "&storage&",
                    "timeOut": "$timeOut$"
                }
            },
            "provider": {
                "class": "Provider",
                "declinations": "$providers$",
                "properties": {
                    "id": "@_@",
                    "rules": ">rule.@rules@>provider>@@rules.@rules@@@>",
                    "storages": "#storage.@storages@#",
                    "adapter": "#@adapter@#"
                },
                "tags": ["provider"]
            },
            "rule": {
                "factories": {
                    "provider": {
                        "properties": {
                            "parameters": ">parameter.@parameters.type@>rule>@@parameters.@parameters@@@>"
                        }
                    }
                },
                "children": {
                    "minSize": {"class": "RuleMinSize", "abstract": true},
                    "maxSize": {"class": "RuleMaxSize", "abstract": true}
                }
            },
            "adapter": {
                "children": {
                    "image": {"class": "ImageAdapter"}
                }
            },
            "parameter.size": {
                "class": "ParameterSize",
                "abstract": true,
                "factories": {"rule": {"properties": {"value": "@value@"}}}
            },
            "parameter.unit": {
                "class": "ParameterUnit",
                "abstract": true,
                "factories": {"rule": {"properties": {"value": "@value@"}}}
            },
            "abstractStorage": {
                "abstract": true,
                "properties": {"size": "2GB", "type": "SD"}
            },
            "storage": {
                "parent": "abstractStorage",
                "tags": ["storage"],
                "properties": {"type": "HD"},
                "children": {
                    "local": {"class": "LocalStorage"},
                    "remote": {"class": "RemoteStorage"}
                }
            }
        },
        "providers": {
            "smallImages": {
                "rules": {
                    "maxSize": {"parameters": [{"type": "size", "value": "2m"}]}
                },
                "storages": ["local"],
                "adapter": "adapter.image"
            },
            "bigImages": {
                "rules": {
                    "minSize": {"parameters": [
                        {"type": "size", "value": 2},
                        {"type": "unit", "value": "m"}
                    ]},
                    "maxSize": {"parameters": [
                        {"type": "size", "value": 10},
                        {"type": "unit", "value": "m"}
                    ]}
                },
                "storages": ["local", "remote"],
                "adapter": "adapter.image"
            }
        },
        "timeOut": 2000
    })
}

fn container() -> ServicesContainerImpl {
    ServicesContainerImpl::new(
        Arc::new(ReferenceResolverImpl::with_default_types()),
        Arc::new(classes()),
        Arc::new(interfaces()),
    )
    .with_default_builders()
}

fn configured_container() -> ServicesContainerImpl {
    let container = container();
    let config = config();
    container
        .process_configuration(&config["services"], &config, true)
        .unwrap();
    container
}

fn parameters(rule: &Rule) -> Vec<(String, Value)> {
    rule.parameters
        .iter()
        .map(|parameter| (parameter.name.clone(), parameter.value.clone()))
        .collect()
}

#[test]
fn test_process_configuration_defines_services() {
    let container = configured_container();

    assert!(container.has_definition("manager"));
    assert!(container.has_definition("provider"));
    assert!(container.has_definition("provider.bigImages"));
    assert!(container.has_definition("storage.local"));
    assert!(container.has_definition("adapter.image"));
    assert_eq!(
        container.tagged("provider"),
        vec!["provider.smallImages", "provider.bigImages"]
    );
    assert_eq!(container.tagged("storage"), vec!["storage.local", "storage.remote"]);
}

#[test]
fn test_get_injects_resolved_dependencies() {
    let container = configured_container();

    let provider = container.get_as::<Provider>("provider.bigImages").unwrap();

    assert_eq!(provider.id, "bigImages");
    assert_eq!(provider.name, "provider");

    assert_eq!(provider.rules.len(), 2);
    assert_eq!(provider.rules[0].name, "rule minSize");
    assert_eq!(
        parameters(&provider.rules[0]),
        vec![
            ("parameter size".to_string(), json!(2)),
            ("parameter unit".to_string(), json!("m")),
        ]
    );
    assert_eq!(provider.rules[1].name, "rule maxSize");
    assert_eq!(
        parameters(&provider.rules[1]),
        vec![
            ("parameter size".to_string(), json!(10)),
            ("parameter unit".to_string(), json!("m")),
        ]
    );

    let storages: Vec<Arc<Storage>> = provider
        .storages
        .iter()
        .map(|proxy| proxy.get_as::<Storage>().unwrap())
        .collect();
    assert_eq!(storages.len(), 2);
    assert_eq!(storages[0].name, "local storage");
    assert_eq!(storages[1].name, "remote storage");
    for storage in &storages {
        assert_eq!(storage.size, "2GB");
        assert_eq!(storage.kind, "HD");
    }

    assert_eq!(provider.adapter.get_as::<Adapter>().unwrap().name, "adapter image");
}

#[test]
fn test_declined_services_use_their_own_context() {
    let container = configured_container();

    let provider = container.get_as::<Provider>("provider.smallImages").unwrap();

    assert_eq!(provider.id, "smallImages");
    assert_eq!(provider.rules.len(), 1);
    assert_eq!(provider.rules[0].name, "rule maxSize");
    assert_eq!(
        parameters(&provider.rules[0]),
        vec![("parameter size".to_string(), json!("2m"))]
    );
    assert_eq!(
        provider.storages.iter().map(ServiceProxy::id).collect::<Vec<_>>(),
        vec!["storage.local"]
    );
}

#[test]
fn test_get_returns_the_same_instance() {
    let container = configured_container();

    let first = container.get("provider.bigImages").unwrap();
    let second = container.get("provider.bigImages").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_tags_are_resolved_to_proxies() {
    let container = configured_container();

    let manager = container.get_as::<Manager>("manager").unwrap();

    assert!(manager.providers.contains_key("bigImages"));
    assert!(manager.providers.contains_key("smallImages"));
    assert_eq!(manager.storages.len(), 2);
    assert_eq!(manager.time_out, 2000);
    assert_eq!(manager.providers["bigImages"].id(), "provider.bigImages");

    let provider = manager.providers["bigImages"].get_as::<Provider>().unwrap();
    assert_eq!(provider.provide(), "provider");
}

#[test]
fn test_unresolved_declinations_reference() {
    let container = configured_container();
    let mut config = config();
    config["services"]["provider"]["declinations"] = json!("$providersTypo$");

    let error = container
        .process_configuration(&config["services"], &config, true)
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "The reference \"$providersTypo$\" in source \"$providersTypo$\" declared in the definition of the service \"provider\" cannot be resolved."
    );
    assert!(container.get("provider.bigImages").is_ok());
}

#[test]
fn test_unresolved_reference_among_several() {
    let container = configured_container();
    let mut config = config();
    config["services"]["provider"]["properties"]["rules"] =
        json!(">rule.@rulesTypo@>provider>@@rules.@rules@@@>");

    let error = container
        .process_configuration(&config["services"], &config, true)
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "One of the references \"@rulesTypo@\", \"@rules@\" in source \">rule.@rulesTypo@>provider>@@rules.@rules@@@>\" declared in the definition of the service \"provider.smallImages\" cannot be resolved."
    );
}

#[test]
fn test_abstract_service_cannot_be_instantiated() {
    let container = container();
    container
        .process_configuration(
            &json!({"a": {"class": "Empty", "abstract": true}}),
            &json!({}),
            true,
        )
        .unwrap();

    assert_eq!(
        container.get("a").unwrap_err().to_string(),
        "The service of id \"a\" is an abstract service and cannot be instantiated."
    );
}

#[test]
fn test_abstract_class_cannot_be_instantiated() {
    let container = container();
    container
        .process_configuration(&json!({"a": {"class": "A"}}), &json!({}), true)
        .unwrap();

    assert_eq!(
        container.get("a").unwrap_err().to_string(),
        "The service \"a\" could not be instantiated because its class \"A\" is an abstract class."
    );
}

#[test]
fn test_circular_dependency_is_detected() {
    let container = configured_container();

    let error = container
        .process_configuration(
            &json!({
                "a": {"class": "Empty", "properties": {"b": "#b#"}},
                "b": {"class": "Empty", "properties": {"c": "#c#"}},
                "c": {"class": "Empty", "properties": {"a": "#a#"}}
            }),
            &json!({}),
            true,
        )
        .unwrap_err();

    assert!(matches!(error, DependencyError::CircularDependency { .. }));
    assert_eq!(
        error.to_string(),
        "The circular dependency [\"a\" -> \"b\" -> \"c\" -> \"a\"] prevent to build the service \"a\"."
    );
    assert!(!container.has_definition("a"));
}

#[test]
fn test_set_replaces_an_instantiated_service() {
    let container = configured_container();
    let provider = container.get_as::<Provider>("provider.bigImages").unwrap();
    assert_eq!(
        provider.storages[0].get_as::<Storage>().unwrap().name,
        "local storage"
    );

    container.set(
        "storage.local",
        Arc::new(Storage {
            name: "local super storage".to_string(),
            size: "4GB".to_string(),
            kind: "SSD".to_string(),
        }),
    );

    let provider = container.get_as::<Provider>("provider.bigImages").unwrap();
    assert_eq!(
        provider.storages[0].get_as::<Storage>().unwrap().name,
        "local super storage"
    );
}

#[test]
fn test_unset_removes_an_instantiated_service() {
    let container = configured_container();
    container.get("provider.bigImages").unwrap();

    assert!(container.has("storage.local"));
    container.unset("storage.local").unwrap();
    assert!(!container.has("storage.local"));

    // 定义仍在，再次获取时重新构建
    assert_eq!(
        container.get_as::<Storage>("storage.local").unwrap().name,
        "local storage"
    );
}

#[test]
fn test_reprocessing_keeps_unchanged_instances() {
    let container = configured_container();
    let first = container.get("manager").unwrap();
    let config = config();

    container
        .process_configuration(&config["services"], &config, true)
        .unwrap();

    assert!(Arc::ptr_eq(&first, &container.get("manager").unwrap()));
    assert!(container.stats().instances >= 1);
}

#[test]
fn test_factory_target_is_built_per_caller() {
    let container = container();
    container
        .process_configuration(
            &json!({
                "limit": {
                    "class": "ParameterSize",
                    "abstract": true,
                    "properties": {"value": 1},
                    "factories": {
                        "small": {"properties": {"value": 2}},
                        "big": {"properties": {"value": 10}}
                    }
                },
                "small": {"class": "RuleMinSize", "properties": {"parameters": [">limit>small> >"]}},
                "big": {"class": "RuleMaxSize", "properties": {"parameters": [">limit>big> >"]}}
            }),
            &json!({}),
            true,
        )
        .unwrap();

    let small = container.get_as::<Rule>("small").unwrap();
    let big = container.get_as::<Rule>("big").unwrap();

    assert_eq!(
        parameters(&small),
        vec![("parameter size".to_string(), json!(2))]
    );
    assert_eq!(
        parameters(&big),
        vec![("parameter size".to_string(), json!(10))]
    );
    assert!(!Arc::ptr_eq(&small.parameters[0], &big.parameters[0]));
}
