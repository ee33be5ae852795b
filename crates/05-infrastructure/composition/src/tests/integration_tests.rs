//! 启动构建器集成测试

use crate::builder::{ContainerBootstrapper, LoggingConfig};
use config_abstractions::FieldContract;
use di_abstractions::{ClassesRegistry, Instance, ServiceClass, ServicesContainer};
use infrastructure_common::InfrastructureError;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;

#[derive(Debug)]
struct Greeter {
    greeting: String,
}

fn classes() -> ClassesRegistry {
    ClassesRegistry::new().with(ServiceClass::new("Greeter", |properties| {
        Ok(Arc::new(Greeter {
            greeting: properties.deserialize("greeting")?,
        }) as Instance)
    }))
}

fn app_module() -> Value {
    json!({
        "parameters": {"greeting": "hello"},
        "parameters/prod": {"greeting": "bonjour"},
        "services": {
            "greeter": {"class": "Greeter", "properties": {"greeting": "%greeting%"}}
        }
    })
}

fn lib_module() -> Value {
    json!({
        "parameters": {"greeting": "hi", "suffix": "!"},
        "messages": {"loud": "HEY"},
        "services": {
            "greeter": {"tags": ["greeter"]},
            "loud": {
                "class": "Greeter",
                "properties": {"greeting": "$messages.loud$"},
                "tags": ["greeter"]
            }
        }
    })
}

/// 测试从内存模块构建容器
#[tokio::test]
async fn test_bootstrap_from_inline_modules() {
    let infrastructure = ContainerBootstrapper::new()
        .with_logging(LoggingConfig::development())
        .with_environment("prod")
        .add_inline_module("app", app_module(), 0)
        .add_inline_module("lib", lib_module(), 1)
        .add_section("messages", FieldContract::object())
        .with_classes(classes())
        .build()
        .await
        .unwrap();

    assert_eq!(infrastructure.get_as::<Greeter>("greeter").unwrap().greeting, "bonjour");
    assert_eq!(infrastructure.get_as::<Greeter>("loud").unwrap().greeting, "HEY");
    assert_eq!(infrastructure.container().tagged("greeter"), vec!["greeter", "loud"]);
    assert_eq!(infrastructure.parameter("suffix"), Some(json!("!")));
    assert_eq!(infrastructure.environment(), "prod");
    assert_eq!(infrastructure.modules().len(), 2);
    assert_eq!(infrastructure.stats().definitions, 2);
}

/// 测试没有环境时使用基础配置
#[tokio::test]
async fn test_bootstrap_without_environment() {
    let infrastructure = ContainerBootstrapper::new()
        .add_inline_module("app", app_module(), 0)
        .with_classes(classes())
        .build()
        .await
        .unwrap();

    assert_eq!(infrastructure.get_as::<Greeter>("greeter").unwrap().greeting, "hello");
    assert!(infrastructure.configuration()["services"]["greeter"].is_object());
}

/// 测试从配置文件构建容器
#[tokio::test]
async fn test_bootstrap_from_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(app_module().to_string().as_bytes()).unwrap();

    let infrastructure = ContainerBootstrapper::new()
        .add_module_file(file.path())
        .unwrap()
        .with_classes(classes())
        .build()
        .await
        .unwrap();

    assert!(infrastructure.container().has_definition("greeter"));
    assert_eq!(infrastructure.get_as::<Greeter>("greeter").unwrap().greeting, "hello");
}

/// 测试配置文件不存在
#[test]
fn test_missing_module_file() {
    let result = ContainerBootstrapper::new().add_module_file("/nonexistent/app.json");

    assert!(matches!(result, Err(InfrastructureError::BootstrapFailed { .. })));
}

/// 测试同层模块冲突
#[tokio::test]
async fn test_conflicting_modules_fail() {
    let error = ContainerBootstrapper::new()
        .add_inline_module("a", json!({"parameters": {"timeOut": 1000}}), 1)
        .add_inline_module("b", json!({"parameters": {"timeOut": 2000}}), 1)
        .build()
        .await
        .unwrap_err();

    assert!(matches!(error, InfrastructureError::ConfigError { .. }));
    assert!(error.to_string().contains("module \"b\""));
}

/// 测试未定义的服务引用
#[tokio::test]
async fn test_undefined_reference_fails() {
    let error = ContainerBootstrapper::new()
        .add_inline_module(
            "app",
            json!({"services": {"greeter": {"class": "Greeter", "properties": {"other": "#missing#"}}}}),
            0,
        )
        .with_classes(classes())
        .build()
        .await
        .unwrap_err();

    assert!(matches!(error, InfrastructureError::DependencyError { .. }));
}
