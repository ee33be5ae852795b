//! 服务容器实现

use di_abstractions::{
    BuildContext, CircularDependencyDetector, ClassesRegistry, ConfigContext, ContainerConfig,
    ContainerStats, DefaultCircularDependencyDetector, DefinitionSet, Injection, Instance,
    InstanceProvider, InterfacesRegistry, Properties, PropertyValue, ReferenceResolver,
    ServiceBuilder, ServiceDefinition, ServiceProxy, ServicesContainer,
};
use indexmap::IndexMap;
use infrastructure_common::{DependencyError, ReferenceError};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::builders::default_builders;

/// 原始定义及其声明时的配置上下文
#[derive(Clone)]
struct RawDefinition {
    value: Value,
    origin: Arc<ConfigContext>,
}

/// 服务容器实现
///
/// 每次处理配置都会从全部原始定义重新构建定义集合，失败时保留之前的状态。
pub struct ServicesContainerImpl {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    config: ContainerConfig,
    resolver: Arc<dyn ReferenceResolver>,
    classes: Arc<ClassesRegistry>,
    interfaces: Arc<InterfacesRegistry>,
    detector: DefaultCircularDependencyDetector,
    builders: RwLock<Vec<Box<dyn ServiceBuilder>>>,
    raw: RwLock<IndexMap<String, RawDefinition>>,
    definitions: RwLock<DefinitionSet>,
    instances: RwLock<HashMap<String, Instance>>,
    /// 实例化锁及当前线程的构建栈
    ///
    /// 同一时间只有一个线程在实例化服务，持锁线程可以重入。
    build_lock: ReentrantMutex<RefCell<Vec<String>>>,
    last_processed_at: RwLock<Option<chrono::DateTime<chrono::Utc>>>,
    this: Weak<ContainerInner>,
}

/// 构建栈守卫，持有实例化锁，离开作用域时弹出自己压入的条目
struct BuildGuard<'a> {
    stack: ReentrantMutexGuard<'a, RefCell<Vec<String>>>,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

impl ServicesContainerImpl {
    /// 创建容器，不包含任何构建器
    pub fn new(
        resolver: Arc<dyn ReferenceResolver>,
        classes: Arc<ClassesRegistry>,
        interfaces: Arc<InterfacesRegistry>,
    ) -> Self {
        Self::with_config(ContainerConfig::default(), resolver, classes, interfaces)
    }

    /// 使用指定配置创建容器
    pub fn with_config(
        config: ContainerConfig,
        resolver: Arc<dyn ReferenceResolver>,
        classes: Arc<ClassesRegistry>,
        interfaces: Arc<InterfacesRegistry>,
    ) -> Self {
        let inner = Arc::new_cyclic(|this| ContainerInner {
            config,
            resolver,
            classes,
            interfaces,
            detector: DefaultCircularDependencyDetector,
            builders: RwLock::new(Vec::new()),
            raw: RwLock::new(IndexMap::new()),
            definitions: RwLock::new(DefinitionSet::new()),
            instances: RwLock::new(HashMap::new()),
            build_lock: ReentrantMutex::new(RefCell::new(Vec::new())),
            last_processed_at: RwLock::new(None),
            this: this.clone(),
        });

        Self { inner }
    }

    /// 添加全部内置构建器
    pub fn with_default_builders(self) -> Self {
        for builder in default_builders() {
            self.add_service_builder(builder);
        }
        self
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }
}

impl fmt::Debug for ServicesContainerImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicesContainerImpl")
            .field("config", &self.inner.config)
            .field("definitions", &self.inner.definitions.read().len())
            .field("instances", &self.inner.instances.read().len())
            .finish()
    }
}

impl ContainerInner {
    fn rebuild(
        &self,
        raw: &IndexMap<String, RawDefinition>,
        is_final: bool,
    ) -> Result<DefinitionSet, DependencyError> {
        let mut definitions = DefinitionSet::new();
        for (id, definition) in raw {
            definitions.insert(ServiceDefinition::from_value(
                id,
                &definition.value,
                definition.origin.clone(),
            )?);
        }

        let context = BuildContext {
            resolver: self.resolver.as_ref(),
            classes: &self.classes,
            interfaces: &self.interfaces,
            is_final,
        };

        for builder in self.builders.read().iter() {
            debug!("执行构建阶段: {} ({:?})", builder.name(), builder.stage());
            builder.process(&mut definitions, &context)?;
        }

        if is_final {
            self.validate(&definitions)?;
        }

        Ok(definitions)
    }

    /// 校验服务引用都已定义，并检测静态循环依赖
    fn validate(&self, definitions: &DefinitionSet) -> Result<(), DependencyError> {
        for definition in definitions.iter().filter(|d| d.is_instantiable()) {
            for injection in definition.injections.values() {
                if let Some(id) = injection.services().into_iter().find(|id| !definitions.contains(id)) {
                    return Err(ReferenceError::UndefinedService {
                        reference: format!("#{id}#"),
                        id: id.to_string(),
                        label: definition.label(),
                    }
                    .into());
                }
            }
        }

        if self.config.enable_circular_dependency_detection {
            let graph = self.detector.build_dependency_graph(definitions);
            self.detector.detect_circular_dependencies(&graph)?;
        }

        Ok(())
    }

    /// 获取实例化锁并把 `key` 压入当前线程的构建栈
    fn enter(&self, key: &str) -> Result<BuildGuard<'_>, DependencyError> {
        let guard = self.build_lock.lock();

        {
            let mut stack = guard.borrow_mut();
            if let Some(position) = stack.iter().position(|s| s == key) {
                let mut cycle = stack[position..].to_vec();
                cycle.push(key.to_string());
                return Err(DependencyError::CircularDependency { cycle });
            }
            if stack.len() >= self.config.max_resolution_depth {
                return Err(DependencyError::ResolutionDepthExceeded {
                    id: key.to_string(),
                    max_depth: self.config.max_resolution_depth,
                });
            }
            stack.push(key.to_string());
        }

        Ok(BuildGuard { stack: guard })
    }

    fn get(&self, id: &str) -> Result<Instance, DependencyError> {
        if let Some(instance) = self.instances.read().get(id) {
            return Ok(instance.clone());
        }

        let definition = self
            .definitions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| DependencyError::ServiceNotFound { id: id.to_string() })?;

        if let Some(target) = &definition.alias {
            let _guard = self.enter(id)?;
            return self.get(target);
        }
        if definition.is_abstract || definition.template {
            return Err(DependencyError::AbstractService { id: id.to_string() });
        }

        let _guard = self.enter(id)?;
        // 等锁期间可能已由其他线程构建完成
        if let Some(instance) = self.instances.read().get(id) {
            return Ok(instance.clone());
        }
        let instance = self.instantiate(
            id,
            &definition.label(),
            definition.class.as_deref(),
            &definition.injections,
        )?;

        self.instances.write().insert(id.to_string(), instance.clone());
        debug!("服务已实例化: {}", id);

        Ok(instance)
    }

    /// 按注入计划构造实例，`label` 用于描述引用所在的定义
    fn instantiate(
        &self,
        id: &str,
        label: &str,
        class_name: Option<&str>,
        injections: &IndexMap<String, Injection>,
    ) -> Result<Instance, DependencyError> {
        let class_name = class_name.ok_or_else(|| DependencyError::MissingClass { id: id.to_string() })?;
        let class = self
            .classes
            .get(class_name)
            .ok_or_else(|| DependencyError::ClassNotRegistered {
                id: id.to_string(),
                class: class_name.to_string(),
            })?;
        let constructor = class
            .constructor()
            .filter(|_| !class.is_abstract())
            .ok_or_else(|| DependencyError::AbstractClass {
                id: id.to_string(),
                class: class_name.to_string(),
            })?;

        let mut values = IndexMap::with_capacity(injections.len());
        for (name, injection) in injections {
            if let Some(interface) = class.dependencies().get(name) {
                self.check_interface(id, name, interface, injection)?;
            }
            values.insert(name.clone(), self.materialize(injection, label)?);
        }

        (**constructor)(&Properties::new(id, values)).map_err(|e| {
            DependencyError::ComponentCreationFailed {
                id: id.to_string(),
                source: e.into(),
            }
        })
    }

    fn materialize(&self, injection: &Injection, label: &str) -> Result<PropertyValue, DependencyError> {
        Ok(match injection {
            Injection::Data(value) => PropertyValue::Data(value.clone()),
            Injection::Service(target) => {
                if !self.definitions.read().contains(target) && !self.instances.read().contains_key(target) {
                    return Err(ReferenceError::UndefinedService {
                        reference: format!("#{target}#"),
                        id: target.clone(),
                        label: label.to_string(),
                    }
                    .into());
                }
                self.get(target)?;
                PropertyValue::Service(self.proxy(target))
            }
            Injection::Tag(tag) => {
                let members = self.definitions.read().tagged(tag).to_vec();
                let mut proxies = Vec::with_capacity(members.len());
                for member in members {
                    self.get(&member)?;
                    proxies.push(PropertyValue::Service(self.proxy(&member)));
                }
                PropertyValue::List(proxies)
            }
            Injection::Factory(call) => {
                let properties = call.properties.as_ref().ok_or_else(|| {
                    DependencyError::ServiceNotFound {
                        id: call.target.clone(),
                    }
                })?;
                let (class_name, target_label) = match self.definitions.read().get(&call.target) {
                    Some(definition) => (definition.class.clone(), definition.label()),
                    None => (None, label.to_string()),
                };

                // 工厂实例按调用方分别构建，以 `目标>调用方` 入栈
                let _guard = self.enter(&format!("{}>{}", call.target, call.caller))?;
                PropertyValue::Instance(self.instantiate(
                    &call.target,
                    &target_label,
                    class_name.as_deref(),
                    properties,
                )?)
            }
            Injection::List(items) => PropertyValue::List(
                items
                    .iter()
                    .map(|item| self.materialize(item, label))
                    .collect::<Result<_, _>>()?,
            ),
            Injection::Map(entries) => PropertyValue::Map(
                entries
                    .iter()
                    .map(|(key, item)| Ok((key.clone(), self.materialize(item, label)?)))
                    .collect::<Result<_, DependencyError>>()?,
            ),
        })
    }

    fn proxy(&self, id: &str) -> ServiceProxy {
        let provider: Weak<dyn InstanceProvider> = self.this.clone();
        ServiceProxy::new(id, provider)
    }

    /// 校验注入的服务实现了类声明的接口
    fn check_interface(
        &self,
        id: &str,
        property: &str,
        interface: &str,
        injection: &Injection,
    ) -> Result<(), DependencyError> {
        let definitions = self.definitions.read();

        for target in injected_targets(injection, &definitions) {
            let Some(class_name) = resolve_class(&definitions, &target) else {
                continue;
            };
            let Some(class) = self.classes.get(&class_name) else {
                continue;
            };
            if !self.interfaces.class_implements(class, interface) {
                return Err(DependencyError::InterfaceNotImplemented {
                    id: id.to_string(),
                    property: property.to_string(),
                    target,
                    interface: interface.to_string(),
                });
            }
        }

        Ok(())
    }

    fn has(&self, id: &str) -> bool {
        let mut visited = HashSet::new();
        let mut current = id.to_string();

        loop {
            if self.instances.read().contains_key(&current) {
                return true;
            }
            if !visited.insert(current.clone()) {
                return false;
            }
            match self.definitions.read().get(&current).and_then(|d| d.alias.clone()) {
                Some(target) => current = target,
                None => return false,
            }
        }
    }
}

impl InstanceProvider for ContainerInner {
    fn provide(&self, id: &str) -> Result<Instance, DependencyError> {
        self.get(id)
    }
}

/// 属性直接注入的服务标识（不进入工厂属性内部）
fn injected_targets(injection: &Injection, definitions: &DefinitionSet) -> Vec<String> {
    match injection {
        Injection::Data(_) => Vec::new(),
        Injection::Service(id) => vec![id.clone()],
        Injection::Tag(tag) => definitions.tagged(tag).to_vec(),
        Injection::Factory(call) => vec![call.target.clone()],
        Injection::List(items) => items
            .iter()
            .flat_map(|item| injected_targets(item, definitions))
            .collect(),
        Injection::Map(entries) => entries
            .values()
            .flat_map(|item| injected_targets(item, definitions))
            .collect(),
    }
}

/// 沿别名链查找服务的类
fn resolve_class(definitions: &DefinitionSet, id: &str) -> Option<String> {
    let mut visited = HashSet::new();
    let mut current = definitions.get(id)?;

    while let Some(target) = &current.alias {
        if !visited.insert(target.clone()) {
            return None;
        }
        current = definitions.get(target)?;
    }

    current.class.clone()
}

impl ServicesContainer for ServicesContainerImpl {
    fn add_service_builder(&self, builder: Box<dyn ServiceBuilder>) {
        let mut builders = self.inner.builders.write();
        debug!("添加服务构建器: {} ({:?})", builder.name(), builder.stage());
        builders.push(builder);
        builders.sort_by_key(|b| b.stage());
    }

    fn process_configuration(
        &self,
        services: &Value,
        config: &Value,
        is_final: bool,
    ) -> Result<(), DependencyError> {
        let services = services.as_object().ok_or_else(|| {
            DependencyError::invalid_definition(
                "services",
                format!(
                    "expected an object, got {}",
                    infrastructure_common::value::type_name(services)
                ),
            )
        })?;

        let origin = Arc::new(ConfigContext::new(config.clone()));
        let mut raw = self.inner.raw.read().clone();
        for (id, value) in services {
            raw.insert(
                id.clone(),
                RawDefinition {
                    value: value.clone(),
                    origin: origin.clone(),
                },
            );
        }

        let definitions = match self.inner.rebuild(&raw, is_final) {
            Ok(definitions) => definitions,
            Err(e) => {
                warn!("处理服务配置失败: {}", e);
                return Err(e);
            }
        };

        {
            let mut current = self.inner.definitions.write();
            let mut instances = self.inner.instances.write();
            instances.retain(|id, _| match (current.get(id), definitions.get(id)) {
                (None, None) => true,
                (previous, next) => previous == next,
            });
            *current = definitions;
        }
        *self.inner.raw.write() = raw;
        *self.inner.last_processed_at.write() = Some(chrono::Utc::now());

        info!(
            "服务配置处理完成: {} 个定义 (最终: {})",
            self.inner.definitions.read().len(),
            is_final
        );
        Ok(())
    }

    fn has_definition(&self, id: &str) -> bool {
        self.inner.definitions.read().contains(id)
    }

    fn definition_ids(&self) -> Vec<String> {
        self.inner.definitions.read().ids()
    }

    fn definition(&self, id: &str) -> Option<ServiceDefinition> {
        self.inner.definitions.read().get(id).cloned()
    }

    fn has(&self, id: &str) -> bool {
        self.inner.has(id)
    }

    fn get(&self, id: &str) -> Result<Instance, DependencyError> {
        self.inner.get(id)
    }

    fn set(&self, id: &str, instance: Instance) {
        info!("设置服务实例: {}", id);
        self.inner.instances.write().insert(id.to_string(), instance);
    }

    fn unset(&self, id: &str) -> Result<(), DependencyError> {
        let removed = self.inner.instances.write().remove(id);

        if !self.inner.definitions.read().contains(id) {
            if removed.is_none() {
                return Err(DependencyError::ServiceNotFound { id: id.to_string() });
            }
            self.inner.definitions.write().remove_from_tags(id);
        }

        info!("移除服务实例: {}", id);
        Ok(())
    }

    fn tagged(&self, tag: &str) -> Vec<String> {
        self.inner.definitions.read().tagged(tag).to_vec()
    }

    fn stats(&self) -> ContainerStats {
        let definitions = self.inner.definitions.read();

        ContainerStats {
            definitions: definitions.len(),
            instances: self.inner.instances.read().len(),
            tags: definitions.tags().len(),
            last_processed_at: *self.inner.last_processed_at.read(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReferenceResolverImpl;
    use di_abstractions::ServiceClass;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[derive(Debug)]
    struct Named {
        name: String,
    }

    fn container() -> ServicesContainerImpl {
        let classes = ClassesRegistry::new().with(ServiceClass::new("Named", |properties| {
            Ok(Arc::new(Named {
                name: properties.str("name").unwrap_or_default().to_string(),
            }) as Instance)
        }));

        ServicesContainerImpl::new(
            Arc::new(ReferenceResolverImpl::with_default_types()),
            Arc::new(classes),
            Arc::new(InterfacesRegistry::new()),
        )
        .with_default_builders()
    }

    #[test]
    fn test_get_caches_instances() {
        let container = container();
        container
            .process_configuration(
                &json!({"a": {"class": "Named", "properties": {"name": "%name%"}}}),
                &json!({"parameters": {"name": "first"}}),
                true,
            )
            .unwrap();

        let first = container.get("a").unwrap();
        let second = container.get("a").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(container.get_as::<Named>("a").unwrap().name, "first");
        assert_eq!(container.stats().instances, 1);
        assert!(container.stats().last_processed_at.is_some());
    }

    #[test]
    fn test_failed_processing_keeps_previous_state() {
        let container = container();
        container
            .process_configuration(&json!({"a": {"class": "Named"}}), &json!({}), true)
            .unwrap();

        let error = container
            .process_configuration(&json!({"b": {"class": "Missing"}}), &json!({}), true)
            .unwrap_err();

        assert!(matches!(error, DependencyError::ClassNotRegistered { .. }));
        assert!(container.has_definition("a"));
        assert!(!container.has_definition("b"));
    }

    #[test]
    fn test_changed_definition_drops_cached_instance() {
        let container = container();
        let services = json!({"a": {"class": "Named", "properties": {"name": "%name%"}}});
        container
            .process_configuration(&services, &json!({"parameters": {"name": "first"}}), true)
            .unwrap();
        assert_eq!(container.get_as::<Named>("a").unwrap().name, "first");

        container
            .process_configuration(&services, &json!({"parameters": {"name": "second"}}), true)
            .unwrap();

        assert!(!container.has("a"));
        assert_eq!(container.get_as::<Named>("a").unwrap().name, "second");
    }

    #[test]
    fn test_runtime_cycle_detection() {
        let container = container();
        container
            .process_configuration(
                &json!({
                    "a": {"class": "Named", "properties": {"b": "#b#"}},
                    "b": {"class": "Named", "properties": {"a": "#a#"}}
                }),
                &json!({}),
                false,
            )
            .unwrap();

        match container.get("a").unwrap_err() {
            DependencyError::CircularDependency { cycle } => assert_eq!(cycle, vec!["a", "b", "a"]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(container.inner.build_lock.lock().borrow().is_empty());
    }

    #[test]
    fn test_concurrent_get_builds_a_singleton_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let classes = ClassesRegistry::new().with(ServiceClass::new("Slow", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(200));
            Ok(Arc::new(()) as Instance)
        }));
        let container = Arc::new(
            ServicesContainerImpl::new(
                Arc::new(ReferenceResolverImpl::with_default_types()),
                Arc::new(classes),
                Arc::new(InterfacesRegistry::new()),
            )
            .with_default_builders(),
        );
        container
            .process_configuration(&json!({"a": {"class": "Slow"}}), &json!({}), true)
            .unwrap();

        let background = {
            let container = container.clone();
            thread::spawn(move || container.get("a"))
        };
        thread::sleep(Duration::from_millis(50));
        let second = container.get("a").unwrap();
        let first = background.join().unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(container.inner.build_lock.lock().borrow().is_empty());
    }

    #[test]
    fn test_factory_target_reached_through_another_caller() {
        let container = container();
        container
            .process_configuration(
                &json!({
                    "t": {
                        "class": "Named",
                        "abstract": true,
                        "factories": {
                            "p": {"properties": {"dep": "#z#"}},
                            "z": {}
                        }
                    },
                    "p": {"class": "Named", "properties": {"x": ">t>p> >"}},
                    "z": {"class": "Named", "properties": {"x": ">t>z> >"}}
                }),
                &json!({}),
                true,
            )
            .unwrap();

        assert!(container.get("p").is_ok());
        assert!(container.has("z"));
        assert!(container.inner.build_lock.lock().borrow().is_empty());
    }

    #[test]
    fn test_undefined_reference_is_reported_on_get() {
        let container = container();
        container
            .process_configuration(
                &json!({"a": {"class": "Named", "properties": {"b": "#x#"}}}),
                &json!({}),
                false,
            )
            .unwrap();

        let error = container.get("a").unwrap_err();

        assert!(matches!(
            error,
            DependencyError::Reference(ReferenceError::UndefinedService { ref id, .. }) if id == "x"
        ));
        assert_eq!(
            error.to_string(),
            "The reference \"#x#\" declared in the definition of the service \"a\" targets the undefined service \"x\"."
        );
    }

    #[test]
    fn test_set_and_unset_without_definition() {
        let container = container();
        container.set("external", Arc::new(Named { name: "x".into() }));

        assert!(container.has("external"));
        assert!(container.unset("external").is_ok());
        assert!(!container.has("external"));
        assert!(matches!(
            container.unset("external"),
            Err(DependencyError::ServiceNotFound { .. })
        ));
    }
}
