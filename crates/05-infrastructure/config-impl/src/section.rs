//! 配置节处理实现

use config_abstractions::{
    DataResolver, FieldContract, FieldType, Module, ModulesTree, ResolveOptions, SectionProcessor,
};
use infrastructure_common::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// 默认的配置节处理器
///
/// 同一层级内各模块的配置以不可覆盖的方式合并，环境配置覆盖基础配置，
/// 最后由数值较小的层级覆盖较大的层级，并在结果上填充默认值。
pub struct SectionProcessorImpl {
    name: String,
    contract: Option<FieldContract>,
    resolver: Arc<dyn DataResolver>,
}

impl SectionProcessorImpl {
    /// 创建处理器，`contract` 描述整个配置节
    pub fn new(name: impl Into<String>, contract: FieldContract, resolver: Arc<dyn DataResolver>) -> Self {
        Self {
            name: name.into(),
            contract: Some(contract),
            resolver,
        }
    }

    /// 创建没有契约的处理器，处理时报错
    pub fn without_contract(name: impl Into<String>, resolver: Arc<dyn DataResolver>) -> Self {
        Self {
            name: name.into(),
            contract: None,
            resolver,
        }
    }

    fn section_names(&self, environment: &str) -> Vec<String> {
        let mut names = vec![self.name.clone()];
        if !environment.is_empty() {
            names.push(format!("{}/{environment}", self.name));
        }
        names
    }

    fn process_level(
        &self,
        modules: &[Module],
        names: &[String],
        contract: &FieldContract,
    ) -> ConfigResult<Value> {
        let overwrite = ResolveOptions {
            module: None,
            disable_default: true,
        };
        let mut level_config = Value::Null;

        for name in names {
            let mut env_config = Value::Null;

            for module in modules {
                let Some(value) = module.section(name) else {
                    continue;
                };

                let options = ResolveOptions::for_module(&module.id);
                let value = self
                    .resolver
                    .resolve(value, contract, &self.name, &options)
                    .map_err(|error| error.in_module(&module.id))?;
                env_config = self
                    .resolver
                    .merge(&env_config, &value, contract, false, &self.name, &options)
                    .map_err(|error| error.in_module(&module.id))?;
            }

            level_config = self
                .resolver
                .merge(&level_config, &env_config, contract, true, &self.name, &overwrite)?;
        }

        Ok(level_config)
    }
}

impl std::fmt::Debug for SectionProcessorImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionProcessorImpl")
            .field("name", &self.name)
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}

impl SectionProcessor for SectionProcessorImpl {
    fn name(&self) -> &str {
        &self.name
    }

    fn contract(&self) -> Option<&FieldContract> {
        self.contract.as_ref()
    }

    fn process(&self, modules: &ModulesTree, environment: &str) -> ConfigResult<Value> {
        let contract = self.contract.as_ref().ok_or_else(|| ConfigError::MissingContract {
            section: self.name.clone(),
        })?;
        let names = self.section_names(environment);

        let mut levels = Vec::new();
        for (level, level_modules) in modules.levels() {
            let level_config = self.process_level(level_modules, &names, contract)?;
            debug!(
                "配置节 {} 第 {} 层处理完成，模块数: {}",
                self.name,
                level,
                level_modules.len()
            );
            levels.push(level_config);
        }

        // 低层级覆盖高层级
        let overwrite = ResolveOptions {
            module: None,
            disable_default: true,
        };
        let mut config = Value::Null;
        for level_config in &levels {
            config = self
                .resolver
                .merge(level_config, &config, contract, true, &self.name, &overwrite)?;
        }

        if config.is_null() {
            config = empty_value(contract);
        }

        self.resolver
            .resolve(&config, contract, &self.name, &ResolveOptions::default())
    }
}

fn empty_value(contract: &FieldContract) -> Value {
    match contract.field_type {
        FieldType::Object | FieldType::Embedded(_) | FieldType::EmbeddedMap(_) => {
            Value::Object(Map::new())
        }
        FieldType::Array => Value::Array(Vec::new()),
        _ => Value::Null,
    }
}
