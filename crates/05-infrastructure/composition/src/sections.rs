//! 内置配置节契约

use config_abstractions::{Contract, FieldContract};

/// 服务配置节名称
pub const SERVICES_SECTION: &str = "services";

/// 参数配置节名称
pub const PARAMETERS_SECTION: &str = "parameters";

/// 单个服务定义的契约
///
/// `declinations` 可以是引用字符串、对象或数组，因此不限制类型。
pub fn definition_contract() -> Contract {
    Contract::new()
        .field("class", FieldContract::string())
        .field("abstract", FieldContract::boolean())
        .field("parent", FieldContract::string())
        .field("children", FieldContract::object())
        .field("properties", FieldContract::object())
        .field("factories", FieldContract::object())
        .field("declinations", FieldContract::mixed())
        .field("tags", FieldContract::array())
        .field("alias", FieldContract::string())
}

/// `services` 配置节契约：服务标识到定义的映射
pub fn services_contract() -> FieldContract {
    FieldContract::embedded_map(definition_contract())
}

/// `parameters` 配置节契约：任意参数对象
pub fn parameters_contract() -> FieldContract {
    FieldContract::object()
}
