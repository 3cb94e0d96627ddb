use serde::Deserialize;

use crate::error::{DictError, Result};

/// `DictPoolConfig` 描述字典池的容量与模式策略。
///
/// # 设计背景（Why）
/// - 池由应用的组合根显式构造并注入调用点，配置因此也以显式对象传入，
///   而不是在首次使用时从环境中隐式读取；
/// - 与工作区其它配置一致，使用 TOML 文本承载，由调用方决定文本来源。
///
/// # 契约说明（What）
/// - `max_idle`：空闲列表上限，超过后归还的字典直接丢弃，必须大于 0；
/// - `initial_capacity`：池未命中时新建字典预留的条目槽位数；
/// - `binary_search`：每次租借时施加到字典上的查找模式；
/// - 未出现的字段取默认值，未知字段视为错误，避免拼写错误被静默忽略。
///
/// # 示例（Examples）
/// ```rust
/// use spark_dict::DictPoolConfig;
///
/// let config = DictPoolConfig::from_toml_str("max_idle = 32\nbinary_search = true")
///     .expect("合法配置");
/// assert_eq!(config.max_idle, 32);
/// assert!(config.binary_search);
/// assert_eq!(config.initial_capacity, DictPoolConfig::default().initial_capacity);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DictPoolConfig {
    pub max_idle: usize,
    pub initial_capacity: usize,
    pub binary_search: bool,
}

impl Default for DictPoolConfig {
    fn default() -> Self {
        Self {
            max_idle: 256,
            initial_capacity: 8,
            binary_search: false,
        }
    }
}

impl DictPoolConfig {
    /// 解析并校验 TOML 文本。
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(DictError::Config)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验字段取值。
    pub fn validate(&self) -> Result<()> {
        if self.max_idle == 0 {
            return Err(DictError::InvalidConfig {
                field: "max_idle",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = DictPoolConfig::from_toml_str("").expect("空文档合法");
        assert_eq!(config, DictPoolConfig::default());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = DictPoolConfig::from_toml_str("max_idel = 3").expect_err("拼写错误");
        assert_eq!(err.code(), "dict.config");
    }

    #[test]
    fn zero_max_idle_is_invalid() {
        let err = DictPoolConfig::from_toml_str("max_idle = 0").expect_err("上限为 0");
        assert!(matches!(
            err,
            DictError::InvalidConfig {
                field: "max_idle",
                ..
            }
        ));
    }
}
