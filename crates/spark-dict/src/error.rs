//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为字典的序列化适配层与配置层提供集中的错误语义；查找未命中不属于错误，
//!   始终以 `Option`/`bool` 表达，本模块不为其定义任何变体。
//! - 错误码沿用 `<领域>.<语义>` 约定，便于日志检索与告警聚合。
//!
//! ## 设计要求（What）
//! - 所有错误类型通过 `thiserror::Error` 派生，兼容 `std::error::Error` 并保留底层 `source`；
//! - 编解码错误原样携带 `serde_json::Error`，调用方可获取行列号等诊断信息；
//! - 本 crate 不做任何重试：输入畸形或值不可编码时，重试没有纠正效果。

use thiserror::Error;

/// 字典操作的结果别名。
pub type Result<T, E = DictError> = core::result::Result<T, E>;

/// 稳定错误码集合。
///
/// # 契约说明（What）
/// - 码值一经发布不得修改语义；新增场景只能追加新码。
pub mod codes {
    /// 反序列化输入畸形或顶层不是对象。
    pub const DICT_DECODE: &str = "dict.decode";
    /// 序列化时遇到编码格式无法表示的值。
    pub const DICT_ENCODE: &str = "dict.encode";
    /// 配置文本无法解析。
    pub const DICT_CONFIG: &str = "dict.config";
    /// 配置字段取值非法。
    pub const DICT_CONFIG_INVALID: &str = "dict.config.invalid";
}

/// 字典错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：区分“解码失败”“编码失败”“配置失败”三类来源，
///   让调用方能够决定是丢弃实例、修正数据还是修正配置。
/// - **契约 (What)**：
///   - [`DictError::Decode`] 在写入任何条目之前返回，字典内容不受影响；
///   - [`DictError::Encode`] 不会修改字典，`marshal` 从不写入；
///   - 所有变体均满足 `Send + Sync + 'static`。
/// - **设计权衡 (Trade-offs)**：直接持有底层错误而非转成字符串，
///   牺牲一定的类型稳定性换取完整的诊断链路。
#[derive(Debug, Error)]
pub enum DictError {
    /// 输入文本不是合法的 JSON 对象。
    #[error("failed to decode dict: {0}")]
    Decode(#[source] serde_json::Error),

    /// 某个值无法被 JSON 表示（例如非有限浮点数）。
    #[error("failed to encode dict: {0}")]
    Encode(#[source] serde_json::Error),

    /// 配置文本不是合法的 TOML 或字段类型不匹配。
    #[error("failed to parse dict pool configuration: {0}")]
    Config(#[source] toml::de::Error),

    /// 配置字段语法正确但取值越界。
    #[error("invalid dict pool configuration `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
}

impl DictError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            DictError::Decode(_) => codes::DICT_DECODE,
            DictError::Encode(_) => codes::DICT_ENCODE,
            DictError::Config(_) => codes::DICT_CONFIG,
            DictError::InvalidConfig { .. } => codes::DICT_CONFIG_INVALID,
        }
    }
}
