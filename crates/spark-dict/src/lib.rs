#![deny(unsafe_code)]

//! `spark-dict` 提供池化的有序键值容器 [`Dict`]，用于替代延迟敏感路径上的通用哈希表。
//!
//! # 模块定位（Why）
//! - 请求参数包这类“频繁创建、很快丢弃”的小型键值集合，其开销主要来自哈希表的分配与回收；
//! - `Dict` 以连续条目数组存储，`reset` 后保留条目槽位与键缓冲，配合 [`DictPool`]
//!   在调用方之间复用实例，稳态下几乎不产生堆分配。
//!
//! # 设计概要（How）
//! - `store` 模块维护条目存储：逻辑长度与物理槽位分离，删除按模式选择交换删除或保序删除；
//! - `dict` 模块是对外门面：键规范化、线性/二分查找分派、增删改查；
//! - `map` 与 `codec` 模块负责与通用嵌套映射 [`DictMap`] 及 JSON 文本之间的递归转换；
//! - `pool` 模块提供显式构造、可注入的复用池与 RAII 租约 [`PooledDict`]；
//! - `config` 与 `error` 模块分别承载池配置与错误域。
//!
//! # 使用示例（Examples）
//! ```rust
//! use spark_dict::{DictPool, Value};
//!
//! let pool = DictPool::new();
//! let mut params = pool.acquire();
//! params.set("a", 1);
//! params.set("b", 2);
//! params.set("a", 3);
//! assert_eq!(params.get("a"), Some(&Value::Int(3)));
//! assert_eq!(params.len(), 2);
//!
//! let json = params.marshal().expect("可编码");
//! let decoded = pool.unmarshal(&json).expect("可解码");
//! assert_eq!(decoded.to_map(), params.to_map());
//! ```
//!
//! # 并发约束（What）
//! - 单个 `Dict` 不做内部同步，读写需由调用方串行化；
//! - `DictPool` 是唯一跨线程共享的组件，归还前完成的清空对下一位租借者可见。

mod codec;
mod config;
mod dict;
pub mod error;
mod map;
mod pool;
mod store;
mod value;

pub use config::DictPoolConfig;
pub use dict::Dict;
pub use error::{DictError, Result};
pub use map::{DictMap, MapValue};
pub use pool::{DictPool, PoolStats, PooledDict};
pub use store::Entry;
pub use value::Value;
