use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use core::{
    fmt, mem,
    ops::{Deref, DerefMut},
};

use spin::Mutex;
use tracing::{debug, trace};

use crate::{
    Dict, Value,
    codec,
    config::DictPoolConfig,
    error::Result,
    map::DictMap,
};

/// `DictPool` 是基于空闲列表的字典复用池，由应用显式构造后注入各调用点。
///
/// # 模块角色（Why）
/// - 字典的价值在于跨周期复用条目与键缓冲；池把“归还后再租借”的实例在调用方之间流转，
///   使短生命周期的键值集合几乎不触发堆分配；
/// - 取代进程级全局池：池是普通值，测试可以各自构造，不会在用例之间泄漏状态。
///
/// # 核心机制（How）
/// - 内部维护 `spin::Mutex<Vec<Dict>>` 作为空闲列表，租借时弹出末尾实例，未命中时按配置新建；
/// - 归还时先 `reset`，再在锁内压入空闲列表，保证下一位租借者观测到的一定是已清空的实例；
/// - 归还会顺带回收树中的嵌套子字典，它们同样进入空闲列表；
/// - `PoolMetrics` 以原子计数记录命中、未命中、归还与丢弃次数，支撑 [`statistics`](Self::statistics) 快照。
///
/// # 契约说明（What）
/// - **线程安全**：`DictPool` 满足 `Clone + Send + Sync`，克隆共享同一空闲列表；
/// - **独占性**：租借返回的实例已从空闲列表移出，不会同时被其他调用方持有；
/// - **后置条件**：租借得到的字典为空，查找模式等于配置中的 `binary_search`。
///
/// # 设计权衡（Trade-offs）
/// - 使用自旋锁而非 `parking_lot::Mutex`，临界区只有一次 `push`/`pop`，与工作区缓冲池保持一致；
/// - 空闲列表满时直接丢弃归还的实例，以有界内存换取偶发的重新分配。
#[derive(Clone)]
pub struct DictPool {
    inner: Arc<PoolInner>,
}

impl Default for DictPool {
    fn default() -> Self {
        Self {
            inner: Arc::new(PoolInner::new(DictPoolConfig::default())),
        }
    }
}

impl DictPool {
    /// 使用默认配置创建空池。
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用给定配置创建空池，配置非法时返回错误。
    pub fn with_config(config: DictPoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(PoolInner::new(config)),
        })
    }

    pub fn config(&self) -> &DictPoolConfig {
        &self.inner.config
    }

    /// 租借一个空字典，租约在 `Drop` 时自动归还。
    pub fn acquire(&self) -> PooledDict {
        PooledDict {
            dict: self.inner.acquire_dict(),
            pool: Some(Arc::clone(&self.inner)),
        }
    }

    /// 归还一个字典：先清空，再放入空闲列表。
    ///
    /// 字典树中的嵌套子字典会被逐个取出并一并归还；调用方在此之后不能再持有该实例，
    /// 按值传入保证了这一点。
    pub fn release(&self, dict: Dict) {
        self.inner.release_dict(dict);
    }

    /// 从通用映射构建租约，嵌套映射对应的子字典同样从池中租借。
    pub fn parse(&self, map: &DictMap) -> PooledDict {
        self.parse_owned(map.clone())
    }

    /// 消耗映射构建租约。
    pub fn parse_owned(&self, map: DictMap) -> PooledDict {
        let mut lease = self.acquire();
        let inner = &self.inner;
        lease.parse_owned_with(map, &mut || inner.acquire_dict());
        lease
    }

    /// 解码 JSON 并构建租约。
    ///
    /// 先完成解码再租借字典：输入畸形时不会有任何实例处于半填充状态。
    pub fn unmarshal(&self, data: &[u8]) -> Result<PooledDict> {
        let map = codec::decode(data)?;
        Ok(self.parse_owned(map))
    }

    /// 清空空闲列表，返回被释放的实例数。
    pub fn shrink_to_fit(&self) -> usize {
        self.inner.shrink_idle()
    }

    /// 读取统计快照。
    pub fn statistics(&self) -> PoolStats {
        self.inner.snapshot()
    }
}

impl fmt::Debug for DictPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictPool")
            .field("config", &self.inner.config)
            .field("statistics", &self.statistics())
            .finish()
    }
}

/// 池统计快照。
///
/// - `idle`：快照时刻空闲列表中的实例数；
/// - `hits`/`misses`：租借命中空闲列表与新建实例的累计次数；
/// - `releases`：成功放回空闲列表的累计次数（含嵌套子字典）；
/// - `discarded`：因空闲列表已满而丢弃的累计次数。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub hits: u64,
    pub misses: u64,
    pub releases: u64,
    pub discarded: u64,
}

/// `PooledDict` 是一次租约：解引用为 [`Dict`]，离开作用域时归还给池。
///
/// # 契约说明（What）
/// - 租约期间内容归调用方所有，池不会触碰；
/// - `Drop` 时执行与 [`DictPool::release`] 相同的清空与回收流程；
/// - [`into_inner`](Self::into_inner) 解除租约，之后字典由调用方自行处置，
///   可以稍后再交给 [`DictPool::release`]。
pub struct PooledDict {
    dict: Dict,
    pool: Option<Arc<PoolInner>>,
}

impl PooledDict {
    /// 解除租约并取出字典，`Drop` 不再归还它。
    pub fn into_inner(mut self) -> Dict {
        self.pool = None;
        mem::take(&mut self.dict)
    }
}

impl Deref for PooledDict {
    type Target = Dict;

    fn deref(&self) -> &Dict {
        &self.dict
    }
}

impl DerefMut for PooledDict {
    fn deref_mut(&mut self) -> &mut Dict {
        &mut self.dict
    }
}

impl fmt::Debug for PooledDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.dict, f)
    }
}

impl Drop for PooledDict {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release_dict(mem::take(&mut self.dict));
        }
    }
}

struct PoolInner {
    idle: Mutex<Vec<Dict>>,
    config: DictPoolConfig,
    metrics: PoolMetrics,
}

impl PoolInner {
    fn new(config: DictPoolConfig) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            config,
            metrics: PoolMetrics::default(),
        }
    }

    fn acquire_dict(&self) -> Dict {
        let reused = self.idle.lock().pop();
        let mut dict = match reused {
            Some(dict) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                trace!(target: "spark_dict::pool", capacity = dict.capacity(), "dict pool hit");
                dict
            }
            None => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                trace!(target: "spark_dict::pool", "dict pool miss");
                Dict::with_capacity(self.config.initial_capacity)
            }
        };
        // 字典此时为空，切换模式不会触发排序。
        dict.set_binary_search(self.config.binary_search);
        dict
    }

    fn release_dict(&self, mut dict: Dict) {
        let mut nested = Vec::new();
        loop {
            for value in dict.drain_values() {
                if let Value::Dict(child) = value {
                    nested.push(*child);
                }
            }
            dict.reset();
            self.recycle(dict);
            match nested.pop() {
                Some(next) => dict = next,
                None => break,
            }
        }
    }

    fn recycle(&self, dict: Dict) {
        let mut idle = self.idle.lock();
        if idle.len() >= self.config.max_idle {
            drop(idle);
            self.metrics.discarded.fetch_add(1, Ordering::Relaxed);
            debug!(
                target: "spark_dict::pool",
                max_idle = self.config.max_idle,
                "dict pool full, discarding released dict"
            );
            return;
        }
        idle.push(dict);
        drop(idle);
        self.metrics.releases.fetch_add(1, Ordering::Relaxed);
    }

    fn shrink_idle(&self) -> usize {
        let drained = mem::take(&mut *self.idle.lock());
        let count = drained.len();
        debug!(target: "spark_dict::pool", released = count, "dict pool shrunk");
        count
    }

    fn snapshot(&self) -> PoolStats {
        PoolStats {
            idle: self.idle.lock().len(),
            hits: self.metrics.hits.load(Ordering::Relaxed),
            misses: self.metrics.misses.load(Ordering::Relaxed),
            releases: self.metrics.releases.load(Ordering::Relaxed),
            discarded: self.metrics.discarded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Default)]
struct PoolMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    releases: AtomicU64,
    discarded: AtomicU64,
}
