use core::fmt;

use crate::{
    Value,
    store::{Entry, EntryStore},
};

/// `Dict` 是以连续条目数组实现的有序字典，面向“频繁创建、短暂存活”的小型键值集合。
///
/// # 模块角色（Why）
/// - 在条目数为几十量级时，线性扫描比哈希更便宜；配合条目与键缓冲的跨周期复用，
///   重复使用同一实例几乎不产生堆分配。
/// - 作为 [`DictPool`](crate::DictPool) 的租借对象，`reset` 后的实例可被下一位调用方直接复用。
///
/// # 核心机制（How）
/// - 键统一规范化为字节序列：所有键参数均为 `impl AsRef<[u8]>`，`&str`、`String`、
///   `&[u8]`、`Vec<u8>` 指向同一条目；
/// - 查找策略由模式位决定：线性模式从前向后扫描，二分模式在有序条目上二分；
/// - 线性模式删除使用交换删除（O(1)，打乱顺序），二分模式删除使用保序删除，
///   两种模式的删除策略必须不同，否则二分模式的有序不变量会被破坏。
///
/// # 契约说明（What）
/// - **唯一性**：同一键至多存在一个条目，`set` 覆写而非追加；
/// - **有序性**：二分模式下，任意观测时刻条目均按键的字节序升序排列；
/// - **并发**：单个实例不做内部同步，读写由调用方串行化，跨线程移交交给池负责。
///
/// # 设计权衡（Trade-offs）
/// - 二分模式的插入与删除需要搬移尾部条目，换取 O(log n) 查找；
///   条目数很小时线性模式通常更快。
#[derive(Default)]
pub struct Dict {
    store: EntryStore,
    binary_search: bool,
}

impl Dict {
    /// 创建线性模式的空字典。
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建预留 `capacity` 个条目槽位的线性模式字典。
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: EntryStore::with_capacity(capacity),
            binary_search: false,
        }
    }

    /// 创建二分查找模式的空字典。
    pub fn sorted() -> Self {
        Self {
            store: EntryStore::default(),
            binary_search: true,
        }
    }

    pub fn is_binary_search(&self) -> bool {
        self.binary_search
    }

    /// 切换查找模式。
    ///
    /// 从线性模式切入二分模式时会先按键排序已有条目，使有序不变量立即成立；
    /// 反向切换不改变条目顺序。
    pub fn set_binary_search(&mut self, enabled: bool) {
        if enabled && !self.binary_search {
            self.store.sort();
        }
        self.binary_search = enabled;
    }

    /// 逻辑条目数。
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.len() == 0
    }

    /// 无需扩容即可容纳的条目数；`reset` 不会让它变小。
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// 按键读取值，未命中返回 `None`。
    pub fn get<K: AsRef<[u8]>>(&self, key: K) -> Option<&Value> {
        self.find(key.as_ref()).map(|index| self.store.live()[index].value())
    }

    /// 按键读取可变值，可用于原地修改嵌套字典。
    pub fn get_mut<K: AsRef<[u8]>>(&mut self, key: K) -> Option<&mut Value> {
        let index = self.find(key.as_ref())?;
        Some(self.store.live_mut()[index].value_mut())
    }

    /// 判断条目是否存在；值为 [`Value::Null`] 的条目同样视为存在。
    pub fn has<K: AsRef<[u8]>>(&self, key: K) -> bool {
        self.find(key.as_ref()).is_some()
    }

    /// 写入键值。
    ///
    /// # 契约说明（What）
    /// - 键已存在：原地覆写值，旧值被丢弃，不做任何合并；
    /// - 键不存在：线性模式追加到末尾，二分模式插入到保序位置；
    /// - 新条目优先复用备用槽位中的键缓冲，键长不超过旧容量时不分配。
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: AsRef<[u8]>,
        V: Into<Value>,
    {
        let key = key.as_ref();
        let value = value.into();
        if self.binary_search {
            match self.store.search(key) {
                Ok(index) => {
                    self.store.live_mut()[index].replace_value(value);
                }
                Err(index) => {
                    let slot = self.store.insert_slot(index);
                    slot.write_key(key);
                    slot.replace_value(value);
                }
            }
            return;
        }

        match self.store.position(key) {
            Some(index) => {
                self.store.live_mut()[index].replace_value(value);
            }
            None => {
                let slot = self.store.allocate_slot();
                slot.write_key(key);
                slot.replace_value(value);
            }
        }
    }

    /// 删除所有匹配 `key` 的条目，键不存在时无操作。
    ///
    /// 按不变量至多只有一个匹配，但实现仍会清除全部匹配项。
    pub fn delete<K: AsRef<[u8]>>(&mut self, key: K) {
        let key = key.as_ref();
        if self.binary_search {
            while let Ok(index) = self.store.search(key) {
                self.store.shift_remove(index);
            }
            return;
        }

        let mut index = 0;
        while index < self.store.len() {
            if self.store.live()[index].key() == key {
                // 交换进来的末尾条目尚未检查，索引保持不动。
                self.store.swap_remove(index);
            } else {
                index += 1;
            }
        }
    }

    /// 删除条目并返回其值。
    ///
    /// 与 [`delete`](Self::delete) 使用相同的按模式删除策略；
    /// 调用方可借此取回池化的子字典并显式归还。
    pub fn take<K: AsRef<[u8]>>(&mut self, key: K) -> Option<Value> {
        let index = self.find(key.as_ref())?;
        let value = if self.binary_search {
            self.store.shift_remove(index)
        } else {
            self.store.swap_remove(index)
        };
        Some(value)
    }

    /// 清空字典：逻辑长度归零，槽位与键缓冲保留待复用，已存放的值立即丢弃。
    ///
    /// 连续调用两次与调用一次等价。
    pub fn reset(&mut self) {
        self.store.clear();
    }

    /// 按键排序条目；二分模式下条目本已有序，调用不会改变任何内容。
    pub fn sort(&mut self) {
        if !self.binary_search {
            self.store.sort();
        }
    }

    /// 当前存活的条目切片，顺序即内部存储顺序。
    pub fn entries(&self) -> &[Entry] {
        self.store.live()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&[u8], &Value)> + '_ {
        self.store
            .live()
            .iter()
            .map(|entry| (entry.key(), entry.value()))
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &[u8]> + '_ {
        self.store.live().iter().map(Entry::key)
    }

    pub(crate) fn drain_values(&mut self) -> impl Iterator<Item = Value> + '_ {
        self.store.drain_values()
    }

    fn find(&self, key: &[u8]) -> Option<usize> {
        if self.binary_search {
            self.store.search(key).ok()
        } else {
            self.store.position(key)
        }
    }
}

impl Clone for Dict {
    /// 只复制存活条目，备用槽位不随克隆传播。
    fn clone(&self) -> Self {
        let mut store = EntryStore::with_capacity(self.len());
        for entry in self.store.live() {
            let slot = store.allocate_slot();
            slot.write_key(entry.key());
            slot.replace_value(entry.value().clone());
        }
        Self {
            store,
            binary_search: self.binary_search,
        }
    }
}

impl PartialEq for Dict {
    /// 按存储顺序逐条比较键与值，不比较模式位与容量。
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl fmt::Debug for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.iter()
                    .map(|(key, value)| (String::from_utf8_lossy(key), value)),
            )
            .finish()
    }
}

impl<K, V> Extend<(K, V)> for Dict
where
    K: AsRef<[u8]>,
    V: Into<Value>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Dict
where
    K: AsRef<[u8]>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Dict::new();
        dict.extend(iter);
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_sorted(dict: &Dict) -> bool {
        dict.keys()
            .collect::<Vec<_>>()
            .windows(2)
            .all(|pair| pair[0] < pair[1])
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut dict = Dict::new();
        dict.set("a", 1);
        dict.set("b", 2);
        dict.set("a", 3);

        assert_eq!(dict.get("a"), Some(&Value::Int(3)));
        assert_eq!(dict.get("b"), Some(&Value::Int(2)));
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.keys().next(), Some(b"a".as_slice()), "覆写不改变位置");
    }

    #[test]
    fn text_and_byte_keys_share_one_entry() {
        let mut dict = Dict::new();
        dict.set(b"key".as_slice(), "bytes");
        dict.set("key", "text");
        dict.set(String::from("key"), "owned");

        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get(b"key".to_vec()), Some(&Value::from("owned")));
        assert!(dict.has(b"key"));
    }

    #[test]
    fn null_value_counts_as_present() {
        let mut dict = Dict::new();
        dict.set("nothing", Value::Null);
        assert!(dict.has("nothing"));
        assert_eq!(dict.get("nothing"), Some(&Value::Null));
        assert!(!dict.has("other"));
        assert_eq!(dict.get("other"), None);
    }

    #[test]
    fn linear_delete_swaps_with_last() {
        let mut dict: Dict = [("a", 1), ("b", 2), ("c", 3), ("d", 4)]
            .into_iter()
            .collect();
        dict.delete("b");

        assert!(!dict.has("b"));
        assert_eq!(
            dict.keys().collect::<Vec<_>>(),
            vec![b"a".as_slice(), b"d", b"c"]
        );
        dict.delete("missing");
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn binary_mode_keeps_entries_sorted() {
        let mut dict = Dict::sorted();
        for key in ["m", "c", "x", "a", "q", "c"] {
            dict.set(key, key);
            assert!(is_sorted(&dict));
        }
        assert_eq!(dict.len(), 5);

        dict.delete("c");
        assert!(is_sorted(&dict));
        dict.delete("x");
        assert!(is_sorted(&dict));
        assert_eq!(
            dict.keys().collect::<Vec<_>>(),
            vec![b"a".as_slice(), b"m", b"q"]
        );
        assert_eq!(dict.get("q"), Some(&Value::from("q")));
    }

    #[test]
    fn enabling_binary_search_sorts_existing_entries() {
        let mut dict: Dict = [("b", 1), ("c", 2), ("a", 3)].into_iter().collect();
        dict.set_binary_search(true);
        assert!(dict.is_binary_search());
        assert!(is_sorted(&dict));
        assert_eq!(dict.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn reset_retains_capacity_and_is_idempotent() {
        let mut dict = Dict::new();
        for index in 0..16 {
            dict.set(format!("key-{index}"), index);
        }
        let capacity = dict.capacity();

        dict.reset();
        assert_eq!(dict.len(), 0);
        assert!(!dict.has("key-0"));
        assert_eq!(dict.capacity(), capacity);

        dict.reset();
        assert!(dict.is_empty());
        assert_eq!(dict.capacity(), capacity);

        dict.set("key-0", "again");
        assert_eq!(dict.get("key-0"), Some(&Value::from("again")));
        assert_eq!(dict.capacity(), capacity);
    }

    #[test]
    fn take_returns_value_and_removes_entry() {
        let mut child = Dict::new();
        child.set("y", "z");
        let mut dict = Dict::sorted();
        dict.set("x", child);
        dict.set("w", 0);

        let taken = dict.take("x").and_then(Value::into_dict).expect("应取回子字典");
        assert_eq!(taken.get("y"), Some(&Value::from("z")));
        assert!(!dict.has("x"));
        assert_eq!(dict.take("x"), None);
    }

    #[test]
    fn sort_orders_linear_entries() {
        let mut dict: Dict = [("key2", 1), ("key1", 2)].into_iter().collect();
        dict.sort();
        assert!(is_sorted(&dict));
        assert!(!dict.is_binary_search(), "sort 不切换模式");
    }

    #[test]
    fn clone_copies_only_live_entries() {
        let mut dict = Dict::with_capacity(32);
        dict.set("a", 1);
        dict.set("b", 2);
        dict.delete("a");

        let copy = dict.clone();
        assert_eq!(copy, dict);
        assert_eq!(copy.len(), 1);
        assert_eq!(format!("{copy:?}"), r#"{"b": Int(2)}"#);
    }
}
