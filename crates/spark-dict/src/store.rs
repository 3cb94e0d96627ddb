//! 条目存储：连续排列的 `(key, value)` 槽位，跨 `reset` 周期复用分配。
//!
//! # 设计概要（How）
//! - `slots` 的物理长度只增不减，`len` 记录逻辑长度；`len..` 之间的槽位是备用区，
//!   保留着先前条目的键缓冲容量，下次分配时原地覆写。
//! - 备用区中的值一律为 [`Value::Null`]：任何让槽位离开逻辑区间的操作都会先丢弃值，
//!   避免被回收的条目延长载荷（尤其是嵌套字典）的生命周期。
//! - 删除分两种策略：`swap_remove` O(1) 但会打乱顺序，只用于线性模式；
//!   `shift_remove` 保序，是二分模式维持有序不变量的唯一合法删除方式。

use core::mem;

use crate::Value;

/// 单个字典条目。
///
/// 键缓冲由条目独占，永远是调用方数据的拷贝而非借用，
/// 因此可以在 `reset` 之后被下一次写入安全覆写。
#[derive(Debug, Clone, Default)]
pub struct Entry {
    key: Vec<u8>,
    value: Value,
}

impl Entry {
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// 覆写键缓冲；新键不超过已有容量时不会重新分配。
    pub(crate) fn write_key(&mut self, key: &[u8]) {
        self.key.clear();
        self.key.extend_from_slice(key);
    }

    pub(crate) fn replace_value(&mut self, value: Value) -> Value {
        mem::replace(&mut self.value, value)
    }

    #[cfg(test)]
    pub(crate) fn key_capacity(&self) -> usize {
        self.key.capacity()
    }
}

#[derive(Debug, Default)]
pub(crate) struct EntryStore {
    slots: Vec<Entry>,
    len: usize,
}

impl EntryStore {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub(crate) fn live(&self) -> &[Entry] {
        &self.slots[..self.len]
    }

    pub(crate) fn live_mut(&mut self) -> &mut [Entry] {
        &mut self.slots[..self.len]
    }

    /// 将逻辑长度加一并返回新槽位。
    ///
    /// 备用区非空时直接复用其首个槽位（连同键缓冲），否则向 `Vec` 追加一个空槽位。
    /// 返回槽位的键内容是旧数据，调用方必须随后调用 [`Entry::write_key`]。
    pub(crate) fn allocate_slot(&mut self) -> &mut Entry {
        if self.len == self.slots.len() {
            self.slots.push(Entry::default());
        }
        let index = self.len;
        self.len += 1;
        &mut self.slots[index]
    }

    /// 在 `index` 处插入一个槽位，`index..len` 的条目整体右移一位。
    pub(crate) fn insert_slot(&mut self, index: usize) -> &mut Entry {
        debug_assert!(index <= self.len);
        self.allocate_slot();
        self.slots[index..self.len].rotate_right(1);
        &mut self.slots[index]
    }

    /// 线性扫描，按字节精确匹配返回首个命中位置。
    pub(crate) fn position(&self, key: &[u8]) -> Option<usize> {
        self.live().iter().position(|entry| entry.key == key)
    }

    /// 在有序的逻辑区间上做二分查找；未命中时 `Err` 携带保序插入点。
    pub(crate) fn search(&self, key: &[u8]) -> Result<usize, usize> {
        self.live().binary_search_by(|entry| entry.key.as_slice().cmp(key))
    }

    /// 与最后一个逻辑条目交换后收缩长度，会改变顺序。
    pub(crate) fn swap_remove(&mut self, index: usize) -> Value {
        debug_assert!(index < self.len);
        let last = self.len - 1;
        self.slots.swap(index, last);
        self.len = last;
        self.slots[last].replace_value(Value::Null)
    }

    /// 保序删除：被删槽位旋转到逻辑区间末尾后并入备用区，键缓冲得以保留。
    pub(crate) fn shift_remove(&mut self, index: usize) -> Value {
        debug_assert!(index < self.len);
        self.slots[index..self.len].rotate_left(1);
        self.len -= 1;
        let len = self.len;
        self.slots[len].replace_value(Value::Null)
    }

    /// 丢弃逻辑区间内的全部值并将长度归零；槽位与键缓冲全部保留。
    pub(crate) fn clear(&mut self) {
        for entry in &mut self.slots[..self.len] {
            entry.value = Value::Null;
        }
        self.len = 0;
    }

    /// 按键排序逻辑区间。
    pub(crate) fn sort(&mut self) {
        self.live_mut().sort_unstable_by(|a, b| a.key.cmp(&b.key));
    }

    /// 依次取走逻辑区间内的值，槽位留在原处，值变为 `Null`。
    pub(crate) fn drain_values(&mut self) -> impl Iterator<Item = Value> + '_ {
        self.slots[..self.len]
            .iter_mut()
            .map(|entry| mem::take(&mut entry.value))
    }
}
