//! 结构转换：`Dict` 与通用嵌套映射 [`DictMap`] 之间的双向递归转换。
//!
//! # 模块定位（Why）
//! - `DictMap` 是本 crate 与外部世界交界的接缝：任何 serde 格式都可以经由它读写字典，
//!   JSON 适配层（`codec` 模块）只是其中一个使用者。
//!
//! # 契约说明（What）
//! - `to_map` 是深拷贝，结果与源字典的存储没有任何共享；嵌套字典转为嵌套映射，其余值原样复制；
//! - `parse` 对每个键调用 `set`，因此会覆写同名条目而不是先清空字典；
//!   嵌套映射被转换为新分配的子字典，子字典继承父字典的查找模式；
//! - 源映射的迭代顺序未定义，调用方不应依赖 `parse` 之后的条目顺序；
//! - 键以 UTF-8 文本作为映射键，非法字节按 `from_utf8_lossy` 替换。

use std::collections::HashMap;

use core::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, SeqAccess, Visitor},
    ser::Error as _,
};

use crate::{Dict, Value};

/// 通用嵌套映射：以文本为键、[`MapValue`] 为值。
pub type DictMap = HashMap<String, MapValue>;

/// 通用映射中的值。
///
/// 与 [`Value`] 的区别只在嵌套层：这里嵌套的是 `DictMap`，而不是 `Dict`。
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MapValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<MapValue>),
    Map(DictMap),
}

impl MapValue {
    pub fn as_map(&self) -> Option<&DictMap> {
        match self {
            MapValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&Value> for MapValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => MapValue::Null,
            Value::Bool(value) => MapValue::Bool(*value),
            Value::Int(value) => MapValue::Int(*value),
            Value::Uint(value) => match i64::try_from(*value) {
                Ok(signed) => MapValue::Int(signed),
                Err(_) => MapValue::Uint(*value),
            },
            Value::Float(value) => MapValue::Float(*value),
            Value::Str(value) => MapValue::Str(value.clone()),
            Value::Bytes(value) => MapValue::Bytes(value.clone()),
            Value::List(items) => MapValue::List(items.clone()),
            Value::Dict(dict) => MapValue::Map(dict.to_map()),
        }
    }
}

impl From<MapValue> for Value {
    /// 嵌套映射转换为新建的线性模式子字典。
    fn from(value: MapValue) -> Self {
        into_value(value, &mut Dict::new)
    }
}

fn into_value(value: MapValue, make: &mut dyn FnMut() -> Dict) -> Value {
    match value {
        MapValue::Null => Value::Null,
        MapValue::Bool(value) => Value::Bool(value),
        MapValue::Int(value) => Value::Int(value),
        MapValue::Uint(value) => Value::from(value),
        MapValue::Float(value) => Value::Float(value),
        MapValue::Str(value) => Value::Str(value),
        MapValue::Bytes(value) => Value::Bytes(value),
        MapValue::List(items) => Value::List(items),
        MapValue::Map(nested) => {
            let mut child = make();
            child.parse_owned_with(nested, make);
            Value::from(child)
        }
    }
}

impl Dict {
    /// 转换为新分配的通用嵌套映射。
    pub fn to_map(&self) -> DictMap {
        let mut map = DictMap::with_capacity(self.len());
        self.map_into(&mut map);
        map
    }

    /// 将条目写入调用方提供的映射，同名键被覆写，映射中其它键保持不变。
    pub fn map_into(&self, dst: &mut DictMap) {
        for (key, value) in self.iter() {
            dst.insert(
                String::from_utf8_lossy(key).into_owned(),
                MapValue::from(value),
            );
        }
    }

    /// 从通用映射填充字典，嵌套映射成为继承当前查找模式的新子字典。
    pub fn parse(&mut self, map: &DictMap) {
        let sorted = self.is_binary_search();
        let mut make = move || child_dict(sorted);
        for (key, value) in map {
            let value = into_value(value.clone(), &mut make);
            self.set(key, value);
        }
    }

    /// 消耗映射填充字典，避免逐值克隆。
    pub fn parse_owned(&mut self, map: DictMap) {
        let sorted = self.is_binary_search();
        self.parse_owned_with(map, &mut move || child_dict(sorted));
    }

    /// 由调用方决定子字典的来源，池化解析借此从池中取子字典。
    pub(crate) fn parse_owned_with(&mut self, map: DictMap, make: &mut dyn FnMut() -> Dict) {
        for (key, value) in map {
            let value = into_value(value, make);
            self.set(key, value);
        }
    }
}

fn child_dict(sorted: bool) -> Dict {
    if sorted { Dict::sorted() } else { Dict::new() }
}

impl Serialize for MapValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MapValue::Null => serializer.serialize_unit(),
            MapValue::Bool(value) => serializer.serialize_bool(*value),
            MapValue::Int(value) => serializer.serialize_i64(*value),
            MapValue::Uint(value) => serializer.serialize_u64(*value),
            MapValue::Float(value) if !value.is_finite() => Err(S::Error::custom(format!(
                "unsupported float value: {value}"
            ))),
            MapValue::Float(value) => serializer.serialize_f64(*value),
            MapValue::Str(value) => serializer.serialize_str(value),
            MapValue::Bytes(value) => serializer.serialize_bytes(value),
            MapValue::List(items) => serializer.collect_seq(items),
            MapValue::Map(map) => serializer.collect_map(map),
        }
    }
}

impl<'de> Deserialize<'de> for MapValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MapValueVisitor)
    }
}

struct MapValueVisitor;

impl<'de> Visitor<'de> for MapValueVisitor {
    type Value = MapValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any self-describing value")
    }

    fn visit_unit<E>(self) -> Result<MapValue, E> {
        Ok(MapValue::Null)
    }

    fn visit_none<E>(self) -> Result<MapValue, E> {
        Ok(MapValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<MapValue, D::Error> {
        MapValue::deserialize(deserializer)
    }

    fn visit_bool<E>(self, value: bool) -> Result<MapValue, E> {
        Ok(MapValue::Bool(value))
    }

    fn visit_i64<E>(self, value: i64) -> Result<MapValue, E> {
        Ok(MapValue::Int(value))
    }

    fn visit_u64<E>(self, value: u64) -> Result<MapValue, E> {
        Ok(match i64::try_from(value) {
            Ok(signed) => MapValue::Int(signed),
            Err(_) => MapValue::Uint(value),
        })
    }

    fn visit_f64<E>(self, value: f64) -> Result<MapValue, E> {
        Ok(MapValue::Float(value))
    }

    fn visit_str<E>(self, value: &str) -> Result<MapValue, E> {
        Ok(MapValue::Str(value.to_owned()))
    }

    fn visit_string<E>(self, value: String) -> Result<MapValue, E> {
        Ok(MapValue::Str(value))
    }

    fn visit_bytes<E>(self, value: &[u8]) -> Result<MapValue, E> {
        Ok(MapValue::Bytes(value.to_vec()))
    }

    fn visit_byte_buf<E>(self, value: Vec<u8>) -> Result<MapValue, E> {
        Ok(MapValue::Bytes(value))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<MapValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(MapValue::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<MapValue, A::Error> {
        let mut map = DictMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, MapValue>()? {
            map.insert(key, value);
        }
        Ok(MapValue::Map(map))
    }
}
