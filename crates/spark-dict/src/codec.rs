//! JSON 序列化适配层。
//!
//! `marshal` 等价于 `to_map` 后交给 `serde_json` 编码，`unmarshal` 等价于解码为
//! [`DictMap`] 后调用 `parse`。编解码器的错误原样向上传递，不做重试。

use tracing::debug;

use crate::{
    Dict,
    error::{DictError, Result},
    map::DictMap,
};

impl Dict {
    /// 编码为 JSON 对象文本。
    ///
    /// # 契约说明（What）
    /// - 嵌套字典编码为嵌套对象，字节串编码为数字数组；
    /// - 非有限浮点数无法用 JSON 表示，返回 [`DictError::Encode`]；
    /// - 不修改字典，失败后实例仍可继续使用。
    pub fn marshal(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.to_map()).map_err(|err| {
            debug!(
                target: "spark_dict::codec",
                code = crate::error::codes::DICT_ENCODE,
                error = %err,
                "dict marshal failed"
            );
            DictError::Encode(err)
        })
    }

    /// 解码 JSON 对象文本并写入字典。
    ///
    /// # 契约说明（What）
    /// - 输入必须是顶层对象，否则返回 [`DictError::Decode`]；
    /// - 嵌套对象成为子字典，数组原样存为 [`Value::List`](crate::Value::List)；
    /// - 解码整体完成后才开始写入，解码失败时字典保持原样；
    /// - 写入经由 `set`，同名条目被覆写，其余已有条目保留。
    pub fn unmarshal(&mut self, data: &[u8]) -> Result<()> {
        let map = decode(data)?;
        self.parse_owned(map);
        Ok(())
    }
}

pub(crate) fn decode(data: &[u8]) -> Result<DictMap> {
    serde_json::from_slice::<DictMap>(data).map_err(|err| {
        debug!(
            target: "spark_dict::codec",
            code = crate::error::codes::DICT_DECODE,
            error = %err,
            "dict unmarshal failed"
        );
        DictError::Decode(err)
    })
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::{Value, map::MapValue};

    #[test]
    fn unmarshal_nested_object() {
        let mut dict = Dict::new();
        dict.unmarshal(br#"{"p":{"q":"r"}}"#).expect("合法输入");

        let nested = dict.get("p").and_then(Value::as_dict).expect("p 应为子字典");
        assert_eq!(nested.get("q"), Some(&Value::from("r")));
    }

    #[test]
    fn marshal_then_unmarshal_preserves_structure() {
        let mut child = Dict::new();
        child.set("flag", true);
        child.set("ratio", 0.5);
        let mut dict = Dict::new();
        dict.set("name", "spark");
        dict.set("count", 42);
        dict.set("big", u64::MAX);
        dict.set("none", Value::Null);
        dict.set("child", child);

        let encoded = dict.marshal().expect("可编码");
        let mut decoded = Dict::new();
        decoded.unmarshal(&encoded).expect("可解码");

        assert_eq!(decoded.to_map(), dict.to_map());
    }

    /// 十进制文本必须还原出逐位相同的 `f64`，极端指数与长尾数也不例外。
    #[test]
    fn floats_survive_roundtrip_bit_for_bit() {
        let samples = [
            1.0715660391465826e-75,
            -1.81996730402717e-179,
            -1.603964615428183e143,
            0.1 + 0.2,
            f64::MIN_POSITIVE,
            f64::MAX,
            5e-324,
        ];
        let mut dict = Dict::new();
        for (index, sample) in samples.iter().enumerate() {
            dict.set(format!("f{index}"), *sample);
        }

        let mut decoded = Dict::new();
        decoded.unmarshal(&dict.marshal().expect("有限浮点数可编码")).expect("可解码");
        for (index, sample) in samples.iter().enumerate() {
            let restored = decoded.get(format!("f{index}")).and_then(Value::as_f64);
            assert_eq!(
                restored.map(f64::to_bits),
                Some(sample.to_bits()),
                "样本 {sample:e}"
            );
        }
    }

    #[test]
    fn small_uint_roundtrips_as_int() {
        let mut dict = Dict::new();
        dict.set("u", Value::Uint(1));
        dict.set("max", Value::Uint(i64::MAX as u64));
        assert_eq!(dict.to_map()["u"], MapValue::Int(1));

        let mut decoded = Dict::new();
        decoded.unmarshal(&dict.marshal().expect("可编码")).expect("可解码");
        assert_eq!(decoded.to_map(), dict.to_map());
    }

    #[test]
    fn bytes_encode_as_number_arrays() {
        let mut dict = Dict::new();
        dict.set("raw", b"hi".as_slice());
        let encoded = dict.marshal().expect("可编码");
        assert_eq!(encoded, br#"{"raw":[104,105]}"#);

        let mut decoded = Dict::new();
        decoded.unmarshal(&encoded).expect("可解码");
        assert_eq!(
            decoded.get("raw").and_then(Value::as_list),
            Some([MapValue::Int(104), MapValue::Int(105)].as_slice())
        );
    }

    #[test]
    #[traced_test]
    fn non_finite_float_is_an_encode_error() {
        let mut dict = Dict::new();
        dict.set("nan", f64::NAN);

        let err = dict.marshal().expect_err("NaN 无法编码");
        assert_eq!(err.code(), "dict.encode");
        assert_eq!(dict.len(), 1, "marshal 不修改字典");
        assert!(logs_contain("dict marshal failed"));
    }

    #[test]
    #[traced_test]
    fn malformed_input_is_a_decode_error() {
        let mut dict = Dict::new();
        let err = dict.unmarshal(b"{\"a\":").expect_err("截断输入");
        assert!(matches!(err, DictError::Decode(_)));
        assert!(logs_contain("dict unmarshal failed"));

        let err = dict.unmarshal(b"[1,2]").expect_err("顶层不是对象");
        assert_eq!(err.code(), "dict.decode");
    }
}
