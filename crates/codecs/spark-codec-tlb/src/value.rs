//! 字段值的和类型。

use std::sync::Arc;

use spark_cell::{Address, BigInt, Cell, Dictionary};

use crate::record::Record;

/// 记录中单个数据字段的值。
///
/// [`FieldValue::None`] 只出现在句柄类字段上，表示“空”；`maybe` 编码时据此写出存在位 0。
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 空句柄。
    None,
    /// 有符号整数。
    Int(i64),
    /// 无符号整数。
    Uint(u64),
    /// 任意精度整数。
    BigInt(BigInt),
    /// 布尔值。
    Bool(bool),
    /// 位串，末字节低位补零。
    Bytes(Vec<u8>),
    /// 地址。
    Address(Address),
    /// 原始 Cell。
    Cell(Arc<Cell>),
    /// 子记录。
    Record(Box<Record>),
    /// 字典。
    Dict(Dictionary),
    /// 字典变换后的元素序列。
    Sequence(Vec<Record>),
}

impl FieldValue {
    /// 变体名称，用于类型不匹配的错误信息。
    #[must_use]
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::BigInt(_) => "big_int",
            Self::Bool(_) => "bool",
            Self::Bytes(_) => "bytes",
            Self::Address(_) => "address",
            Self::Cell(_) => "cell",
            Self::Record(_) => "record",
            Self::Dict(_) => "dict",
            Self::Sequence(_) => "sequence",
        }
    }

    /// 是否为空句柄。
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

macro_rules! impl_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for FieldValue {
                fn from(value: $source) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from! {
    i64 => Int,
    u64 => Uint,
    BigInt => BigInt,
    bool => Bool,
    Vec<u8> => Bytes,
    Address => Address,
    Arc<Cell> => Cell,
    Dictionary => Dict,
    Vec<Record> => Sequence,
}

impl From<Record> for FieldValue {
    fn from(value: Record) -> Self {
        Self::Record(Box::new(value))
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}
