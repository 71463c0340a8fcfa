//! # record 模块说明
//!
//! ## 角色定位（Why）
//! - 解释器面对的是运行期注册的模式，字段值以 [`Record`] 的槽位数组承载；
//! - 业务代码更习惯强类型结构体，[`TlbRecord`] 提供两者之间的转换层，
//!   配合 [`crate::load_from_cell`] / [`crate::to_cell`] 形成类型化门面。
//!
//! ## 契约（What）
//! - [`Record::new`] 产出全部字段为零值的记录；
//! - [`Record::set`] 拒绝未知字段与变体不符的值，失败时记录保持不变；
//! - 类型化读取方法在字段为空句柄时返回 `MissingValue`，变体不符时返回 `TypeMismatch`。

use std::fmt;
use std::sync::Arc;

use spark_cell::{Address, BigInt, Cell, Dictionary};

use crate::error::{DataError, DataErrorKind};
use crate::schema::Schema;
use crate::value::FieldValue;

/// 某个模式的一条记录实例。
#[derive(Clone)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<FieldValue>,
}

impl Record {
    /// 以零值创建记录。
    #[must_use]
    pub fn new(schema: &Arc<Schema>) -> Self {
        let mut values = Vec::with_capacity(schema.slot_count());
        for field in schema.fields() {
            if field.slot().is_some() {
                values.push(field.kind().default_value());
            }
        }
        Self {
            schema: Arc::clone(schema),
            values,
        }
    }

    /// 所属模式。
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// 按名称读取字段值。
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        let slot = self.schema.field(name)?.slot()?;
        self.values.get(slot)
    }

    /// 写入字段值；未知字段或变体不符时返回错误且不修改记录。
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<&mut Self, DataError> {
        let value = value.into();
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| DataError::new(DataErrorKind::UnknownField(name.to_string())))?;
        if !field.kind().accepts(&value) {
            return Err(DataError::new(DataErrorKind::TypeMismatch {
                expected: field.kind().name(),
                found: value.variant_name(),
            })
            .in_field(name));
        }
        if let Some(slot) = field.slot() {
            self.values[slot] = value;
        }
        Ok(self)
    }

    /// 链式写入，便于构造测试与样例数据。
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Result<Self, DataError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// 按槽位顺序排列的全部值。
    #[must_use]
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub(crate) fn value_at(&self, slot: usize) -> &FieldValue {
        &self.values[slot]
    }

    pub(crate) fn put(&mut self, slot: usize, value: FieldValue) {
        self.values[slot] = value;
    }

    fn require(&self, name: &str) -> Result<&FieldValue, DataError> {
        self.get(name)
            .ok_or_else(|| DataError::new(DataErrorKind::UnknownField(name.to_string())))
    }
}

fn mismatch(name: &str, expected: &'static str, found: &FieldValue) -> DataError {
    let kind = if found.is_none() {
        DataErrorKind::MissingValue
    } else {
        DataErrorKind::TypeMismatch {
            expected,
            found: found.variant_name(),
        }
    };
    DataError::new(kind).in_field(name)
}

macro_rules! typed_getters {
    ($($(#[$doc:meta])* $getter:ident => $variant:ident : $ret:ty, $expected:literal;)*) => {
        impl Record {
            $(
                $(#[$doc])*
                pub fn $getter(&self, name: &str) -> Result<$ret, DataError> {
                    match self.require(name)? {
                        FieldValue::$variant(value) => Ok(value),
                        other => Err(mismatch(name, $expected, other)),
                    }
                }
            )*
        }
    };
}

impl Record {
    /// 读取无符号整数字段。
    pub fn uint(&self, name: &str) -> Result<u64, DataError> {
        match self.require(name)? {
            FieldValue::Uint(value) => Ok(*value),
            other => Err(mismatch(name, "uint", other)),
        }
    }

    /// 读取有符号整数字段。
    pub fn int(&self, name: &str) -> Result<i64, DataError> {
        match self.require(name)? {
            FieldValue::Int(value) => Ok(*value),
            other => Err(mismatch(name, "int", other)),
        }
    }

    /// 读取布尔字段。
    pub fn bool(&self, name: &str) -> Result<bool, DataError> {
        match self.require(name)? {
            FieldValue::Bool(value) => Ok(*value),
            other => Err(mismatch(name, "bool", other)),
        }
    }

    /// 读取子记录字段。
    pub fn record(&self, name: &str) -> Result<&Record, DataError> {
        match self.require(name)? {
            FieldValue::Record(value) => Ok(value.as_ref()),
            other => Err(mismatch(name, "record", other)),
        }
    }
}

typed_getters! {
    /// 读取任意精度整数字段。
    big_int => BigInt: &BigInt, "big_int";
    /// 读取位串字段。
    bytes => Bytes: &[u8], "bytes";
    /// 读取地址字段。
    address => Address: &Address, "address";
    /// 读取 Cell 字段。
    cell => Cell: &Arc<Cell>, "cell";
    /// 读取字典字段。
    dict => Dict: &Dictionary, "dict";
    /// 读取变换后的序列字段。
    sequence => Sequence: &[Record], "sequence";
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name() && self.values == other.values
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(self.schema.name());
        for field in self.schema.fields() {
            if let Some(slot) = field.slot() {
                out.field(field.name(), &self.values[slot]);
            }
        }
        out.finish()
    }
}

/// 强类型结构体与动态 [`Record`] 之间的映射。
///
/// # 教案式说明
/// - **意图 (Why)**：业务代码以结构体表达消息，编解码引擎以模式驱动，二者通过该 trait 对接；
/// - **契约 (What)**：`schema()` 应返回同一份缓存的模式（例如存放在 `OnceLock` 中），
///   `from_record(&to_record(x)?)` 应与 `x` 等价。
pub trait TlbRecord: Sized {
    /// 该类型对应的模式。
    fn schema() -> Arc<Schema>;

    /// 从动态记录构造。
    fn from_record(record: &Record) -> Result<Self, DataError>;

    /// 转换为动态记录。
    fn to_record(&self) -> Result<Record, DataError>;
}
