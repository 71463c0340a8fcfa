#![warn(missing_docs)]

//! # spark-codec-tlb
//!
//! ## 教案目的（Why）
//! - **定位**：账本数据描述格式（TL-B）的声明式编解码引擎，把 Cell DAG 与业务记录相互转换；
//! - **架构角色**：建立在 `spark-cell` 的位游标与位构建器之上，记录布局以逐字段的文本指令声明，
//!   引擎按指令解释执行，业务代码不再手写位操作；
//! - **设计策略**：模式在注册时一次性解析与校验，运行期只做解释；嵌套记录统一经由记录级分发入口递归，
//!   自定义编解码能力与资源限额在任意嵌套深度生效。
//!
//! ## 交互契约（What）
//! - [`SchemaBuilder`]：注册记录类型，返回 `Arc<Schema>` 或 [`SchemaError`]；
//! - [`decode`] / [`encode`]：顶层入口，使用默认 [`CodecLimits`]；`*_with_limits` 变体接受显式限额；
//! - [`decode_record`] / [`encode_record`]：供自定义编解码器递归调用的记录级入口；
//! - [`probe`]：按魔数在多个变体中择一；
//! - [`TlbRecord`] + [`load_from_cell`] / [`to_cell`]：强类型门面。
//!
//! ## 指令速查
//! | 指令 | 含义 |
//! |---|---|
//! | `-` | 不占位，保留零值 |
//! | `maybe X` | 1 位存在标志 + `X` |
//! | `either A B` | 1 位选择标志，0 → `A`，1 → `B` |
//! | `## N` | N 位整数（N ≤ 256） |
//! | `bits N` / `bool` / `addr` | 位串 / 单个位 / 地址 |
//! | `^` / `.` | 子引用 / 内联 |
//! | `dict N [-> array [^]]` | 字典，可变换为有序序列 |
//! | `#hex` / `$bin` | 魔数 |
//!
//! ## 风险提示（Trade-offs）
//! - 模式以 `Arc` 组合，不支持自引用递归类型；
//! - 库本身不安装任何 `tracing` 订阅者，日志输出由调用方决定。

mod config;
mod context;
mod decoder;
mod directive;
mod dispatch;
mod encoder;
mod error;
mod probe;
mod record;
mod schema;
mod transform;
mod value;

use std::sync::Arc;

use spark_cell::{Cell, CellSlice};

pub use crate::{
    config::{CodecLimits, DEFAULT_MAX_CELLS, DEFAULT_MAX_DEPTH},
    context::{DecodeContext, EncodeContext},
    directive::{Directive, Transform, Via},
    dispatch::{
        CustomDecode, CustomEncode, decode_generic, decode_record, encode_generic, encode_record,
    },
    error::{ConfigError, DataError, DataErrorKind, SchemaError, SchemaErrorReason},
    probe::probe,
    record::{Record, TlbRecord},
    schema::{Field, FieldKind, MAGIC_FIELD_NAME, Schema, SchemaBuilder},
    transform::to_ordered_sequence,
    value::FieldValue,
};

/// 以默认限额解码一条记录。
pub fn decode(schema: &Arc<Schema>, slice: &mut CellSlice) -> Result<Record, DataError> {
    decode_with_limits(schema, slice, CodecLimits::default())
}

/// 以显式限额解码一条记录；根 Cell 计入一次。
pub fn decode_with_limits(
    schema: &Arc<Schema>,
    slice: &mut CellSlice,
    limits: CodecLimits,
) -> Result<Record, DataError> {
    let mut ctx = DecodeContext::new(limits);
    ctx.charge_cell()?;
    decode_record(schema, slice, &mut ctx)
}

/// 以默认限额把记录编码为 Cell。
pub fn encode(record: &Record) -> Result<Arc<Cell>, DataError> {
    encode_with_limits(record, CodecLimits::default())
}

/// 以显式限额把记录编码为 Cell。
pub fn encode_with_limits(record: &Record, limits: CodecLimits) -> Result<Arc<Cell>, DataError> {
    let mut ctx = EncodeContext::new(limits);
    encode_record(record, &mut ctx)
}

/// 从游标读取强类型值。
pub fn load_from_cell<T: TlbRecord>(slice: &mut CellSlice) -> Result<T, DataError> {
    let record = decode(&T::schema(), slice)?;
    T::from_record(&record)
}

/// 把强类型值编码为 Cell。
pub fn to_cell<T: TlbRecord>(value: &T) -> Result<Arc<Cell>, DataError> {
    encode(&value.to_record()?)
}
