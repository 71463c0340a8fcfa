//! # dispatch 模块说明
//!
//! ## 角色定位（Why）
//! - 少数记录类型的位布局无法用指令描述（例如依赖前序字段值的变长结构），需要整体接管编解码；
//! - 接管能力在模式注册时绑定，本模块在**每一次**记录级编解码前检查该能力：
//!   顶层调用与嵌套在 `^`/`.`/字典变换中的调用走同一个入口，能力因此在任何嵌套深度都生效。
//!
//! ## 契约（What）
//! - [`decode_record`] / [`encode_record`] 是记录级唯一入口，负责深度控制与能力分发；
//! - [`decode_generic`] / [`encode_generic`] 绕过能力检查直接运行内建引擎，
//!   供自定义实现在处理完特殊部分后委托其余字段。

use std::sync::Arc;

use spark_cell::{Cell, CellBuilder, CellSlice};
use tracing::debug;

use crate::context::{DecodeContext, EncodeContext};
use crate::error::DataError;
use crate::record::Record;
use crate::schema::Schema;

pub use crate::decoder::decode_generic;
pub use crate::encoder::encode_generic;

/// 自定义解码能力：接管某个模式的整条记录解码。
///
/// - **前置条件**：`slice` 位于该记录的起始位置；
/// - **后置条件**：成功时游标恰好越过该记录占用的位与引用，返回的记录属于 `schema`；
/// - 嵌套记录应通过 [`decode_record`] 递归，以继承深度与 Cell 限额。
pub trait CustomDecode: Send + Sync {
    /// 解码一条记录。
    fn decode(
        &self,
        schema: &Arc<Schema>,
        slice: &mut CellSlice,
        ctx: &mut DecodeContext,
    ) -> Result<Record, DataError>;
}

/// 自定义编码能力：接管某条记录的整体编码，产出其 Cell。
///
/// 以 `.` 内联嵌入时，产出 Cell 的位与引用被追加到父构建器中。
pub trait CustomEncode: Send + Sync {
    /// 编码一条记录。
    fn encode(&self, record: &Record, ctx: &mut EncodeContext) -> Result<Arc<Cell>, DataError>;
}

/// 记录级解码入口：进入一层嵌套，若模式声明了自定义解码能力则交由其处理，否则运行内建引擎。
pub fn decode_record(
    schema: &Arc<Schema>,
    slice: &mut CellSlice,
    ctx: &mut DecodeContext,
) -> Result<Record, DataError> {
    ctx.within_frame(|ctx| match schema.custom_decoder() {
        Some(decoder) => {
            debug!(schema = schema.name(), "custom decoder takes over");
            decoder.decode(schema, slice, ctx)
        }
        None => decode_generic(schema, slice, ctx),
    })
}

/// 记录级编码入口：产出记录自身的 Cell，并计入一个 Cell。
pub fn encode_record(record: &Record, ctx: &mut EncodeContext) -> Result<Arc<Cell>, DataError> {
    let builder = encode_to_builder(record, ctx)?;
    ctx.charge_cell()?;
    Ok(builder.end_cell())
}

/// 编码记录但不冻结，供 `.` 内联嵌入使用；内联内容不单独成为 Cell，因此不计数。
pub(crate) fn encode_to_builder(
    record: &Record,
    ctx: &mut EncodeContext,
) -> Result<CellBuilder, DataError> {
    let schema = record.schema();
    ctx.within_frame(|ctx| match schema.custom_encoder() {
        Some(encoder) => {
            debug!(schema = schema.name(), "custom encoder takes over");
            encoder.encode(record, ctx).map(|cell| cell.to_builder())
        }
        None => encode_generic(record, ctx),
    })
}
