//! # decoder 模块说明
//!
//! ## 角色定位（Why）
//! - 内建解码引擎：按声明顺序逐字段解释指令，从位游标中读取值填入记录；
//! - 嵌套记录一律经由 [`crate::decode_record`] 递归，自定义能力与限额在每一层都生效。
//!
//! ## 契约（What）
//! - 字段严格按声明顺序处理，游标在成功后恰好越过记录占用的位与引用；
//! - `-` 与缺席的 `maybe` 保留字段零值；魔数不匹配立即失败且不产出部分记录；
//! - 失败向外传播时逐层追加字段名。

use std::sync::Arc;

use spark_cell::{CellError, CellSlice};
use tracing::{debug, trace, trace_span};

use crate::context::DecodeContext;
use crate::directive::{Directive, Via};
use crate::dispatch::decode_record;
use crate::error::{DataError, DataErrorKind};
use crate::record::Record;
use crate::schema::{Field, FieldKind, Schema};
use crate::transform::{apply_transform, trie_cells};
use crate::value::FieldValue;

/// 以内建引擎解码一条记录，不检查自定义能力，也不进入新的嵌套层。
pub fn decode_generic(
    schema: &Arc<Schema>,
    slice: &mut CellSlice,
    ctx: &mut DecodeContext,
) -> Result<Record, DataError> {
    let span = trace_span!("tlb.decode", schema = schema.name());
    let _entered = span.enter();

    let mut record = Record::new(schema);
    for field in schema.fields() {
        trace!(
            field = field.name(),
            directive = %field.directive(),
            bits_left = slice.bits_left(),
            "decode field"
        );
        let value = decode_directive(schema, field, field.directive(), slice, ctx)
            .map_err(|err| err.in_field(field.name()))?;
        if let (Some(slot), Some(value)) = (field.slot(), value) {
            record.put(slot, value);
        }
    }
    Ok(record)
}

/// 返回 `None` 表示保留字段零值。
fn decode_directive(
    schema: &Schema,
    field: &Field,
    directive: &Directive,
    slice: &mut CellSlice,
    ctx: &mut DecodeContext,
) -> Result<Option<FieldValue>, DataError> {
    let value = match directive {
        Directive::Skip => return Ok(None),
        Directive::Maybe(inner) => {
            if !slice.load_bool()? {
                return Ok(None);
            }
            return decode_directive(schema, field, inner, slice, ctx);
        }
        Directive::Either(first, second) => {
            let branch = if slice.load_bool()? { second } else { first };
            return decode_directive(schema, field, branch, slice, ctx);
        }
        Directive::FixedWidthInt(width) => {
            let width = usize::from(*width);
            match field.kind() {
                FieldKind::Int => FieldValue::Int(slice.load_int(width)?),
                FieldKind::Uint => FieldValue::Uint(slice.load_uint(width)?),
                FieldKind::BigInt => FieldValue::BigInt(slice.load_big_int(width)?),
                kind => return Err(kind_mismatch("integer", kind)),
            }
        }
        Directive::Bool => FieldValue::Bool(slice.load_bool()?),
        Directive::BitString(bits) => FieldValue::Bytes(slice.load_slice(usize::from(*bits))?),
        Directive::Address => FieldValue::Address(slice.load_addr()?),
        Directive::Reference(Via::Inline) => decode_nested(field, slice, ctx)?,
        Directive::Reference(Via::ChildCell) => {
            ctx.charge_cell()?;
            if matches!(field.kind(), FieldKind::Cell) {
                FieldValue::Cell(slice.load_ref_cell()?)
            } else {
                let mut child = slice.load_ref()?;
                decode_nested(field, &mut child, ctx)?
            }
        }
        Directive::Magic { pattern, width } => {
            let actual = slice.load_uint(usize::from(*width))?;
            if actual != *pattern {
                debug!(
                    schema = schema.name(),
                    expected = *pattern,
                    actual,
                    width = *width,
                    "magic mismatch"
                );
                return Err(DataError::new(DataErrorKind::MagicMismatch {
                    schema: schema.name().into(),
                    expected: *pattern,
                    actual,
                    width: *width,
                }));
            }
            return Ok(None);
        }
        Directive::Mapping {
            key_bits,
            transform,
        } => {
            // 前缀树节点在遍历途中按预算截断，共享子树无法绕过 Cell 上限。
            let dict = slice
                .load_dict_bounded(usize::from(*key_bits), ctx.cells_remaining())
                .map_err(|err| match err {
                    CellError::NodeLimitExceeded { .. } => ctx.cell_limit_exceeded(),
                    other => DataError::from(other),
                })?;
            ctx.charge_cells(trie_cells(dict.len()))?;
            match (transform, field.kind()) {
                (None, _) => FieldValue::Dict(dict),
                (Some(transform), FieldKind::Sequence(element)) => {
                    FieldValue::Sequence(apply_transform(*transform, &dict, element, ctx)?)
                }
                (Some(_), kind) => return Err(kind_mismatch("sequence", kind)),
            }
        }
    };
    Ok(Some(value))
}

fn decode_nested(
    field: &Field,
    slice: &mut CellSlice,
    ctx: &mut DecodeContext,
) -> Result<FieldValue, DataError> {
    match field.kind() {
        FieldKind::Cell => Ok(FieldValue::Cell(slice.load_remaining())),
        FieldKind::Record(schema) | FieldKind::BoxedRecord(schema) => Ok(FieldValue::Record(
            Box::new(decode_record(schema, slice, ctx)?),
        )),
        kind => Err(kind_mismatch("cell or record", kind)),
    }
}

fn kind_mismatch(expected: &'static str, kind: &FieldKind) -> DataError {
    DataError::new(DataErrorKind::TypeMismatch {
        expected,
        found: kind.name(),
    })
}
