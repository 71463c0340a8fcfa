//! # encoder 模块说明
//!
//! ## 角色定位（Why）
//! - 内建编码引擎：按声明顺序把记录字段写入位构建器，是解码引擎的逆过程；
//! - 嵌套记录经由 [`crate::encode_record`] 递归，`.` 内联时把子记录内容追加到当前构建器。
//!
//! ## 契约（What）
//! - `maybe` 仅在值为空句柄时写 0，原生类型字段因此总是写 1；
//! - `either` 编码时第二分支为 `^` 则写 1 并走第二分支，否则写 0 走第一分支；
//! - 魔数总是写出其模式值；`-` 不写任何位；
//! - 字典字段为空时写出空字典；变换后的序列没有逆变换，编码时报错。

use spark_cell::{CellBuilder, CellError};
use tracing::{trace, trace_span};

use crate::context::EncodeContext;
use crate::directive::{Directive, Via};
use crate::dispatch::{encode_record, encode_to_builder};
use crate::error::{DataError, DataErrorKind};
use crate::record::Record;
use crate::schema::Field;
use crate::transform::trie_cells;
use crate::value::FieldValue;

/// 以内建引擎编码一条记录，不检查自定义能力，返回尚未冻结的构建器。
pub fn encode_generic(record: &Record, ctx: &mut EncodeContext) -> Result<CellBuilder, DataError> {
    let schema = record.schema();
    let span = trace_span!("tlb.encode", schema = schema.name());
    let _entered = span.enter();

    let mut builder = CellBuilder::new();
    for field in schema.fields() {
        trace!(
            field = field.name(),
            directive = %field.directive(),
            bits_used = builder.bits_used(),
            "encode field"
        );
        let value = field.slot().map(|slot| record.value_at(slot));
        encode_directive(field, field.directive(), value, &mut builder, ctx)
            .map_err(|err| err.in_field(field.name()))?;
    }
    Ok(builder)
}

fn encode_directive(
    field: &Field,
    directive: &Directive,
    value: Option<&FieldValue>,
    builder: &mut CellBuilder,
    ctx: &mut EncodeContext,
) -> Result<(), DataError> {
    match directive {
        Directive::Skip => {}
        Directive::Maybe(inner) => {
            let present = !matches!(value, Some(FieldValue::None));
            builder.store_bool(present)?;
            if present {
                encode_directive(field, inner, value, builder, ctx)?;
            }
        }
        Directive::Either(first, second) => {
            let use_second = second.prefers_reference();
            builder.store_bool(use_second)?;
            let branch = if use_second { second } else { first };
            encode_directive(field, branch, value, builder, ctx)?;
        }
        Directive::FixedWidthInt(width) => {
            let width = usize::from(*width);
            match require(value)? {
                FieldValue::Int(v) => builder.store_int(*v, width)?,
                FieldValue::Uint(v) => builder.store_uint(*v, width)?,
                FieldValue::BigInt(v) => builder.store_big_int(v, width)?,
                other => return Err(value_mismatch(field, other)),
            };
        }
        Directive::Bool => match require(value)? {
            FieldValue::Bool(v) => {
                builder.store_bool(*v)?;
            }
            other => return Err(value_mismatch(field, other)),
        },
        Directive::BitString(bits) => match require(value)? {
            FieldValue::Bytes(v) => {
                builder.store_slice(v, usize::from(*bits))?;
            }
            other => return Err(value_mismatch(field, other)),
        },
        Directive::Address => match require(value)? {
            FieldValue::Address(v) => {
                builder.store_addr(v)?;
            }
            other => return Err(value_mismatch(field, other)),
        },
        Directive::Reference(via) => match (via, require(value)?) {
            (Via::Inline, FieldValue::Cell(cell)) => {
                builder.store_cell_content(cell)?;
            }
            (Via::ChildCell, FieldValue::Cell(cell)) => {
                builder.store_ref(cell.clone())?;
            }
            (Via::Inline, FieldValue::Record(record)) => {
                let inner = encode_to_builder(record, ctx)?;
                builder.store_builder(&inner)?;
            }
            (Via::ChildCell, FieldValue::Record(record)) => {
                let cell = encode_record(record, ctx)?;
                builder.store_ref(cell)?;
            }
            (_, other) => return Err(value_mismatch(field, other)),
        },
        Directive::Magic { pattern, width } => {
            builder.store_uint(*pattern, usize::from(*width))?;
        }
        Directive::Mapping { key_bits, .. } => match value {
            Some(FieldValue::Dict(dict)) => {
                if dict.key_bits() != usize::from(*key_bits) {
                    return Err(DataError::new(DataErrorKind::Cell(
                        CellError::InvalidDictionaryKey(format!(
                            "dictionary keyed by {} bits stored into `dict {key_bits}`",
                            dict.key_bits()
                        )),
                    )));
                }
                ctx.charge_cells(trie_cells(dict.len()))?;
                builder.store_dict(Some(dict))?;
            }
            None | Some(FieldValue::None) => {
                builder.store_dict(None)?;
            }
            Some(FieldValue::Sequence(_)) => {
                return Err(DataError::new(DataErrorKind::NoInverseTransform(
                    "dict -> array",
                )));
            }
            Some(other) => return Err(value_mismatch(field, other)),
        },
    }
    Ok(())
}

fn require(value: Option<&FieldValue>) -> Result<&FieldValue, DataError> {
    match value {
        Some(FieldValue::None) | None => Err(DataError::new(DataErrorKind::MissingValue)),
        Some(value) => Ok(value),
    }
}

fn value_mismatch(field: &Field, found: &FieldValue) -> DataError {
    DataError::new(DataErrorKind::TypeMismatch {
        expected: field.kind().name(),
        found: found.variant_name(),
    })
}
