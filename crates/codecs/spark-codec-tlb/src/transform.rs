//! 字典到有序序列的变换。
//!
//! 对字典按键升序枚举，每个值作为元素记录解码；`dereference` 时值本身只是一个子引用，先跟随再解码。
//! 该变换只在解码方向存在：序列丢失了键，无法还原为字典。

use std::sync::Arc;

use spark_cell::{Cell, Dictionary};

use crate::context::DecodeContext;
use crate::directive::Transform;
use crate::dispatch::decode_record;
use crate::error::DataError;
use crate::record::Record;
use crate::schema::Schema;

/// `n` 个条目的前缀树节点数：`n` 个叶子加 `n - 1` 个分叉。
pub(crate) fn trie_cells(entries: usize) -> usize {
    (2 * entries).saturating_sub(1)
}

/// 按指令携带的变换处理已解码的字典。
pub(crate) fn apply_transform(
    transform: Transform,
    dict: &Dictionary,
    element: &Arc<Schema>,
    ctx: &mut DecodeContext,
) -> Result<Vec<Record>, DataError> {
    match transform {
        Transform::ToOrderedSequence { dereference } => {
            to_ordered_sequence(dict, element, dereference, ctx)
        }
    }
}

/// 将字典变换为元素记录序列，顺序为键升序。
///
/// 值位于字典叶子中，随字典一并计数；跟随子引用时每个元素再计入一个 Cell。
/// 元素失败时错误路径包含其键，例如 `items.[3].amount`。
pub fn to_ordered_sequence(
    dict: &Dictionary,
    element: &Arc<Schema>,
    dereference: bool,
    ctx: &mut DecodeContext,
) -> Result<Vec<Record>, DataError> {
    let mut out = Vec::with_capacity(dict.len());
    for (key, value) in dict.iter() {
        let record = decode_element(value, element, dereference, ctx)
            .map_err(|err| err.in_field(format!("[{key}]")))?;
        out.push(record);
    }
    Ok(out)
}

fn decode_element(
    value: &Arc<Cell>,
    element: &Arc<Schema>,
    dereference: bool,
    ctx: &mut DecodeContext,
) -> Result<Record, DataError> {
    let mut slice = value.begin_parse();
    if dereference {
        ctx.charge_cell()?;
        slice = slice.load_ref()?;
    }
    decode_record(element, &mut slice, ctx)
}
