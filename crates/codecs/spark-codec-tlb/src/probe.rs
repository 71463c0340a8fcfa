//! 变体探测：在多个候选模式中找出第一个能解码给定 Cell 的模式。

use std::sync::Arc;

use spark_cell::Cell;
use tracing::trace;

use crate::config::CodecLimits;
use crate::error::{DataError, DataErrorKind};
use crate::record::Record;
use crate::schema::Schema;

/// 依次以全新游标尝试每个候选，返回第一个成功者的下标与记录。
///
/// # 教案式说明
/// - **意图 (Why)**：消息体常以魔数区分变体，调用方需要“是 A 还是 B”的判定；
/// - **执行 (How)**：魔数不匹配视为“不是这个变体”，继续尝试下一个；其它数据错误说明数据确属该变体但已损坏，立即返回；
/// - **契约 (What)**：全部候选都魔数不匹配时返回 [`DataErrorKind::NoMatchingVariant`]。
pub fn probe(
    candidates: &[Arc<Schema>],
    cell: &Arc<Cell>,
    limits: CodecLimits,
) -> Result<(usize, Record), DataError> {
    for (index, schema) in candidates.iter().enumerate() {
        let mut slice = cell.begin_parse();
        match crate::decode_with_limits(schema, &mut slice, limits) {
            Ok(record) => return Ok((index, record)),
            Err(err) if err.is_magic_mismatch() => {
                trace!(schema = schema.name(), "variant rejected by magic");
            }
            Err(err) => return Err(err),
        }
    }
    Err(DataError::new(DataErrorKind::NoMatchingVariant {
        tried: candidates.len(),
    }))
}
