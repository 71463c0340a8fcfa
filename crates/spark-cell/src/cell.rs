use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::builder::CellBuilder;
use crate::slice::CellSlice;

/// 单个 Cell 可容纳的最大位数。
pub const MAX_BITS: usize = 1023;

/// 单个 Cell 可持有的最大子引用数。
pub const MAX_REFS: usize = 4;

/// 子引用列表，至多四项，直接内联在栈上。
pub type CellRefs = SmallVec<[Arc<Cell>; MAX_REFS]>;

/// `Cell` 是 DAG 中的不可变节点：一段有序位缓冲加上至多四个子引用。
///
/// # 设计背景（Why）
/// - 账本数据描述格式以 Cell 为唯一载体，所有记录最终都被压平为若干 Cell 组成的 DAG；
/// - 子节点以 `Arc` 共享，多个父节点可以引用同一子树而无需复制。
///
/// # 契约说明（What）
/// - `data` 以 MSB-first 顺序存放 `bit_len` 个有效位，末字节中多余的低位恒为 0；
/// - 构造完成后不可变，只能通过 [`Cell::begin_parse`] 读取或 [`Cell::to_builder`] 派生新构建器；
/// - 相等性按结构比较（位内容 + 递归比较子引用）。
///
/// # 风险提示（Trade-offs）
/// - 未实现表示哈希与深度等账本级元数据，结构相等足以支撑编解码往返校验。
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: CellRefs,
}

impl Cell {
    /// 由构建器内部调用，调用方已保证容量约束。
    pub(crate) fn from_parts(data: Vec<u8>, bit_len: usize, refs: CellRefs) -> Self {
        Self {
            data,
            bit_len,
            refs,
        }
    }

    /// 返回不含任何位与引用的空 Cell。
    #[must_use]
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::from_parts(Vec::new(), 0, CellRefs::new()))
    }

    /// 有效位数。
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// 原始字节视图，长度为 `ceil(bit_len / 8)`。
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 子引用列表。
    #[must_use]
    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// 读取第 `index` 位；调用方保证 `index < bit_len`。
    pub(crate) fn bit(&self, index: usize) -> bool {
        (self.data[index / 8] >> (7 - index % 8)) & 1 == 1
    }

    /// 从首位开始创建读取游标。
    #[must_use]
    pub fn begin_parse(self: &Arc<Self>) -> CellSlice {
        CellSlice::new(Arc::clone(self))
    }

    /// 派生一个预先填充本 Cell 全部内容的构建器，用于内联拼接。
    #[must_use]
    pub fn to_builder(&self) -> CellBuilder {
        CellBuilder::from_cell(self)
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("bits", &self.bit_len)
            .field("data", &hex::encode(&self.data))
            .field("refs", &self.refs.as_slice())
            .finish()
    }
}
