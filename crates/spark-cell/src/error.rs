//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 汇总位游标、位构建器、地址与字典编解码的全部失败语义；
//! - 上层 `spark-codec-tlb` 将其包装为带字段路径的数据错误，因此这里只描述“发生了什么”，不关心“在哪个字段”。
//!
//! ## 设计要求（What）
//! - 所有错误均可克隆、比较，便于测试断言与探测式解码；
//! - 不得在任何越界路径上 panic，统一返回 [`CellError`]。

use thiserror::Error;

/// Cell 原语层错误。
///
/// - **意图 (Why)**：区分“数据不足”“容量溢出”“取值越界”“格式非法”四类问题，方便上层判断是否为恶意输入。
/// - **契约 (What)**：读取类错误发生时游标位置保持不变；写入类错误发生时构建器内容保持不变。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    /// 游标剩余位数不足。
    #[error("not enough bits: requested {requested}, remaining {remaining}")]
    NotEnoughBits {
        /// 请求读取的位数。
        requested: usize,
        /// 游标剩余位数。
        remaining: usize,
    },

    /// 游标剩余引用不足。
    #[error("not enough references: all {available} references already consumed")]
    NotEnoughRefs {
        /// 该 Cell 的引用总数。
        available: usize,
    },

    /// 写入后位数将超过单个 Cell 的容量。
    #[error("bit overflow: {used} bits used, {requested} more requested, capacity {capacity}")]
    BitOverflow {
        /// 已写入位数。
        used: usize,
        /// 本次请求写入的位数。
        requested: usize,
        /// 单个 Cell 的位容量。
        capacity: usize,
    },

    /// 写入后引用数将超过单个 Cell 的容量。
    #[error("reference overflow: cell already holds {capacity} references")]
    RefOverflow {
        /// 单个 Cell 的引用容量。
        capacity: usize,
    },

    /// 指定位宽超出原语支持的范围。
    #[error("unsupported width {width}, maximum is {max}")]
    WidthOutOfRange {
        /// 请求的位宽。
        width: usize,
        /// 支持的最大位宽。
        max: usize,
    },

    /// 数值无法在给定位宽内表示。
    #[error("value {value} does not fit into {width} bits")]
    ValueOutOfRange {
        /// 十进制表示的取值。
        value: String,
        /// 目标位宽。
        width: usize,
    },

    /// 字节串长度不足以提供请求的位数。
    #[error("byte string of {available} bits is shorter than requested {bits} bits")]
    SliceTooShort {
        /// 请求的位数。
        bits: usize,
        /// 字节串实际提供的位数。
        available: usize,
    },

    /// 地址前缀合法但当前实现不支持。
    #[error("unsupported address form: {0}")]
    UnsupportedAddress(&'static str),

    /// 地址字段取值非法。
    #[error("invalid address: {0}")]
    InvalidAddress(&'static str),

    /// 字典键超出键位宽或键位宽本身非法。
    #[error("invalid dictionary key: {0}")]
    InvalidDictionaryKey(String),

    /// 字典 Patricia 树结构损坏。
    #[error("malformed dictionary: {0}")]
    MalformedDictionary(&'static str),

    /// 字典前缀树的节点数超过调用方给出的预算；共享子树按访问次数计数。
    #[error("dictionary trie visits more than {max_nodes} nodes")]
    NodeLimitExceeded {
        /// 允许访问的节点数上限。
        max_nodes: usize,
    },
}
