#![warn(missing_docs)]

//! # spark-cell
//!
//! ## 教案目的（Why）
//! - **定位**：账本数据描述格式中的 Cell DAG 数据模型，每个节点是一段有序位缓冲加至多四个子引用；
//! - **架构角色**：为 `spark-codec-tlb` 的指令解释器提供位游标、位构建器、地址与字典四类原语，
//!   解释器只通过这些固定契约读写数据，不关心位如何打包进字节；
//! - **设计策略**：所有越界、溢出、格式错误均以 [`CellError`] 返回，不在输入路径上 panic。
//!
//! ## 交互契约（What）
//! - [`Cell`]：不可变节点，`Arc` 共享；
//! - [`CellBuilder`]：只追加写入器，`end_cell` 冻结；
//! - [`CellSlice`]：顺序读取游标，`load_ref` 解引用得到子游标；
//! - [`Address`]：`addr_none` / `addr_extern` / `addr_std` 三种形态；
//! - [`Dictionary`]：定长键有序映射，以 `HashmapE` 前缀树编码。
//!
//! ## 风险提示（Trade-offs）
//! - 未实现 Cell 表示哈希与 BoC 序列化，二者不属于编解码引擎的职责范围。

mod address;
mod builder;
mod cell;
mod dict;
mod error;
mod slice;

pub use address::Address;
pub use builder::{CellBuilder, MAX_BIG_WIDTH, MAX_NATIVE_WIDTH};
pub use cell::{Cell, CellRefs, MAX_BITS, MAX_REFS};
pub use dict::Dictionary;
pub use error::CellError;
pub use slice::CellSlice;

#[doc = "便捷导出：任意精度整数类型。"]
pub use num_bigint::{BigInt, BigUint};
