use std::sync::Arc;

use num_bigint::{BigInt, Sign};
use num_traits::{One, Zero};

use crate::address::Address;
use crate::cell::{Cell, CellRefs, MAX_BITS, MAX_REFS};
use crate::dict::Dictionary;
use crate::error::CellError;

/// 原生整数读写的最大位宽。
pub const MAX_NATIVE_WIDTH: usize = 64;

/// 任意精度整数读写的最大位宽（`int257` 覆盖有符号 256 位）。
pub const MAX_BIG_WIDTH: usize = 257;

/// `CellBuilder` 是只追加的位缓冲与引用累加器，最终冻结为不可变 [`Cell`]。
///
/// # 设计背景（Why）
/// - 编码引擎逐字段追加位与子引用，需要一个在溢出时返回错误而非 panic 的写入器；
/// - 内联嵌套记录时需要把另一个构建器的内容整体拼接进来（[`CellBuilder::store_builder`]）。
///
/// # 契约说明（What）
/// - 所有 `store_*` 方法先校验容量与取值范围，失败时构建器内容保持不变；
/// - 成功时返回 `&mut Self`，便于链式调用；
/// - [`CellBuilder::end_cell`] 消耗构建器并返回共享的 `Arc<Cell>`。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: CellRefs,
}

impl CellBuilder {
    /// 创建空构建器。
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_cell(cell: &Cell) -> Self {
        Self {
            data: cell.data().to_vec(),
            bit_len: cell.bit_len(),
            refs: cell.refs().iter().cloned().collect(),
        }
    }

    /// 已写入位数。
    #[must_use]
    pub fn bits_used(&self) -> usize {
        self.bit_len
    }

    /// 剩余可写位数。
    #[must_use]
    pub fn bits_left(&self) -> usize {
        MAX_BITS - self.bit_len
    }

    /// 已写入引用数。
    #[must_use]
    pub fn refs_used(&self) -> usize {
        self.refs.len()
    }

    fn ensure_bits(&self, requested: usize) -> Result<(), CellError> {
        if requested > self.bits_left() {
            return Err(CellError::BitOverflow {
                used: self.bit_len,
                requested,
                capacity: MAX_BITS,
            });
        }
        Ok(())
    }

    fn ensure_refs(&self, requested: usize) -> Result<(), CellError> {
        if self.refs.len() + requested > MAX_REFS {
            return Err(CellError::RefOverflow { capacity: MAX_REFS });
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let idx = self.bit_len / 8;
            self.data[idx] |= 1 << (7 - self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    /// 写入单个布尔位。
    pub fn store_bool(&mut self, value: bool) -> Result<&mut Self, CellError> {
        self.ensure_bits(1)?;
        self.push_bit(value);
        Ok(self)
    }

    /// 以 `width` 位大端写入无符号整数。
    ///
    /// - **前置条件**：`width <= 64` 且 `value < 2^width`。
    pub fn store_uint(&mut self, value: u64, width: usize) -> Result<&mut Self, CellError> {
        if width > MAX_NATIVE_WIDTH {
            return Err(CellError::WidthOutOfRange {
                width,
                max: MAX_NATIVE_WIDTH,
            });
        }
        if width < MAX_NATIVE_WIDTH && value >> width != 0 {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                width,
            });
        }
        self.ensure_bits(width)?;
        for shift in (0..width).rev() {
            self.push_bit((value >> shift) & 1 == 1);
        }
        Ok(self)
    }

    /// 以 `width` 位补码写入有符号整数。
    ///
    /// - **前置条件**：`width <= 64` 且 `-2^(width-1) <= value < 2^(width-1)`；`width == 0` 时只接受 0。
    pub fn store_int(&mut self, value: i64, width: usize) -> Result<&mut Self, CellError> {
        if width > MAX_NATIVE_WIDTH {
            return Err(CellError::WidthOutOfRange {
                width,
                max: MAX_NATIVE_WIDTH,
            });
        }
        let fits = if width == 0 {
            value == 0
        } else {
            let bound = 1i128 << (width - 1);
            (-bound..bound).contains(&i128::from(value))
        };
        if !fits {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                width,
            });
        }
        self.store_uint((value as u64) & width_mask(width), width)
    }

    /// 以 `width` 位补码写入任意精度有符号整数，`width` 至多 257。
    pub fn store_big_int(&mut self, value: &BigInt, width: usize) -> Result<&mut Self, CellError> {
        if width > MAX_BIG_WIDTH {
            return Err(CellError::WidthOutOfRange {
                width,
                max: MAX_BIG_WIDTH,
            });
        }
        let fits = if width == 0 {
            value.is_zero()
        } else {
            let bound = BigInt::one() << (width - 1);
            let lower = -bound.clone();
            *value >= lower && *value < bound
        };
        if !fits {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                width,
            });
        }
        self.ensure_bits(width)?;

        // 负数映射为 2^width + value，再逐位写入低 width 位。
        let (_, magnitude) = if value.sign() == Sign::Minus {
            ((BigInt::one() << width) + value).into_parts()
        } else {
            value.clone().into_parts()
        };
        for index in (0..width).rev() {
            self.push_bit(magnitude.bit(index as u64));
        }
        Ok(self)
    }

    /// 写入字节串的前 `bits` 位（MSB-first）。
    pub fn store_slice(&mut self, data: &[u8], bits: usize) -> Result<&mut Self, CellError> {
        if data.len() * 8 < bits {
            return Err(CellError::SliceTooShort {
                bits,
                available: data.len() * 8,
            });
        }
        self.ensure_bits(bits)?;
        for index in 0..bits {
            self.push_bit((data[index / 8] >> (7 - index % 8)) & 1 == 1);
        }
        Ok(self)
    }

    /// 写入地址，布局见 [`Address`]。
    pub fn store_addr(&mut self, address: &Address) -> Result<&mut Self, CellError> {
        self.ensure_bits(address.bit_len())?;
        address.store_into(self)?;
        Ok(self)
    }

    /// 追加一个子引用。
    pub fn store_ref(&mut self, cell: Arc<Cell>) -> Result<&mut Self, CellError> {
        self.ensure_refs(1)?;
        self.refs.push(cell);
        Ok(self)
    }

    /// 将另一个构建器的全部位与引用内联拼接到当前构建器末尾。
    pub fn store_builder(&mut self, other: &CellBuilder) -> Result<&mut Self, CellError> {
        self.ensure_bits(other.bit_len)?;
        self.ensure_refs(other.refs.len())?;
        for index in 0..other.bit_len {
            self.push_bit((other.data[index / 8] >> (7 - index % 8)) & 1 == 1);
        }
        self.refs.extend(other.refs.iter().cloned());
        Ok(self)
    }

    /// 将一个 Cell 的全部内容内联拼接到当前构建器末尾。
    pub fn store_cell_content(&mut self, cell: &Cell) -> Result<&mut Self, CellError> {
        self.ensure_bits(cell.bit_len())?;
        self.ensure_refs(cell.refs().len())?;
        for index in 0..cell.bit_len() {
            self.push_bit(cell.bit(index));
        }
        self.refs.extend(cell.refs().iter().cloned());
        Ok(self)
    }

    /// 以 `HashmapE` 形式写入字典：空字典（或缺失）写 1 个 0 位，否则写 1 位并引用根节点。
    pub fn store_dict(&mut self, dict: Option<&Dictionary>) -> Result<&mut Self, CellError> {
        match dict.map(Dictionary::to_root_cell).transpose()?.flatten() {
            None => self.store_bool(false),
            Some(root) => {
                self.ensure_bits(1)?;
                self.ensure_refs(1)?;
                self.push_bit(true);
                self.refs.push(root);
                Ok(self)
            }
        }
    }

    /// 冻结为不可变 Cell。
    #[must_use]
    pub fn end_cell(self) -> Arc<Cell> {
        Arc::new(Cell::from_parts(self.data, self.bit_len, self.refs))
    }
}

pub(crate) fn width_mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}
