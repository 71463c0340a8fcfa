use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};

use crate::address::Address;
use crate::builder::{MAX_BIG_WIDTH, MAX_NATIVE_WIDTH, width_mask};
use crate::cell::{Cell, CellRefs};
use crate::dict::Dictionary;
use crate::error::CellError;

/// `CellSlice` 是单个 Cell 上的顺序读取游标。
///
/// # 设计背景（Why）
/// - 解码引擎按字段顺序消费位与子引用，游标需要同时记录位偏移与引用偏移；
/// - 持有 `Arc<Cell>` 而非借用，使解引用得到的子游标可以独立传递给递归解码。
///
/// # 契约说明（What）
/// - 所有 `load_*` 在数据不足时返回 [`CellError`]，且不推进游标；
/// - [`CellSlice::to_cell`] 复制剩余内容但不消费，[`CellSlice::load_remaining`] 复制并消费。
#[derive(Debug, Clone)]
pub struct CellSlice {
    cell: Arc<Cell>,
    bit_pos: usize,
    ref_pos: usize,
}

impl CellSlice {
    pub(crate) fn new(cell: Arc<Cell>) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    /// 剩余未读位数。
    #[must_use]
    pub fn bits_left(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    /// 剩余未读引用数。
    #[must_use]
    pub fn refs_left(&self) -> usize {
        self.cell.refs().len() - self.ref_pos
    }

    /// 位与引用均已读完。
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.bits_left() == 0 && self.refs_left() == 0
    }

    fn ensure_bits(&self, requested: usize) -> Result<(), CellError> {
        let remaining = self.bits_left();
        if requested > remaining {
            return Err(CellError::NotEnoughBits {
                requested,
                remaining,
            });
        }
        Ok(())
    }

    fn take_bit(&mut self) -> bool {
        let bit = self.cell.bit(self.bit_pos);
        self.bit_pos += 1;
        bit
    }

    /// 读取单个布尔位。
    pub fn load_bool(&mut self) -> Result<bool, CellError> {
        self.ensure_bits(1)?;
        Ok(self.take_bit())
    }

    /// 读取 `width` 位无符号整数，`width` 至多 64。
    pub fn load_uint(&mut self, width: usize) -> Result<u64, CellError> {
        if width > MAX_NATIVE_WIDTH {
            return Err(CellError::WidthOutOfRange {
                width,
                max: MAX_NATIVE_WIDTH,
            });
        }
        self.ensure_bits(width)?;
        let mut value = 0u64;
        for _ in 0..width {
            value = (value << 1) | u64::from(self.take_bit());
        }
        Ok(value)
    }

    /// 读取 `width` 位补码有符号整数并做符号扩展。
    pub fn load_int(&mut self, width: usize) -> Result<i64, CellError> {
        let raw = self.load_uint(width)?;
        if width == 0 || width == MAX_NATIVE_WIDTH {
            return Ok(raw as i64);
        }
        if (raw >> (width - 1)) & 1 == 1 {
            Ok((raw | !width_mask(width)) as i64)
        } else {
            Ok(raw as i64)
        }
    }

    /// 读取 `width` 位无符号任意精度整数。
    pub fn load_big_uint(&mut self, width: usize) -> Result<BigUint, CellError> {
        if width > MAX_BIG_WIDTH {
            return Err(CellError::WidthOutOfRange {
                width,
                max: MAX_BIG_WIDTH,
            });
        }
        self.ensure_bits(width)?;
        let mut value = BigUint::zero();
        for _ in 0..width {
            value <<= 1u32;
            if self.take_bit() {
                value += 1u32;
            }
        }
        Ok(value)
    }

    /// 读取 `width` 位补码任意精度有符号整数，`width` 至多 257。
    pub fn load_big_int(&mut self, width: usize) -> Result<BigInt, CellError> {
        let raw = self.load_big_uint(width)?;
        if width > 0 && raw.bit(width as u64 - 1) {
            Ok(BigInt::from(raw) - (BigInt::one() << width))
        } else {
            Ok(BigInt::from(raw))
        }
    }

    /// 读取 `bits` 位原始位串，以 MSB-first 打包为字节，末字节低位补零。
    pub fn load_slice(&mut self, bits: usize) -> Result<Vec<u8>, CellError> {
        self.ensure_bits(bits)?;
        let mut out = vec![0u8; bits.div_ceil(8)];
        for index in 0..bits {
            if self.take_bit() {
                out[index / 8] |= 1 << (7 - index % 8);
            }
        }
        Ok(out)
    }

    /// 读取地址，布局见 [`Address`]。
    pub fn load_addr(&mut self) -> Result<Address, CellError> {
        let checkpoint = self.bit_pos;
        Address::load_from(self).inspect_err(|_| self.bit_pos = checkpoint)
    }

    /// 消费下一个子引用并返回该子 Cell。
    pub fn load_ref_cell(&mut self) -> Result<Arc<Cell>, CellError> {
        let cell = self
            .cell
            .refs()
            .get(self.ref_pos)
            .cloned()
            .ok_or(CellError::NotEnoughRefs {
                available: self.cell.refs().len(),
            })?;
        self.ref_pos += 1;
        Ok(cell)
    }

    /// 消费下一个子引用并返回其读取游标。
    pub fn load_ref(&mut self) -> Result<CellSlice, CellError> {
        self.load_ref_cell().map(CellSlice::new)
    }

    /// 读取 `HashmapE` 字典；0 位表示空字典。
    pub fn load_dict(&mut self, key_bits: usize) -> Result<Dictionary, CellError> {
        self.load_dict_bounded(key_bits, usize::MAX)
    }

    /// 读取 `HashmapE` 字典，前缀树至多访问 `max_nodes` 个节点。
    ///
    /// - **意图 (Why)**：分叉可以重复引用同一子树，少量 Cell 即可展开出指数级条目，
    ///   不可信输入必须在遍历途中而非遍历结束后截断；
    /// - **契约 (What)**：超出预算返回 [`CellError::NodeLimitExceeded`]；
    ///   任何失败都会把游标恢复到调用前的位置。
    pub fn load_dict_bounded(
        &mut self,
        key_bits: usize,
        max_nodes: usize,
    ) -> Result<Dictionary, CellError> {
        let (bit_pos, ref_pos) = (self.bit_pos, self.ref_pos);
        self.read_dict(key_bits, max_nodes).inspect_err(|_| {
            self.bit_pos = bit_pos;
            self.ref_pos = ref_pos;
        })
    }

    fn read_dict(&mut self, key_bits: usize, max_nodes: usize) -> Result<Dictionary, CellError> {
        let mut dict = Dictionary::new(key_bits)?;
        if !self.load_bool()? {
            return Ok(dict);
        }
        let root = self.load_ref_cell()?;
        dict.load_root(&root, max_nodes)?;
        Ok(dict)
    }

    /// 复制剩余位与引用为新 Cell，不推进游标。
    #[must_use]
    pub fn to_cell(&self) -> Arc<Cell> {
        let mut data = vec![0u8; self.bits_left().div_ceil(8)];
        for (index, pos) in (self.bit_pos..self.cell.bit_len()).enumerate() {
            if self.cell.bit(pos) {
                data[index / 8] |= 1 << (7 - index % 8);
            }
        }
        let refs: CellRefs = self.cell.refs()[self.ref_pos..].iter().cloned().collect();
        Arc::new(Cell::from_parts(data, self.bits_left(), refs))
    }

    /// 复制剩余位与引用为新 Cell，并将游标推进到末尾。
    pub fn load_remaining(&mut self) -> Arc<Cell> {
        let rest = self.to_cell();
        self.bit_pos = self.cell.bit_len();
        self.ref_pos = self.cell.refs().len();
        rest
    }
}
