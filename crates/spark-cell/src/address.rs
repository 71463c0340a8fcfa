//! 账本地址的位级布局。
//!
//! 支持的三种形态与前缀：
//! - `addr_none$00`
//! - `addr_extern$01 len:(## 9) external_address:(bits len)`
//! - `addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256`
//!
//! `anycast` 与 `addr_var$11` 目前返回 [`CellError::UnsupportedAddress`]。

use std::fmt;

use crate::builder::CellBuilder;
use crate::error::CellError;
use crate::slice::CellSlice;

const TAG_NONE: u64 = 0b00;
const TAG_EXTERN: u64 = 0b01;
const TAG_STD: u64 = 0b10;

const EXTERN_LEN_BITS: usize = 9;
const MAX_EXTERN_BITS: usize = (1 << EXTERN_LEN_BITS) - 1;

/// 地址值。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// 空地址。
    None,
    /// 外部地址，`data` 保存前 `bit_len` 位。
    External {
        /// 有效位数。
        bit_len: u16,
        /// 位数据，末字节低位补零。
        data: Vec<u8>,
    },
    /// 标准地址：工作链编号与 256 位账户哈希。
    Std {
        /// 工作链编号。
        workchain: i8,
        /// 账户哈希。
        hash: [u8; 32],
    },
}

impl Address {
    /// 构造标准地址。
    #[must_use]
    pub const fn std(workchain: i8, hash: [u8; 32]) -> Self {
        Self::Std { workchain, hash }
    }

    /// 编码后占用的位数。
    #[must_use]
    pub fn bit_len(&self) -> usize {
        match self {
            Self::None => 2,
            Self::External { bit_len, .. } => 2 + EXTERN_LEN_BITS + usize::from(*bit_len),
            Self::Std { .. } => 2 + 1 + 8 + 256,
        }
    }

    pub(crate) fn store_into(&self, builder: &mut CellBuilder) -> Result<(), CellError> {
        match self {
            Self::None => {
                builder.store_uint(TAG_NONE, 2)?;
            }
            Self::External { bit_len, data } => {
                let bits = usize::from(*bit_len);
                if bits > MAX_EXTERN_BITS {
                    return Err(CellError::InvalidAddress("external address longer than 511 bits"));
                }
                if data.len() * 8 < bits {
                    return Err(CellError::InvalidAddress(
                        "external address data shorter than declared length",
                    ));
                }
                builder
                    .store_uint(TAG_EXTERN, 2)?
                    .store_uint(bits as u64, EXTERN_LEN_BITS)?
                    .store_slice(data, bits)?;
            }
            Self::Std { workchain, hash } => {
                builder
                    .store_uint(TAG_STD, 2)?
                    .store_bool(false)?
                    .store_int(i64::from(*workchain), 8)?
                    .store_slice(hash, 256)?;
            }
        }
        Ok(())
    }

    pub(crate) fn load_from(slice: &mut CellSlice) -> Result<Self, CellError> {
        match slice.load_uint(2)? {
            TAG_NONE => Ok(Self::None),
            TAG_EXTERN => {
                let bits = slice.load_uint(EXTERN_LEN_BITS)? as usize;
                let data = slice.load_slice(bits)?;
                Ok(Self::External {
                    bit_len: bits as u16,
                    data,
                })
            }
            TAG_STD => {
                if slice.load_bool()? {
                    return Err(CellError::UnsupportedAddress("anycast"));
                }
                let workchain = slice.load_int(8)? as i8;
                let raw = slice.load_slice(256)?;
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&raw);
                Ok(Self::Std { workchain, hash })
            }
            _ => Err(CellError::UnsupportedAddress("addr_var")),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("addr_none"),
            Self::External { bit_len, data } => {
                write!(f, "extern:{}:{}", bit_len, hex::encode(data))
            }
            Self::Std { workchain, hash } => write!(f, "{}:{}", workchain, hex::encode(hash)),
        }
    }
}
