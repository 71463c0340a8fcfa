//! # dict 模块说明
//!
//! ## 角色定位（Why）
//! - 提供定长键的有序映射 [`Dictionary`]，以及其 `HashmapE` 前缀树（Patricia）编码；
//! - 上层解码引擎只依赖“按键升序枚举”与“整体读写”两个契约，树形布局细节封装在本模块。
//!
//! ## 布局（What）
//! ```text
//! hme_empty$0 | hme_root$1 ^(Hashmap n X)
//! hm_edge#_ label:(HmLabel ~l n) node:(HashmapNode (n - l) X)
//! hmn_leaf#_ value:X                       -- 剩余键位为 0
//! hmn_fork#_ left:^Hashmap right:^Hashmap  -- 剩余键位 > 0，消耗 1 个分叉位
//! hml_short$0 len:(Unary ~l) s:(l * Bit)
//! hml_long$10 l:(#<= n) s:(l * Bit)
//! hml_same$11 v:Bit l:(#<= n)
//! ```
//!
//! ## 实现策略（How）
//! - 编码时对每条边取所有键的最长公共前缀作为标签，并在三种标签形式中选择最短者；
//! - 解码时接受任意合法标签形式，拒绝超过剩余键位的标签。

use std::collections::BTreeMap;
use std::sync::Arc;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::builder::CellBuilder;
use crate::cell::{Cell, MAX_BITS};
use crate::error::CellError;
use crate::slice::CellSlice;

/// 定长键、Cell 值的有序映射。
///
/// - **契约 (What)**：键为小于 `2^key_bits` 的无符号整数；枚举顺序为键升序，
///   与定长键位串的字典序一致。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    key_bits: usize,
    entries: BTreeMap<BigUint, Arc<Cell>>,
}

impl Dictionary {
    /// 创建空字典，`key_bits` 取值 `1..=1023`。
    pub fn new(key_bits: usize) -> Result<Self, CellError> {
        if key_bits == 0 || key_bits > MAX_BITS {
            return Err(CellError::InvalidDictionaryKey(format!(
                "key width {key_bits} outside 1..={MAX_BITS}"
            )));
        }
        Ok(Self {
            key_bits,
            entries: BTreeMap::new(),
        })
    }

    /// 键位宽。
    #[must_use]
    pub fn key_bits(&self) -> usize {
        self.key_bits
    }

    /// 条目数。
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空。
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 插入或替换条目，返回旧值。
    pub fn set(
        &mut self,
        key: impl Into<BigUint>,
        value: Arc<Cell>,
    ) -> Result<Option<Arc<Cell>>, CellError> {
        let key = key.into();
        if key.bits() > self.key_bits as u64 {
            return Err(CellError::InvalidDictionaryKey(format!(
                "key {key} does not fit into {} bits",
                self.key_bits
            )));
        }
        Ok(self.entries.insert(key, value))
    }

    /// 按键查询。
    #[must_use]
    pub fn get(&self, key: &BigUint) -> Option<&Arc<Cell>> {
        self.entries.get(key)
    }

    /// 删除条目。
    pub fn remove(&mut self, key: &BigUint) -> Option<Arc<Cell>> {
        self.entries.remove(key)
    }

    /// 按键升序枚举全部条目。
    pub fn iter(&self) -> impl Iterator<Item = (&BigUint, &Arc<Cell>)> {
        self.entries.iter()
    }

    /// 编码为 `Hashmap` 根节点；空字典返回 `None`。
    pub fn to_root_cell(&self) -> Result<Option<Arc<Cell>>, CellError> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        let keyed: Vec<(Vec<bool>, &Arc<Cell>)> = self
            .entries
            .iter()
            .map(|(key, value)| (key_to_bits(key, self.key_bits), value))
            .collect();
        build_edge(&keyed, 0, self.key_bits).map(Some)
    }

    /// 从 `Hashmap` 根节点解析全部条目，追加到当前字典。
    ///
    /// 每访问一个分叉或叶子消耗一个节点预算，预算耗尽时立即停止遍历；
    /// 同一子树被多个分叉引用时按访问次数重复计数。
    pub(crate) fn load_root(&mut self, root: &Arc<Cell>, max_nodes: usize) -> Result<(), CellError> {
        let mut prefix = Vec::with_capacity(self.key_bits);
        let mut budget = NodeBudget {
            left: max_nodes,
            max: max_nodes,
        };
        parse_edge(
            root.begin_parse(),
            &mut prefix,
            self.key_bits,
            &mut budget,
            &mut self.entries,
        )
    }
}

struct NodeBudget {
    left: usize,
    max: usize,
}

impl NodeBudget {
    fn take(&mut self) -> Result<(), CellError> {
        if self.left == 0 {
            return Err(CellError::NodeLimitExceeded {
                max_nodes: self.max,
            });
        }
        self.left -= 1;
        Ok(())
    }
}

fn key_to_bits(key: &BigUint, width: usize) -> Vec<bool> {
    (0..width).rev().map(|index| key.bit(index as u64)).collect()
}

fn bits_to_key(bits: &[bool]) -> BigUint {
    let mut key = BigUint::zero();
    for bit in bits {
        key <<= 1u32;
        if *bit {
            key += 1u32;
        }
    }
    key
}

/// `#<= m` 的编码位宽，即 `ceil(log2(m + 1))`。
fn len_bits(max: usize) -> usize {
    (usize::BITS - max.leading_zeros()) as usize
}

fn build_edge(
    entries: &[(Vec<bool>, &Arc<Cell>)],
    depth: usize,
    remaining: usize,
) -> Result<Arc<Cell>, CellError> {
    let first = &entries[0].0;
    let common = (depth..depth + remaining)
        .take_while(|&index| entries.iter().all(|(bits, _)| bits[index] == first[index]))
        .count();

    let mut builder = CellBuilder::new();
    store_label(&mut builder, &first[depth..depth + common], remaining)?;

    if common == remaining {
        // 键唯一，走到叶子时只剩一个条目。
        builder.store_cell_content(entries[0].1)?;
    } else {
        let fork = depth + common;
        let split = entries.partition_point(|(bits, _)| !bits[fork]);
        let child_remaining = remaining - common - 1;
        let left = build_edge(&entries[..split], fork + 1, child_remaining)?;
        let right = build_edge(&entries[split..], fork + 1, child_remaining)?;
        builder.store_ref(left)?.store_ref(right)?;
    }
    Ok(builder.end_cell())
}

fn store_label(builder: &mut CellBuilder, label: &[bool], max: usize) -> Result<(), CellError> {
    let len = label.len();
    let width = len_bits(max);
    let short_cost = 2 * len + 2;
    let long_cost = 2 + width + len;
    let same_cost = 3 + width;
    let same_ok = len > 0 && label.iter().all(|bit| *bit == label[0]);

    if short_cost <= long_cost && (!same_ok || short_cost <= same_cost) {
        builder.store_bool(false)?;
        for _ in 0..len {
            builder.store_bool(true)?;
        }
        builder.store_bool(false)?;
        for bit in label {
            builder.store_bool(*bit)?;
        }
    } else if !same_ok || long_cost <= same_cost {
        builder.store_uint(0b10, 2)?.store_uint(len as u64, width)?;
        for bit in label {
            builder.store_bool(*bit)?;
        }
    } else {
        builder
            .store_uint(0b11, 2)?
            .store_bool(label[0])?
            .store_uint(len as u64, width)?;
    }
    Ok(())
}

fn load_label(slice: &mut CellSlice, max: usize) -> Result<Vec<bool>, CellError> {
    let width = len_bits(max);
    if !slice.load_bool()? {
        let mut len = 0usize;
        while slice.load_bool()? {
            len += 1;
            if len > max {
                return Err(CellError::MalformedDictionary("short label exceeds key width"));
            }
        }
        return (0..len).map(|_| slice.load_bool()).collect();
    }

    let same = slice.load_bool()?;
    if same {
        let value = slice.load_bool()?;
        let len = slice.load_uint(width)? as usize;
        if len > max {
            return Err(CellError::MalformedDictionary("same label exceeds key width"));
        }
        Ok(vec![value; len])
    } else {
        let len = slice.load_uint(width)? as usize;
        if len > max {
            return Err(CellError::MalformedDictionary("long label exceeds key width"));
        }
        (0..len).map(|_| slice.load_bool()).collect()
    }
}

fn parse_edge(
    mut slice: CellSlice,
    prefix: &mut Vec<bool>,
    remaining: usize,
    budget: &mut NodeBudget,
    out: &mut BTreeMap<BigUint, Arc<Cell>>,
) -> Result<(), CellError> {
    budget.take()?;
    let label = load_label(&mut slice, remaining)?;
    let depth = prefix.len();
    prefix.extend_from_slice(&label);
    let rest = remaining - label.len();

    if rest == 0 {
        out.insert(bits_to_key(prefix), slice.load_remaining());
    } else {
        let left = slice.load_ref()?;
        let right = slice.load_ref()?;
        for (branch, child) in [(false, left), (true, right)] {
            prefix.push(branch);
            parse_edge(child, prefix, rest - 1, budget, out)?;
            prefix.pop();
        }
    }

    prefix.truncate(depth);
    Ok(())
}
