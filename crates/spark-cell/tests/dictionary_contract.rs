//! `dictionary_contract` 集成测试：从公开 API 视角验证字典的 `HashmapE` 编码契约。
//!
//! # 测试目标（Why）
//! - 解码引擎的字典变换依赖“按键升序枚举”与“写入后原样读回”两条契约；
//! - 前缀树布局一旦回归，所有包含字典字段的记录都会失真，因此单独覆盖。
//!
//! # 结构安排（How）
//! - 固定用例覆盖空字典、多分叉、值携带子引用；
//! - `proptest` 随机生成键集合，验证读回后条目与顺序完全一致。

use std::sync::Arc;

use proptest::prelude::*;
use spark_cell::{BigUint, Cell, CellBuilder, CellError, Dictionary};

fn leaf(tag: u64, with_ref: bool) -> Arc<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_uint(tag, 32).unwrap();
    if with_ref {
        let mut child = CellBuilder::new();
        child.store_uint(tag ^ 0xffff, 16).unwrap();
        builder.store_ref(child.end_cell()).unwrap();
    }
    builder.end_cell()
}

fn round_trip(dict: &Dictionary) -> Dictionary {
    let mut builder = CellBuilder::new();
    builder.store_uint(0b101, 3).unwrap();
    builder.store_dict(Some(dict)).unwrap();
    builder.store_bool(true).unwrap();
    let cell = builder.end_cell();

    let mut slice = cell.begin_parse();
    assert_eq!(slice.load_uint(3).unwrap(), 0b101);
    let decoded = slice.load_dict(dict.key_bits()).unwrap();
    assert!(slice.load_bool().unwrap(), "字典之后的字段必须保持对齐");
    assert!(slice.is_exhausted());
    decoded
}

#[test]
fn empty_dictionary_is_a_single_zero_bit() {
    let dict = Dictionary::new(8).unwrap();
    let mut builder = CellBuilder::new();
    builder.store_dict(Some(&dict)).unwrap();
    builder.store_dict(None).unwrap();
    let cell = builder.end_cell();
    assert_eq!(cell.bit_len(), 2);
    assert!(cell.refs().is_empty());

    let mut slice = cell.begin_parse();
    assert!(slice.load_dict(8).unwrap().is_empty());
    assert!(slice.load_dict(8).unwrap().is_empty());
}

#[test]
fn forks_and_value_refs_survive_round_trip() {
    let mut dict = Dictionary::new(8).unwrap();
    for key in [1u32, 2, 3, 0x80, 0xff] {
        dict.set(key, leaf(u64::from(key), key % 2 == 1)).unwrap();
    }
    let decoded = round_trip(&dict);
    assert_eq!(decoded, dict);

    let keys: Vec<BigUint> = decoded.iter().map(|(key, _)| key.clone()).collect();
    let expected: Vec<BigUint> = [1u32, 2, 3, 0x80, 0xff]
        .into_iter()
        .map(BigUint::from)
        .collect();
    assert_eq!(keys, expected, "枚举顺序必须为键升序");
}

#[test]
fn missing_root_reference_is_reported() {
    let mut builder = CellBuilder::new();
    builder.store_bool(true).unwrap();
    let cell = builder.end_cell();
    let mut slice = cell.begin_parse();
    assert_eq!(
        slice.load_dict(16).unwrap_err(),
        CellError::NotEnoughRefs { available: 0 }
    );
    assert_eq!(slice.bits_left(), 1, "失败时不得推进游标");
}

#[test]
fn malformed_trie_leaves_cursor_untouched() {
    // hml_long 声明 5 位标签，超过 4 位键宽。
    let mut root = CellBuilder::new();
    root.store_uint(0b10, 2).unwrap();
    root.store_uint(5, 3).unwrap();
    let mut builder = CellBuilder::new();
    builder.store_bool(true).unwrap();
    builder.store_ref(root.end_cell()).unwrap();
    let cell = builder.end_cell();

    let mut slice = cell.begin_parse();
    assert!(matches!(
        slice.load_dict(4),
        Err(CellError::MalformedDictionary(_))
    ));
    assert_eq!(slice.bits_left(), 1);
    assert_eq!(slice.refs_left(), 1);
}

/// 每层分叉的两个子引用指向同一节点：`depth + 1` 个 Cell 展开为 `2^depth` 个条目。
fn shared_fork_chain(depth: usize) -> Arc<Cell> {
    let mut node = {
        let mut leaf = CellBuilder::new();
        leaf.store_uint(0b00, 2).unwrap();
        leaf.store_uint(7, 8).unwrap();
        leaf.end_cell()
    };
    for _ in 0..depth {
        let mut fork = CellBuilder::new();
        fork.store_uint(0b00, 2).unwrap();
        fork.store_ref(node.clone()).unwrap();
        fork.store_ref(node).unwrap();
        node = fork.end_cell();
    }
    let mut builder = CellBuilder::new();
    builder.store_bool(true).unwrap();
    builder.store_ref(node).unwrap();
    builder.end_cell()
}

#[test]
fn node_budget_stops_shared_subtree_expansion() {
    let cell = shared_fork_chain(40);
    let mut slice = cell.begin_parse();
    assert_eq!(
        slice.load_dict_bounded(40, 64).unwrap_err(),
        CellError::NodeLimitExceeded { max_nodes: 64 }
    );
    assert_eq!(slice.bits_left(), 1, "失败时不得推进游标");

    let small = shared_fork_chain(3);
    let dict = small.begin_parse().load_dict_bounded(3, 15).unwrap();
    assert_eq!(dict.len(), 8);
}

proptest! {
    #[test]
    fn arbitrary_key_sets_round_trip(
        key_bits in 1usize..=64,
        raw_keys in proptest::collection::btree_set(any::<u64>(), 0..24),
    ) {
        let mut dict = Dictionary::new(key_bits).unwrap();
        let mask = if key_bits == 64 { u64::MAX } else { (1u64 << key_bits) - 1 };
        for raw in raw_keys {
            let key = raw & mask;
            dict.set(key, leaf(key & 0xffff_ffff, key % 3 == 0)).unwrap();
        }
        let decoded = round_trip(&dict);
        prop_assert_eq!(decoded, dict);
    }
}
