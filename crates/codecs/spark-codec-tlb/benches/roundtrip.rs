use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use spark_cell::{Address, CellBuilder, Dictionary};
use spark_codec_tlb::{FieldKind, Record, Schema, SchemaBuilder, decode, encode};

fn transfer_schema() -> Arc<Schema> {
    let entry = SchemaBuilder::new("Entry")
        .field("amount", FieldKind::Uint, "## 32")
        .build()
        .expect("entry schema");
    SchemaBuilder::new("Transfer")
        .magic("#0f8a7ea5")
        .field("query_id", FieldKind::Uint, "## 64")
        .field("destination", FieldKind::Address, "addr")
        .field("entries", FieldKind::Sequence(entry), "dict 16 -> array")
        .field("payload", FieldKind::Cell, "maybe ^")
        .build()
        .expect("transfer schema")
}

fn sample_record(schema: &Arc<Schema>) -> Record {
    let mut dict = Dictionary::new(16).expect("dict");
    for key in 0u32..32 {
        let mut value = CellBuilder::new();
        value.store_uint(u64::from(key) * 3, 32).expect("value");
        dict.set(key * 7, value.end_cell()).expect("key");
    }
    let mut payload = CellBuilder::new();
    payload.store_uint(0xfeed_beef, 32).expect("payload");
    Record::new(schema)
        .with("query_id", 42u64)
        .and_then(|r| r.with("destination", Address::std(0, [0x11; 32])))
        .and_then(|r| r.with("entries", dict))
        .and_then(|r| r.with("payload", payload.end_cell()))
        .expect("record")
}

/// `bench_roundtrip` 衡量模式驱动解释器在典型消息上的编码与解码耗时。
///
/// # 设计目的（Why）
/// - 指令在注册时已解析，热路径只剩位读写与字典遍历，该基准用于发现解释开销的回归。
///
/// # 执行逻辑（How）
/// - `encode` 基准写出含 32 条目字典的消息；`decode` 基准读取同一 Cell 并执行字典到序列的变换。
fn bench_roundtrip(c: &mut Criterion) {
    let schema = transfer_schema();
    let record = sample_record(&schema);
    let cell = encode(&record).expect("encode");

    c.bench_function("tlb_encode_transfer", |b| {
        b.iter(|| encode(black_box(&record)).expect("encode"))
    });
    c.bench_function("tlb_decode_transfer", |b| {
        b.iter(|| decode(black_box(&schema), &mut cell.begin_parse()).expect("decode"))
    });
}

criterion_group!(tlb_benches, bench_roundtrip);
criterion_main!(tlb_benches);
