//! `roundtrip_props` 属性测试：任意合法记录编码后再解码必须得到同一记录，且游标恰好耗尽。

use std::sync::Arc;

use num_bigint::BigInt;
use proptest::prelude::*;
use spark_cell::{Address, CellBuilder};
use spark_codec_tlb::{FieldKind, FieldValue, Record, Schema, SchemaBuilder, decode, encode};

fn uint_schema(width: u16) -> Arc<Schema> {
    SchemaBuilder::new("Width")
        .field("value", FieldKind::Uint, &format!("## {width}"))
        .field("signed", FieldKind::Int, &format!("## {width}"))
        .build()
        .unwrap()
}

fn mixed_schema() -> Arc<Schema> {
    let inner = SchemaBuilder::new("Inner")
        .magic("$101")
        .field("flag", FieldKind::Bool, "bool")
        .field("tag", FieldKind::Uint, "## 7")
        .build()
        .unwrap();
    SchemaBuilder::new("Mixed")
        .magic("#c0ffee")
        .field("balance", FieldKind::BigInt, "maybe ## 200")
        .field("owner", FieldKind::Address, "maybe addr")
        .field("raw", FieldKind::Bytes, "bits 20")
        .field("inner", FieldKind::Record(inner.clone()), "either . ^")
        .field("extra", FieldKind::BoxedRecord(inner), "maybe .")
        .field("payload", FieldKind::Cell, "maybe ^")
        .build()
        .unwrap()
}

fn arb_big() -> impl Strategy<Value = Option<BigInt>> {
    proptest::option::of(
        (any::<i128>(), 0u32..70).prop_map(|(base, shift)| BigInt::from(base) << shift),
    )
}

fn arb_owner() -> impl Strategy<Value = Option<Address>> {
    proptest::option::of(prop_oneof![
        Just(Address::None),
        (any::<i8>(), any::<[u8; 32]>()).prop_map(|(wc, hash)| Address::std(wc, hash)),
    ])
}

proptest! {
    #[test]
    fn fixed_width_integers_round_trip(width in 1u16..=64, raw in any::<u64>(), signed in any::<i64>()) {
        let schema = uint_schema(width);
        let value = if width == 64 { raw } else { raw & ((1u64 << width) - 1) };
        let shift = 64 - u32::from(width);
        let signed = (signed << shift) >> shift;
        let record = Record::new(&schema)
            .with("value", value).unwrap()
            .with("signed", signed).unwrap();

        let cell = encode(&record).unwrap();
        prop_assert_eq!(cell.bit_len(), 2 * usize::from(width));
        let mut slice = cell.begin_parse();
        let decoded = decode(&schema, &mut slice).unwrap();
        prop_assert!(slice.is_exhausted());
        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn mixed_records_round_trip(
        balance in arb_big(),
        owner in arb_owner(),
        raw in any::<[u8; 3]>(),
        flag in any::<bool>(),
        tag in 0u64..128,
        with_extra in any::<bool>(),
        payload_bits in proptest::option::of(0u64..1024),
    ) {
        let schema = mixed_schema();
        let inner_schema = schema.field("inner").unwrap().kind().nested_schema().unwrap().clone();
        let inner = Record::new(&inner_schema)
            .with("flag", flag).unwrap()
            .with("tag", tag).unwrap();
        let payload = payload_bits.map(|bits| {
            let mut builder = CellBuilder::new();
            builder.store_uint(bits, 10).unwrap();
            builder.end_cell()
        });
        // bits 20 只保留前 20 位，末字节低 4 位必须为零才能逐字节比较。
        let raw = vec![raw[0], raw[1], raw[2] & 0xf0];

        let record = Record::new(&schema)
            .with("balance", balance).unwrap()
            .with("owner", owner).unwrap()
            .with("raw", raw).unwrap()
            .with("inner", inner.clone()).unwrap()
            .with("extra", if with_extra { FieldValue::from(inner) } else { FieldValue::None }).unwrap()
            .with("payload", payload).unwrap();

        let cell = encode(&record).unwrap();
        let mut slice = cell.begin_parse();
        let decoded = decode(&schema, &mut slice).unwrap();
        prop_assert!(slice.is_exhausted());
        prop_assert_eq!(decoded, record);
    }
}
