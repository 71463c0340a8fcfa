//! # schema 模块说明
//!
//! ## 角色定位（Why）
//! - 记录类型在注册时一次性声明：有序字段列表、每个字段的表示类型与指令文本；
//! - 注册阶段完成全部指令解析与“指令 × 表示类型”兼容性校验，引擎运行时只面对结构化数据，
//!   模式写错在处理任何数据之前即以 [`SchemaError`] 暴露。
//!
//! ## 契约（What）
//! - [`SchemaBuilder::build`] 产出不可变的 `Arc<Schema>`，可跨线程共享；
//! - 魔数字段不占用值槽位，[`crate::Record`] 只保存数据字段；
//! - 自定义编解码能力在注册时绑定，分发逻辑通过 [`Schema::custom_decoder`] /
//!   [`Schema::custom_encoder`] 静态判断，不做运行时类型探测。
//!
//! ## 风险提示（Trade-offs）
//! - 子模式以 `Arc` 引用，必须先于父模式构建，因此不支持自引用的递归模式。

use std::fmt;
use std::sync::Arc;

use crate::directive::Directive;
use crate::dispatch::{CustomDecode, CustomEncode};
use crate::error::{SchemaError, SchemaErrorReason};
use crate::value::FieldValue;

/// 未命名魔数字段使用的名称。
pub const MAGIC_FIELD_NAME: &str = "_";

/// 字段的值表示类型。
#[derive(Clone)]
pub enum FieldKind {
    /// 有符号 64 位整数。
    Int,
    /// 无符号 64 位整数。
    Uint,
    /// 任意精度有符号整数（句柄类）。
    BigInt,
    /// 布尔值。
    Bool,
    /// 原始位串。
    Bytes,
    /// 地址（句柄类）。
    Address,
    /// 原始 Cell（句柄类）。
    Cell,
    /// 按值内嵌的子记录。
    Record(Arc<Schema>),
    /// 以句柄持有的子记录，可为空。
    BoxedRecord(Arc<Schema>),
    /// 字典（句柄类）。
    Dict,
    /// 字典变换得到的有序元素序列。
    Sequence(Arc<Schema>),
    /// 魔数标记，不携带值。
    Magic,
}

impl FieldKind {
    /// 表示类型名称，用于错误信息。
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Uint => "uint",
            Self::BigInt => "big_int",
            Self::Bool => "bool",
            Self::Bytes => "bytes",
            Self::Address => "address",
            Self::Cell => "cell",
            Self::Record(_) => "record",
            Self::BoxedRecord(_) => "boxed_record",
            Self::Dict => "dict",
            Self::Sequence(_) => "sequence",
            Self::Magic => "magic",
        }
    }

    /// 句柄类字段默认为空，`maybe` 以是否为空决定存在位。
    #[must_use]
    pub fn is_handle(&self) -> bool {
        matches!(
            self,
            Self::BigInt | Self::Address | Self::Cell | Self::BoxedRecord(_) | Self::Dict
        )
    }

    /// 字段的零值：句柄类为 [`FieldValue::None`]，原生类为零、假或空。
    #[must_use]
    pub fn default_value(&self) -> FieldValue {
        match self {
            Self::Int => FieldValue::Int(0),
            Self::Uint => FieldValue::Uint(0),
            Self::Bool => FieldValue::Bool(false),
            Self::Bytes => FieldValue::Bytes(Vec::new()),
            Self::Record(schema) => FieldValue::Record(Box::new(
                crate::record::Record::new(schema),
            )),
            Self::Sequence(_) => FieldValue::Sequence(Vec::new()),
            Self::BigInt
            | Self::Address
            | Self::Cell
            | Self::BoxedRecord(_)
            | Self::Dict
            | Self::Magic => FieldValue::None,
        }
    }

    /// 嵌套记录或序列元素的模式。
    #[must_use]
    pub fn nested_schema(&self) -> Option<&Arc<Schema>> {
        match self {
            Self::Record(schema) | Self::BoxedRecord(schema) | Self::Sequence(schema) => {
                Some(schema)
            }
            _ => None,
        }
    }

    /// 值的变体是否可以存入该字段。
    pub(crate) fn accepts(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (kind, FieldValue::None) => kind.is_handle(),
            (Self::Int, FieldValue::Int(_))
            | (Self::Uint, FieldValue::Uint(_))
            | (Self::BigInt, FieldValue::BigInt(_))
            | (Self::Bool, FieldValue::Bool(_))
            | (Self::Bytes, FieldValue::Bytes(_))
            | (Self::Address, FieldValue::Address(_))
            | (Self::Cell, FieldValue::Cell(_))
            | (Self::Dict, FieldValue::Dict(_))
            | (Self::Sequence(_), FieldValue::Dict(_)) => true,
            (Self::Record(schema) | Self::BoxedRecord(schema), FieldValue::Record(record)) => {
                record.schema().name() == schema.name()
            }
            (Self::Sequence(schema), FieldValue::Sequence(items)) => items
                .iter()
                .all(|item| item.schema().name() == schema.name()),
            _ => false,
        }
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.nested_schema() {
            Some(schema) => write!(f, "{}<{}>", self.name(), schema.name()),
            None => f.write_str(self.name()),
        }
    }
}

/// 已校验的字段。
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    kind: FieldKind,
    directive: Directive,
    slot: Option<usize>,
}

impl Field {
    /// 字段名。
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 表示类型。
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// 结构化指令。
    #[must_use]
    pub fn directive(&self) -> &Directive {
        &self.directive
    }

    /// 在记录中的值槽位；魔数字段为 `None`。
    #[must_use]
    pub fn slot(&self) -> Option<usize> {
        self.slot
    }
}

/// 不可变的记录模式。
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    slots: usize,
    decoder: Option<Arc<dyn CustomDecode>>,
    encoder: Option<Arc<dyn CustomEncode>>,
}

impl Schema {
    /// 模式名。
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 按声明顺序排列的全部字段（含魔数）。
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// 按名称查找数据字段。
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|field| field.slot.is_some() && field.name == name)
    }

    /// 数据字段数量。
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    /// 注册时绑定的自定义解码能力。
    #[must_use]
    pub fn custom_decoder(&self) -> Option<&Arc<dyn CustomDecode>> {
        self.decoder.as_ref()
    }

    /// 注册时绑定的自定义编码能力。
    #[must_use]
    pub fn custom_encoder(&self) -> Option<&Arc<dyn CustomEncode>> {
        self.encoder.as_ref()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("custom_decoder", &self.decoder.is_some())
            .field("custom_encoder", &self.encoder.is_some())
            .finish()
    }
}

struct PendingField {
    name: String,
    kind: FieldKind,
    directive: String,
}

/// 模式注册入口。
///
/// # 教案式说明
/// - **意图 (Why)**：把“声明字段”与“校验并冻结”分成两步，链式声明保持可读，错误统一在 `build` 返回；
/// - **执行 (How)**：`build` 依次解析每条指令、核对表示类型、检查重名并分配值槽位；
/// - **契约 (What)**：返回的 [`SchemaError`] 指出模式名、字段名与原始指令文本。
///
/// ```
/// use spark_codec_tlb::{FieldKind, SchemaBuilder};
///
/// let transfer = SchemaBuilder::new("Transfer")
///     .magic("#0f8a7ea5")
///     .field("query_id", FieldKind::Uint, "## 64")
///     .field("destination", FieldKind::Address, "addr")
///     .build()
///     .unwrap();
/// assert_eq!(transfer.slot_count(), 2);
/// ```
pub struct SchemaBuilder {
    name: String,
    pending: Vec<PendingField>,
    decoder: Option<Arc<dyn CustomDecode>>,
    encoder: Option<Arc<dyn CustomEncode>>,
}

impl SchemaBuilder {
    /// 以模式名开始注册。
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pending: Vec::new(),
            decoder: None,
            encoder: None,
        }
    }

    /// 追加一个数据字段。
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind, directive: &str) -> Self {
        self.pending.push(PendingField {
            name: name.into(),
            kind,
            directive: directive.to_string(),
        });
        self
    }

    /// 追加一个魔数字段，`directive` 形如 `#0f8a7ea5` 或 `$01`。
    #[must_use]
    pub fn magic(self, directive: &str) -> Self {
        self.field(MAGIC_FIELD_NAME, FieldKind::Magic, directive)
    }

    /// 绑定自定义解码能力。
    #[must_use]
    pub fn custom_decoder(mut self, decoder: Arc<dyn CustomDecode>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// 绑定自定义编码能力。
    #[must_use]
    pub fn custom_encoder(mut self, encoder: Arc<dyn CustomEncode>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// 同时绑定解码与编码能力。
    #[must_use]
    pub fn custom_codec<C>(self, codec: Arc<C>) -> Self
    where
        C: CustomDecode + CustomEncode + 'static,
    {
        let decoder: Arc<dyn CustomDecode> = codec.clone();
        let encoder: Arc<dyn CustomEncode> = codec;
        self.custom_decoder(decoder).custom_encoder(encoder)
    }

    /// 解析并校验全部字段，冻结为不可变模式。
    pub fn build(self) -> Result<Arc<Schema>, SchemaError> {
        let mut fields: Vec<Field> = Vec::with_capacity(self.pending.len());
        let mut slots = 0usize;

        for pending in self.pending {
            let fail = |reason: SchemaErrorReason| SchemaError {
                schema: self.name.clone(),
                field: pending.name.clone(),
                directive: pending.directive.clone(),
                reason,
            };

            let directive = Directive::parse(&pending.directive).map_err(fail)?;
            check_kind(&directive, &pending.kind, true).map_err(fail)?;

            let is_magic = matches!(pending.kind, FieldKind::Magic);
            if !is_magic
                && fields
                    .iter()
                    .any(|field| field.slot.is_some() && field.name == pending.name)
            {
                return Err(fail(SchemaErrorReason::DuplicateField));
            }

            let slot = if is_magic {
                None
            } else {
                slots += 1;
                Some(slots - 1)
            };
            fields.push(Field {
                name: pending.name,
                kind: pending.kind,
                directive,
                slot,
            });
        }

        Ok(Arc::new(Schema {
            name: self.name,
            fields,
            slots,
            decoder: self.decoder,
            encoder: self.encoder,
        }))
    }
}

/// 指令与表示类型的兼容性校验；`top_level` 为假表示位于 `maybe`/`either` 之内。
fn check_kind(
    directive: &Directive,
    kind: &FieldKind,
    top_level: bool,
) -> Result<(), SchemaErrorReason> {
    let mismatch = || SchemaErrorReason::KindMismatch {
        directive: directive.to_string(),
        kind: kind.name(),
    };
    match (directive, kind) {
        (Directive::Skip | Directive::Magic { .. }, _) if !top_level => {
            Err(SchemaErrorReason::NotNestable(directive.to_string()))
        }
        (Directive::Magic { .. }, FieldKind::Magic) => Ok(()),
        (_, FieldKind::Magic) | (Directive::Magic { .. }, _) => Err(mismatch()),
        (Directive::Skip, _) => Ok(()),
        (Directive::Maybe(inner), kind) => check_kind(inner, kind, false),
        (Directive::Either(first, second), kind) => {
            check_kind(first, kind, false)?;
            check_kind(second, kind, false)
        }
        (Directive::FixedWidthInt(width), FieldKind::Int | FieldKind::Uint)
            if usize::from(*width) <= spark_cell::MAX_NATIVE_WIDTH =>
        {
            Ok(())
        }
        (Directive::FixedWidthInt(_), FieldKind::BigInt)
        | (Directive::Bool, FieldKind::Bool)
        | (Directive::BitString(_), FieldKind::Bytes)
        | (Directive::Address, FieldKind::Address)
        | (
            Directive::Reference(_),
            FieldKind::Cell | FieldKind::Record(_) | FieldKind::BoxedRecord(_),
        )
        | (
            Directive::Mapping {
                transform: None, ..
            },
            FieldKind::Dict,
        )
        | (
            Directive::Mapping {
                transform: Some(_), ..
            },
            FieldKind::Sequence(_),
        ) => Ok(()),
        _ => Err(mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf() -> Arc<Schema> {
        SchemaBuilder::new("Leaf")
            .field("value", FieldKind::Uint, "## 8")
            .build()
            .unwrap()
    }

    #[test]
    fn magic_fields_take_no_slot() {
        let schema = SchemaBuilder::new("Op")
            .magic("#01")
            .field("a", FieldKind::Uint, "## 8")
            .magic("$1")
            .field("b", FieldKind::Bool, "bool")
            .build()
            .unwrap();
        assert_eq!(schema.slot_count(), 2);
        let slots: Vec<Option<usize>> = schema.fields().iter().map(Field::slot).collect();
        assert_eq!(slots, [None, Some(0), None, Some(1)]);
        assert_eq!(schema.field("b").and_then(Field::slot), Some(1));
        assert!(schema.field(MAGIC_FIELD_NAME).is_none());
    }

    #[test]
    fn compatibility_table_is_enforced() {
        let accepted = [
            (FieldKind::Int, "## 64"),
            (FieldKind::BigInt, "## 256"),
            (FieldKind::Uint, "maybe ## 32"),
            (FieldKind::Cell, "either . ^"),
            (FieldKind::BoxedRecord(leaf()), "maybe ^"),
            (FieldKind::Record(leaf()), "."),
            (FieldKind::Dict, "dict 32"),
            (FieldKind::Sequence(leaf()), "dict 32 -> array ^"),
            (FieldKind::Address, "-"),
        ];
        for (kind, directive) in accepted {
            let built = SchemaBuilder::new("Ok")
                .field("f", kind.clone(), directive)
                .build();
            assert!(built.is_ok(), "{kind:?} with `{directive}` should be accepted");
        }

        let rejected = [
            (FieldKind::Uint, "## 65"),
            (FieldKind::Bool, "## 1"),
            (FieldKind::Bytes, "addr"),
            (FieldKind::Dict, "dict 8 -> array"),
            (FieldKind::Sequence(leaf()), "dict 8"),
            (FieldKind::Uint, "#ff"),
            (FieldKind::Magic, "## 8"),
            (FieldKind::Magic, "-"),
            (FieldKind::Int, "either ## 8 bool"),
        ];
        for (kind, directive) in rejected {
            let err = SchemaBuilder::new("Bad")
                .field("f", kind.clone(), directive)
                .build()
                .unwrap_err();
            assert!(
                matches!(err.reason, SchemaErrorReason::KindMismatch { .. }),
                "{kind:?} with `{directive}` gave {err}"
            );
            assert_eq!(err.directive, directive);
        }
    }

    #[test]
    fn zero_width_integers_fail_registration() {
        for (kind, directive) in [
            (FieldKind::Uint, "## 0"),
            (FieldKind::BigInt, "maybe ## 0"),
        ] {
            let err = SchemaBuilder::new("Empty")
                .field("n", kind, directive)
                .build()
                .unwrap_err();
            assert!(matches!(
                err.reason,
                SchemaErrorReason::WidthOutOfRange {
                    directive: "##",
                    width: 0,
                    ..
                }
            ));
            assert_eq!(err.field, "n");
        }
    }

    #[test]
    fn skip_and_magic_cannot_nest() {
        let err = SchemaBuilder::new("Nested")
            .field("f", FieldKind::Uint, "maybe -")
            .build()
            .unwrap_err();
        assert_eq!(err.reason, SchemaErrorReason::NotNestable("-".into()));
    }

    #[test]
    fn errors_name_schema_field_and_directive() {
        let err = SchemaBuilder::new("Wallet")
            .field("seqno", FieldKind::Uint, "## 32")
            .field("seqno", FieldKind::Uint, "## 32")
            .build()
            .unwrap_err();
        assert_eq!(err.reason, SchemaErrorReason::DuplicateField);

        let err = SchemaBuilder::new("Wallet")
            .field("flags", FieldKind::Uint, "either ##")
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "schema `Wallet` field `flags` (directive `either ##`): `##` is missing an argument"
        );
    }
}
