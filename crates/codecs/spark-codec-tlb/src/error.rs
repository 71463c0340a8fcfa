//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 编解码失败分为两个互不相交的类别：**模式定义错误**（程序员写错了指令，致命）与
//!   **数据错误**（输入损坏或变体探测失败，调用方按普通控制流处理）；
//! - 两类错误分属不同类型，调用方在类型层面即可区分，不需要解析字符串。
//!
//! ## 设计要求（What）
//! - [`SchemaError`] 只在 [`crate::SchemaBuilder::build`] 返回，引擎运行期间不会产生；
//! - [`DataError`] 沿调用栈向外传播时逐层追加字段名，最终形成从顶层到失败点的字段路径；
//! - 全部错误派生 `thiserror::Error`，可直接接入 `std::error::Error` 生态。

use spark_cell::CellError;
use thiserror::Error;

/// 指令文本或字段表示不合法的具体原因。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SchemaErrorReason {
    /// 指令为空。
    #[error("directive is empty")]
    Empty,
    /// 无法识别的指令记号。
    #[error("unrecognized token `{0}`")]
    UnknownToken(String),
    /// 指令缺少必需参数，例如 `either` 只给出一个分支。
    #[error("`{0}` is missing an argument")]
    MissingArgument(&'static str),
    /// 位宽参数不是十进制数字。
    #[error("`{directive}` expects a decimal width, got `{token}`")]
    InvalidNumber {
        /// 所属指令。
        directive: &'static str,
        /// 原始记号。
        token: String,
    },
    /// 位宽超出该指令支持的范围。
    #[error("`{directive}` width {width} outside supported range {min}..={max}")]
    WidthOutOfRange {
        /// 所属指令。
        directive: &'static str,
        /// 给定位宽。
        width: u32,
        /// 下界。
        min: u32,
        /// 上界。
        max: u32,
    },
    /// 魔数字面量无法解析。
    #[error("corrupted magic literal `{0}`")]
    InvalidMagic(String),
    /// 魔数字面量超过 64 位。
    #[error("magic literal of {bits} bits exceeds 64 bits")]
    MagicTooWide {
        /// 字面量位数。
        bits: usize,
    },
    /// `->` 之后的变换目标未被支持。
    #[error("transformation to `{0}` is not supported")]
    UnknownTransform(String),
    /// 完整指令之后仍有多余记号。
    #[error("unexpected trailing tokens `{0}`")]
    TrailingTokens(String),
    /// 指令只能单独出现，不能嵌套在 `maybe`/`either` 中。
    #[error("`{0}` must stand alone")]
    NotNestable(String),
    /// 指令与字段声明的表示类型不兼容。
    #[error("directive `{directive}` cannot populate a `{kind}` field")]
    KindMismatch {
        /// 规范化后的指令文本。
        directive: String,
        /// 字段表示类型名称。
        kind: &'static str,
    },
    /// 字段名重复。
    #[error("duplicate field name")]
    DuplicateField,
}

/// 模式定义错误：指出出错的模式、字段与原始指令文本。
///
/// - **意图 (Why)**：该错误说明模式本身写错，应在处理任何数据之前修复，调用点不应尝试恢复；
/// - **契约 (What)**：`directive` 保存原始文本，便于直接定位源代码中的声明。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema `{schema}` field `{field}` (directive `{directive}`): {reason}")]
pub struct SchemaError {
    /// 模式名。
    pub schema: String,
    /// 字段名。
    pub field: String,
    /// 原始指令文本。
    pub directive: String,
    /// 具体原因。
    #[source]
    pub reason: SchemaErrorReason,
}

/// 数据错误的分类。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DataErrorKind {
    /// 底层位游标/构建器失败：位数不足、容量溢出、地址或字典格式非法等。
    #[error(transparent)]
    Cell(#[from] CellError),
    /// 魔数不匹配；这是探测数据属于哪个变体的标准手段。
    #[error("magic is not correct for `{schema}`, want {expected:#x}, got {actual:#x} ({width} bits)")]
    MagicMismatch {
        /// 期望魔数所在的模式。
        schema: String,
        /// 期望值。
        expected: u64,
        /// 实际读到的值。
        actual: u64,
        /// 魔数位宽。
        width: u8,
    },
    /// 编码时字段缺少值（句柄类字段为空且不在 `maybe` 之下）。
    #[error("field has no value")]
    MissingValue,
    /// 字段值的变体与声明的表示类型不符。
    #[error("expected {expected} value, found {found}")]
    TypeMismatch {
        /// 期望的表示类型。
        expected: &'static str,
        /// 实际值的变体。
        found: &'static str,
    },
    /// 记录中不存在该字段。
    #[error("unknown field `{0}`")]
    UnknownField(String),
    /// 变换后的序列无法还原为字典。
    #[error("`{0}` has no inverse; store a dictionary value to encode this field")]
    NoInverseTransform(&'static str),
    /// 超出调用方配置的嵌套深度或 Cell 数量上限。
    #[error("{limit} limit of {max} exceeded")]
    LimitExceeded {
        /// `depth` 或 `cells`。
        limit: &'static str,
        /// 配置的上限。
        max: usize,
    },
    /// 所有候选变体均未匹配。
    #[error("none of {tried} candidate schemas matched")]
    NoMatchingVariant {
        /// 尝试过的候选数。
        tried: usize,
    },
    /// 自定义编解码器报告的失败。
    #[error("custom codec `{codec}` failed: {message}")]
    Custom {
        /// 自定义编解码器所属的模式。
        codec: String,
        /// 失败描述。
        message: String,
    },
}

/// 可恢复的数据错误，携带从顶层记录到失败字段的路径。
///
/// # 教案式说明
/// - **意图 (Why)**：嵌套记录的失败如果只报告“位数不足”，排障时无从判断是哪一层哪一个字段；
/// - **执行 (How)**：引擎在每个字段处理失败时调用 [`DataError::in_field`]，把字段名插入路径头部；
/// - **契约 (What)**：`Display` 输出形如 `outer.inner.value: not enough bits ...`。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{kind}", render_path(.path))]
pub struct DataError {
    path: Vec<String>,
    kind: DataErrorKind,
}

fn render_path(path: &[String]) -> String {
    if path.is_empty() {
        String::new()
    } else {
        let mut out = path.join(".");
        out.push_str(": ");
        out
    }
}

impl DataError {
    /// 以空路径构造数据错误。
    #[must_use]
    pub fn new(kind: DataErrorKind) -> Self {
        Self {
            path: Vec::new(),
            kind,
        }
    }

    /// 构造自定义编解码器错误。
    #[must_use]
    pub fn custom(codec: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DataErrorKind::Custom {
            codec: codec.into(),
            message: message.into(),
        })
    }

    /// 在路径头部追加外层字段名。
    #[must_use]
    pub fn in_field(mut self, field: impl Into<String>) -> Self {
        self.path.insert(0, field.into());
        self
    }

    /// 字段路径，顺序为外层到内层。
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// 错误分类。
    #[must_use]
    pub fn kind(&self) -> &DataErrorKind {
        &self.kind
    }

    /// 是否为魔数不匹配，用于变体探测。
    #[must_use]
    pub fn is_magic_mismatch(&self) -> bool {
        matches!(self.kind, DataErrorKind::MagicMismatch { .. })
    }
}

impl From<DataErrorKind> for DataError {
    fn from(kind: DataErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<CellError> for DataError {
    fn from(err: CellError) -> Self {
        Self::new(DataErrorKind::Cell(err))
    }
}

/// 编解码限额配置加载失败。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML 语法或字段类型错误。
    #[error("failed to parse codec limits: {0}")]
    Parse(#[from] toml::de::Error),
    /// 限额取值非法。
    #[error("invalid codec limit: {0}")]
    InvalidLimit(&'static str),
}
