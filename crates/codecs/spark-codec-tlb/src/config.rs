//! 编解码资源限额。
//!
//! 嵌套记录与子引用在输入数据中可以任意加深，解释器以 [`CodecLimits`] 约束递归深度与访问的 Cell 数，
//! 超限时返回 [`crate::DataErrorKind::LimitExceeded`] 而不是耗尽栈空间。
//!
//! 限额可从 TOML 加载：
//! ```toml
//! max_depth = 16
//! max_cells = 1024
//! ```
//! 缺省字段取默认值。

use serde::Deserialize;

use crate::error::ConfigError;

/// 默认最大嵌套深度。
pub const DEFAULT_MAX_DEPTH: u16 = 64;
/// 默认最大 Cell 数。
pub const DEFAULT_MAX_CELLS: usize = 4096;

/// 单次顶层编解码调用的资源上限。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecLimits {
    /// 记录嵌套层数上限，顶层记录计为第一层。
    pub max_depth: u16,
    /// 解码时访问、编码时产出的 Cell 总数上限。
    pub max_cells: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

impl CodecLimits {
    /// 以显式上限构造。
    #[must_use]
    pub const fn new(max_depth: u16, max_cells: usize) -> Self {
        Self {
            max_depth,
            max_cells,
        }
    }

    /// 从 TOML 文本加载并校验。
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let limits: Self = toml::from_str(text)?;
        limits.validate()?;
        Ok(limits)
    }

    /// 上限必须为正。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidLimit("max_depth must be positive"));
        }
        if self.max_cells == 0 {
            return Err(ConfigError::InvalidLimit("max_cells must be positive"));
        }
        Ok(())
    }
}
