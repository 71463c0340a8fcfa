//! # directive 模块说明
//!
//! ## 角色定位（Why）
//! - 每个字段以一行文本指令描述其位级布局，本模块把文本解析为结构化的 [`Directive`]；
//! - 指令文法是递归的：`maybe`/`either` 包裹的是一条**完整指令**，而不是单个记号，
//!   因此 `maybe either ^ .` 与 `either maybe ## 8 ^` 均可表达。
//!
//! ## 文法（What）
//! ```text
//! directive := "-" | "maybe" directive | "either" directive directive
//!            | "##" N | "bits" N | "bool" | "addr" | "^" | "."
//!            | "dict" N [ "->" "array" [ "^" ] ]
//!            | "#" HEX{1,16} | "$" BIN{1,64}
//! ```
//! - `##` 位宽 `1..=256`；`bits` 与 `dict` 位宽 `1..=1023`；
//! - 完整指令之后残留任何记号都视为错误。
//!
//! ## 实现策略（How）
//! - 以空白切分记号后做递归下降，每个分支只消费自身需要的记号；
//! - 解析只处理文法，字段表示类型的兼容性由 [`crate::SchemaBuilder`] 校验。

use std::fmt;

use crate::error::SchemaErrorReason;

const MAX_INT_WIDTH: u32 = 256;
const MAX_BITS_WIDTH: u32 = 1023;
const MAX_MAGIC_HEX_DIGITS: usize = 16;
const MAX_MAGIC_BIN_DIGITS: usize = 64;

/// `^` 与 `.` 的区别：子记录内联在当前 Cell 中，还是存放在一个子引用里。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    /// `.`：内联。
    Inline,
    /// `^`：子引用。
    ChildCell,
}

/// 字典解码后的可选变换。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// `-> array`：按键升序把每个值解码为元素记录；`dereference` 为真时先跟随值中的子引用。
    ToOrderedSequence {
        /// 值是否为 `^` 形式。
        dereference: bool,
    },
}

/// 结构化的字段指令。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `-`：字段不占用任何位。
    Skip,
    /// `maybe X`：一位存在标志，随后按 `X` 读写。
    Maybe(Box<Directive>),
    /// `either A B`：一位选择标志，0 选 `A`，1 选 `B`。
    Either(Box<Directive>, Box<Directive>),
    /// `## N`：N 位整数。
    FixedWidthInt(u16),
    /// `addr`：地址。
    Address,
    /// `bool`：单个位。
    Bool,
    /// `bits N`：N 位原始位串。
    BitString(u16),
    /// `^` 或 `.`：嵌套 Cell 或子记录。
    Reference(Via),
    /// `#hex`/`$bin`：固定魔数，不绑定字段值。
    Magic {
        /// 魔数值。
        pattern: u64,
        /// 魔数位宽。
        width: u8,
    },
    /// `dict N [-> array [^]]`：N 位键的字典，可附带变换。
    Mapping {
        /// 键位宽。
        key_bits: u16,
        /// 可选变换。
        transform: Option<Transform>,
    },
}

impl Directive {
    /// 解析一条指令文本。
    ///
    /// # 教案式说明
    /// - **前置条件**：`text` 为单行指令，记号以任意空白分隔；
    /// - **后置条件**：成功时所有记号恰好被消费一次；
    /// - **错误**：空指令、未知记号、缺参、位宽越界、魔数损坏、多余记号均返回 [`SchemaErrorReason`]。
    pub fn parse(text: &str) -> Result<Self, SchemaErrorReason> {
        let mut tokens = Tokens {
            items: text.split_whitespace().collect(),
            pos: 0,
        };
        if tokens.items.is_empty() {
            return Err(SchemaErrorReason::Empty);
        }
        let directive = parse_one(&mut tokens, "directive")?;
        if tokens.pos < tokens.items.len() {
            return Err(SchemaErrorReason::TrailingTokens(
                tokens.items[tokens.pos..].join(" "),
            ));
        }
        Ok(directive)
    }

    /// `either` 编码时的分支选择：仅当第二分支为 `^` 时选择第二分支。
    pub(crate) fn prefers_reference(&self) -> bool {
        matches!(self, Self::Reference(Via::ChildCell))
    }
}

struct Tokens<'a> {
    items: Vec<&'a str>,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn next(&mut self) -> Option<&'a str> {
        let token = self.items.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn next_if(&mut self, expected: &str) -> bool {
        if self.items.get(self.pos) == Some(&expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

fn parse_one(tokens: &mut Tokens<'_>, context: &'static str) -> Result<Directive, SchemaErrorReason> {
    let token = tokens
        .next()
        .ok_or(SchemaErrorReason::MissingArgument(context))?;
    let directive = match token {
        "-" => Directive::Skip,
        "maybe" => Directive::Maybe(Box::new(parse_one(tokens, "maybe")?)),
        "either" => {
            let first = parse_one(tokens, "either")?;
            let second = parse_one(tokens, "either")?;
            Directive::Either(Box::new(first), Box::new(second))
        }
        "##" => Directive::FixedWidthInt(parse_width(tokens, "##", MAX_INT_WIDTH)?),
        "bits" => Directive::BitString(parse_width(tokens, "bits", MAX_BITS_WIDTH)?),
        "bool" => Directive::Bool,
        "addr" => Directive::Address,
        "^" => Directive::Reference(Via::ChildCell),
        "." => Directive::Reference(Via::Inline),
        "dict" => {
            let key_bits = parse_width(tokens, "dict", MAX_BITS_WIDTH)?;
            let transform = if tokens.next_if("->") {
                match tokens.next() {
                    Some("array") => Some(Transform::ToOrderedSequence {
                        dereference: tokens.next_if("^"),
                    }),
                    Some(other) => return Err(SchemaErrorReason::UnknownTransform(other.to_string())),
                    None => return Err(SchemaErrorReason::MissingArgument("->")),
                }
            } else {
                None
            };
            Directive::Mapping {
                key_bits,
                transform,
            }
        }
        magic if magic.starts_with('#') => parse_magic(magic, 16, MAX_MAGIC_HEX_DIGITS, 4)?,
        magic if magic.starts_with('$') => parse_magic(magic, 2, MAX_MAGIC_BIN_DIGITS, 1)?,
        other => return Err(SchemaErrorReason::UnknownToken(other.to_string())),
    };
    Ok(directive)
}

fn parse_width(
    tokens: &mut Tokens<'_>,
    directive: &'static str,
    max: u32,
) -> Result<u16, SchemaErrorReason> {
    let token = tokens
        .next()
        .ok_or(SchemaErrorReason::MissingArgument(directive))?;
    let invalid = || SchemaErrorReason::InvalidNumber {
        directive,
        token: token.to_string(),
    };
    if !token.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }
    let width: u32 = token.parse().map_err(|_| invalid())?;
    if width == 0 || width > max {
        return Err(SchemaErrorReason::WidthOutOfRange {
            directive,
            width,
            min: 1,
            max,
        });
    }
    // max 不超过 1023，转换必然成功。
    u16::try_from(width).map_err(|_| invalid())
}

fn parse_magic(
    token: &str,
    radix: u32,
    max_digits: usize,
    bits_per_digit: usize,
) -> Result<Directive, SchemaErrorReason> {
    let digits = &token[1..];
    let well_formed = !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix));
    if !well_formed {
        return Err(SchemaErrorReason::InvalidMagic(token.to_string()));
    }
    if digits.len() > max_digits {
        return Err(SchemaErrorReason::MagicTooWide {
            bits: digits.len() * bits_per_digit,
        });
    }
    let pattern = u64::from_str_radix(digits, radix)
        .map_err(|_| SchemaErrorReason::InvalidMagic(token.to_string()))?;
    Ok(Directive::Magic {
        pattern,
        width: (digits.len() * bits_per_digit) as u8,
    })
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("-"),
            Self::Maybe(inner) => write!(f, "maybe {inner}"),
            Self::Either(first, second) => write!(f, "either {first} {second}"),
            Self::FixedWidthInt(width) => write!(f, "## {width}"),
            Self::Address => f.write_str("addr"),
            Self::Bool => f.write_str("bool"),
            Self::BitString(width) => write!(f, "bits {width}"),
            Self::Reference(Via::ChildCell) => f.write_str("^"),
            Self::Reference(Via::Inline) => f.write_str("."),
            Self::Magic { pattern, width } => {
                let width = usize::from(*width);
                if width % 4 == 0 {
                    write!(f, "#{:0digits$x}", pattern, digits = width / 4)
                } else {
                    write!(f, "${:0width$b}", pattern, width = width)
                }
            }
            Self::Mapping {
                key_bits,
                transform,
            } => {
                write!(f, "dict {key_bits}")?;
                match transform {
                    None => Ok(()),
                    Some(Transform::ToOrderedSequence { dereference: false }) => {
                        f.write_str(" -> array")
                    }
                    Some(Transform::ToOrderedSequence { dereference: true }) => {
                        f.write_str(" -> array ^")
                    }
                }
            }
        }
    }
}
