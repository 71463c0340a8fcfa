//! # context 模块说明
//!
//! ## 角色定位（Why）
//! - 解码与编码在递归深度、Cell 计数上的约束逻辑完全相同，仅错误文案与日志标签存在“encoder/decoder”差异；
//! - 以 [`FrameConstraints`] 承载共享算法，[`DecodeContext`] 与 [`EncodeContext`] 只是带角色的薄包装，
//!   自定义编解码器通过它们与内建引擎共享同一份限额。
//!
//! ## 契约（What）
//! - 进入嵌套记录前检查深度，离开时回退，失败路径同样回退；
//! - 每解引用或产出一个 Cell 扣减一次计数，超限返回 [`DataErrorKind::LimitExceeded`]；
//! - 所有方法在返回错误时不修改内部状态。

use tracing::debug;

use crate::config::CodecLimits;
use crate::error::{DataError, DataErrorKind};

/// 约束生效的一端，用于日志标签。
#[derive(Clone, Copy, Debug)]
pub(crate) enum FrameRole {
    Encoder,
    Decoder,
}

impl FrameRole {
    fn label(self) -> &'static str {
        match self {
            FrameRole::Encoder => "encoder",
            FrameRole::Decoder => "decoder",
        }
    }
}

/// 深度与 Cell 计数的共享实现。
#[derive(Debug)]
pub(crate) struct FrameConstraints {
    limits: CodecLimits,
    current_depth: u16,
    cells: usize,
    role: FrameRole,
}

impl FrameConstraints {
    fn new(limits: CodecLimits, role: FrameRole) -> Self {
        Self {
            limits,
            current_depth: 0,
            cells: 0,
            role,
        }
    }

    fn charge_cell(&mut self) -> Result<(), DataError> {
        if self.cells >= self.limits.max_cells {
            return Err(self.cell_limit_exceeded());
        }
        self.cells += 1;
        Ok(())
    }

    fn cells_remaining(&self) -> usize {
        self.limits.max_cells.saturating_sub(self.cells)
    }

    fn cell_limit_exceeded(&self) -> DataError {
        debug!(
            role = self.role.label(),
            max_cells = self.limits.max_cells,
            "cell limit exceeded"
        );
        DataError::new(DataErrorKind::LimitExceeded {
            limit: "cells",
            max: self.limits.max_cells,
        })
    }

    fn enter(&mut self) -> Result<(), DataError> {
        if self.current_depth >= self.limits.max_depth {
            debug!(
                role = self.role.label(),
                depth = self.current_depth + 1,
                max_depth = self.limits.max_depth,
                "depth limit exceeded"
            );
            return Err(DataError::new(DataErrorKind::LimitExceeded {
                limit: "depth",
                max: usize::from(self.limits.max_depth),
            }));
        }
        self.current_depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.current_depth = self.current_depth.saturating_sub(1);
    }
}

macro_rules! context_common {
    ($ty:ident, $role:expr) => {
        impl $ty {
            /// 以给定限额构造上下文。
            #[must_use]
            pub fn new(limits: CodecLimits) -> Self {
                Self {
                    constraints: FrameConstraints::new(limits, $role),
                }
            }

            /// 当前限额。
            #[must_use]
            pub fn limits(&self) -> CodecLimits {
                self.constraints.limits
            }

            /// 当前嵌套深度，未进入任何记录时为 0。
            #[must_use]
            pub fn current_depth(&self) -> u16 {
                self.constraints.current_depth
            }

            /// 已计入的 Cell 数。
            #[must_use]
            pub fn cells_charged(&self) -> usize {
                self.constraints.cells
            }

            /// 计入一个 Cell，超出 `max_cells` 时返回错误。
            pub fn charge_cell(&mut self) -> Result<(), DataError> {
                self.constraints.charge_cell()
            }

            /// 尚可计入的 Cell 数。
            #[must_use]
            pub fn cells_remaining(&self) -> usize {
                self.constraints.cells_remaining()
            }

            /// 构造 Cell 数超限错误，供自行遍历结构并在途中截断的调用方使用。
            #[must_use]
            pub fn cell_limit_exceeded(&self) -> DataError {
                self.constraints.cell_limit_exceeded()
            }

            /// 一次计入多个 Cell，例如整棵字典前缀树。
            pub fn charge_cells(&mut self, count: usize) -> Result<(), DataError> {
                for _ in 0..count {
                    self.constraints.charge_cell()?;
                }
                Ok(())
            }

            /// 在下一层嵌套中执行 `f`，无论成功与否离开时都回退深度。
            pub(crate) fn within_frame<T>(
                &mut self,
                f: impl FnOnce(&mut Self) -> Result<T, DataError>,
            ) -> Result<T, DataError> {
                self.constraints.enter()?;
                let result = f(self);
                self.constraints.leave();
                result
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new(CodecLimits::default())
            }
        }
    };
}

/// 解码上下文：限额、当前深度与已访问的 Cell 数。
#[derive(Debug)]
pub struct DecodeContext {
    constraints: FrameConstraints,
}

/// 编码上下文：限额、当前深度与已产出的 Cell 数。
#[derive(Debug)]
pub struct EncodeContext {
    constraints: FrameConstraints,
}

context_common!(DecodeContext, FrameRole::Decoder);
context_common!(EncodeContext, FrameRole::Encoder);

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn depth_is_restored_after_failure() {
        let mut ctx = DecodeContext::new(CodecLimits::new(2, 16));
        let result: Result<(), DataError> = ctx.within_frame(|ctx| {
            assert_eq!(ctx.current_depth(), 1);
            ctx.within_frame(|ctx| {
                assert_eq!(ctx.current_depth(), 2);
                ctx.within_frame(|_| Ok(()))
            })
        });
        assert_eq!(
            result.unwrap_err().kind(),
            &DataErrorKind::LimitExceeded {
                limit: "depth",
                max: 2
            }
        );
        assert_eq!(ctx.current_depth(), 0);
    }

    #[traced_test]
    #[test]
    fn cell_charges_stop_at_limit() {
        let mut ctx = EncodeContext::new(CodecLimits::new(4, 2));
        ctx.charge_cell().unwrap();
        ctx.charge_cell().unwrap();
        let err = ctx.charge_cell().unwrap_err();
        assert!(matches!(
            err.kind(),
            DataErrorKind::LimitExceeded { limit: "cells", max: 2 }
        ));
        assert_eq!(ctx.cells_charged(), 2);
        assert!(logs_contain("cell limit exceeded"));
        assert!(logs_contain("encoder"));
    }
}
