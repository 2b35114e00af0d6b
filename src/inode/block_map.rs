//! 逻辑块映射
//!
//! 用 extent 列表记录逻辑块到物理块的映射。逻辑上连续的块在物理上不必连续，
//! 物理也连续时会合并成一个 extent。

use crate::error::{Error, ErrorKind, Result};
use alloc::vec::Vec;

/// 一段逻辑、物理都连续的映射
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    /// 第一个逻辑块
    pub logical: u32,
    /// 第一个物理块
    pub physical: u64,
    /// 块数
    pub len: u32,
}

impl Extent {
    fn logical_end(&self) -> u64 {
        self.logical as u64 + self.len as u64
    }

    fn physical_end(&self) -> u64 {
        self.physical + self.len as u64
    }
}

/// 块映射（按逻辑块排序、互不重叠）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockMap {
    extents: Vec<Extent>,
}

impl BlockMap {
    /// 创建空映射
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有 extent
    pub fn extents(&self) -> &[Extent] {
        &self.extents
    }

    /// 已映射的块数
    pub fn mapped_blocks(&self) -> u64 {
        self.extents.iter().map(|e| e.len as u64).sum()
    }

    /// 将逻辑块号映射到物理块号，空洞返回 `None`
    pub fn map(&self, logical: u32) -> Option<u64> {
        let idx = self
            .extents
            .partition_point(|e| e.logical_end() <= logical as u64);
        let ext = self.extents.get(idx)?;
        if ext.logical <= logical {
            Some(ext.physical + (logical - ext.logical) as u64)
        } else {
            None
        }
    }

    /// 映射一个空洞
    ///
    /// 逻辑块已映射时返回 `ErrorKind::AlreadyExists`。
    pub fn insert(&mut self, logical: u32, physical: u64) -> Result<()> {
        let idx = self
            .extents
            .partition_point(|e| e.logical_end() <= logical as u64);

        if let Some(next) = self.extents.get(idx) {
            if next.logical <= logical {
                return Err(Error::new(
                    ErrorKind::AlreadyExists,
                    "Logical block already mapped",
                ));
            }
        }

        // 接在前一个 extent 之后
        if idx > 0 {
            let prev = self.extents[idx - 1];
            if prev.logical_end() == logical as u64 && prev.physical_end() == physical {
                self.extents[idx - 1].len += 1;
                self.merge_with_next(idx - 1);
                return Ok(());
            }
        }

        // 接在后一个 extent 之前
        if let Some(next) = self.extents.get_mut(idx) {
            if logical as u64 + 1 == next.logical as u64 && physical + 1 == next.physical {
                next.logical = logical;
                next.physical = physical;
                next.len += 1;
                return Ok(());
            }
        }

        self.extents.insert(
            idx,
            Extent {
                logical,
                physical,
                len: 1,
            },
        );
        Ok(())
    }

    fn merge_with_next(&mut self, idx: usize) {
        if idx + 1 >= self.extents.len() {
            return;
        }
        let (cur, next) = (self.extents[idx], self.extents[idx + 1]);
        if cur.logical_end() == next.logical as u64 && cur.physical_end() == next.physical {
            self.extents[idx].len += next.len;
            self.extents.remove(idx + 1);
        }
    }

    /// 从逻辑块 0 开始的追加遍历游标
    pub fn append_cursor(&mut self) -> AppendCursor<'_> {
        AppendCursor { map: self, pos: 0 }
    }
}

/// 追加模式的逻辑块游标
///
/// 逐个给出 `(逻辑块号, 当前映射)`，调用者对每一步决定
/// `skip()`（保留现有映射）或 `assign()`（映射新物理块）。
/// 追加模式下游标没有终点，何时停止由调用者决定。
pub struct AppendCursor<'a> {
    map: &'a mut BlockMap,
    pos: u32,
}

impl AppendCursor<'_> {
    /// 当前逻辑块及其映射
    pub fn current(&self) -> (u32, Option<u64>) {
        (self.pos, self.map.map(self.pos))
    }

    /// 保留当前块，前进到下一个逻辑块
    pub fn skip(&mut self) -> Result<()> {
        self.pos = self.pos.checked_add(1).ok_or(Error::new(
            ErrorKind::NoSpace,
            "Logical block range exhausted",
        ))?;
        Ok(())
    }

    /// 将当前逻辑块映射到 `physical` 并前进
    pub fn assign(&mut self, physical: u64) -> Result<()> {
        self.map.insert(self.pos, physical)?;
        self.skip()
    }
}
