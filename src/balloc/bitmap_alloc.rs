//! 内存位图块分配器
//!
//! 查找顺序与 lwext4 的 `ext4_balloc_alloc_block()` 相同：
//! 1. 目标块本身
//! 2. 目标附近（到下一个 64 位边界）
//! 3. 目标之后的整个卷，然后回绕到第一个数据块

use super::bitmap::{find_first_zero, set_bit, test_bit};
use super::BlockAllocator;
use crate::error::{Error, ErrorKind, Result};
use alloc::vec;
use alloc::vec::Vec;
use log::*;

/// 位图块分配器
pub struct BitmapAllocator {
    bitmap: Vec<u8>,
    blocks_count: u64,
    first_data_block: u64,
    free_blocks: u64,
}

impl BitmapAllocator {
    /// 创建分配器，`first_data_block` 之前的块视为已使用
    pub fn new(blocks_count: u64, first_data_block: u64) -> Self {
        let mut bitmap = vec![0u8; blocks_count.div_ceil(8) as usize];
        let first_data_block = first_data_block.min(blocks_count);
        for blk in 0..first_data_block {
            // 索引必然在范围内
            let _ = set_bit(&mut bitmap, blk);
        }

        Self {
            bitmap,
            blocks_count,
            first_data_block,
            free_blocks: blocks_count - first_data_block,
        }
    }

    /// 总块数
    pub fn blocks_count(&self) -> u64 {
        self.blocks_count
    }

    /// 第一个数据块
    pub fn first_data_block(&self) -> u64 {
        self.first_data_block
    }

    /// 空闲块数
    pub fn free_blocks(&self) -> u64 {
        self.free_blocks
    }

    /// 块是否已使用
    pub fn is_used(&self, block: u64) -> bool {
        test_bit(&self.bitmap, block)
    }

    /// 把一段块标记为已使用（例如文件系统元数据）
    pub fn reserve_range(&mut self, start: u64, count: u64) -> Result<()> {
        for blk in start..start.saturating_add(count) {
            self.mark_used(blk)?;
        }
        Ok(())
    }

    fn find_free(&self, goal: u64) -> Option<u64> {
        let goal = if goal < self.first_data_block || goal >= self.blocks_count {
            self.first_data_block
        } else {
            goal
        };

        // 1. 目标块
        if !test_bit(&self.bitmap, goal) {
            return Some(goal);
        }

        // 2. 目标附近（+63 范围内）
        let near_end = ((goal + 64) & !63).min(self.blocks_count);
        if let Some(blk) = find_first_zero(&self.bitmap, goal + 1, near_end) {
            return Some(blk);
        }

        // 3. 整个卷
        find_first_zero(&self.bitmap, near_end, self.blocks_count)
            .or_else(|| find_first_zero(&self.bitmap, self.first_data_block, goal))
    }
}

impl BlockAllocator for BitmapAllocator {
    fn new_block(&mut self, goal: u64) -> Result<u64> {
        match self.find_free(goal) {
            Some(blk) => {
                trace!("[balloc] goal={} -> block {}", goal, blk);
                Ok(blk)
            }
            None => {
                debug!("[balloc] no free block (goal={})", goal);
                Err(Error::new(ErrorKind::NoSpace, "No free blocks available"))
            }
        }
    }

    fn mark_used(&mut self, block: u64) -> Result<()> {
        if block >= self.blocks_count {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Block number exceeds volume size",
            ));
        }
        if test_bit(&self.bitmap, block) {
            warn!("[balloc] block {} already marked in use", block);
            return Ok(());
        }
        set_bit(&mut self.bitmap, block)?;
        self.free_blocks -= 1;
        Ok(())
    }
}
