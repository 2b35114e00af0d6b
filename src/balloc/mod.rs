//! 物理块分配模块
//!
//! 对应 e2fsprogs 的 `ext2fs_new_block()` / `ext2fs_block_alloc_stats()`。
//!
//! 分配分两步：`new_block()` 只在位图中找一个空闲块，不修改位图；
//! 调用者完成该块的初始化后再调用 `mark_used()` 记账。

mod bitmap;
mod bitmap_alloc;

pub use bitmap_alloc::BitmapAllocator;

use crate::error::Result;

/// 块分配器接口
pub trait BlockAllocator {
    /// 确保位图已载入
    ///
    /// 默认实现什么都不做，适用于位图常驻内存的分配器。
    fn load_bitmaps(&mut self) -> Result<()> {
        Ok(())
    }

    /// 以 `goal` 为目标查找一个空闲块
    ///
    /// 没有空闲块时返回 `ErrorKind::NoSpace`。
    fn new_block(&mut self, goal: u64) -> Result<u64>;

    /// 将块标记为已使用并更新空闲块计数
    fn mark_used(&mut self, block: u64) -> Result<()>;
}
