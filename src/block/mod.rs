//! 块 I/O 抽象
//!
//! 提供缓存初始化所需的块级写入、批量清零和读取接口。
//!
//! - `BlockIo` 是宿主文件系统 I/O 通道的最小接口
//! - `MemDisk` 是基于内存的实现，带读写统计，供离线镜像构建和测试使用

mod mem;

pub use mem::{IoStats, MemDisk};

use crate::error::Result;

/// 块 I/O 通道接口
///
/// 对应 e2fsprogs 的 `io_channel_write_blk()` 与 `ext2fs_zero_blocks()`。
///
/// # 示例
///
/// ```rust,ignore
/// use ext3u_core::{BlockIo, Result};
///
/// struct MyChannel {
///     // ...
/// }
///
/// impl BlockIo for MyChannel {
///     fn read_block(&mut self, block: u64, buf: &mut [u8]) -> Result<()> {
///         // 读取一个完整的块
///         Ok(())
///     }
///
///     fn write_block(&mut self, block: u64, buf: &[u8]) -> Result<()> {
///         // 写入一个完整的块
///         Ok(())
///     }
///
///     fn zero_blocks(&mut self, start: u64, count: u32) -> Result<()> {
///         // 把 [start, start + count) 清零
///         Ok(())
///     }
/// }
/// ```
pub trait BlockIo {
    /// 读取一个块
    ///
    /// # 参数
    ///
    /// * `block` - 物理块号
    /// * `buf` - 目标缓冲区（大小至少为块大小）
    fn read_block(&mut self, block: u64, buf: &mut [u8]) -> Result<()>;

    /// 写入一个块
    ///
    /// # 参数
    ///
    /// * `block` - 物理块号
    /// * `buf` - 源缓冲区（大小至少为块大小）
    fn write_block(&mut self, block: u64, buf: &[u8]) -> Result<()>;

    /// 把一段连续物理块清零
    ///
    /// # 参数
    ///
    /// * `start` - 第一个物理块号
    /// * `count` - 块数
    fn zero_blocks(&mut self, start: u64, count: u32) -> Result<()>;
}
