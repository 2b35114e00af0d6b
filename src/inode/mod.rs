//! Inode 模块
//!
//! 这个模块提供缓存初始化用到的 inode 内存表示：
//! - `Inode` - 与磁盘格式无关的 inode 字段
//! - `BlockMap` / `AppendCursor` - 逻辑块到物理块的映射与追加遍历
//! - `InodeStore` - inode 读写接口，`MemInodeTable` 为内存实现

mod block_map;
mod table;

pub use block_map::{AppendCursor, BlockMap, Extent};
pub use table::MemInodeTable;

use crate::consts::*;
use crate::error::Result;

/// Inode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inode {
    /// 文件模式（类型 + 权限）
    pub mode: u16,
    /// 用户 ID
    pub uid: u32,
    /// 组 ID
    pub gid: u32,
    /// 文件大小（字节）
    pub size: u64,
    /// 访问时间
    pub atime: u32,
    /// inode 改变时间
    pub ctime: u32,
    /// 修改时间
    pub mtime: u32,
    /// 删除时间
    pub dtime: u32,
    /// 硬链接数
    pub links_count: u16,
    /// 占用的 512 字节扇区数（i_blocks）
    pub blocks: u64,
    /// 标志
    pub flags: u32,
    /// 块映射
    pub block_map: BlockMap,
}

impl Inode {
    /// 是否已经占用数据块
    pub fn has_blocks(&self) -> bool {
        self.blocks > 0
    }

    /// 增加 blocks 计数
    ///
    /// # 参数
    ///
    /// * `count` - 要增加的块数（文件系统块大小）
    /// * `block_size` - 文件系统块大小
    pub fn add_blocks(&mut self, count: u64, block_size: u32) {
        self.blocks += count * (block_size / EXT2_SECTOR_SIZE) as u64;
    }

    /// 同时设置修改时间和改变时间
    pub fn touch(&mut self, now: u32) {
        self.mtime = now;
        self.ctime = now;
    }

    /// 是否为普通文件
    pub fn is_file(&self) -> bool {
        self.mode & 0xF000 == EXT2_INODE_MODE_FILE
    }
}

/// Inode 读写接口
///
/// 对应 e2fsprogs 的 `ext2fs_read_inode()` / `ext2fs_write_inode()`。
pub trait InodeStore {
    /// 读取 inode
    fn read_inode(&mut self, ino: u32) -> Result<Inode>;

    /// 写回 inode
    fn write_inode(&mut self, ino: u32, inode: &Inode) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_blocks_counts_sectors() {
        let mut inode = Inode::default();
        assert!(!inode.has_blocks());

        inode.add_blocks(3, 4096);
        assert_eq!(inode.blocks, 24);

        inode.add_blocks(1, 1024);
        assert_eq!(inode.blocks, 26);
        assert!(inode.has_blocks());
    }

    #[test]
    fn test_mode_and_times() {
        let mut inode = Inode {
            mode: EXT2_INODE_MODE_FILE | EXT2_INODE_MODE_USER_READ,
            ..Default::default()
        };
        assert!(inode.is_file());

        inode.touch(1234);
        assert_eq!(inode.mtime, 1234);
        assert_eq!(inode.ctime, 1234);
        assert_eq!(inode.atime, 0);
    }
}
