//! 内存卷

use super::VolumeSuper;
use crate::balloc::{BitmapAllocator, BlockAllocator};
use crate::block::{BlockIo, MemDisk};
use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};
use crate::inode::{Inode, InodeStore, MemInodeTable};
use log::*;

/// 内存卷
///
/// 把块设备、块分配器、inode 表和 superblock 状态放在一起，
/// 实现初始化流程需要的全部接口。适合离线构建镜像和测试。
///
/// # 示例
///
/// ```rust,ignore
/// use ext3u_core::{init_undelete, MemVolume, UndelConfig};
///
/// let mut vol = MemVolume::new(100_000, 4096)?;
/// let summary = init_undelete(&mut vol, &UndelConfig::default())?;
/// assert_eq!(summary.plan.fifo_blocks, 4096);
/// ```
pub struct MemVolume {
    disk: MemDisk,
    allocator: BitmapAllocator,
    inodes: MemInodeTable,
    inode_size: u32,
    now: u32,
    feature_compat: u32,
    super_dirty: bool,
}

impl MemVolume {
    /// 创建一个空卷
    ///
    /// 1024 字节块的卷第一个数据块为 1，其余为 0。第一个数据块存放
    /// 宿主 superblock，创建时即被占用。
    ///
    /// # 参数
    ///
    /// * `blocks_count` - 总块数
    /// * `block_size` - 块大小，必须是 1024 到 65536 之间的 2 的幂
    pub fn new(blocks_count: u64, block_size: u32) -> Result<Self> {
        if !block_size.is_power_of_two()
            || !(EXT2_MIN_BLOCK_SIZE..=EXT2_MAX_BLOCK_SIZE).contains(&block_size)
        {
            return Err(Error::new(ErrorKind::InvalidInput, "Invalid block size"));
        }

        let first_data_block = if block_size == EXT2_MIN_BLOCK_SIZE { 1 } else { 0 };
        if blocks_count <= first_data_block {
            return Err(Error::new(ErrorKind::InvalidInput, "Volume too small"));
        }

        let inodes_count = (blocks_count / 8)
            .clamp(EXT2_GOOD_OLD_FIRST_INO as u64, u32::MAX as u64) as u32;
        debug!(
            "[volume] blocks={} block_size={} inodes={}",
            blocks_count, block_size, inodes_count
        );

        let mut allocator = BitmapAllocator::new(blocks_count, first_data_block);
        allocator.mark_used(first_data_block)?;

        Ok(Self {
            disk: MemDisk::new(blocks_count, block_size),
            allocator,
            inodes: MemInodeTable::new(inodes_count),
            inode_size: EXT2_GOOD_OLD_INODE_SIZE as u32,
            now: 0,
            feature_compat: 0,
            super_dirty: false,
        })
    }

    /// 固定时间戳，0 表示使用系统时间（需要 `std` 特性，否则为 0）
    pub fn with_now(mut self, now: u32) -> Self {
        self.now = now;
        self
    }

    /// 设置 inode 大小
    pub fn with_inode_size(mut self, inode_size: u32) -> Self {
        self.inode_size = inode_size;
        self
    }

    /// 块分配器
    pub fn allocator(&self) -> &BitmapAllocator {
        &self.allocator
    }

    /// 块分配器（可变），用于预先占用元数据块
    pub fn allocator_mut(&mut self) -> &mut BitmapAllocator {
        &mut self.allocator
    }

    /// 块设备
    pub fn disk(&self) -> &MemDisk {
        &self.disk
    }

    /// inode 表
    pub fn inodes(&self) -> &MemInodeTable {
        &self.inodes
    }

    /// superblock 是否被标记为脏
    pub fn is_super_dirty(&self) -> bool {
        self.super_dirty
    }
}

impl VolumeSuper for MemVolume {
    fn blocks_count(&self) -> u64 {
        self.disk.blocks_count()
    }

    fn block_size(&self) -> u32 {
        self.disk.block_size()
    }

    fn inode_size(&self) -> u32 {
        self.inode_size
    }

    fn now(&self) -> u32 {
        if self.now != 0 {
            self.now
        } else {
            system_now()
        }
    }

    fn feature_compat(&self) -> u32 {
        self.feature_compat
    }

    fn set_feature_compat(&mut self, features: u32) {
        self.feature_compat = features;
    }

    fn mark_super_dirty(&mut self) {
        self.super_dirty = true;
    }
}

#[cfg(feature = "std")]
fn system_now() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

#[cfg(not(feature = "std"))]
fn system_now() -> u32 {
    0
}

impl BlockAllocator for MemVolume {
    fn load_bitmaps(&mut self) -> Result<()> {
        self.allocator.load_bitmaps()
    }

    fn new_block(&mut self, goal: u64) -> Result<u64> {
        self.allocator.new_block(goal)
    }

    fn mark_used(&mut self, block: u64) -> Result<()> {
        self.allocator.mark_used(block)
    }
}

impl BlockIo for MemVolume {
    fn read_block(&mut self, block: u64, buf: &mut [u8]) -> Result<()> {
        self.disk.read_block(block, buf)
    }

    fn write_block(&mut self, block: u64, buf: &[u8]) -> Result<()> {
        self.disk.write_block(block, buf)
    }

    fn zero_blocks(&mut self, start: u64, count: u32) -> Result<()> {
        self.disk.zero_blocks(start, count)
    }
}

impl InodeStore for MemVolume {
    fn read_inode(&mut self, ino: u32) -> Result<Inode> {
        self.inodes.read_inode(ino)
    }

    fn write_inode(&mut self, ino: u32, inode: &Inode) -> Result<()> {
        self.inodes.write_inode(ino, inode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_creation() {
        let vol = MemVolume::new(8192, 1024).unwrap();
        assert_eq!(vol.blocks_count(), 8192);
        assert_eq!(vol.block_size(), 1024);
        assert_eq!(vol.inode_size(), 128);
        assert_eq!(vol.allocator().first_data_block(), 1);
        assert!(vol.allocator().is_used(1));
        assert_eq!(vol.allocator().free_blocks(), 8190);
        assert_eq!(vol.inodes().inodes_count(), 1024);
        assert!(!vol.is_super_dirty());

        let vol = MemVolume::new(64, 4096).unwrap();
        assert_eq!(vol.allocator().first_data_block(), 0);
        assert!(vol.allocator().is_used(0));
        assert_eq!(vol.allocator().free_blocks(), 63);
        assert_eq!(vol.inodes().inodes_count(), EXT2_GOOD_OLD_FIRST_INO);
    }

    #[test]
    fn test_invalid_geometry() {
        for block_size in [0, 512, 1000, 3072, 131072] {
            let err = MemVolume::new(1024, block_size).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
        assert!(MemVolume::new(0, 4096).is_err());
        assert!(MemVolume::new(1, 1024).is_err());
    }

    #[test]
    fn test_super_state() {
        let mut vol = MemVolume::new(128, 4096)
            .unwrap()
            .with_now(1_700_000_000)
            .with_inode_size(256);
        assert_eq!(vol.now(), 1_700_000_000);
        assert_eq!(vol.inode_size(), 256);

        vol.set_feature_compat(vol.feature_compat() | EXT3U_FEATURE_COMPAT_UNDELETE);
        assert_eq!(vol.feature_compat(), 0x4000);

        vol.mark_super_dirty();
        assert!(vol.is_super_dirty());
    }

    #[test]
    fn test_delegation() {
        let mut vol = MemVolume::new(128, 4096).unwrap();
        let blk = vol.new_block(10).unwrap();
        assert_eq!(blk, 10);
        vol.mark_used(blk).unwrap();
        assert!(vol.allocator().is_used(10));

        let data = [0xA5u8; 4096];
        vol.write_block(blk, &data).unwrap();
        let mut buf = [0u8; 4096];
        vol.read_block(blk, &mut buf).unwrap();
        assert_eq!(buf, data);

        vol.zero_blocks(blk, 1).unwrap();
        assert!(vol.disk().block(blk).is_none());
        assert_eq!(vol.disk().stats().zero_calls, 1);

        let inode = Inode {
            links_count: 1,
            ..Default::default()
        };
        vol.write_inode(EXT2_UNDEL_DIR_INO, &inode).unwrap();
        assert_eq!(vol.read_inode(EXT2_UNDEL_DIR_INO).unwrap(), inode);
    }
}
