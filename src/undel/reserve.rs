//! 缓存区域的块预留
//!
//! 以追加方式遍历保留 inode 的逻辑块，为每个未映射的逻辑块分配物理块：
//! 逻辑块 0 写入 ext3u superblock，其余块批量清零。

use super::planner::CapacityPlan;
use crate::balloc::BlockAllocator;
use crate::block::BlockIo;
use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};
use crate::inode::InodeStore;
use log::*;

/// 连续清零区间的合并器
///
/// 物理上连续的块合并为一次 `zero_blocks()` 调用，单次最多
/// `EXT3U_ZERO_RUN_MAX` 块。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZeroRun {
    start: u64,
    count: u32,
}

impl ZeroRun {
    /// 创建空区间
    pub fn new() -> Self {
        Self::default()
    }

    /// 区间起始块
    pub fn start(&self) -> u64 {
        self.start
    }

    /// 区间中待清零的块数
    pub fn count(&self) -> u32 {
        self.count
    }

    /// 加入一个需要清零的块
    ///
    /// 不连续或已达上限时先刷新当前区间，再从 `block` 开始新区间。
    pub fn push<I: BlockIo + ?Sized>(&mut self, io: &mut I, block: u64) -> Result<()> {
        if self.count > 0 {
            if self.start + self.count as u64 == block && self.count < EXT3U_ZERO_RUN_MAX {
                self.count += 1;
                return Ok(());
            }
            self.flush(io)?;
        }
        self.start = block;
        self.count = 1;
        Ok(())
    }

    /// 清零当前区间
    pub fn flush<I: BlockIo + ?Sized>(&mut self, io: &mut I) -> Result<()> {
        if self.count == 0 {
            return Ok(());
        }
        trace!("[ext3u] zero blocks {}..+{}", self.start, self.count);
        io.zero_blocks(self.start, self.count)?;
        self.count = 0;
        Ok(())
    }
}

/// 预留结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedRegion {
    /// 保留 inode 编号
    pub ino: u32,
    /// 新分配的物理块数
    pub new_blocks: u32,
    /// 写入 ext3u superblock 的物理块；逻辑块 0 已映射时为 `None`
    pub header_block: Option<u64>,
}

/// 块预留器
///
/// 对卷的独占借用持续整个预留过程。
pub struct BlockReserver<'a, V> {
    vol: &'a mut V,
    ino: u32,
}

impl<'a, V> BlockReserver<'a, V>
where
    V: BlockAllocator + BlockIo + InodeStore,
{
    /// 创建预留器
    pub fn new(vol: &'a mut V, ino: u32) -> Self {
        Self { vol, ino }
    }

    /// 为缓存区域分配并初始化物理块
    ///
    /// # 参数
    ///
    /// * `plan` - 容量方案
    /// * `header` - ext3u superblock 的完整块镜像
    /// * `now` - 写入 inode 的 mtime/ctime
    ///
    /// # 错误
    ///
    /// - `AlreadyExists` - inode 已占用数据块，不做任何修改
    /// - 分配或 I/O 错误立即中止；已标记的块不回滚，inode 不写回
    pub fn reserve(
        &mut self,
        plan: &CapacityPlan,
        header: &[u8],
        now: u32,
    ) -> Result<ReservedRegion> {
        let block_size = plan.block_size;
        if header.len() != block_size as usize {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Header image does not match block size",
            ));
        }

        let total = plan.total_reserved_blocks();

        self.vol.load_bitmaps()?;
        let mut inode = self.vol.read_inode(self.ino)?;
        if inode.has_blocks() {
            warn!("[ext3u] inode {} already has {} sectors", self.ino, inode.blocks);
            return Err(Error::new(
                ErrorKind::AlreadyExists,
                "Undelete inode already initialized",
            ));
        }

        let mut goal = 0u64;
        let mut new_blocks = 0u32;
        let mut header_block = None;
        let mut zero_run = ZeroRun::new();

        let mut cursor = inode.block_map.append_cursor();
        while new_blocks < total {
            let (logical, mapped) = cursor.current();
            if let Some(physical) = mapped {
                goal = physical;
                cursor.skip()?;
                continue;
            }

            let block = self.vol.new_block(goal)?;
            if logical == 0 {
                self.vol.write_block(block, header)?;
                header_block = Some(block);
            } else {
                zero_run.push(&mut *self.vol, block)?;
            }

            cursor.assign(block)?;
            goal = block;
            self.vol.mark_used(block)?;
            new_blocks += 1;
        }
        zero_run.flush(&mut *self.vol)?;

        inode.size += block_size as u64 * total as u64;
        inode.add_blocks(new_blocks as u64, block_size);
        inode.touch(now);
        inode.links_count = 1;
        inode.mode = EXT2_INODE_MODE_FILE | EXT2_INODE_MODE_USER_READ | EXT2_INODE_MODE_USER_WRITE;
        self.vol.write_inode(self.ino, &inode)?;

        debug!(
            "[ext3u] inode {}: {} new blocks, header at {:?}",
            self.ino, new_blocks, header_block
        );
        Ok(ReservedRegion {
            ino: self.ino,
            new_blocks,
            header_block,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemVolume;
    use crate::inode::Inode;
    use alloc::vec;

    fn plan(block_size: u32, fifo_blocks: u32) -> CapacityPlan {
        CapacityPlan {
            block_size,
            fifo_blocks,
            max_data_blocks: 0,
            skip_blocks: 0,
            skip_ext_len: 0,
            index_blocks: 0,
        }
    }

    #[test]
    fn test_zero_runs_follow_gaps() {
        let mut vol = MemVolume::new(4096, 1024).unwrap().with_now(42);
        // 0..100 已被占用，另有 300、301、700
        vol.allocator_mut().reserve_range(2, 98).unwrap();
        vol.allocator_mut().reserve_range(300, 2).unwrap();
        vol.allocator_mut().mark_used(700).unwrap();

        let header = vec![0x5Au8; 1024];
        let region = BlockReserver::new(&mut vol, EXT2_UNDEL_DIR_INO)
            .reserve(&plan(1024, 1024), &header, 42)
            .unwrap();

        assert_eq!(region.new_blocks, 1025);
        assert_eq!(region.header_block, Some(100));

        let stats = vol.disk().stats();
        assert_eq!(stats.block_writes, 1);
        // 101..300、302..700、701..1128
        assert_eq!(stats.zero_calls, 3);
        assert_eq!(stats.zeroed_blocks, 1024);
        assert_eq!(vol.disk().block(100), Some(&header[..]));

        let inode = vol.inodes().get(EXT2_UNDEL_DIR_INO).unwrap();
        assert_eq!(inode.block_map.map(0), Some(100));
        assert_eq!(inode.block_map.map(1), Some(101));
        assert_eq!(inode.block_map.map(199), Some(299));
        assert_eq!(inode.block_map.map(200), Some(302));
        assert_eq!(inode.block_map.map(1024), Some(1127));
        assert_eq!(inode.block_map.mapped_blocks(), 1025);
    }

    #[test]
    fn test_zero_run_is_capped() {
        let mut vol = MemVolume::new(8192, 1024).unwrap();
        let header = vec![1u8; 1024];
        let region = BlockReserver::new(&mut vol, EXT2_UNDEL_DIR_INO)
            .reserve(&plan(1024, 2048), &header, 0)
            .unwrap();

        // 块 1 是宿主 superblock
        assert_eq!(region.header_block, Some(2));
        assert!(vol.disk().block(1).is_none());
        let stats = vol.disk().stats();
        assert_eq!(stats.zero_calls, 2);
        assert_eq!(stats.zeroed_blocks, 2048);
        assert_eq!(vol.allocator().free_blocks(), 8190 - 2049);
    }

    #[test]
    fn test_inode_update() {
        let mut vol = MemVolume::new(4096, 4096).unwrap();
        let header = vec![1u8; 4096];
        BlockReserver::new(&mut vol, EXT2_UNDEL_DIR_INO)
            .reserve(&plan(4096, 512), &header, 1_000_000)
            .unwrap();

        let inode = vol.inodes().get(EXT2_UNDEL_DIR_INO).unwrap();
        assert_eq!(inode.size, 513 * 4096);
        assert_eq!(inode.blocks, 513 * 8);
        assert_eq!(inode.mtime, 1_000_000);
        assert_eq!(inode.ctime, 1_000_000);
        assert_eq!(inode.links_count, 1);
        assert_eq!(inode.mode, 0x8000 | 0o600);
        assert!(inode.is_file());
    }

    #[test]
    fn test_already_initialized() {
        let mut vol = MemVolume::new(4096, 1024).unwrap();
        let existing = Inode {
            blocks: 2,
            ..Default::default()
        };
        vol.write_inode(EXT2_UNDEL_DIR_INO, &existing).unwrap();

        let header = vec![1u8; 1024];
        let err = BlockReserver::new(&mut vol, EXT2_UNDEL_DIR_INO)
            .reserve(&plan(1024, 512), &header, 0)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(vol.allocator().free_blocks(), 4094);
        assert_eq!(vol.disk().stats().block_writes, 0);
        assert_eq!(vol.inodes().get(EXT2_UNDEL_DIR_INO), Some(&existing));
    }

    #[test]
    fn test_no_space_keeps_marked_blocks() {
        let mut vol = MemVolume::new(2048, 1024).unwrap();
        let header = vec![1u8; 1024];
        let err = BlockReserver::new(&mut vol, EXT2_UNDEL_DIR_INO)
            .reserve(&plan(1024, 4096), &header, 0)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NoSpace);
        assert_eq!(vol.allocator().free_blocks(), 0);
        // 中止时最后一段没有清零，inode 也没有写回
        assert_eq!(vol.disk().stats().block_writes, 1);
        assert!(vol.inodes().get(EXT2_UNDEL_DIR_INO).is_none());
    }

    #[test]
    fn test_mapped_slots_are_skipped() {
        let mut vol = MemVolume::new(4096, 1024).unwrap();
        let mut inode = Inode::default();
        inode.block_map.insert(0, 500).unwrap();
        vol.allocator_mut().mark_used(500).unwrap();
        vol.write_inode(EXT2_UNDEL_DIR_INO, &inode).unwrap();

        let header = vec![1u8; 1024];
        let region = BlockReserver::new(&mut vol, EXT2_UNDEL_DIR_INO)
            .reserve(&plan(1024, 512), &header, 0)
            .unwrap();

        assert_eq!(region.header_block, None);
        assert_eq!(region.new_blocks, 513);
        let stats = vol.disk().stats();
        assert_eq!(stats.block_writes, 0);
        assert_eq!(stats.zero_calls, 1);
        assert_eq!(stats.zeroed_blocks, 513);

        let inode = vol.inodes().get(EXT2_UNDEL_DIR_INO).unwrap();
        assert_eq!(inode.block_map.map(1), Some(501));
        assert_eq!(inode.block_map.map(513), Some(1013));
    }

    #[test]
    fn test_header_size_checked() {
        let mut vol = MemVolume::new(4096, 1024).unwrap();
        let err = BlockReserver::new(&mut vol, EXT2_UNDEL_DIR_INO)
            .reserve(&plan(1024, 512), &[0u8; 100], 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(vol.allocator().free_blocks(), 4094);
    }

    #[test]
    fn test_zero_run_push_and_flush() {
        let mut vol = MemVolume::new(4096, 1024).unwrap();
        let mut run = ZeroRun::new();
        run.push(&mut vol, 10).unwrap();
        run.push(&mut vol, 11).unwrap();
        assert_eq!((run.start(), run.count()), (10, 2));

        run.push(&mut vol, 20).unwrap();
        assert_eq!((run.start(), run.count()), (20, 1));
        assert_eq!(vol.disk().stats().zero_calls, 1);

        run.flush(&mut vol).unwrap();
        run.flush(&mut vol).unwrap();
        assert_eq!(vol.disk().stats().zero_calls, 2);
        assert_eq!(vol.disk().stats().zeroed_blocks, 3);
    }
}
