//! 内存块设备

use super::BlockIo;
use crate::error::{Error, ErrorKind, Result};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// I/O 统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoStats {
    /// 单块读取次数
    pub block_reads: u64,
    /// 单块写入次数
    pub block_writes: u64,
    /// 批量清零调用次数
    pub zero_calls: u64,
    /// 被清零的块总数
    pub zeroed_blocks: u64,
}

/// 内存块设备
///
/// 只保存写入过非零数据的块，未保存的块读出来全为 0。
pub struct MemDisk {
    block_size: u32,
    blocks_count: u64,
    blocks: BTreeMap<u64, Vec<u8>>,
    stats: IoStats,
}

impl MemDisk {
    /// 创建内存块设备
    pub fn new(blocks_count: u64, block_size: u32) -> Self {
        Self {
            block_size,
            blocks_count,
            blocks: BTreeMap::new(),
            stats: IoStats::default(),
        }
    }

    /// 块大小
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// 总块数
    pub fn blocks_count(&self) -> u64 {
        self.blocks_count
    }

    /// I/O 统计
    pub fn stats(&self) -> IoStats {
        self.stats
    }

    /// 查看某块的内容，`None` 表示全零
    pub fn block(&self, block: u64) -> Option<&[u8]> {
        self.blocks.get(&block).map(|data| data.as_slice())
    }

    fn check_range(&self, start: u64, count: u64) -> Result<()> {
        match start.checked_add(count) {
            Some(end) if end <= self.blocks_count => Ok(()),
            _ => Err(Error::new(ErrorKind::Io, "Block address beyond end of device")),
        }
    }

    fn check_buffer(&self, len: usize) -> Result<()> {
        if len < self.block_size as usize {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "buffer too small for block",
            ));
        }
        Ok(())
    }
}

impl BlockIo for MemDisk {
    fn read_block(&mut self, block: u64, buf: &mut [u8]) -> Result<()> {
        self.check_range(block, 1)?;
        self.check_buffer(buf.len())?;
        self.stats.block_reads += 1;

        let len = self.block_size as usize;
        match self.blocks.get(&block) {
            Some(data) => buf[..len].copy_from_slice(data),
            None => buf[..len].fill(0),
        }
        Ok(())
    }

    fn write_block(&mut self, block: u64, buf: &[u8]) -> Result<()> {
        self.check_range(block, 1)?;
        self.check_buffer(buf.len())?;
        self.stats.block_writes += 1;

        let data = &buf[..self.block_size as usize];
        if data.iter().all(|&b| b == 0) {
            self.blocks.remove(&block);
        } else {
            self.blocks.insert(block, data.to_vec());
        }
        Ok(())
    }

    fn zero_blocks(&mut self, start: u64, count: u32) -> Result<()> {
        self.check_range(start, count as u64)?;
        self.stats.zero_calls += 1;
        self.stats.zeroed_blocks += count as u64;

        let end = start + count as u64;
        let doomed: Vec<u64> = self.blocks.range(start..end).map(|(&blk, _)| blk).collect();
        for blk in doomed {
            self.blocks.remove(&blk);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_write_read_zero() {
        let mut disk = MemDisk::new(16, 1024);
        let mut data = vec![0u8; 1024];
        data[0] = 0xAB;

        disk.write_block(3, &data).unwrap();
        assert_eq!(disk.block(3).unwrap()[0], 0xAB);

        let mut out = vec![0xFFu8; 1024];
        disk.read_block(3, &mut out).unwrap();
        assert_eq!(out, data);

        disk.zero_blocks(2, 4).unwrap();
        assert!(disk.block(3).is_none());
        disk.read_block(3, &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));

        let stats = disk.stats();
        assert_eq!(stats.block_writes, 1);
        assert_eq!(stats.block_reads, 2);
        assert_eq!(stats.zero_calls, 1);
        assert_eq!(stats.zeroed_blocks, 4);
    }

    #[test]
    fn test_out_of_range() {
        let mut disk = MemDisk::new(16, 1024);
        let data = vec![1u8; 1024];
        assert_eq!(disk.write_block(16, &data).unwrap_err().kind(), ErrorKind::Io);
        assert!(disk.zero_blocks(10, 7).is_err());
        assert!(disk.write_block(0, &data[..512]).is_err());
    }
}
