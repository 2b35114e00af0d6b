//! 内存 inode 表

use super::{Inode, InodeStore};
use crate::error::{Error, ErrorKind, Result};
use alloc::collections::BTreeMap;

/// 内存 inode 表
///
/// 未写过的 inode 读出来是全零的 `Inode`，与新建文件系统的 inode 表一致。
pub struct MemInodeTable {
    inodes_count: u32,
    inodes: BTreeMap<u32, Inode>,
}

impl MemInodeTable {
    /// 创建 inode 表
    pub fn new(inodes_count: u32) -> Self {
        Self {
            inodes_count,
            inodes: BTreeMap::new(),
        }
    }

    /// inode 总数
    pub fn inodes_count(&self) -> u32 {
        self.inodes_count
    }

    /// 查看已写入的 inode
    pub fn get(&self, ino: u32) -> Option<&Inode> {
        self.inodes.get(&ino)
    }

    fn check(&self, ino: u32) -> Result<()> {
        if ino == 0 || ino > self.inodes_count {
            return Err(Error::new(ErrorKind::InvalidInput, "Invalid inode number"));
        }
        Ok(())
    }
}

impl InodeStore for MemInodeTable {
    fn read_inode(&mut self, ino: u32) -> Result<Inode> {
        self.check(ino)?;
        Ok(self.inodes.get(&ino).cloned().unwrap_or_default())
    }

    fn write_inode(&mut self, ino: u32, inode: &Inode) -> Result<()> {
        self.check(ino)?;
        self.inodes.insert(ino, inode.clone());
        Ok(())
    }
}
