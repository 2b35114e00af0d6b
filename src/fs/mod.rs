//! 宿主卷接口
//!
//! 这个模块描述 undelete 初始化需要的宿主文件系统 superblock 操作，
//! 并提供一个组合了内存块设备、位图分配器和 inode 表的内存卷 `MemVolume`。

mod volume;

pub use volume::MemVolume;

/// 宿主文件系统 superblock 访问接口
///
/// 对应 e2fsprogs 中 `ext2_filsys` 的 `super` 字段与 `ext2fs_mark_super_dirty()`。
pub trait VolumeSuper {
    /// 卷总块数
    fn blocks_count(&self) -> u64;

    /// 块大小（字节）
    fn block_size(&self) -> u32;

    /// inode 大小（字节）
    fn inode_size(&self) -> u32;

    /// 当前时间（UNIX 秒）
    ///
    /// 用于新建 inode 的 mtime/ctime。
    fn now(&self) -> u32;

    /// 兼容特性标志
    fn feature_compat(&self) -> u32;

    /// 设置兼容特性标志
    fn set_feature_compat(&mut self, features: u32);

    /// 标记 superblock 需要写回
    fn mark_super_dirty(&mut self);
}
