//! ext3u 常量定义
//!
//! 这个模块包含了：
//! - 删除文件缓存（undelete cache）的布局与容量常量
//! - 宿主 ext2/ext3 文件系统中被用到的少量常量（保留 inode、模式位、块大小范围）

//=============================================================================
// 宿主文件系统
//=============================================================================

/// 最小块大小（1024 字节）
pub const EXT2_MIN_BLOCK_SIZE: u32 = 1024;

/// 最大块大小（65536 字节）
pub const EXT2_MAX_BLOCK_SIZE: u32 = 65536;

/// 旧的 inode 大小（不含扩展字段）
pub const EXT2_GOOD_OLD_INODE_SIZE: usize = 128;

/// 保留给 undelete 目录的 inode 编号
pub const EXT2_UNDEL_DIR_INO: u32 = 6;

/// 第一个非保留 inode
pub const EXT2_GOOD_OLD_FIRST_INO: u32 = 11;

/// i_blocks 的计数单位（512 字节扇区）
pub const EXT2_SECTOR_SIZE: u32 = 512;

/// 普通文件
pub const EXT2_INODE_MODE_FILE: u16 = 0x8000;

/// 用户读权限
pub const EXT2_INODE_MODE_USER_READ: u16 = 0x0100;

/// 用户写权限
pub const EXT2_INODE_MODE_USER_WRITE: u16 = 0x0080;

//=============================================================================
// ext3u 特性标志
//=============================================================================

/// ext3u superblock 标志：启用索引
pub const EXT3U_FEATURE_INDEX: u32 = 0x0001;

/// 卷 superblock 兼容特性：支持 undelete
pub const EXT3U_FEATURE_COMPAT_UNDELETE: u32 = 0x4000;

//=============================================================================
// ext3u 布局
//=============================================================================

/// 每个 FIFO 块开头保留的块头大小（字节）
pub const EXT3U_BLOCK_HEADER_SIZE: u32 = 4;

/// skip list 保留块数
pub const EXT3U_SKIP_RESERVED: u32 = 0;

/// 扩展名过滤保留字节数
pub const EXT3U_SKIP_EXTLEN: u32 = 0;

/// 索引区保留块数
pub const EXT3U_INDEX_RESERVED: u32 = 0;

/// FIFO 最小块数
pub const EXT3U_FIFO_SIZE_MIN: u32 = 512;

/// FIFO 最大块数
pub const EXT3U_FIFO_SIZE_MAX: u32 = 32768;

/// 单次批量清零的最大块数
pub const EXT3U_ZERO_RUN_MAX: u32 = 1024;

/// 删除记录中路径的最大长度
pub const EXT3U_PATH_MAX: usize = 4096;

/// 最大缓存数据量下限（块）
pub const fn ext3u_del_size_min(blocks: u64) -> u64 {
    blocks / 10
}

/// 最大缓存数据量上限（块）
pub const fn ext3u_del_size_max(blocks: u64) -> u64 {
    blocks / 4
}

/// 未指定 max-data 时的默认值（块）
pub const fn ext3u_default_fs_size(blocks: u64) -> u64 {
    blocks / 10
}

/// FIFO 块数是否越界
pub const fn ext3u_wrong_fifo_size(blocks: u32) -> bool {
    blocks < EXT3U_FIFO_SIZE_MIN || blocks > EXT3U_FIFO_SIZE_MAX
}
