//! ext3u_core: ext3 undelete 缓存的建卷支持
//!
//! 这是一个纯 Rust 实现的 ext3u 建卷库，在新建的 ext2/ext3 卷上为保留
//! inode 6 预留删除文件缓存区域，旨在提供：
//! - **`no_std` 可用**，只依赖 `alloc`
//! - **Rust 惯用风格**的 API
//! - **显式的磁盘布局**，所有结构逐字节编解码
//!
//! # 示例
//!
//! ```rust,ignore
//! use ext3u_core::{init_undelete, parse_options, MemVolume, Result};
//!
//! fn main() -> Result<()> {
//!     let config = parse_options("cache-blocks=2048,max-data=64M")?;
//!     let mut vol = MemVolume::new(262_144, 1024)?;
//!
//!     // 失败时卷仍然可用，只是没有 undelete 支持
//!     let summary = init_undelete(&mut vol, &config)?;
//!     assert_eq!(summary.plan.fifo_blocks, 2048);
//!
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`consts`] - 常量定义
//! - [`types`] - ext3u 磁盘数据结构
//! - [`block`] - 块 I/O 抽象
//! - [`balloc`] - 块分配
//! - [`inode`] - inode 与块映射
//! - [`fs`] - 宿主卷接口
//! - [`undel`] - 选项解析、容量规划与缓存初始化

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 常量定义
pub mod consts;

/// 数据结构定义
pub mod types;

/// 块 I/O 抽象
pub mod block;

/// 块分配
pub mod balloc;

/// Inode 操作
pub mod inode;

/// 宿主卷接口
pub mod fs;

/// undelete 缓存
pub mod undel;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 磁盘结构
pub use types::{
    ext3u_del_entry_header, ext3u_del_info, ext3u_fifo_info, ext3u_record, ext3u_skip_entry,
    ext3u_skip_info, ext3u_super_block, DelEntry, DelEntryType, OnDisk,
};

// 块 I/O
pub use block::{BlockIo, IoStats, MemDisk};

// 块分配
pub use balloc::{BitmapAllocator, BlockAllocator};

// Inode
pub use inode::{AppendCursor, BlockMap, Extent, Inode, InodeStore, MemInodeTable};

// 卷
pub use fs::{MemVolume, VolumeSuper};

// undelete
#[cfg(feature = "std")]
pub use undel::parse_options_or_exit;
pub use undel::{
    build_superblock, init_undelete, parse_options, probe_cache, BlockReserver, CapacityError,
    CapacityPlan, CapacityPlanner, InitSummary, OptionProblem, ReservedRegion, UndelConfig,
    UndelConfigBuilder, UndelFlags, UsageError, ZeroRun,
};
