//! undelete 缓存的建立
//!
//! 在建卷时为保留 inode 6 预留一段物理块，作为删除文件的缓存：
//!
//! ```text
//! 逻辑块 0           ext3u superblock
//! 逻辑块 1..=fifo    FIFO 环形缓冲区
//! 之后               skip list、索引区（当前大小为 0）
//! ```
//!
//! 流程分为三步：
//! - `config` - 解析 `-u` 风格的选项字符串
//! - `planner` - 按卷大小确定容量并校验
//! - `reserve` - 分配、写入并清零物理块，更新 inode
//!
//! `init_undelete()` 把它们串起来，`probe_cache()` 读取已有缓存的 superblock。

mod config;
mod init;
mod planner;
mod reserve;
mod superblock;

#[cfg(feature = "std")]
pub use config::parse_options_or_exit;
pub use config::{
    parse_options, OptionProblem, UndelConfig, UndelConfigBuilder, UsageError, EXT3U_USAGE,
};
pub use init::{init_undelete, probe_cache, InitSummary};
pub use planner::{
    default_fifo_size, max_data_multiplier, CapacityError, CapacityPlan, CapacityPlanner,
};
pub use reserve::{BlockReserver, ReservedRegion, ZeroRun};
pub use superblock::{build_superblock, UndelFlags};
