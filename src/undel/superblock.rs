//! ext3u superblock 构建

use super::planner::CapacityPlan;
use crate::consts::*;
use crate::types::{
    ext3u_del_info, ext3u_fifo_info, ext3u_record, ext3u_skip_info, ext3u_super_block,
};
use bitflags::bitflags;

bitflags! {
    /// ext3u superblock 的 `s_flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UndelFlags: u32 {
        /// 启用索引区
        const INDEX = EXT3U_FEATURE_INDEX;
    }
}

/// 根据容量方案生成新缓存的 superblock
///
/// FIFO 为空环：从逻辑块 1 开始，第一个写入位置紧跟块头。
/// 计数器和水位全部为 0。
pub fn build_superblock(
    plan: &CapacityPlan,
    inode_size: u32,
    flags: UndelFlags,
) -> ext3u_super_block {
    let fifo_free = plan.fifo_free_bytes();

    ext3u_super_block {
        s_flags: flags.bits(),
        s_block_size: plan.block_size,
        s_inode_size: inode_size,
        s_fifo_free: fifo_free,
        s_del: ext3u_del_info {
            d_max_size: plan.max_data_bytes(),
            d_max_filesize: fifo_free as u64,
            ..Default::default()
        },
        s_fifo: ext3u_fifo_info {
            f_blocks: plan.fifo_blocks,
            f_start_block: 1,
            f_last_block: 1,
            f_last_offset: EXT3U_BLOCK_HEADER_SIZE,
            f_last_block_remaining: plan.block_size - EXT3U_BLOCK_HEADER_SIZE,
            f_free: fifo_free,
            f_first: ext3u_record::null(),
            f_last: ext3u_record::null(),
        },
        s_skip: ext3u_skip_info {
            s_size: plan.skip_blocks,
            s_filext_size: plan.skip_ext_len,
            ..Default::default()
        },
        ..Default::default()
    }
}
