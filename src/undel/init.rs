//! undelete 支持的初始化与探测

use super::config::UndelConfig;
use super::planner::{CapacityPlan, CapacityPlanner};
use super::reserve::{BlockReserver, ReservedRegion};
use super::superblock::{build_superblock, UndelFlags};
use crate::balloc::BlockAllocator;
use crate::block::BlockIo;
use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};
use crate::fs::VolumeSuper;
use crate::inode::InodeStore;
use crate::types::{ext3u_super_block, OnDisk};
use alloc::vec;
use log::*;

/// 初始化结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitSummary {
    /// 生效的容量方案
    pub plan: CapacityPlan,
    /// 预留的区域
    pub region: ReservedRegion,
}

/// 为卷添加 undelete 支持
///
/// 依次完成容量规划、构建 ext3u superblock、在保留 inode 上预留区域，
/// 成功后设置 `EXT3U_FEATURE_COMPAT_UNDELETE`。
///
/// 无论成功与否 superblock 都会被标记为脏。失败时特性标志保持不变，
/// 返回的错误可以被调用者忽略，卷本身仍然可用。
pub fn init_undelete<V>(vol: &mut V, config: &UndelConfig) -> Result<InitSummary>
where
    V: VolumeSuper + BlockAllocator + BlockIo + InodeStore,
{
    let result = add_cache(vol, config);

    match &result {
        Ok(summary) => {
            vol.set_feature_compat(vol.feature_compat() | EXT3U_FEATURE_COMPAT_UNDELETE);
            info!("[ext3u] cache size={} blocks", summary.plan.fifo_blocks);
            info!(
                "[ext3u] saving files up to {} bytes",
                summary.plan.max_data_bytes()
            );
        }
        Err(err) => {
            warn!("[ext3u] cannot add the undelete support: {}", err);
        }
    }

    vol.mark_super_dirty();
    result
}

fn add_cache<V>(vol: &mut V, config: &UndelConfig) -> Result<InitSummary>
where
    V: VolumeSuper + BlockAllocator + BlockIo + InodeStore,
{
    let block_size = vol.block_size();
    let plan = CapacityPlanner::new(vol.blocks_count(), block_size).plan(config)?;

    let sb = build_superblock(&plan, vol.inode_size(), UndelFlags::empty());
    let header = sb.to_block_image(block_size)?;

    let now = vol.now();
    let region = BlockReserver::new(vol, EXT2_UNDEL_DIR_INO).reserve(&plan, &header, now)?;

    Ok(InitSummary { plan, region })
}

/// 读取已有缓存的 ext3u superblock
///
/// 卷没有 undelete 特性时返回 `None`。
pub fn probe_cache<V>(vol: &mut V) -> Result<Option<ext3u_super_block>>
where
    V: VolumeSuper + BlockIo + InodeStore,
{
    if vol.feature_compat() & EXT3U_FEATURE_COMPAT_UNDELETE == 0 {
        return Ok(None);
    }

    let inode = vol.read_inode(EXT2_UNDEL_DIR_INO)?;
    let block = inode.block_map.map(0).ok_or(Error::new(
        ErrorKind::NotFound,
        "Undelete cache has no header block",
    ))?;

    let block_size = vol.block_size();
    let mut buf = vec![0u8; block_size as usize];
    vol.read_block(block, &mut buf)?;

    let sb = ext3u_super_block::decode(&buf)?;
    if sb.s_block_size != block_size {
        error!(
            "[ext3u] header block size {} does not match volume ({})",
            sb.s_block_size, block_size
        );
        return Err(Error::new(
            ErrorKind::Corrupted,
            "Undelete cache header block size mismatch",
        ));
    }
    Ok(Some(sb))
}
