//! 缓存容量规划
//!
//! 根据卷大小和用户选项确定 FIFO 块数与缓存数据上限，并做范围校验。

use super::config::UndelConfig;
use crate::consts::*;
use core::fmt;
use log::*;

/// 容量校验失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityError {
    /// 块大小不是 1024 到 65536 之间的 2 的幂
    BlockSize {
        /// 块大小（字节）
        block_size: u32,
    },
    /// 卷太小，无法给出默认缓存大小
    NoDefaultCache {
        /// 卷总块数
        volume_blocks: u64,
    },
    /// `cache-blocks` 越界
    CacheBlocks {
        /// 请求的块数
        requested: u32,
        /// 下限
        min: u32,
        /// 上限
        max: u32,
    },
    /// `max-data` 越界
    MaxData {
        /// 请求的块数（已换算）
        requested: u64,
        /// 下限
        min: u64,
        /// 上限
        max: u64,
    },
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::BlockSize { block_size } => write!(
                f,
                "block size {} is not supported; it must be a power of two between {} and {}",
                block_size, EXT2_MIN_BLOCK_SIZE, EXT2_MAX_BLOCK_SIZE
            ),
            Self::NoDefaultCache { volume_blocks } => write!(
                f,
                "volume has {} blocks; at least 2048 are needed for a default 'cache-blocks' size",
                volume_blocks
            ),
            Self::CacheBlocks { requested, min, max } => write!(
                f,
                "'cache-blocks' size requested is {} blocks; it must be between {} and {} blocks",
                requested, min, max
            ),
            Self::MaxData { requested, min, max } => write!(
                f,
                "'max-data' size requested is {} blocks; it must be between {} and {} blocks",
                requested, min, max
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CapacityError {}

/// 校验后的容量方案
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityPlan {
    /// 文件系统块大小
    pub block_size: u32,
    /// FIFO 块数
    pub fifo_blocks: u32,
    /// 缓存数据上限（块）
    pub max_data_blocks: u64,
    /// skip list 块数
    pub skip_blocks: u32,
    /// 扩展名过滤字节数
    pub skip_ext_len: u32,
    /// 索引区块数
    pub index_blocks: u32,
}

impl CapacityPlan {
    /// 需要保留的总块数（含 1 个 ext3u superblock 块）
    pub fn total_reserved_blocks(&self) -> u32 {
        self.fifo_blocks + self.skip_blocks + self.index_blocks + 1
    }

    /// 缓存数据上限（字节）
    pub fn max_data_bytes(&self) -> u64 {
        self.max_data_blocks * self.block_size as u64
    }

    /// FIFO 可用字节数（每块扣除块头）
    pub fn fifo_free_bytes(&self) -> u32 {
        self.fifo_blocks * (self.block_size - EXT3U_BLOCK_HEADER_SIZE)
    }
}

/// 根据卷的总块数给出默认 FIFO 块数
///
/// 与日志大小的取法基本一致；卷小于 2048 块时没有空间，返回 `None`。
pub fn default_fifo_size(blocks: u64) -> Option<u32> {
    match blocks {
        b if b < 2048 => None,
        b if b < 32768 => Some(1024),
        b if b < 256 * 1024 => Some(4096),
        b if b < 512 * 1024 => Some(8192),
        b if b < 1024 * 1024 => Some(8192),
        _ => Some(8192),
    }
}

/// `max-data`（MB）换算为块数的乘数
///
/// 4096 字节块使用 128 而不是 256，与已有工具保持一致。
/// 其他块大小不换算。
pub fn max_data_multiplier(block_size: u32) -> u64 {
    match block_size {
        1024 => 1024,
        2048 => 512,
        4096 => 128,
        _ => 1,
    }
}

/// 容量规划器
pub struct CapacityPlanner {
    volume_blocks: u64,
    block_size: u32,
}

impl CapacityPlanner {
    /// 创建规划器
    ///
    /// # 参数
    ///
    /// * `volume_blocks` - 卷总块数
    /// * `block_size` - 块大小（字节）
    pub fn new(volume_blocks: u64, block_size: u32) -> Self {
        Self {
            volume_blocks,
            block_size,
        }
    }

    /// 根据配置生成容量方案
    ///
    /// 任何校验失败都不会重试，调用者应放弃创建缓存。
    pub fn plan(&self, config: &UndelConfig) -> Result<CapacityPlan, CapacityError> {
        self.check_block_size().inspect_err(|err| {
            error!("[ext3u] {}", err);
        })?;
        let fifo_blocks = self.fifo_blocks(config).inspect_err(|err| {
            error!("[ext3u] {}", err);
        })?;
        let max_data_blocks = self.max_data_blocks(config).inspect_err(|err| {
            error!("[ext3u] {}", err);
        })?;

        let plan = CapacityPlan {
            block_size: self.block_size,
            fifo_blocks,
            max_data_blocks,
            skip_blocks: EXT3U_SKIP_RESERVED,
            skip_ext_len: EXT3U_SKIP_EXTLEN,
            index_blocks: EXT3U_INDEX_RESERVED,
        };
        debug!(
            "[ext3u] plan: fifo={} max_data={} total={}",
            plan.fifo_blocks,
            plan.max_data_blocks,
            plan.total_reserved_blocks()
        );
        Ok(plan)
    }

    fn check_block_size(&self) -> Result<(), CapacityError> {
        let block_size = self.block_size;
        if !block_size.is_power_of_two()
            || !(EXT2_MIN_BLOCK_SIZE..=EXT2_MAX_BLOCK_SIZE).contains(&block_size)
        {
            return Err(CapacityError::BlockSize { block_size });
        }
        Ok(())
    }

    fn fifo_blocks(&self, config: &UndelConfig) -> Result<u32, CapacityError> {
        let requested = match config.cache_blocks() {
            Some(blocks) => blocks,
            None => default_fifo_size(self.volume_blocks).ok_or(CapacityError::NoDefaultCache {
                volume_blocks: self.volume_blocks,
            })?,
        };

        if ext3u_wrong_fifo_size(requested) {
            return Err(CapacityError::CacheBlocks {
                requested,
                min: EXT3U_FIFO_SIZE_MIN,
                max: EXT3U_FIFO_SIZE_MAX,
            });
        }
        Ok(requested)
    }

    fn max_data_blocks(&self, config: &UndelConfig) -> Result<u64, CapacityError> {
        let requested = match config.max_data_mb() {
            Some(mb) => mb.saturating_mul(max_data_multiplier(self.block_size)),
            None => ext3u_default_fs_size(self.volume_blocks),
        };

        let min = ext3u_del_size_min(self.volume_blocks);
        let max = ext3u_del_size_max(self.volume_blocks);
        if requested < min || requested > max {
            return Err(CapacityError::MaxData { requested, min, max });
        }
        Ok(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fifo_size_steps() {
        assert_eq!(default_fifo_size(0), None);
        assert_eq!(default_fifo_size(2047), None);
        assert_eq!(default_fifo_size(2048), Some(1024));
        assert_eq!(default_fifo_size(32767), Some(1024));
        assert_eq!(default_fifo_size(32768), Some(4096));
        assert_eq!(default_fifo_size(262143), Some(4096));
        assert_eq!(default_fifo_size(262144), Some(8192));
        assert_eq!(default_fifo_size(1024 * 1024), Some(8192));
        assert_eq!(default_fifo_size(u64::MAX), Some(8192));
    }

    #[test]
    fn test_default_fifo_size_always_in_range() {
        let mut blocks = 1u64;
        while blocks < (1 << 40) {
            for b in [blocks - 1, blocks, blocks + 1] {
                if let Some(size) = default_fifo_size(b) {
                    assert!(!ext3u_wrong_fifo_size(size), "blocks={} size={}", b, size);
                }
            }
            blocks *= 2;
        }
    }

    #[test]
    fn test_cache_blocks_out_of_range() {
        let planner = CapacityPlanner::new(100_000, 4096);
        for requested in [1, 511, 32769, u32::MAX] {
            let config = UndelConfig::builder().cache_blocks(requested).build();
            assert_eq!(
                planner.plan(&config).unwrap_err(),
                CapacityError::CacheBlocks {
                    requested,
                    min: 512,
                    max: 32768
                }
            );
        }
        for requested in [512, 32768] {
            let config = UndelConfig::builder().cache_blocks(requested).build();
            assert_eq!(planner.plan(&config).unwrap().fifo_blocks, requested);
        }
    }

    #[test]
    fn test_small_volume_has_no_default() {
        let planner = CapacityPlanner::new(1000, 1024);
        assert_eq!(
            planner.plan(&UndelConfig::default()).unwrap_err(),
            CapacityError::NoDefaultCache { volume_blocks: 1000 }
        );
    }

    #[test]
    fn test_max_data_conversion() {
        assert_eq!(max_data_multiplier(1024), 1024);
        assert_eq!(max_data_multiplier(2048), 512);
        assert_eq!(max_data_multiplier(4096), 128);

        // 8 MB → 各块大小下的块数，卷大小取 expected * 5 使其落在合法范围内
        let config = UndelConfig::builder().max_data_mb(8).build();
        for (block_size, expected) in [(1024u32, 8192u64), (2048, 4096), (4096, 1024)] {
            let planner = CapacityPlanner::new(expected * 5, block_size);
            let plan = planner.plan(&config).unwrap();
            assert_eq!(plan.max_data_blocks, expected);
        }

        // 校验失败时换算结果仍然体现在错误里
        let err = CapacityPlanner::new(40_000, 4096).plan(&config).unwrap_err();
        assert_eq!(
            err,
            CapacityError::MaxData {
                requested: 1024,
                min: 4000,
                max: 10_000
            }
        );
    }

    #[test]
    fn test_unsupported_block_size() {
        for block_size in [0, 2, 512, 1000, 3072, 131_072] {
            let err = CapacityPlanner::new(100_000, block_size)
                .plan(&UndelConfig::default())
                .unwrap_err();
            assert_eq!(err, CapacityError::BlockSize { block_size });
        }
        for block_size in [1024, 65536] {
            let planner = CapacityPlanner::new(100_000, block_size);
            assert!(planner.plan(&UndelConfig::default()).is_ok());
        }
    }

    #[test]
    fn test_max_data_bounds() {
        let planner = CapacityPlanner::new(100_000, 1024);

        // 9 MB = 9216 块 < 10000
        let config = UndelConfig::builder().max_data_mb(9).build();
        assert_eq!(
            planner.plan(&config).unwrap_err(),
            CapacityError::MaxData {
                requested: 9216,
                min: 10_000,
                max: 25_000
            }
        );

        // 25 MB = 25600 块 > 25000
        let config = UndelConfig::builder().max_data_mb(25).build();
        assert!(matches!(
            planner.plan(&config).unwrap_err(),
            CapacityError::MaxData { requested: 25600, .. }
        ));

        let config = UndelConfig::builder().max_data_mb(u64::MAX).build();
        assert!(planner.plan(&config).is_err());

        let config = UndelConfig::builder().max_data_mb(20).build();
        let plan = planner.plan(&config).unwrap();
        assert!(plan.max_data_blocks >= 10_000 && plan.max_data_blocks <= 25_000);
    }

    #[test]
    fn test_default_plan() {
        let plan = CapacityPlanner::new(100_000, 4096)
            .plan(&UndelConfig::default())
            .unwrap();

        assert_eq!(plan.fifo_blocks, 4096);
        assert_eq!(plan.max_data_blocks, 10_000);
        assert_eq!(plan.skip_blocks, 0);
        assert_eq!(plan.skip_ext_len, 0);
        assert_eq!(plan.index_blocks, 0);
        assert_eq!(plan.total_reserved_blocks(), 4097);
        assert_eq!(plan.max_data_bytes(), 10_000 * 4096);
        assert_eq!(plan.fifo_free_bytes(), 16_760_832);
    }
}
