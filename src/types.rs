//! ext3u 磁盘数据结构定义
//!
//! 这个模块包含了直接对应 undelete 缓存磁盘格式的数据结构。
//!
//! ## 设计原则
//!
//! 1. **磁盘格式结构** - 保留 C 风格命名（便于对照 ext3u 头文件）
//! 2. **显式布局** - 每个字段的偏移都写死在编解码里，C 编译器插入的对齐填充
//!    在这里是显式的 `*_pad*` 字段，因此解码再编码总是逐字节一致
//! 3. **小端序** - 所有整数使用 `byteorder::LittleEndian`

#![allow(non_camel_case_types)] // 允许C风格命名

use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};
use alloc::vec;
use alloc::vec::Vec;
use byteorder::{ByteOrder, LittleEndian};
use core::fmt;

/// 定长磁盘结构的编解码接口
pub trait OnDisk: Sized {
    /// 结构在磁盘上的字节数
    const SIZE: usize;

    /// 写入恰好 `SIZE` 字节的切片
    fn put(&self, buf: &mut [u8]);

    /// 从恰好 `SIZE` 字节的切片读取
    fn get(buf: &[u8]) -> Self;

    /// 编码到缓冲区开头
    fn encode(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < Self::SIZE {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Buffer too small for on-disk record",
            ));
        }
        self.put(&mut buf[..Self::SIZE]);
        Ok(())
    }

    /// 从缓冲区开头解码
    fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::new(
                ErrorKind::Corrupted,
                "Truncated on-disk record",
            ));
        }
        Ok(Self::get(&buf[..Self::SIZE]))
    }

    /// 编码为新分配的字节数组
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::SIZE];
        self.put(&mut buf);
        buf
    }
}

//=============================================================================
// Record
//=============================================================================

/// 指向 FIFO 中某个条目的非拥有引用
///
/// `r_offset == 0` 表示空指针。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ext3u_record {
    pub r_block: u32,      // 0: 逻辑块号
    pub r_pad0: u32,       // 4: 对齐填充
    pub r_real_block: u64, // 8: 物理块号（映射缓存）
    pub r_offset: u16,     // 16: 块内偏移
    pub r_size: u16,       // 18: 条目大小
    pub r_pad1: u32,       // 20: 对齐填充
}

impl ext3u_record {
    /// 创建记录
    pub const fn new(block: u32, real_block: u64, offset: u16, size: u16) -> Self {
        Self {
            r_block: block,
            r_pad0: 0,
            r_real_block: real_block,
            r_offset: offset,
            r_size: size,
            r_pad1: 0,
        }
    }

    /// 空记录
    pub const fn null() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// 是否为空指针
    pub const fn is_null(&self) -> bool {
        self.r_offset == 0
    }
}

impl OnDisk for ext3u_record {
    const SIZE: usize = 24;

    fn put(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.r_block);
        LittleEndian::write_u32(&mut buf[4..8], self.r_pad0);
        LittleEndian::write_u64(&mut buf[8..16], self.r_real_block);
        LittleEndian::write_u16(&mut buf[16..18], self.r_offset);
        LittleEndian::write_u16(&mut buf[18..20], self.r_size);
        LittleEndian::write_u32(&mut buf[20..24], self.r_pad1);
    }

    fn get(buf: &[u8]) -> Self {
        Self {
            r_block: LittleEndian::read_u32(&buf[0..4]),
            r_pad0: LittleEndian::read_u32(&buf[4..8]),
            r_real_block: LittleEndian::read_u64(&buf[8..16]),
            r_offset: LittleEndian::read_u16(&buf[16..18]),
            r_size: LittleEndian::read_u16(&buf[18..20]),
            r_pad1: LittleEndian::read_u32(&buf[20..24]),
        }
    }
}

//=============================================================================
// FIFO / 删除信息 / skip 信息
//=============================================================================

/// FIFO 环形缓冲区信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ext3u_fifo_info {
    pub f_blocks: u32,               // 0: FIFO 保留块数
    pub f_start_block: u32,          // 4: FIFO 第一个逻辑块
    pub f_last_block: u32,           // 8: 最后使用的逻辑块
    pub f_last_offset: u32,          // 12: 最后块中的写入偏移
    pub f_last_block_remaining: u32, // 16: 最后块剩余空间
    pub f_free: u32,                 // 20: FIFO 空闲字节数
    pub f_first: ext3u_record,       // 24: 最旧条目
    pub f_last: ext3u_record,        // 48: 最新条目
}

impl ext3u_fifo_info {
    /// 环是否为空
    pub const fn is_empty(&self) -> bool {
        self.f_first.is_null()
    }
}

impl OnDisk for ext3u_fifo_info {
    const SIZE: usize = 72;

    fn put(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.f_blocks);
        LittleEndian::write_u32(&mut buf[4..8], self.f_start_block);
        LittleEndian::write_u32(&mut buf[8..12], self.f_last_block);
        LittleEndian::write_u32(&mut buf[12..16], self.f_last_offset);
        LittleEndian::write_u32(&mut buf[16..20], self.f_last_block_remaining);
        LittleEndian::write_u32(&mut buf[20..24], self.f_free);
        self.f_first.put(&mut buf[24..48]);
        self.f_last.put(&mut buf[48..72]);
    }

    fn get(buf: &[u8]) -> Self {
        Self {
            f_blocks: LittleEndian::read_u32(&buf[0..4]),
            f_start_block: LittleEndian::read_u32(&buf[4..8]),
            f_last_block: LittleEndian::read_u32(&buf[8..12]),
            f_last_offset: LittleEndian::read_u32(&buf[12..16]),
            f_last_block_remaining: LittleEndian::read_u32(&buf[16..20]),
            f_free: LittleEndian::read_u32(&buf[20..24]),
            f_first: ext3u_record::get(&buf[24..48]),
            f_last: ext3u_record::get(&buf[48..72]),
        }
    }
}

/// 已删除文件的统计与限制
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ext3u_del_info {
    pub d_max_size: u64,     // 0: 缓存数据上限（字节）
    pub d_max_filesize: u64, // 8: 可保存的单个文件上限
    pub d_current_size: u64, // 16: 当前大小
    pub d_file_count: u32,   // 24: 已保存文件数
    pub d_dir_count: u32,    // 28: 已保存目录数
}

impl OnDisk for ext3u_del_info {
    const SIZE: usize = 32;

    fn put(&self, buf: &mut [u8]) {
        LittleEndian::write_u64(&mut buf[0..8], self.d_max_size);
        LittleEndian::write_u64(&mut buf[8..16], self.d_max_filesize);
        LittleEndian::write_u64(&mut buf[16..24], self.d_current_size);
        LittleEndian::write_u32(&mut buf[24..28], self.d_file_count);
        LittleEndian::write_u32(&mut buf[28..32], self.d_dir_count);
    }

    fn get(buf: &[u8]) -> Self {
        Self {
            d_max_size: LittleEndian::read_u64(&buf[0..8]),
            d_max_filesize: LittleEndian::read_u64(&buf[8..16]),
            d_current_size: LittleEndian::read_u64(&buf[16..24]),
            d_file_count: LittleEndian::read_u32(&buf[24..28]),
            d_dir_count: LittleEndian::read_u32(&buf[28..32]),
        }
    }
}

/// 需要跳过的目录/扩展名信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ext3u_skip_info {
    pub s_dir_count: u32,    // 0: 目录数
    pub s_filext_size: u32,  // 4: 扩展名保留字节数
    pub s_filext_count: u32, // 8: 过滤的扩展名数
    pub s_current_size: u32, // 12: 当前大小
    pub s_size: u32,         // 16: 保留块数
}

impl OnDisk for ext3u_skip_info {
    const SIZE: usize = 20;

    fn put(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.s_dir_count);
        LittleEndian::write_u32(&mut buf[4..8], self.s_filext_size);
        LittleEndian::write_u32(&mut buf[8..12], self.s_filext_count);
        LittleEndian::write_u32(&mut buf[12..16], self.s_current_size);
        LittleEndian::write_u32(&mut buf[16..20], self.s_size);
    }

    fn get(buf: &[u8]) -> Self {
        Self {
            s_dir_count: LittleEndian::read_u32(&buf[0..4]),
            s_filext_size: LittleEndian::read_u32(&buf[4..8]),
            s_filext_count: LittleEndian::read_u32(&buf[8..12]),
            s_current_size: LittleEndian::read_u32(&buf[12..16]),
            s_size: LittleEndian::read_u32(&buf[16..20]),
        }
    }
}

/// skip list 条目头
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ext3u_skip_entry {
    pub s_path_length: u32,   // 0: 目录路径长度
    pub s_file_max_size: u32, // 4: 超过此大小的文件跳过
    pub s_filext_length: u32, // 8: 扩展名长度
}

impl OnDisk for ext3u_skip_entry {
    const SIZE: usize = 12;

    fn put(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.s_path_length);
        LittleEndian::write_u32(&mut buf[4..8], self.s_file_max_size);
        LittleEndian::write_u32(&mut buf[8..12], self.s_filext_length);
    }

    fn get(buf: &[u8]) -> Self {
        Self {
            s_path_length: LittleEndian::read_u32(&buf[0..4]),
            s_file_max_size: LittleEndian::read_u32(&buf[4..8]),
            s_filext_length: LittleEndian::read_u32(&buf[8..12]),
        }
    }
}

//=============================================================================
// ext3u superblock
//=============================================================================

/// ext3u superblock
///
/// 保留 inode 的第 0 个逻辑块，管理整个缓存区域。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ext3u_super_block {
    pub s_flags: u32,          // 0: 标志
    pub s_block_size: u32,     // 4: 块大小
    pub s_inode_size: u32,     // 8: inode 大小
    pub s_fifo_free: u32,      // 12: FIFO 空闲字节（含空洞）
    pub s_block_count: u64,    // 16: 已使用块数
    pub s_low_watermark: u64,  // 24: 低水位
    pub s_high_watermark: u64, // 32: 高水位
    pub s_del: ext3u_del_info, // 40
    pub s_fifo: ext3u_fifo_info, // 72
    pub s_skip: ext3u_skip_info, // 144
    pub s_pad: u32,            // 164: 对齐填充
}

impl ext3u_super_block {
    /// 生成一个完整块大小的镜像，结构之后的字节全为 0
    pub fn to_block_image(&self, block_size: u32) -> Result<Vec<u8>> {
        let mut image = vec![0u8; block_size as usize];
        self.encode(&mut image)?;
        Ok(image)
    }
}

impl OnDisk for ext3u_super_block {
    const SIZE: usize = 168;

    fn put(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.s_flags);
        LittleEndian::write_u32(&mut buf[4..8], self.s_block_size);
        LittleEndian::write_u32(&mut buf[8..12], self.s_inode_size);
        LittleEndian::write_u32(&mut buf[12..16], self.s_fifo_free);
        LittleEndian::write_u64(&mut buf[16..24], self.s_block_count);
        LittleEndian::write_u64(&mut buf[24..32], self.s_low_watermark);
        LittleEndian::write_u64(&mut buf[32..40], self.s_high_watermark);
        self.s_del.put(&mut buf[40..72]);
        self.s_fifo.put(&mut buf[72..144]);
        self.s_skip.put(&mut buf[144..164]);
        LittleEndian::write_u32(&mut buf[164..168], self.s_pad);
    }

    fn get(buf: &[u8]) -> Self {
        Self {
            s_flags: LittleEndian::read_u32(&buf[0..4]),
            s_block_size: LittleEndian::read_u32(&buf[4..8]),
            s_inode_size: LittleEndian::read_u32(&buf[8..12]),
            s_fifo_free: LittleEndian::read_u32(&buf[12..16]),
            s_block_count: LittleEndian::read_u64(&buf[16..24]),
            s_low_watermark: LittleEndian::read_u64(&buf[24..32]),
            s_high_watermark: LittleEndian::read_u64(&buf[32..40]),
            s_del: ext3u_del_info::get(&buf[40..72]),
            s_fifo: ext3u_fifo_info::get(&buf[72..144]),
            s_skip: ext3u_skip_info::get(&buf[144..164]),
            s_pad: LittleEndian::read_u32(&buf[164..168]),
        }
    }
}

impl fmt::Display for ext3u_record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "(null)");
        }
        write!(
            f,
            "block={} real={} offset={} size={}",
            self.r_block, self.r_real_block, self.r_offset, self.r_size
        )
    }
}

impl fmt::Display for ext3u_super_block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ext3u super block")?;
        writeln!(f, "  flags:            {:#x}", self.s_flags)?;
        writeln!(f, "  block size:       {}", self.s_block_size)?;
        writeln!(f, "  inode size:       {}", self.s_inode_size)?;
        writeln!(f, "  fifo free:        {}", self.s_fifo_free)?;
        writeln!(f, "  used blocks:      {}", self.s_block_count)?;
        writeln!(
            f,
            "  watermarks:       {} / {}",
            self.s_low_watermark, self.s_high_watermark
        )?;
        writeln!(f, "  max size:         {}", self.s_del.d_max_size)?;
        writeln!(f, "  max file size:    {}", self.s_del.d_max_filesize)?;
        writeln!(f, "  current size:     {}", self.s_del.d_current_size)?;
        writeln!(
            f,
            "  saved:            {} files, {} dirs",
            self.s_del.d_file_count, self.s_del.d_dir_count
        )?;
        writeln!(
            f,
            "  fifo:             {} blocks from {}",
            self.s_fifo.f_blocks, self.s_fifo.f_start_block
        )?;
        writeln!(
            f,
            "  fifo cursor:      block {} offset {} remaining {}",
            self.s_fifo.f_last_block, self.s_fifo.f_last_offset, self.s_fifo.f_last_block_remaining
        )?;
        writeln!(f, "  fifo free:        {}", self.s_fifo.f_free)?;
        writeln!(f, "  fifo first:       {}", self.s_fifo.f_first)?;
        writeln!(f, "  fifo last:        {}", self.s_fifo.f_last)?;
        write!(
            f,
            "  skip:             {} blocks, {} ext bytes",
            self.s_skip.s_size, self.s_skip.s_filext_size
        )
    }
}

//=============================================================================
// 删除记录
//=============================================================================

/// 删除记录类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DelEntryType {
    /// 普通文件
    File = 1,
    /// 目录
    Directory = 2,
    /// 符号链接
    Link = 3,
}

impl TryFrom<u16> for DelEntryType {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            1 => Ok(Self::File),
            2 => Ok(Self::Directory),
            3 => Ok(Self::Link),
            _ => Err(Error::new(ErrorKind::Corrupted, "Unknown delete entry type")),
        }
    }
}

/// 删除记录头
///
/// 恢复文件后只需要这部分就能重新链接 FIFO 指针。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ext3u_del_entry_header {
    pub d_size: u16,              // 0: 条目字节数
    pub d_pad0: [u8; 6],          // 2: 对齐填充
    pub d_next: ext3u_record,     // 8: 下一个条目
    pub d_previous: ext3u_record, // 32: 上一个条目
    pub d_type: u16,              // 56: 条目类型
    pub d_pad1: u16,              // 58: 对齐填充
    pub d_hash: u32,              // 60: 路径哈希
    pub d_path_length: u16,       // 64: 路径长度
    pub d_mode: u16,              // 66
    pub d_uid: u16,               // 68
    pub d_pad2: u16,              // 70: 对齐填充
}

impl OnDisk for ext3u_del_entry_header {
    const SIZE: usize = 72;

    fn put(&self, buf: &mut [u8]) {
        LittleEndian::write_u16(&mut buf[0..2], self.d_size);
        buf[2..8].copy_from_slice(&self.d_pad0);
        self.d_next.put(&mut buf[8..32]);
        self.d_previous.put(&mut buf[32..56]);
        LittleEndian::write_u16(&mut buf[56..58], self.d_type);
        LittleEndian::write_u16(&mut buf[58..60], self.d_pad1);
        LittleEndian::write_u32(&mut buf[60..64], self.d_hash);
        LittleEndian::write_u16(&mut buf[64..66], self.d_path_length);
        LittleEndian::write_u16(&mut buf[66..68], self.d_mode);
        LittleEndian::write_u16(&mut buf[68..70], self.d_uid);
        LittleEndian::write_u16(&mut buf[70..72], self.d_pad2);
    }

    fn get(buf: &[u8]) -> Self {
        let mut d_pad0 = [0u8; 6];
        d_pad0.copy_from_slice(&buf[2..8]);
        Self {
            d_size: LittleEndian::read_u16(&buf[0..2]),
            d_pad0,
            d_next: ext3u_record::get(&buf[8..32]),
            d_previous: ext3u_record::get(&buf[32..56]),
            d_type: LittleEndian::read_u16(&buf[56..58]),
            d_pad1: LittleEndian::read_u16(&buf[58..60]),
            d_hash: LittleEndian::read_u32(&buf[60..64]),
            d_path_length: LittleEndian::read_u16(&buf[64..66]),
            d_mode: LittleEndian::read_u16(&buf[66..68]),
            d_uid: LittleEndian::read_u16(&buf[68..70]),
            d_pad2: LittleEndian::read_u16(&buf[70..72]),
        }
    }
}

/// 记录头之后的 inode 快照大小
pub const EXT3U_DEL_INODE_SIZE: usize = EXT2_GOOD_OLD_INODE_SIZE;

/// 记录头 + inode 快照
pub const EXT3U_DEL_ENTRY_SIZE: usize = ext3u_del_entry_header::SIZE + EXT3U_DEL_INODE_SIZE;

/// 路径在记录中的偏移（inode 快照之后还有 4 字节 `d_padding`）
pub const EXT3U_DEL_PATH_OFFSET: usize = EXT3U_DEL_ENTRY_SIZE + 4;

/// FIFO 中的变长删除记录
///
/// 磁盘上占 `EXT3U_DEL_PATH_OFFSET + path.len()` 字节。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelEntry {
    /// 记录头
    pub header: ext3u_del_entry_header,
    /// 被删除文件的 inode（原始 ext2 格式）
    pub inode: [u8; EXT3U_DEL_INODE_SIZE],
    /// 填充
    pub padding: u32,
    /// 路径
    pub path: Vec<u8>,
}

impl DelEntry {
    /// 创建删除记录，`d_size` 与 `d_path_length` 按路径计算
    pub fn new(kind: DelEntryType, path: &[u8], inode: [u8; EXT3U_DEL_INODE_SIZE]) -> Result<Self> {
        if path.len() > EXT3U_PATH_MAX {
            return Err(Error::new(ErrorKind::InvalidInput, "Path too long"));
        }
        let header = ext3u_del_entry_header {
            d_size: (EXT3U_DEL_PATH_OFFSET + path.len()) as u16,
            d_type: kind as u16,
            d_path_length: path.len() as u16,
            ..Default::default()
        };
        Ok(Self {
            header,
            inode,
            padding: 0,
            path: path.to_vec(),
        })
    }

    /// 条目类型
    pub fn kind(&self) -> Result<DelEntryType> {
        DelEntryType::try_from(self.header.d_type)
    }

    /// 磁盘上的字节数
    pub fn disk_size(&self) -> usize {
        EXT3U_DEL_PATH_OFFSET + self.path.len()
    }

    /// 编码为磁盘格式
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.disk_size()];
        self.header.put(&mut buf[..ext3u_del_entry_header::SIZE]);
        buf[ext3u_del_entry_header::SIZE..EXT3U_DEL_ENTRY_SIZE].copy_from_slice(&self.inode);
        LittleEndian::write_u32(
            &mut buf[EXT3U_DEL_ENTRY_SIZE..EXT3U_DEL_PATH_OFFSET],
            self.padding,
        );
        buf[EXT3U_DEL_PATH_OFFSET..].copy_from_slice(&self.path);
        buf
    }

    /// 从磁盘格式解码
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let header = ext3u_del_entry_header::decode(buf)?;
        let path_len = header.d_path_length as usize;
        if path_len > EXT3U_PATH_MAX {
            return Err(Error::new(ErrorKind::Corrupted, "Delete entry path too long"));
        }
        if buf.len() < EXT3U_DEL_PATH_OFFSET + path_len {
            return Err(Error::new(ErrorKind::Corrupted, "Truncated delete entry"));
        }

        let mut inode = [0u8; EXT3U_DEL_INODE_SIZE];
        inode.copy_from_slice(&buf[ext3u_del_entry_header::SIZE..EXT3U_DEL_ENTRY_SIZE]);

        Ok(Self {
            header,
            inode,
            padding: LittleEndian::read_u32(&buf[EXT3U_DEL_ENTRY_SIZE..EXT3U_DEL_PATH_OFFSET]),
            path: buf[EXT3U_DEL_PATH_OFFSET..EXT3U_DEL_PATH_OFFSET + path_len].to_vec(),
        })
    }
}

impl fmt::Display for DelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind() {
            Ok(DelEntryType::File) => "file",
            Ok(DelEntryType::Directory) => "dir",
            Ok(DelEntryType::Link) => "link",
            Err(_) => "?",
        };
        writeln!(f, "ext3u entry ({} bytes, {})", self.header.d_size, kind)?;
        writeln!(f, "  path:     {}", core::str::from_utf8(&self.path).unwrap_or("<non-utf8>"))?;
        writeln!(f, "  hash:     {:#010x}", self.header.d_hash)?;
        writeln!(f, "  mode:     {:o}", self.header.d_mode)?;
        writeln!(f, "  uid:      {}", self.header.d_uid)?;
        writeln!(f, "  next:     {}", self.header.d_next)?;
        write!(f, "  previous: {}", self.header.d_previous)
    }
}
