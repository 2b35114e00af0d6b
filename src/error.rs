//! 错误类型定义
//!
//! 提供 ext3u 操作的错误类型。
//!
//! 与 `Error` 并列还有两个携带细节的领域错误：
//! [`CapacityError`](crate::undel::CapacityError)（容量校验失败，带请求值和合法范围）
//! 与 [`UsageError`](crate::undel::UsageError)（选项字符串格式错误）。
//! 它们都可以通过 `From` 转换为 `Error`。

use core::fmt;

/// ext3u 操作错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// I/O 错误
    Io,
    /// 无效参数
    InvalidInput,
    /// 磁盘数据损坏
    Corrupted,
    /// 不存在
    NotFound,
    /// 已存在（例如缓存 inode 已初始化）
    AlreadyExists,
    /// 空间不足
    NoSpace,
    /// 缓存容量配置非法
    InvalidCapacity,
    /// 选项字符串格式错误
    Usage,
}

impl Error {
    /// 创建新错误
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    /// 获取错误类型
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误消息
    pub const fn message(&self) -> &'static str {
        self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<crate::undel::CapacityError> for Error {
    fn from(err: crate::undel::CapacityError) -> Self {
        use crate::undel::CapacityError;
        match err {
            CapacityError::BlockSize { .. } => {
                Error::new(ErrorKind::InvalidCapacity, "Unsupported block size")
            }
            CapacityError::NoDefaultCache { .. } => {
                Error::new(ErrorKind::InvalidCapacity, "Volume too small for an undelete cache")
            }
            CapacityError::CacheBlocks { .. } => {
                Error::new(ErrorKind::InvalidCapacity, "'cache-blocks' out of range")
            }
            CapacityError::MaxData { .. } => {
                Error::new(ErrorKind::InvalidCapacity, "'max-data' out of range")
            }
        }
    }
}

impl From<crate::undel::UsageError> for Error {
    fn from(_err: crate::undel::UsageError) -> Self {
        Error::new(ErrorKind::Usage, "Bad ext3u options specified")
    }
}

/// Result 类型别名
pub type Result<T> = core::result::Result<T, Error>;
