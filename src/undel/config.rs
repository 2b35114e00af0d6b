//! ext3u 选项解析
//!
//! 选项字符串以逗号分隔，每项可带 `=` 参数：
//!
//! ```text
//! max-data=N<unit>    缓存数据上限，unit 只能是 M（MB）
//! cache-blocks=N      FIFO 块数
//! ```
//!
//! 数字语法与 C 的 `strtoul(.., 0)` 一致：`0x` 前缀为十六进制，`0` 前缀为八进制。

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

/// 选项格式错误时打印的帮助信息
pub const EXT3U_USAGE: &str = "The ext3u options are separated by commas, and may take\n\
an argument which is set off by an equals ('=') sign.\n\
Valid options are:\n\
\tmax-data=N (maximum reachable size in Mb for the data blocks)\n\
\tcache-blocks=N (size in blocks of the deleted files cache )\n";

/// undelete 缓存配置
///
/// 由选项解析器或 [`UndelConfigBuilder`] 一次性生成，之后不可修改。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UndelConfig {
    cache_blocks: u32,
    max_data_mb: u64,
}

impl UndelConfig {
    /// 创建构建器
    pub fn builder() -> UndelConfigBuilder {
        UndelConfigBuilder::default()
    }

    /// 用户指定的 FIFO 块数，`None` 表示使用默认值
    pub fn cache_blocks(&self) -> Option<u32> {
        (self.cache_blocks != 0).then_some(self.cache_blocks)
    }

    /// 用户指定的最大数据量（MB），`None` 表示使用默认值
    pub fn max_data_mb(&self) -> Option<u64> {
        (self.max_data_mb != 0).then_some(self.max_data_mb)
    }
}

impl FromStr for UndelConfig {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_options(s)
    }
}

/// 配置构建器，0 表示未设置
#[derive(Debug, Clone, Copy, Default)]
pub struct UndelConfigBuilder {
    cache_blocks: u32,
    max_data_mb: u64,
}

impl UndelConfigBuilder {
    /// 设置 FIFO 块数
    pub fn cache_blocks(mut self, blocks: u32) -> Self {
        self.cache_blocks = blocks;
        self
    }

    /// 设置最大数据量（MB）
    pub fn max_data_mb(mut self, mb: u64) -> Self {
        self.max_data_mb = mb;
        self
    }

    /// 生成不可变配置
    pub fn build(self) -> UndelConfig {
        UndelConfig {
            cache_blocks: self.cache_blocks,
            max_data_mb: self.max_data_mb,
        }
    }
}

/// 单个选项的问题
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionProblem {
    /// 未知选项
    UnknownKey(String),
    /// 缺少 `=value`
    MissingValue(String),
    /// `max-data` 的单位不是 M
    UnknownUnit(String),
    /// 数字非法（含多余字符或溢出）
    BadNumber {
        /// 选项名
        key: String,
        /// 原始值
        value: String,
    },
}

impl fmt::Display for OptionProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKey(key) => write!(f, "unknown option '{}'", key),
            Self::MissingValue(key) => write!(f, "option '{}' requires a value", key),
            Self::UnknownUnit(value) => write!(
                f,
                "unknown unit type for 'max-data' ('{}'); use M (megabytes)",
                value
            ),
            Self::BadNumber { key, value } => {
                write!(f, "invalid number '{}' for '{}'", value, key)
            }
        }
    }
}

/// 选项字符串格式错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError {
    problems: Vec<OptionProblem>,
}

impl UsageError {
    /// 所有问题
    pub fn problems(&self) -> &[OptionProblem] {
        &self.problems
    }

    /// 问题个数
    pub fn count(&self) -> usize {
        self.problems.len()
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "bad ext3u options specified.")?;
        for problem in &self.problems {
            writeln!(f, "  {}", problem)?;
        }
        writeln!(f)?;
        write!(f, "{}", EXT3U_USAGE)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UsageError {}

/// 解析 ext3u 选项字符串
///
/// 所有问题都会被收集，只要有一个就返回 `UsageError`。
/// 空项（如 `a,,b` 或末尾逗号）被忽略，重复的选项以后出现的为准。
pub fn parse_options(opts: &str) -> Result<UndelConfig, UsageError> {
    let mut builder = UndelConfig::builder();
    let mut problems = Vec::new();

    for token in opts.split(',').filter(|t| !t.is_empty()) {
        let (key, arg) = match token.split_once('=') {
            Some((key, arg)) => (key, Some(arg)),
            None => (token, None),
        };

        match key {
            "max-data" => {
                let Some(arg) = arg else {
                    problems.push(OptionProblem::MissingValue(key.to_string()));
                    continue;
                };
                let Some(number) = arg.strip_suffix('M') else {
                    problems.push(OptionProblem::UnknownUnit(arg.to_string()));
                    continue;
                };
                match parse_c_ulong(number) {
                    Some(mb) => builder = builder.max_data_mb(mb),
                    None => problems.push(OptionProblem::BadNumber {
                        key: key.to_string(),
                        value: arg.to_string(),
                    }),
                }
            }
            "cache-blocks" => {
                let Some(arg) = arg else {
                    problems.push(OptionProblem::MissingValue(key.to_string()));
                    continue;
                };
                match parse_c_ulong(arg).and_then(|n| u32::try_from(n).ok()) {
                    Some(blocks) => builder = builder.cache_blocks(blocks),
                    None => problems.push(OptionProblem::BadNumber {
                        key: key.to_string(),
                        value: arg.to_string(),
                    }),
                }
            }
            _ => problems.push(OptionProblem::UnknownKey(key.to_string())),
        }
    }

    if problems.is_empty() {
        Ok(builder.build())
    } else {
        Err(UsageError { problems })
    }
}

/// 解析选项，出错时打印帮助并以状态 1 退出进程
///
/// 选项在离线建卷工具启动时读取，出错后没有可以继续的默认行为。
#[cfg(feature = "std")]
pub fn parse_options_or_exit(opts: &str) -> UndelConfig {
    match parse_options(opts) {
        Ok(config) => config,
        Err(err) => {
            std::eprintln!("mkfs.ext3: {}", err);
            std::process::exit(1);
        }
    }
}

/// 按 `strtoul(s, &end, 0)` 的规则解析整个字符串
///
/// 空数字解析为 0；多余字符、负号或溢出返回 `None`。
fn parse_c_ulong(s: &str) -> Option<u64> {
    let s = s.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);

    let (digits, radix) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() {
            return None;
        }
        (hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };

    if digits.is_empty() {
        return Some(0);
    }
    if !digits.bytes().all(|b| (b as char).is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_options() {
        let config = parse_options("").unwrap();
        assert_eq!(config.cache_blocks(), None);
        assert_eq!(config.max_data_mb(), None);
    }

    #[test]
    fn test_valid_options() {
        let config = parse_options("max-data=64M,cache-blocks=2048").unwrap();
        assert_eq!(config.max_data_mb(), Some(64));
        assert_eq!(config.cache_blocks(), Some(2048));

        let config: UndelConfig = "cache-blocks=0x400,".parse().unwrap();
        assert_eq!(config.cache_blocks(), Some(1024));

        let config = parse_options("cache-blocks=01000").unwrap();
        assert_eq!(config.cache_blocks(), Some(512));

        // 以后出现的为准
        let config = parse_options("cache-blocks=600,cache-blocks=700").unwrap();
        assert_eq!(config.cache_blocks(), Some(700));
    }

    #[test]
    fn test_zero_means_unset() {
        let config = parse_options("cache-blocks=0,max-data=M").unwrap();
        assert_eq!(config.cache_blocks(), None);
        assert_eq!(config.max_data_mb(), None);
    }

    #[test]
    fn test_bad_unit() {
        let err = parse_options("max-data=64K").unwrap_err();
        assert_eq!(err.count(), 1);
        assert_eq!(err.problems()[0], OptionProblem::UnknownUnit("64K".to_string()));

        let err = parse_options("max-data=").unwrap_err();
        assert_eq!(err.count(), 1);
    }

    #[test]
    fn test_problems_are_counted() {
        let opts = "foo,cache-blocks,cache-blocks=12x,max-data=1.5M,bar=1";
        let err = parse_options(opts).unwrap_err();
        assert_eq!(err.count(), 5);
        assert_eq!(err.problems()[0], OptionProblem::UnknownKey("foo".to_string()));
        assert_eq!(
            err.problems()[1],
            OptionProblem::MissingValue("cache-blocks".to_string())
        );
        assert!(matches!(err.problems()[2], OptionProblem::BadNumber { .. }));
        assert!(matches!(err.problems()[3], OptionProblem::BadNumber { .. }));

        let text = alloc::format!("{}", err);
        assert!(text.contains("cache-blocks=N"));
        assert!(text.contains("unknown option 'bar'"));
    }

    #[test]
    fn test_cache_blocks_overflow() {
        assert!(parse_options("cache-blocks=4294967296").is_err());
        assert!(parse_options("cache-blocks=-1").is_err());
    }

    #[test]
    fn test_parse_c_ulong() {
        assert_eq!(parse_c_ulong("42"), Some(42));
        assert_eq!(parse_c_ulong("  +42"), Some(42));
        assert_eq!(parse_c_ulong("0x1F"), Some(31));
        assert_eq!(parse_c_ulong("017"), Some(15));
        assert_eq!(parse_c_ulong("0"), Some(0));
        assert_eq!(parse_c_ulong(""), Some(0));
        assert_eq!(parse_c_ulong("08"), None);
        assert_eq!(parse_c_ulong("0x"), None);
        assert_eq!(parse_c_ulong("12 "), None);
    }

    #[test]
    fn test_builder() {
        let config = UndelConfig::builder().cache_blocks(4096).max_data_mb(10).build();
        assert_eq!(config.cache_blocks(), Some(4096));
        assert_eq!(config.max_data_mb(), Some(10));
    }
}
