//! 块位图的位操作
//!
//! 位索引使用 u64，与块地址一致。

use crate::error::{Error, ErrorKind, Result};

/// 测试位图中某一位是否被设置，越界视为未设置
pub fn test_bit(bitmap: &[u8], index: u64) -> bool {
    let byte_index = (index / 8) as usize;
    match bitmap.get(byte_index) {
        Some(byte) => byte & (1 << (index % 8)) != 0,
        None => false,
    }
}

/// 设置位图中的某一位
pub fn set_bit(bitmap: &mut [u8], index: u64) -> Result<()> {
    let byte_index = (index / 8) as usize;
    let byte = bitmap.get_mut(byte_index).ok_or(Error::new(
        ErrorKind::InvalidInput,
        "Bitmap index out of range",
    ))?;
    *byte |= 1 << (index % 8);
    Ok(())
}

/// 在 `[start, end)` 中查找第一个为 0 的位
///
/// 遇到整字节全满（0xFF）时整体跳过。
pub fn find_first_zero(bitmap: &[u8], start: u64, end: u64) -> Option<u64> {
    let end = end.min(bitmap.len() as u64 * 8);
    let mut i = start;

    while i < end {
        if i % 8 == 0 && bitmap[(i / 8) as usize] == 0xFF {
            i += 8;
            continue;
        }
        if !test_bit(bitmap, i) {
            return Some(i);
        }
        i += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_test() {
        let mut bitmap = [0u8; 4];

        set_bit(&mut bitmap, 0).unwrap();
        set_bit(&mut bitmap, 9).unwrap();
        assert!(test_bit(&bitmap, 0));
        assert!(test_bit(&bitmap, 9));
        assert!(!test_bit(&bitmap, 8));

        assert!(set_bit(&mut bitmap, 32).is_err());
        assert!(!test_bit(&bitmap, 100));
    }

    #[test]
    fn test_find_first_zero_skips_full_bytes() {
        let mut bitmap = [0xFFu8, 0xFF, 0b0000_0111, 0];
        assert_eq!(find_first_zero(&bitmap, 0, 32), Some(19));
        assert_eq!(find_first_zero(&bitmap, 20, 32), Some(20));

        bitmap = [0xFF; 4];
        assert_eq!(find_first_zero(&bitmap, 0, 32), None);
        // end 会被限制到位图长度
        assert_eq!(find_first_zero(&[0u8; 1], 3, 100), Some(3));
        assert_eq!(find_first_zero(&[0u8; 1], 8, 100), None);
    }
}
