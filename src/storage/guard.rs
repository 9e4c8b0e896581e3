// 文件名安全守卫
//
// 上传和删除都以客户端提供的文件名定位文件，必须拦截路径穿越

use super::types::{StorageError, StorageErrorCode};

/// 文件名最大长度（字节）
const MAX_FILENAME_LEN: usize = 255;

/// 文件名安全守卫
#[derive(Debug, Clone, Default)]
pub struct NameGuard;

impl NameGuard {
    pub fn new() -> Self {
        Self
    }

    /// 校验文件名是否可以安全地映射到存储目录内的单个文件
    ///
    /// 拒绝：空名、超长名、路径分隔符、穿越序列（含 URL 编码变体）、
    /// 隐藏文件（以 . 开头）、NUL 字符
    pub fn validate(&self, filename: &str) -> Result<(), StorageError> {
        if filename.is_empty() {
            return Err(StorageError::new(StorageErrorCode::InvalidFilename)
                .with_message("文件名不能为空"));
        }

        if filename.len() > MAX_FILENAME_LEN {
            return Err(StorageError::new(StorageErrorCode::InvalidFilename)
                .with_filename(filename)
                .with_message(format!("文件名超过 {} 字节", MAX_FILENAME_LEN)));
        }

        if self.contains_traversal(filename) {
            return Err(
                StorageError::new(StorageErrorCode::PathTraversalDetected).with_filename(filename)
            );
        }

        if filename.contains('/') || filename.contains('\\') || filename.contains('\0') {
            return Err(StorageError::new(StorageErrorCode::InvalidFilename)
                .with_filename(filename)
                .with_message("文件名不能包含路径分隔符"));
        }

        if filename.starts_with('.') {
            return Err(StorageError::new(StorageErrorCode::InvalidFilename)
                .with_filename(filename)
                .with_message("不允许隐藏文件名"));
        }

        Ok(())
    }

    /// 检查文件名是否包含穿越序列
    fn contains_traversal(&self, filename: &str) -> bool {
        // 检查常见的穿越模式
        let patterns = [
            "..",
            "%2e%2e",     // URL 编码
            "%252e%252e", // 双重 URL 编码
        ];

        let lower = filename.to_lowercase();
        patterns.iter().any(|p| lower.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_names() {
        let guard = NameGuard::new();
        assert!(guard.validate("cat.png").is_ok());
        assert!(guard.validate("my photo (1).jpeg").is_ok());
        assert!(guard.validate("图片.webp").is_ok());
    }

    #[test]
    fn test_traversal_rejected() {
        let guard = NameGuard::new();
        assert!(guard.validate("../etc/passwd").is_err());
        assert!(guard.validate("a..b.png").is_err());
        assert!(guard.validate("%2e%2e%2fetc").is_err());
        assert!(guard.validate("%252E%252e").is_err());
    }

    #[test]
    fn test_separators_rejected() {
        let guard = NameGuard::new();
        assert!(guard.validate("dir/cat.png").is_err());
        assert!(guard.validate("dir\\cat.png").is_err());
    }

    #[test]
    fn test_empty_and_hidden_rejected() {
        let guard = NameGuard::new();
        assert!(guard.validate("").is_err());
        assert!(guard.validate(".htaccess").is_err());
    }

    #[test]
    fn test_overlong_rejected() {
        let guard = NameGuard::new();
        let long = format!("{}.png", "a".repeat(300));
        assert!(guard.validate(&long).is_err());
    }

    proptest! {
        /// 任何通过校验的文件名都不包含分隔符和穿越序列
        #[test]
        fn prop_validated_names_are_safe(name in "\\PC{1,64}") {
            let guard = NameGuard::new();
            if guard.validate(&name).is_ok() {
                prop_assert!(!name.contains('/'));
                prop_assert!(!name.contains('\\'));
                prop_assert!(!name.contains(".."));
                prop_assert!(!name.starts_with('.'));
            }
        }
    }
}
