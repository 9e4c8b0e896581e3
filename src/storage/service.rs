// 图片存储服务
//
// 提供图片的保存、列表、读取和删除

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::guard::NameGuard;
use super::sniff::sniff_image;
use super::types::*;

/// 图片存储服务
///
/// 所有操作都被限制在构造时规范化的根目录内
pub struct ImageStore {
    root: PathBuf,
    guard: NameGuard,
    on_collision: OnCollision,
}

impl ImageStore {
    /// 创建图片存储服务
    ///
    /// 根目录不存在时自动创建，随后规范化为绝对路径
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.storage_dir).map_err(StorageError::io)?;
        let root = dunce::canonicalize(&config.storage_dir).map_err(StorageError::io)?;

        Ok(Self {
            root,
            guard: NameGuard::new(),
            on_collision: config.on_collision,
        })
    }

    /// 存储根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 保存一张图片
    ///
    /// 内容必须通过魔数嗅探；客户端扩展名与真实格式不符时，
    /// 存储名改用嗅探出的规范扩展名。重名按策略覆盖或改名。
    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<StoredImage, StorageError> {
        self.guard.validate(filename)?;

        if bytes.is_empty() {
            return Err(StorageError::new(StorageErrorCode::EmptyPayload).with_filename(filename));
        }

        let sniffed = sniff_image(bytes)?;

        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string();
        let ext = match Path::new(filename).extension().and_then(|e| e.to_str()) {
            Some(ext) if sniffed.matches_ext(ext) => ext.to_lowercase(),
            _ => sniffed.canonical_ext().to_string(),
        };

        let mut target_name = format!("{}.{}", stem, ext);

        if self.root.join(&target_name).exists() {
            match self.on_collision {
                OnCollision::Overwrite => {
                    tracing::info!("覆盖已存在的文件: {}", target_name);
                }
                OnCollision::Rename => {
                    let suffix = Uuid::new_v4().simple().to_string();
                    target_name = format!("{}-{}.{}", stem, &suffix[..8], ext);
                    tracing::info!("文件重名，改名保存: {} -> {}", filename, target_name);
                }
            }
        }

        let target = self.root.join(&target_name);
        fs::write(&target, bytes).map_err(StorageError::io)?;

        self.stat(&target_name)
    }

    /// 列出所有已存储的图片
    pub fn list(&self, query: &ListQuery) -> Result<Vec<StoredImage>, StorageError> {
        let read_dir = fs::read_dir(&self.root).map_err(|e| {
            tracing::error!("读取存储目录失败: {:?}, 错误: {}", self.root, e);
            StorageError::io(e)
        })?;

        let mut images: Vec<StoredImage> = read_dir
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let path = entry.path();
                // 只列出普通文件，跳过隐藏文件
                path.is_file()
                    && !entry.file_name().to_string_lossy().starts_with('.')
            })
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                let metadata = entry.metadata().ok()?;
                Some(to_stored_image(&name, &metadata))
            })
            .collect();

        sort_images(&mut images, &query.sort_field, &query.sort_order);

        Ok(images)
    }

    /// 获取单张图片的元数据
    pub fn stat(&self, filename: &str) -> Result<StoredImage, StorageError> {
        self.guard.validate(filename)?;

        let path = self.root.join(filename);
        let metadata = fs::metadata(&path).map_err(|_| {
            StorageError::new(StorageErrorCode::FileNotFound).with_filename(filename)
        })?;

        if !metadata.is_file() {
            return Err(StorageError::new(StorageErrorCode::FileNotFound).with_filename(filename));
        }

        Ok(to_stored_image(filename, &metadata))
    }

    /// 解析图片文件路径和 Content-Type，供下载接口使用
    pub fn resolve(&self, filename: &str) -> Result<(PathBuf, &'static str), StorageError> {
        self.guard.validate(filename)?;

        let path = self.root.join(filename);
        if !path.is_file() {
            return Err(StorageError::new(StorageErrorCode::FileNotFound).with_filename(filename));
        }

        let content_type = content_type_for(&path);
        Ok((path, content_type))
    }

    /// 删除一张图片
    pub fn delete(&self, filename: &str) -> Result<(), StorageError> {
        self.guard.validate(filename)?;

        let path = self.root.join(filename);
        if !path.is_file() {
            return Err(StorageError::new(StorageErrorCode::FileNotFound).with_filename(filename));
        }

        fs::remove_file(&path).map_err(StorageError::io)?;
        tracing::info!("已删除文件: {}", filename);
        Ok(())
    }
}

/// 将文件元数据转换为图片记录
fn to_stored_image(filename: &str, metadata: &fs::Metadata) -> StoredImage {
    let updated = metadata.modified().ok().map(system_time_to_iso8601);

    StoredImage {
        name: filename.to_string(),
        filename: filename.to_string(),
        url: image_url(filename),
        size: metadata.len(),
        updated,
    }
}

/// 将 SystemTime 转换为 ISO8601 字符串
fn system_time_to_iso8601(time: SystemTime) -> String {
    let datetime: DateTime<Utc> = time.into();
    datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// 对图片记录进行排序
fn sort_images(images: &mut [StoredImage], field: &SortField, order: &SortOrder) {
    images.sort_by(|a, b| {
        let cmp = match field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Size => a.size.cmp(&b.size),
            SortField::Updated => a.updated.cmp(&b.updated),
        };

        match order {
            SortOrder::Asc => cmp,
            SortOrder::Desc => cmp.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];

    fn store_in(dir: &TempDir, on_collision: OnCollision) -> ImageStore {
        let config = StorageConfig {
            storage_dir: dir.path().to_path_buf(),
            on_collision,
        };
        ImageStore::new(&config).unwrap()
    }

    #[test]
    fn test_upload_then_list_shows_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, OnCollision::Rename);

        let saved = store.save("cat.png", PNG_MAGIC).unwrap();
        assert_eq!(saved.filename, "cat.png");
        assert_eq!(saved.url, "/api/image/cat.png");
        assert_eq!(saved.size, PNG_MAGIC.len() as u64);
        assert!(saved.updated.is_some());

        let images = store.list(&ListQuery::default()).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].filename, "cat.png");
    }

    #[test]
    fn test_delete_then_list_no_longer_shows_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, OnCollision::Rename);

        store.save("cat.png", PNG_MAGIC).unwrap();
        store.delete("cat.png").unwrap();

        let images = store.list(&ListQuery::default()).unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn test_non_image_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, OnCollision::Rename);

        let err = store.save("evil.png", b"<html>not an image</html>").unwrap_err();
        assert_eq!(err.code, StorageErrorCode::NotAnImage);

        // 存储目录必须保持干净
        assert!(store.list(&ListQuery::default()).unwrap().is_empty());
    }

    #[test]
    fn test_empty_payload_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, OnCollision::Rename);

        let err = store.save("empty.png", &[]).unwrap_err();
        assert_eq!(err.code, StorageErrorCode::EmptyPayload);
    }

    #[test]
    fn test_delete_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, OnCollision::Rename);

        let err = store.delete("ghost.png").unwrap_err();
        assert_eq!(err.code, StorageErrorCode::FileNotFound);
    }

    #[test]
    fn test_traversal_name_rejected_everywhere() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, OnCollision::Rename);

        assert_eq!(
            store.save("../escape.png", PNG_MAGIC).unwrap_err().code,
            StorageErrorCode::PathTraversalDetected
        );
        assert_eq!(
            store.delete("../escape.png").unwrap_err().code,
            StorageErrorCode::PathTraversalDetected
        );
        assert_eq!(
            store.resolve("..%2f..%2fescape").unwrap_err().code,
            StorageErrorCode::PathTraversalDetected
        );
    }

    #[test]
    fn test_mismatched_extension_rewritten() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, OnCollision::Rename);

        // JPEG 内容伪装成 .png，存储名改为真实格式
        let saved = store.save("fake.png", JPEG_MAGIC).unwrap();
        assert_eq!(saved.filename, "fake.jpg");
    }

    #[test]
    fn test_collision_rename_keeps_both() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, OnCollision::Rename);

        let first = store.save("cat.png", PNG_MAGIC).unwrap();
        let second = store.save("cat.png", PNG_MAGIC).unwrap();

        assert_eq!(first.filename, "cat.png");
        assert_ne!(second.filename, "cat.png");
        assert!(second.filename.starts_with("cat-"));
        assert!(second.filename.ends_with(".png"));

        assert_eq!(store.list(&ListQuery::default()).unwrap().len(), 2);
    }

    #[test]
    fn test_collision_overwrite_replaces() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, OnCollision::Overwrite);

        store.save("cat.png", PNG_MAGIC).unwrap();
        let mut bigger = PNG_MAGIC.to_vec();
        bigger.extend_from_slice(&[0u8; 16]);
        let second = store.save("cat.png", &bigger).unwrap();

        assert_eq!(second.filename, "cat.png");
        let images = store.list(&ListQuery::default()).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].size, bigger.len() as u64);
    }

    #[test]
    fn test_list_sorted_by_size_desc() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, OnCollision::Rename);

        let mut bigger = PNG_MAGIC.to_vec();
        bigger.extend_from_slice(&[0u8; 100]);
        store.save("small.png", PNG_MAGIC).unwrap();
        store.save("big.png", &bigger).unwrap();

        let query = ListQuery {
            sort_field: SortField::Size,
            sort_order: SortOrder::Desc,
        };
        let images = store.list(&query).unwrap();
        assert_eq!(images[0].filename, "big.png");
        assert_eq!(images[1].filename, "small.png");
    }

    #[test]
    fn test_resolve_returns_content_type() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, OnCollision::Rename);

        store.save("cat.png", PNG_MAGIC).unwrap();
        let (path, content_type) = store.resolve("cat.png").unwrap();
        assert!(path.ends_with("cat.png"));
        assert_eq!(content_type, "image/png");

        assert_eq!(
            store.resolve("ghost.png").unwrap_err().code,
            StorageErrorCode::FileNotFound
        );
    }
}
