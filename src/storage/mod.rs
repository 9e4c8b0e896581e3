// 图片存储模块

pub mod guard;
pub mod service;
pub mod sniff;
pub mod types;

pub use guard::NameGuard;
pub use service::ImageStore;
pub use sniff::{sniff_image, SniffedFormat};
pub use types::{
    content_type_for, image_url, ListQuery, SortField, SortOrder, StorageError, StorageErrorCode,
    StoredImage,
};
