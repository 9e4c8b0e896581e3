// API处理器模块

pub mod config;
pub mod images;

pub use config::{get_config, update_config};
pub use images::{
    delete_image, get_image, get_image_urls, list_image_metadata, upload_image, ApiResponse,
};
