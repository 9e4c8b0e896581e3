// 图片格式嗅探
//
// 通过魔数识别上传内容的真实格式，不信任客户端提供的扩展名

use image::ImageFormat;

use super::types::{StorageError, StorageErrorCode};

/// 嗅探出的图片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SniffedFormat {
    format: ImageFormat,
}

impl SniffedFormat {
    /// 该格式的规范扩展名
    pub fn canonical_ext(&self) -> &'static str {
        match self.format {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Ico => "ico",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Avif => "avif",
            _ => "bin",
        }
    }

    /// 扩展名是否与该格式匹配（jpg/jpeg、tif/tiff 视为同格式）
    pub fn matches_ext(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        match self.format {
            ImageFormat::Jpeg => ext == "jpg" || ext == "jpeg",
            ImageFormat::Tiff => ext == "tif" || ext == "tiff",
            _ => ext == self.canonical_ext(),
        }
    }
}

/// 嗅探字节内容，仅接受受支持的图片格式
pub fn sniff_image(bytes: &[u8]) -> Result<SniffedFormat, StorageError> {
    let format = image::guess_format(bytes)
        .map_err(|_| StorageError::new(StorageErrorCode::NotAnImage))?;

    // guess_format 也能识别非图片容器（如 PDF 不会到这里，但 EXR 等会），
    // 只放行本服务支持直出的格式
    match format {
        ImageFormat::Png
        | ImageFormat::Jpeg
        | ImageFormat::Gif
        | ImageFormat::WebP
        | ImageFormat::Bmp
        | ImageFormat::Ico
        | ImageFormat::Tiff
        | ImageFormat::Avif => Ok(SniffedFormat { format }),
        _ => Err(StorageError::new(StorageErrorCode::NotAnImage)
            .with_message(format!("不支持的图片格式: {:?}", format))),
    }
}
