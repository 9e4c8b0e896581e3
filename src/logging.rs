//! 日志系统配置
//!
//! 支持控制台输出和文件持久化，按文件大小和启动时间滚动，自动清理过期日志

use crate::config::LogConfig;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// 日志文件名前缀
const LOG_PREFIX: &str = "image-host";

/// 滚动日志写入器内部状态
struct RollingState {
    /// 服务启动时间戳（格式：YYYY-MM-DD-HHMMSS）
    start_timestamp: String,
    /// 日志目录路径
    log_dir: PathBuf,
    /// 当前文件句柄
    current_file: Option<File>,
    /// 当前文件序号（0 表示基础文件）
    current_index: u32,
    /// 单个文件最大大小（字节）
    max_file_size: u64,
    /// 当前文件已写入的字节数
    current_size: u64,
}

impl RollingState {
    fn open(log_dir: PathBuf, max_file_size: u64) -> io::Result<Self> {
        let mut state = Self {
            start_timestamp: Local::now().format("%Y-%m-%d-%H%M%S").to_string(),
            log_dir,
            current_file: None,
            current_index: 0,
            max_file_size,
            current_size: 0,
        };
        state.open_current()?;
        Ok(state)
    }

    /// 当前序号对应的日志文件路径
    fn file_path(&self) -> PathBuf {
        let filename = if self.current_index == 0 {
            format!("{}.{}.log", LOG_PREFIX, self.start_timestamp)
        } else {
            format!(
                "{}.{}_{}.log",
                LOG_PREFIX, self.start_timestamp, self.current_index
            )
        };
        self.log_dir.join(filename)
    }

    fn open_current(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_path())?;
        self.current_file = Some(file);
        self.current_size = 0;
        Ok(())
    }

    fn write_rolling(&mut self, buf: &[u8]) -> io::Result<usize> {
        // 超过大小上限时滚动到下一个文件
        if self.current_size + buf.len() as u64 > self.max_file_size {
            if let Some(mut file) = self.current_file.take() {
                file.flush()?;
            }
            self.current_index += 1;
            self.open_current()?;
        }

        let file = self
            .current_file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "日志文件未打开"))?;
        let written = file.write(buf)?;
        self.current_size += written as u64;
        Ok(written)
    }

    fn flush_current(&mut self) -> io::Result<()> {
        if let Some(file) = &mut self.current_file {
            file.flush()?;
        }
        Ok(())
    }
}

/// 滚动日志写入器（线程安全）
///
/// 实现了 Write trait，可以作为日志输出目标
#[derive(Clone)]
pub struct RollingWriter {
    inner: Arc<Mutex<RollingState>>,
}

impl RollingWriter {
    pub fn new(log_dir: PathBuf, max_file_size: u64) -> io::Result<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(RollingState::open(log_dir, max_file_size)?)),
        })
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().unwrap().write_rolling(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().unwrap().flush_current()
    }
}

/// 日志系统守卫
/// 必须保持存活，否则日志写入线程会终止
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// 初始化日志系统
///
/// 失败时（目录不可创建、文件不可写）回退到仅控制台输出
pub fn init_logging(config: &LogConfig) -> LogGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_ansi(true);

    let file_writer = if config.enabled {
        fs::create_dir_all(&config.log_dir)
            .map_err(|e| eprintln!("创建日志目录失败: {:?}, 错误: {}", config.log_dir, e))
            .ok()
            .and_then(|_| {
                RollingWriter::new(config.log_dir.clone(), config.max_file_size)
                    .map_err(|e| eprintln!("创建日志文件失败: {}, 回退到仅控制台输出", e))
                    .ok()
            })
    } else {
        None
    };

    match file_writer {
        Some(writer) => {
            let (non_blocking, file_guard) = tracing_appender::non_blocking(writer);

            // 文件输出层（不带 ANSI 颜色）
            let file_layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
                .with_ansi(false)
                .with_writer(non_blocking);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .init();

            info!(
                "日志系统初始化完成: 目录={:?}, 保留天数={}, 级别={}, 单文件最大={:.1}MB",
                config.log_dir,
                config.retention_days,
                config.level,
                config.max_file_size as f64 / 1024.0 / 1024.0
            );

            cleanup_old_logs(&config.log_dir, config.retention_days);

            LogGuard {
                _file_guard: Some(file_guard),
            }
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .init();

            info!("日志系统初始化完成（仅控制台输出）");

            LogGuard { _file_guard: None }
        }
    }
}

/// 清理过期日志文件
fn cleanup_old_logs(log_dir: &Path, retention_days: u32) {
    let now = Local::now().date_naive();
    let retention = chrono::Duration::days(retention_days as i64);

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("读取日志目录失败: {:?}, 错误: {}", log_dir, e);
            return;
        }
    };

    let mut deleted_count = 0;

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let filename = match path.file_name().and_then(|s| s.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if !filename.starts_with(LOG_PREFIX) || !filename.ends_with(".log") {
            continue;
        }

        let expired = match extract_date_from_filename(filename)
            .and_then(|d| chrono::NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
        {
            Some(file_date) => now.signed_duration_since(file_date) > retention,
            // 文件名无法解析时使用修改时间作为后备方案
            None => expired_by_modified_time(&entry, retention_days),
        };

        if expired {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("删除过期日志文件失败: {:?}, 错误: {}", path, e);
            } else {
                deleted_count += 1;
                tracing::debug!("已删除过期日志文件: {:?}", path);
            }
        }
    }

    if deleted_count > 0 {
        info!("已清理 {} 个过期日志文件", deleted_count);
    }
}

/// 从文件名中提取日期部分 (YYYY-MM-DD)
///
/// 支持 image-host.YYYY-MM-DD-HHMMSS.log 和 image-host.YYYY-MM-DD-HHMMSS_N.log
fn extract_date_from_filename(filename: &str) -> Option<String> {
    let name = filename
        .strip_prefix(LOG_PREFIX)?
        .strip_prefix('.')?
        .strip_suffix(".log")?;

    let parts: Vec<&str> = name.split('-').collect();
    if parts.len() >= 3 {
        Some(format!("{}-{}-{}", parts[0], parts[1], parts[2]))
    } else {
        None
    }
}

/// 根据文件修改时间检查是否过期（后备方案）
fn expired_by_modified_time(entry: &fs::DirEntry, retention_days: u32) -> bool {
    let now = chrono::Utc::now();
    let retention = chrono::Duration::days(retention_days as i64);

    if let Ok(metadata) = entry.metadata() {
        if let Ok(modified) = metadata.modified() {
            let modified: chrono::DateTime<chrono::Utc> = modified.into();
            return now.signed_duration_since(modified) > retention;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_log_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_extract_date_from_filename() {
        assert_eq!(
            extract_date_from_filename("image-host.2026-08-28-120000.log"),
            Some("2026-08-28".to_string())
        );
        assert_eq!(
            extract_date_from_filename("image-host.2026-08-28-120000_3.log"),
            Some("2026-08-28".to_string())
        );
        assert_eq!(extract_date_from_filename("image-host.bad.log"), None);
    }

    #[test]
    fn test_rolling_writer_rotates() {
        let temp_dir = TempDir::new().unwrap();
        // 上限 16 字节，两次 10 字节写入必然触发滚动
        let mut writer = RollingWriter::new(temp_dir.path().to_path_buf(), 16).unwrap();

        writer.write_all(b"0123456789").unwrap();
        writer.write_all(b"0123456789").unwrap();
        writer.flush().unwrap();

        let count = fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(count, 2);
    }
}
