// 环境检测模块

use std::fs;
use std::path::Path;

/// 环境检测器
///
/// 用于在生成默认配置时区分 Docker 容器和本地环境
pub struct EnvDetector;

impl EnvDetector {
    /// 检测是否在 Docker 环境中
    ///
    /// 使用多种方法检测 Docker 环境：
    /// 1. 检查 /.dockerenv 文件是否存在
    /// 2. 检查 /proc/1/cgroup 文件内容
    /// 3. 检查环境变量 container
    pub fn is_docker() -> bool {
        // 方法1: 检查 /.dockerenv 文件
        if Path::new("/.dockerenv").exists() {
            return true;
        }

        // 方法2: 检查 /proc/1/cgroup
        if let Ok(content) = fs::read_to_string("/proc/1/cgroup") {
            if content.contains("docker") || content.contains("containerd") {
                return true;
            }
        }

        // 方法3: 检查环境变量
        if std::env::var("container").is_ok() {
            return true;
        }

        false
    }
}
