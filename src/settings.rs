//! # 扫描配置持久化
//!
//! 配置以格式化 JSON 存放在应用数据目录的 `scanner-config.json`。
//! 文件缺失或内容无效时回退默认配置并记录告警，不阻塞应用启动。

use std::fs;
use std::path::Path;

use crate::error::AppError;
use crate::scanner::ScanConfig;

pub const SCAN_CONFIG_FILE_NAME: &str = "scanner-config.json";

/// 从指定路径读取扫描配置。
pub fn load_scan_config_from_path(path: &Path) -> ScanConfig {
    if !path.exists() {
        log::info!("⚙️ 未找到扫描配置文件，使用默认配置：{}", path.display());
        return ScanConfig::default();
    }

    let parsed = fs::read_to_string(path)
        .map_err(|e| format!("读取失败: {}", e))
        .and_then(|content| {
            serde_json::from_str::<ScanConfig>(&content).map_err(|e| format!("解析失败: {}", e))
        })
        .and_then(|config| {
            config.validate().map_err(|e| e.to_string())?;
            Ok(config)
        });

    match parsed {
        Ok(config) => {
            log::info!("⚙️ 已加载扫描配置：{}", path.display());
            config
        }
        Err(err) => {
            log::warn!("⚠️ 扫描配置不可用，回退默认配置（{}）：{}", path.display(), err);
            ScanConfig::default()
        }
    }
}

/// 将扫描配置写入指定路径。
pub fn save_scan_config_to_path(path: &Path, config: &ScanConfig) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Storage(format!("创建配置目录失败: {}", e)))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| AppError::Storage(format!("序列化扫描配置失败: {}", e)))?;

    fs::write(path, content)?;
    log::debug!("💾 扫描配置已保存：{}", path.display());
    Ok(())
}

#[cfg(feature = "app")]
mod app {
    use super::*;
    use std::path::PathBuf;
    use tauri::{AppHandle, Manager, Runtime};

    pub fn scan_config_path<R: Runtime>(app: &AppHandle<R>) -> Result<PathBuf, AppError> {
        let app_data_dir = app
            .path()
            .app_data_dir()
            .map_err(|e| AppError::Storage(format!("获取应用数据目录失败: {}", e)))?;

        fs::create_dir_all(&app_data_dir)
            .map_err(|e| AppError::Storage(format!("创建应用数据目录失败: {}", e)))?;

        Ok(app_data_dir.join(SCAN_CONFIG_FILE_NAME))
    }

    pub fn load_scan_config<R: Runtime>(app: &AppHandle<R>) -> ScanConfig {
        match scan_config_path(app) {
            Ok(path) => load_scan_config_from_path(&path),
            Err(err) => {
                log::warn!("⚠️ 无法定位扫描配置文件，使用默认配置：{}", err);
                ScanConfig::default()
            }
        }
    }

    pub fn save_scan_config<R: Runtime>(app: &AppHandle<R>, config: &ScanConfig) -> Result<(), AppError> {
        let path = scan_config_path(app)?;
        save_scan_config_to_path(&path, config)
    }
}

#[cfg(feature = "app")]
pub use app::{load_scan_config, save_scan_config, scan_config_path};
