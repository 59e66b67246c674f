// 防止在 Windows 发布版本中显示额外的控制台窗口，不要删除！
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

//! # 证件条码扫描器 — 应用入口
//!
//! 本文件仅负责日志初始化、状态注入与命令注册。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use barcode_scanner::{diagnostics, scanner, settings};
use tauri::Manager;

fn main() {
    tauri::Builder::default()
        .setup(|app| {
            let log_dir = app.path().app_log_dir().ok();
            if let Err(err) = diagnostics::init_logging(log_dir.as_deref()) {
                eprintln!("日志文件初始化失败，仅输出到 stderr: {err}");
                let _ = diagnostics::init_logging(None);
            }
            log::info!("setup: begin");

            let handle = app.handle().clone();
            let config = settings::load_scan_config(&handle);

            match scanner::ScanServiceState::with_config(config) {
                Ok(service) => {
                    app.manage(service);
                    log::info!("setup: scan service managed");
                }
                Err(err) => {
                    log::error!("setup: 扫描配置无效，回退默认配置: {err}");
                    let service = scanner::ScanServiceState::new()?;
                    app.manage(service);
                }
            }

            log::info!("setup: complete");
            Ok(())
        })
        // 注册所有 Tauri 命令
        .invoke_handler(tauri::generate_handler![
            scanner::commands::process_frame,
            scanner::commands::process_frame_bytes,
            scanner::commands::submit_camera_frame,
            scanner::commands::get_scan_config,
            scanner::commands::set_scan_config,
            scanner::commands::get_scan_statistics,
            scanner::commands::reset_scan_statistics,
        ])
        .run(tauri::generate_context!())
        .expect("运行 Tauri 应用时出错");
}
