//! # Tauri 命令层
//!
//! ## 设计思路
//!
//! 命令层仅做 IPC 参数接收与结果返回，不承载业务逻辑。
//! 所有实际处理交由 `ScanServiceState`，保持命令函数薄、稳定、易测试。

use serde::Serialize;
use tauri::{AppHandle, Emitter, State, Wry};

use super::{FrameRequest, FrameSubmission, ScanConfig, ScanError, ScanEvent, ScanServiceState, ScanStatistics};

pub const SCAN_PROGRESS_EVENT: &str = "barcode-scan-progress";

#[derive(Debug, Clone, Serialize)]
pub struct ScanCommandError {
    pub code: &'static str,
    pub stage: &'static str,
    pub message: String,
}

impl From<ScanError> for ScanCommandError {
    fn from(error: ScanError) -> Self {
        Self {
            code: error.code(),
            stage: error.stage(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanProgressPayload {
    request_id: String,
    #[serde(flatten)]
    event: ScanEvent,
}

/// 对单帧 Base64 图片执行三档级联扫描。
///
/// 返回按换行拼接的条码内容，三档都未命中时返回 `no barcodes found`。
#[tauri::command]
pub async fn process_frame(
    state: State<'_, ScanServiceState>,
    app: AppHandle<Wry>,
    base64_frame_data: String,
    width: u32,
    height: u32,
    orientation: String,
    request_id: Option<String>,
) -> Result<String, ScanCommandError> {
    let request = FrameRequest::base64(base64_frame_data, width, height, orientation);

    let report = match request_id {
        Some(request_id) => {
            state
                .process_frame_with_progress(request, |event| {
                    let payload = ScanProgressPayload {
                        request_id: request_id.clone(),
                        event,
                    };
                    if let Err(err) = app.emit(SCAN_PROGRESS_EVENT, payload) {
                        log::warn!("⚠️ 扫描进度事件发送失败：{}", err);
                    }
                })
                .await
        }
        None => state.process_frame(request).await,
    }
    .map_err(ScanCommandError::from)?;

    Ok(report.outcome.to_response())
}

/// 对单帧二进制图片执行三档级联扫描。
#[tauri::command]
pub async fn process_frame_bytes(
    state: State<'_, ScanServiceState>,
    frame: Vec<u8>,
    width: u32,
    height: u32,
    orientation: String,
) -> Result<String, ScanCommandError> {
    let report = state
        .process_frame(FrameRequest::bytes(frame, width, height, orientation))
        .await
        .map_err(ScanCommandError::from)?;

    Ok(report.outcome.to_response())
}

/// 实时相机取帧入口：受节流间隔与忙碌状态约束。
#[tauri::command]
pub async fn submit_camera_frame(
    state: State<'_, ScanServiceState>,
    base64_frame_data: String,
    width: u32,
    height: u32,
    orientation: String,
) -> Result<FrameSubmission, ScanCommandError> {
    state
        .submit_frame(FrameRequest::base64(base64_frame_data, width, height, orientation))
        .await
        .map_err(ScanCommandError::from)
}

#[tauri::command]
pub fn get_scan_config(state: State<'_, ScanServiceState>) -> Result<ScanConfig, crate::error::AppError> {
    Ok(state.get_config()?)
}

/// 校验、应用并持久化扫描配置。
#[tauri::command]
pub fn set_scan_config(
    state: State<'_, ScanServiceState>,
    app: AppHandle<Wry>,
    config: ScanConfig,
) -> Result<(), crate::error::AppError> {
    state.set_config(config.clone())?;
    crate::settings::save_scan_config(&app, &config)?;
    Ok(())
}

#[tauri::command]
pub fn get_scan_statistics(state: State<'_, ScanServiceState>) -> Result<ScanStatistics, crate::error::AppError> {
    Ok(state.statistics()?)
}

#[tauri::command]
pub fn reset_scan_statistics(state: State<'_, ScanServiceState>) -> Result<(), crate::error::AppError> {
    state.reset_statistics()?;
    Ok(())
}
