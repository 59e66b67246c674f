//! # 日志初始化模块
//!
//! ## 设计思路
//!
//! 日志只在应用启动时初始化一次：后端统一走 `log` 门面，由 `env_logger` 输出，
//! 默认级别 `info`，可用 `RUST_LOG` 覆盖。提供日志目录时同时写入
//! `barcode_scanner_logs.txt`，便于在真机上导出扫描记录。
//!
//! ## 实现思路
//!
//! - 行格式：`[yyyy-MM-dd HH:mm:ss.SSS] LEVEL/target: message`
//! - `TeeWriter` 作为 `Target::Pipe`，同一行同时写 stderr 与日志文件
//! - `OnceCell` 记录初始化结果，重复调用直接返回首次结果，日志路径只公布一次

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use once_cell::sync::OnceCell;

use crate::error::AppError;

pub const LOG_FILE_NAME: &str = "barcode_scanner_logs.txt";

static LOG_PATH: OnceCell<Option<PathBuf>> = OnceCell::new();

/// 初始化全局日志，返回日志文件路径（未提供目录时为 `None`）。
///
/// 多次调用是安全的，只有第一次生效。
pub fn init_logging(log_dir: Option<&Path>) -> Result<Option<PathBuf>, AppError> {
    LOG_PATH
        .get_or_try_init(|| {
            let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{}",
                    format_line(Local::now(), record.level(), record.target(), record.args())
                )
            });

            let log_path = match log_dir {
                Some(dir) => {
                    let (writer, path) = TeeWriter::open_in(dir)?;
                    builder.target(env_logger::Target::Pipe(Box::new(writer)));
                    Some(path)
                }
                None => None,
            };

            if let Err(err) = builder.try_init() {
                // 其他组件已安装 logger 时沿用现有 logger。
                eprintln!("logger already initialized: {}", err);
            }

            match &log_path {
                Some(path) => log::info!("📝 日志文件：{}", path.display()),
                None => log::info!("📝 日志仅输出到 stderr"),
            }

            Ok(log_path)
        })
        .cloned()
}

/// 已初始化的日志文件路径。
pub fn log_file_path() -> Option<&'static Path> {
    LOG_PATH.get().and_then(|path| path.as_deref())
}

pub(crate) fn format_line(
    timestamp: DateTime<Local>,
    level: log::Level,
    target: &str,
    message: impl std::fmt::Display,
) -> String {
    format!(
        "[{}] {}/{}: {}",
        timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        level,
        target,
        message
    )
}

/// 同时写入 stderr 与日志文件。
struct TeeWriter {
    file: File,
}

impl TeeWriter {
    fn open_in(dir: &Path) -> Result<(Self, PathBuf), AppError> {
        fs::create_dir_all(dir)
            .map_err(|e| AppError::Logging(format!("创建日志目录失败: {}", e)))?;

        let path = dir.join(LOG_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AppError::Logging(format!("打开日志文件失败: {}", e)))?;

        Ok((Self { file }, path))
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // 文件写入失败不影响 stderr 输出。
        let _ = self.file.write_all(buf);
        io::stderr().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.file.flush();
        io::stderr().flush()
    }
}
