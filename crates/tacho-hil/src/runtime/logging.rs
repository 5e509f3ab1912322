use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber: console (pretty or JSON) plus a
/// timestamped log file under `log_dir`.
///
/// Keep the returned guard alive until exit so buffered file output is flushed.
pub fn init_tracing(json_output: bool, log_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,tacho_hil=debug,tacho_core=debug,tacho_io=debug")
    });

    let (file_layer, guard) = match open_log_file(log_dir) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        Err(e) => {
            eprintln!(
                "warning: file logging disabled, cannot open {}: {e}",
                log_dir.display()
            );
            (None, None)
        }
    };

    if json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(fmt::layer().pretty())
            .init();
    }

    guard
}

fn open_log_file(
    log_dir: &Path,
) -> Result<RollingFileAppender, tracing_appender::rolling::InitError> {
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(format!("tacho_hil_{stamp}"))
        .filename_suffix("log")
        .build(log_dir)
}
