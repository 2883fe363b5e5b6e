use std::path::Path;

use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming};
use once_cell::sync::OnceCell;

static LOGGER: OnceCell<()> = OnceCell::new();

pub fn init() -> anyhow::Result<()> {
    init_at(Path::new("logs"))
}

/// Start the rotating file logger once; later calls are no-ops, even
/// with a different directory.
pub fn init_at(log_dir: &Path) -> anyhow::Result<()> {
    LOGGER.get_or_try_init(|| {
        std::fs::create_dir_all(log_dir)?;
        Logger::try_with_env_or_str("info")?
            .duplicate_to_stderr(Duplicate::Warn)
            .log_to_file(FileSpec::default().directory(log_dir).basename("reader"))
            .rotate(
                Criterion::AgeOrSize(Age::Day, 10_000_000),
                Naming::Numbers,
                Cleanup::KeepLogFiles(7),
            )
            .start()?;
        Ok::<(), anyhow::Error>(())
    })?;
    Ok(())
}
