use std::path::{Path, PathBuf};

use counter_app::CounterConfig;

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: CounterConfig,
    pub file: PathBuf,
    pub created: bool,
}

/// Reads the config at `explicit`, or the data dir's default file, writing
/// defaults when the default file is missing. An explicit path must exist.
pub fn load_or_create(explicit: Option<PathBuf>, default_file: &Path) -> Result<ConfigLoad, String> {
    if let Some(file) = explicit {
        let config = CounterConfig::load(&file)
            .map_err(|err| format!("load config {}: {}", file.display(), err))?;
        return Ok(ConfigLoad {
            config,
            file,
            created: false,
        });
    }

    let (config, created) = CounterConfig::load_or_create(default_file)
        .map_err(|err| format!("load config {}: {}", default_file.display(), err))?;
    Ok(ConfigLoad {
        config,
        file: default_file.to_path_buf(),
        created,
    })
}
