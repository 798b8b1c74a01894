use std::path::PathBuf;

const DB_FILE_NAME: &str = "token-counter.sqlite";

#[derive(Debug, Clone)]
pub struct DataDirResolution {
    pub dir: PathBuf,
    pub matched_existing: bool,
}

pub fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<DataDirResolution, String> {
    if let Some(dir) = explicit {
        let matched_existing = dir.join(DB_FILE_NAME).exists();
        return Ok(DataDirResolution {
            dir,
            matched_existing,
        });
    }

    let home = std::env::var("HOME").map_err(|err| format!("resolve HOME: {}", err))?;
    let home = PathBuf::from(home);
    let candidates = [
        home.join("Library")
            .join("Application Support")
            .join("token-counter"),
        std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local").join("share"))
            .join("token-counter"),
    ];

    for candidate in &candidates {
        if candidate.join(DB_FILE_NAME).exists() {
            return Ok(DataDirResolution {
                dir: candidate.clone(),
                matched_existing: true,
            });
        }
    }

    let index = if cfg!(target_os = "macos") { 0 } else { 1 };
    Ok(DataDirResolution {
        dir: candidates[index].clone(),
        matched_existing: false,
    })
}
