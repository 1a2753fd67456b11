use directories::ProjectDirs;
use std::path::PathBuf;

pub fn data_root() -> PathBuf {
    if let Some(pd) = ProjectDirs::from("com", "mimir", "Mimir") {
        pd.data_dir().to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

pub fn store_files_in(root: PathBuf) -> (PathBuf, PathBuf) {
    let file = root.join("mimir.json");
    let backups = root.join("backups");
    (file, backups)
}

pub fn default_store_file() -> (PathBuf, PathBuf) {
    store_files_in(data_root())
}
