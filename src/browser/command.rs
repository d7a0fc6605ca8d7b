use super::filter::Scope;
use std::path::PathBuf;
use std::time::Duration;

/// Requests a front-end can make of the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartLoad {
        prefix: String,
        ceiling: Option<usize>,
    },
    ContinueLoad,
    CancelLoad,
    SetSearchTerm(String),
    SelectScope(Scope),
    ToggleSelect(usize),
    DeleteSelected,
    UploadFile {
        local_path: PathBuf,
        /// Defaults to the selected directory.
        destination_prefix: Option<String>,
    },
    DownloadSelected(PathBuf),
    GetLink {
        row: usize,
        expiry: Option<Duration>,
    },
}
