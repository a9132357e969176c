use std::env;
use std::path::PathBuf;

/// Sender address Rocketbook delivers scan notifications from.
pub const ROCKETBOOK_SENDER: &str = "notes@email.getrocketbook.com";
/// Drive folder that receives uploaded scans.
pub const DRIVE_FOLDER: &str = "Rocketbook Scans";

const DEFAULT_DASHBOARD_DIR: &str = "/tmp/daily-brief-ghpages";
const INDEX_FILE: &str = "index.html";
const DATA_FILE: &str = "rocketbook_data.json";

/// Resolved paths and collaborator settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub dashboard_dir: PathBuf,
    pub index_file: PathBuf,
    pub data_file: PathBuf,
    pub sender: String,
    pub drive_folder: String,
    pub branch: String,
}

impl Config {
    /// Resolve the dashboard checkout: explicit flag first, then the
    /// DASHBOARD_DIR environment variable, then the deployment default.
    pub fn new(dir: Option<PathBuf>) -> Self {
        let dashboard_dir = dir
            .or_else(|| env::var("DASHBOARD_DIR").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DASHBOARD_DIR));
        Self {
            index_file: dashboard_dir.join(INDEX_FILE),
            data_file: dashboard_dir.join(DATA_FILE),
            dashboard_dir,
            sender: ROCKETBOOK_SENDER.to_string(),
            drive_folder: DRIVE_FOLDER.to_string(),
            branch: "main".to_string(),
        }
    }

    /// Gmail search for recent scan emails with PDF attachments.
    pub fn gmail_query(&self) -> String {
        format!("from:{} newer_than:30d has:attachment filename:pdf", self.sender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let cfg = Config::new(Some(PathBuf::from("/srv/brief")));
        assert_eq!(cfg.dashboard_dir, PathBuf::from("/srv/brief"));
        assert_eq!(cfg.index_file, PathBuf::from("/srv/brief/index.html"));
        assert_eq!(cfg.data_file, PathBuf::from("/srv/brief/rocketbook_data.json"));
    }

    #[test]
    fn query_targets_the_rocketbook_sender() {
        let cfg = Config::new(Some(PathBuf::from("/tmp/x")));
        assert_eq!(
            cfg.gmail_query(),
            "from:notes@email.getrocketbook.com newer_than:30d has:attachment filename:pdf"
        );
    }
}
