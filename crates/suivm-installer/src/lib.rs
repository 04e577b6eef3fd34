mod archive;
mod backup;
mod download;
mod engine;
mod exposure;
mod fs_utils;
mod layout;
mod record;
mod types;

pub use archive::{is_managed_executable, is_primary_executable};
pub use backup::{plan_retention, BackupEntry, BackupListing, BackupStore, RetentionPlan};
pub use download::{DownloadReport, Downloader, HttpDownloader, ProgressFn};
pub use engine::InstallEngine;
pub use exposure::{activate_link, link_target, remove_activation_link};
pub use layout::{
    default_link_path, default_user_prefix, primary_executable_name, InstallationStore,
};
pub use record::{clear_version_record, load_version_record, save_version_record, VersionRecord};
pub use types::{
    InstallOutcome, InstallPlan, InstallRequest, InstallationStatus, SwitchOutcome, SwitchPlan,
    UninstallOutcome,
};
