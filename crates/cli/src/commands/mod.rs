pub mod init;
pub mod ls;
pub mod mkdir;
pub mod report;
pub mod rm;
pub mod upload;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Command {
    /// Write a configuration file
    Init(init::InitArgs),
    /// Create a record prefix
    Mkdir(mkdir::MkdirArgs),
    /// Upload a local file under a prefix
    Upload(upload::UploadArgs),
    /// List the keys under a prefix
    Ls(ls::LsArgs),
    /// Delete everything under a prefix
    Rm(rm::RmArgs),
    /// Print a visit report
    Report(report::ReportArgs),
}
