pub mod erase;
pub mod extract;
pub mod list;
pub mod pack;
pub mod unpack;
pub mod write;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Pack a directory into an archive
    Pack(pack::PackArgs),
    /// Extract an archive, or a part of it, into a directory
    Extract(extract::ExtractArgs),
    /// List the contents of an archive
    List(list::ListArgs),
    /// Add or replace a file or directory in an archive
    Write(write::WriteArgs),
    /// Remove files or directories from an archive
    Erase(erase::EraseArgs),
    /// Move files or directories of an archive to its unpacked directory
    Unpack(unpack::UnpackArgs),
}

impl Commands {
    pub async fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Pack(pack) => pack.handle().await,
            Commands::Extract(extract) => extract.handle().await,
            Commands::List(list) => list.handle(),
            Commands::Write(write) => write.handle().await,
            Commands::Erase(erase) => erase.handle().await,
            Commands::Unpack(unpack) => unpack.handle().await,
        }
    }
}
