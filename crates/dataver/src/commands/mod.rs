pub(crate) use archive::Archive;
pub(crate) use build::Build;
pub(crate) use completions::Completions;
pub(crate) use init::Init;
pub(crate) use inspect::Inspect;
pub(crate) use list::List;
pub(crate) use remove::Remove;
pub(crate) use verify::Verify;

mod archive;
mod build;
mod completions;
mod init;
mod inspect;
mod list;
mod remove;
mod verify;
