pub(crate) use crate::config::Config;
pub(crate) use crate::error::{DataverError, DataverResult, bail};
pub(crate) use crate::progress::ProgressBarBuilder;
pub(crate) use crate::store::{DatasetDir, VersionDir};
