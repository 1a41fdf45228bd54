//! Main sync command

use crate::config::{GpgConfig, SyncOptions};
use crate::pgp::GpgDecryptor;
use crate::sync::sync_site;
use crate::transport;
use crate::types::SyncError;
use std::path::PathBuf;
use tracing::warn;

/// Run a full site sync
///
/// A connection that cannot be established is not an error: the sync is
/// aborted with an empty result and a logged diagnostic, matching the
/// "nothing to report" contract of the connection factory.
pub fn run(options: &SyncOptions, gpg: &GpgConfig) -> Result<Vec<PathBuf>, SyncError> {
    let Some(mut cn) = transport::connect(options) else {
        warn!(site = %options.site, "no connection could be established, nothing to sync");
        return Ok(Vec::new());
    };

    let decryptor = GpgDecryptor::new(gpg.clone());
    let result = sync_site(cn.as_mut(), options, &decryptor);
    cn.close();

    let outcome = result?;
    println!("{}", outcome.stats);
    Ok(outcome.files)
}
