use crate::{Error, Result};
use crossbeam::channel::{self, Receiver};

/// Install a ctrl-c handler that signals the driver loop instead of exiting immediately.
pub(super) fn create_shutdown_signal() -> Result<Receiver<()>> {
    let (tx, rx) = channel::bounded(1);

    ctrlc::set_handler(move || {
        // A second ctrl-c while the first is still pending is dropped.
        let _ = tx.try_send(());
    })
    .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;

    Ok(rx)
}
