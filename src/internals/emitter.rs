use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Something that regularly produces [`Self::Emitted`] from within its own async task.
///
/// Emitted objects are sent through the [`mpsc::Receiver`] returned by [`Self::spawn`];
/// the task terminates once the given [`CancellationToken`] is cancelled.
pub trait Emitter {
    type Emitted: Send;

    fn spawn(
        &self,
        shutdown_token: CancellationToken,
    ) -> (mpsc::Receiver<Self::Emitted>, JoinHandle<()>);
}
