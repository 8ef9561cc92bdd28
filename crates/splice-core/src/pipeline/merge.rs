//! Fan-in merger for announcement channels.

use tokio::sync::mpsc;

/// Merges `inputs` into one output channel.
///
/// Every value sent on any input appears exactly once on the output;
/// interleaving across inputs is arbitrary. The output closes when all
/// inputs have closed; closing a single input does not close the output.
/// Each input is drained by one forwarding task that exits when its input
/// closes or the output's receiver is dropped, so cancellation leaks
/// nothing.
pub fn merge<T: Send + 'static>(
    inputs: Vec<mpsc::Receiver<T>>,
    buffer: usize,
) -> mpsc::Receiver<T> {
    let (tx, rx) = mpsc::channel(buffer);

    for mut input in inputs {
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(value) = input.recv().await {
                if tx.send(value).await.is_err() {
                    // Output receiver dropped; stop forwarding.
                    break;
                }
            }
        });
    }

    // The forwarders hold the only remaining senders; when the last input
    // closes, the output closes with it.
    rx
}
