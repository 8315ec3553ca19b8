use crate::error::{CoreError, CoreResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;

/// Feed `inputs` through `workers` threads over a queue of depth `bound`; every outcome goes to
/// `sink` on a single collector thread, in completion order.
///
/// The first error (from `process` or `sink`) stops feeding. Items already queued still run
/// to completion, their results are dropped, and the error is returned.
pub fn process_bounded<T, R, I, P, S>(
    inputs: I,
    workers: usize,
    bound: usize,
    process: P,
    mut sink: S,
) -> CoreResult<()>
where
    I: IntoIterator<Item = T>,
    T: Send,
    R: Send,
    P: Fn(T) -> CoreResult<R> + Sync,
    S: FnMut(R) -> CoreResult<()> + Send,
{
    let workers = workers.max(1);
    let abort = AtomicBool::new(false);
    let (in_tx, in_rx) = mpsc::sync_channel::<T>(bound.max(1));
    let in_rx = Mutex::new(in_rx);
    let (out_tx, out_rx) = mpsc::channel::<CoreResult<R>>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let out_tx = out_tx.clone();
            let in_rx = &in_rx;
            let process = &process;
            let abort = &abort;
            scope.spawn(move || loop {
                let next = match in_rx.lock() {
                    Ok(rx) => rx.recv(),
                    Err(_) => break,
                };
                let Ok(item) = next else {
                    break;
                };
                let outcome = process(item);
                if outcome.is_err() {
                    abort.store(true, Ordering::SeqCst);
                }
                if out_tx.send(outcome).is_err() {
                    break;
                }
            });
        }
        drop(out_tx);

        let abort_ref = &abort;
        let collector = scope.spawn(move || {
            let mut first_err: Option<CoreError> = None;
            for outcome in out_rx {
                if first_err.is_some() {
                    continue;
                }
                match outcome.and_then(&mut sink) {
                    Ok(()) => {}
                    Err(e) => {
                        abort_ref.store(true, Ordering::SeqCst);
                        first_err = Some(e);
                    }
                }
            }
            first_err
        });

        for item in inputs {
            if abort.load(Ordering::SeqCst) || in_tx.send(item).is_err() {
                break;
            }
        }
        drop(in_tx);

        match collector.join() {
            Ok(None) => Ok(()),
            Ok(Some(e)) => Err(e),
            Err(_) => Err(CoreError::InvalidInput(
                "result collector thread panicked".to_string(),
            )),
        }
    })
}
