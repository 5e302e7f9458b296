/*!
 * rc-handle demo
 *
 * Shares one file descriptor between worker threads through a HandleGuard,
 * then prints the lifetime registry's view before and after release.
 */

use std::error::Error;
use tracing::info;

use rc_handle::{init_tracing, LifetimeRegistry};
use std::sync::Arc;

#[cfg(unix)]
fn main() -> Result<(), Box<dyn Error>> {
    use rc_handle::{guard_owned_fd, HandleError};
    use std::fs::File;
    use std::os::fd::{BorrowedFd, OwnedFd, RawFd};
    use std::thread;

    init_tracing();

    let registry = Arc::new(LifetimeRegistry::from_env());
    info!(capture = ?registry.config().capture, "Lifetime registry ready");

    let path = std::env::temp_dir().join(format!("rc-handle-demo-{}.txt", std::process::id()));
    std::fs::write(&path, b"shared through a reference-counted guard\n")?;

    let file = File::open(&path)?;
    let guard = Arc::new(guard_owned_fd(OwnedFd::from(file), Some(registry.clone()))?);

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let guard = guard.clone();
            thread::spawn(move || {
                guard.with_handle(|handle| {
                    let raw = RawFd::try_from(handle)
                        .map_err(|_| HandleError::from(nix::errno::Errno::EBADF))?;
                    // SAFETY: the guard keeps the descriptor open while this
                    // callback runs.
                    let fd = unsafe { BorrowedFd::borrow_raw(raw) };
                    let len = File::from(fd.try_clone_to_owned()?).metadata()?.len();
                    info!(worker, handle, len, "Read file length through guard");
                    Ok::<_, HandleError>(len)
                })
            })
        })
        .collect();

    for worker in workers {
        match worker.join() {
            Ok(result) => {
                result?;
            }
            Err(_) => return Err("worker thread panicked".into()),
        }
    }

    let stats = registry.snapshot();
    println!("Before release ({} in flight):", stats.in_flight.len());
    print!("{}", stats.report());

    guard.release()?;

    let stats = registry.snapshot();
    println!("After release: {}", stats.to_json()?);
    if stats.report().is_empty() {
        println!("No leaked handles");
    }

    std::fs::remove_file(&path)?;
    Ok(())
}

#[cfg(not(unix))]
fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let registry = Arc::new(LifetimeRegistry::from_env());
    info!(stats = ?registry.snapshot(), "File descriptor demo requires a Unix platform");
    Ok(())
}
