use tracing::subscriber::DefaultGuard;

/// Installs a test-writer subscriber for the current thread.
///
/// Scoped to the thread so it never competes with `#[traced_test]`, which
/// claims the global default. Keep the guard alive for the whole test.
pub fn setup_test_logging() -> DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// Returns true when the current process runs as root (UID 0).
/// Permission-based tests cannot deny access to root, so they skip themselves.
#[inline]
pub fn running_as_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
