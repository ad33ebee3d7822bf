//! True container-level scoped (temporary) bindings with guaranteed restoration.
//!
//! Distinct from [`crate::provider::scope::Scope`] (the per-request scoped
//! *lifetime* mechanism, which never touches the registry). `scoped` here
//! pushes a snapshot of the affected registry entries, installs temporary
//! overrides, runs a callback, and unconditionally restores the previous
//! state on every exit path — including panics — exactly like
//! [`crate::internal::circular::StackGuard`] guarantees stack-pop on unwind.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::DiResult;
use crate::key::Key;
use crate::registration::{AnyArc, Registration};

/// One temporary override to install for the duration of a `scoped` call.
pub enum ScopedBindingValue {
    /// Replace the binding with a fresh factory (non-shared).
    Factory(Arc<dyn for<'a> Fn(&crate::provider::ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>),
    /// Replace the binding with an existing registration (e.g. to
    /// temporarily alias one key's factory onto another).
    Existing(crate::lifetime::Lifetime, Arc<dyn for<'a> Fn(&crate::provider::ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>),
    /// Replace the binding's instance cache with a fixed value.
    Instance(AnyArc),
}

/// A snapshot of one registry slot taken before a scoped override is applied.
pub(crate) enum Snapshot {
    /// The key had a registration before the scope began.
    Existed(Key, Registration),
    /// The key had no registration before the scope began.
    Absent(Key),
}

/// Builds the list of registrations to install and the snapshots needed to
/// restore them, given the registry's current state for each key.
///
/// `lookup` reads the current registration for a key (cloning only the
/// pieces needed to reconstruct it, since `Registration` itself isn't `Clone`
/// — the caller on the `ServiceProvider` side re-derives a fresh
/// `Registration` from the snapshot's `(lifetime, ctor)` pair on restore).
pub(crate) fn plan_overrides(
    bindings: Vec<(Key, ScopedBindingValue)>,
) -> Vec<(Key, Registration)> {
    bindings
        .into_iter()
        .map(|(key, value)| {
            let reg = match value {
                ScopedBindingValue::Factory(ctor) => {
                    Registration::new(crate::lifetime::Lifetime::Transient, ctor)
                }
                ScopedBindingValue::Existing(lifetime, ctor) => Registration::new(lifetime, ctor),
                ScopedBindingValue::Instance(value) => {
                    let reg = Registration::new(
                        crate::lifetime::Lifetime::Singleton,
                        Arc::new(move |_: &crate::provider::ResolverContext<'_>| Ok(value.clone())),
                    );
                    reg
                }
            };
            (key, reg)
        })
        .collect()
}

/// Runs `callback`, guaranteeing `restore` is invoked exactly once on every
/// exit path (normal return or unwind), then resumes any caught panic.
pub(crate) fn run_with_guaranteed_restore<R>(
    callback: impl FnOnce() -> R,
    restore: impl FnOnce(),
) -> R {
    struct RestoreGuard<F: FnOnce()> {
        restore: Option<F>,
    }
    impl<F: FnOnce()> Drop for RestoreGuard<F> {
        fn drop(&mut self) {
            if let Some(f) = self.restore.take() {
                f();
            }
        }
    }

    let guard = RestoreGuard { restore: Some(restore) };
    let result = panic::catch_unwind(AssertUnwindSafe(callback));
    drop(guard);

    match result {
        Ok(v) => v,
        Err(payload) => panic::resume_unwind(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn restore_runs_on_normal_return() {
        let restored = AtomicBool::new(false);
        let v = run_with_guaranteed_restore(|| 42, || restored.store(true, Ordering::SeqCst));
        assert_eq!(v, 42);
        assert!(restored.load(Ordering::SeqCst));
    }

    #[test]
    fn restore_runs_on_panic() {
        let restored = AtomicBool::new(false);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            run_with_guaranteed_restore(
                || panic!("boom"),
                || restored.store(true, Ordering::SeqCst),
            )
        }));
        assert!(result.is_err());
        assert!(restored.load(Ordering::SeqCst));
    }
}
