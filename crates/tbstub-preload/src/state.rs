//! Process-wide state, built on first use by whichever shadow runs first.

use tbstub_config::{logging, StubConfig};
use tbstub_core::{InitGuard, StubState, SystemLinker};

static STATE: InitGuard<StubState> = InitGuard::new();

/// The initialized state. Aborts the process if it cannot be built.
#[inline]
pub(crate) fn get() -> &'static StubState {
    STATE.get_or_abort(|| {
        logging::init_stub_logging();
        unsafe { StubState::init(StubConfig::from_env, &SystemLinker) }
    })
}

#[cfg(not(target_arch = "x86"))]
mod pulse {
    use tbstub_core::pulse::{self, PaMutexNewFn, PULSECORE_GLOB};
    use tbstub_core::{InitGuard, SystemLinker};

    static PA_MUTEX_NEW: InitGuard<PaMutexNewFn> = InitGuard::new();

    /// Real `pa_mutex_new`, resolved once after the shared state exists.
    pub(crate) fn pa_mutex_new() -> PaMutexNewFn {
        let dlopen = super::get().dlopen;
        *PA_MUTEX_NEW.get_or_abort(|| unsafe {
            pulse::resolve_mutex_new(&SystemLinker, dlopen, PULSECORE_GLOB)
        })
    }
}

#[cfg(not(target_arch = "x86"))]
pub(crate) use pulse::pa_mutex_new;
