pub use puffin;

/// Turns scope collection on or off for every thread.
pub fn set_enabled(enabled: bool) {
    puffin::set_scopes_on(enabled);
}

pub fn is_enabled() -> bool {
    puffin::are_scopes_on()
}

/// Closes the current puffin frame. One conversion is one frame.
pub fn finish_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

/// Finishes the frame when dropped, also on the error path of a conversion.
pub struct FrameGuard(());

impl FrameGuard {
    #[must_use]
    pub fn new() -> Self {
        Self(())
    }
}

impl Default for FrameGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if is_enabled() {
            finish_frame();
        }
    }
}

#[macro_export]
macro_rules! profile_function {
    () => {
        $crate::puffin::profile_function!();
    };
    ($data:expr) => {
        $crate::puffin::profile_function!($data);
    };
}

#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        $crate::puffin::profile_scope!($name);
    };
    ($name:expr, $data:expr) => {
        $crate::puffin::profile_scope!($name, $data);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrumented() -> u32 {
        profile_function!();
        profile_scope!("inner", "detail");
        7
    }

    #[test]
    fn scopes_run_with_profiling_toggled() {
        set_enabled(true);
        assert!(is_enabled());
        {
            let _frame = FrameGuard::new();
            assert_eq!(instrumented(), 7);
        }

        set_enabled(false);
        assert!(!is_enabled());
        assert_eq!(instrumented(), 7);
    }
}
