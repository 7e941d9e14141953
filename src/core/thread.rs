use std::io;

/// Pin the calling thread to a CPU core.
pub fn pin_to_cpu(core_id: usize) -> io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        pin_to_cpu_linux(core_id)
    }

    #[cfg(target_os = "windows")]
    {
        pin_to_cpu_windows(core_id)
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        let _ = core_id;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "CPU pinning not supported on this platform",
        ))
    }
}

#[cfg(target_os = "linux")]
fn pin_to_cpu_linux(core_id: usize) -> io::Result<()> {
    use libc::{CPU_SET, CPU_ZERO, cpu_set_t, pthread_self, pthread_setaffinity_np};
    use std::mem;

    unsafe {
        let mut cpuset: cpu_set_t = mem::zeroed();
        CPU_ZERO(&mut cpuset);
        CPU_SET(core_id, &mut cpuset);

        let result = pthread_setaffinity_np(pthread_self(), mem::size_of::<cpu_set_t>(), &cpuset);

        if result != 0 {
            return Err(io::Error::from_raw_os_error(result));
        }
    }

    Ok(())
}

#[cfg(target_os = "windows")]
fn pin_to_cpu_windows(core_id: usize) -> io::Result<()> {
    use windows::Win32::System::Threading::{GetCurrentThread, SetThreadAffinityMask};

    unsafe {
        let mask: usize = 1 << core_id;
        let result = SetThreadAffinityMask(GetCurrentThread(), mask);

        if result == 0 {
            return Err(io::Error::last_os_error());
        }
    }

    Ok(())
}

/// Request the platform's real-time scheduling class for the calling thread.
///
/// Used by the decode and book workers. Usually requires elevated privileges;
/// callers treat failure as a degradation, not an error, and the pipeline
/// runs correctly (if slower under load) at default priority.
pub fn promote_to_realtime() -> io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        promote_to_realtime_linux()
    }

    #[cfg(target_os = "windows")]
    {
        promote_to_realtime_windows()
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "thread priority classes not supported on this platform",
        ))
    }
}

#[cfg(target_os = "linux")]
fn promote_to_realtime_linux() -> io::Result<()> {
    use libc::{SCHED_FIFO, pthread_self, pthread_setschedparam, sched_get_priority_max, sched_param};
    use std::mem;

    unsafe {
        let priority = sched_get_priority_max(SCHED_FIFO);
        if priority == -1 {
            return Err(io::Error::last_os_error());
        }

        let mut param: sched_param = mem::zeroed();
        param.sched_priority = priority;

        let result = pthread_setschedparam(pthread_self(), SCHED_FIFO, &param);
        if result != 0 {
            return Err(io::Error::from_raw_os_error(result));
        }
    }

    Ok(())
}

#[cfg(target_os = "windows")]
fn promote_to_realtime_windows() -> io::Result<()> {
    use windows::Win32::System::Threading::{
        GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_TIME_CRITICAL,
    };

    unsafe {
        SetThreadPriority(GetCurrentThread(), THREAD_PRIORITY_TIME_CRITICAL)
            .map_err(|e| io::Error::from_raw_os_error(e.code().0))?;
    }

    Ok(())
}

pub fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_cpus() {
        assert!(num_cpus() > 0);
    }

    #[test]
    fn test_pin_to_cpu_does_not_panic() {
        // Pinning may fail in containers or on exotic platforms; the call
        // must still return cleanly either way.
        let _ = pin_to_cpu(0);
    }

    #[test]
    fn test_promote_to_realtime_does_not_panic() {
        // Real-time class normally needs privileges; failure is expected.
        let _ = promote_to_realtime();
    }
}
