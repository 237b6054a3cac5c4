use crate::error::{ExtractError, Result};
use tracing::info;

/// Descriptors kept free for the inputs, the corpus readers and the runtime.
pub const DESCRIPTOR_HEADROOM: u64 = 1024;

/// Proof that the process may hold `granted` open files at once.
/// Only `raise_open_file_limit` hands these out.
#[derive(Debug)]
pub struct DescriptorBudget {
    granted: u64,
}

impl DescriptorBudget {
    pub fn granted(&self) -> u64 {
        self.granted
    }

    #[cfg(test)]
    pub(crate) fn with_granted(granted: u64) -> Self {
        Self { granted }
    }
}

/// Raises the soft open-file limit to at least `required`. The hard limit is only
/// touched when it is itself below `required`, which needs privileges on most systems.
#[cfg(unix)]
pub fn raise_open_file_limit(required: u64) -> Result<DescriptorBudget> {

    let fail = |source| ExtractError::DescriptorLimit { required, source };

    let mut lim: libc::rlimit = unsafe { std::mem::zeroed() };
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut lim) } != 0 {
        return Err(fail(std::io::Error::last_os_error()));
    }

    let current = lim.rlim_cur as u64;
    if lim.rlim_cur == libc::RLIM_INFINITY || current >= required {
        return Ok(DescriptorBudget { granted: current.max(required) });
    }

    lim.rlim_cur = required as libc::rlim_t;
    if lim.rlim_max != libc::RLIM_INFINITY && (lim.rlim_max as u64) < required {
        lim.rlim_max = required as libc::rlim_t;
    }
    if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &lim) } != 0 {
        return Err(fail(std::io::Error::last_os_error()));
    }

    info!("raised open file limit from {} to {}", current, required);
    Ok(DescriptorBudget { granted: required })
}

#[cfg(not(unix))]
pub fn raise_open_file_limit(required: u64) -> Result<DescriptorBudget> {
    Ok(DescriptorBudget { granted: required })
}
