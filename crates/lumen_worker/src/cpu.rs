//! CPU precondition

use thiserror::Error;

#[derive(Debug, Error)]
#[error("This worker requires a CPU with {0} support")]
pub struct MissingCpuFeature(pub &'static str);

/// Fail unless the CPU supports SSE4.1
pub fn check_sse41() -> Result<(), MissingCpuFeature> {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if std::arch::is_x86_feature_detected!("sse4.1") {
            return Ok(());
        }
    }
    Err(MissingCpuFeature("SSE4.1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_arch = "x86_64")]
    fn test_sse41_matches_runtime_detection() {
        assert_eq!(check_sse41().is_ok(), std::arch::is_x86_feature_detected!("sse4.1"));
    }

    #[test]
    fn test_message_names_feature() {
        assert!(MissingCpuFeature("SSE4.1").to_string().contains("SSE4.1"));
    }
}
