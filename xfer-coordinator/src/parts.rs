//! The multipart part-size algorithm. Reproduced exactly so independently
//! written clients can predict part boundaries from `fileSize` alone.

use xfer_core::config::UploadLimits;
use xfer_core::{XferError, XferResult};

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    pub part_size: u64,
    pub num_parts: u32,
}

/// Whether a plan should use a single PUT or a multipart session.
pub fn use_multipart(file_size: u64, limits: &UploadLimits) -> bool {
    file_size > limits.multipart_threshold
}

/// Computes `(part_size, num_parts)` for a multipart upload of `file_size`
/// bytes. Fails with `FileTooLarge` if no part size under `max_part_size`
/// can cover the file within `max_parts` parts.
pub fn plan_parts(file_size: u64, limits: &UploadLimits) -> XferResult<PartPlan> {
    let mut part_size = limits.default_part_size;
    let mut num_parts = div_ceil(file_size, part_size);

    if num_parts > limits.max_parts as u64 {
        part_size = div_ceil(file_size, limits.max_parts as u64);
        if part_size > limits.max_part_size {
            return Err(XferError::file_too_large(
                "file exceeds the maximum size representable within the part-count limit",
            ));
        }
        part_size = round_up_to_mib(part_size);
        num_parts = div_ceil(file_size, part_size);
    }

    Ok(PartPlan {
        part_size,
        num_parts: num_parts as u32,
    })
}

/// The byte range `[start, end)` part number `part_number` (1-indexed) covers.
pub fn part_range(plan: &PartPlan, file_size: u64, part_number: u32) -> (u64, u64) {
    let start = (part_number as u64 - 1) * plan.part_size;
    let end = (start + plan.part_size).min(file_size);
    (start, end)
}

fn div_ceil(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}

fn round_up_to_mib(bytes: u64) -> u64 {
    div_ceil(bytes, MIB) * MIB
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> UploadLimits {
        UploadLimits::default()
    }

    #[test]
    fn small_file_uses_default_part_size() {
        let l = limits();
        let plan = plan_parts(100 * 1024 * 1024, &l).unwrap();
        assert_eq!(plan.part_size, l.default_part_size);
        assert_eq!(plan.num_parts, 13);
    }

    #[test]
    fn exceeding_max_parts_grows_part_size_and_rounds_to_mib() {
        let l = limits();
        let file_size = l.default_part_size * (l.max_parts as u64) + 1;
        let plan = plan_parts(file_size, &l).unwrap();
        assert!(plan.part_size > l.default_part_size);
        assert_eq!(plan.part_size % MIB, 0);
        assert!(plan.num_parts <= l.max_parts);
    }

    #[test]
    fn file_too_large_is_rejected() {
        let l = limits();
        let file_size = l.max_part_size * (l.max_parts as u64) + 1;
        let err = plan_parts(file_size, &l).unwrap_err();
        assert_eq!(err.kind, xfer_core::ErrorKind::FileTooLarge);
    }

    #[test]
    fn boundary_at_multipart_threshold() {
        let l = limits();
        assert!(!use_multipart(l.multipart_threshold, &l));
        assert!(use_multipart(l.multipart_threshold + 1, &l));
    }

    #[test]
    fn non_final_parts_are_equal_size() {
        let l = limits();
        let file_size = 25 * MIB;
        let plan = plan_parts(file_size, &l).unwrap();
        for pn in 1..plan.num_parts {
            let (start, end) = part_range(&plan, file_size, pn);
            assert_eq!(end - start, plan.part_size);
        }
        let (start, end) = part_range(&plan, file_size, plan.num_parts);
        assert!(end - start <= plan.part_size);
        assert_eq!(end, file_size);
    }
}
