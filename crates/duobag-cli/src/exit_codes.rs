//! Process exit codes. Part of the CLI contract.

use duobag_core::BagError;

pub const SUCCESS: i32 = 0;
/// The bag loaded but at least one entry failed fixity checks.
pub const VERIFY_FAILED: i32 = 1;
/// Bad arguments, config or plan.
pub const USAGE_ERROR: i32 = 2;

/// Exit code for a failed command: the library's code when a `BagError` is
/// in the chain, otherwise a usage error.
pub fn for_error(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<BagError>())
        .map_or(USAGE_ERROR, BagError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_bag_error_code_survives_context() {
        let err = Err::<(), _>(BagError::DuplicatePath {
            path: "data/final/a.pdf".into(),
        })
        .context("failed to write bag")
        .unwrap_err();
        assert_eq!(for_error(&err), 5);
    }

    #[test]
    fn test_other_errors_are_usage_errors() {
        assert_eq!(for_error(&anyhow::anyhow!("bad plan")), USAGE_ERROR);
    }
}
