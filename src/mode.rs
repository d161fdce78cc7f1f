//! Session mode and suite-level mode selection.

use std::env;

/// Whether a session issues real calls or replays a cassette.
///
/// Fixed for the lifetime of one session; a session never switches modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Issue real calls and capture every call/response pair.
    Record,
    /// Serve responses from a previously recorded cassette, in order.
    Mock,
}

/// Outcome of suite-level mode selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeSelection {
    /// Run sessions in the given mode.
    Run(Mode),
    /// Recording was requested but cannot proceed; skip the whole run.
    Skip(String),
}

/// Picks the session mode for a test run.
///
/// Without `record_requested` this is always [`Mode::Mock`] — cassettes are
/// the default source of truth. With it, at least one of `credential_vars`
/// must be set to a non-empty value (a `.env` file is honored via dotenvy);
/// otherwise the run should be skipped rather than failed, since a missing
/// credential is an environment condition, not a test failure.
#[must_use]
pub fn select_mode(record_requested: bool, credential_vars: &[&str]) -> ModeSelection {
    if !record_requested {
        return ModeSelection::Run(Mode::Mock);
    }
    dotenvy::dotenv().ok();
    let available =
        credential_vars.iter().any(|var| env::var(var).is_ok_and(|v| !v.is_empty()));
    if available {
        ModeSelection::Run(Mode::Record)
    } else {
        ModeSelection::Skip(format!(
            "record mode requires one of: {}",
            credential_vars.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{select_mode, Mode, ModeSelection};

    #[test]
    fn defaults_to_mock_when_record_not_requested() {
        let selection = select_mode(false, &["TAPEDECK_TEST_UNSET_VAR"]);
        assert_eq!(selection, ModeSelection::Run(Mode::Mock));
    }

    #[test]
    fn records_when_credential_present() {
        std::env::set_var("TAPEDECK_TEST_CRED_PRESENT", "sk-not-a-real-key");
        let selection = select_mode(true, &["TAPEDECK_TEST_CRED_PRESENT"]);
        assert_eq!(selection, ModeSelection::Run(Mode::Record));
        std::env::remove_var("TAPEDECK_TEST_CRED_PRESENT");
    }

    #[test]
    fn skips_when_credential_missing() {
        let selection =
            select_mode(true, &["TAPEDECK_TEST_CRED_MISSING_A", "TAPEDECK_TEST_CRED_MISSING_B"]);
        match selection {
            ModeSelection::Skip(reason) => {
                assert!(reason.contains("TAPEDECK_TEST_CRED_MISSING_A"));
                assert!(reason.contains("TAPEDECK_TEST_CRED_MISSING_B"));
            }
            other => panic!("expected Skip, got {other:?}"),
        }
    }

    #[test]
    fn empty_credential_counts_as_missing() {
        std::env::set_var("TAPEDECK_TEST_CRED_EMPTY", "");
        let selection = select_mode(true, &["TAPEDECK_TEST_CRED_EMPTY"]);
        assert!(matches!(selection, ModeSelection::Skip(_)));
        std::env::remove_var("TAPEDECK_TEST_CRED_EMPTY");
    }
}
