use std::str::FromStr;

use thiserror::Error;

/// One discrete vehicle command requested per invocation.
///
/// The set is closed: dispatch is exhaustive over this enum, so adding a
/// variant forces every match site to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Preflight-check, arm and climb to the requested altitude.
    Takeoff,
    /// Hold, then descend and land at the current position.
    Land,
    /// Hold, then fly back to the launch position.
    ReturnRtl,
    /// Loiter at the current position.
    Hold,
    /// Immediate flight termination. Irreversible, no safety gate.
    KillTerminate,
    /// Diagnostic arm/disarm round-trip.
    Test,
    /// Reboot the flight controller.
    RebootFc,
    /// Reboot the companion host OS.
    RebootSys,
    /// Write the hardware id into the vehicle's system-id parameter and
    /// reboot the flight controller so it takes effect.
    InitSysid,
    /// Apply the shared parameter table from the common-parameters file.
    ApplyCommonParams,
    /// Pull the latest code via the external update script. No bridge or
    /// vehicle interaction.
    UpdateCode,
}

#[derive(Debug, Error)]
#[error("unknown action: {0}")]
pub struct ActionParseError(pub String);

impl Action {
    /// Short stable identifier for logs, matching the CLI spelling.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Takeoff => "takeoff",
            Action::Land => "land",
            Action::ReturnRtl => "return_rtl",
            Action::Hold => "hold",
            Action::KillTerminate => "kill_terminate",
            Action::Test => "test",
            Action::RebootFc => "reboot_fc",
            Action::RebootSys => "reboot_sys",
            Action::InitSysid => "init_sysid",
            Action::ApplyCommonParams => "apply_common_params",
            Action::UpdateCode => "update_code",
        }
    }

    /// Returns `true` if the action needs a resolved hardware identity.
    ///
    /// Everything except `update_code` does: `init_sysid` writes the id to
    /// the vehicle, all other vehicle actions look their config row up by it.
    pub fn needs_identity(&self) -> bool {
        !matches!(self, Action::UpdateCode)
    }

    /// Returns `true` if the action needs a resolved config row.
    ///
    /// `init_sysid` runs before a config row for the airframe exists, and
    /// `update_code` touches nothing but the working copy.
    pub fn needs_config(&self) -> bool {
        !matches!(self, Action::UpdateCode | Action::InitSysid)
    }
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "takeoff" => Ok(Action::Takeoff),
            "land" => Ok(Action::Land),
            "return_rtl" => Ok(Action::ReturnRtl),
            "hold" => Ok(Action::Hold),
            "kill_terminate" => Ok(Action::KillTerminate),
            "test" => Ok(Action::Test),
            "reboot_fc" => Ok(Action::RebootFc),
            "reboot_sys" => Ok(Action::RebootSys),
            "init_sysid" => Ok(Action::InitSysid),
            "apply_common_params" => Ok(Action::ApplyCommonParams),
            "update_code" => Ok(Action::UpdateCode),
            _ => Err(ActionParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_from_str() {
        let all = [
            Action::Takeoff,
            Action::Land,
            Action::ReturnRtl,
            Action::Hold,
            Action::KillTerminate,
            Action::Test,
            Action::RebootFc,
            Action::RebootSys,
            Action::InitSysid,
            Action::ApplyCommonParams,
            Action::UpdateCode,
        ];
        for action in all {
            assert_eq!(action.kind().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        assert_eq!(" Takeoff ".parse::<Action>().unwrap(), Action::Takeoff);
        assert_eq!("RETURN_RTL".parse::<Action>().unwrap(), Action::ReturnRtl);
    }

    #[test]
    fn unknown_identifier_is_an_error() {
        let err = "explode".parse::<Action>().unwrap_err();
        assert!(err.to_string().contains("explode"));
    }

    #[test]
    fn prerequisites() {
        assert!(!Action::UpdateCode.needs_identity());
        assert!(!Action::UpdateCode.needs_config());

        assert!(Action::InitSysid.needs_identity());
        assert!(!Action::InitSysid.needs_config());

        assert!(Action::Hold.needs_identity());
        assert!(Action::Hold.needs_config());
    }
}
