//! Parameter application engine.

use tracing::{error, info};

use uav_model::{ParamValue, parse_param_value};
use uav_vehicle::Vehicle;

use crate::outcome::Outcome;

/// Applies a batch of named parameter values, best-effort.
///
/// Each entry is classified and parsed, then written with the
/// type-appropriate set call. A malformed value or a remote failure marks
/// the outcome and the batch moves on; there is no early abort. Every
/// well-formed entry produces exactly one remote set attempt.
///
/// Returns whether the whole batch succeeded.
pub async fn apply_batch(
    vehicle: &dyn Vehicle,
    entries: &[(String, String)],
    outcome: &Outcome,
) -> bool {
    let mut all_ok = true;
    for (name, raw) in entries {
        let value = match parse_param_value(name, raw) {
            Ok(value) => value,
            Err(e) => {
                error!(target: "uav.params", "{e}");
                outcome.fail();
                all_ok = false;
                continue;
            }
        };

        let result = match value {
            ParamValue::Int(v) => match i32::try_from(v) {
                Ok(v) => vehicle.set_param_int(name, v).await,
                Err(_) => {
                    error!(target: "uav.params", %name, value = v, "int parameter out of range");
                    outcome.fail();
                    all_ok = false;
                    continue;
                }
            },
            ParamValue::Float(v) => vehicle.set_param_float(name, v as f32).await,
        };

        match result {
            Ok(()) => info!(target: "uav.params", %name, value = ?value, "parameter set"),
            Err(e) => {
                error!(target: "uav.params", %name, "setting parameter failed: {e}");
                outcome.fail();
                all_ok = false;
            }
        }
    }
    all_ok
}
