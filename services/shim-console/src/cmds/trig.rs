//! Trigger engine commands.

use shim_hal::ShimError;

use super::{CommonEnv, Request};

pub fn exec(request: Request, env: &mut CommonEnv) -> Result<Option<String>, ShimError> {
    match request {
        Request::TrigSyncCh => {
            env.shim.trig_sync_ch()?;
            Ok(Some("Trigger synchronize channels command sent.".into()))
        }
        Request::TrigForce => {
            env.shim.trig_force()?;
            Ok(Some("Trigger force trigger command sent.".into()))
        }
        Request::TrigCancel => {
            env.shim.trig_cancel()?;
            Ok(Some("Trigger cancel command sent.".into()))
        }
        Request::TrigSetLockout(cycles) => {
            env.shim.trig_set_lockout(cycles)?;
            Ok(Some(format!("Trigger set lockout command sent with {} cycles.", cycles)))
        }
        Request::TrigDelay(cycles) => {
            env.shim.trig_delay(cycles)?;
            Ok(Some(format!("Trigger delay command sent with {} cycles.", cycles)))
        }
        Request::TrigExpectExt(count) => {
            env.shim.trig_expect_ext(count)?;
            Ok(Some(format!("Trigger expect external command sent with count {}.", count)))
        }
        other => unreachable!("not a trigger request: {:?}", other),
    }
}
