//! The four commands GA front ends send.
//!
//! | command       | output                                 |
//! |---------------|----------------------------------------|
//! | `info`        | reply `{"info":"all",…}`               |
//! | `run-one-gen` | broadcast `{"info":"one-gen",…}`       |
//! | `settings`    | reply `{"info":"settings",…}`          |
//! | `set-setting` | broadcast `{"info":"settings",…}` when the update is accepted |

mod working;

pub use working::WorkingStatus;

use ga_broker::{CommandTable, Responder};
use ga_core::CommandError;
use serde_json::{Value, json};

use crate::state::GaState;

/// `info` command name.
pub const INFO: &str = "info";
/// `run-one-gen` command name.
pub const RUN_ONE_GEN: &str = "run-one-gen";
/// `settings` command name.
pub const SETTINGS: &str = "settings";
/// `set-setting` command name.
pub const SET_SETTING: &str = "set-setting";

/// Install every GA command into `table`.
pub fn register_commands(table: &mut CommandTable<GaState>) {
    let _ = table
        .register(INFO, info)
        .register(RUN_ONE_GEN, run_one_gen)
        .register(SETTINGS, settings)
        .register(SET_SETTING, set_setting);
}

fn info(state: &GaState, _: &Value, out: &Responder) -> Result<(), CommandError> {
    // read before locking so a running generation shows as working
    let status = state.status();
    let data = state.with(|evo| evo.info(status));
    let _ = out.reply(&json!({"info": "all", "data": data}));
    Ok(())
}

fn run_one_gen(state: &GaState, _: &Value, out: &Responder) -> Result<(), CommandError> {
    let (general_stats, gen_stats) = state.with(|evo| {
        let gen_stats = evo.run_one_gen();
        (evo.general_stats(), gen_stats)
    });
    let _ = out.broadcast(&json!({
        "info": "one-gen",
        "data": {"general_stats": general_stats, "gen_stats": gen_stats}
    }));
    Ok(())
}

fn settings(state: &GaState, _: &Value, out: &Responder) -> Result<(), CommandError> {
    let settings = state.with(|evo| evo.settings());
    let _ = out.reply(&json!({"info": "settings", "settings": settings}));
    Ok(())
}

fn set_setting(state: &GaState, payload: &Value, out: &Responder) -> Result<(), CommandError> {
    let updates = payload
        .get("settings")
        .and_then(Value::as_object)
        .ok_or_else(|| CommandError::InvalidPayload("'settings' must be an object".into()))?;
    let settings = state.with(|evo| {
        let _ = evo.apply_settings(updates)?;
        Ok::<_, CommandError>(evo.settings())
    })?;
    let _ = out.broadcast(&json!({"info": "settings", "settings": settings}));
    Ok(())
}
