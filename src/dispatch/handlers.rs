//! Command handlers
//!
//! Arity has already been checked by the dispatcher. Handlers validate the
//! shape of their arguments before touching the keyspace.

use std::time::Duration;

use super::Dispatcher;
use crate::error::CommandError;
use crate::protocol::ProtocolValue;

pub(crate) fn handle_ping(_: &Dispatcher, _args: &[String]) -> Result<ProtocolValue, CommandError> {
    Ok(ProtocolValue::bulk("PONG"))
}

pub(crate) fn handle_echo(_: &Dispatcher, args: &[String]) -> Result<ProtocolValue, CommandError> {
    Ok(ProtocolValue::bulk(args[0].clone()))
}

/// `SET key value [PX millis]`
pub(crate) fn handle_set(
    dispatcher: &Dispatcher,
    args: &[String],
) -> Result<ProtocolValue, CommandError> {
    let ttl = match &args[2..] {
        [] => None,
        [option, millis] if option.eq_ignore_ascii_case("PX") => Some(parse_px(millis)?),
        [option, ..] => {
            return Err(CommandError::Syntax {
                command: "SET",
                reason: format!("unsupported option clause starting at '{}'", option),
            })
        }
    };

    dispatcher
        .keyspace()
        .set(args[0].clone(), args[1].clone(), ttl);
    Ok(ProtocolValue::simple("OK"))
}

fn parse_px(millis: &str) -> Result<Duration, CommandError> {
    match millis.parse::<u64>() {
        Ok(0) | Err(_) => Err(CommandError::Syntax {
            command: "SET",
            reason: format!("invalid expire time '{}'", millis),
        }),
        Ok(ms) => Ok(Duration::from_millis(ms)),
    }
}

pub(crate) fn handle_get(
    dispatcher: &Dispatcher,
    args: &[String],
) -> Result<ProtocolValue, CommandError> {
    Ok(match dispatcher.keyspace().get(&args[0]) {
        Some(value) => ProtocolValue::bulk(value),
        None => ProtocolValue::null_bulk(),
    })
}

/// `INFO [replication]`
pub(crate) fn handle_info(
    dispatcher: &Dispatcher,
    args: &[String],
) -> Result<ProtocolValue, CommandError> {
    match args {
        [] => {}
        [section] if section.eq_ignore_ascii_case("replication") => {}
        _ => {
            return Err(CommandError::Syntax {
                command: "INFO",
                reason: format!("unsupported section '{}'", args.join(" ")),
            })
        }
    }

    Ok(ProtocolValue::bulk(dispatcher.identity().info_replication()))
}

/// `REPLCONF key value [key value ...]`
///
/// Options are acknowledged but not validated. The registry arity
/// guarantees at least one key/value pair.
pub(crate) fn handle_replconf(
    _: &Dispatcher,
    _args: &[String],
) -> Result<ProtocolValue, CommandError> {
    Ok(ProtocolValue::simple("OK"))
}
