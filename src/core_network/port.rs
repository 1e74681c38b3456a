use crate::constants::{reply, MIN_DATA_PORT};
use crate::session::{Session, SessionFlow};
use log::{info, warn};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PortError {
    #[error("expected 6 comma-separated fields, got {0}")]
    FieldCount(usize),

    #[error("field is not a number: {0:?}")]
    InvalidNumber(String),

    #[error("field out of range 0-255: {0}")]
    OutOfRange(u32),

    #[error("port {0} is below 1024")]
    PrivilegedPort(u16),
}

impl PortError {
    pub fn to_ftp_response(&self) -> &'static str {
        match self {
            PortError::FieldCount(_) | PortError::InvalidNumber(_) => {
                "Syntax error in PORT command."
            }
            PortError::OutOfRange(_) => "Invalid PORT parameters.",
            PortError::PrivilegedPort(_) => "Port must be >= 1024.",
        }
    }
}

/// Parses `a1,a2,a3,a4,p1,p2` and returns `p1 * 256 + p2`.
///
/// The address octets are validated and then dropped: data connections only
/// ever go to loopback, which rules out bounce attacks.
pub fn parse_port_argument(arg: &str) -> Result<u16, PortError> {
    let parts: Vec<&str> = arg.trim().split(',').collect();
    if parts.len() != 6 {
        return Err(PortError::FieldCount(parts.len()));
    }

    let mut fields = [0u8; 6];
    for (field, part) in fields.iter_mut().zip(&parts) {
        let part = part.trim();
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PortError::InvalidNumber(part.to_string()));
        }
        let value: u32 = part
            .parse()
            .map_err(|_| PortError::InvalidNumber(part.to_string()))?;
        *field = u8::try_from(value).map_err(|_| PortError::OutOfRange(value))?;
    }

    let port = u16::from(fields[4]) << 8 | u16::from(fields[5]);
    if port < MIN_DATA_PORT {
        return Err(PortError::PrivilegedPort(port));
    }

    Ok(port)
}

/// Handles the PORT (Active Mode) FTP command.
///
/// Only records the port; the connection is opened by the next transfer.
pub async fn handle_port_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<SessionFlow, std::io::Error> {
    let Some(arg) = arg else {
        session
            .send_response(
                reply::SYNTAX_ERROR_ARGS,
                "Syntax error: PORT a1,a2,a3,a4,p1,p2",
            )
            .await?;
        return Ok(SessionFlow::Continue);
    };

    match parse_port_argument(arg) {
        Ok(port) => {
            info!("Session {}: data port set to {}", session.id, port);
            session.data.set_pending_port(port);
            session
                .send_response(reply::COMMAND_OK, "PORT command successful.")
                .await?;
        }
        Err(e) => {
            warn!("Session {}: rejected PORT {:?}: {}", session.id, arg, e);
            session
                .send_response(reply::SYNTAX_ERROR_ARGS, e.to_ftp_response())
                .await?;
        }
    }

    Ok(SessionFlow::Continue)
}
