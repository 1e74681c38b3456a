use crate::constants::reply;
use crate::session::{Session, SessionFlow};
use log::debug;

/// Handles the TYPE FTP command.
///
/// Transfers are always binary, so whatever type is requested the reply
/// confirms image mode.
pub async fn handle_type_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<SessionFlow, std::io::Error> {
    debug!("Session {}: TYPE {:?} treated as binary", session.id, arg);
    session
        .send_response(reply::COMMAND_OK, "Type set to I (binary).")
        .await?;
    Ok(SessionFlow::Continue)
}
