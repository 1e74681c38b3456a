use crate::constants::reply;
use crate::session::{Session, SessionFlow};
use log::info;

/// Handles the QUIT FTP command. Always ends the session.
pub async fn handle_quit_command(
    session: &mut Session,
    _arg: Option<&str>,
) -> Result<SessionFlow, std::io::Error> {
    info!("Session {}: received QUIT, closing connection", session.id);
    session
        .send_response(reply::CLOSING_CONTROL, "Goodbye.")
        .await?;
    Ok(SessionFlow::Disconnect)
}
