use crate::constants::{reply, SYSTEM_TYPE};
use crate::session::{Session, SessionFlow};

/// Handles the SYST (System) FTP command.
pub async fn handle_syst_command(
    session: &mut Session,
    _arg: Option<&str>,
) -> Result<SessionFlow, std::io::Error> {
    session
        .send_response(reply::SYSTEM_TYPE, SYSTEM_TYPE)
        .await?;
    Ok(SessionFlow::Continue)
}
