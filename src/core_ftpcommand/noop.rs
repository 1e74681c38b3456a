use crate::constants::reply;
use crate::session::{Session, SessionFlow};

pub async fn handle_noop_command(
    session: &mut Session,
    _arg: Option<&str>,
) -> Result<SessionFlow, std::io::Error> {
    session.send_response(reply::COMMAND_OK, "NOOP ok.").await?;
    Ok(SessionFlow::Continue)
}
