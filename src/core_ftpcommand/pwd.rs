// src/core_ftpcommand/pwd.rs
use crate::constants::reply;
use crate::core_path::to_display_path;
use crate::session::{Session, SessionFlow};

pub async fn handle_pwd_command(
    session: &mut Session,
    _arg: Option<&str>,
) -> Result<SessionFlow, std::io::Error> {
    let display = to_display_path(&session.cwd, session.root()).unwrap_or_else(|| String::from("/"));
    let response = format!("\"{}\" is current directory.", display);

    session.send_response(reply::PATH_CREATED, &response).await?;
    Ok(SessionFlow::Continue)
}
