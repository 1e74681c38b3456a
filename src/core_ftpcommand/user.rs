use crate::constants::{reply, USERNAME_MAX};
use crate::session::{Session, SessionFlow};
use log::info;

/// Handles the USER FTP command.
///
/// There is no password step: any non-empty name logs the client in and
/// moves it back to the server root. Every user shares that same root.
pub async fn handle_user_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<SessionFlow, std::io::Error> {
    let Some(username) = arg else {
        session
            .send_response(reply::SYNTAX_ERROR_ARGS, "Syntax error: USER <username>")
            .await?;
        return Ok(SessionFlow::Continue);
    };

    let username = truncate_username(username).to_string();
    session.cwd = session.root().to_path_buf();
    session.is_authenticated = true;
    session.username = Some(username.clone());

    info!("User {} logged in from {}", username, session.peer);
    session
        .send_response(reply::LOGGED_IN, &format!("User {} logged in.", username))
        .await?;

    Ok(SessionFlow::Continue)
}

/// Caps a username at `USERNAME_MAX - 1` bytes without splitting a character.
fn truncate_username(username: &str) -> &str {
    let max = USERNAME_MAX - 1;
    if username.len() <= max {
        return username;
    }
    let mut end = max;
    while !username.is_char_boundary(end) {
        end -= 1;
    }
    &username[..end]
}
