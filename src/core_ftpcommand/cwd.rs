use crate::constants::reply;
use crate::core_path::resolve_client_path;
use crate::session::{Session, SessionFlow};
use log::{info, warn};
use tokio::fs;

pub async fn handle_cwd_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<SessionFlow, std::io::Error> {
    let Some(arg) = arg else {
        session
            .send_response(reply::SYNTAX_ERROR_ARGS, "Syntax error: CWD <path>")
            .await?;
        return Ok(SessionFlow::Continue);
    };

    let new_dir = match resolve_client_path(&session.cwd, session.root(), Some(arg)).await {
        Ok(path) => path,
        Err(e) => {
            warn!("Session {}: CWD {:?} rejected: {}", session.id, arg, e);
            session
                .send_response(reply::FILE_UNAVAILABLE, "Failed to change directory.")
                .await?;
            return Ok(SessionFlow::Continue);
        }
    };

    match fs::metadata(&new_dir).await {
        Ok(metadata) if metadata.is_dir() => {
            info!("Session {}: directory changed to {:?}", session.id, new_dir);
            session.cwd = new_dir;
            session
                .send_response(reply::FILE_ACTION_OK, "Directory changed.")
                .await?;
        }
        _ => {
            warn!("Session {}: not a directory: {:?}", session.id, new_dir);
            session
                .send_response(reply::FILE_UNAVAILABLE, "Not a directory.")
                .await?;
        }
    }

    Ok(SessionFlow::Continue)
}
