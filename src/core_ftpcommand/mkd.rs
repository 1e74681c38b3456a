use crate::constants::reply;
use crate::core_path::{resolve_client_path, to_display_path};
use crate::session::{Session, SessionFlow};
use log::{error, info, warn};
use std::io::ErrorKind;
use tokio::fs::DirBuilder;

/// Handles the MKD (Make Directory) FTP command.
///
/// The target is resolved like any other client path, created with mode
/// 0755, and reported back in its root-relative form.
pub async fn handle_mkd_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<SessionFlow, std::io::Error> {
    let Some(arg) = arg else {
        session
            .send_response(reply::SYNTAX_ERROR_ARGS, "Syntax error: MKD <dirname>")
            .await?;
        return Ok(SessionFlow::Continue);
    };

    let dir_path = match resolve_client_path(&session.cwd, session.root(), Some(arg)).await {
        Ok(path) => path,
        Err(e) => {
            warn!("Session {}: MKD {:?} rejected: {}", session.id, arg, e);
            session
                .send_response(reply::FILE_NAME_NOT_ALLOWED, "Invalid directory name.")
                .await?;
            return Ok(SessionFlow::Continue);
        }
    };

    match DirBuilder::new().mode(0o755).create(&dir_path).await {
        Ok(()) => {
            info!("Directory created successfully: {:?}", dir_path);
            let display = to_display_path(&dir_path, session.root())
                .unwrap_or_else(|| arg.to_string());
            session
                .send_response(
                    reply::PATH_CREATED,
                    &format!("\"{}\" directory created.", display),
                )
                .await?;
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            warn!("Directory already exists: {:?}", dir_path);
            session
                .send_response(reply::FILE_UNAVAILABLE, "Directory already exists.")
                .await?;
        }
        Err(e) => {
            error!("Failed to create directory: {:?}, error: {}", dir_path, e);
            session
                .send_response(reply::FILE_UNAVAILABLE, &format!("mkdir failed: {}", e))
                .await?;
        }
    }

    Ok(SessionFlow::Continue)
}
