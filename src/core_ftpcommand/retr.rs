use crate::constants::reply;
use crate::core_path::resolve_client_path;
use crate::session::{Session, SessionFlow};
use log::{error, info, warn};
use tokio::fs;

/// Handles the RETR (Retrieve) FTP command.
///
/// Only existing regular files inside the root can be retrieved. The 150
/// reply carries the file size in bytes.
pub async fn handle_retr_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<SessionFlow, std::io::Error> {
    let Some(arg) = arg else {
        warn!("RETR command received with no arguments");
        session
            .send_response(reply::SYNTAX_ERROR_ARGS, "Syntax error: RETR <filename>")
            .await?;
        return Ok(SessionFlow::Continue);
    };

    if session.data.pending_port().is_none() {
        session
            .send_response(reply::CANT_OPEN_DATA_CONNECTION, "Use PORT first.")
            .await?;
        return Ok(SessionFlow::Continue);
    }

    let file_path = match resolve_client_path(&session.cwd, session.root(), Some(arg)).await {
        Ok(path) => path,
        Err(e) => {
            warn!("Session {}: RETR {:?} rejected: {}", session.id, arg, e);
            session
                .send_response(reply::FILE_UNAVAILABLE, "File not found.")
                .await?;
            return Ok(SessionFlow::Continue);
        }
    };

    let size = match fs::metadata(&file_path).await {
        Ok(metadata) if metadata.is_file() => metadata.len(),
        _ => {
            session
                .send_response(
                    reply::FILE_UNAVAILABLE,
                    "File not found or not a regular file.",
                )
                .await?;
            return Ok(SessionFlow::Continue);
        }
    };

    if session.data.connect().await.is_err() {
        session
            .send_response(reply::CANT_OPEN_DATA_CONNECTION, "Can't open data connection.")
            .await?;
        return Ok(SessionFlow::Continue);
    }

    if let Err(e) = session
        .send_response(
            reply::OPENING_DATA_CONNECTION,
            &format!("Opening BINARY mode data connection ({} bytes).", size),
        )
        .await
    {
        session.data.close().await;
        return Err(e);
    }

    info!("Sending file: {:?}", file_path);
    let transfer = session.data.send_file(&file_path).await;
    session.data.close().await;

    match transfer {
        Ok(bytes) => {
            info!("File transfer completed successfully: {:?} ({} bytes)", file_path, bytes);
            session
                .send_response(reply::TRANSFER_COMPLETE, "Transfer complete.")
                .await?;
        }
        Err(e) => {
            error!("Error sending file {:?} to client: {}", file_path, e);
            session
                .send_response(reply::TRANSFER_ABORTED, "Transfer aborted.")
                .await?;
        }
    }

    Ok(SessionFlow::Continue)
}
