use crate::constants::reply;
use crate::core_path::resolve_client_path;
use crate::session::{Session, SessionFlow};
use log::{error, info, warn};

/// Handles the STOR (Store File) FTP command.
///
/// Needs a pending PORT. The upload lands at the resolved path, created or
/// truncated, and the data channel is closed whatever the outcome.
pub async fn handle_stor_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<SessionFlow, std::io::Error> {
    let Some(arg) = arg else {
        warn!("STOR command received with no arguments");
        session
            .send_response(reply::SYNTAX_ERROR_ARGS, "Syntax error: STOR <filename>")
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
            warn!("Session {}: STOR {:?} rejected: {}", session.id, arg, e);
            session
                .send_response(reply::FILE_NAME_NOT_ALLOWED, "Invalid filename.")
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
            "Opening BINARY mode data connection.",
        )
        .await
    {
        session.data.close().await;
        return Err(e);
    }

    let transfer = session.data.recv_file(&file_path).await;
    session.data.close().await;

    match transfer {
        Ok(bytes) => {
            info!("File stored successfully: {:?} ({} bytes)", file_path, bytes);
            session
                .send_response(reply::TRANSFER_COMPLETE, "Transfer complete.")
                .await?;
        }
        Err(e) => {
            error!("Upload of {:?} failed: {}", file_path, e);
            session
                .send_response(reply::TRANSFER_ABORTED, "Transfer aborted.")
                .await?;
        }
    }

    Ok(SessionFlow::Continue)
}
