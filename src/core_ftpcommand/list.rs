use crate::constants::reply;
use crate::core_path::resolve_client_path;
use crate::session::{Session, SessionFlow};
use chrono::{Local, TimeZone};
use log::{debug, error, info, warn};
use std::ffi::CStr;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use tokio::fs;

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;
const S_IFLNK: u32 = 0o120000;

/// Handles the LIST FTP command.
///
/// Lists the argument directory, or the current one when the argument is
/// missing, an `ls` option, or cannot be resolved. Each entry is sent as one
/// `ls -l` style line.
pub async fn handle_list_command(
    session: &mut Session,
    arg: Option<&str>,
) -> Result<SessionFlow, std::io::Error> {
    if session.data.pending_port().is_none() {
        session
            .send_response(reply::CANT_OPEN_DATA_CONNECTION, "Use PORT first.")
            .await?;
        return Ok(SessionFlow::Continue);
    }

    let arg = arg.filter(|arg| !arg.starts_with('-'));
    let dir_path = resolve_client_path(&session.cwd, session.root(), arg)
        .await
        .unwrap_or_else(|_| session.cwd.clone());

    let mut entries = match fs::read_dir(&dir_path).await {
        Ok(entries) => entries,
        Err(e) => {
            error!("Error reading directory {:?}: {}", dir_path, e);
            session
                .send_response(reply::FILE_UNAVAILABLE, "Failed to open directory.")
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
            "Opening ASCII mode data connection.",
        )
        .await
    {
        session.data.close().await;
        return Err(e);
    }

    let mut sent = 0usize;
    let mut failed = false;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read directory entry in {:?}: {}", dir_path, e);
                break;
            }
        };

        let metadata = match fs::symlink_metadata(entry.path()).await {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Skipping {:?}: {}", entry.path(), e);
                continue;
            }
        };

        let line = format_dir_entry(&entry.file_name().to_string_lossy(), &metadata);
        if let Err(e) = session.data.send(line.as_bytes()).await {
            error!("Failed to send directory listing: {}", e);
            failed = true;
            break;
        }
        sent += 1;
    }

    session.data.close().await;

    if failed {
        session
            .send_response(reply::TRANSFER_ABORTED, "Transfer aborted.")
            .await?;
    } else {
        info!("Directory listing of {:?} sent ({} entries)", dir_path, sent);
        session
            .send_response(reply::TRANSFER_COMPLETE, "Transfer complete.")
            .await?;
    }

    Ok(SessionFlow::Continue)
}

/// Formats one entry as
/// `perms nlink owner group size "Mon DD HH:MM" name` followed by CRLF.
fn format_dir_entry(name: &str, metadata: &Metadata) -> String {
    let owner = user_name(metadata.uid()).unwrap_or_else(|| String::from("?"));
    let group = group_name(metadata.gid()).unwrap_or_else(|| String::from("?"));
    let modified = Local
        .timestamp_opt(metadata.mtime(), 0)
        .single()
        .map(|time| time.format("%b %d %H:%M").to_string())
        .unwrap_or_else(|| String::from("Jan 01 00:00"));

    format!(
        "{} {:>3} {:<8} {:<8} {:>8} {} {}\r\n",
        format_permissions(metadata.mode()),
        metadata.nlink(),
        owner,
        group,
        metadata.size(),
        modified,
        name
    )
}

/// Renders a mode as the ten-character `ls -l` permission string.
fn format_permissions(mode: u32) -> String {
    let mut perms = String::with_capacity(10);
    perms.push(match mode & S_IFMT {
        S_IFDIR => 'd',
        S_IFLNK => 'l',
        _ => '-',
    });
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        perms.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        perms.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        perms.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    perms
}

fn user_name(uid: u32) -> Option<String> {
    let mut buf = vec![0 as libc::c_char; 4096];
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();

    // getpwuid_r writes the strings into `buf`, which outlives `pwd` here.
    let rc = unsafe {
        libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
    };
    if rc != 0 || result.is_null() || pwd.pw_name.is_null() {
        return None;
    }
    let name = unsafe { CStr::from_ptr(pwd.pw_name) };
    Some(name.to_string_lossy().into_owned())
}

fn group_name(gid: u32) -> Option<String> {
    let mut buf = vec![0 as libc::c_char; 4096];
    let mut grp: libc::group = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::group = std::ptr::null_mut();

    let rc = unsafe {
        libc::getgrgid_r(gid, &mut grp, buf.as_mut_ptr(), buf.len(), &mut result)
    };
    if rc != 0 || result.is_null() || grp.gr_name.is_null() {
        return None;
    }
    let name = unsafe { CStr::from_ptr(grp.gr_name) };
    Some(name.to_string_lossy().into_owned())
}
