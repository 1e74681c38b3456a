use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::{cwd, list, mkd, noop, pwd, quit, retr, stor, syst, type_, user};
use crate::core_network::port;
use crate::session::{Session, SessionFlow};
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::pin::Pin;

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = io::Result<SessionFlow>> + Send + 'a>>;

/// A command handler: sends exactly one primary reply (a 150 may precede it
/// on transfers) and tells the session whether to keep going.
pub type CommandHandler = for<'a> fn(&'a mut Session, Option<&'a str>) -> HandlerFuture<'a>;

#[derive(Clone, Copy)]
pub struct CommandEntry {
    pub command: FtpCommand,
    pub handler: CommandHandler,
    pub requires_auth: bool,
}

/// Verb lookup table, built once when the server is initialized.
pub struct CommandTable {
    entries: HashMap<FtpCommand, CommandEntry>,
}

impl CommandTable {
    pub fn get(&self, command: FtpCommand) -> Option<&CommandEntry> {
        self.entries.get(&command)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn insert(&mut self, command: FtpCommand, requires_auth: bool, handler: CommandHandler) {
        self.entries.insert(
            command,
            CommandEntry {
                command,
                handler,
                requires_auth,
            },
        );
    }
}

pub fn initialize_command_handlers() -> CommandTable {
    let mut handlers = CommandTable {
        entries: HashMap::new(),
    };

    handlers.insert(FtpCommand::USER, false, |session, arg| {
        Box::pin(user::handle_user_command(session, arg))
    });

    handlers.insert(FtpCommand::QUIT, false, |session, arg| {
        Box::pin(quit::handle_quit_command(session, arg))
    });

    handlers.insert(FtpCommand::PORT, true, |session, arg| {
        Box::pin(port::handle_port_command(session, arg))
    });

    handlers.insert(FtpCommand::STOR, true, |session, arg| {
        Box::pin(stor::handle_stor_command(session, arg))
    });

    handlers.insert(FtpCommand::RETR, true, |session, arg| {
        Box::pin(retr::handle_retr_command(session, arg))
    });

    handlers.insert(FtpCommand::LIST, true, |session, arg| {
        Box::pin(list::handle_list_command(session, arg))
    });

    handlers.insert(FtpCommand::MKD, true, |session, arg| {
        Box::pin(mkd::handle_mkd_command(session, arg))
    });

    handlers.insert(FtpCommand::PWD, true, |session, arg| {
        Box::pin(pwd::handle_pwd_command(session, arg))
    });

    handlers.insert(FtpCommand::CWD, true, |session, arg| {
        Box::pin(cwd::handle_cwd_command(session, arg))
    });

    handlers.insert(FtpCommand::TYPE, true, |session, arg| {
        Box::pin(type_::handle_type_command(session, arg))
    });

    handlers.insert(FtpCommand::SYST, false, |session, arg| {
        Box::pin(syst::handle_syst_command(session, arg))
    });

    handlers.insert(FtpCommand::NOOP, false, |session, arg| {
        Box::pin(noop::handle_noop_command(session, arg))
    });

    handlers
}
