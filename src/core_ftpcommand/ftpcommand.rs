#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub enum FtpCommand {
    USER,
    QUIT,
    PORT,
    STOR,
    RETR,
    LIST,
    MKD,
    PWD,
    CWD,
    TYPE,
    SYST,
    NOOP,
}

impl FtpCommand {
    pub fn from_str(cmd: &str) -> Option<FtpCommand> {
        match cmd.to_ascii_uppercase().as_str() {
            "USER" => Some(FtpCommand::USER),
            "QUIT" => Some(FtpCommand::QUIT),
            "PORT" => Some(FtpCommand::PORT),
            "STOR" => Some(FtpCommand::STOR),
            "RETR" => Some(FtpCommand::RETR),
            "LIST" => Some(FtpCommand::LIST),
            "MKD" => Some(FtpCommand::MKD),
            "PWD" => Some(FtpCommand::PWD),
            "CWD" => Some(FtpCommand::CWD),
            "TYPE" => Some(FtpCommand::TYPE),
            "SYST" => Some(FtpCommand::SYST),
            "NOOP" => Some(FtpCommand::NOOP),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FtpCommand::USER => "USER",
            FtpCommand::QUIT => "QUIT",
            FtpCommand::PORT => "PORT",
            FtpCommand::STOR => "STOR",
            FtpCommand::RETR => "RETR",
            FtpCommand::LIST => "LIST",
            FtpCommand::MKD => "MKD",
            FtpCommand::PWD => "PWD",
            FtpCommand::CWD => "CWD",
            FtpCommand::TYPE => "TYPE",
            FtpCommand::SYST => "SYST",
            FtpCommand::NOOP => "NOOP",
        }
    }
}
