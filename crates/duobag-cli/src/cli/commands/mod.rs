use super::args::{Cli, Command};
use crate::config::CliConfig;

pub mod create;
pub mod digest;
pub mod show;
pub mod verify;

pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = CliConfig::load(cli.config.as_deref())?;
    match cli.cmd {
        Command::Create(args) => create::run(args, &config),
        Command::Show(args) => show::run(args, &config),
        Command::Verify(args) => verify::run(args, &config),
        Command::Digest(args) => digest::run(args, &config),
    }
}
