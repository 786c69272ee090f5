pub mod identity;
pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const CMD_SEND_LINK: &str = "send-link";
pub const CMD_COMPLETE: &str = "complete";
pub const CMD_STATUS: &str = "status";
pub const CMD_SIGN_OUT: &str = "sign-out";

pub const ARG_EMAIL: &str = "email";
pub const ARG_LINK: &str = "link";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("magiclink")
        .about("Passwordless sign-in via email magic links")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CMD_SEND_LINK)
                .about("Email a one-time sign-in link and remember the address on this device")
                .arg(
                    Arg::new(ARG_EMAIL)
                        .short('e')
                        .long(ARG_EMAIL)
                        .help("Address to send the sign-in link to")
                        .env("MAGICLINK_EMAIL")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new(CMD_COMPLETE)
                .about("Finish signing in with the link received by email")
                .arg(
                    Arg::new(ARG_LINK)
                        .short('l')
                        .long(ARG_LINK)
                        .help("The full sign-in link from the email")
                        .required(true),
                )
                .arg(
                    Arg::new(ARG_EMAIL)
                        .short('e')
                        .long(ARG_EMAIL)
                        .help("Address the link was sent to (defaults to the one remembered on this device)"),
                ),
        )
        .subcommand(Command::new(CMD_STATUS).about("Show the screen for the current session"))
        .subcommand(Command::new(CMD_SIGN_OUT).about("Forget the session on this device"));

    let command = identity::with_args(command);
    logging::with_args(command)
}
