//! Maps validated CLI matches to the action for the selected subcommand.

use crate::cli::{
    actions::{Action, complete, send_link, sign_out, status},
    commands::{
        ARG_EMAIL, ARG_LINK, CMD_COMPLETE, CMD_SEND_LINK, CMD_SIGN_OUT, CMD_STATUS, identity,
    },
    globals::GlobalArgs,
};
use anyhow::{Context, Result, bail};

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let globals = GlobalArgs::from(identity::Options::parse(matches)?);

    match matches.subcommand() {
        Some((CMD_SEND_LINK, sub_m)) => Ok(Action::SendLink(send_link::Args {
            globals,
            email: sub_m
                .get_one::<String>(ARG_EMAIL)
                .cloned()
                .context("missing required argument: --email")?,
        })),
        Some((CMD_COMPLETE, sub_m)) => Ok(Action::Complete(complete::Args {
            globals,
            link: sub_m
                .get_one::<String>(ARG_LINK)
                .cloned()
                .context("missing required argument: --link")?,
            email: sub_m.get_one::<String>(ARG_EMAIL).cloned(),
        })),
        Some((CMD_STATUS, _)) => Ok(Action::Status(status::Args { globals })),
        Some((CMD_SIGN_OUT, _)) => Ok(Action::SignOut(sign_out::Args { globals })),
        _ => bail!("unknown subcommand"),
    }
}
