use crate::cli::actions::{Action, complete, send_link, sign_out, status};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::SendLink(args) => send_link::execute(args).await,
        Action::Complete(args) => complete::execute(args).await,
        Action::Status(args) => status::execute(&args),
        Action::SignOut(args) => sign_out::execute(&args),
    }
}
