use crate::auth::{
    FormView, Notice, Notifier, SignInRequestFlow, SubmitOutcome, view::LOADING_MESSAGE,
};
use crate::cli::globals::GlobalArgs;
use anyhow::{Result, bail};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub email: String,
}

/// Prints notices for the person at the terminal; errors go to stderr.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &Notice) {
        if notice.is_error() {
            eprintln!("{}", notice.message());
        } else {
            println!("{}", notice.message());
        }
    }
}

/// Execute the send-link action.
/// # Errors
/// Returns an error if the state directory or client cannot be set up, or the
/// identity provider rejects the request.
pub async fn execute(args: Args) -> Result<()> {
    let storage = args.globals.storage()?;
    let client = args.globals.client(Arc::clone(&storage))?;

    let flow = SignInRequestFlow::new(
        client,
        storage,
        Arc::new(ConsoleNotifier),
        args.globals.link_settings(),
    );
    flow.update_email(args.email);

    // Submit acquires the in-progress flag before its first await, so the
    // second future sees the loading view while the request is outstanding.
    let (outcome, ()) = tokio::join!(flow.submit(), async {
        if FormView::from_state(&flow.state()) == FormView::Loading {
            eprintln!("{LOADING_MESSAGE}");
        }
    });

    match outcome {
        SubmitOutcome::Sent { email } => {
            debug!(email = %email, "pending sign-in remembered on this device");
            Ok(())
        }
        SubmitOutcome::Failed(err) => {
            // The notifier already showed the provider's message.
            debug!(error = %err.message, "sign-in link request failed");
            bail!("sign-in link request failed")
        }
        SubmitOutcome::Busy => bail!("a sign-in link request is already in progress"),
    }
}
