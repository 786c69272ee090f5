use crate::auth::{SessionSource, SessionWatcher, types::EMAIL_FOR_SIGN_IN_KEY, view};
use crate::cli::globals::GlobalArgs;
use anyhow::Result;
use std::sync::Arc;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
}

/// Render the screen for the session on this device, plus any pending sign-in.
///
/// # Errors
/// Returns an error if the client or storage cannot be opened.
pub fn render(args: &Args) -> Result<String> {
    let storage = args.globals.storage()?;
    let client = args.globals.client(Arc::clone(&storage))?;

    let watcher = SessionWatcher::new();
    let source: Arc<dyn SessionSource> = client;
    watcher.start(source, |_| {})?;
    let screen = view::select(watcher.current().as_ref());
    watcher.stop();

    let mut output = screen.to_string();
    if matches!(screen, view::Screen::SignIn)
        && let Some(email) = storage.get(EMAIL_FOR_SIGN_IN_KEY)?
    {
        output = format!("{output}\nA sign-in link was sent to {email}");
    }
    Ok(output)
}

/// Execute the status action.
/// # Errors
/// Returns an error if the client or storage cannot be opened.
pub fn execute(args: &Args) -> Result<()> {
    println!("{}", render(args)?);
    Ok(())
}
