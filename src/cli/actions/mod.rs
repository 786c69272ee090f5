pub mod complete;
pub mod send_link;
pub mod sign_out;
pub mod status;

// Internal "interpreter" for `Action`.
// The match lives in a separate module so `mod.rs` stays small.
mod run;

#[derive(Debug)]
pub enum Action {
    SendLink(send_link::Args),
    Complete(complete::Args),
    Status(status::Args),
    SignOut(sign_out::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
