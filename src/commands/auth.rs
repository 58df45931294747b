use clap::Args;

use crate::fanout::remote::RemoteClient;
use crate::state::{self, AppState, MAX_PAID_REQUESTS};

#[derive(Debug, Args, Clone)]
pub struct AuthArgs {
    /// Paid token received by email.
    pub token: String,
}

pub async fn run(args: AuthArgs) -> Result<(), String> {
    super::init_logging(false, false);

    let remote = RemoteClient::from_env();
    let status = remote
        .authenticate(&args.token)
        .await
        .map_err(|err| err.to_string())?;

    if !status.authenticated {
        return Err("Invalid token.".to_string());
    }
    if !status.paying {
        return Err(
            "Token is not attached to a paid plan. Upgrade to continue, or configure provider API keys instead."
                .to_string(),
        );
    }

    let state_path = state::state_path()?;
    let mut app_state = AppState::load(&state_path);
    app_state.api_key = Some(args.token);
    app_state.paid_user = true;
    app_state.save(&state_path)?;

    println!("Authenticated. Up to {MAX_PAID_REQUESTS} requests per month are available.");
    Ok(())
}
