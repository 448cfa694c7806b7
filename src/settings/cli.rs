use super::Parser;
use crate::domain_model::HttpMethod;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(name = "backoffice", about = "Authenticated client for the admin API")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
    /// Signed session cookie value, as printed by `login`.
    #[arg(long)]
    pub cookie: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify credentials and start a session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Clear the session.
    Logout,
    /// Issue an authenticated request and print the JSON response.
    Call {
        method: HttpMethod,
        endpoint: String,
        #[arg(long)]
        body: Option<String>,
    },
}
