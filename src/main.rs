use backoffice::application_port::*;
use backoffice::context::AppContext;
use backoffice::domain_model::*;
use backoffice::logger::*;
use backoffice::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(backend = %project_settings.session.backend, "settings loaded");
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let ctx = AppContext::try_new(&project_settings).await?;

    let session_id = match cli.cookie.as_deref() {
        Some(value) => Some(
            ctx.require_cookie()?
                .decode(value)
                .ok_or_else(|| anyhow::anyhow!("session cookie signature does not verify"))?,
        ),
        None => None,
    };

    match cli.command {
        Command::Login { email, password } => {
            let (result, set_cookie) = ctx
                .login(session_id, LoginInput { email, password })
                .await?;
            println!("{}", serde_json::to_string_pretty(&result.user)?);
            eprintln!("Set-Cookie: {}", set_cookie);
        }
        Command::Logout => {
            ctx.auth_service.logout(session_id.as_ref()).await?;
            if let Some(cookie) = &ctx.cookie {
                eprintln!("Set-Cookie: {}", cookie.clear_cookie());
            }
        }
        Command::Call {
            method,
            endpoint,
            body,
        } => {
            let mut request = PendingRequest::new(method, endpoint);
            if let Some(body) = body {
                request = request.with_body(serde_json::from_str(&body)?);
            }
            let response: serde_json::Value = ctx.client.session(session_id).send(request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
