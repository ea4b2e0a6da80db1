/*
cargo run -p apple-developer-connection-cli --bin apple_developer_connection_fetch -- --build-url 'https://app.bitrise.io/build/xxx' --build-api-token 'xxx'

Or, inside a Bitrise build

apple_developer_connection_fetch --output fastlane-session
*/

use core::time::Duration;

use apple_developer_connection::{
    config::{BUILD_API_TOKEN_ENV, BUILD_URL_ENV},
    ensure_connection, AppleDeveloperConnection, BitriseClient, BuildConfig, IsahcClient,
};
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(about = "Fetch the Apple Developer Portal connection of a Bitrise build")]
struct Args {
    #[arg(long, env = BUILD_URL_ENV)]
    build_url: Option<String>,
    #[arg(long, env = BUILD_API_TOKEN_ENV, hide_env_values = true)]
    build_api_token: Option<String>,
    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
    #[arg(long, value_enum, default_value_t = Output::Summary)]
    output: Output,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Summary,
    Json,
    FastlaneSession,
    ApiToken,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = BuildConfig::from_lookup(|key| match key {
        BUILD_URL_ENV => args.build_url.clone(),
        BUILD_API_TOKEN_ENV => args.build_api_token.clone(),
        _ => None,
    });

    let http_client = IsahcClient::with_timeout(args.timeout.map(Duration::from_secs))?;
    let client = BitriseClient::new(http_client);

    let conn = match ensure_connection(&client, config.as_ref())? {
        Some(x) => x,
        None => return Ok(()),
    };

    match args.output {
        Output::Summary => print_summary(&conn),
        Output::Json => println!("{}", serde_json::to_string_pretty(&conn)?),
        Output::FastlaneSession => match &conn.session_connection {
            Some(session) => print!("{}", session.fastlane_login_session()?),
            None => tracing::warn!("build has no session-based Apple Developer connection"),
        },
        Output::ApiToken => match &conn.jwt_connection {
            Some(jwt) => println!("{}", jwt.app_store_connect_token(None, None)?),
            None => tracing::warn!("build has no API key Apple Developer connection"),
        },
    }

    Ok(())
}

fn print_summary(conn: &AppleDeveloperConnection) {
    match &conn.session_connection {
        Some(session) => {
            let expiry = session
                .expiry()
                .map(|x| x.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_owned());
            println!(
                "session: {} (expiry: {expiry}, expired: {})",
                session.apple_id,
                session.expired(None)
            );
        }
        None => println!("session: -"),
    }

    match &conn.jwt_connection {
        Some(jwt) => println!("api key: {} (issuer: {})", jwt.key_id, jwt.issuer_id),
        None => println!("api key: -"),
    }

    println!("test devices: {}", conn.test_devices.len());
    for device in &conn.test_devices {
        println!(
            "  {} {} ({})",
            device.device_id, device.title, device.device_type
        );
    }
}
