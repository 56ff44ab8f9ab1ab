use std::fmt::{Debug, Display};

use smart_student_hub::core::{get_subscriber, init_subscriber, AppConfig};
use smart_student_hub::hub_web_server::HubWebServer;
use tokio::task::JoinError;

use colored::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let file_appender = tracing_appender::rolling::daily("/var/tmp/log/smart_student_hub", "app");

    let subscriber = get_subscriber("smart_student_hub".into(), "info".into(), file_appender);
    init_subscriber(subscriber);

    let config = AppConfig::new()?;

    let hub_web_server = HubWebServer::build(config.clone()).await?;
    let port = hub_web_server.port();

    let server_task = tokio::spawn(hub_web_server.run_until_stopped());

    println!("{}", "-----------------------------------------".green());
    println!(
        "🚀 Server started on Addr: {}:{}",
        config.hub_server_config.host, port
    );
    println!("{}", "-----------------------------------------".green());

    tokio::select! {
        outcome = server_task => report_exit("API server", outcome),
    }
    Ok(())
}

/// Logs how the hub's HTTP task ended so the daily log shows why the process stopped.
fn report_exit(task_name: &str, outcome: Result<Result<(), impl Debug + Display>, JoinError>) {
    match outcome {
        Ok(Ok(())) => tracing::info!(task = task_name, "shut down cleanly"),
        Ok(Err(e)) => tracing::error!(
            task = task_name,
            error.cause_chain = ?e,
            error.message = %e,
            "stopped with an error"
        ),
        Err(e) if e.is_cancelled() => tracing::warn!(task = task_name, "was cancelled"),
        Err(e) => tracing::error!(
            task = task_name,
            error.cause_chain = ?e,
            error.message = %e,
            "panicked before finishing"
        ),
    }
}
