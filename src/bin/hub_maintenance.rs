use anyhow::{anyhow, bail, Context};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use smart_student_hub::core::{get_subscriber, init_subscriber, AppConfig, AppError};
use smart_student_hub::db::{activity_types, institutes};

#[derive(Parser, Debug)]
#[command(name = "hub_maintenance", about = "Smart Student Hub data repairs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Trim and lowercase every activity type key.
    NormalizeKeys,
    /// Attach orphaned non-primitive activity types to an institute.
    BackfillInstitute {
        #[arg(long)]
        institute_id: Uuid,
    },
    /// Print a token's payload without verifying it.
    InspectToken { token: String },
}

#[derive(Debug, PartialEq)]
struct TokenReport {
    subject: Option<String>,
    role: Option<String>,
    institute_id: Option<String>,
    profile_id: Option<String>,
}

fn string_claim(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn inspect(token: &str) -> anyhow::Result<TokenReport> {
    let payload = token
        .trim()
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow!("token has no payload segment"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .context("payload is not base64url")?;
    let payload: Value = serde_json::from_slice(&bytes).context("payload is not JSON")?;

    let role = string_claim(&payload, "role");
    let profile_key = match role.as_deref() {
        Some("admin") => "admin_id",
        Some("student") => "student_id",
        Some("faculty") => "faculty_id",
        _ => "",
    };

    Ok(TokenReport {
        subject: string_claim(&payload, "sub"),
        role,
        institute_id: string_claim(&payload, "institute_id"),
        profile_id: string_claim(&payload, profile_key),
    })
}

/// Client-facing messages hide database causes; operators need them.
fn db_failure(e: AppError) -> anyhow::Error {
    match &e.cause {
        Some(cause) => anyhow!("{}: {cause}", e.message()),
        None => anyhow!(e.message()),
    }
}

async fn normalize_keys(pool: &PgPool) -> anyhow::Result<()> {
    let collisions = activity_types::key_collisions(pool)
        .await
        .map_err(db_failure)?;
    if !collisions.is_empty() {
        for collision in &collisions {
            let scope = collision
                .institute_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "primitive".into());
            println!(
                "{} `{}` appears {} times in {}",
                "collision".red(),
                collision.normalized_key,
                collision.occurrences,
                scope
            );
        }
        bail!(
            "{} key collisions must be resolved by hand first",
            collisions.len()
        );
    }

    let updated = activity_types::normalize_keys(pool)
        .await
        .map_err(db_failure)?;
    println!("{} {} keys normalized", "ok".green(), updated);
    Ok(())
}

async fn backfill_institute(pool: &PgPool, institute_id: Uuid) -> anyhow::Result<()> {
    institutes::get_institute(pool, institute_id)
        .await
        .map_err(db_failure)?;
    let updated = activity_types::backfill_institute(pool, institute_id)
        .await
        .map_err(db_failure)?;
    println!(
        "{} {} activity types attached to {}",
        "ok".green(),
        updated,
        institute_id
    );
    Ok(())
}

fn print_report(report: &TokenReport) {
    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".into());
    println!("sub:          {}", show(&report.subject));
    println!("role:         {}", show(&report.role));
    println!("institute_id: {}", show(&report.institute_id));
    println!("profile_id:   {}", show(&report.profile_id));

    if report.institute_id.is_none() {
        println!(
            "{} token carries no institute; the user must log in again after a backfill",
            "warning".yellow()
        );
    }
    if report.profile_id.is_none() {
        println!("{} token carries no role profile id", "warning".yellow());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("hub_maintenance".into(), "warn".into(), std::io::stdout);
    init_subscriber(subscriber);

    let cli = Cli::parse();
    if let Command::InspectToken { token } = &cli.command {
        print_report(&inspect(token)?);
        return Ok(());
    }

    let config = AppConfig::new()?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_with(config.postgres.connect())
        .await
        .context("could not reach postgres")?;

    match cli.command {
        Command::NormalizeKeys => normalize_keys(&pool).await,
        Command::BackfillInstitute { institute_id } => backfill_institute(&pool, institute_id).await,
        Command::InspectToken { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::assert_err;
    use serde_json::json;

    fn token_with(payload: Value) -> String {
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("eyJhbGciOiJIUzI1NiJ9.{body}.signature")
    }

    #[test]
    fn reports_institute_and_profile_linkage() {
        let institute = Uuid::new_v4().to_string();
        let student = Uuid::new_v4().to_string();
        let report = inspect(&token_with(json!({
            "sub": "u1",
            "role": "student",
            "institute_id": institute,
            "student_id": student,
        })))
        .unwrap();

        assert_eq!(report.institute_id, Some(institute));
        assert_eq!(report.profile_id, Some(student));
    }

    #[test]
    fn missing_institute_is_reported_as_none() {
        let report = inspect(&token_with(json!({ "sub": "u1", "role": "faculty" }))).unwrap();
        assert_eq!(report.institute_id, None);
        assert_eq!(report.profile_id, None);
    }

    #[test]
    fn database_failures_keep_their_cause() {
        let error = db_failure(AppError::db_error("connection refused"));
        assert_eq!(
            error.to_string(),
            "An unexpected error has occurred: connection refused"
        );
        assert_eq!(
            db_failure(AppError::not_found("Institute not found")).to_string(),
            "Institute not found"
        );
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        assert_err!(inspect("not-a-jwt"));
        assert_err!(inspect("a.!!!.c"));
    }
}
