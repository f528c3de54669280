use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use lab_core::config::{lab_data_dir_from_env_value, permissions_from_env_value};
use lab_core::{
    CoreConfig, FileLabRepository, GrantedPermissions, Lab, LabError, LabSubmission,
    LabWorkflow, NewLabRequest, Permission, Principal, ShardableUuid, SystemClock,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type CliWorkflow = LabWorkflow<FileLabRepository, GrantedPermissions, SystemClock>;

#[derive(Parser)]
#[command(name = "lab")]
#[command(about = "Laboratory test request CLI")]
struct Cli {
    /// Permission held by the acting user (repeatable; overrides LAB_PERMISSIONS)
    #[arg(long = "permission", global = true)]
    permissions: Vec<Permission>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Request a new lab test
    Request {
        /// Patient reference
        patient: String,
        /// Lab test type
        lab_type: String,
        /// Initial note (optional)
        #[arg(long)]
        note: Option<String>,
    },
    /// Show a lab request and the actions available on it
    Show {
        /// Lab request UUID
        id: String,
    },
    /// List all lab requests for a patient
    List {
        /// Patient reference
        patient: String,
    },
    /// Record a result or add a note without changing status
    Update(SubmitArgs),
    /// Complete a lab request
    Complete(SubmitArgs),
    /// Cancel a lab request
    Cancel(SubmitArgs),
}

#[derive(Args)]
struct SubmitArgs {
    /// Lab request UUID
    id: String,
    /// Result text (optional)
    #[arg(long)]
    result: Option<String>,
    /// Note to append (optional)
    #[arg(long)]
    note: Option<String>,
}

impl SubmitArgs {
    fn into_submission(self, base: LabSubmission) -> (String, LabSubmission) {
        let mut submission = base;
        if let Some(result) = self.result {
            submission = submission.with_result(result);
        }
        if let Some(note) = self.note {
            submission = submission.with_note(note);
        }
        (self.id, submission)
    }
}

/// Entry point for the `lab` binary.
///
/// # Environment Variables
/// - `LAB_DATA_DIR`: Directory for lab request storage (default: "lab_data")
/// - `LAB_PERMISSIONS`: Comma-separated permissions of the acting user, e.g. `read:lab,complete:lab`
/// - `LAB_PRINCIPAL`: Identifier of the acting user, used in logs (default: "cli")
/// - `RUST_LOG`: Log filter (default: "lab=info")
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("lab=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("No command given. Use --help for usage.");
        return Ok(());
    };

    let principal = resolve_principal(
        std::env::var("LAB_PRINCIPAL").ok(),
        std::env::var("LAB_PERMISSIONS").ok(),
        cli.permissions,
    )?;

    let cfg = CoreConfig::new(lab_data_dir_from_env_value(
        std::env::var("LAB_DATA_DIR").ok(),
    ))?;
    tracing::debug!("lab data dir: {}", cfg.lab_data_dir().display());

    let workflow = LabWorkflow::new(
        FileLabRepository::new(Arc::new(cfg)),
        GrantedPermissions,
        SystemClock,
    );

    run(&workflow, &principal, command).map_err(report)
}

fn run(workflow: &CliWorkflow, principal: &Principal, command: Commands) -> Result<(), LabError> {
    match command {
        Commands::Request {
            patient,
            lab_type,
            note,
        } => {
            let lab = workflow.request(
                principal,
                &NewLabRequest {
                    patient_ref: patient,
                    lab_type,
                    note,
                },
            )?;
            println!("Requested lab {} with UUID: {}", lab.code(), lab.id());
        }
        Commands::Show { id } => {
            let view = workflow.view(principal, &parse_id(&id)?)?;
            print!("{}", render_lab(&view.lab));
            let actions: Vec<&str> = view.actions.iter().map(|a| a.as_str()).collect();
            if actions.is_empty() {
                println!("Actions: none");
            } else {
                println!("Actions: {}", actions.join(", "));
            }
        }
        Commands::List { patient } => {
            let labs = workflow.list_for_patient(principal, &patient)?;
            if labs.is_empty() {
                println!("No lab requests found.");
            } else {
                for lab in labs {
                    println!(
                        "ID: {}, Code: {}, Type: {}, Status: {}, Requested: {}",
                        lab.id(),
                        lab.code(),
                        lab.lab_type(),
                        lab.status(),
                        lab.requested_on()
                    );
                }
            }
        }
        Commands::Update(args) => submit(workflow, principal, args, LabSubmission::update())?,
        Commands::Complete(args) => {
            submit(workflow, principal, args, LabSubmission::complete())?
        }
        Commands::Cancel(args) => submit(workflow, principal, args, LabSubmission::cancel())?,
    }

    Ok(())
}

fn submit(
    workflow: &CliWorkflow,
    principal: &Principal,
    args: SubmitArgs,
    base: LabSubmission,
) -> Result<(), LabError> {
    let (id, submission) = args.into_submission(base);
    let lab = workflow.submit(principal, &parse_id(&id)?, &submission)?;
    println!(
        "Lab {} ({}) is now {}",
        lab.code(),
        lab.id(),
        lab.status()
    );
    Ok(())
}

fn parse_id(id: &str) -> Result<ShardableUuid, LabError> {
    ShardableUuid::parse(id).map_err(|e| LabError::InvalidInput(e.to_string()))
}

/// Builds the acting principal. Flags win over the environment.
fn resolve_principal(
    id: Option<String>,
    env_permissions: Option<String>,
    flag_permissions: Vec<Permission>,
) -> anyhow::Result<Principal> {
    let permissions = if flag_permissions.is_empty() {
        permissions_from_env_value(env_permissions).context("invalid LAB_PERMISSIONS")?
    } else {
        flag_permissions.into_iter().collect()
    };

    let id = id
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "cli".to_string());
    Ok(Principal::new(id, permissions))
}

fn render_lab(lab: &Lab) -> String {
    let mut out = format!(
        "ID: {}\nCode: {}\nPatient: {}\nType: {}\nStatus: {} ({})\nRequested: {}\n",
        lab.id(),
        lab.code(),
        lab.patient_ref(),
        lab.lab_type(),
        lab.status(),
        lab.status().badge_colour(),
        lab.requested_on()
    );
    if let Some(at) = lab.completed_on() {
        out.push_str(&format!("Completed: {at}\n"));
    }
    if let Some(at) = lab.canceled_on() {
        out.push_str(&format!("Canceled: {at}\n"));
    }
    out.push_str(&format!("Result: {}\n", lab.result().unwrap_or("-")));
    if lab.notes().is_empty() {
        out.push_str("Notes: none\n");
    } else {
        out.push_str("Notes:\n");
        for note in lab.notes() {
            out.push_str(&format!("  - {note}\n"));
        }
    }
    out
}

/// Turns a core error into the message shown to the user.
fn report(err: LabError) -> anyhow::Error {
    match err {
        LabError::Validation(failure) => {
            let mut message = failure.message;
            for (field, feedback) in [
                ("patient", failure.patient),
                ("type", failure.lab_type),
                ("result", failure.result),
            ] {
                if let Some(feedback) = feedback {
                    message.push_str(&format!("\n  {field}: {feedback}"));
                }
            }
            anyhow::anyhow!(message)
        }
        other => anyhow::Error::new(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lab_core::ValidationFailure;

    #[test]
    fn parses_complete_with_result_and_note() {
        let cli = Cli::try_parse_from([
            "lab",
            "complete",
            "550e8400e29b41d4a716446655440000",
            "--result",
            "expected result",
            "--note",
            "checked",
            "--permission",
            "complete:lab",
        ])
        .expect("should parse");

        assert_eq!(cli.permissions, vec![Permission::CompleteLab]);
        match cli.command {
            Some(Commands::Complete(args)) => {
                let (id, submission) = args.into_submission(LabSubmission::complete());
                assert_eq!(id, "550e8400e29b41d4a716446655440000");
                assert_eq!(
                    submission,
                    LabSubmission::complete()
                        .with_result("expected result")
                        .with_note("checked")
                );
            }
            _ => panic!("expected complete command"),
        }
    }

    #[test]
    fn rejects_unknown_permission_flag() {
        let parsed = Cli::try_parse_from(["lab", "list", "1234", "--permission", "admin"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn principal_flags_override_environment() {
        let principal = resolve_principal(
            None,
            Some("read:lab,cancel:lab".into()),
            vec![Permission::ViewLabs],
        )
        .unwrap();
        assert_eq!(principal.id, "cli");
        assert_eq!(
            principal.permissions.into_iter().collect::<Vec<_>>(),
            vec![Permission::ViewLabs]
        );

        let principal =
            resolve_principal(Some("dr-who".into()), Some("read:lab".into()), Vec::new()).unwrap();
        assert_eq!(principal.id, "dr-who");
        assert!(principal.permissions.contains(&Permission::ViewLab));

        assert!(resolve_principal(None, Some("nope".into()), Vec::new()).is_err());
    }

    #[test]
    fn report_lists_field_feedback() {
        let err = report(LabError::Validation(ValidationFailure {
            message: "Unable to complete".into(),
            result: Some("A result is required".into()),
            ..ValidationFailure::default()
        }));
        assert_eq!(
            err.to_string(),
            "Unable to complete\n  result: A result is required"
        );
    }

    #[test]
    fn render_lab_shows_status_badge_and_notes() {
        let id = ShardableUuid::new();
        let lab = Lab::new_request(
            id,
            lab_core::lab::request_code(&id),
            lab_core::NonEmptyText::new("1234").unwrap(),
            lab_core::NonEmptyText::new("blood count").unwrap(),
            chrono::Utc::now(),
        );

        let text = render_lab(&lab);
        assert!(text.contains("Status: requested (warning)"));
        assert!(text.contains("Result: -"));
        assert!(text.contains("Notes: none"));
    }
}
