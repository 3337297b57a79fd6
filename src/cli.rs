//! Command-line front end: parses a command, runs the matching domain
//! operation and prints its result as JSON.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use paydash::api::IdempotencyKey;
use paydash::error::ApiError;
use paydash::ops::{
  parse_variant, AgentFilter, AgentStatus, BatchFilter, Client, DateRange, DisputeRequest,
  DepositRequest, EscrowFilter, KycFilter, KycStatus, Lifecycle, LoginRequest, NewApiKey,
  OnboardingRequest, QuoteRequest, RemittanceFilter, RemittanceStatus, ReportKind, ReportRequest,
  SignupRequest, SwapRequest, TransactionFilter, TransactionKind, WithdrawRequest,
};

#[derive(Parser, Debug)]
#[command(name = "paydash")]
#[command(about = "Command-line client for the payments dashboard")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/paydash/config.yaml)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Sign in and remember the session
  Login {
    email: String,
    #[arg(long, env = "PAYDASH_PASSWORD", hide_env_values = true)]
    password: String,
  },
  /// Create an account and sign in
  Signup {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    company: String,
    #[arg(long, env = "PAYDASH_PASSWORD", hide_env_values = true)]
    password: String,
  },
  /// Finish organization onboarding
  Onboard {
    #[arg(long)]
    country: String,
    #[arg(long)]
    business_type: String,
    #[arg(long)]
    monthly_volume: Option<String>,
    /// Repeatable, e.g. --use-case payroll --use-case remittances
    #[arg(long = "use-case")]
    use_cases: Vec<String>,
  },
  /// Forget the stored session
  Logout,
  /// Show the signed-in user and organization
  Whoami,
  /// Dashboard summary
  Dashboard,
  #[command(subcommand)]
  Agents(AgentsCommand),
  #[command(subcommand)]
  Payroll(PayrollCommand),
  #[command(subcommand)]
  Remit(RemitCommand),
  #[command(subcommand)]
  Escrow(EscrowCommand),
  #[command(subcommand)]
  Treasury(TreasuryCommand),
  #[command(subcommand)]
  Settings(SettingsCommand),
  #[command(subcommand)]
  Compliance(ComplianceCommand),
  /// Volume analytics for a date range
  Analytics {
    #[arg(long)]
    from: NaiveDate,
    #[arg(long)]
    to: NaiveDate,
  },
}

#[derive(Subcommand, Debug)]
pub enum AgentsCommand {
  List {
    #[arg(long, value_parser = parse_variant::<AgentStatus>)]
    status: Option<AgentStatus>,
    #[arg(long, value_parser = parse_variant::<KycStatus>)]
    kyc_status: Option<KycStatus>,
    #[arg(long)]
    search: Option<String>,
  },
  Show {
    id: String,
  },
  /// Add an agent described by a JSON file
  Create {
    file: PathBuf,
  },
  Remove {
    id: String,
  },
}

#[derive(Subcommand, Debug)]
pub enum PayrollCommand {
  List {
    #[arg(long, value_parser = parse_variant::<Lifecycle>)]
    status: Option<Lifecycle>,
    #[arg(long)]
    search: Option<String>,
  },
  Show {
    id: String,
  },
  /// Create a batch described by a JSON file
  Create {
    file: PathBuf,
  },
  Submit {
    id: String,
  },
  Approve {
    id: String,
  },
  Execute {
    id: String,
    /// Key of an earlier attempt to retry
    #[arg(long)]
    idempotency_key: Option<String>,
  },
  Cancel {
    id: String,
  },
}

#[derive(Subcommand, Debug)]
pub enum RemitCommand {
  List {
    #[arg(long, value_parser = parse_variant::<RemittanceStatus>)]
    status: Option<RemittanceStatus>,
    #[arg(long)]
    country: Option<String>,
  },
  Quote {
    #[arg(long)]
    from: String,
    #[arg(long)]
    to: String,
    /// Minor units of the sending currency
    #[arg(long)]
    amount: i64,
  },
  /// Send a remittance described by a JSON file
  Send {
    file: PathBuf,
    #[arg(long)]
    idempotency_key: Option<String>,
  },
  Cancel {
    id: String,
  },
}

#[derive(Subcommand, Debug)]
pub enum EscrowCommand {
  List {
    #[arg(long, value_parser = parse_variant::<Lifecycle>)]
    status: Option<Lifecycle>,
    #[arg(long)]
    counterparty: Option<String>,
  },
  Show {
    id: String,
  },
  /// Create a contract described by a JSON file
  Create {
    file: PathBuf,
  },
  Approve {
    id: String,
  },
  Release {
    id: String,
    #[arg(long)]
    idempotency_key: Option<String>,
  },
  Dispute {
    id: String,
    #[arg(long)]
    reason: String,
  },
  Cancel {
    id: String,
  },
}

#[derive(Subcommand, Debug)]
pub enum TreasuryCommand {
  Portfolio,
  Transactions {
    #[arg(long, value_parser = parse_variant::<TransactionKind>)]
    kind: Option<TransactionKind>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
  },
  Swap {
    #[arg(long)]
    from: String,
    #[arg(long)]
    to: String,
    #[arg(long)]
    amount: String,
    #[arg(long)]
    idempotency_key: Option<String>,
  },
  Deposit {
    #[arg(long)]
    asset: String,
    #[arg(long)]
    amount: String,
    #[arg(long)]
    source: String,
    #[arg(long)]
    idempotency_key: Option<String>,
  },
  Withdraw {
    #[arg(long)]
    asset: String,
    #[arg(long)]
    amount: String,
    #[arg(long)]
    destination: String,
    #[arg(long)]
    idempotency_key: Option<String>,
  },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
  Show,
  ApiKeys,
  CreateKey {
    name: String,
  },
  RevokeKey {
    id: String,
  },
}

#[derive(Subcommand, Debug)]
pub enum ComplianceCommand {
  Kyc {
    #[arg(long, value_parser = parse_variant::<KycStatus>)]
    status: Option<KycStatus>,
  },
  Reports,
  /// Submit KYC documents described by a JSON file
  SubmitKyc {
    file: PathBuf,
  },
  /// Request a report for a period
  Report {
    #[arg(value_parser = parse_variant::<ReportKind>)]
    kind: ReportKind,
    #[arg(long)]
    from: NaiveDate,
    #[arg(long)]
    to: NaiveDate,
  },
}

impl Command {
  fn requires_session(&self) -> bool {
    !matches!(
      self,
      Command::Login { .. } | Command::Signup { .. } | Command::Logout | Command::Whoami
    )
  }
}

pub async fn run(client: &Client, command: Command) -> Result<ExitCode> {
  if command.requires_session() && !client.session().is_authenticated() {
    eprintln!("Not signed in. Run `paydash login <email>` first.");
    return Ok(ExitCode::FAILURE);
  }

  match command {
    Command::Login { email, password } => {
      emit(client.auth().login(&LoginRequest { email, password }).await)
    }
    Command::Signup {
      name,
      email,
      company,
      password,
    } => emit(
      client
        .auth()
        .signup(&SignupRequest {
          name,
          email,
          password,
          company_name: company,
        })
        .await,
    ),
    Command::Onboard {
      country,
      business_type,
      monthly_volume,
      use_cases,
    } => emit(
      client
        .auth()
        .complete_onboarding(&OnboardingRequest {
          country,
          business_type,
          monthly_volume,
          use_cases,
        })
        .await,
    ),
    Command::Logout => {
      client.auth().logout();
      Ok(ExitCode::SUCCESS)
    }
    Command::Whoami => match client.session().current() {
      Some(session) => {
        print_json(&serde_json::json!({
          "user": session.user,
          "organization": session.organization,
        }))?;
        Ok(ExitCode::SUCCESS)
      }
      None => {
        eprintln!("Not signed in.");
        Ok(ExitCode::FAILURE)
      }
    },
    Command::Dashboard => emit(client.analytics().dashboard().await),
    Command::Agents(command) => run_agents(client, command).await,
    Command::Payroll(command) => run_payroll(client, command).await,
    Command::Remit(command) => run_remit(client, command).await,
    Command::Escrow(command) => run_escrow(client, command).await,
    Command::Treasury(command) => run_treasury(client, command).await,
    Command::Settings(command) => run_settings(client, command).await,
    Command::Compliance(command) => run_compliance(client, command).await,
    Command::Analytics { from, to } => {
      emit(client.analytics().overview(&DateRange { from, to }).await)
    }
  }
}

async fn run_agents(client: &Client, command: AgentsCommand) -> Result<ExitCode> {
  let agents = client.agents();
  match command {
    AgentsCommand::List {
      status,
      kyc_status,
      search,
    } => emit(
      agents
        .list(&AgentFilter {
          status,
          kyc_status,
          search,
        })
        .await,
    ),
    AgentsCommand::Show { id } => emit(agents.get(&id).await),
    AgentsCommand::Create { file } => emit(agents.create(&read_json(&file)?).await),
    AgentsCommand::Remove { id } => emit(agents.remove(&id).await),
  }
}

async fn run_payroll(client: &Client, command: PayrollCommand) -> Result<ExitCode> {
  let payroll = client.payroll();
  match command {
    PayrollCommand::List { status, search } => {
      emit(payroll.list_batches(&BatchFilter { status, search }).await)
    }
    PayrollCommand::Show { id } => emit(payroll.get_batch(&id).await),
    PayrollCommand::Create { file } => emit(payroll.create_batch(&read_json(&file)?).await),
    PayrollCommand::Submit { id } => emit(payroll.submit_batch(&id).await),
    PayrollCommand::Approve { id } => emit(payroll.approve_batch(&id).await),
    PayrollCommand::Execute {
      id,
      idempotency_key,
    } => {
      let key = action_key(idempotency_key.as_deref())?;
      emit(payroll.execute_batch(&id, &key).await)
    }
    PayrollCommand::Cancel { id } => emit(payroll.cancel_batch(&id).await),
  }
}

async fn run_remit(client: &Client, command: RemitCommand) -> Result<ExitCode> {
  let remittances = client.remittances();
  match command {
    RemitCommand::List { status, country } => {
      emit(remittances.list(&RemittanceFilter { status, country }).await)
    }
    RemitCommand::Quote { from, to, amount } => emit(
      remittances
        .quote(&QuoteRequest {
          from_currency: from,
          to_currency: to,
          amount,
        })
        .await,
    ),
    RemitCommand::Send {
      file,
      idempotency_key,
    } => {
      let remittance = read_json(&file)?;
      let key = action_key(idempotency_key.as_deref())?;
      emit(remittances.create(&remittance, &key).await)
    }
    RemitCommand::Cancel { id } => emit(remittances.cancel(&id).await),
  }
}

async fn run_escrow(client: &Client, command: EscrowCommand) -> Result<ExitCode> {
  let escrow = client.escrow();
  match command {
    EscrowCommand::List {
      status,
      counterparty,
    } => emit(
      escrow
        .list(&EscrowFilter {
          status,
          counterparty,
        })
        .await,
    ),
    EscrowCommand::Show { id } => emit(escrow.get(&id).await),
    EscrowCommand::Create { file } => emit(escrow.create(&read_json(&file)?).await),
    EscrowCommand::Approve { id } => emit(escrow.approve(&id).await),
    EscrowCommand::Release {
      id,
      idempotency_key,
    } => {
      let key = action_key(idempotency_key.as_deref())?;
      emit(escrow.release(&id, &key).await)
    }
    EscrowCommand::Dispute { id, reason } => {
      emit(escrow.dispute(&id, &DisputeRequest { reason }).await)
    }
    EscrowCommand::Cancel { id } => emit(escrow.cancel(&id).await),
  }
}

async fn run_treasury(client: &Client, command: TreasuryCommand) -> Result<ExitCode> {
  let treasury = client.treasury();
  match command {
    TreasuryCommand::Portfolio => emit(treasury.portfolio().await),
    TreasuryCommand::Transactions { kind, from, to } => {
      emit(treasury.transactions(&TransactionFilter { kind, from, to }).await)
    }
    TreasuryCommand::Swap {
      from,
      to,
      amount,
      idempotency_key,
    } => {
      let key = action_key(idempotency_key.as_deref())?;
      let swap = SwapRequest {
        from_asset: from,
        to_asset: to,
        amount,
      };
      emit(treasury.swap(&swap, &key).await)
    }
    TreasuryCommand::Deposit {
      asset,
      amount,
      source,
      idempotency_key,
    } => {
      let key = action_key(idempotency_key.as_deref())?;
      let deposit = DepositRequest {
        asset,
        amount,
        source,
      };
      emit(treasury.deposit(&deposit, &key).await)
    }
    TreasuryCommand::Withdraw {
      asset,
      amount,
      destination,
      idempotency_key,
    } => {
      let key = action_key(idempotency_key.as_deref())?;
      let withdrawal = WithdrawRequest {
        asset,
        amount,
        destination,
      };
      emit(treasury.withdraw(&withdrawal, &key).await)
    }
  }
}

async fn run_settings(client: &Client, command: SettingsCommand) -> Result<ExitCode> {
  let settings = client.settings();
  match command {
    SettingsCommand::Show => emit(settings.get().await),
    SettingsCommand::ApiKeys => emit(settings.api_keys().await),
    SettingsCommand::CreateKey { name } => emit(settings.create_api_key(&NewApiKey { name }).await),
    SettingsCommand::RevokeKey { id } => emit(settings.revoke_api_key(&id).await),
  }
}

async fn run_compliance(client: &Client, command: ComplianceCommand) -> Result<ExitCode> {
  let compliance = client.compliance();
  match command {
    ComplianceCommand::Kyc { status } => emit(compliance.kyc_records(&KycFilter { status }).await),
    ComplianceCommand::Reports => emit(compliance.reports().await),
    ComplianceCommand::SubmitKyc { file } => emit(compliance.submit_kyc(&read_json(&file)?).await),
    ComplianceCommand::Report { kind, from, to } => emit(
      compliance
        .generate_report(&ReportRequest {
          kind,
          period: DateRange { from, to },
        })
        .await,
    ),
  }
}

/// Reuse the key of an earlier attempt, or start a new action and show
/// its key so the action can be retried safely.
fn action_key(reuse: Option<&str>) -> Result<IdempotencyKey> {
  match reuse {
    Some(raw) => IdempotencyKey::parse(raw).map_err(|e| eyre!("{}", e)),
    None => {
      let key = IdempotencyKey::new();
      eprintln!("idempotency key: {} (pass --idempotency-key to retry)", key);
      Ok(key)
    }
  }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
  serde_json::from_str(&contents).map_err(|e| eyre!("Failed to parse {}: {}", path.display(), e))
}

/// Print a successful result. Failures were already reported on stderr by
/// the notifier.
fn emit<T: Serialize>(result: Result<T, ApiError>) -> Result<ExitCode> {
  match result {
    Ok(value) => {
      print_json(&value)?;
      Ok(ExitCode::SUCCESS)
    }
    Err(_) => Ok(ExitCode::FAILURE),
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  let json = serde_json::to_string_pretty(value)
    .map_err(|e| eyre!("Failed to encode output: {}", e))?;
  if json != "null" {
    println!("{}", json);
  }
  Ok(())
}
