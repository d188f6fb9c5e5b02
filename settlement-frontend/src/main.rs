use anyhow::{anyhow, bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use rust_decimal::Decimal;
use service_core::observability::logging::init_tracing;
use settlement_frontend::board::SettlementBoard;
use settlement_frontend::calculator::{BatchCalculator, Liveness, SettlementCalculator};
use settlement_frontend::config::get_configuration;
use settlement_frontend::models::dates::{format_short_date, parse_calendar_date};
use settlement_frontend::models::money::format_currency;
use settlement_frontend::models::{Settlement, SettlementFilters, SettlementUpdate};
use settlement_frontend::notifications::Notifier;
use settlement_frontend::AppState;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "settlement-frontend", version, about = "Provider settlements: calculate, create, edit and export")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Copy)]
struct PeriodArgs {
    /// Period start, YYYY-MM-DD. Defaults to this week's Monday.
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// Period end, YYYY-MM-DD. Defaults to this week's Sunday.
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Command {
    /// List settlements, grouped by provider
    List {
        #[arg(long)]
        provider: Option<i64>,
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,
    },
    /// List available providers
    Providers {
        #[arg(long)]
        search: Option<String>,
    },
    /// Calculate one provider's settlement, optionally creating it
    Calculate {
        #[arg(long)]
        provider: i64,
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long)]
        bonus: Option<Decimal>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        create: bool,
    },
    /// Calculate settlements for several providers at once
    Batch {
        #[arg(long = "provider", required = true)]
        providers: Vec<i64>,
        #[command(flatten)]
        period: PeriodArgs,
        /// Per-provider bonus as ID=AMOUNT
        #[arg(long = "bonus", value_parser = parse_bonus)]
        bonuses: Vec<(i64, Decimal)>,
        /// Filter the combined appointment list
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        create: bool,
    },
    /// Edit value, bonus or notes of a settlement
    Edit {
        id: i64,
        #[arg(long)]
        value: Option<Decimal>,
        #[arg(long)]
        bonus: Option<Decimal>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Mark a settlement as paid
    Pay { id: i64 },
    /// Recalculate a settlement's completed appointments on the server
    Recompute { id: i64 },
    /// List pending settlements
    Pending,
    /// Show general statistics
    Stats,
    /// Export a settlement as PDF
    Export {
        id: i64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    parse_calendar_date(raw).map_err(|e| e.to_string())
}

fn parse_bonus(raw: &str) -> Result<(i64, Decimal), String> {
    let (id, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=AMOUNT, got '{}'", raw))?;
    let id = id.trim().parse().map_err(|_| format!("invalid provider id '{}'", id))?;
    let amount = amount
        .trim()
        .parse()
        .map_err(|_| format!("invalid amount '{}'", amount))?;
    Ok((id, amount))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "settlement-frontend",
        &configuration.logging.level,
        configuration.logging.otlp_endpoint.as_deref(),
    )?;

    let state = AppState::new(configuration)?;
    let mut notifier = state.notifier();
    let today = Local::now().date_naive();

    info!(base_url = %state.settings.api.base_url, renderer = state.exporter.renderer_name(), "Starting settlement-frontend");

    let outcome = run(cli.command, &state, today, &mut notifier).await;
    print_notifications(&mut notifier);
    outcome
}

async fn run(
    command: Command,
    state: &AppState,
    today: NaiveDate,
    notifier: &mut Notifier,
) -> anyhow::Result<()> {
    let client = state.client.as_ref();

    match command {
        Command::List { provider, from } => {
            let mut board = SettlementBoard::new(SettlementFilters {
                provider_id: provider,
                period_start: from,
                ..Default::default()
            });
            board.refresh(client, notifier).await?;
            for (provider_id, group) in board.by_provider() {
                let name = group
                    .first()
                    .map(|s| s.provider_name())
                    .unwrap_or_default();
                println!("{} (#{})", name, provider_id);
                for settlement in group {
                    print_settlement(settlement);
                }
            }
        }
        Command::Providers { search } => {
            let providers = client.list_available_providers().await?;
            let term = search.unwrap_or_default();
            for provider in providers.iter().filter(|p| p.matches(&term)) {
                println!(
                    "{:>5}  {:<30} {}",
                    provider.id,
                    provider.display_name_or_placeholder(),
                    provider.especialidad.as_deref().unwrap_or("")
                );
            }
        }
        Command::Calculate {
            provider,
            period,
            bonus,
            notes,
            create,
        } => {
            let provider = client.get_provider(provider).await?;
            let mut calculator = SettlementCalculator::new(provider, today, Liveness::new());
            if period.from.is_some() || period.to.is_some() {
                let start = period.from.or(calculator.form().start);
                let end = period.to.or(calculator.form().end);
                calculator.set_period(start, end);
            }
            calculator.set_bonus(bonus);
            if let Some(notes) = notes {
                calculator.set_notes(notes);
            }

            let result = calculator.calculate(client, notifier).await?;
            println!(
                "{}: {} services, revenue {}, commission {}",
                calculator.provider().display_name_or_placeholder(),
                result.appointment_count(),
                format_currency(result.revenue()),
                format_currency(result.commission())
            );
            for line in &result.citas_detalle {
                println!(
                    "  {} {:<6} {:<25} {:<35} {:>12}",
                    line.display_date(),
                    line.display_time(),
                    line.client_name(),
                    line.service_names(),
                    format_currency(line.price())
                );
            }
            println!("Total to pay: {}", format_currency(calculator.total()));

            if create {
                ensure_manager(state)?;
                let settlement = calculator.create(client, notifier).await?;
                print_settlement(&settlement);
                SettlementBoard::default().created(client, notifier).await;
            }
        }
        Command::Batch {
            providers,
            period,
            bonuses,
            search,
            create,
        } => {
            let mut batch = BatchCalculator::new(today, Liveness::new());
            if period.from.is_some() || period.to.is_some() {
                let (start, end) = batch.period();
                batch.set_period(period.from.or(start), period.to.or(end));
            }

            let available = client.list_available_providers().await?;
            for id in &providers {
                match available.iter().find(|p| p.id == *id) {
                    Some(provider) => {
                        if !batch.selection().is_selected(provider.id) {
                            batch.selection_mut().toggle(provider.clone());
                        }
                    }
                    None => bail!("Provider {} is not available", id),
                }
            }

            batch.calculate_all(client, notifier).await?;
            for (provider_id, bonus) in bonuses {
                batch.update_bonus(provider_id, bonus)?;
            }

            for entry in batch.entries() {
                println!(
                    "{:<30} {:>4} services  value {:>12}  bonus {:>10}  total {:>12}{}",
                    entry.provider.display_name_or_placeholder(),
                    entry.appointment_count(),
                    format_currency(entry.value),
                    format_currency(entry.bonus),
                    format_currency(entry.total),
                    entry
                        .error
                        .as_deref()
                        .map(|e| format!("  [error: {}]", e))
                        .unwrap_or_default()
                );
            }
            for line in batch.search(search.as_deref().unwrap_or("")) {
                println!(
                    "  {:<20} {} {:<6} {:<25} {:<35} {:>12}",
                    line.provider_name,
                    line.line.display_date(),
                    line.line.display_time(),
                    line.line.client_name(),
                    line.line.service_names(),
                    format_currency(line.line.price())
                );
            }
            println!(
                "Batch total: {} ({} without services)",
                format_currency(batch.batch_total()),
                batch.excluded_count()
            );

            if create {
                ensure_manager(state)?;
                let creation = batch.create_all(client, notifier).await?;
                for settlement in &creation.created {
                    print_settlement(settlement);
                }
                SettlementBoard::default().created(client, notifier).await;
            }
        }
        Command::Edit {
            id,
            value,
            bonus,
            notes,
        } => {
            let update = SettlementUpdate::new(value, bonus, notes)?;
            let mut board = SettlementBoard::default();
            let updated = board.edit(client, id, update, notifier).await?;
            print_settlement(&updated);
        }
        Command::Pay { id } => {
            let mut board = SettlementBoard::default();
            board.mark_paid(client, id, notifier).await?;
        }
        Command::Recompute { id } => {
            ensure_manager(state)?;
            let result = client.recompute_appointments(id).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            notifier.success("Appointments recalculated");
        }
        Command::Pending => {
            for settlement in client.get_pending_settlements().await? {
                print_settlement(&settlement);
            }
        }
        Command::Stats => {
            let stats = client.get_general_statistics().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Export { id, out } => {
            let settlement = client
                .get_settlement(id)
                .await
                .with_context(|| format!("Could not load settlement {}", id))?;
            let dir = out.unwrap_or_else(|| state.exporter.output_dir().to_path_buf());
            let written = state
                .exporter
                .export(client, &settlement, &dir, today, notifier)
                .await;
            if !written {
                bail!("Export of settlement {} failed", id);
            }
            println!("{}", dir.join(state.exporter.file_name(&settlement)).display());
        }
    }

    Ok(())
}

fn ensure_manager(state: &AppState) -> anyhow::Result<()> {
    if state.client.session().can_manage() {
        Ok(())
    } else {
        bail!("The current session cannot create or modify settlements")
    }
}

fn print_settlement(settlement: &Settlement) {
    println!(
        "  #{:<5} {} - {}  value {:>12}  bonus {:>10}  total {:>12}  {}",
        settlement.id,
        format_short_date(settlement.fecha_inicio),
        format_short_date(settlement.fecha_final),
        format_currency(settlement.valor),
        format_currency(settlement.bonificacion),
        format_currency(settlement.total_a_pagar),
        settlement.estado.as_deref().unwrap_or("")
    );
}

fn print_notifications(notifier: &mut Notifier) {
    for notification in notifier.drain() {
        eprintln!("[{}] {}", notification.kind, notification.message);
    }
}
