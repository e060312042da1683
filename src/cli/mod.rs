pub mod mine;
pub mod recharge;
pub mod report;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use mine::{process_mine_command, MineCommand};
use recharge::{recharge, RechargeCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    ledger::{view::summarize, view::RECENT_DAYS, ProfileUpdate, SessionLedger},
    storage::{file_store::FileStore, memory::MemoryStore, DurableStore},
    utils::{
        clock::{Clock, DefaultClock},
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

const DEFAULT_SPEND_DESCRIPTION: &str = "Points spent";

#[derive(Parser, Debug)]
#[command(name = "Mineledger", version, long_about = None)]
#[command(about = "Turns daily mining sessions into spendable points", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long = "log-filter", global = true, help = "Log level. Defaults to RUST_LOG or debug")]
    log: Option<LevelFilter>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console", global = true)]
    log_console: bool,
    #[arg(long, global = true, help = "Keep the ledger in memory. Nothing is saved")]
    ephemeral: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Start mining in the foreground until the daily goal is reached or Ctrl-C")]
    Mine {
        #[command(flatten)]
        command: MineCommand,
    },
    #[command(about = "Show balance and today's progress")]
    Status {},
    #[command(about = "Spend points from the balance")]
    Spend {
        #[arg(short, long, help = "Number of points to spend")]
        amount: u64,
        #[arg(short, long, default_value = DEFAULT_SPEND_DESCRIPTION, help = "What the points were spent on")]
        description: String,
    },
    #[command(about = "Recharge a mobile number with points")]
    Recharge {
        #[command(flatten)]
        command: RechargeCommand,
    },
    #[command(about = "Change profile name or avatar")]
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_avatar")]
        avatar: Option<String>,
        #[arg(long = "clear-avatar")]
        clear_avatar: bool,
    },
    #[command(about = "List recent earnings and spendings")]
    History {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    #[command(about = "Summarize earnings over the last week")]
    Summary {},
    #[command(about = "Erase the ledger and start over")]
    Reset {
        #[arg(long, help = "Confirm that all points and history should be erased")]
        yes: bool,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .dir
        .map_or_else(create_application_default_path, ensure_dir)?;
    enable_logging(CLI_PREFIX, &app_dir, args.log, args.log_console)?;

    let store: Box<dyn DurableStore> = if args.ephemeral {
        Box::new(MemoryStore::default())
    } else {
        Box::new(FileStore::new(app_dir.join("store"))?)
    };
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let mut ledger = SessionLedger::open(store, clock.clone());

    match args.commands {
        Commands::Mine { command } => process_mine_command(ledger, clock, command).await,
        Commands::Status {} => {
            report::print_status(&ledger.view());
            Ok(())
        }
        Commands::Spend {
            amount,
            description,
        } => {
            let entry = ledger.try_spend(amount, &description)?;
            report::print_spent(&entry, ledger.state().balance);
            Ok(())
        }
        Commands::Recharge {
            command: RechargeCommand { number, operator },
        } => {
            let entry = recharge(&mut ledger, &number, operator)?;
            report::print_spent(&entry, ledger.state().balance);
            Ok(())
        }
        Commands::Profile {
            name,
            avatar,
            clear_avatar,
        } => {
            let avatar_ref = if clear_avatar { Some(None) } else { avatar.map(Some) };
            ledger.update_profile(ProfileUpdate {
                display_name: name,
                avatar_ref,
            });
            report::print_status(&ledger.view());
            Ok(())
        }
        Commands::History { limit } => {
            report::print_history(&ledger.state().history, limit);
            Ok(())
        }
        Commands::Summary {} => {
            let summary = summarize(ledger.state(), clock.today(), &Local, RECENT_DAYS);
            report::print_summary(&summary);
            Ok(())
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("Refusing to erase the ledger without --yes");
            }
            ledger.reset();
            println!("Ledger has been reset");
            Ok(())
        }
    }
}
