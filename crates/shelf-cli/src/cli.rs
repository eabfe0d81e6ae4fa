use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "shelf",
    about = "Shelf: library copy circulation desk",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Ledger snapshot file
    #[arg(long, global = true, default_value = "shelf-ledger.json")]
    pub ledger: PathBuf,

    /// Circulation rules (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Act as if it were this instant (RFC 3339) instead of now
    #[arg(long, global = true)]
    pub at: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty ledger
    Init(InitArgs),
    /// Register or list book copies
    Copy(CopyArgs),
    /// Show copy status for a reader
    Status(StatusArgs),
    /// Borrow a copy
    Borrow(TransitionArgs),
    /// Reserve a copy until the evening cutoff
    Reserve(TransitionArgs),
    /// Return a borrowed copy
    Return(TransitionArgs),
    /// Show every checkout record of a copy
    History(HistoryArgs),
    /// List fines owed by a reader
    Fines(FinesArgs),
    /// Borrow counts and lateness per branch
    Stats(StatsArgs),
    /// Check ledger consistency
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing ledger
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct CopyArgs {
    #[command(subcommand)]
    pub action: CopyAction,
}

#[derive(Subcommand)]
pub enum CopyAction {
    /// Register a physical copy
    Add {
        /// ISBN-10 or ISBN-13, hyphens allowed
        isbn: String,
        #[arg(short, long)]
        branch: String,
        #[arg(short = 'n', long, default_value = "1")]
        number: u32,
        /// Shelf position label
        #[arg(short, long)]
        position: String,
    },
    /// List copies, optionally filtered
    List {
        #[arg(short, long)]
        branch: Option<String>,
        #[arg(long)]
        isbn: Option<String>,
    },
}

#[derive(Args)]
pub struct StatusArgs {
    /// Copy id or shelf position; every copy when omitted
    pub copy: Option<String>,
    #[arg(short, long)]
    pub user: String,
}

#[derive(Args)]
pub struct TransitionArgs {
    /// Copy id or shelf position
    pub copy: String,
    #[arg(short, long)]
    pub user: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Copy id or shelf position
    pub copy: String,
}

#[derive(Args)]
pub struct FinesArgs {
    #[arg(short, long)]
    pub user: String,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Only show the busiest readers of this branch
    #[arg(short, long)]
    pub branch: Option<String>,
    #[arg(long, default_value = "10")]
    pub top: usize,
}

#[derive(Args)]
pub struct VerifyArgs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["shelf", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init(_)));
        assert_eq!(cli.ledger, PathBuf::from("shelf-ledger.json"));
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::try_parse_from(["shelf", "init", "--force"]).unwrap();
        if let Command::Init(args) = cli.command {
            assert!(args.force);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_copy_add() {
        let cli = Cli::try_parse_from([
            "shelf", "copy", "add", "978-0-13-468599-1", "-b", "central", "-n", "2", "-p", "A12",
        ])
        .unwrap();
        if let Command::Copy(CopyArgs { action: CopyAction::Add { isbn, branch, number, position } }) = cli.command {
            assert_eq!(isbn, "978-0-13-468599-1");
            assert_eq!(branch, "central");
            assert_eq!(number, 2);
            assert_eq!(position, "A12");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_copy_list_filters() {
        let cli = Cli::try_parse_from(["shelf", "copy", "list", "--branch", "north"]).unwrap();
        if let Command::Copy(CopyArgs { action: CopyAction::List { branch, isbn } }) = cli.command {
            assert_eq!(branch, Some("north".into()));
            assert!(isbn.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_borrow() {
        let cli = Cli::try_parse_from(["shelf", "borrow", "A1", "-u", "ana"]).unwrap();
        if let Command::Borrow(args) = cli.command {
            assert_eq!(args.copy, "A1");
            assert_eq!(args.user, "ana");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn transition_requires_a_user() {
        assert!(Cli::try_parse_from(["shelf", "return", "A1"]).is_err());
    }

    #[test]
    fn parse_status_without_copy() {
        let cli = Cli::try_parse_from(["shelf", "status", "--user", "ana"]).unwrap();
        if let Command::Status(args) = cli.command {
            assert!(args.copy.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_stats_top() {
        let cli = Cli::try_parse_from(["shelf", "stats", "-b", "central", "--top", "3"]).unwrap();
        if let Command::Stats(args) = cli.command {
            assert_eq!(args.branch, Some("central".into()));
            assert_eq!(args.top, 3);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_globals() {
        let cli = Cli::try_parse_from([
            "shelf", "verify", "--verbose", "--format", "json", "--ledger", "/tmp/l.json",
            "--at", "2024-03-01T10:00:00Z",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.ledger, PathBuf::from("/tmp/l.json"));
        assert_eq!(cli.at.as_deref(), Some("2024-03-01T10:00:00Z"));
    }
}
