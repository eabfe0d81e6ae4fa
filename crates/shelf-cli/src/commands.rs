use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use shelf_circulation::{CirculationConfig, CirculationDesk, CopyStatus};
use shelf_ledger::{
    BookCopy, BorrowCount, BranchLateness, CheckoutRecord, InMemoryLedger, LedgerReader,
    LedgerSnapshot, LedgerValidator, NewCopy, Statistics,
};
use shelf_types::{
    parse_timestamp, BookId, BranchId, Clock, CopyId, FixedClock, Money, SystemClock, Timestamp,
    UserId,
};

use crate::cli::*;
use crate::lock::LedgerLock;

/// An opened ledger plus the instant every command in this run acts at.
///
/// The session holds the ledger's file lock from load to save.
struct Session {
    path: PathBuf,
    desk: CirculationDesk<InMemoryLedger>,
    now: Timestamp,
    format: OutputFormat,
    /// Ledger revision as loaded; `None` for a ledger not yet on disk.
    loaded: Option<u64>,
    _lock: LedgerLock,
}

impl Session {
    fn open(path: &Path, config: CirculationConfig, now: Timestamp, format: OutputFormat) -> anyhow::Result<Self> {
        if !path.exists() {
            bail!("no ledger at {}; run `shelf init` first", path.display());
        }
        let lock = LedgerLock::acquire(path)?;
        let snapshot = LedgerSnapshot::load(path)
            .with_context(|| format!("failed to load ledger {}", path.display()))?;
        let ledger = InMemoryLedger::from_snapshot(snapshot)?;
        let loaded = ledger.revision()?;
        tracing::debug!(path = %path.display(), "ledger loaded");
        Ok(Self {
            path: path.to_path_buf(),
            desk: CirculationDesk::new(Arc::new(ledger), config),
            now,
            format,
            loaded: Some(loaded),
            _lock: lock,
        })
    }

    fn create(path: &Path, force: bool, config: CirculationConfig, now: Timestamp, format: OutputFormat) -> anyhow::Result<Self> {
        let lock = LedgerLock::acquire(path)?;
        if path.exists() && !force {
            bail!("ledger {} already exists (use --force to overwrite)", path.display());
        }
        Ok(Self {
            path: path.to_path_buf(),
            desk: CirculationDesk::new(Arc::new(InMemoryLedger::new()), config),
            now,
            format,
            loaded: None,
            _lock: lock,
        })
    }

    /// Whether this run changed the ledger, or it has never been written.
    fn is_dirty(&self) -> anyhow::Result<bool> {
        let revision = self.ledger().revision()?;
        Ok(self.loaded != Some(revision))
    }

    fn save(&self) -> anyhow::Result<()> {
        self.desk.ledger().snapshot()?.save(&self.path)?;
        tracing::debug!(path = %self.path.display(), "ledger saved");
        Ok(())
    }

    fn ledger(&self) -> &InMemoryLedger {
        self.desk.ledger()
    }

    /// A copy named by its id or by its shelf position.
    fn resolve_copy(&self, key: &str) -> anyhow::Result<CopyId> {
        if let Ok(id) = key.parse::<CopyId>() {
            return Ok(id);
        }
        self.ledger()
            .copies()?
            .into_iter()
            .find(|copy| copy.position == key)
            .map(|copy| copy.id)
            .with_context(|| format!("no copy with id or shelf position {key:?}"))
    }

    fn position_of(&self, copy: CopyId) -> String {
        match self.ledger().copy(copy) {
            Ok(Some(copy)) => copy.position,
            _ => copy.short_id(),
        }
    }
}

pub fn run_command(cli: Cli, out: &mut dyn Write) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => CirculationConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CirculationConfig::default(),
    };
    let clock: Box<dyn Clock> = match &cli.at {
        Some(at) => Box::new(FixedClock::new(parse_timestamp(at)?)),
        None => Box::new(SystemClock),
    };
    let now = clock.now();

    let session = match &cli.command {
        Command::Init(args) => Session::create(&cli.ledger, args.force, config, now, cli.format)?,
        _ => Session::open(&cli.ledger, config, now, cli.format)?,
    };

    match cli.command {
        Command::Init(_) => cmd_init(&session, out)?,
        Command::Copy(args) => match args.action {
            CopyAction::Add { isbn, branch, number, position } => {
                cmd_copy_add(&session, &isbn, &branch, number, position, out)?
            }
            CopyAction::List { branch, isbn } => cmd_copy_list(&session, branch, isbn, out)?,
        },
        Command::Status(args) => cmd_status(&session, args, out)?,
        Command::Borrow(args) => cmd_borrow(&session, args, out)?,
        Command::Reserve(args) => cmd_reserve(&session, args, out)?,
        Command::Return(args) => cmd_return(&session, args, out)?,
        Command::History(args) => cmd_history(&session, args, out)?,
        Command::Fines(args) => cmd_fines(&session, args, out)?,
        Command::Stats(args) => cmd_stats(&session, args, out)?,
        Command::Verify(_) => cmd_verify(&session, out)?,
    }

    if session.is_dirty()? {
        session.save()?;
    }
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn colored_status(status: CopyStatus) -> colored::ColoredString {
    let label = status.to_string();
    match status {
        CopyStatus::Available => label.green(),
        CopyStatus::ReservedMine | CopyStatus::BorrowedMine => label.cyan(),
        CopyStatus::ReservedOther | CopyStatus::BorrowedOther => label.yellow(),
    }
}

fn cmd_init(session: &Session, out: &mut dyn Write) -> anyhow::Result<()> {
    match session.format {
        OutputFormat::Json => write_json(out, &serde_json::json!({ "ledger": session.path }))?,
        OutputFormat::Text => writeln!(
            out,
            "{} Initialized empty ledger in {}",
            "✓".green().bold(),
            session.path.display().to_string().bold()
        )?,
    }
    Ok(())
}

fn cmd_copy_add(
    session: &Session,
    isbn: &str,
    branch: &str,
    copy_number: u32,
    position: String,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let copy = session.desk.register_copy(NewCopy {
        book: BookId::isbn(isbn)?,
        branch: BranchId::new(branch)?,
        copy_number,
        position,
    })?;
    match session.format {
        OutputFormat::Json => write_json(out, &copy)?,
        OutputFormat::Text => {
            writeln!(out, "{} Registered copy {}", "✓".green().bold(), copy.id.short_id().yellow())?;
            writeln!(out, "  Book: {} #{}", copy.book, copy.copy_number)?;
            writeln!(out, "  Shelf: {} at {}", copy.position.bold(), copy.branch)?;
        }
    }
    Ok(())
}

fn cmd_copy_list(
    session: &Session,
    branch: Option<String>,
    isbn: Option<String>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut copies = match &isbn {
        Some(isbn) => session.ledger().copies_of_book(&BookId::isbn(isbn)?)?,
        None => session.ledger().copies()?,
    };
    if let Some(branch) = branch {
        let branch = BranchId::new(branch)?;
        copies.retain(|copy| copy.branch == branch);
    }

    match session.format {
        OutputFormat::Json => write_json(out, &copies)?,
        OutputFormat::Text if copies.is_empty() => writeln!(out, "No copies.")?,
        OutputFormat::Text => {
            for copy in &copies {
                write_copy_line(out, copy)?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

fn write_copy_line(out: &mut dyn Write, copy: &BookCopy) -> std::io::Result<()> {
    write!(
        out,
        "{:<6}  {}  {:<10}  #{:<3} {}",
        copy.position.bold(),
        copy.book,
        copy.branch.to_string(),
        copy.copy_number,
        copy.id.short_id().dimmed()
    )
}

#[derive(Serialize)]
struct StatusRow {
    copy: BookCopy,
    status: CopyStatus,
    label: String,
}

fn cmd_status(session: &Session, args: StatusArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let user = UserId::new(args.user)?;
    let listing = match &args.copy {
        Some(key) => {
            let id = session.resolve_copy(key)?;
            let status = session.desk.status(id, &user, session.now)?;
            let copy = session
                .ledger()
                .copy(id)?
                .with_context(|| format!("no copy {id}"))?;
            vec![(copy, status)]
        }
        None => session.desk.catalog_status(&user, session.now)?,
    };

    match session.format {
        OutputFormat::Json => {
            let rows: Vec<StatusRow> = listing
                .into_iter()
                .map(|(copy, status)| StatusRow { copy, status, label: status.to_string() })
                .collect();
            write_json(out, &rows)?;
        }
        OutputFormat::Text if listing.is_empty() => writeln!(out, "No copies.")?,
        OutputFormat::Text => {
            for (copy, status) in &listing {
                write_copy_line(out, copy)?;
                writeln!(out, "  {}", colored_status(*status))?;
            }
        }
    }
    Ok(())
}

fn cmd_borrow(session: &Session, args: TransitionArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let user = UserId::new(args.user)?;
    let copy = session.resolve_copy(&args.copy)?;
    let record = session.desk.borrow(copy, &user, session.now)?;

    match session.format {
        OutputFormat::Json => write_json(out, &record)?,
        OutputFormat::Text => {
            writeln!(
                out,
                "{} {} borrowed {}",
                "✓".green().bold(),
                user.to_string().bold(),
                session.position_of(copy).yellow()
            )?;
            if let Some(due) = session.desk.config().loan.due_by(&record)? {
                writeln!(out, "  Due by: {}", due.format("%Y-%m-%d %H:%M"))?;
            }
        }
    }
    Ok(())
}

fn cmd_reserve(session: &Session, args: TransitionArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let user = UserId::new(args.user)?;
    let copy = session.resolve_copy(&args.copy)?;
    let record = session.desk.reserve(copy, &user, session.now)?;

    match session.format {
        OutputFormat::Json => write_json(out, &record)?,
        OutputFormat::Text => {
            writeln!(
                out,
                "{} {} reserved {}",
                "✓".green().bold(),
                user.to_string().bold(),
                session.position_of(copy).yellow()
            )?;
            if let Some(reserved_at) = record.reserved_at {
                let expiry = session.desk.config().loan.reservation_expiry(reserved_at);
                writeln!(out, "  Held until: {}", expiry.format("%Y-%m-%d %H:%M"))?;
            }
        }
    }
    Ok(())
}

fn cmd_return(session: &Session, args: TransitionArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let user = UserId::new(args.user)?;
    let copy = session.resolve_copy(&args.copy)?;
    let record = session.desk.return_copy(copy, &user, session.now)?;
    let fine = record.fine(&session.desk.config().loan, session.now)?;

    match session.format {
        OutputFormat::Json => {
            write_json(out, &serde_json::json!({ "record": record, "fine": fine }))?
        }
        OutputFormat::Text => {
            writeln!(
                out,
                "{} {} returned (borrowed by {})",
                "✓".green().bold(),
                session.position_of(copy).yellow(),
                record.user
            )?;
            if let Some(fine) = fine.filter(|f| !f.is_zero()) {
                writeln!(out, "  Fine due: {}", fine.to_string().red().bold())?;
            }
        }
    }
    Ok(())
}

fn cmd_history(session: &Session, args: HistoryArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let copy = session.resolve_copy(&args.copy)?;
    let records: Vec<CheckoutRecord> = session.desk.history(copy)?;

    match session.format {
        OutputFormat::Json => write_json(out, &records)?,
        OutputFormat::Text if records.is_empty() => writeln!(out, "No checkouts.")?,
        OutputFormat::Text => {
            for record in &records {
                writeln!(
                    out,
                    "{}  {:<12} {}",
                    record.id.short_id().dimmed(),
                    record.user.to_string(),
                    record.summary()
                )?;
            }
        }
    }
    Ok(())
}

fn cmd_fines(session: &Session, args: FinesArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let user = UserId::new(args.user)?;
    let lines = Statistics::fines_for_user(
        session.ledger(),
        &session.desk.config().loan,
        &user,
        session.now,
    )?;
    let total: Money = lines.iter().map(|line| line.fine).sum();

    match session.format {
        OutputFormat::Json => {
            write_json(out, &serde_json::json!({ "user": user, "lines": lines, "total": total }))?
        }
        OutputFormat::Text if lines.is_empty() => writeln!(out, "{user} owes nothing.")?,
        OutputFormat::Text => {
            for line in &lines {
                writeln!(
                    out,
                    "{:<6}  {} days late  {}",
                    session.position_of(line.record.copy),
                    line.late_days,
                    line.fine
                )?;
            }
            writeln!(out, "Total: {}", total.to_string().red().bold())?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct StatsReport {
    borrows_by_user: Vec<BorrowCount<UserId>>,
    borrows_by_book: Vec<BorrowCount<BookId>>,
    lateness: Vec<BranchLateness>,
}

fn cmd_stats(session: &Session, args: StatsArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    if let Some(branch) = args.branch {
        let branch = BranchId::new(branch)?;
        let top = Statistics::top_borrowers(session.ledger(), &branch, args.top)?;
        match session.format {
            OutputFormat::Json => write_json(out, &top)?,
            OutputFormat::Text => {
                writeln!(out, "Top borrowers at {}:", branch.to_string().bold())?;
                for row in &top {
                    writeln!(out, "  {:<12} {}", row.key.to_string(), row.borrows)?;
                }
            }
        }
        return Ok(());
    }

    let report = StatsReport {
        borrows_by_user: Statistics::borrows_by_user(session.ledger())?,
        borrows_by_book: Statistics::borrows_by_book(session.ledger())?,
        lateness: Statistics::lateness_by_branch(
            session.ledger(),
            &session.desk.config().loan,
            session.now,
        )?,
    };

    match session.format {
        OutputFormat::Json => write_json(out, &report)?,
        OutputFormat::Text => {
            writeln!(out, "{}", "Borrows per reader".bold())?;
            for row in &report.borrows_by_user {
                writeln!(out, "  {:<10} {:<12} {}", row.branch.to_string(), row.key.to_string(), row.borrows)?;
            }
            writeln!(out, "{}", "Borrows per book".bold())?;
            for row in &report.borrows_by_book {
                writeln!(out, "  {:<10} {} {}", row.branch.to_string(), row.key, row.borrows)?;
            }
            writeln!(out, "{}", "Lateness per branch".bold())?;
            for row in &report.lateness {
                writeln!(
                    out,
                    "  {:<10} {} late, {:.2} days on average, average fine {}",
                    row.branch.to_string(),
                    row.late_loans,
                    row.average_late_days,
                    row.average_fine
                )?;
            }
        }
    }
    Ok(())
}

fn cmd_verify(session: &Session, out: &mut dyn Write) -> anyhow::Result<()> {
    let report = LedgerValidator::validate(session.ledger())?;

    match session.format {
        OutputFormat::Json => write_json(out, &report)?,
        OutputFormat::Text if report.is_valid() => {
            writeln!(out, "{} Ledger integrity verified", "✓".green().bold())?;
            writeln!(out, "  Copies: {}", report.copy_count)?;
            writeln!(out, "  Records: {}", report.record_count)?;
            writeln!(out, "  Checksum: {}", "valid".green())?;
        }
        OutputFormat::Text => {
            for violation in &report.violations {
                writeln!(out, "{} {:?}: {}", "✗".red().bold(), violation.kind, violation.description)?;
            }
        }
    }
    if !report.is_valid() {
        bail!("ledger has {} violation(s)", report.violations.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    struct Workspace {
        _dir: tempfile::TempDir,
        ledger: String,
    }

    impl Workspace {
        fn new() -> Self {
            colored::control::set_override(false);
            let dir = tempfile::tempdir().unwrap();
            let ledger = dir.path().join("ledger.json").display().to_string();
            Self { _dir: dir, ledger }
        }

        fn run(&self, args: &[&str]) -> anyhow::Result<String> {
            let mut argv = vec!["shelf", "--ledger", self.ledger.as_str()];
            argv.extend_from_slice(args);
            let cli = Cli::try_parse_from(argv)?;
            let mut out = Vec::new();
            run_command(cli, &mut out)?;
            Ok(String::from_utf8(out)?)
        }

        fn shelved(self) -> Self {
            self.run(&["init"]).unwrap();
            self.run(&["copy", "add", "978-0-13-468599-1", "-b", "central", "-p", "A1"])
                .unwrap();
            self.run(&["copy", "add", "0-306-40615-2", "-b", "north", "-p", "N1"])
                .unwrap();
            self
        }
    }

    #[test]
    fn commands_need_an_initialized_ledger() {
        let ws = Workspace::new();
        let error = ws.run(&["copy", "list"]).unwrap_err();
        assert!(error.to_string().contains("shelf init"));
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let ws = Workspace::new();
        ws.run(&["init"]).unwrap();
        assert!(ws.run(&["init"]).is_err());
        ws.run(&["init", "--force"]).unwrap();
    }

    #[test]
    fn copies_persist_between_runs() {
        let ws = Workspace::new().shelved();
        let listing = ws.run(&["copy", "list"]).unwrap();
        assert!(listing.contains("A1"));
        assert!(listing.contains("N1"));

        let north = ws.run(&["copy", "list", "--branch", "north"]).unwrap();
        assert!(!north.contains("A1"));

        let json = ws.run(&["--format", "json", "copy", "list", "--isbn", "9780134685991"]).unwrap();
        let copies: Vec<BookCopy> = serde_json::from_str(&json).unwrap();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].position, "A1");
    }

    #[test]
    fn borrow_status_and_return() {
        let ws = Workspace::new().shelved();
        let t0 = "2024-01-01T10:00:00+01:00";

        let borrowed = ws.run(&["--at", t0, "borrow", "A1", "-u", "ana"]).unwrap();
        assert!(borrowed.contains("ana borrowed A1"));
        assert!(borrowed.contains("Due by: 2024-01-21 10:00"));

        let taken = ws.run(&["--at", t0, "borrow", "A1", "-u", "ben"]).unwrap_err();
        assert!(taken.to_string().contains("not available"));

        let status = ws
            .run(&["--at", t0, "--format", "json", "status", "A1", "-u", "ben"])
            .unwrap();
        let rows: serde_json::Value = serde_json::from_str(&status).unwrap();
        assert_eq!(rows[0]["status"], "borrowed_other");
        assert_eq!(rows[0]["label"], "borrowed");

        let returned = ws
            .run(&["--at", "2024-01-26T10:00:00+01:00", "return", "A1", "-u", "ana"])
            .unwrap();
        assert!(returned.contains("Fine due: 1.00"));

        let fines = ws
            .run(&["--at", "2024-03-01T10:00:00+01:00", "fines", "-u", "ana"])
            .unwrap();
        assert!(fines.contains("5 days late"));
        assert!(fines.contains("Total: 1.00"));

        let history = ws.run(&["history", "A1"]).unwrap();
        assert!(history.contains("returned 2024-01-26 10:00"));

        ws.run(&["verify"]).unwrap();
    }

    #[test]
    fn reservation_shows_its_expiry() {
        let ws = Workspace::new().shelved();
        let out = ws
            .run(&["--at", "2024-03-01T19:30:00+01:00", "reserve", "N1", "-u", "ana"])
            .unwrap();
        assert!(out.contains("Held until: 2024-03-02 18:00"));

        let mine = ws
            .run(&["--at", "2024-03-02T09:00:00+01:00", "status", "N1", "-u", "ana"])
            .unwrap();
        assert!(mine.contains("reserved (mine)"));
    }

    #[test]
    fn return_of_an_idle_copy_fails() {
        let ws = Workspace::new().shelved();
        let error = ws.run(&["return", "A1", "-u", "ana"]).unwrap_err();
        assert!(error.to_string().contains("not on loan"));
    }

    #[test]
    fn stats_report_borrows_and_lateness() {
        let ws = Workspace::new().shelved();
        ws.run(&["--at", "2024-01-01T10:00:00Z", "borrow", "A1", "-u", "ana"]).unwrap();
        ws.run(&["--at", "2024-01-25T10:00:00Z", "return", "A1", "-u", "ana"]).unwrap();

        let json = ws
            .run(&["--at", "2024-02-01T10:00:00Z", "--format", "json", "stats"])
            .unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(report["borrows_by_user"][0]["key"], "ana");
        assert_eq!(report["borrows_by_user"][0]["borrows"], 1);
        assert_eq!(report["lateness"][0]["late_loans"], 1);
        assert_eq!(report["lateness"][0]["average_fine"], 80);

        let top = ws.run(&["stats", "--branch", "central"]).unwrap();
        assert!(top.contains("ana"));
    }

    #[test]
    fn config_file_changes_the_rules() {
        let ws = Workspace::new().shelved();
        let config = ws._dir.path().join("rules.toml");
        std::fs::write(&config, "max_current_checkouts = 1\n").unwrap();
        let config = config.display().to_string();

        ws.run(&["--config", &config, "borrow", "A1", "-u", "ana"]).unwrap();
        let error = ws
            .run(&["--config", &config, "borrow", "N1", "-u", "ana"])
            .unwrap_err();
        assert!(error.to_string().contains("limit 1"));
    }

    #[test]
    fn concurrent_runs_admit_exactly_one_borrower() {
        let ws = Workspace::new().shelved();
        let at = "2024-03-01T10:00:00Z";
        let users: Vec<String> = (1..=8).map(|i| format!("u{i}")).collect();

        let outcomes: Vec<bool> = std::thread::scope(|s| {
            let runs: Vec<_> = users
                .iter()
                .map(|name| {
                    let ws = &ws;
                    s.spawn(move || ws.run(&["--at", at, "borrow", "A1", "-u", name.as_str()]).is_ok())
                })
                .collect();
            runs.into_iter().map(|run| run.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        let json = ws.run(&["--format", "json", "history", "A1"]).unwrap();
        let records: Vec<CheckoutRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(records.len(), 1);
        ws.run(&["verify"]).unwrap();
    }

    #[cfg(unix)]
    fn ledger_inode(ws: &Workspace) -> u64 {
        use std::os::unix::fs::MetadataExt;
        std::fs::metadata(&ws.ledger).unwrap().ino()
    }

    #[cfg(unix)]
    #[test]
    fn read_only_commands_leave_the_ledger_file_alone() {
        let ws = Workspace::new().shelved();
        ws.run(&["--at", "2024-03-01T10:00:00Z", "borrow", "A1", "-u", "ana"]).unwrap();
        let before = ledger_inode(&ws);

        ws.run(&["--at", "2024-03-02T10:00:00Z", "status", "-u", "ben"]).unwrap();
        ws.run(&["--at", "2024-03-02T10:00:00Z", "status", "A1", "-u", "ana"]).unwrap();
        ws.run(&["copy", "list"]).unwrap();
        ws.run(&["history", "A1"]).unwrap();
        assert!(ws.run(&["--at", "2024-03-02T10:00:00Z", "borrow", "A1", "-u", "ben"]).is_err());

        assert_eq!(ledger_inode(&ws), before);
    }

    #[cfg(unix)]
    #[test]
    fn status_that_releases_a_lapsed_reservation_is_saved() {
        let ws = Workspace::new().shelved();
        ws.run(&["--at", "2024-03-01T10:00:00Z", "reserve", "A1", "-u", "ana"]).unwrap();
        let before = ledger_inode(&ws);

        let status = ws
            .run(&["--at", "2024-03-01T19:00:00Z", "status", "A1", "-u", "ben"])
            .unwrap();
        assert!(status.contains("available"));
        assert_ne!(ledger_inode(&ws), before);

        let saved = LedgerSnapshot::load(Path::new(&ws.ledger)).unwrap();
        let copy = saved.copies.iter().find(|c| c.position == "A1").unwrap();
        assert!(copy.current.is_none());
        assert_eq!(saved.records.len(), 1);
    }

    #[test]
    fn out_of_range_config_is_refused() {
        let ws = Workspace::new().shelved();
        let config = ws._dir.path().join("rules.toml");
        std::fs::write(&config, "[loan]\nloan_period_days = 9223372036854775807\n").unwrap();
        let config = config.display().to_string();

        let error = ws
            .run(&["--config", &config, "borrow", "A1", "-u", "ana"])
            .unwrap_err();
        assert!(format!("{error:#}").contains("loan_period_days"));
    }

    #[test]
    fn malformed_isbn_is_an_error_not_a_crash() {
        let ws = Workspace::new().shelved();
        let error = ws
            .run(&["copy", "add", "12345678é", "-b", "central", "-p", "B1"])
            .unwrap_err();
        assert!(error.to_string().contains("invalid ISBN"));
        assert!(ws.run(&["copy", "list", "--isbn", "12345678é"]).is_err());
    }
}
