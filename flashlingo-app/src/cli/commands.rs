use crate::api::server as api_server;
use crate::cli::opts::*;
use crate::config::{AppConfig, StoreKind};

use anyhow::{anyhow, bail, Result};
use flashlingo_core::{
    filter_by_text, filter_by_topic, topic_counts, Advance, AnswerOutcome,
    CoreError, DashboardStats, EntryDraft, EntryId, QuizReport, QuizSession, ReviewDeck,
    TopicFilter, UserId, VocabEntry, VocabRepository,
};
use flashlingo_json::{paths::store_files_in, JsonStore};
use flashlingo_pg::PostgresRepo;
use flashlingo_sqlite::SqliteRepo;
use std::io::{stdin, stdout, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

pub async fn run_cli(args: Cli, config: AppConfig) -> Result<()> {
    let repo = open_repo(&config).await?;
    let user = config.user_id()?;
    match args.cmd {
        // main runs the TUI on its own runtime; it cannot block inside this one.
        Command::Tui => bail!("the tui is started from main, outside the async runtime"),
        Command::Api(_) => {
            let addr: std::net::SocketAddr = config.api_addr.parse()?;
            api_server::run(repo, user, addr).await
        }
        Command::Entry(cmd) => entry_cmd(&*repo, &user, cmd).await,
        Command::Topics => topics_cmd(&*repo, &user).await,
        Command::Learn(cmd) => learn_cmd(&*repo, &user, cmd).await,
        Command::Quiz(cmd) => quiz_cmd(&*repo, &user, cmd).await,
        Command::Stats => stats_cmd(&*repo, &user).await,
        Command::Export(cmd) => export_cmd(&*repo, &user, cmd).await,
        Command::Import(cmd) => import_cmd(&*repo, &user, cmd).await,
    }
}

pub async fn open_repo(config: &AppConfig) -> Result<Arc<dyn VocabRepository>> {
    match config.store {
        StoreKind::Json => {
            let (file, backups) = store_files_in(&config.data_dir());
            let s = JsonStore::open_with(file, backups, config.max_backups).await?;
            Ok(Arc::new(s))
        }
        StoreKind::Sqlite => {
            let p = config.sqlite_path();
            if let Some(parent) = p.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let s = SqliteRepo::open_file(&p).await?;
            Ok(Arc::new(s))
        }
        StoreKind::Pg => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| {
                    anyhow!("store pg needs --database-url or FLASHLINGO_DATABASE_URL")
                })?;
            let s = PostgresRepo::connect(url).await?;
            Ok(Arc::new(s))
        }
    }
}

async fn entry_cmd(repo: &dyn VocabRepository, user: &UserId, cmd: EntryCmd) -> Result<()> {
    match cmd {
        EntryCmd::Add(a) => {
            let e = repo
                .create(user, &EntryDraft::new(a.source, a.target, a.topic.as_deref()))
                .await?;
            println!("{}", e.id);
        }
        EntryCmd::List { topic, search } => {
            let mut v = repo.list(user).await?;
            if let Some(t) = topic {
                v = filter_by_topic(&v, &TopicFilter::parse(&t));
            }
            if let Some(q) = search {
                v = filter_by_text(&v, &q);
            }
            for e in v {
                println!(
                    "{}\t{}\t{}\ttopic={}",
                    e.id, e.source_text, e.target_text, e.topic
                );
            }
        }
        EntryCmd::Edit(e) => {
            let id = parse_id(&e.id)?;
            let current = repo.get(user, id).await?;
            let draft = EntryDraft {
                source_text: e.source.unwrap_or(current.source_text),
                target_text: e.target.unwrap_or(current.target_text),
                topic: Some(e.topic.unwrap_or(current.topic)),
            };
            repo.update(user, id, &draft).await?;
            println!("ok");
        }
        EntryCmd::Rm { id } => {
            repo.delete(user, parse_id(&id)?).await?;
            println!("ok");
        }
    }
    Ok(())
}

async fn topics_cmd(repo: &dyn VocabRepository, user: &UserId) -> Result<()> {
    let v = repo.list(user).await?;
    println!("all\t{}", v.len());
    for (topic, n) in topic_counts(&v) {
        println!("{topic}\t{n}");
    }
    Ok(())
}

async fn stats_cmd(repo: &dyn VocabRepository, user: &UserId) -> Result<()> {
    let s = DashboardStats::from_entries(&repo.list(user).await?);
    println!("total\t{}\nmastered\t{}\ntopics\t{}", s.total, s.mastered, s.topics);
    Ok(())
}

async fn learn_cmd(repo: &dyn VocabRepository, user: &UserId, cmd: LearnCmd) -> Result<()> {
    let v = repo.list(user).await?;
    if v.is_empty() {
        println!("no entries yet; add some with `flashlingo entry add`");
        return Ok(());
    }
    let mut deck = ReviewDeck::new(&v, TopicFilter::parse(&cmd.topic));
    learn_loop(&mut deck, &mut stdin().lock(), &mut stdout())
}

async fn quiz_cmd(repo: &dyn VocabRepository, user: &UserId, cmd: QuizCmd) -> Result<()> {
    let v = repo.list(user).await?;
    if v.is_empty() {
        println!("no entries yet; add some with `flashlingo entry add`");
        return Ok(());
    }
    let mut session = QuizSession::start(&v, TopicFilter::parse(&cmd.topic), cmd.direction.into())?;
    quiz_loop(&mut session, &mut stdin().lock(), &mut stdout())?;
    Ok(())
}

/// Interactive flip-card loop. Returns on `q` or end of input.
pub fn learn_loop<R: BufRead, W: Write>(
    deck: &mut ReviewDeck,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    if deck.is_empty() {
        writeln!(out, "no entries for topic {:?}; try --topic all", deck.topic().label())?;
        return Ok(());
    }
    loop {
        let (Some((pos, len)), Some(card)) = (deck.position(), deck.current()) else {
            return Ok(());
        };
        writeln!(out, "\n[{pos}/{len}] {}  ({})", card.source_text, card.topic)?;
        if deck.is_flipped() {
            writeln!(out, "    = {}", card.target_text)?;
        }
        let Some(line) = read_line_from(input, out, "[enter=flip n=next p=prev q=quit]> ")? else {
            return Ok(());
        };
        match line.trim() {
            "" | "f" => deck.toggle_flip()?,
            "n" => deck.next()?,
            "p" => deck.prev()?,
            "q" => return Ok(()),
            _ => writeln!(out, "enter, n, p, or q")?,
        }
    }
}

/// Interactive quiz. `:q` or end of input abandons the session (returns `None`).
pub fn quiz_loop<R: BufRead, W: Write>(
    session: &mut QuizSession,
    input: &mut R,
    out: &mut W,
) -> Result<Option<QuizReport>> {
    let answer_prompt = format!("{}> ", session.direction().answer_label());
    loop {
        let Some(q) = session.question() else {
            return Ok(session.report());
        };
        writeln!(
            out,
            "\n[{}/{}] {}: {}",
            q.number,
            q.total,
            session.direction().prompt_label(),
            q.prompt
        )?;

        let outcome = loop {
            let Some(line) = read_line_from(input, out, &answer_prompt)? else {
                return Ok(None);
            };
            if line.trim() == ":q" {
                return Ok(None);
            }
            if let Some(o) = session.submit_answer(&line)? {
                break o;
            }
        };
        match outcome {
            AnswerOutcome::Correct => writeln!(out, "correct (score {})", session.score())?,
            AnswerOutcome::Incorrect { expected } => {
                writeln!(out, "incorrect, the answer is: {expected}")?
            }
        }

        if let Advance::Finished(r) = session.advance()? {
            writeln!(out, "\nfinished: {}/{} correct", r.score, r.total)?;
            return Ok(Some(r));
        }
    }
}

async fn export_cmd(repo: &dyn VocabRepository, user: &UserId, cmd: ExportCmd) -> Result<()> {
    let (n, path) = match cmd {
        ExportCmd::Json { path } => (export_json(repo, user, &path).await?, path),
        ExportCmd::Csv { path, topic } => {
            let filter = topic.as_deref().map(TopicFilter::parse).unwrap_or_default();
            (export_csv(repo, user, &path, &filter).await?, path)
        }
    };
    println!("wrote {n} entries to {}", path.display());
    Ok(())
}

async fn import_cmd(repo: &dyn VocabRepository, user: &UserId, cmd: ImportCmd) -> Result<()> {
    let n = match cmd {
        ImportCmd::Json { path } => import_json(repo, user, &path).await?,
        ImportCmd::Csv { path, topic } => import_csv(repo, user, &path, topic.as_deref()).await?,
    };
    println!("imported {n} entries");
    Ok(())
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ExportBundle {
    version: u32,
    entries: Vec<VocabEntry>,
}

/// Oldest first, so a re-import recreates entries in their original order.
async fn entries_oldest_first(
    repo: &dyn VocabRepository,
    user: &UserId,
) -> Result<Vec<VocabEntry>> {
    let mut v = repo.list(user).await?;
    v.reverse();
    Ok(v)
}

pub async fn export_json(repo: &dyn VocabRepository, user: &UserId, path: &Path) -> Result<usize> {
    let entries = entries_oldest_first(repo, user).await?;
    let n = entries.len();
    let bundle = ExportBundle { version: 1, entries };
    std::fs::write(path, serde_json::to_string_pretty(&bundle)?)?;
    Ok(n)
}

pub async fn export_csv(
    repo: &dyn VocabRepository,
    user: &UserId,
    path: &Path,
    filter: &TopicFilter,
) -> Result<usize> {
    let entries = filter_by_topic(&entries_oldest_first(repo, user).await?, filter);
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["source", "target", "topic"])?;
    for e in &entries {
        wtr.write_record([&e.source_text, &e.target_text, &e.topic])?;
    }
    wtr.flush()?;
    Ok(entries.len())
}

pub async fn import_json(repo: &dyn VocabRepository, user: &UserId, path: &Path) -> Result<usize> {
    let bundle: ExportBundle = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    let drafts = bundle
        .entries
        .into_iter()
        .map(|e| EntryDraft::new(e.source_text, e.target_text, Some(&e.topic)));
    import_drafts(repo, user, drafts).await
}

pub async fn import_csv(
    repo: &dyn VocabRepository,
    user: &UserId,
    path: &Path,
    topic_override: Option<&str>,
) -> Result<usize> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut drafts = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let topic = topic_override.or_else(|| rec.get(2));
        drafts.push(EntryDraft::new(
            rec.get(0).unwrap_or(""),
            rec.get(1).unwrap_or(""),
            topic,
        ));
    }
    import_drafts(repo, user, drafts).await
}

/// Creates each draft, skipping ones that fail validation.
async fn import_drafts(
    repo: &dyn VocabRepository,
    user: &UserId,
    drafts: impl IntoIterator<Item = EntryDraft>,
) -> Result<usize> {
    let mut n = 0;
    for (row, draft) in drafts.into_iter().enumerate() {
        match repo.create(user, &draft).await {
            Ok(_) => n += 1,
            Err(CoreError::Validation(field)) => warn!(row, field, "skipping invalid row"),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(n)
}

// ===== Helpers =====
fn parse_id(s: &str) -> Result<EntryId> {
    Uuid::parse_str(s.trim()).map_err(|_| anyhow!("invalid entry id: {s}"))
}

fn read_line_from<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
) -> Result<Option<String>> {
    write!(out, "{prompt}")?;
    out.flush().ok();
    let mut s = String::new();
    if input.read_line(&mut s)? == 0 {
        return Ok(None);
    }
    Ok(Some(s.trim_end_matches(['\r', '\n']).to_string()))
}
