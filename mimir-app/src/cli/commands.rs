use crate::cli::opts::*;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use mimir_core::{
    due_cards, due_counts, filter_by_text, implicit_decks, parse_tags, review_stats, AnswerEffect,
    AnswerOutcome, Card, CardQuery, CardStore, Deck, DueCounts, DueDate, ReviewMode, ReviewSession,
    ReviewStats, Scope, SessionConfig, SessionStats, SchedulingPolicy, UNTAGGED_DECK,
};
use mimir_json::JsonStore;
use serde::Serialize;
use std::io::{stdin, stdout, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

pub async fn run_cli(args: Cli) -> Result<()> {
    let store = open_store(args.data.clone()).await?;
    match args.cmd {
        Command::Deck(cmd) => deck_cmd(store, cmd).await,
        Command::Card(cmd) => card_cmd(store, cmd).await,
        Command::Stats(cmd) => stats_cmd(store, cmd).await,
        Command::Tags => tags_cmd(store).await,
        Command::Study(cmd) => study_cmd(store, cmd).await,
    }
}

pub async fn open_store(data: Option<PathBuf>) -> Result<Arc<dyn CardStore>> {
    let store = match data {
        Some(path) => JsonStore::open(path).await?,
        None => JsonStore::open_default().await?,
    };
    debug!(path = %store.path().display(), "card store opened");
    Ok(Arc::new(store))
}

async fn deck_cmd(store: Arc<dyn CardStore>, cmd: DeckCmd) -> Result<()> {
    match cmd {
        DeckCmd::Add { name, description } => {
            let d = store.create_deck(&name, description.as_deref()).await?;
            println!("{}", d.id);
        }
        DeckCmd::List => {
            let now = Utc::now();
            for d in store.list_decks().await? {
                let cards = store.get_all(&CardQuery::scope(Scope::Deck(d.id))).await?;
                let c = due_counts(&cards, now);
                println!(
                    "{}\t{}\tlearning={}\tdue={}\ttotal={}",
                    d.id, d.name, c.learning, c.retaining, c.total
                );
            }
        }
        DeckCmd::Rm { deck } => {
            let d = resolve_deck(&*store, &deck).await?;
            store.delete_deck(d.id).await?;
            println!("ok");
        }
    }
    Ok(())
}

async fn card_cmd(store: Arc<dyn CardStore>, cmd: CardCmd) -> Result<()> {
    match cmd {
        CardCmd::Add(a) => {
            let deck = match &a.deck {
                Some(sel) => Some(resolve_deck(&*store, sel).await?),
                None => None,
            };
            let policy = a.policy.map(SchedulingPolicy::from).unwrap_or(if deck.is_some() {
                SchedulingPolicy::Mode
            } else {
                SchedulingPolicy::Interval
            });
            let mut card = Card::create(&a.prompt, &a.response, policy, Utc::now())?;
            if let Some(tags) = &a.tags {
                card.tags = parse_tags(tags);
            }
            if let Some(d) = deck {
                card = card.in_deck(d.id);
            }
            store.put(&card).await?;
            println!("{}", card.id);
        }
        CardCmd::List(l) => {
            let now = Utc::now();
            let scope = resolve_scope(&*store, &l.scope).await?;
            let mut cards = store.get_all(&CardQuery::scope(scope)).await?;
            if let Some(q) = &l.search {
                cards = filter_by_text(&cards, q);
            }
            if l.due {
                cards = due_cards(&cards, now);
            }
            for c in cards {
                let tags = if c.tags.is_empty() { "-".to_string() } else { c.tags.join(";") };
                let due = c
                    .due_date()
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\t{}\t{}\tpolicy={}\ttags={}\tdue={}",
                    c.id,
                    c.prompt,
                    c.response,
                    c.policy(),
                    tags,
                    due
                );
            }
        }
        CardCmd::Rm { card_id } => {
            let id = parse_uuid(&card_id)?;
            store.delete(id).await?;
            println!("ok");
        }
        CardCmd::Edit(e) => {
            let id = parse_uuid(&e.card_id)?;
            let mut card = store
                .get(id)
                .await?
                .ok_or_else(|| anyhow!("card not found: {id}"))?;

            if let Some(p) = e.prompt {
                card.prompt = non_blank(&p, "prompt")?;
            }
            if let Some(r) = e.response {
                card.response = non_blank(&r, "response")?;
            }
            if let Some(t) = e.tags {
                card.tags = parse_tags(&t);
            }
            card.updated_at = Utc::now();

            store.put(&card).await?;
            println!("ok");
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct StatsReport {
    scope: String,
    due: DueCounts,
    review: ReviewStats,
}

async fn stats_cmd(store: Arc<dyn CardStore>, cmd: StatsCmd) -> Result<()> {
    let now = Utc::now();
    let scope = resolve_scope(&*store, &cmd.scope).await?;
    let cards = store.get_all(&CardQuery::scope(scope.clone())).await?;
    let report = StatsReport {
        scope: scope.to_string(),
        due: due_counts(&cards, now),
        review: review_stats(&cards, now),
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("scope:      {}", report.scope);
    println!("total:      {}", report.review.total);
    println!("learning:   {}", report.due.learning);
    println!("due:        {}", report.review.due);
    println!("overdue:    {}", report.review.overdue);
    println!("up to date: {}", report.review.up_to_date);
    Ok(())
}

async fn tags_cmd(store: Arc<dyn CardStore>) -> Result<()> {
    let now = Utc::now();
    let cards = store.get_all(&CardQuery::all()).await?;
    for name in implicit_decks(&cards) {
        let scope = if name == UNTAGGED_DECK { Scope::Untagged } else { Scope::Tag(name.clone()) };
        let in_scope: Vec<Card> = cards.iter().filter(|c| c.in_scope(&scope)).cloned().collect();
        let s = review_stats(&in_scope, now);
        println!("{}\tdue={}\ttotal={}", name, s.due, s.total);
    }
    Ok(())
}

async fn study_cmd(store: Arc<dyn CardStore>, cmd: StudyCmd) -> Result<()> {
    let scope = resolve_scope(&*store, &cmd.scope).await?;
    let mode = ReviewMode::from(cmd.mode);
    let mut config = SessionConfig::default()
        .with_mastery_threshold(cmd.mastery_threshold)
        .with_requeue_delay(Duration::from_secs(cmd.requeue_delay_secs));
    if cmd.no_shuffle {
        config = config.without_shuffle();
    }

    let mut session = ReviewSession::with_config(store, config);
    if !session.start(scope.clone(), mode).await? {
        println!("no cards to study in {scope} ({mode})");
        return Ok(());
    }
    println!("{mode} session over {scope}. answer y/n, q to quit");

    while !session.is_complete() {
        let Some(card) = session.current_card().cloned() else {
            match session.time_until_next() {
                Some(wait) => {
                    println!("(next card in {}s)", wait.as_secs().max(1));
                    tokio::time::sleep(wait).await;
                    continue;
                }
                None => break,
            }
        };

        if let Some(stats) = session.stats() {
            print!("\n[{}/{}] ", stats.done(), stats.total());
        }
        println!("Q: {}", card.prompt);
        if read_line("[enter=show, q=quit] ")?.trim().eq_ignore_ascii_case("q") {
            session.exit();
            return Ok(());
        }
        session.reveal_answer();
        println!("A: {}", card.response);

        let correct = loop {
            match read_line("correct? [y/n/q] ")?.trim().to_lowercase().as_str() {
                "y" | "yes" => break true,
                "n" | "no" => break false,
                "q" | "quit" => {
                    session.exit();
                    return Ok(());
                }
                _ => println!("enter y, n, or q"),
            }
        };

        let outcome = submit_with_retry(&mut session, correct).await?;
        report_outcome(&outcome, session.config().mastery_threshold);
    }

    if let Some(stats) = session.stats() {
        print_summary(stats);
    }
    session.exit();
    Ok(())
}

/// Store failures leave the session untouched, so the same answer can be
/// resubmitted once the user has had a chance to fix things.
async fn submit_with_retry(session: &mut ReviewSession, correct: bool) -> Result<AnswerOutcome> {
    loop {
        match session.submit_answer(correct).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "saving answer failed");
                println!("could not save: {e}");
                if read_line("[enter=retry, q=quit] ")?.trim().eq_ignore_ascii_case("q") {
                    bail!("answer not saved: {e}");
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn report_outcome(outcome: &AnswerOutcome, threshold: u32) {
    let AnswerOutcome::Answered { effect, .. } = outcome else {
        return;
    };
    match effect {
        AnswerEffect::Requeued { streak, eligible_at } => {
            let wait = eligible_at
                .map(|at| format!(", back in {}s", (at - Utc::now()).num_seconds().max(0)))
                .unwrap_or_default();
            println!("-> {streak}/{threshold}{wait}");
        }
        AnswerEffect::Mastered { graduated: true } => println!("-> mastered, moved to retaining"),
        AnswerEffect::Mastered { graduated: false } => println!("-> mastered"),
        AnswerEffect::Rescheduled { due_date: Some(d) } => {
            println!("-> next due {}", d.format("%Y-%m-%d"))
        }
        AnswerEffect::Rescheduled { due_date: None } => println!("-> rescheduled"),
    }
}

fn print_summary(stats: SessionStats) {
    match stats {
        SessionStats::Mastery { completed, total } => {
            println!("\nmastered {completed} of {total} cards")
        }
        SessionStats::SinglePass { position, total } => {
            println!("\nreviewed {position} of {total} cards")
        }
    }
}

// ===== Helpers =====
fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim()).map_err(|_| anyhow!("invalid uuid: {s}"))
}

fn non_blank(s: &str, field: &str) -> Result<String> {
    let s = s.trim();
    if s.is_empty() {
        bail!("{field} must not be empty");
    }
    Ok(s.to_string())
}

async fn resolve_deck<S: CardStore + ?Sized>(store: &S, sel: &str) -> Result<Deck> {
    if let Ok(id) = Uuid::parse_str(sel.trim()) {
        if let Ok(d) = store.get_deck(id).await {
            return Ok(d);
        }
    }
    let decks = store.list_decks().await?;
    decks
        .into_iter()
        .find(|d| d.name.eq_ignore_ascii_case(sel.trim()))
        .with_context(|| format!("deck not found: {sel}"))
}

/// Like `Scope::from_str`, but a bare word naming an explicit deck selects
/// that deck rather than a tag.
async fn resolve_scope<S: CardStore + ?Sized>(store: &S, sel: &str) -> Result<Scope> {
    let scope: Scope = sel.parse()?;
    if let Scope::Tag(name) = &scope {
        if !sel.trim().starts_with("tag:") {
            let decks = store.list_decks().await?;
            if let Some(d) = decks.iter().find(|d| d.name.eq_ignore_ascii_case(name)) {
                return Ok(Scope::Deck(d.id));
            }
        }
    }
    Ok(scope)
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    stdout().flush().ok();
    let mut s = String::new();
    stdin().read_line(&mut s)?;
    Ok(s)
}
