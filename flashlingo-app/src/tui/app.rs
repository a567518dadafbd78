use crate::tui::{
    inputs::{map_event, Action, Mode},
    views,
};
use crossterm::{
    event::{self},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use flashlingo_core::{
    compute_topics, topic_counts, Advance, Direction, QuizReport, QuizSession, ReviewDeck,
    Subscription, TopicFilter, UserId, VocabEntry, VocabRepository,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::collections::BTreeMap;
use std::io::{stdout, Stdout};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::debug;

pub enum Screen {
    Home,
    Learn(ReviewDeck),
    Quiz(QuizSession),
    Finished { report: QuizReport, topic: TopicFilter },
}

/// Everything the views draw, kept apart from the terminal so key handling
/// can be driven directly.
pub struct AppState {
    pub entries: Vec<VocabEntry>,
    pub topics: Vec<TopicFilter>,
    pub counts: BTreeMap<String, usize>,
    pub sel: usize,
    pub direction: Direction,
    pub screen: Screen,
    pub status: Option<String>,
}

impl AppState {
    pub fn new(entries: &[VocabEntry]) -> Self {
        let mut s = Self {
            entries: vec![],
            topics: vec![TopicFilter::All],
            counts: BTreeMap::new(),
            sel: 0,
            direction: Direction::SourceToTarget,
            screen: Screen::Home,
            status: None,
        };
        s.apply_snapshot(entries);
        s
    }

    pub fn mode(&self) -> Mode {
        match self.screen {
            Screen::Home => Mode::Home,
            Screen::Learn(_) => Mode::Learn,
            Screen::Quiz(_) => Mode::Quiz,
            Screen::Finished { .. } => Mode::Finished,
        }
    }

    pub fn selected_topic(&self) -> TopicFilter {
        self.topics.get(self.sel).cloned().unwrap_or_default()
    }

    /// Entries shown for a topic row.
    pub fn count_for(&self, topic: &TopicFilter) -> usize {
        match topic {
            TopicFilter::All => self.entries.len(),
            TopicFilter::Named(name) => self.counts.get(name).copied().unwrap_or(0),
        }
    }

    /// Takes a newer collection snapshot. The learn deck follows it; a running
    /// quiz keeps the queue it started with.
    pub fn apply_snapshot(&mut self, entries: &[VocabEntry]) {
        let selected = self.selected_topic();
        self.entries = entries.to_vec();
        self.counts = topic_counts(entries);
        self.topics = std::iter::once(TopicFilter::All)
            .chain(compute_topics(entries).into_iter().map(TopicFilter::Named))
            .collect();
        self.sel = self
            .topics
            .iter()
            .position(|t| *t == selected)
            .unwrap_or_else(|| self.sel.min(self.topics.len() - 1));
        if let Screen::Learn(deck) = &mut self.screen {
            deck.refresh(entries);
        }
    }

    /// Applies one action; returns `false` once the app should exit.
    pub fn handle(&mut self, action: Action) -> bool {
        if action == Action::Quit {
            return false;
        }
        if action != Action::None {
            self.status = None;
        }
        match &mut self.screen {
            Screen::Home => match action {
                Action::Up => self.sel = self.sel.saturating_sub(1),
                Action::Down => {
                    if self.sel + 1 < self.topics.len() {
                        self.sel += 1;
                    }
                }
                Action::SwitchDirection => self.direction = self.direction.reversed(),
                Action::StartLearn => self.start_learn(),
                Action::StartQuiz => self.start_quiz(self.selected_topic()),
                _ => {}
            },
            Screen::Learn(deck) => {
                // Navigation on an empty deck is rejected by the deck itself.
                let res = match action {
                    Action::Back => {
                        self.screen = Screen::Home;
                        Ok(())
                    }
                    Action::Flip => deck.toggle_flip(),
                    Action::Next => deck.next(),
                    Action::Prev => deck.prev(),
                    _ => Ok(()),
                };
                if let Err(e) = res {
                    debug!(error = %e, "learn action ignored");
                }
            }
            Screen::Quiz(session) => match action {
                Action::Back => self.screen = Screen::Home,
                Action::Type(c) => {
                    let mut s = session.pending_answer().to_string();
                    s.push(c);
                    session.set_pending_answer(s).ok();
                }
                Action::Erase => {
                    let mut s = session.pending_answer().to_string();
                    s.pop();
                    session.set_pending_answer(s).ok();
                }
                Action::Enter => {
                    if session.last_outcome() == flashlingo_core::Feedback::None {
                        // Blank input stays on the question.
                        session.submit_pending().ok();
                    } else if let Ok(Advance::Finished(report)) = session.advance() {
                        let topic = session.topic().clone();
                        self.screen = Screen::Finished { report, topic };
                    }
                }
                _ => {}
            },
            Screen::Finished { topic, .. } => match action {
                Action::Retry => {
                    let topic = topic.clone();
                    self.start_quiz(topic);
                }
                Action::Back => self.screen = Screen::Home,
                _ => {}
            },
        }
        true
    }

    fn start_learn(&mut self) {
        let deck = ReviewDeck::new(&self.entries, self.selected_topic());
        if deck.is_empty() {
            self.status = Some(empty_topic_message(deck.topic()));
            return;
        }
        self.screen = Screen::Learn(deck);
    }

    fn start_quiz(&mut self, topic: TopicFilter) {
        match QuizSession::start(&self.entries, topic.clone(), self.direction) {
            Ok(session) => self.screen = Screen::Quiz(session),
            Err(_) => {
                self.status = Some(empty_topic_message(&topic));
                self.screen = Screen::Home;
            }
        }
    }
}

fn empty_topic_message(topic: &TopicFilter) -> String {
    match topic {
        TopicFilter::All => "No entries yet. Add some with `flashlingo entry add`.".to_string(),
        TopicFilter::Named(name) => format!("No entries in topic \"{name}\"."),
    }
}

pub struct TuiApp {
    pub repo: Arc<dyn VocabRepository>,
    pub rt: Arc<Runtime>,
    user: UserId,
    sub: Option<Subscription>,
    state: AppState,
}

impl TuiApp {
    pub fn new(repo: Arc<dyn VocabRepository>, user: UserId, rt: Arc<Runtime>) -> Self {
        Self { repo, rt, user, sub: None, state: AppState::new(&[]) }
    }

    fn subscribe(&mut self) -> anyhow::Result<()> {
        let sub = self.rt.block_on(self.repo.subscribe(&self.user))?;
        self.state.apply_snapshot(&sub.latest());
        self.sub = Some(sub);
        Ok(())
    }

    fn poll_snapshot(&mut self) {
        if let Some(snap) = self.sub.as_mut().and_then(|s| s.try_changed()) {
            self.state.apply_snapshot(&snap);
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        self.subscribe()?;

        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let res = self.mainloop(&mut terminal);

        disable_raw_mode().ok();
        let mut out: Stdout = std::io::stdout();
        execute!(out, LeaveAlternateScreen).ok();
        terminal.show_cursor().ok();

        res
    }

    fn mainloop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        loop {
            self.poll_snapshot();
            terminal.draw(|f| views::draw_ui(f, f.size(), &self.state))?;

            if event::poll(std::time::Duration::from_millis(100))? {
                let action = map_event(event::read()?, self.state.mode());
                if !self.state.handle(action) {
                    break;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashlingo_core::EntryDraft;

    fn entry(src: &str, dst: &str, topic: Option<&str>) -> VocabEntry {
        VocabEntry::new(EntryDraft::new(src, dst, topic).validate().unwrap())
    }

    fn sample() -> Vec<VocabEntry> {
        vec![
            entry("apple", "táo", Some("Fruits")),
            entry("dog", "chó", Some("Animals")),
            entry("cat", "mèo", Some("Animals")),
        ]
    }

    fn type_str(st: &mut AppState, s: &str) {
        for c in s.chars() {
            st.handle(Action::Type(c));
        }
    }

    #[test]
    fn topic_list_starts_with_all() {
        let st = AppState::new(&sample());
        assert_eq!(
            st.topics,
            vec![
                TopicFilter::All,
                TopicFilter::Named("Animals".into()),
                TopicFilter::Named("Fruits".into())
            ]
        );
        assert_eq!(st.count_for(&TopicFilter::All), 3);
        assert_eq!(st.count_for(&TopicFilter::Named("Animals".into())), 2);
    }

    #[test]
    fn learn_on_empty_collection_stays_home_with_message() {
        let mut st = AppState::new(&[]);
        st.handle(Action::StartLearn);
        assert_eq!(st.mode(), Mode::Home);
        assert!(st.status.is_some());
    }

    #[test]
    fn learn_deck_follows_snapshots() {
        let v = sample();
        let mut st = AppState::new(&v);
        st.handle(Action::Down); // Animals
        st.handle(Action::StartLearn);
        st.handle(Action::Next);
        let Screen::Learn(deck) = &st.screen else { panic!("not learning") };
        let current = deck.current().unwrap().id;

        // Another writer removes the Fruits entry.
        st.apply_snapshot(&v[1..]);
        let Screen::Learn(deck) = &st.screen else { panic!("not learning") };
        assert_eq!(deck.current().unwrap().id, current);
        assert_eq!(st.selected_topic(), TopicFilter::Named("Animals".into()));
    }

    #[test]
    fn quiz_runs_to_report_and_ignores_snapshots() {
        let v = sample();
        let mut st = AppState::new(&v);
        st.handle(Action::Down); // Animals
        st.handle(Action::StartQuiz);
        assert_eq!(st.mode(), Mode::Quiz);

        st.apply_snapshot(&[]);

        for _ in 0..2 {
            let expected = match &st.screen {
                Screen::Quiz(s) => s.question().unwrap().expected.to_string(),
                _ => panic!("not quizzing"),
            };
            st.handle(Action::Enter); // blank is ignored
            type_str(&mut st, &expected);
            st.handle(Action::Enter);
            st.handle(Action::Enter);
        }
        match &st.screen {
            Screen::Finished { report, topic } => {
                assert_eq!(*report, QuizReport { score: 2, total: 2 });
                assert_eq!(*topic, TopicFilter::Named("Animals".into()));
            }
            _ => panic!("quiz did not finish"),
        }
        // The collection emptied mid-quiz, so retry reports instead of starting.
        st.handle(Action::Retry);
        assert_eq!(st.mode(), Mode::Home);
        assert!(st.status.is_some());
    }

    #[test]
    fn erase_edits_pending_answer() {
        let mut st = AppState::new(&sample());
        st.handle(Action::StartQuiz);
        type_str(&mut st, "ab");
        st.handle(Action::Erase);
        let Screen::Quiz(s) = &st.screen else { panic!("not quizzing") };
        assert_eq!(s.pending_answer(), "a");
    }
}
