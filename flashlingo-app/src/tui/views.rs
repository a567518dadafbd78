use crate::tui::app::{AppState, Screen};
use crate::tui::theme::*;
use flashlingo_core::{Feedback, QuizReport, QuizSession, ReviewDeck, TopicFilter};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap},
    Frame,
};

pub fn draw_ui(f: &mut Frame, area: Rect, st: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[0]);
    draw_topics(f, chunks[0], st);

    match &st.screen {
        Screen::Home => draw_home(f, chunks[1], st),
        Screen::Learn(deck) => draw_card(f, chunks[1], deck),
        Screen::Quiz(session) => draw_quiz(f, chunks[1], session),
        Screen::Finished { report, topic } => draw_report(f, chunks[1], report, topic),
    }

    let hints = match &st.screen {
        Screen::Home => " ↑/k ↓/j topic   Enter/l learn   t quiz   d direction   q quit ",
        Screen::Learn(_) => " space flip   ←/p prev   →/n next   Esc back ",
        Screen::Quiz(_) => " type answer   Enter submit/next   Esc back ",
        Screen::Finished { .. } => " r retry   Enter back ",
    };
    let foot = match &st.status {
        Some(msg) => Paragraph::new(Line::from(Span::raw(msg.as_str()).style(incorrect_style()))),
        None => Paragraph::new(Line::from(hints)).style(footer_style()),
    };
    f.render_widget(foot, rows[1]);
}

fn draw_topics(f: &mut Frame, area: Rect, st: &AppState) {
    let items: Vec<_> = st
        .topics
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let text = format!("{} ({})", t.label(), st.count_for(t));
            let line = if i == st.sel {
                Line::from(text).style(selected_style())
            } else {
                Line::from(text)
            };
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items).block(Block::default().title("Topics").borders(Borders::ALL));
    f.render_widget(list, area);
}

fn draw_home(f: &mut Frame, area: Rect, st: &AppState) {
    let text = vec![
        Line::from(vec![
            Span::raw("Topic: ").style(title_style()),
            Span::raw(st.selected_topic().label().to_string()),
        ]),
        Line::from(vec![
            Span::raw("Quiz direction: ").style(title_style()),
            Span::raw(format!(
                "{} → {}",
                st.direction.prompt_label(),
                st.direction.answer_label()
            )),
        ]),
        Line::from(""),
        Line::from(Span::raw("Enter to flip through cards, t to take a quiz.").style(hint_style())),
    ];
    let p = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("FlashLingo").borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_card(f: &mut Frame, area: Rect, deck: &ReviewDeck) {
    let title = match deck.position() {
        Some((pos, len)) => format!("Learn · {} · {pos}/{len}", deck.topic().label()),
        None => format!("Learn · {}", deck.topic().label()),
    };
    let block = Block::default().title(title).borders(Borders::ALL);

    let Some(card) = deck.current() else {
        let p = Paragraph::new("No cards left in this topic. Esc to pick another.")
            .wrap(Wrap { trim: true })
            .block(block);
        f.render_widget(p, area);
        return;
    };

    let mut text = vec![
        Line::from(vec![Span::raw("Q: ").style(title_style()), Span::raw(&card.source_text)]),
        Line::from(""),
    ];
    if deck.is_flipped() {
        text.push(Line::from(vec![
            Span::raw("A: ").style(title_style()),
            Span::raw(&card.target_text),
        ]));
    } else {
        text.push(Line::from(Span::raw("(space to flip)").style(hint_style())));
    }
    text.push(Line::from(""));
    text.push(Line::from(Span::raw(format!("topic: {}", card.topic)).style(hint_style())));

    let p = Paragraph::new(text).wrap(Wrap { trim: true }).block(block);
    f.render_widget(p, area);
}

fn draw_quiz(f: &mut Frame, area: Rect, session: &QuizSession) {
    let block = Block::default()
        .title(format!("Quiz · {}", session.topic().label()))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let gauge = Gauge::default()
        .gauge_style(selected_style())
        .ratio(f64::from(session.progress().clamp(0.0, 1.0)))
        .label(format!("score {}/{}", session.score(), session.total()));
    f.render_widget(gauge, parts[0]);

    let Some(q) = session.question() else {
        return;
    };
    let direction = session.direction();
    let mut text = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw(format!("[{}/{}] {}: ", q.number, q.total, direction.prompt_label()))
                .style(title_style()),
            Span::raw(q.prompt),
        ]),
        Line::from(vec![
            Span::raw(format!("{}: ", direction.answer_label())).style(title_style()),
            Span::raw(session.pending_answer()),
            Span::raw(if session.last_outcome() == Feedback::None { "_" } else { "" }),
        ]),
        Line::from(""),
    ];
    match session.last_outcome() {
        Feedback::None => {}
        Feedback::Correct => text.push(Line::from(Span::raw("Correct!").style(correct_style()))),
        Feedback::Incorrect => {
            text.push(Line::from(Span::raw("Incorrect.").style(incorrect_style())));
            if let Some(answer) = session.revealed_answer() {
                text.push(Line::from(vec![
                    Span::raw("Answer: ").style(hint_style()),
                    Span::raw(answer),
                ]));
            }
        }
    }
    if session.last_outcome() != Feedback::None {
        let next = if session.is_last_question() { "see results" } else { "next question" };
        text.push(Line::from(Span::raw(format!("Enter for {next}")).style(hint_style())));
    }
    f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), parts[1]);
}

fn draw_report(f: &mut Frame, area: Rect, report: &QuizReport, topic: &TopicFilter) {
    let text = vec![
        Line::from(Span::raw("Quiz complete").style(title_style())),
        Line::from(""),
        Line::from(format!("Topic: {}", topic.label())),
        Line::from(format!("Score: {}/{}", report.score, report.total)),
        Line::from(format!("Accuracy: {:.0}%", report.accuracy() * 100.0)),
    ];
    let p = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Results").borders(Borders::ALL));
    f.render_widget(p, area);
}
